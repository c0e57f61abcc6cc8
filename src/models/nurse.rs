//! Nurse model.
//!
//! A nurse is a schedulable worker with skill tags, a rotation cycle,
//! planned leave, individual shift requests and a contractual number of
//! shifts for the month.
//!
//! # Contractual Quota
//! The quota is supplied by the input source. [`Nurse::shifts_to_work`]
//! derives it from the month's working hours the way the department
//! computes it: working hours minus banked extra hours minus leave taken on
//! working days, divided into 12-hour shifts and rounded up.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Month, RotationCycle, ShiftKind, DAILY_NORM_HOURS, SHIFT_HOURS};

/// A schedulable worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nurse {
    /// Unique nurse identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Skill tags; determine which positions the nurse can fill.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Rotation group. `None` = not schedulable until a cycle is distributed.
    #[serde(default)]
    pub cycle: Option<RotationCycle>,
    /// Planned leave dates.
    #[serde(default)]
    pub leave: Vec<NaiveDate>,
    /// Individual shift requests.
    #[serde(default)]
    pub requests: Vec<ShiftRequest>,
    /// Contractual number of shifts this month. `None` = unconstrained.
    #[serde(default)]
    pub required_shifts: Option<u32>,
    /// Per-sector min/max shift counts, keyed by sector ID.
    #[serde(default)]
    pub sector_limits: BTreeMap<String, SectorLimit>,
    /// Hours already worked in excess of contract (reduce the quota).
    #[serde(default)]
    pub extra_hours_worked: u32,
}

/// A nurse's preference for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRequest {
    /// Requested date.
    pub date: NaiveDate,
    /// Restrict the request to one shift kind. `None` = either.
    #[serde(default)]
    pub kind: Option<ShiftKind>,
    /// Whether the nurse wants to work or be off.
    pub preference: Preference,
}

/// Direction of a shift request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Wants a shift on the date.
    Work,
    /// Wants no shift on the date.
    Off,
}

/// Bounds on the number of shifts a nurse works in one sector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorLimit {
    /// Minimum shifts in the sector.
    #[serde(default)]
    pub min: Option<u32>,
    /// Maximum shifts in the sector.
    #[serde(default)]
    pub max: Option<u32>,
}

impl Nurse {
    /// Creates a nurse with no skills and no cycle.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            skills: Vec::new(),
            cycle: None,
            leave: Vec::new(),
            requests: Vec::new(),
            required_shifts: None,
            sector_limits: BTreeMap::new(),
            extra_hours_worked: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a skill tag.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }

    /// Sets the rotation cycle.
    pub fn with_cycle(mut self, cycle: RotationCycle) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Adds a planned leave date.
    pub fn with_leave(mut self, date: NaiveDate) -> Self {
        self.leave.push(date);
        self
    }

    /// Adds a shift request.
    pub fn with_request(mut self, request: ShiftRequest) -> Self {
        self.requests.push(request);
        self
    }

    /// Sets the contractual shift count.
    pub fn with_required_shifts(mut self, shifts: u32) -> Self {
        self.required_shifts = Some(shifts);
        self
    }

    /// Sets shift bounds for one sector.
    pub fn with_sector_limit(mut self, sector_id: impl Into<String>, limit: SectorLimit) -> Self {
        self.sector_limits.insert(sector_id.into(), limit);
        self
    }

    /// Sets banked extra hours.
    pub fn with_extra_hours(mut self, hours: u32) -> Self {
        self.extra_hours_worked = hours;
        self
    }

    /// Whether the nurse holds a skill.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }

    /// Whether the nurse is on planned leave on a date.
    pub fn is_on_leave(&self, date: NaiveDate) -> bool {
        self.leave.contains(&date)
    }

    /// Planned leave days that fall on working days of the month.
    pub fn leave_working_days(&self, month: &Month) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self
            .leave
            .iter()
            .copied()
            .filter(|d| month.contains(*d) && month.is_working_day(*d))
            .collect();
        days.sort();
        days.dedup();
        days
    }

    /// Contractual shift count derived from the month's working hours.
    ///
    /// `ceil((working_hours - extra_hours - leave_working_days * 8) / 12)`,
    /// floored at zero.
    pub fn shifts_to_work(&self, month: &Month) -> u32 {
        let off_hours = self.leave_working_days(month).len() as u32 * DAILY_NORM_HOURS;
        let hours = month
            .working_hours()
            .saturating_sub(self.extra_hours_worked)
            .saturating_sub(off_hours);
        hours.div_ceil(SHIFT_HOURS)
    }
}

impl ShiftRequest {
    /// A request to work on a date.
    pub fn work(date: NaiveDate) -> Self {
        Self {
            date,
            kind: None,
            preference: Preference::Work,
        }
    }

    /// A request to be off on a date.
    pub fn off(date: NaiveDate) -> Self {
        Self {
            date,
            kind: None,
            preference: Preference::Off,
        }
    }

    /// Restricts the request to one shift kind.
    pub fn with_kind(mut self, kind: ShiftKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Whether a (date, kind) slot falls under this request.
    pub fn matches(&self, date: NaiveDate, kind: ShiftKind) -> bool {
        self.date == date && self.kind.map_or(true, |k| k == kind)
    }
}

impl SectorLimit {
    /// Bounds with both ends set.
    pub fn between(min: u32, max: u32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}
