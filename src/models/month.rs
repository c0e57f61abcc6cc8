//! Month and time slot models.
//!
//! A scheduling run covers exactly one calendar month. The month is split
//! into half-day time slots: a day shift (08:00-20:00) and a night shift
//! (20:00-08:00 next day) for every calendar day.
//!
//! # Slot Indexing
//! Slots are numbered inside the month as `(day - 1) * 2 + kind`, so the
//! slot order is chronological and two slots `i < j` start `12h * (j - i)`
//! apart.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::rotation::{default_anchor, RotationCycle};

/// Daily working-hour norm used to derive contractual hours.
pub const DAILY_NORM_HOURS: u32 = 8;

/// Length of one shift in hours.
pub const SHIFT_HOURS: u32 = 12;

/// Half of a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftKind {
    /// 08:00-20:00.
    Day,
    /// 20:00-08:00, running into the next calendar day.
    Night,
}

impl ShiftKind {
    /// Both kinds in chronological order.
    pub const ALL: [ShiftKind; 2] = [ShiftKind::Day, ShiftKind::Night];

    /// Offset within a day (day = 0, night = 1).
    #[inline]
    pub fn offset(self) -> usize {
        match self {
            ShiftKind::Day => 0,
            ShiftKind::Night => 1,
        }
    }

    /// Roster notation code.
    pub fn code(self) -> &'static str {
        match self {
            ShiftKind::Day => "Z",
            ShiftKind::Night => "N",
        }
    }
}

/// The calendar month being scheduled.
///
/// Built from input records via [`Month::new`]; serialized for output only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Month {
    /// Calendar year.
    pub year: i32,
    /// Month number (1-12).
    pub month: u32,
    /// Public holidays (non-working days even on weekdays).
    pub holidays: Vec<NaiveDate>,
    /// Day-shift date of slot 0 of the rotation succession.
    pub rotation_anchor: NaiveDate,
    #[serde(skip)]
    days: Vec<NaiveDate>,
}

impl Month {
    /// Creates a month. Returns `None` for an invalid year/month pair.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days: Vec<NaiveDate> = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .collect();
        Some(Self {
            year,
            month,
            holidays: Vec::new(),
            rotation_anchor: default_anchor(),
            days,
        })
    }

    /// Sets public holidays.
    pub fn with_holidays(mut self, holidays: Vec<NaiveDate>) -> Self {
        self.holidays = holidays;
        self
    }

    /// Sets the rotation anchor date.
    pub fn with_rotation_anchor(mut self, anchor: NaiveDate) -> Self {
        self.rotation_anchor = anchor;
        self
    }

    /// Ordered calendar days.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Number of days.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.days[0]
    }

    /// Last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    /// Whether a date falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Whether a date is a working day (Mon-Fri, not a holiday).
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Working days in order.
    pub fn working_days(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .copied()
            .filter(|d| self.is_working_day(*d))
            .collect()
    }

    /// Contractual working hours for the month.
    pub fn working_hours(&self) -> u32 {
        self.working_days().len() as u32 * DAILY_NORM_HOURS
    }

    /// Number of half-day slots.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.days.len() * 2
    }

    /// Month-local slot index of a (date, kind) pair.
    pub fn slot_index(&self, date: NaiveDate, kind: ShiftKind) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        Some((date.day() as usize - 1) * 2 + kind.offset())
    }

    /// (date, kind) for a month-local slot index.
    pub fn slot_at(&self, index: usize) -> Option<(NaiveDate, ShiftKind)> {
        let date = *self.days.get(index / 2)?;
        let kind = ShiftKind::ALL[index % 2];
        Some((date, kind))
    }

    /// The rotation cycle on duty for a slot.
    pub fn cycle_on_duty(&self, date: NaiveDate, kind: ShiftKind) -> RotationCycle {
        RotationCycle::on_duty(self.rotation_anchor, date, kind)
    }

    /// Number of slots each cycle is on duty this month.
    pub fn slots_per_cycle(&self) -> BTreeMap<RotationCycle, usize> {
        let mut counts: BTreeMap<RotationCycle, usize> =
            RotationCycle::ALL.iter().map(|c| (*c, 0)).collect();
        for date in &self.days {
            for kind in ShiftKind::ALL {
                *counts.entry(self.cycle_on_duty(*date, kind)).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One unit of coverage demand: a date and shift kind with per-position
/// minimum staff counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Month-local slot index.
    pub index: usize,
    /// Calendar date the shift starts on.
    pub date: NaiveDate,
    /// Day or night.
    pub kind: ShiftKind,
    /// Rotation cycle on duty.
    pub cycle: RotationCycle,
    /// Required staff count per position ID. Only positions with a
    /// non-zero requirement are present.
    pub requirements: BTreeMap<String, u32>,
}

impl TimeSlot {
    /// Total staff required in this slot.
    pub fn total_required(&self) -> u32 {
        self.requirements.values().sum()
    }

    /// Required count for a position (0 if not required).
    pub fn required(&self, position_id: &str) -> u32 {
        self.requirements.get(position_id).copied().unwrap_or(0)
    }

    /// Whether this slot collides with any of the given leave days.
    ///
    /// A night shift also collides with a leave day that starts the next
    /// morning, since it ends at 08:00 on that day.
    pub fn overlaps_leave(&self, leave: &[NaiveDate]) -> bool {
        overlaps_leave(self.date, self.kind, leave)
    }
}

/// Whether a (date, kind) slot collides with any of the given leave days.
pub fn overlaps_leave(date: NaiveDate, kind: ShiftKind, leave: &[NaiveDate]) -> bool {
    leave.contains(&date) || (kind == ShiftKind::Night && leave.contains(&(date + Duration::days(1))))
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date.format("%d/%m/%Y"), self.kind.code())
    }
}
