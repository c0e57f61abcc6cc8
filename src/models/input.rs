//! Input records for one scheduling run.
//!
//! [`RosterInput`] is the serde-facing shape of everything the upstream
//! sheet reader supplies. It is a plain record; [`RosterInput::into_schedule`]
//! validates it and builds the [`Schedule`] aggregate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{FixedAssignment, Month, Nurse, Schedule, Sector, StaffingRequirement};
use crate::error::{Result, RosterError};
use crate::validation::{ValidationError, ValidationErrorKind};

/// All input records of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterInput {
    /// Calendar year.
    pub year: i32,
    /// Month number (1-12).
    pub month: u32,
    /// Public holidays.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Rotation anchor override.
    #[serde(default)]
    pub rotation_anchor: Option<NaiveDate>,
    /// Sectors with their positions.
    #[serde(default)]
    pub sectors: Vec<Sector>,
    /// Nurse pool.
    #[serde(default)]
    pub nurses: Vec<Nurse>,
    /// Staffing rules.
    #[serde(default)]
    pub staffing: Vec<StaffingRequirement>,
    /// Pre-decided assignments.
    #[serde(default)]
    pub fixed_assignments: Vec<FixedAssignment>,
}

impl RosterInput {
    /// Builds the month described by this input.
    ///
    /// # Errors
    /// [`RosterError::InvalidInput`] for an invalid year/month pair.
    pub fn month(&self) -> Result<Month> {
        let month = Month::new(self.year, self.month).ok_or_else(|| {
            RosterError::InvalidInput(vec![ValidationError::new(
                ValidationErrorKind::DateOutsideMonth,
                format!("Invalid month {}-{}", self.year, self.month),
            )])
        })?;
        let month = month.with_holidays(self.holidays.clone());
        Ok(match self.rotation_anchor {
            Some(anchor) => month.with_rotation_anchor(anchor),
            None => month,
        })
    }

    /// Fills missing quotas with [`Nurse::shifts_to_work`] for every nurse
    /// that has a rotation cycle.
    pub fn with_derived_quotas(mut self) -> Result<Self> {
        let month = self.month()?;
        for nurse in &mut self.nurses {
            if nurse.required_shifts.is_none() && nurse.cycle.is_some() {
                nurse.required_shifts = Some(nurse.shifts_to_work(&month));
            }
        }
        Ok(self)
    }

    /// Validates the records and builds the schedule aggregate.
    pub fn into_schedule(self) -> Result<Schedule> {
        let month = self.month()?;
        Schedule::new(
            month,
            self.sectors,
            self.nurses,
            &self.staffing,
            self.fixed_assignments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftKind;

    const INPUT: &str = r#"{
        "year": 2022,
        "month": 1,
        "holidays": ["2022-01-01", "2022-01-02", "2022-01-24"],
        "sectors": [
            {"id": "G", "name": "General", "positions": [{"id": "G1", "skill": "general"}]}
        ],
        "nurses": [
            {"id": "A", "skills": ["general"], "cycle": 3},
            {"id": "B", "skills": ["general"], "cycle": 3, "required_shifts": 1}
        ],
        "staffing": [
            {"position_id": "G1", "date": "2022-01-01", "kind": "day", "count": 2}
        ]
    }"#;

    #[test]
    fn test_into_schedule_from_json() {
        let input: RosterInput = serde_json::from_str(INPUT).unwrap();
        let schedule = input.into_schedule().unwrap();
        assert_eq!(schedule.nurses().len(), 2);
        assert_eq!(schedule.total_demand(), 2);
        assert_eq!(schedule.positions()[0].sector_id, "G");
        let slot = schedule
            .timeslot(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), ShiftKind::Day)
            .unwrap();
        assert_eq!(slot.required("G1"), 2);
    }

    #[test]
    fn test_derived_quotas() {
        let input: RosterInput = serde_json::from_str(INPUT).unwrap();
        let input = input.with_derived_quotas().unwrap();
        // 160 working hours -> 14 shifts; explicit quotas are kept.
        assert_eq!(input.nurses[0].required_shifts, Some(14));
        assert_eq!(input.nurses[1].required_shifts, Some(1));
    }

    #[test]
    fn test_invalid_month() {
        let mut input: RosterInput = serde_json::from_str(INPUT).unwrap();
        input.month = 13;
        assert!(matches!(input.into_schedule(), Err(RosterError::InvalidInput(_))));
    }
}
