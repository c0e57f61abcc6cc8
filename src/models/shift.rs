//! Shift (solution) model.
//!
//! A shift is a concrete (nurse, time slot, position) assignment. Shifts
//! are only created by the solution extractor; the modelling stage works
//! with eligible triples, never with shifts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ShiftKind;

/// A decided assignment of a nurse to a position on a time slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Shift {
    /// Month-local slot index.
    pub slot: usize,
    /// Shift start date.
    pub date: NaiveDate,
    /// Day or night.
    pub kind: ShiftKind,
    /// Assigned nurse ID.
    pub nurse_id: String,
    /// Position ID.
    pub position_id: String,
    /// Sector owning the position (denormalized for output).
    pub sector_id: String,
    /// Assigned outside the nurse's rotation cycle (escape path).
    pub off_cycle: bool,
    /// Pre-decided by the input (fixed assignment).
    pub fixed: bool,
}

/// A pre-decided assignment supplied with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedAssignment {
    /// Nurse ID.
    pub nurse_id: String,
    /// Shift date.
    pub date: NaiveDate,
    /// Day or night.
    pub kind: ShiftKind,
    /// Position ID.
    pub position_id: String,
}

/// Output record for one worked shift, keyed for the roster sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    /// Shift date.
    pub date: NaiveDate,
    /// Day or night.
    pub kind: ShiftKind,
    /// Position ID.
    pub position_id: String,
    /// Sector ID.
    pub sector_id: String,
    /// Nurse ID.
    pub nurse_id: String,
}

/// Output record for a planned leave day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    /// Leave date (a working day of the month).
    pub date: NaiveDate,
    /// Nurse ID.
    pub nurse_id: String,
    /// Roster notation code.
    pub code: String,
}

/// Roster code for planned leave ("concediu de odihna").
pub const LEAVE_CODE: &str = "CO";

impl FixedAssignment {
    /// Creates a fixed assignment.
    pub fn new(
        nurse_id: impl Into<String>,
        date: NaiveDate,
        kind: ShiftKind,
        position_id: impl Into<String>,
    ) -> Self {
        Self {
            nurse_id: nurse_id.into(),
            date,
            kind,
            position_id: position_id.into(),
        }
    }
}

impl From<&Shift> for ShiftRecord {
    fn from(shift: &Shift) -> Self {
        Self {
            date: shift.date,
            kind: shift.kind,
            position_id: shift.position_id.clone(),
            sector_id: shift.sector_id.clone(),
            nurse_id: shift.nurse_id.clone(),
        }
    }
}
