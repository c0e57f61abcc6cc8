//! Rostering domain models.
//!
//! Provides the data types for representing a monthly nurse rostering
//! problem and its solution.
//!
//! # Domain Mappings
//!
//! | u-roster | Emergency department | Generic scheduling |
//! |----------|----------------------|--------------------|
//! | Nurse | Nurse | Resource |
//! | Sector / Position | Triage, resuscitation, ... | Work center / role |
//! | TimeSlot | Day (Z) or night (N) shift | Time bucket |
//! | RotationCycle | 12/24/12/48 group | Resource calendar |
//! | Shift | Roster cell | Assignment |
//! | Schedule | Monthly roster | Schedule |

mod input;
mod month;
mod nurse;
mod rotation;
mod schedule;
mod sector;
mod shift;

pub use input::RosterInput;
pub use month::{overlaps_leave, Month, ShiftKind, TimeSlot, DAILY_NORM_HOURS, SHIFT_HOURS};
pub use nurse::{Nurse, Preference, SectorLimit, ShiftRequest};
pub use rotation::{
    default_anchor, global_slot_index, RotationCycle, CYCLE_SUCCESSION, DEFAULT_ROTATION_ANCHOR,
    MIN_SLOT_GAP,
};
pub use schedule::{Schedule, StaffingRequirement};
pub use sector::{Position, Sector};
pub use shift::{FixedAssignment, LeaveRecord, Shift, ShiftRecord, LEAVE_CODE};
