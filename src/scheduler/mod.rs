//! Rostering pipeline and KPI evaluation.
//!
//! `RosterScheduler` wires model building, solving and extraction into one
//! timed run. `RosterKpi` computes roster quality metrics: fairness spread,
//! quota deviation, honored requests and coverage.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

mod kpi;
mod pipeline;

pub use kpi::RosterKpi;
pub use pipeline::{PhaseTimings, RosterOutput, RosterRun, RosterScheduler};
