//! Nurse rostering framework for the U-Engine ecosystem.
//!
//! Assigns 12-hour shifts to a pool of nurses across one calendar month,
//! honoring staffing, rotation, leave and quota rules while balancing the
//! workload. The crate covers the domain model, the translation of roster
//! rules into a vendor-neutral linear problem, a time-budgeted solving
//! adapter, and the extraction of shifts from a solution.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Month`, `TimeSlot`, `RotationCycle`,
//!   `Sector`, `Position`, `Nurse`, `Shift`, and the `Schedule` aggregate
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling
//!   references, out-of-month dates, illegal fixed assignments)
//! - **`cp`**: Model builder, `Engine` seam, solver adapter, extractor
//! - **`distribution`**: Even assignment of rotation cycles to nurses
//! - **`scheduler`**: Timed build → solve → extract pipeline and KPIs
//! - **`config`**: TOML-loadable run configuration
//!
//! # Architecture
//!
//! Input records → `Schedule::new` (validation, derived lookups,
//! feasibility pre-check) → `RosterModelBuilder::build` →
//! `SolverAdapter::solve` → `extract` → output records and KPIs.
//! Spreadsheet I/O and credentials belong to the caller.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

pub mod config;
pub mod cp;
pub mod distribution;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod timing;
pub mod validation;

pub use error::{Result, RosterError};
