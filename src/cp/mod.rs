//! Constraint formulation and solving.
//!
//! Bridges the rostering domain to linear solving engines:
//!
//! 1. [`RosterModelBuilder`] translates a [`Schedule`](crate::models::Schedule)
//!    into a vendor-neutral [`ProblemInstance`].
//! 2. [`SolverAdapter`] runs an [`Engine`] on the instance under a
//!    wall-clock budget and reports a [`SolveOutcome`].
//! 3. [`extract`] turns the winning [`VariableAssignment`] into shifts.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use u_roster::config::RosterConfig;
//! use u_roster::cp::{extract, RosterModelBuilder, SolverAdapter};
//! # fn run(schedule: u_roster::models::Schedule) -> u_roster::Result<()> {
//! let instance = RosterModelBuilder::new(&RosterConfig::default()).build(&schedule);
//! let outcome = SolverAdapter::default().solve(&instance, Duration::from_secs(60))?;
//! if let Some(assignment) = outcome.assignment() {
//!     let solved = extract(schedule, &instance, assignment)?;
//!     println!("{} shifts", solved.shifts().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Reference
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Wolsey (1998), "Integer Programming"

mod builder;
mod engine;
mod extract;
mod problem;

pub use builder::RosterModelBuilder;
pub use engine::{Engine, MicroLpEngine, SolveBudget, SolveOutcome, SolverAdapter};
pub use extract::extract;
pub use problem::{
    AssignmentKey, AssignmentOrigin, LinearConstraint, Objective, ProblemInstance, Sense, Term,
    VarId, Variable, VariableAssignment, VariableDomain, VariableRole, FEASIBILITY_EPS,
};
