//! Error types for u-roster.

use chrono::NaiveDate;
use thiserror::Error;

use crate::cp::ProblemInstance;
use crate::models::{Schedule, ShiftKind};
use crate::validation::ValidationError;

/// Result type for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors surfaced by the rostering pipeline.
///
/// Solver outcomes are typed so that the caller picks the recovery
/// strategy (loosen the quota tolerance, extend the time budget).
#[derive(Debug, Error)]
pub enum RosterError {
    /// Input records failed structural validation.
    #[error("invalid input ({} error(s)): {}", .0.len(), join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    /// A required position cannot be staffed from the eligible pool.
    #[error(
        "infeasible input: {date} {kind:?} needs {required} nurse(s) for position '{position}', \
         only {eligible} eligible"
    )]
    InfeasibleInput {
        /// Slot date.
        date: NaiveDate,
        /// Slot kind.
        kind: ShiftKind,
        /// Position ID.
        position: String,
        /// Required staff count.
        required: u32,
        /// Eligible nurses (including fixed assignments).
        eligible: usize,
    },

    /// The engine proved that no assignment satisfies the hard constraints.
    ///
    /// Carries the full problem instance for caller-driven relaxation.
    #[error("solver proved the roster infeasible ({} constraints)", .instance.constraints.len())]
    SolverInfeasible {
        /// The instance that was proven infeasible.
        instance: Box<ProblemInstance>,
    },

    /// The time budget ran out before optimality or infeasibility was proven.
    #[error("solver exhausted its time budget{}", partial_note(.partial))]
    SolverTimeout {
        /// Best roster found before the deadline, if the engine reported one.
        partial: Option<Box<Schedule>>,
    },

    /// Extracted shifts violate a hard invariant (encoding bug).
    #[error("inconsistent assignment: {0}")]
    InconsistentAssignment(String),

    /// The engine failed for a reason other than infeasibility.
    #[error("engine error: {0}")]
    Engine(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration or input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn partial_note(partial: &Option<Box<Schedule>>) -> &'static str {
    if partial.is_some() {
        " (best roster so far attached)"
    } else {
        ""
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
