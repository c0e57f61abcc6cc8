//! Build, solve and extract as one run.
//!
//! # Phases
//! 1. `build`: [`RosterModelBuilder`] encodes the schedule.
//! 2. `solve`: the [`SolverAdapter`] runs the engine under the configured
//!    budget.
//! 3. `extract`: the assignment becomes shifts on the schedule.
//!
//! Each phase runs inside [`timed`], which emits one `tracing` event with
//! its elapsed time. Solver verdicts other than a usable assignment become
//! typed errors; relaxing the model is left to the caller.

use std::time::Duration;

use serde::Serialize;

use super::RosterKpi;
use crate::config::RosterConfig;
use crate::cp::{extract, Engine, MicroLpEngine, ProblemInstance, RosterModelBuilder, SolveOutcome, SolverAdapter};
use crate::error::{Result, RosterError};
use crate::models::{LeaveRecord, Schedule, ShiftRecord};
use crate::timing::timed;

/// Wall-clock time spent per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTimings {
    /// Model construction.
    pub build: Duration,
    /// Engine run.
    pub solve: Duration,
    /// Shift extraction.
    pub extract: Duration,
}

/// A successful run.
#[derive(Debug, Clone)]
pub struct RosterRun {
    /// The schedule with its shifts attached.
    pub schedule: Schedule,
    /// The instance that was solved.
    pub instance: ProblemInstance,
    /// Objective value of the returned roster.
    pub objective: f64,
    /// Whether the engine proved optimality.
    pub optimal: bool,
    /// Phase timings.
    pub timings: PhaseTimings,
}

impl RosterRun {
    /// Quality metrics of the roster.
    pub fn kpi(&self) -> RosterKpi {
        RosterKpi::calculate(&self.schedule)
    }

    /// Output records for the roster sink.
    pub fn output(&self) -> RosterOutput {
        RosterOutput {
            month: self.schedule.month().to_string(),
            shifts: self.schedule.shift_records(),
            leave: self.schedule.leave_records(),
            kpi: self.kpi(),
            artifact_link: None,
        }
    }
}

/// Everything the publishing side needs from a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterOutput {
    /// Month label, `YYYY-MM`.
    pub month: String,
    /// Worked shifts.
    pub shifts: Vec<ShiftRecord>,
    /// Planned leave on working days.
    pub leave: Vec<LeaveRecord>,
    /// Quality metrics.
    pub kpi: RosterKpi,
    /// Where the published roster lives, once known.
    pub artifact_link: Option<String>,
}

impl RosterOutput {
    /// Sets the published artifact link.
    pub fn with_artifact_link(mut self, link: impl Into<String>) -> Self {
        self.artifact_link = Some(link.into());
        self
    }
}

/// Runs the rostering pipeline.
///
/// # Example
/// ```no_run
/// use u_roster::config::RosterConfig;
/// use u_roster::models::RosterInput;
/// use u_roster::scheduler::RosterScheduler;
/// # fn main() -> u_roster::Result<()> {
/// let input: RosterInput = serde_json::from_str(&std::fs::read_to_string("january.json")?)
///     .map_err(|e| u_roster::RosterError::Config(e.to_string()))?;
/// let run = RosterScheduler::new(RosterConfig::default()).run(input.into_schedule()?)?;
/// println!("{} shifts", run.schedule.shifts().len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RosterScheduler<E = MicroLpEngine> {
    config: RosterConfig,
    adapter: SolverAdapter<E>,
}

impl RosterScheduler<MicroLpEngine> {
    /// Creates a scheduler with the default engine.
    pub fn new(config: RosterConfig) -> Self {
        Self {
            config,
            adapter: SolverAdapter::default(),
        }
    }
}

impl<E: Engine + 'static> RosterScheduler<E> {
    /// Swaps the engine.
    pub fn with_engine<F: Engine + 'static>(self, engine: F) -> RosterScheduler<F> {
        RosterScheduler {
            config: self.config,
            adapter: SolverAdapter::new(engine),
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Builds, solves and extracts.
    ///
    /// # Errors
    /// - [`RosterError::SolverInfeasible`] with the instance attached.
    /// - [`RosterError::SolverTimeout`] with the best roster so far, if any.
    /// - [`RosterError::Engine`] / [`RosterError::InconsistentAssignment`]
    ///   on engine or encoding failures.
    pub fn run(&self, schedule: Schedule) -> Result<RosterRun> {
        let (instance, build) = timed("build", || RosterModelBuilder::new(&self.config).build(&schedule));
        let (outcome, solve) = timed("solve", || self.adapter.solve(&instance, self.config.time_budget()));

        let (assignment, objective, optimal) = match outcome? {
            SolveOutcome::Optimal {
                assignment,
                objective,
            } => (assignment, objective, true),
            SolveOutcome::Feasible {
                assignment,
                objective,
            } => (assignment, objective, false),
            SolveOutcome::Infeasible => {
                tracing::warn!(
                    month = %schedule.month(),
                    constraints = instance.constraints.len(),
                    "roster is infeasible"
                );
                return Err(RosterError::SolverInfeasible {
                    instance: Box::new(instance),
                });
            }
            SolveOutcome::Unknown { assignment, .. } => {
                let partial = assignment.and_then(|a| match extract(schedule, &instance, &a) {
                    Ok(s) => Some(Box::new(s)),
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding unusable incumbent");
                        None
                    }
                });
                return Err(RosterError::SolverTimeout { partial });
            }
        };

        let (solved, extract_time) = timed("extract", || extract(schedule, &instance, &assignment));
        let schedule = solved?;

        tracing::info!(
            month = %schedule.month(),
            shifts = schedule.shifts().len(),
            objective,
            optimal,
            "roster solved"
        );
        Ok(RosterRun {
            schedule,
            instance,
            objective,
            optimal,
            timings: PhaseTimings {
                build,
                solve,
                extract: extract_time,
            },
        })
    }
}
