//! Solving engines and the time-budgeted adapter.
//!
//! [`Engine`] is the seam between the vendor-neutral [`ProblemInstance`]
//! and a concrete solver. [`MicroLpEngine`] translates the instance into a
//! `good_lp` model solved by the pure-Rust `microlp` MILP backend; every
//! engine-specific type stays inside this module.
//!
//! [`SolverAdapter`] runs an engine on a worker thread with an owned copy
//! of the instance and stops waiting when the wall-clock budget expires.
//! On timeout the adapter cancels the shared [`SolveBudget`] and returns;
//! the worker exits at the engine's next cancellation check and its late
//! result is dropped. [`SolverAdapter::active_workers`] counts workers
//! that have not exited yet.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel,
};

use super::problem::{ProblemInstance, Sense, Term, VariableAssignment, VariableDomain};
use crate::error::{Result, RosterError};
use crate::timing::millis;

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Proven optimal.
    Optimal {
        /// Variable values.
        assignment: VariableAssignment,
        /// Objective value (including the constant offset).
        objective: f64,
    },
    /// Feasible but not proven optimal.
    Feasible {
        /// Variable values.
        assignment: VariableAssignment,
        /// Objective value (including the constant offset).
        objective: f64,
    },
    /// Proven infeasible.
    Infeasible,
    /// Neither proven; `timed_out` if the budget ran out.
    Unknown {
        /// Whether the budget expired.
        timed_out: bool,
        /// Best incumbent, if the engine reported one.
        assignment: Option<VariableAssignment>,
    },
}

impl SolveOutcome {
    /// Whether a usable assignment was found.
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Optimal { .. } | Self::Feasible { .. })
    }

    /// The assignment, if any.
    pub fn assignment(&self) -> Option<&VariableAssignment> {
        match self {
            Self::Optimal { assignment, .. } | Self::Feasible { assignment, .. } => Some(assignment),
            Self::Unknown { assignment, .. } => assignment.as_ref(),
            Self::Infeasible => None,
        }
    }

    /// The objective value, if an assignment was found.
    pub fn objective(&self) -> Option<f64> {
        match self {
            Self::Optimal { objective, .. } | Self::Feasible { objective, .. } => Some(*objective),
            _ => None,
        }
    }

    /// Short status label for logs.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Optimal { .. } => "optimal",
            Self::Feasible { .. } => "feasible",
            Self::Infeasible => "infeasible",
            Self::Unknown { timed_out: true, .. } => "timeout",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// Wall-clock allowance for one solve.
///
/// Clones share the cancellation flag, so the adapter can stop a worker
/// that is still running after the adapter gave up waiting.
#[derive(Debug, Clone)]
pub struct SolveBudget {
    limit: Duration,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl SolveBudget {
    /// Starts a budget of `limit` from now.
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            deadline: Instant::now().checked_add(limit),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The full allowance.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Time left before the deadline; zero once cancelled.
    pub fn remaining(&self) -> Duration {
        if self.cancelled.load(Ordering::Acquire) {
            return Duration::ZERO;
        }
        self.deadline
            .map_or(self.limit, |d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the engine should stop: cancelled, or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Asks every holder of this budget to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// A solving engine.
///
/// Engines should poll [`SolveBudget::is_cancelled`] between units of
/// work and return [`SolveOutcome::Unknown`] with `timed_out = true` once
/// it turns true. The adapter stops waiting at the deadline either way.
pub trait Engine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Solves an instance.
    ///
    /// # Errors
    /// [`RosterError::Engine`] for failures other than infeasibility
    /// (unbounded model, internal solver error).
    fn solve(&self, instance: &ProblemInstance, budget: &SolveBudget) -> Result<SolveOutcome>;
}

fn cancelled_outcome() -> SolveOutcome {
    SolveOutcome::Unknown {
        timed_out: true,
        assignment: None,
    }
}

/// `good_lp` + `microlp` engine.
///
/// microlp runs branch and bound to completion, so a returned solution is
/// reported as [`SolveOutcome::Optimal`]. The backend takes no time limit
/// and cannot be interrupted: the budget is checked before the model is
/// built and again before branch and bound starts. A worker cancelled
/// during branch and bound exits when that search returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpEngine;

impl MicroLpEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for MicroLpEngine {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, instance: &ProblemInstance, budget: &SolveBudget) -> Result<SolveOutcome> {
        if budget.is_cancelled() {
            return Ok(cancelled_outcome());
        }
        // Constant-only rows are decided here; the backend expects variables.
        for c in instance.constraints.iter().filter(|c| c.terms.is_empty()) {
            let holds = match c.sense {
                Sense::Eq => c.rhs.abs() <= f64::EPSILON,
                Sense::Le => c.rhs >= 0.0,
                Sense::Ge => c.rhs <= 0.0,
            };
            if !holds {
                tracing::debug!(constraint = %c, "constant constraint cannot hold");
                return Ok(SolveOutcome::Infeasible);
            }
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<good_lp::Variable> = instance
            .variables
            .iter()
            .map(|v| {
                let def = variable().name(v.name.clone());
                match v.domain {
                    VariableDomain::Binary => vars.add(def.binary()),
                    VariableDomain::Continuous { min, max: Some(max) } => vars.add(def.min(min).max(max)),
                    VariableDomain::Continuous { min, max: None } => vars.add(def.min(min)),
                }
            })
            .collect();

        let linear = |terms: &[Term]| -> Expression {
            terms.iter().map(|t| t.coef * handles[t.var.0]).sum()
        };

        let mut model = vars.minimise(linear(&instance.objective.terms)).using(microlp);
        for c in instance.constraints.iter().filter(|c| !c.terms.is_empty()) {
            let lhs = linear(&c.terms);
            model = model.with(match c.sense {
                Sense::Eq => constraint::eq(lhs, c.rhs),
                Sense::Le => constraint::leq(lhs, c.rhs),
                Sense::Ge => constraint::geq(lhs, c.rhs),
            });
        }

        if budget.is_cancelled() {
            tracing::debug!(instance = %instance.name, "budget spent while building the model");
            return Ok(cancelled_outcome());
        }
        match model.solve() {
            Ok(solution) => {
                let assignment =
                    VariableAssignment::new(handles.iter().map(|&h| solution.value(h)).collect());
                let objective = instance.evaluate(&assignment);
                Ok(SolveOutcome::Optimal {
                    assignment,
                    objective,
                })
            }
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(ResolutionError::Unbounded) => {
                Err(RosterError::Engine(format!("instance '{}' is unbounded", instance.name)))
            }
            Err(e) => Err(RosterError::Engine(e.to_string())),
        }
    }
}

/// Runs an engine under a wall-clock budget.
///
/// Clones share the engine and the worker count.
#[derive(Debug, Clone)]
pub struct SolverAdapter<E = MicroLpEngine> {
    engine: Arc<E>,
    active: Arc<AtomicUsize>,
}

/// Decrements the worker count when the worker exits, panics included.
struct WorkerGuard(Arc<AtomicUsize>);

impl WorkerGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(active))
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for SolverAdapter<MicroLpEngine> {
    fn default() -> Self {
        Self::new(MicroLpEngine)
    }
}

impl<E: Engine + 'static> SolverAdapter<E> {
    /// Wraps an engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Worker threads started by this adapter that have not exited yet.
    ///
    /// Nonzero after a timeout only while a cancelled engine is still
    /// finishing its current step.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Solves `instance` within `budget`.
    ///
    /// Returns [`SolveOutcome::Unknown`] with `timed_out = true` when the
    /// budget expires first, after cancelling the worker's budget. No
    /// constraint is relaxed automatically.
    ///
    /// # Errors
    /// Engine failures, or a worker that terminated without reporting.
    pub fn solve(&self, instance: &ProblemInstance, budget: Duration) -> Result<SolveOutcome> {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let owned = instance.clone();
        let started = Instant::now();
        let shared = SolveBudget::new(budget);
        let worker_budget = shared.clone();
        let guard = WorkerGuard::enter(&self.active);

        thread::Builder::new()
            .name("roster-solve".into())
            .spawn(move || {
                let _guard = guard;
                // The receiver is gone after a timeout; the late result is dropped.
                let _ = tx.send(engine.solve(&owned, &worker_budget));
            })?;

        let outcome = match rx.recv_timeout(budget) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                shared.cancel();
                tracing::warn!(
                    engine = self.engine.name(),
                    budget_ms = millis(budget),
                    "solve budget exhausted, worker cancelled"
                );
                cancelled_outcome()
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(RosterError::Engine(format!(
                    "{} worker terminated without a result",
                    self.engine.name()
                )));
            }
        };

        tracing::debug!(
            engine = self.engine.name(),
            status = outcome.status(),
            objective = outcome.objective(),
            elapsed_ms = millis(started.elapsed()),
            "solve finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::problem::VariableRole;

    /// Engine that never returns within any reasonable budget.
    struct SlowEngine;

    impl Engine for SlowEngine {
        fn name(&self) -> &str {
            "slow"
        }

        fn solve(&self, _instance: &ProblemInstance, _budget: &SolveBudget) -> Result<SolveOutcome> {
            thread::sleep(Duration::from_secs(5));
            Ok(SolveOutcome::Infeasible)
        }
    }

    /// Engine that works in small steps until its budget is cancelled.
    struct SteppingEngine;

    impl Engine for SteppingEngine {
        fn name(&self) -> &str {
            "stepping"
        }

        fn solve(&self, _instance: &ProblemInstance, budget: &SolveBudget) -> Result<SolveOutcome> {
            while !budget.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Ok(cancelled_outcome())
        }
    }

    struct PanickingEngine;

    impl Engine for PanickingEngine {
        fn name(&self) -> &str {
            "panicking"
        }

        fn solve(&self, _instance: &ProblemInstance, _budget: &SolveBudget) -> Result<SolveOutcome> {
            panic!("engine crashed");
        }
    }

    /// Polls until every worker of `adapter` has exited or `within` passes.
    fn workers_drain<E: Engine + 'static>(adapter: &SolverAdapter<E>, within: Duration) -> bool {
        let until = Instant::now() + within;
        while Instant::now() < until {
            if adapter.active_workers() == 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        adapter.active_workers() == 0
    }

    /// min 2a + 3b  s.t.  a + b = 1, a <= 0.
    fn pick_one() -> ProblemInstance {
        let mut p = ProblemInstance::new("pick-one");
        let a = p.add_variable("a", VariableDomain::Binary, VariableRole::Auxiliary);
        let b = p.add_variable("b", VariableDomain::Binary, VariableRole::Auxiliary);
        p.add_constraint("one", vec![Term::unit(a), Term::unit(b)], Sense::Eq, 1.0);
        p.add_constraint("no_a", vec![Term::unit(a)], Sense::Le, 0.0);
        p.add_objective_term(a, 2.0);
        p.add_objective_term(b, 3.0);
        p
    }

    #[test]
    fn test_microlp_optimal() {
        let adapter = SolverAdapter::default();
        let outcome = adapter.solve(&pick_one(), Duration::from_secs(10)).unwrap();
        assert!(outcome.is_feasible());
        assert_eq!(outcome.status(), "optimal");
        let assignment = outcome.assignment().unwrap();
        assert!(!assignment.is_set(crate::cp::VarId(0)));
        assert!(assignment.is_set(crate::cp::VarId(1)));
        assert!((outcome.objective().unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_microlp_infeasible() {
        let mut p = pick_one();
        p.add_constraint("no_b", vec![Term::unit(crate::cp::VarId(1))], Sense::Le, 0.0);
        let outcome = SolverAdapter::default().solve(&p, Duration::from_secs(10)).unwrap();
        assert_eq!(outcome, SolveOutcome::Infeasible);
        assert!(outcome.assignment().is_none());
    }

    #[test]
    fn test_constant_constraint_infeasible() {
        let mut p = pick_one();
        p.add_constraint("empty", vec![], Sense::Eq, 2.0);
        let outcome = MicroLpEngine.solve(&p, &SolveBudget::new(Duration::from_secs(1))).unwrap();
        assert_eq!(outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_constant_constraint_trivial() {
        let mut p = pick_one();
        p.add_constraint("empty", vec![], Sense::Le, 0.0);
        let outcome = MicroLpEngine.solve(&p, &SolveBudget::new(Duration::from_secs(1))).unwrap();
        assert!(outcome.is_feasible());
    }

    #[test]
    fn test_microlp_stops_on_cancelled_budget() {
        let budget = SolveBudget::new(Duration::from_secs(10));
        budget.cancel();
        assert_eq!(budget.remaining(), Duration::ZERO);
        let outcome = MicroLpEngine.solve(&pick_one(), &budget).unwrap();
        assert_eq!(outcome.status(), "timeout");
        assert!(outcome.assignment().is_none());
    }

    #[test]
    fn test_budget_deadline() {
        let unbounded = SolveBudget::new(Duration::MAX);
        assert!(!unbounded.is_cancelled());
        assert_eq!(unbounded.remaining(), Duration::MAX);

        let spent = SolveBudget::new(Duration::ZERO);
        assert!(spent.is_cancelled());

        let shared = SolveBudget::new(Duration::from_secs(10));
        let held_by_worker = shared.clone();
        shared.cancel();
        assert!(held_by_worker.is_cancelled());
        assert_eq!(held_by_worker.limit(), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_expires() {
        let adapter = SolverAdapter::new(SlowEngine);
        let started = Instant::now();
        let outcome = adapter.solve(&pick_one(), Duration::from_millis(50)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            outcome,
            SolveOutcome::Unknown {
                timed_out: true,
                assignment: None
            }
        );
        assert_eq!(outcome.status(), "timeout");
        // The sleeping engine never checks its budget, so its worker is abandoned.
        assert_eq!(adapter.active_workers(), 1);
    }

    #[test]
    fn test_timed_out_worker_exits() {
        let adapter = SolverAdapter::new(SteppingEngine);
        let outcome = adapter.solve(&pick_one(), Duration::from_millis(50)).unwrap();
        assert_eq!(outcome.status(), "timeout");
        assert!(workers_drain(&adapter, Duration::from_secs(2)));
    }

    #[test]
    fn test_finished_worker_is_not_counted() {
        let adapter = SolverAdapter::default();
        adapter.solve(&pick_one(), Duration::from_secs(10)).unwrap();
        assert!(workers_drain(&adapter, Duration::from_secs(2)));
    }

    #[test]
    fn test_worker_crash_is_engine_error() {
        let adapter = SolverAdapter::new(PanickingEngine);
        let err = adapter.solve(&pick_one(), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RosterError::Engine(_)));
        assert!(workers_drain(&adapter, Duration::from_secs(2)));
    }
}
