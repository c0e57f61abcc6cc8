//! Rotation cycle distribution.
//!
//! Before a month can be rostered every nurse needs a rotation cycle. The
//! distribution model spreads the pool over the four cycles so each cycle
//! can staff its own slots:
//!
//! - every nurse gets exactly one cycle; a preset cycle is kept,
//! - each cycle gets at least `⌊N/4⌋` nurses,
//! - for every essential skill, each cycle gets at least `⌊N_skill/4⌋` of
//!   the nurses holding it,
//! - optionally, versatile nurses (holding at least a given number of
//!   skills) are spread the same way.
//!
//! The objective minimizes the largest cycle, which breaks ties toward an
//! even split.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::cp::{
    Engine, ProblemInstance, Sense, SolveOutcome, SolverAdapter, Term, VarId, VariableAssignment,
    VariableDomain, VariableRole,
};
use crate::error::{Result, RosterError};
use crate::models::{Nurse, RotationCycle};

/// Builds the cycle distribution instance for a nurse pool.
#[derive(Debug, Clone)]
pub struct CycleDistributionBuilder<'a> {
    nurses: &'a [Nurse],
    essential_skills: Vec<String>,
    versatile_min_skills: Option<usize>,
}

impl<'a> CycleDistributionBuilder<'a> {
    /// Creates a builder over a nurse pool.
    pub fn new(nurses: &'a [Nurse]) -> Self {
        Self {
            nurses,
            essential_skills: Vec::new(),
            versatile_min_skills: None,
        }
    }

    /// Skills that must be spread across cycles.
    pub fn with_essential_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.essential_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Also spreads nurses holding at least `min_skills` skills.
    pub fn with_versatile_nurses(mut self, min_skills: usize) -> Self {
        self.versatile_min_skills = Some(min_skills);
        self
    }

    /// Builds the instance: one binary per (nurse, cycle).
    pub fn build(&self) -> ProblemInstance {
        let mut instance = ProblemInstance::new("cycle-distribution");
        let mut vars: BTreeMap<(usize, RotationCycle), VarId> = BTreeMap::new();

        for (n, nurse) in self.nurses.iter().enumerate() {
            for cycle in RotationCycle::ALL {
                let var = instance.add_variable(
                    format!("y[{},{}]", nurse.id, cycle),
                    VariableDomain::Binary,
                    VariableRole::CycleChoice {
                        nurse_id: nurse.id.clone(),
                        cycle,
                    },
                );
                vars.insert((n, cycle), var);
            }
        }

        for (n, nurse) in self.nurses.iter().enumerate() {
            let terms = RotationCycle::ALL
                .iter()
                .filter_map(|c| vars.get(&(n, *c)).copied().map(Term::unit))
                .collect();
            instance.add_constraint(format!("one_cycle[{}]", nurse.id), terms, Sense::Eq, 1.0);
            if let Some(preset) = nurse.cycle {
                if let Some(&var) = vars.get(&(n, preset)) {
                    instance.add_constraint(
                        format!("preset[{}]", nurse.id),
                        vec![Term::unit(var)],
                        Sense::Eq,
                        1.0,
                    );
                }
            }
        }

        let everyone: Vec<usize> = (0..self.nurses.len()).collect();
        self.add_spread(&mut instance, &vars, "all", &everyone);

        for skill in &self.essential_skills {
            let group: Vec<usize> = self.members(|n| n.has_skill(skill));
            self.add_spread(&mut instance, &vars, skill, &group);
        }
        if let Some(min_skills) = self.versatile_min_skills {
            let group = self.members(|n| n.skills.len() >= min_skills);
            self.add_spread(&mut instance, &vars, "versatile", &group);
        }

        let peak = instance.add_variable(
            "peak",
            VariableDomain::Continuous { min: 0.0, max: None },
            VariableRole::Auxiliary,
        );
        for cycle in RotationCycle::ALL {
            let mut terms: Vec<Term> = everyone
                .iter()
                .filter_map(|&n| vars.get(&(n, cycle)).copied().map(Term::unit))
                .collect();
            terms.push(Term::new(peak, -1.0));
            instance.add_constraint(format!("peak[{cycle}]"), terms, Sense::Le, 0.0);
        }
        instance.add_objective_term(peak, 1.0);

        instance
    }

    /// Solves the distribution with an adapter.
    ///
    /// # Errors
    /// [`RosterError::SolverInfeasible`] when presets make an even spread
    /// impossible, [`RosterError::SolverTimeout`] when the budget runs out.
    pub fn solve<E: Engine + 'static>(
        &self,
        adapter: &SolverAdapter<E>,
        budget: Duration,
    ) -> Result<BTreeMap<String, RotationCycle>> {
        let instance = self.build();
        match adapter.solve(&instance, budget)? {
            SolveOutcome::Optimal { assignment, .. } | SolveOutcome::Feasible { assignment, .. } => {
                let cycles = decode(&instance, &assignment)?;
                tracing::info!(nurses = cycles.len(), "rotation cycles distributed");
                Ok(cycles)
            }
            SolveOutcome::Infeasible => Err(RosterError::SolverInfeasible {
                instance: Box::new(instance),
            }),
            SolveOutcome::Unknown { .. } => Err(RosterError::SolverTimeout { partial: None }),
        }
    }

    fn members(&self, pred: impl Fn(&Nurse) -> bool) -> Vec<usize> {
        self.nurses
            .iter()
            .enumerate()
            .filter(|(_, n)| pred(n))
            .map(|(i, _)| i)
            .collect()
    }

    fn add_spread(
        &self,
        instance: &mut ProblemInstance,
        vars: &BTreeMap<(usize, RotationCycle), VarId>,
        group: &str,
        members: &[usize],
    ) {
        let min = members.len() / 4;
        if min == 0 {
            return;
        }
        for cycle in RotationCycle::ALL {
            let terms = members
                .iter()
                .filter_map(|&n| vars.get(&(n, cycle)).copied().map(Term::unit))
                .collect();
            instance.add_constraint(
                format!("spread[{group},{cycle}]"),
                terms,
                Sense::Ge,
                min as f64,
            );
        }
    }
}

/// Reads the chosen cycle of every nurse from an assignment.
///
/// # Errors
/// [`RosterError::InconsistentAssignment`] on a length mismatch or a nurse
/// with zero or several chosen cycles.
pub fn decode(
    instance: &ProblemInstance,
    assignment: &VariableAssignment,
) -> Result<BTreeMap<String, RotationCycle>> {
    if assignment.len() != instance.num_variables() {
        return Err(RosterError::InconsistentAssignment(format!(
            "assignment has {} value(s), instance has {}",
            assignment.len(),
            instance.num_variables()
        )));
    }
    let mut chosen: BTreeMap<String, Vec<RotationCycle>> = BTreeMap::new();
    for (i, v) in instance.variables.iter().enumerate() {
        if let VariableRole::CycleChoice { nurse_id, cycle } = &v.role {
            let entry = chosen.entry(nurse_id.clone()).or_default();
            if assignment.is_set(VarId(i)) {
                entry.push(*cycle);
            }
        }
    }
    chosen
        .into_iter()
        .map(|(nurse_id, cycles)| match cycles.as_slice() {
            [cycle] => Ok((nurse_id, *cycle)),
            _ => Err(RosterError::InconsistentAssignment(format!(
                "nurse '{nurse_id}' has {} chosen cycle(s)",
                cycles.len()
            ))),
        })
        .collect()
}

/// Sets each nurse's cycle from a decoded distribution.
pub fn apply_cycles(nurses: &mut [Nurse], cycles: &BTreeMap<String, RotationCycle>) {
    for nurse in nurses {
        if let Some(cycle) = cycles.get(&nurse.id) {
            nurse.cycle = Some(*cycle);
        }
    }
}
