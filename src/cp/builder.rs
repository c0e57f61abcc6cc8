//! Roster model builder.
//!
//! Translates a [`Schedule`] into a [`ProblemInstance`]. Rotation cycles,
//! skills and leave are enforced structurally: a binary variable exists
//! only for an admitted (nurse, slot, position) triple. Everything else is
//! a linear constraint or an objective term.
//!
//! # Hard Constraints
//! | Label | Rule |
//! |-------|------|
//! | `cover[s,p]` | Σ nurses on (slot, position) = required count |
//! | `one_shift[n,s]` | a nurse fills at most one position per slot |
//! | `rest[n,s]` | at most one shift in any three consecutive slots |
//! | `quota[n]` | shift count within `quota ± tolerance` |
//! | `sector_min[n,k]`, `sector_max[n,k]` | per-sector shift bounds |
//! | `fixed[n,s,p]` | pre-decided assignment is worked |
//! | `dev_lo[n]`, `dev_hi[n]` | linearization of the fairness deviation |
//!
//! # Objective
//! Minimize `fairness * Σ|count_n - avg| + unmet_request * (unmet requests)
//! + escape_path * (escape assignments)`, where `avg` is total demand over
//! the nurses that have at least one admitted triple.
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering",
//! J. of Scheduling 7(6)

use std::collections::BTreeMap;

use crate::config::{ObjectiveWeights, RosterConfig};
use crate::models::{Preference, Schedule, MIN_SLOT_GAP};

use super::problem::{
    AssignmentKey, AssignmentOrigin, ProblemInstance, Sense, Term, VarId, VariableDomain,
    VariableRole,
};

/// An admitted triple of one nurse.
#[derive(Debug, Clone, Copy)]
struct Admitted {
    slot: usize,
    position: usize,
    var: VarId,
    origin: AssignmentOrigin,
}

/// Builds roster problem instances.
///
/// `build` is pure: the same schedule and configuration always yield an
/// equal instance.
#[derive(Debug, Clone)]
pub struct RosterModelBuilder {
    quota_tolerance: u32,
    allow_escape_path: bool,
    weights: ObjectiveWeights,
}

impl RosterModelBuilder {
    /// Creates a builder from the run configuration.
    pub fn new(config: &RosterConfig) -> Self {
        Self {
            quota_tolerance: config.quota_tolerance,
            allow_escape_path: config.allow_escape_path,
            weights: config.weights.clone(),
        }
    }

    /// Declares variables and encodes every rule for the schedule.
    pub fn build(&self, schedule: &Schedule) -> ProblemInstance {
        let mut instance = ProblemInstance::new(format!("roster-{}", schedule.month()));
        let mut by_nurse: Vec<Vec<Admitted>> = vec![Vec::new(); schedule.nurses().len()];
        let mut by_cover: BTreeMap<(usize, usize), Vec<VarId>> = BTreeMap::new();

        for ((n, slot, p), origin) in self.admitted_triples(schedule) {
            let nurse = &schedule.nurses()[n];
            let position = &schedule.positions()[p];
            let var = instance.add_variable(
                format!("x[{},{},{}]", nurse.id, slot, position.id),
                VariableDomain::Binary,
                VariableRole::Assignment(AssignmentKey {
                    nurse_id: nurse.id.clone(),
                    slot,
                    position_id: position.id.clone(),
                    origin,
                }),
            );
            by_nurse[n].push(Admitted {
                slot,
                position: p,
                var,
                origin,
            });
            by_cover.entry((slot, p)).or_default().push(var);
        }

        add_coverage(&mut instance, schedule, &by_cover);
        for (n, admitted) in by_nurse.iter().enumerate() {
            self.add_nurse_constraints(&mut instance, schedule, n, admitted);
        }
        self.add_fairness(&mut instance, schedule, &by_nurse);
        self.add_requests(&mut instance, schedule, &by_nurse);
        self.add_escape_penalties(&mut instance, &by_nurse);

        tracing::debug!(
            month = %schedule.month(),
            variables = instance.num_variables(),
            constraints = instance.constraints.len(),
            "roster model built"
        );
        instance
    }

    /// Admitted (nurse, slot, position) triples in deterministic order.
    ///
    /// Fixed assignments override the origin of a cycle triple.
    fn admitted_triples(&self, s: &Schedule) -> BTreeMap<(usize, usize, usize), AssignmentOrigin> {
        let mut triples = BTreeMap::new();
        for ts in s.timeslots() {
            for position_id in ts.requirements.keys() {
                let Some(p) = s.position_idx(position_id) else {
                    continue;
                };
                for &n in s.eligible_nurse_indices(ts.index, p) {
                    triples.insert((n, ts.index, p), AssignmentOrigin::Cycle);
                }
            }
        }

        if self.allow_escape_path {
            for (n, nurse) in s.nurses().iter().enumerate() {
                for &slot in s.escape_slot_indices(n) {
                    for position_id in s.timeslots()[slot].requirements.keys() {
                        let Some(p) = s.position_idx(position_id) else {
                            continue;
                        };
                        if nurse.has_skill(&s.positions()[p].skill) {
                            triples.entry((n, slot, p)).or_insert(AssignmentOrigin::Escape);
                        }
                    }
                }
            }
        }

        for fa in s.fixed_assignments() {
            if let (Some(n), Some(slot), Some(p)) = (
                s.nurse_idx(&fa.nurse_id),
                s.month().slot_index(fa.date, fa.kind),
                s.position_idx(&fa.position_id),
            ) {
                triples.insert((n, slot, p), AssignmentOrigin::Fixed);
            }
        }
        triples
    }

    fn add_nurse_constraints(
        &self,
        instance: &mut ProblemInstance,
        schedule: &Schedule,
        n: usize,
        admitted: &[Admitted],
    ) {
        let nurse = &schedule.nurses()[n];

        let mut by_slot: BTreeMap<usize, Vec<VarId>> = BTreeMap::new();
        for a in admitted {
            by_slot.entry(a.slot).or_default().push(a.var);
        }

        for (slot, vars) in &by_slot {
            if vars.len() > 1 {
                instance.add_constraint(
                    format!("one_shift[{},{slot}]", nurse.id),
                    units(vars),
                    Sense::Le,
                    1.0,
                );
            }
        }

        // A window starting at an occupied slot dominates every window that
        // starts earlier and reaches no further.
        let mut covered_until: Option<usize> = None;
        for &start in by_slot.keys() {
            let window: Vec<(usize, &Vec<VarId>)> = by_slot
                .range(start..start + MIN_SLOT_GAP)
                .map(|(s, v)| (*s, v))
                .collect();
            let Some(&(last, _)) = window.last() else {
                continue;
            };
            if window.len() < 2 || covered_until.is_some_and(|end| last <= end) {
                continue;
            }
            covered_until = Some(last);
            let vars: Vec<VarId> = window.iter().flat_map(|(_, v)| v.iter().copied()).collect();
            instance.add_constraint(format!("rest[{},{start}]", nurse.id), units(&vars), Sense::Le, 1.0);
        }

        let all: Vec<VarId> = admitted.iter().map(|a| a.var).collect();
        if let Some(quota) = nurse.required_shifts {
            let tol = self.quota_tolerance;
            if tol == 0 {
                instance.add_constraint(format!("quota[{}]", nurse.id), units(&all), Sense::Eq, f64::from(quota));
            } else {
                let lo = quota.saturating_sub(tol);
                if lo > 0 {
                    instance.add_constraint(format!("quota_lo[{}]", nurse.id), units(&all), Sense::Ge, f64::from(lo));
                }
                instance.add_constraint(
                    format!("quota_hi[{}]", nurse.id),
                    units(&all),
                    Sense::Le,
                    f64::from(quota + tol),
                );
            }
        }

        for (sector_id, limit) in &nurse.sector_limits {
            let vars: Vec<VarId> = admitted
                .iter()
                .filter(|a| &schedule.positions()[a.position].sector_id == sector_id)
                .map(|a| a.var)
                .collect();
            if let Some(min) = limit.min {
                instance.add_constraint(
                    format!("sector_min[{},{sector_id}]", nurse.id),
                    units(&vars),
                    Sense::Ge,
                    f64::from(min),
                );
            }
            if let Some(max) = limit.max {
                instance.add_constraint(
                    format!("sector_max[{},{sector_id}]", nurse.id),
                    units(&vars),
                    Sense::Le,
                    f64::from(max),
                );
            }
        }

        for a in admitted.iter().filter(|a| a.origin == AssignmentOrigin::Fixed) {
            instance.add_constraint(
                format!("fixed[{},{},{}]", nurse.id, a.slot, schedule.positions()[a.position].id),
                vec![Term::unit(a.var)],
                Sense::Eq,
                1.0,
            );
        }
    }

    fn add_fairness(&self, instance: &mut ProblemInstance, schedule: &Schedule, by_nurse: &[Vec<Admitted>]) {
        if self.weights.fairness <= 0.0 {
            return;
        }
        let schedulable = by_nurse.iter().filter(|a| !a.is_empty()).count();
        if schedulable == 0 {
            return;
        }
        let avg = f64::from(schedule.total_demand()) / schedulable as f64;

        for (n, admitted) in by_nurse.iter().enumerate() {
            if admitted.is_empty() {
                continue;
            }
            let id = &schedule.nurses()[n].id;
            let dev = instance.add_variable(
                format!("dev[{id}]"),
                VariableDomain::Continuous { min: 0.0, max: None },
                VariableRole::Auxiliary,
            );
            let mut lo: Vec<Term> = admitted.iter().map(|a| Term::unit(a.var)).collect();
            let mut hi = lo.clone();
            lo.push(Term::new(dev, -1.0));
            hi.push(Term::unit(dev));
            instance.add_constraint(format!("dev_lo[{id}]"), lo, Sense::Le, avg);
            instance.add_constraint(format!("dev_hi[{id}]"), hi, Sense::Ge, avg);
            instance.add_objective_term(dev, self.weights.fairness);
        }
    }

    /// Work requests cost `w * (1 - worked)`; off requests cost `w` per
    /// shift worked on the requested slot(s).
    fn add_requests(&self, instance: &mut ProblemInstance, schedule: &Schedule, by_nurse: &[Vec<Admitted>]) {
        let w = self.weights.unmet_request;
        if w <= 0.0 {
            return;
        }
        for (n, nurse) in schedule.nurses().iter().enumerate() {
            for request in &nurse.requests {
                if !schedule.month().contains(request.date) {
                    continue;
                }
                let matched = by_nurse[n].iter().filter(|a| {
                    let ts = &schedule.timeslots()[a.slot];
                    request.matches(ts.date, ts.kind)
                });
                match request.preference {
                    Preference::Work => {
                        instance.add_objective_constant(w);
                        for a in matched {
                            instance.add_objective_term(a.var, -w);
                        }
                    }
                    Preference::Off => {
                        for a in matched {
                            instance.add_objective_term(a.var, w);
                        }
                    }
                }
            }
        }
    }

    fn add_escape_penalties(&self, instance: &mut ProblemInstance, by_nurse: &[Vec<Admitted>]) {
        for a in by_nurse.iter().flatten() {
            if a.origin == AssignmentOrigin::Escape {
                instance.add_objective_term(a.var, self.weights.escape_path);
            }
        }
    }
}

fn add_coverage(
    instance: &mut ProblemInstance,
    schedule: &Schedule,
    by_cover: &BTreeMap<(usize, usize), Vec<VarId>>,
) {
    for ts in schedule.timeslots() {
        for (position_id, &count) in &ts.requirements {
            let Some(p) = schedule.position_idx(position_id) else {
                continue;
            };
            let vars = by_cover.get(&(ts.index, p)).map(Vec::as_slice).unwrap_or_default();
            instance.add_constraint(
                format!("cover[{},{position_id}]", ts.index),
                units(vars),
                Sense::Eq,
                f64::from(count),
            );
        }
    }
}

fn units(vars: &[VarId]) -> Vec<Term> {
    vars.iter().map(|&v| Term::unit(v)).collect()
}
