//! Vendor-neutral problem instance.
//!
//! A [`ProblemInstance`] is a plain declaration of decision variables,
//! linear constraints and a linear objective to minimize. It carries no
//! engine types, so it can be compared, serialized, inspected by a caller
//! after an infeasible solve, or handed to any [`Engine`](super::Engine).
//!
//! Every variable has a [`VariableRole`] that ties it back to the domain:
//! the extractor turns set [`VariableRole::Assignment`] variables into
//! shifts, the cycle distribution decoder reads
//! [`VariableRole::CycleChoice`] variables, and auxiliary variables carry
//! objective bookkeeping only.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::RotationCycle;

/// Feasibility tolerance for constraint checks.
pub const FEASIBILITY_EPS: f64 = 1e-6;

/// Index of a variable inside its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VariableDomain {
    /// 0 or 1.
    Binary,
    /// Real-valued within bounds.
    Continuous {
        /// Lower bound.
        min: f64,
        /// Upper bound (`None` = unbounded).
        max: Option<f64>,
    },
}

/// How a variable was admitted to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssignmentOrigin {
    /// The nurse's rotation cycle is on duty in the slot.
    Cycle,
    /// Off-cycle slot opened because the cycle cannot reach the quota.
    Escape,
    /// Pre-decided by the input.
    Fixed,
}

/// A (nurse, slot, position) triple backing an assignment variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    /// Nurse ID.
    pub nurse_id: String,
    /// Month-local slot index.
    pub slot: usize,
    /// Position ID.
    pub position_id: String,
    /// Why the triple was admitted.
    pub origin: AssignmentOrigin,
}

/// What a variable means in the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableRole {
    /// Nurse works the position on the slot.
    Assignment(AssignmentKey),
    /// Nurse belongs to a rotation cycle.
    CycleChoice {
        /// Nurse ID.
        nurse_id: String,
        /// Candidate cycle.
        cycle: RotationCycle,
    },
    /// Objective bookkeeping (deviations, peaks).
    Auxiliary,
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Readable name, unique within the instance.
    pub name: String,
    /// Value domain.
    pub domain: VariableDomain,
    /// Domain meaning.
    pub role: VariableRole,
}

/// `coef * var`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Variable.
    pub var: VarId,
    /// Coefficient.
    pub coef: f64,
}

impl Term {
    /// Creates a term.
    pub fn new(var: VarId, coef: f64) -> Self {
        Self { var, coef }
    }

    /// A term with coefficient 1.
    pub fn unit(var: VarId) -> Self {
        Self { var, coef: 1.0 }
    }
}

/// Comparison of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs == rhs`.
    Eq,
    /// `lhs <= rhs`.
    Le,
    /// `lhs >= rhs`.
    Ge,
}

/// `Σ terms  sense  rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Readable label, e.g. `cover[12,T1]`.
    pub label: String,
    /// Left-hand side.
    pub terms: Vec<Term>,
    /// Comparison.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Left-hand side value under an assignment.
    pub fn lhs(&self, assignment: &VariableAssignment) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coef * assignment.value(t.var))
            .sum()
    }

    /// Whether the assignment satisfies this constraint.
    pub fn is_satisfied(&self, assignment: &VariableAssignment) -> bool {
        let lhs = self.lhs(assignment);
        match self.sense {
            Sense::Eq => (lhs - self.rhs).abs() <= FEASIBILITY_EPS,
            Sense::Le => lhs <= self.rhs + FEASIBILITY_EPS,
            Sense::Ge => lhs >= self.rhs - FEASIBILITY_EPS,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sense {
            Sense::Eq => "=",
            Sense::Le => "<=",
            Sense::Ge => ">=",
        };
        write!(f, "{}: {} term(s) {op} {}", self.label, self.terms.len(), self.rhs)
    }
}

/// Linear objective to minimize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Weighted terms.
    pub terms: Vec<Term>,
    /// Constant offset (e.g. unmet-request penalties assumed up front).
    pub constant: f64,
}

/// Values for every variable of an instance, indexed by [`VarId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableAssignment {
    /// Raw values.
    pub values: Vec<f64>,
}

impl VariableAssignment {
    /// Wraps raw values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of a variable (0 if out of range).
    #[inline]
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Whether a binary variable is set.
    #[inline]
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A complete minimization problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemInstance {
    /// Instance name.
    pub name: String,
    /// Decision variables.
    pub variables: Vec<Variable>,
    /// Hard constraints.
    pub constraints: Vec<LinearConstraint>,
    /// Objective to minimize.
    pub objective: Objective,
}

impl ProblemInstance {
    /// Creates an empty instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a variable and returns its ID.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: VariableDomain,
        role: VariableRole,
    ) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            domain,
            role,
        });
        id
    }

    /// Adds a constraint.
    pub fn add_constraint(
        &mut self,
        label: impl Into<String>,
        terms: Vec<Term>,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            label: label.into(),
            terms,
            sense,
            rhs,
        });
    }

    /// Adds `coef * var` to the objective. Zero coefficients are dropped.
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.objective.terms.push(Term::new(var, coef));
        }
    }

    /// Adds a constant to the objective.
    pub fn add_objective_constant(&mut self, value: f64) {
        self.objective.constant += value;
    }

    /// Looks up a variable.
    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(var.0)
    }

    /// Number of variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Assignment variables with their keys, in declaration order.
    pub fn assignment_variables(&self) -> impl Iterator<Item = (VarId, &AssignmentKey)> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match &v.role {
                VariableRole::Assignment(key) => Some((VarId(i), key)),
                _ => None,
            })
    }

    /// Finds the assignment variable for a (nurse, slot, position) triple.
    pub fn find_assignment(&self, nurse_id: &str, slot: usize, position_id: &str) -> Option<VarId> {
        self.assignment_variables()
            .find(|(_, k)| k.nurse_id == nurse_id && k.slot == slot && k.position_id == position_id)
            .map(|(id, _)| id)
    }

    /// Objective value under an assignment.
    pub fn evaluate(&self, assignment: &VariableAssignment) -> f64 {
        self.objective.constant
            + self
                .objective
                .terms
                .iter()
                .map(|t| t.coef * assignment.value(t.var))
                .sum::<f64>()
    }

    /// Constraints the assignment violates. Domains are not checked.
    pub fn violated_constraints(&self, assignment: &VariableAssignment) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(assignment))
            .collect()
    }

    /// Whether the assignment satisfies every constraint and domain.
    pub fn is_feasible(&self, assignment: &VariableAssignment) -> bool {
        if assignment.len() != self.variables.len() {
            return false;
        }
        let domains_ok = self.variables.iter().zip(&assignment.values).all(|(v, &x)| match v.domain {
            VariableDomain::Binary => x.abs() <= FEASIBILITY_EPS || (x - 1.0).abs() <= FEASIBILITY_EPS,
            VariableDomain::Continuous { min, max } => {
                x >= min - FEASIBILITY_EPS && max.map_or(true, |m| x <= m + FEASIBILITY_EPS)
            }
        });
        domains_ok && self.violated_constraints(assignment).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> (ProblemInstance, VarId, VarId) {
        let mut p = ProblemInstance::new("tiny");
        let a = p.add_variable("a", VariableDomain::Binary, VariableRole::Auxiliary);
        let b = p.add_variable("b", VariableDomain::Binary, VariableRole::Auxiliary);
        p.add_constraint("one", vec![Term::unit(a), Term::unit(b)], Sense::Eq, 1.0);
        p.add_objective_term(a, 2.0);
        p.add_objective_term(b, 0.0);
        p.add_objective_constant(5.0);
        (p, a, b)
    }

    #[test]
    fn test_evaluate_includes_constant() {
        let (p, _, _) = tiny();
        assert_eq!(p.objective.terms.len(), 1); // zero coefficient dropped
        assert!((p.evaluate(&VariableAssignment::new(vec![1.0, 0.0])) - 7.0).abs() < 1e-9);
        assert!((p.evaluate(&VariableAssignment::new(vec![0.0, 1.0])) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_feasibility_check() {
        let (p, a, _) = tiny();
        let ok = VariableAssignment::new(vec![0.0, 1.0]);
        assert!(p.is_feasible(&ok));
        assert!(ok.is_set(VarId(1)));
        assert!(!ok.is_set(a));

        let both = VariableAssignment::new(vec![1.0, 1.0]);
        assert_eq!(p.violated_constraints(&both).len(), 1);
        assert!(!p.is_feasible(&both));

        let fractional = VariableAssignment::new(vec![0.5, 0.5]);
        assert!(p.violated_constraints(&fractional).is_empty());
        assert!(!p.is_feasible(&fractional));

        assert!(!p.is_feasible(&VariableAssignment::new(vec![1.0])));
    }

    #[test]
    fn test_find_assignment() {
        let mut p = ProblemInstance::new("x");
        p.add_variable("aux", VariableDomain::Binary, VariableRole::Auxiliary);
        let key = AssignmentKey {
            nurse_id: "N1".into(),
            slot: 4,
            position_id: "T1".into(),
            origin: AssignmentOrigin::Cycle,
        };
        let v = p.add_variable("x", VariableDomain::Binary, VariableRole::Assignment(key));
        assert_eq!(p.find_assignment("N1", 4, "T1"), Some(v));
        assert_eq!(p.find_assignment("N1", 5, "T1"), None);
        assert_eq!(p.assignment_variables().count(), 1);
    }

    #[test]
    fn test_constraint_display() {
        let (p, _, _) = tiny();
        assert_eq!(p.constraints[0].to_string(), "one: 2 term(s) = 1");
    }
}
