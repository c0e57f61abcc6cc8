//! Solution extraction.
//!
//! Turns a variable assignment back into [`Shift`]s attached to the
//! schedule. Only assignment variables are read; auxiliary and cycle
//! choice variables are ignored.

use std::collections::BTreeSet;

use super::problem::{AssignmentOrigin, ProblemInstance, VariableAssignment};
use crate::error::{Result, RosterError};
use crate::models::{Schedule, Shift};

/// Materializes the shifts of an assignment and attaches them to the
/// schedule, replacing any previous shift set.
///
/// # Errors
/// [`RosterError::InconsistentAssignment`] if the assignment length does
/// not match the instance, a key references an unknown nurse, slot or
/// position, or a nurse ends up with two shifts on one slot.
pub fn extract(
    schedule: Schedule,
    instance: &ProblemInstance,
    assignment: &VariableAssignment,
) -> Result<Schedule> {
    if assignment.len() != instance.num_variables() {
        return Err(RosterError::InconsistentAssignment(format!(
            "assignment has {} value(s), instance '{}' has {} variable(s)",
            assignment.len(),
            instance.name,
            instance.num_variables()
        )));
    }

    let mut shifts = Vec::new();
    let mut booked = BTreeSet::new();
    for (var, key) in instance.assignment_variables() {
        if !assignment.is_set(var) {
            continue;
        }
        let ts = schedule.timeslots().get(key.slot).ok_or_else(|| {
            RosterError::InconsistentAssignment(format!("unknown slot {}", key.slot))
        })?;
        let position = schedule.position(&key.position_id).ok_or_else(|| {
            RosterError::InconsistentAssignment(format!("unknown position '{}'", key.position_id))
        })?;
        if schedule.nurse(&key.nurse_id).is_none() {
            return Err(RosterError::InconsistentAssignment(format!(
                "unknown nurse '{}'",
                key.nurse_id
            )));
        }
        if !booked.insert((key.nurse_id.as_str(), key.slot)) {
            return Err(RosterError::InconsistentAssignment(format!(
                "nurse '{}' is double-booked on {ts}",
                key.nurse_id
            )));
        }
        shifts.push(Shift {
            slot: key.slot,
            date: ts.date,
            kind: ts.kind,
            nurse_id: key.nurse_id.clone(),
            position_id: key.position_id.clone(),
            sector_id: position.sector_id.clone(),
            off_cycle: key.origin == AssignmentOrigin::Escape,
            fixed: key.origin == AssignmentOrigin::Fixed,
        });
    }
    shifts.sort();

    tracing::debug!(shifts = shifts.len(), "shifts extracted");
    Ok(schedule.with_shifts(shifts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;
    use crate::cp::RosterModelBuilder;
    use crate::models::{Month, Nurse, Position, RotationCycle, Sector, ShiftKind, StaffingRequirement};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, day).unwrap()
    }

    fn fixture() -> (Schedule, ProblemInstance) {
        let sectors = vec![Sector::new("G").with_position(Position::new("G1", "general"))];
        let nurses = vec![
            Nurse::new("A").with_skill("general").with_cycle(RotationCycle::new(3).unwrap()),
            Nurse::new("B").with_skill("general").with_cycle(RotationCycle::new(3).unwrap()),
        ];
        let staffing = [StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1)];
        let schedule =
            Schedule::new(Month::new(2022, 1).unwrap(), sectors, nurses, &staffing, vec![]).unwrap();
        let instance = RosterModelBuilder::new(&RosterConfig::default()).build(&schedule);
        (schedule, instance)
    }

    fn pick(instance: &ProblemInstance, nurse: &str) -> VariableAssignment {
        let mut values = vec![0.0; instance.num_variables()];
        if let Some(var) = instance.find_assignment(nurse, 0, "G1") {
            values[var.0] = 1.0;
        }
        VariableAssignment::new(values)
    }

    #[test]
    fn test_extract_shift() {
        let (schedule, instance) = fixture();
        let solved = extract(schedule, &instance, &pick(&instance, "B")).unwrap();
        assert!(solved.is_solved());
        assert_eq!(solved.shifts().len(), 1);
        let shift = &solved.shifts()[0];
        assert_eq!(shift.nurse_id, "B");
        assert_eq!(shift.date, d(1));
        assert_eq!(shift.kind, ShiftKind::Day);
        assert_eq!(shift.sector_id, "G");
        assert!(!shift.off_cycle);
        assert!(!shift.fixed);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let (schedule, instance) = fixture();
        let once = extract(schedule, &instance, &pick(&instance, "A")).unwrap();
        let twice = extract(once.clone(), &instance, &pick(&instance, "A")).unwrap();
        assert_eq!(once.shifts(), twice.shifts());

        let replaced = extract(twice, &instance, &pick(&instance, "B")).unwrap();
        assert_eq!(replaced.shifts().len(), 1);
        assert_eq!(replaced.shifts()[0].nurse_id, "B");
    }

    #[test]
    fn test_length_mismatch() {
        let (schedule, instance) = fixture();
        let err = extract(schedule, &instance, &VariableAssignment::new(vec![1.0])).unwrap_err();
        assert!(matches!(err, RosterError::InconsistentAssignment(_)));
    }

    #[test]
    fn test_double_booking_detected() {
        let (schedule, mut instance) = fixture();
        // Forge a second key for A on the same slot.
        let mut key = instance
            .assignment_variables()
            .find(|(_, k)| k.nurse_id == "A")
            .map(|(_, k)| k.clone())
            .unwrap();
        key.origin = AssignmentOrigin::Fixed;
        instance.add_variable(
            "x[A,0,G1]#2",
            crate::cp::VariableDomain::Binary,
            crate::cp::VariableRole::Assignment(key),
        );
        let mut values = pick(&instance, "A").values;
        values[instance.num_variables() - 1] = 1.0;
        let err = extract(schedule, &instance, &VariableAssignment::new(values)).unwrap_err();
        assert!(err.to_string().contains("double-booked"));
    }
}
