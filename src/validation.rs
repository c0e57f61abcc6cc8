//! Input validation for rostering problems.
//!
//! Checks structural integrity of sectors, nurses, staffing rules and fixed
//! assignments before any derivation. Detects:
//! - Duplicate IDs (sectors, positions, nurses)
//! - Dangling position, sector and nurse references
//! - Dates outside the scheduled month
//! - Fixed assignments a nurse cannot legally take
//! - Nurses with a quota but no rotation cycle
//!
//! All problems are collected; validation never stops at the first one.

use std::collections::{BTreeMap, HashSet};

use crate::models::{
    overlaps_leave, FixedAssignment, Month, Nurse, Position, Sector, StaffingRequirement,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A staffing rule or assignment references an unknown position.
    UnknownPosition,
    /// A fixed assignment references an unknown nurse.
    UnknownNurse,
    /// A sector limit references an unknown sector.
    UnknownSector,
    /// A date does not belong to the scheduled month.
    DateOutsideMonth,
    /// A nurse lacks the skill a fixed position requires.
    SkillMismatch,
    /// A fixed assignment collides with the nurse's planned leave.
    LeaveConflict,
    /// A nurse is fixed twice on the same slot.
    DuplicateAssignment,
    /// A nurse with a shift quota has no rotation cycle.
    MissingCycle,
    /// A fixed assignment targets a position the slot does not require.
    PositionNotRequired,
    /// Sector limit bounds are inverted.
    InvalidLimit,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input records of one scheduling run.
///
/// Checks:
/// 1. No duplicate sector, position or nurse IDs
/// 2. Staffing rules reference existing positions and in-month dates
/// 3. Sector limits reference existing sectors with `min <= max`
/// 4. Nurses with a quota above zero have a rotation cycle
/// 5. Fixed assignments reference existing nurses and positions, fall in
///    the month, match the nurse's skills, avoid leave, target a required
///    position, and never double-book a nurse
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    month: &Month,
    sectors: &[Sector],
    nurses: &[Nurse],
    staffing: &[StaffingRequirement],
    fixed: &[FixedAssignment],
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut sector_ids = HashSet::new();
    let mut positions: BTreeMap<&str, &Position> = BTreeMap::new();
    for sector in sectors {
        if !sector_ids.insert(sector.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate sector ID: {}", sector.id),
            ));
        }
        for position in &sector.positions {
            if positions.insert(position.id.as_str(), position).is_some() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateId,
                    format!("Duplicate position ID: {}", position.id),
                ));
            }
        }
    }

    let mut nurse_map: BTreeMap<&str, &Nurse> = BTreeMap::new();
    for nurse in nurses {
        if nurse_map.insert(nurse.id.as_str(), nurse).is_some() {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate nurse ID: {}", nurse.id),
            ));
        }
    }

    for rule in staffing {
        if !positions.contains_key(rule.position_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownPosition,
                format!("Staffing rule references unknown position '{}'", rule.position_id),
            ));
        }
        if let Some(date) = rule.date {
            if !month.contains(date) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DateOutsideMonth,
                    format!(
                        "Staffing rule for '{}' on {date} is outside {month}",
                        rule.position_id
                    ),
                ));
            }
        }
    }

    for nurse in nurses {
        for (sector_id, limit) in &nurse.sector_limits {
            if !sector_ids.contains(sector_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownSector,
                    format!("Nurse '{}' has a limit for unknown sector '{sector_id}'", nurse.id),
                ));
            }
            if let (Some(min), Some(max)) = (limit.min, limit.max) {
                if min > max {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidLimit,
                        format!(
                            "Nurse '{}' sector '{sector_id}' limit min {min} exceeds max {max}",
                            nurse.id
                        ),
                    ));
                }
            }
        }

        if nurse.cycle.is_none() && nurse.required_shifts.is_some_and(|q| q > 0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingCycle,
                format!("Nurse '{}' has a shift quota but no rotation cycle", nurse.id),
            ));
        }
    }

    errors.extend(validate_fixed(month, &positions, &nurse_map, staffing, fixed));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_fixed(
    month: &Month,
    positions: &BTreeMap<&str, &Position>,
    nurses: &BTreeMap<&str, &Nurse>,
    staffing: &[StaffingRequirement],
    fixed: &[FixedAssignment],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut taken = HashSet::new();

    for fa in fixed {
        let nurse = nurses.get(fa.nurse_id.as_str());
        let position = positions.get(fa.position_id.as_str());

        if nurse.is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownNurse,
                format!("Fixed assignment references unknown nurse '{}'", fa.nurse_id),
            ));
        }
        if position.is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownPosition,
                format!("Fixed assignment references unknown position '{}'", fa.position_id),
            ));
        }
        if !month.contains(fa.date) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DateOutsideMonth,
                format!(
                    "Fixed assignment of '{}' on {} is outside {month}",
                    fa.nurse_id, fa.date
                ),
            ));
            continue;
        }
        if !taken.insert((fa.nurse_id.as_str(), fa.date, fa.kind)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateAssignment,
                format!(
                    "Nurse '{}' is fixed twice on {} {:?}",
                    fa.nurse_id, fa.date, fa.kind
                ),
            ));
        }

        let (Some(nurse), Some(position)) = (nurse, position) else {
            continue;
        };
        if !nurse.has_skill(&position.skill) {
            errors.push(ValidationError::new(
                ValidationErrorKind::SkillMismatch,
                format!(
                    "Nurse '{}' lacks skill '{}' for position '{}'",
                    nurse.id, position.skill, position.id
                ),
            ));
        }
        if overlaps_leave(fa.date, fa.kind, &nurse.leave) {
            errors.push(ValidationError::new(
                ValidationErrorKind::LeaveConflict,
                format!(
                    "Fixed assignment of '{}' on {} {:?} collides with planned leave",
                    nurse.id, fa.date, fa.kind
                ),
            ));
        }
        if resolved_count(staffing, &fa.position_id, fa) == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::PositionNotRequired,
                format!(
                    "Position '{}' is not required on {} {:?}",
                    fa.position_id, fa.date, fa.kind
                ),
            ));
        }
    }

    errors
}

/// Staffing count for a fixed assignment's slot, resolved the same way the
/// schedule resolves requirements.
fn resolved_count(staffing: &[StaffingRequirement], position_id: &str, fa: &FixedAssignment) -> u32 {
    let mut best: Option<(u8, u32)> = None;
    for rule in staffing {
        if rule.position_id != position_id
            || rule.date.is_some_and(|d| d != fa.date)
            || rule.kind.is_some_and(|k| k != fa.kind)
        {
            continue;
        }
        let specificity = u8::from(rule.date.is_some()) * 2 + u8::from(rule.kind.is_some());
        if best.map_or(true, |(s, _)| specificity >= s) {
            best = Some((specificity, rule.count));
        }
    }
    best.map_or(0, |(_, count)| count)
}
