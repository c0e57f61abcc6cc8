//! Schedule aggregate.
//!
//! The schedule owns every input entity of one scheduling run (month,
//! sectors and positions, nurses, staffing requirements, fixed
//! assignments) and the lookups derived from them that constraint
//! generation needs:
//!
//! - cycle-eligible time slots per nurse,
//! - eligible nurses per (time slot, position),
//! - escape-path slots for nurses whose cycle cannot reach their quota.
//!
//! # Derived Data
//! All derived views are computed once in [`Schedule::new`]. The inputs are
//! private and never mutated afterwards, so the views cannot go stale. Each
//! run builds its own `Schedule`; nothing is shared between instances.
//!
//! # Lifecycle
//! After solving, the extractor consumes the schedule and returns it with
//! its shift set attached. It is read-only from then on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    FixedAssignment, LeaveRecord, Month, Nurse, Position, Sector, Shift, ShiftKind, ShiftRecord,
    TimeSlot, LEAVE_CODE,
};
use crate::error::{Result, RosterError};
use crate::validation::validate_input;

/// A staffing rule: how many nurses a position needs per slot.
///
/// Rules may be narrowed to a shift kind and/or a single date. When several
/// rules match a slot, the most specific wins (date + kind, then date, then
/// kind, then the position default); among equally specific rules the last
/// one listed wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRequirement {
    /// Position ID.
    pub position_id: String,
    /// Restrict to one shift kind.
    #[serde(default)]
    pub kind: Option<ShiftKind>,
    /// Restrict to one date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Minimum staff count.
    pub count: u32,
}

impl StaffingRequirement {
    /// A requirement applying to every slot of the month.
    pub fn every_slot(position_id: impl Into<String>, count: u32) -> Self {
        Self {
            position_id: position_id.into(),
            kind: None,
            date: None,
            count,
        }
    }

    /// A requirement for a single slot.
    pub fn on(position_id: impl Into<String>, date: NaiveDate, kind: ShiftKind, count: u32) -> Self {
        Self {
            position_id: position_id.into(),
            kind: Some(kind),
            date: Some(date),
            count,
        }
    }

    /// Restricts the requirement to one shift kind.
    pub fn with_kind(mut self, kind: ShiftKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn specificity(&self) -> u8 {
        u8::from(self.date.is_some()) * 2 + u8::from(self.kind.is_some())
    }

    fn applies(&self, date: NaiveDate, kind: ShiftKind) -> bool {
        self.date.map_or(true, |d| d == date) && self.kind.map_or(true, |k| k == kind)
    }
}

/// The aggregate root of one scheduling run.
#[derive(Debug, Clone)]
pub struct Schedule {
    month: Month,
    sectors: Vec<Sector>,
    nurses: Vec<Nurse>,
    fixed: Vec<FixedAssignment>,
    positions: Vec<Position>,
    timeslots: Vec<TimeSlot>,
    nurse_index: BTreeMap<String, usize>,
    position_index: BTreeMap<String, usize>,
    cycle_slots: Vec<Vec<usize>>,
    escape_slots: Vec<Vec<usize>>,
    eligible: BTreeMap<(usize, usize), Vec<usize>>,
    shifts: Option<Vec<Shift>>,
}

impl Schedule {
    /// Builds the aggregate and derives its lookups.
    ///
    /// # Errors
    /// - [`RosterError::InvalidInput`] if the input fails validation.
    /// - [`RosterError::InfeasibleInput`] if a required (slot, position)
    ///   has fewer candidates than its minimum count. Candidates are
    ///   on-cycle nurses, fixed assignments and escape-path nurses.
    pub fn new(
        month: Month,
        sectors: Vec<Sector>,
        nurses: Vec<Nurse>,
        staffing: &[StaffingRequirement],
        fixed: Vec<FixedAssignment>,
    ) -> Result<Self> {
        validate_input(&month, &sectors, &nurses, staffing, &fixed)
            .map_err(RosterError::InvalidInput)?;

        let sectors: Vec<Sector> = sectors
            .into_iter()
            .map(|mut s| {
                for p in &mut s.positions {
                    p.sector_id = s.id.clone();
                }
                s
            })
            .collect();
        let positions: Vec<Position> = sectors.iter().flat_map(|s| s.positions.clone()).collect();
        let position_index = positions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let nurse_index = nurses
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let timeslots = build_timeslots(&month, staffing);

        let mut schedule = Self {
            month,
            sectors,
            nurses,
            fixed,
            positions,
            timeslots,
            nurse_index,
            position_index,
            cycle_slots: Vec::new(),
            escape_slots: Vec::new(),
            eligible: BTreeMap::new(),
            shifts: None,
        };
        schedule.derive_cycle_slots();
        schedule.derive_eligible();
        schedule.derive_escape_slots();
        schedule.check_coverage()?;

        tracing::debug!(
            month = %schedule.month,
            nurses = schedule.nurses.len(),
            positions = schedule.positions.len(),
            demand = schedule.total_demand(),
            "schedule derived"
        );
        Ok(schedule)
    }

    fn derive_cycle_slots(&mut self) {
        self.cycle_slots = self
            .nurses
            .iter()
            .map(|nurse| match nurse.cycle {
                None => Vec::new(),
                Some(cycle) => self
                    .timeslots
                    .iter()
                    .filter(|ts| ts.cycle == cycle && !ts.overlaps_leave(&nurse.leave))
                    .map(|ts| ts.index)
                    .collect(),
            })
            .collect();
    }

    fn derive_eligible(&mut self) {
        let mut eligible = BTreeMap::new();
        for ts in &self.timeslots {
            for position_id in ts.requirements.keys() {
                let Some(&p) = self.position_index.get(position_id) else {
                    continue;
                };
                let skill = &self.positions[p].skill;
                let nurses: Vec<usize> = self
                    .nurses
                    .iter()
                    .enumerate()
                    .filter(|(n, nurse)| {
                        nurse.has_skill(skill) && self.cycle_slots[*n].binary_search(&ts.index).is_ok()
                    })
                    .map(|(n, _)| n)
                    .collect();
                eligible.insert((ts.index, p), nurses);
            }
        }
        self.eligible = eligible;
    }

    /// Off-cycle slots become available only to nurses whose cycle
    /// offers fewer usable slots than their quota.
    fn derive_escape_slots(&mut self) {
        let mut escape = Vec::with_capacity(self.nurses.len());
        for (n, nurse) in self.nurses.iter().enumerate() {
            let (Some(quota), Some(_)) = (nurse.required_shifts, nurse.cycle) else {
                escape.push(Vec::new());
                continue;
            };
            let usable = self.cycle_slots[n]
                .iter()
                .filter(|&&s| self.slot_needs_nurse(s, nurse))
                .count();
            if usable as u32 >= quota {
                escape.push(Vec::new());
                continue;
            }
            let slots: Vec<usize> = self
                .timeslots
                .iter()
                .filter(|ts| {
                    self.cycle_slots[n].binary_search(&ts.index).is_err()
                        && !ts.overlaps_leave(&nurse.leave)
                        && self.slot_needs_nurse(ts.index, nurse)
                })
                .map(|ts| ts.index)
                .collect();
            tracing::debug!(
                nurse = %nurse.id,
                quota,
                usable,
                escape_slots = slots.len(),
                "rotation cycle cannot reach quota, escape path opened"
            );
            escape.push(slots);
        }
        self.escape_slots = escape;
    }

    fn slot_needs_nurse(&self, slot: usize, nurse: &Nurse) -> bool {
        self.timeslots[slot].requirements.keys().any(|pid| {
            self.position_index
                .get(pid)
                .is_some_and(|&p| nurse.has_skill(&self.positions[p].skill))
        })
    }

    /// Rejects only input no model could staff; escape-path candidates
    /// count even though the builder may leave them out.
    fn check_coverage(&self) -> Result<()> {
        for ts in &self.timeslots {
            for (position_id, &required) in &ts.requirements {
                let Some(&p) = self.position_index.get(position_id) else {
                    continue;
                };
                let mut candidates: BTreeSet<usize> =
                    self.eligible_nurse_indices(ts.index, p).iter().copied().collect();
                for fa in self.fixed_for_slot(ts.index, position_id) {
                    if let Some(&n) = self.nurse_index.get(&fa.nurse_id) {
                        candidates.insert(n);
                    }
                }
                let skill = &self.positions[p].skill;
                for (n, nurse) in self.nurses.iter().enumerate() {
                    if nurse.has_skill(skill) && self.escape_slots[n].binary_search(&ts.index).is_ok() {
                        candidates.insert(n);
                    }
                }
                if (candidates.len() as u32) < required {
                    tracing::warn!(
                        slot = %ts,
                        position = %position_id,
                        required,
                        eligible = candidates.len(),
                        "position cannot be staffed"
                    );
                    return Err(RosterError::InfeasibleInput {
                        date: ts.date,
                        kind: ts.kind,
                        position: position_id.clone(),
                        required,
                        eligible: candidates.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn fixed_for_slot<'a>(
        &'a self,
        slot: usize,
        position_id: &'a str,
    ) -> impl Iterator<Item = &'a FixedAssignment> + 'a {
        self.fixed.iter().filter(move |fa| {
            fa.position_id == position_id && self.month.slot_index(fa.date, fa.kind) == Some(slot)
        })
    }

    /// The scheduled month.
    pub fn month(&self) -> &Month {
        &self.month
    }

    /// Sectors with their positions.
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// All positions in sector order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// All nurses in input order.
    pub fn nurses(&self) -> &[Nurse] {
        &self.nurses
    }

    /// All time slots in chronological order.
    pub fn timeslots(&self) -> &[TimeSlot] {
        &self.timeslots
    }

    /// Fixed assignments from the input.
    pub fn fixed_assignments(&self) -> &[FixedAssignment] {
        &self.fixed
    }

    /// Finds a nurse by ID.
    pub fn nurse(&self, nurse_id: &str) -> Option<&Nurse> {
        self.nurse_index.get(nurse_id).map(|&n| &self.nurses[n])
    }

    /// Finds a position by ID.
    pub fn position(&self, position_id: &str) -> Option<&Position> {
        self.position_index.get(position_id).map(|&p| &self.positions[p])
    }

    /// Finds a time slot by date and kind.
    pub fn timeslot(&self, date: NaiveDate, kind: ShiftKind) -> Option<&TimeSlot> {
        self.month.slot_index(date, kind).map(|i| &self.timeslots[i])
    }

    pub(crate) fn nurse_idx(&self, nurse_id: &str) -> Option<usize> {
        self.nurse_index.get(nurse_id).copied()
    }

    pub(crate) fn position_idx(&self, position_id: &str) -> Option<usize> {
        self.position_index.get(position_id).copied()
    }

    /// Cycle-eligible slot indices of a nurse (empty for unknown IDs).
    pub fn cycle_eligible_timeslots(&self, nurse_id: &str) -> &[usize] {
        self.nurse_idx(nurse_id)
            .map_or(&[][..], |n| self.cycle_slots[n].as_slice())
    }

    /// Ordered dates on which the nurse's cycle is on duty and no planned
    /// leave collides.
    pub fn cycle_eligible_dates(&self, nurse_id: &str) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .cycle_eligible_timeslots(nurse_id)
            .iter()
            .map(|&s| self.timeslots[s].date)
            .collect();
        dates.dedup();
        dates
    }

    /// Nurses that hold the position's skill, are on cycle for the slot and
    /// are not on leave. Empty if the slot does not require the position.
    pub fn eligible_nurses(&self, timeslot: &TimeSlot, position_id: &str) -> Vec<&Nurse> {
        self.position_idx(position_id)
            .map(|p| {
                self.eligible_nurse_indices(timeslot.index, p)
                    .iter()
                    .map(|&n| &self.nurses[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn eligible_nurse_indices(&self, slot: usize, position: usize) -> &[usize] {
        self.eligible
            .get(&(slot, position))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Off-cycle slots opened to a nurse by the escape path.
    pub fn escape_timeslots(&self, nurse_id: &str) -> &[usize] {
        self.nurse_idx(nurse_id)
            .map_or(&[][..], |n| self.escape_slots[n].as_slice())
    }

    pub(crate) fn escape_slot_indices(&self, nurse: usize) -> &[usize] {
        &self.escape_slots[nurse]
    }

    /// Total staff demand across the month.
    pub fn total_demand(&self) -> u32 {
        self.timeslots.iter().map(TimeSlot::total_required).sum()
    }

    /// Whether shifts have been attached by the extractor.
    pub fn is_solved(&self) -> bool {
        self.shifts.is_some()
    }

    /// Attached shifts (empty before extraction).
    pub fn shifts(&self) -> &[Shift] {
        self.shifts.as_deref().unwrap_or_default()
    }

    pub(crate) fn with_shifts(mut self, shifts: Vec<Shift>) -> Self {
        self.shifts = Some(shifts);
        self
    }

    /// Shifts of one nurse in chronological order.
    pub fn shifts_for_nurse(&self, nurse_id: &str) -> Vec<&Shift> {
        self.shifts().iter().filter(|s| s.nurse_id == nurse_id).collect()
    }

    /// Shifts on one slot.
    pub fn shifts_for_slot(&self, slot: usize) -> Vec<&Shift> {
        self.shifts().iter().filter(|s| s.slot == slot).collect()
    }

    /// Shift count per nurse; every nurse appears, possibly with 0.
    pub fn shift_counts(&self) -> BTreeMap<String, u32> {
        let mut counts: BTreeMap<String, u32> =
            self.nurses.iter().map(|n| (n.id.clone(), 0)).collect();
        for shift in self.shifts() {
            *counts.entry(shift.nurse_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Output records for every shift, ordered by slot then position.
    pub fn shift_records(&self) -> Vec<ShiftRecord> {
        let mut shifts: Vec<&Shift> = self.shifts().iter().collect();
        shifts.sort_by(|a, b| {
            (a.slot, &a.position_id, &a.nurse_id).cmp(&(b.slot, &b.position_id, &b.nurse_id))
        });
        shifts.into_iter().map(ShiftRecord::from).collect()
    }

    /// Output records marking planned leave on working days.
    pub fn leave_records(&self) -> Vec<LeaveRecord> {
        self.nurses
            .iter()
            .flat_map(|nurse| {
                nurse
                    .leave_working_days(&self.month)
                    .into_iter()
                    .map(|date| LeaveRecord {
                        date,
                        nurse_id: nurse.id.clone(),
                        code: LEAVE_CODE.to_string(),
                    })
            })
            .collect()
    }
}

/// Resolves staffing rules into per-slot requirements.
fn build_timeslots(month: &Month, staffing: &[StaffingRequirement]) -> Vec<TimeSlot> {
    let mut rules: Vec<&StaffingRequirement> = staffing.iter().collect();
    rules.sort_by_key(|r| r.specificity());

    (0..month.num_slots())
        .filter_map(|index| month.slot_at(index).map(|(date, kind)| (index, date, kind)))
        .map(|(index, date, kind)| {
            let mut requirements = BTreeMap::new();
            for rule in rules.iter().filter(|r| r.applies(date, kind)) {
                requirements.insert(rule.position_id.clone(), rule.count);
            }
            requirements.retain(|_, count| *count > 0);
            TimeSlot {
                index,
                date,
                kind,
                cycle: month.cycle_on_duty(date, kind),
                requirements,
            }
        })
        .collect()
}
