//! Roster quality metrics (KPIs).
//!
//! Computes fairness, request and coverage indicators from a solved
//! schedule.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Average shifts | Mean shift count over nurses with a rotation cycle |
//! | Max deviation | Largest `|count - average|` over those nurses |
//! | Quota deviation | `count - quota` per nurse with a quota |
//! | Unmet requests | Work requests not worked + off requests worked |
//! | Escape shifts | Shifts assigned outside the nurse's cycle |
//! | Uncovered | (slot, position) pairs below their required count |
//! | Coverage rate | Assigned / required staff over the month |
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering", Sec. 4

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Preference, Schedule};

/// Roster performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterKpi {
    /// Shift count per nurse (every nurse, possibly 0).
    pub shift_counts: BTreeMap<String, u32>,
    /// Total shifts assigned.
    pub total_shifts: u32,
    /// Mean shift count over nurses with a rotation cycle.
    pub avg_shifts: f64,
    /// Largest absolute deviation from the mean.
    pub max_deviation: f64,
    /// `count - quota` per nurse with a quota.
    pub quota_deviation: BTreeMap<String, i64>,
    /// Requests not honored.
    pub unmet_requests: u32,
    /// Shifts taken through the escape path.
    pub escape_shifts: u32,
    /// Shifts that were fixed by the input.
    pub fixed_shifts: u32,
    /// (slot, position) pairs below their required count.
    pub uncovered: u32,
    /// Assigned over required staff (1.0 when nothing is required).
    pub coverage_rate: f64,
}

impl RosterKpi {
    /// Computes KPIs from a schedule. An unsolved schedule reports zero
    /// shifts and full under-coverage.
    pub fn calculate(schedule: &Schedule) -> Self {
        let shift_counts = schedule.shift_counts();
        let total_shifts = schedule.shifts().len() as u32;

        let rostered: Vec<u32> = schedule
            .nurses()
            .iter()
            .filter(|n| n.cycle.is_some())
            .map(|n| shift_counts.get(&n.id).copied().unwrap_or(0))
            .collect();
        let avg_shifts = if rostered.is_empty() {
            0.0
        } else {
            rostered.iter().map(|&c| f64::from(c)).sum::<f64>() / rostered.len() as f64
        };
        let max_deviation = rostered
            .iter()
            .map(|&c| (f64::from(c) - avg_shifts).abs())
            .fold(0.0, f64::max);

        let quota_deviation = schedule
            .nurses()
            .iter()
            .filter_map(|n| {
                let quota = n.required_shifts?;
                let count = shift_counts.get(&n.id).copied().unwrap_or(0);
                Some((n.id.clone(), i64::from(count) - i64::from(quota)))
            })
            .collect();

        let mut unmet_requests = 0;
        for nurse in schedule.nurses() {
            let shifts = schedule.shifts_for_nurse(&nurse.id);
            for request in &nurse.requests {
                if !schedule.month().contains(request.date) {
                    continue;
                }
                let worked = shifts.iter().any(|s| request.matches(s.date, s.kind));
                let unmet = match request.preference {
                    Preference::Work => !worked,
                    Preference::Off => worked,
                };
                if unmet {
                    unmet_requests += 1;
                }
            }
        }

        let mut required_total = 0u32;
        let mut assigned_total = 0u32;
        let mut uncovered = 0u32;
        for ts in schedule.timeslots() {
            let on_slot = schedule.shifts_for_slot(ts.index);
            for (position_id, &required) in &ts.requirements {
                let assigned = on_slot.iter().filter(|s| &s.position_id == position_id).count() as u32;
                required_total += required;
                assigned_total += assigned.min(required);
                if assigned < required {
                    uncovered += 1;
                }
            }
        }
        let coverage_rate = if required_total == 0 {
            1.0
        } else {
            f64::from(assigned_total) / f64::from(required_total)
        };

        Self {
            shift_counts,
            total_shifts,
            avg_shifts,
            max_deviation,
            quota_deviation,
            unmet_requests,
            escape_shifts: schedule.shifts().iter().filter(|s| s.off_cycle).count() as u32,
            fixed_shifts: schedule.shifts().iter().filter(|s| s.fixed).count() as u32,
            uncovered,
            coverage_rate,
        }
    }

    /// Whether the roster meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_deviation: f64, max_unmet_requests: u32) -> bool {
        self.uncovered == 0
            && self.max_deviation <= max_deviation
            && self.unmet_requests <= max_unmet_requests
    }
}
