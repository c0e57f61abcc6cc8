//! Rotation cycle model.
//!
//! Nurses are split into four rotation groups that follow the 12/24/12/48
//! duty pattern: a 12-hour day shift, 24 hours of rest, a 12-hour night
//! shift, then 48 hours of rest. Over consecutive half-day slots the four
//! groups interleave so that each slot is covered by exactly one group.
//!
//! # Slot Numbering
//! A half-day slot is numbered globally from a rotation anchor date:
//! `g = days_since_anchor * 2 + kind` (day = 0, night = 1).
//! The group on duty is `SUCCESSION[g mod 8]`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ShiftKind;

/// Group on duty for each of the eight half-day slots of one rotation period.
pub const CYCLE_SUCCESSION: [u8; 8] = [3, 1, 4, 3, 2, 4, 1, 2];

/// Default rotation anchor. Slot 0 of the succession falls on this day shift.
pub const DEFAULT_ROTATION_ANCHOR: (i32, u32, u32) = (2022, 1, 1);

/// Minimum distance, in half-day slots, between the starts of two shifts
/// worked by the same nurse (12h shift + 24h rest).
pub const MIN_SLOT_GAP: usize = 3;

/// One of the four rotation groups (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RotationCycle(u8);

impl RotationCycle {
    /// All four cycles in order.
    pub const ALL: [RotationCycle; 4] = [Self(1), Self(2), Self(3), Self(4)];

    /// Creates a cycle; `None` unless `n` is in `1..=4`.
    pub fn new(n: u8) -> Option<Self> {
        (1..=4).contains(&n).then_some(Self(n))
    }

    /// The cycle number (1..=4).
    #[inline]
    pub fn number(self) -> u8 {
        self.0
    }

    /// The cycle on duty for a given slot.
    pub fn on_duty(anchor: NaiveDate, date: NaiveDate, kind: ShiftKind) -> Self {
        let g = global_slot_index(anchor, date, kind);
        Self(CYCLE_SUCCESSION[g.rem_euclid(8) as usize])
    }

    /// Whether this cycle is on duty for a given slot.
    pub fn works(self, anchor: NaiveDate, date: NaiveDate, kind: ShiftKind) -> bool {
        Self::on_duty(anchor, date, kind) == self
    }
}

impl TryFrom<u8> for RotationCycle {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n).ok_or_else(|| format!("rotation cycle must be 1..=4, got {n}"))
    }
}

impl From<RotationCycle> for u8 {
    fn from(c: RotationCycle) -> Self {
        c.0
    }
}

impl fmt::Display for RotationCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Global half-day slot index relative to the rotation anchor.
///
/// Negative for slots before the anchor.
pub fn global_slot_index(anchor: NaiveDate, date: NaiveDate, kind: ShiftKind) -> i64 {
    (date - anchor).num_days() * 2 + kind.offset() as i64
}

/// Returns the default rotation anchor date.
pub fn default_anchor() -> NaiveDate {
    let (y, m, d) = DEFAULT_ROTATION_ANCHOR;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_cycle_bounds() {
        assert!(RotationCycle::new(0).is_none());
        assert!(RotationCycle::new(5).is_none());
        assert_eq!(RotationCycle::new(3).unwrap().number(), 3);
        assert_eq!(RotationCycle::new(2).unwrap().to_string(), "C2");
    }

    #[test]
    fn test_anchor_slots() {
        let anchor = default_anchor();
        assert_eq!(RotationCycle::on_duty(anchor, anchor, ShiftKind::Day).number(), 3);
        assert_eq!(RotationCycle::on_duty(anchor, anchor, ShiftKind::Night).number(), 1);
        assert_eq!(RotationCycle::on_duty(anchor, d(2022, 1, 2), ShiftKind::Night).number(), 3);
    }

    #[test]
    fn test_pattern_12_24_12_48() {
        // Each cycle works a day, then a night 3 slots later, then a day 5 slots later.
        let anchor = default_anchor();
        for cycle in RotationCycle::ALL {
            let worked: Vec<i64> = (0..32)
                .filter(|g| {
                    let date = anchor + chrono::Duration::days(g / 2);
                    let kind = if g % 2 == 0 { ShiftKind::Day } else { ShiftKind::Night };
                    cycle.works(anchor, date, kind)
                })
                .collect();
            assert_eq!(worked.len(), 8);
            for pair in worked.windows(2) {
                let gap = pair[1] - pair[0];
                assert!(gap == 3 || gap == 5, "{cycle}: gap {gap}");
            }
        }
    }

    #[test]
    fn test_every_slot_has_one_cycle() {
        let anchor = default_anchor();
        let date = d(2023, 7, 14);
        let on_duty: Vec<_> = RotationCycle::ALL
            .iter()
            .filter(|c| c.works(anchor, date, ShiftKind::Day))
            .collect();
        assert_eq!(on_duty.len(), 1);
    }

    #[test]
    fn test_before_anchor() {
        let anchor = default_anchor();
        // 2021-12-31 night is g = -1 → index 7 → cycle 2
        let c = RotationCycle::on_duty(anchor, d(2021, 12, 31), ShiftKind::Night);
        assert_eq!(c.number(), 2);
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<RotationCycle>("4").is_ok());
        assert!(serde_json::from_str::<RotationCycle>("7").is_err());
    }
}
