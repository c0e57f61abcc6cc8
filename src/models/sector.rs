//! Sector and position models.
//!
//! A sector is an organizational subdivision of the department (triage,
//! resuscitation, ...). Each sector owns the positions that can be staffed
//! on a shift; a position requires one skill tag.

use serde::{Deserialize, Serialize};

/// An organizational subdivision of the department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Unique sector identifier (short code, e.g. "T", "RCP").
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Positions staffed in this sector.
    #[serde(default)]
    pub positions: Vec<Position>,
}

/// A work role that requires a specific skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Unique position identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Owning sector ID (back-reference).
    #[serde(default)]
    pub sector_id: String,
    /// Skill tag a nurse must hold to fill this position.
    pub skill: String,
}

impl Sector {
    /// Creates an empty sector.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            positions: Vec::new(),
        }
    }

    /// Sets the sector name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a position, setting its sector back-reference.
    pub fn with_position(mut self, mut position: Position) -> Self {
        position.sector_id = self.id.clone();
        self.positions.push(position);
        self
    }

    /// Finds a position by ID.
    pub fn position(&self, position_id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == position_id)
    }
}

impl Position {
    /// Creates a position requiring `skill`.
    ///
    /// The sector back-reference is set when added to a [`Sector`].
    pub fn new(id: impl Into<String>, skill: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            sector_id: String::new(),
            skill: skill.into(),
        }
    }

    /// Sets the position name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_owns_positions() {
        let s = Sector::new("T")
            .with_name("Triage")
            .with_position(Position::new("T1", "triage").with_name("Triage nurse"))
            .with_position(Position::new("T2", "triage"));

        assert_eq!(s.positions.len(), 2);
        assert!(s.positions.iter().all(|p| p.sector_id == "T"));
        assert_eq!(s.position("T1").unwrap().name, "Triage nurse");
        assert!(s.position("X").is_none());
    }

    #[test]
    fn test_deserialize_defaults() {
        let s: Sector = serde_json::from_str(
            r#"{"id": "RCP", "positions": [{"id": "RCP1", "skill": "resus"}]}"#,
        )
        .unwrap();
        assert_eq!(s.name, "");
        assert_eq!(s.positions[0].skill, "resus");
    }
}
