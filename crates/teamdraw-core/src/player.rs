// Player record model: identifiers, skill levels, and the roster entry itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIN_SKILL: u8 = 1;
pub const MAX_SKILL: u8 = 5;

/// Skill assigned when the organizer's input is not a number at all.
pub const DEFAULT_SKILL: u8 = 3;

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Input rejected before it ever reaches a persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("player name must not be empty")]
    EmptyName,

    #[error("skill level must be between 1 and 5, got {0}")]
    SkillOutOfRange(i64),

    #[error("team size must be at least 1")]
    InvalidTeamSize,

    #[error("team index {index} is out of range")]
    TeamIndexOutOfRange { index: usize },
}

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Opaque player identifier. Millisecond timestamps for local records,
/// server-assigned row ids for remote ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SkillLevel
// ---------------------------------------------------------------------------

/// A skill rating guaranteed to lie in `[MIN_SKILL, MAX_SKILL]`.
///
/// The only way to build one is through [`SkillLevel::new`], so an invalid
/// value can never be stored on a [`Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SkillLevel(u8);

impl SkillLevel {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        validate_skill_level(value)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parse organizer input. Non-numeric text falls back to
    /// [`DEFAULT_SKILL`]; numbers outside the range are rejected.
    pub fn parse_input(input: &str) -> Result<Self, ValidationError> {
        match input.trim().parse::<i64>() {
            Ok(value) => Self::new(value),
            Err(_) => Ok(SkillLevel(DEFAULT_SKILL)),
        }
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel(DEFAULT_SKILL)
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SkillLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        SkillLevel::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Accept `value` if it lies within the skill range, reject it otherwise.
/// Out-of-range values are never truncated into range.
pub fn validate_skill_level(value: i64) -> Result<SkillLevel, ValidationError> {
    if (MIN_SKILL as i64..=MAX_SKILL as i64).contains(&value) {
        Ok(SkillLevel(value as u8))
    } else {
        Err(ValidationError::SkillOutOfRange(value))
    }
}

/// Trim a display name and reject it if nothing is left.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// SourceMode
// ---------------------------------------------------------------------------

/// Which persistence adapter owns a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Local,
    Remote,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

fn default_present() -> bool {
    true
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub skill_level: SkillLevel,
    /// Absent players stay on the roster but are left out of draws.
    #[serde(default = "default_present")]
    pub present: bool,
    /// Not stored: local records are always `Local`, and remote records are
    /// tagged when they are mapped from the service.
    #[serde(skip)]
    pub source: SourceMode,
}

impl Player {
    pub fn new(id: PlayerId, name: String, skill_level: SkillLevel, source: SourceMode) -> Self {
        Player {
            id,
            name,
            skill_level,
            present: true,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
