//! Lobby settings and their validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::player::Money;

/// Net worth needed to win unless the host sets another goal.
pub const DEFAULT_TARGET_VALUE: Money = 1_000_000;

/// Longest accepted player name.
pub const MAX_NAME_LEN: usize = 15;

/// Game difficulty, 1 (easy) to 4.
///
/// Higher difficulty makes large price swings likelier and flash-news
/// windfalls rarer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const EASY: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(4);

    /// Validate a raw difficulty level.
    pub fn new(level: i64) -> Result<Self> {
        if (1..=4).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(CoreError::InvalidDifficulty(level))
        }
    }

    pub fn level(&self) -> i64 {
        self.0 as i64
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::EASY
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Difficulty> for i64 {
    fn from(d: Difficulty) -> Self {
        d.level()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings the host chooses in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    pub target_value: Money,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            target_value: DEFAULT_TARGET_VALUE,
        }
    }
}

impl GameSettings {
    /// Build settings, rejecting a non-positive goal.
    pub fn new(difficulty: Difficulty, target_value: Money) -> Result<Self> {
        if target_value <= 0 {
            return Err(CoreError::InvalidTarget(target_value));
        }
        Ok(Self {
            difficulty,
            target_value,
        })
    }
}

/// A validated player name: trimmed, uppercase, 1..=15 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(raw: &str) -> Result<Self> {
        let name = raw.trim().to_uppercase();
        if name.is_empty() {
            return Err(CoreError::InvalidName("name is empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::InvalidName(format!(
                "max {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> Self {
        name.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_range() {
        assert!(Difficulty::new(0).is_err());
        assert_eq!(Difficulty::new(1).unwrap(), Difficulty::EASY);
        assert_eq!(Difficulty::new(4).unwrap(), Difficulty::MAX);
        assert_eq!(Difficulty::new(5), Err(CoreError::InvalidDifficulty(5)));
    }

    #[test]
    fn test_difficulty_deserialize_rejects_out_of_range() {
        let ok: Difficulty = serde_json::from_str("3").unwrap();
        assert_eq!(ok.level(), 3);
        assert!(serde_json::from_str::<Difficulty>("9").is_err());
    }

    #[test]
    fn test_settings_reject_non_positive_goal() {
        assert!(GameSettings::new(Difficulty::EASY, 0).is_err());
        assert!(GameSettings::new(Difficulty::EASY, -5).is_err());
        let s = GameSettings::new(Difficulty::MAX, 5_000_000).unwrap();
        assert_eq!(s.target_value, 5_000_000);
    }

    #[test]
    fn test_player_name_normalised() {
        let name = PlayerName::new("  alice ").unwrap();
        assert_eq!(name.as_str(), "ALICE");
    }

    #[test]
    fn test_player_name_length() {
        assert!(PlayerName::new("   ").is_err());
        assert!(PlayerName::new("ABCDEFGHIJKLMNO").is_ok());
        assert!(PlayerName::new("ABCDEFGHIJKLMNOP").is_err());
    }
}
