//! Game configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest stake either side may start with.
pub const MAX_STAKE: i64 = 1_000_000_000;

/// Parameters of a Catalyst game.
///
/// Missing keys in a TOML file fall back to the [`GameConfig::catalyst`] values.
/// Unknown keys are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Player's starting balance, also the win/loss threshold for stats.
    pub starting_stake: i64,
    /// Rounds in a full game.
    pub max_rounds: u8,
    /// MrsBeauty's starting balance.
    pub counterpart_stake: i64,
    /// JSON-lines round log. No log is written when unset.
    pub round_log_path: Option<PathBuf>,
}

impl GameConfig {
    /// Standard Catalyst game: 15 $NST stake, 5 rounds
    pub fn catalyst() -> Self {
        Self {
            starting_stake: 15,
            max_rounds: 5,
            counterpart_stake: 0,
            round_log_path: None,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_STAKE).contains(&self.starting_stake) {
            return Err(ConfigError::Invalid(format!(
                "starting_stake must be between 1 and {}, got {}",
                MAX_STAKE, self.starting_stake
            )));
        }
        if !(-MAX_STAKE..=MAX_STAKE).contains(&self.counterpart_stake) {
            return Err(ConfigError::Invalid(format!(
                "counterpart_stake must be between {} and {}, got {}",
                -MAX_STAKE, MAX_STAKE, self.counterpart_stake
            )));
        }
        // The round counter runs one past max_rounds.
        if self.max_rounds == 0 || self.max_rounds == u8::MAX {
            return Err(ConfigError::Invalid(format!(
                "max_rounds must be between 1 and {}, got {}",
                u8::MAX - 1,
                self.max_rounds
            )));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::catalyst()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalyst_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.starting_stake, 15);
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.counterpart_stake, 0);
        assert!(config.round_log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GameConfig::from_toml_str("max_rounds = 7\n").unwrap();
        assert_eq!(config.max_rounds, 7);
        assert_eq!(config.starting_stake, 15);
    }

    #[test]
    fn test_toml_round_log_path() {
        let config = GameConfig::from_toml_str("round_log_path = \"game_data.log\"\n").unwrap();
        assert_eq!(config.round_log_path, Some(PathBuf::from("game_data.log")));
    }

    #[test]
    fn test_rejects_zero_rounds() {
        let err = GameConfig::from_toml_str("max_rounds = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_round_counter_overflow() {
        let err = GameConfig::from_toml_str("max_rounds = 255\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(GameConfig::from_toml_str("max_rounds = 254\n").is_ok());
    }

    #[test]
    fn test_rejects_non_positive_stake() {
        let err = GameConfig::from_toml_str("starting_stake = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_extreme_stakes() {
        for raw in [
            "starting_stake = 9223372036854775804\n",
            "counterpart_stake = -9223372036854775808\n",
            "counterpart_stake = 1000000001\n",
        ] {
            let err = GameConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{raw}");
        }
        let config = GameConfig::from_toml_str("starting_stake = 1000000000\n").unwrap();
        assert_eq!(config.starting_stake, MAX_STAKE);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = GameConfig::from_toml_str("max_round = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = GameConfig::from_toml_str("max_rounds = \"five\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalyst.toml");
        std::fs::write(&path, "starting_stake = 20\n").unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.starting_stake, 20);

        let missing = GameConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
