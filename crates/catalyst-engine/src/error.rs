//! Error types for the Catalyst engine

use std::path::PathBuf;

use thiserror::Error;

use crate::session::ConversationId;

/// Errors surfaced by [`GameEngine`](crate::GameEngine) operations.
///
/// Every variant is reported with no partial mutation observable: a round
/// either completes entirely or leaves the session as it was (or, for
/// [`EngineError::CorruptState`], discards it).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Input could not be read as Cooperate or Defect.
    #[error("Invalid move: {0:?}")]
    InvalidMove(String),

    /// A move arrived for a conversation with no game in progress.
    #[error("No active game for conversation {0}")]
    NoActiveSession(ConversationId),

    /// Move history no longer lines up with the round counter.
    /// The session has been discarded.
    #[error(
        "Corrupt game state for conversation {conversation}: round {round}, \
         {player_moves} player moves, {counterpart_moves} counterpart moves"
    )]
    CorruptState {
        conversation: ConversationId,
        round: u8,
        player_moves: usize,
        counterpart_moves: usize,
    },

    /// The round's payoff does not fit in a balance. Nothing was applied.
    #[error("Balance overflow in conversation {conversation} at round {round}")]
    BalanceOverflow {
        conversation: ConversationId,
        round: u8,
    },
}

impl EngineError {
    /// Whether the caller can recover by prompting for a new game.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::CorruptState { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors loading or validating a [`GameConfig`](crate::GameConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Failure appending to a round log. Never escapes the engine.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Round log IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Round log serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_state_is_not_recoverable() {
        let err = EngineError::CorruptState {
            conversation: ConversationId(7),
            round: 3,
            player_moves: 2,
            counterpart_moves: 1,
        };
        assert!(!err.is_recoverable());
        assert!(EngineError::NoActiveSession(ConversationId(7)).is_recoverable());
        assert!(EngineError::InvalidMove("x".into()).is_recoverable());
        assert!(EngineError::BalanceOverflow {
            conversation: ConversationId(7),
            round: 1,
        }
        .is_recoverable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            EngineError::NoActiveSession(ConversationId(42)).to_string(),
            "No active game for conversation 42"
        );
        assert_eq!(
            EngineError::InvalidMove("maybe".into()).to_string(),
            "Invalid move: \"maybe\""
        );
    }
}
