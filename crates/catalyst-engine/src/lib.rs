//! Catalyst Engine
//!
//! Game engine for Catalyst, MrsBeauty's repeated Prisoner's Dilemma.
//! A player starts with a 15 $NST stake and plays up to five rounds
//! against a counterpart strategy chosen at random per game.
//!
//! The chat transport lives elsewhere; it drives the engine through
//! [`GameEngine::start_session`], [`GameEngine::apply_move`] and
//! [`GameEngine::stats`]. Compiled to:
//! - Native (for the chat bot)
//! - WASM (for the web client)

mod config;
mod engine;
mod error;
mod round_log;
mod session;
mod stats;
mod strategy;

#[cfg(feature = "wasm")]
mod wasm;

pub use config::{GameConfig, MAX_STAKE};
pub use engine::{GameEngine, RoundOutcome, RoundStatus, TerminalReason};
pub use error::{ConfigError, EngineError, Result, SinkError};
pub use round_log::{
    Clock, FixedClock, JsonLinesSink, MemorySink, NullSink, Payoffs, RoundLogSink, RoundRecord,
    SystemClock,
};
pub use session::{ConversationId, PlayerId, Session, SessionStore};
pub use stats::{GameVerdict, LastResult, PlayerStats, PlayerStatsStore};
pub use strategy::{Move, MoveHistory, Strategy};

/// Payoff matrix for Catalyst
/// Returns (player_delta, counterpart_delta)
pub fn payoff(player: Move, counterpart: Move) -> (i64, i64) {
    match (player, counterpart) {
        (Move::Cooperate, Move::Cooperate) => (3, 3),
        (Move::Cooperate, Move::Defect) => (-5, 7),
        (Move::Defect, Move::Cooperate) => (7, -5),
        (Move::Defect, Move::Defect) => (1, 1),
    }
}
