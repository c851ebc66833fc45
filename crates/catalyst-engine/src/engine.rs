//! Round orchestration
//!
//! [`GameEngine::apply_move`] resolves one round: MrsBeauty picks her move,
//! payoffs are applied, the round is logged, and the game either waits for
//! the next move or ends. Finished games are folded into player stats and
//! removed from the session store before the outcome is returned.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::GameConfig;
use crate::error::{ConfigError, EngineError, Result};
use crate::payoff;
use crate::round_log::{
    Clock, JsonLinesSink, NullSink, Payoffs, RoundLogSink, RoundRecord, SystemClock,
};
use crate::session::{lock, ConversationId, PlayerId, Session, SessionStore};
use crate::stats::{PlayerStats, PlayerStatsStore};
use crate::strategy::{Move, Strategy};

/// Why a game ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    /// Player balance reached zero or below.
    Busted,
    /// All rounds played with a positive balance.
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Waiting for the player's move in `next_round`.
    Continue { next_round: u8 },
    /// Game over; the session is gone.
    Finished {
        reason: TerminalReason,
        /// MrsBeauty's strategy, revealed now that the game is over
        strategy: Strategy,
        rounds_played: u8,
        stats: PlayerStats,
    },
}

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Round just played (1-indexed)
    pub round: u8,
    pub player_move: Move,
    pub counterpart_move: Move,
    pub player_delta: i64,
    pub counterpart_delta: i64,
    pub player_balance: i64,
    pub counterpart_balance: i64,
    pub status: RoundStatus,
}

impl RoundOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, RoundStatus::Finished { .. })
    }

    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        match self.status {
            RoundStatus::Finished { reason, .. } => Some(reason),
            RoundStatus::Continue { .. } => None,
        }
    }
}

/// Decide what follows a resolved round. Uses the post-increment round
/// and the updated balance.
fn terminal_reason(session: &Session) -> Option<TerminalReason> {
    if session.player_balance() <= 0 {
        Some(TerminalReason::Busted)
    } else if session.round() > session.max_rounds() {
        Some(TerminalReason::Completed)
    } else {
        None
    }
}

/// Catalyst game engine: sessions, stats, and the round log.
pub struct GameEngine {
    sessions: SessionStore,
    stats: PlayerStatsStore,
    round_log: Box<dyn RoundLogSink>,
    clock: Box<dyn Clock>,
}

impl GameEngine {
    /// Engine with no round log, the system clock, and an entropy-seeded RNG
    pub fn new(config: GameConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stats: PlayerStatsStore::new(config.starting_stake),
            sessions: SessionStore::new(config),
            round_log: Box::new(NullSink),
            clock: Box::new(SystemClock),
        })
    }

    /// Like [`GameEngine::new`], writing the round log to
    /// `config.round_log_path` when set.
    pub fn from_config(config: GameConfig) -> std::result::Result<Self, ConfigError> {
        let path = config.round_log_path.clone();
        let engine = Self::new(config)?;
        Ok(match path {
            Some(path) => engine.with_round_log(JsonLinesSink::new(path)),
            None => engine,
        })
    }

    /// Replace the strategy RNG. Discards any games already started.
    pub fn with_rng(mut self, rng: impl rand::RngCore + Send + 'static) -> Self {
        self.sessions = SessionStore::with_rng(self.sessions.config().clone(), rng);
        self
    }

    pub fn with_round_log(mut self, sink: impl RoundLogSink + 'static) -> Self {
        self.round_log = Box::new(sink);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &GameConfig {
        self.sessions.config()
    }

    /// Start a new game against a random strategy. An unfinished game in
    /// the same conversation is discarded without touching stats.
    pub fn start_session(&self, conversation: ConversationId, player: PlayerId) -> Session {
        self.sessions.create(conversation, player)
    }

    pub fn start_session_with_strategy(
        &self,
        conversation: ConversationId,
        player: PlayerId,
        strategy: Strategy,
    ) -> Session {
        self.sessions.start_with_strategy(conversation, player, strategy)
    }

    /// Snapshot of the game in progress
    pub fn session(&self, conversation: ConversationId) -> Option<Session> {
        self.sessions.get(conversation)
    }

    pub fn stats(&self, player: PlayerId) -> Option<PlayerStats> {
        self.stats.get(player)
    }

    /// Parse raw input (`"C"`, `"move_D"`, ...) and play it.
    pub fn apply_move_str(
        &self,
        conversation: ConversationId,
        input: &str,
    ) -> Result<RoundOutcome> {
        let player_move: Move = input.parse()?;
        self.apply_move(conversation, player_move)
    }

    /// Play one round for `conversation`.
    ///
    /// Fails with [`EngineError::NoActiveSession`] when no game is running
    /// and [`EngineError::CorruptState`] (after discarding the game) when
    /// the stored history is inconsistent. A round whose payoff would
    /// overflow a balance fails with [`EngineError::BalanceOverflow`] and
    /// leaves the game as it was.
    pub fn apply_move(
        &self,
        conversation: ConversationId,
        player_move: Move,
    ) -> Result<RoundOutcome> {
        let slot = self
            .sessions
            .slot(conversation)
            .ok_or(EngineError::NoActiveSession(conversation))?;

        let mut guard = lock(&slot);
        let Some(session) = guard.as_mut() else {
            return Err(EngineError::NoActiveSession(conversation));
        };

        if let Err(err) = session.check_history() {
            error!(conversation = %conversation, error = %err, "discarding corrupt game");
            guard.take();
            drop(guard);
            self.sessions.release_slot(conversation, &slot);
            return Err(err);
        }

        let round = session.round();
        let counterpart_move = session.strategy().next_move(session.history());
        let (player_delta, counterpart_delta) = payoff(player_move, counterpart_move);
        if let Err(err) =
            session.record_round(player_move, counterpart_move, (player_delta, counterpart_delta))
        {
            warn!(conversation = %conversation, round, error = %err, "round rejected");
            return Err(err);
        }

        let player = session.player();
        let strategy = session.strategy();
        let player_balance = session.player_balance();
        let counterpart_balance = session.counterpart_balance();

        let record = RoundRecord {
            timestamp: self.clock.now(),
            player,
            conversation,
            round,
            player_move,
            counterpart_move,
            payoffs: Payoffs {
                player: player_delta,
                counterpart: counterpart_delta,
            },
            player_balance,
            counterpart_balance,
            strategy,
        };
        if let Err(err) = self.round_log.append(&record) {
            warn!(conversation = %conversation, round, error = %err, "failed to write round log");
        }

        debug!(
            conversation = %conversation,
            round,
            player_move = %player_move,
            counterpart_move = %counterpart_move,
            player_balance,
            "round resolved"
        );

        let status = match terminal_reason(session) {
            None => RoundStatus::Continue {
                next_round: session.round(),
            },
            Some(reason) => {
                let rounds_played = session.round() - 1;
                // Stats are folded before the game disappears from the store.
                let stats = self.stats.record_game_end(player, player_balance, rounds_played);
                guard.take();
                drop(guard);
                self.sessions.release_slot(conversation, &slot);

                info!(
                    conversation = %conversation,
                    player = %player,
                    ?reason,
                    strategy = %strategy,
                    final_balance = player_balance,
                    rounds_played,
                    "game over"
                );
                RoundStatus::Finished {
                    reason,
                    strategy,
                    rounds_played,
                    stats,
                }
            }
        };

        Ok(RoundOutcome {
            round,
            player_move,
            counterpart_move,
            player_delta,
            counterpart_delta,
            player_balance,
            counterpart_balance,
            status,
        })
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self {
            stats: PlayerStatsStore::new(GameConfig::catalyst().starting_stake),
            sessions: SessionStore::new(GameConfig::catalyst()),
            round_log: Box::new(NullSink),
            clock: Box::new(SystemClock),
        }
    }
}
