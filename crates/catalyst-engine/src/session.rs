//! Per-conversation game sessions
//!
//! One [`Session`] per conversation, held by the [`SessionStore`]. Each
//! session sits behind its own lock so moves for one conversation are
//! serialized while different conversations proceed independently. The
//! map lock is only held long enough to find, insert or drop a slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GameConfig;
use crate::error::{EngineError, Result};
use crate::strategy::{Move, MoveHistory, Strategy};

/// Chat the game is played in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

/// Player whose stats a game is folded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of one in-progress game.
///
/// Only the engine mutates a session; everything handed out by the store
/// is a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    conversation: ConversationId,
    player: PlayerId,
    /// 1-indexed round awaiting a move
    round: u8,
    history: MoveHistory,
    strategy: Strategy,
    player_balance: i64,
    counterpart_balance: i64,
    max_rounds: u8,
}

impl Session {
    pub(crate) fn new(
        conversation: ConversationId,
        player: PlayerId,
        strategy: Strategy,
        config: &GameConfig,
    ) -> Self {
        Self {
            conversation,
            player,
            round: 1,
            history: MoveHistory::new(),
            strategy,
            player_balance: config.starting_stake,
            counterpart_balance: config.counterpart_stake,
            max_rounds: config.max_rounds,
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn player_balance(&self) -> i64 {
        self.player_balance
    }

    pub fn counterpart_balance(&self) -> i64 {
        self.counterpart_balance
    }

    pub fn max_rounds(&self) -> u8 {
        self.max_rounds
    }

    pub fn rounds_played(&self) -> usize {
        self.history.player.len()
    }

    /// Both histories must hold exactly `round - 1` moves between rounds.
    pub(crate) fn check_history(&self) -> Result<()> {
        let expected = usize::from(self.round).saturating_sub(1);
        let player_moves = self.history.player.len();
        let counterpart_moves = self.history.counterpart.len();
        if self.round == 0 || player_moves != expected || counterpart_moves != expected {
            return Err(EngineError::CorruptState {
                conversation: self.conversation,
                round: self.round,
                player_moves,
                counterpart_moves,
            });
        }
        Ok(())
    }

    /// Apply one resolved round. On error nothing is changed.
    pub(crate) fn record_round(
        &mut self,
        player_move: Move,
        counterpart_move: Move,
        (player_delta, counterpart_delta): (i64, i64),
    ) -> Result<()> {
        let overflow = || EngineError::BalanceOverflow {
            conversation: self.conversation,
            round: self.round,
        };
        let player_balance = self
            .player_balance
            .checked_add(player_delta)
            .ok_or_else(overflow)?;
        let counterpart_balance = self
            .counterpart_balance
            .checked_add(counterpart_delta)
            .ok_or_else(overflow)?;
        let round = self.round.checked_add(1).ok_or_else(overflow)?;

        self.history.push(player_move, counterpart_move);
        self.player_balance = player_balance;
        self.counterpart_balance = counterpart_balance;
        self.round = round;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn history_mut(&mut self) -> &mut MoveHistory {
        &mut self.history
    }
}

/// A conversation's session slot. `None` once the game it held is over
/// or was abandoned.
pub(crate) type Slot = Arc<Mutex<Option<Session>>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Conversation id -> active session.
pub struct SessionStore {
    config: GameConfig,
    rng: Mutex<Box<dyn RngCore + Send>>,
    slots: Mutex<HashMap<ConversationId, Slot>>,
}

impl SessionStore {
    /// Store picking strategies from an entropy-seeded RNG
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            config,
            rng: Mutex::new(Box::new(rng)),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Start a game with a randomly chosen strategy, discarding any
    /// unfinished game in the same conversation.
    pub fn create(&self, conversation: ConversationId, player: PlayerId) -> Session {
        let strategy = {
            let mut rng = lock(&self.rng);
            Strategy::random(&mut *rng)
        };
        self.start_with_strategy(conversation, player, strategy)
    }

    /// Start a game against a fixed strategy.
    pub fn start_with_strategy(
        &self,
        conversation: ConversationId,
        player: PlayerId,
        strategy: Strategy,
    ) -> Session {
        let session = Session::new(conversation, player, strategy, &self.config);
        let slot: Slot = Arc::new(Mutex::new(Some(session.clone())));

        let previous = lock(&self.slots).insert(conversation, slot);

        // Waits out a move in flight on the old game, then empties it so
        // anything queued behind sees no session.
        if let Some(old) = previous {
            let abandoned = lock(&old).take();
            if let Some(abandoned) = abandoned {
                info!(
                    conversation = %conversation,
                    round = abandoned.round(),
                    balance = abandoned.player_balance(),
                    "discarding unfinished game"
                );
            }
        }

        info!(
            conversation = %conversation,
            player = %player,
            strategy = %strategy,
            stake = session.player_balance(),
            "game started"
        );
        session
    }

    /// Snapshot of the game in progress, if any.
    pub fn get(&self, conversation: ConversationId) -> Option<Session> {
        let slot = self.slot(conversation)?;
        let guard = lock(&slot);
        guard.clone()
    }

    /// Drop the game in progress, returning its final state.
    pub fn remove(&self, conversation: ConversationId) -> Option<Session> {
        let slot = lock(&self.slots).remove(&conversation)?;
        let mut guard = lock(&slot);
        guard.take()
    }

    /// Number of games in progress
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn slot(&self, conversation: ConversationId) -> Option<Slot> {
        lock(&self.slots).get(&conversation).cloned()
    }

    /// Remove `slot` from the map unless a newer game already replaced it.
    pub(crate) fn release_slot(&self, conversation: ConversationId, slot: &Slot) {
        let mut slots = lock(&self.slots);
        if slots.get(&conversation).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&conversation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ConversationId = ConversationId(100);
    const ALICE: PlayerId = PlayerId(1);

    fn store() -> SessionStore {
        SessionStore::with_rng(GameConfig::catalyst(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_create_initial_state() {
        let store = store();
        let session = store.create(CHAT, ALICE);

        assert_eq!(session.round(), 1);
        assert_eq!(session.player_balance(), 15);
        assert_eq!(session.counterpart_balance(), 0);
        assert_eq!(session.max_rounds(), 5);
        assert!(session.history().player.is_empty());
        assert!(session.history().counterpart.is_empty());
        assert!(session.check_history().is_ok());
        assert_eq!(store.get(CHAT), Some(session));
    }

    #[test]
    fn test_create_overwrites_previous_game() {
        let store = store();
        store.start_with_strategy(CHAT, ALICE, Strategy::AlwaysDefect);

        let old = store.slot(CHAT).unwrap();
        lock(&old)
            .as_mut()
            .unwrap()
            .record_round(Move::Cooperate, Move::Defect, (-5, 7))
            .unwrap();

        let fresh = store.start_with_strategy(CHAT, ALICE, Strategy::TitForTat);
        assert_eq!(fresh.round(), 1);
        assert_eq!(store.get(CHAT).unwrap().strategy(), Strategy::TitForTat);
        assert_eq!(store.get(CHAT).unwrap().player_balance(), 15);
        // The abandoned slot is emptied for anyone still holding it.
        assert!(lock(&old).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        assert!(store().get(CHAT).is_none());
    }

    #[test]
    fn test_remove() {
        let store = store();
        store.create(CHAT, ALICE);
        assert!(store.remove(CHAT).is_some());
        assert!(store.get(CHAT).is_none());
        assert!(store.remove(CHAT).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_conversations_are_independent() {
        let store = store();
        store.start_with_strategy(ConversationId(1), ALICE, Strategy::AlwaysCooperate);
        store.start_with_strategy(ConversationId(2), PlayerId(2), Strategy::AlwaysDefect);
        store.remove(ConversationId(1));

        assert!(store.get(ConversationId(1)).is_none());
        assert_eq!(
            store.get(ConversationId(2)).unwrap().strategy(),
            Strategy::AlwaysDefect
        );
    }

    #[test]
    fn test_release_slot_keeps_newer_game() {
        let store = store();
        store.create(CHAT, ALICE);
        let stale = store.slot(CHAT).unwrap();
        store.create(CHAT, ALICE);

        store.release_slot(CHAT, &stale);
        assert!(store.get(CHAT).is_some());

        let current = store.slot(CHAT).unwrap();
        store.release_slot(CHAT, &current);
        assert!(store.get(CHAT).is_none());
    }

    #[test]
    fn test_check_history_detects_mismatch() {
        let mut session = Session::new(CHAT, ALICE, Strategy::TitForTat, &GameConfig::catalyst());
        session.history_mut().player.push(Move::Cooperate);

        assert_eq!(
            session.check_history(),
            Err(EngineError::CorruptState {
                conversation: CHAT,
                round: 1,
                player_moves: 1,
                counterpart_moves: 0,
            })
        );
    }

    #[test]
    fn test_record_round() {
        let mut session = Session::new(CHAT, ALICE, Strategy::TitForTat, &GameConfig::catalyst());
        session.record_round(Move::Defect, Move::Cooperate, (7, -5)).unwrap();

        assert_eq!(session.round(), 2);
        assert_eq!(session.player_balance(), 22);
        assert_eq!(session.counterpart_balance(), -5);
        assert_eq!(session.rounds_played(), 1);
        assert!(session.check_history().is_ok());
    }

    #[test]
    fn test_record_round_overflow_leaves_session_untouched() {
        let overflow = EngineError::BalanceOverflow {
            conversation: CHAT,
            round: 1,
        };

        let rich_player = GameConfig {
            starting_stake: i64::MAX - 3,
            ..GameConfig::catalyst()
        };
        let mut session = Session::new(CHAT, ALICE, Strategy::AlwaysCooperate, &rich_player);
        let before = session.clone();
        assert_eq!(
            session.record_round(Move::Defect, Move::Cooperate, (7, -5)),
            Err(overflow.clone())
        );
        assert_eq!(session, before);
        assert!(session.check_history().is_ok());

        let broke_counterpart = GameConfig {
            counterpart_stake: i64::MIN,
            ..GameConfig::catalyst()
        };
        let mut session = Session::new(CHAT, ALICE, Strategy::AlwaysCooperate, &broke_counterpart);
        let before = session.clone();
        assert_eq!(
            session.record_round(Move::Defect, Move::Cooperate, (7, -5)),
            Err(overflow)
        );
        assert_eq!(session, before);
        assert!(session.check_history().is_ok());
    }
}
