//! Cumulative per-player statistics
//!
//! Stats live for the lifetime of the process and are only touched when a
//! game reaches a terminal outcome.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::session::{lock, PlayerId};

/// How a finished game compares to the starting stake
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameVerdict {
    Win,
    Loss,
    BrokeEven,
}

impl GameVerdict {
    pub fn from_balance(final_balance: i64, stake: i64) -> Self {
        match final_balance.cmp(&stake) {
            std::cmp::Ordering::Greater => GameVerdict::Win,
            std::cmp::Ordering::Less => GameVerdict::Loss,
            std::cmp::Ordering::Equal => GameVerdict::BrokeEven,
        }
    }
}

/// Result of a player's most recent game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastResult {
    pub final_balance: i64,
    pub rounds_played: u8,
    pub is_win: bool,
}

impl LastResult {
    pub fn earning(&self, stake: i64) -> i64 {
        self.final_balance - stake
    }

    pub fn verdict(&self, stake: i64) -> GameVerdict {
        GameVerdict::from_balance(self.final_balance, stake)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games_played: u32,
    pub wins: u32,
    /// Draws count toward neither wins nor losses.
    pub losses: u32,
    pub highest_balance: i64,
    pub last_result: Option<LastResult>,
}

impl PlayerStats {
    fn new(starting_stake: i64) -> Self {
        Self {
            games_played: 0,
            wins: 0,
            losses: 0,
            highest_balance: starting_stake,
            last_result: None,
        }
    }

    /// Percentage of games won, 0 when nothing was played yet
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.games_played) * 100.0
    }

    pub fn highest_earning(&self, stake: i64) -> i64 {
        self.highest_balance - stake
    }
}

/// Player id -> cumulative stats.
pub struct PlayerStatsStore {
    starting_stake: i64,
    stats: Mutex<HashMap<PlayerId, PlayerStats>>,
}

impl PlayerStatsStore {
    pub fn new(starting_stake: i64) -> Self {
        Self {
            starting_stake,
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn starting_stake(&self) -> i64 {
        self.starting_stake
    }

    /// Fold a finished game into the player's stats and return the update.
    pub fn record_game_end(
        &self,
        player: PlayerId,
        final_balance: i64,
        rounds_played: u8,
    ) -> PlayerStats {
        let mut stats = lock(&self.stats);
        let entry = stats
            .entry(player)
            .or_insert_with(|| PlayerStats::new(self.starting_stake));

        let verdict = GameVerdict::from_balance(final_balance, self.starting_stake);
        entry.games_played += 1;
        match verdict {
            GameVerdict::Win => entry.wins += 1,
            GameVerdict::Loss => entry.losses += 1,
            GameVerdict::BrokeEven => {}
        }
        entry.highest_balance = entry.highest_balance.max(final_balance);
        entry.last_result = Some(LastResult {
            final_balance,
            rounds_played,
            is_win: verdict == GameVerdict::Win,
        });

        entry.clone()
    }

    /// `None` until the player has finished a game
    pub fn get(&self, player: PlayerId) -> Option<PlayerStats> {
        lock(&self.stats).get(&player).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: PlayerId = PlayerId(1);
    const BOB: PlayerId = PlayerId(2);

    #[test]
    fn test_no_stats_before_first_game() {
        let store = PlayerStatsStore::new(15);
        assert!(store.get(ALICE).is_none());
    }

    #[test]
    fn test_win_and_loss_aggregate() {
        let store = PlayerStatsStore::new(15);
        store.record_game_end(ALICE, 10, 5);
        store.record_game_end(ALICE, 20, 5);

        let stats = store.get(ALICE).unwrap();
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.highest_balance, 20);
        assert_eq!(
            stats.last_result,
            Some(LastResult {
                final_balance: 20,
                rounds_played: 5,
                is_win: true,
            })
        );
    }

    #[test]
    fn test_draw_counts_toward_neither() {
        let store = PlayerStatsStore::new(15);
        let stats = store.record_game_end(ALICE, 15, 5);

        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.losses, 0);
        assert_eq!(stats.highest_balance, 15);
        assert_eq!(stats.last_result.unwrap().verdict(15), GameVerdict::BrokeEven);
    }

    #[test]
    fn test_highest_balance_starts_at_stake() {
        let store = PlayerStatsStore::new(15);
        let stats = store.record_game_end(ALICE, -2, 3);
        assert_eq!(stats.highest_balance, 15);
        assert_eq!(stats.highest_earning(15), 0);
    }

    #[test]
    fn test_players_are_separate() {
        let store = PlayerStatsStore::new(15);
        store.record_game_end(ALICE, 30, 5);
        store.record_game_end(BOB, 0, 3);

        assert_eq!(store.get(ALICE).unwrap().wins, 1);
        assert_eq!(store.get(BOB).unwrap().losses, 1);
        assert_eq!(store.get(BOB).unwrap().wins, 0);
    }

    #[test]
    fn test_get_is_idempotent() {
        let store = PlayerStatsStore::new(15);
        store.record_game_end(ALICE, 18, 5);
        assert_eq!(store.get(ALICE), store.get(ALICE));
    }

    #[test]
    fn test_win_rate_and_earnings() {
        let store = PlayerStatsStore::new(15);
        store.record_game_end(ALICE, 30, 5);
        store.record_game_end(ALICE, 15, 5);
        store.record_game_end(ALICE, 0, 3);
        let stats = store.record_game_end(ALICE, 22, 5);

        assert!((stats.win_rate() - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.highest_earning(15), 15);
        assert_eq!(stats.last_result.unwrap().earning(15), 7);
        assert!(stats.wins + stats.losses <= stats.games_played);
    }

    #[test]
    fn test_win_rate_empty() {
        assert_eq!(PlayerStats::new(15).win_rate(), 0.0);
    }
}
