//! Moves and MrsBeauty's counterpart strategies

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    /// Single-letter code used in the round log and chat callbacks.
    pub fn code(self) -> char {
        match self {
            Move::Cooperate => 'C',
            Move::Defect => 'D',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Move::Cooperate => "Cooperate",
            Move::Defect => "Defect",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `C`/`D`, `Cooperate`/`Defect` in any case, and the chat
/// callback payloads `move_C`/`move_D`.
impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let token = trimmed.strip_prefix("move_").unwrap_or(trimmed);
        if token.eq_ignore_ascii_case("c") || token.eq_ignore_ascii_case("cooperate") {
            Ok(Move::Cooperate)
        } else if token.eq_ignore_ascii_case("d") || token.eq_ignore_ascii_case("defect") {
            Ok(Move::Defect)
        } else {
            Err(EngineError::InvalidMove(s.to_string()))
        }
    }
}

/// Numeric encoding used by the web client: 1 = Cooperate, 2 = Defect.
impl TryFrom<u8> for Move {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Move::Cooperate),
            2 => Ok(Move::Defect),
            other => Err(EngineError::InvalidMove(other.to_string())),
        }
    }
}

/// Moves played so far in a session, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistory {
    pub player: Vec<Move>,
    pub counterpart: Vec<Move>,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, player: Move, counterpart: Move) {
        self.player.push(player);
        self.counterpart.push(counterpart);
    }
}

/// How MrsBeauty picks her move. Chosen once per session and fixed.
///
/// Serialized names match the `ai_strategy` field of the round log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Always cooperate, never defect.
    #[serde(rename = "Always C")]
    AlwaysCooperate,
    /// Always defect, never cooperate.
    #[serde(rename = "Always D")]
    AlwaysDefect,
    /// Copy the player's last move. Start with cooperate.
    #[serde(rename = "TFT")]
    TitForTat,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::AlwaysCooperate,
        Strategy::AlwaysDefect,
        Strategy::TitForTat,
    ];

    /// Pick a strategy uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// MrsBeauty's move for the coming round.
    pub fn next_move(&self, history: &MoveHistory) -> Move {
        match self {
            Strategy::AlwaysCooperate => Move::Cooperate,
            Strategy::AlwaysDefect => Move::Defect,
            Strategy::TitForTat => history.player.last().copied().unwrap_or(Move::Cooperate),
        }
    }

    /// Log label, e.g. `"TFT"`.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::AlwaysCooperate => "Always C",
            Strategy::AlwaysDefect => "Always D",
            Strategy::TitForTat => "TFT",
        }
    }

    /// The explanation MrsBeauty reveals once the game is over.
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::AlwaysCooperate => "I always chose to cooperate, no matter what you did!",
            Strategy::AlwaysDefect => "I always chose to defect, every single round!",
            Strategy::TitForTat => {
                "I simply copied your previous move each round. If you cooperated, I did too; \
                 if you defected, so did I!"
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
