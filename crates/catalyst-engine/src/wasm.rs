//! WASM bindings for the web client

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::strategy::{Move, Strategy};
use crate::{payoff, ConversationId, GameConfig, GameEngine, PlayerId, RoundOutcome};

const REPLAY_CONVERSATION: ConversationId = ConversationId(0);
const REPLAY_PLAYER: PlayerId = PlayerId(0);

fn parse_strategy(label: &str) -> Result<Strategy, JsError> {
    Strategy::ALL
        .into_iter()
        .find(|s| s.label() == label || format!("{:?}", s) == label)
        .ok_or_else(|| JsError::new(&format!("Unknown strategy: {}", label)))
}

/// Play a whole game against `strategy` with the given player moves.
///
/// # Arguments
/// * `strategy` - `"Always C"`, `"Always D"`, `"TFT"` (or the variant name)
/// * `moves_json` - JSON array of moves: `"C"`/`"D"` strings or the
///   numeric encoding `1`/`2`
///
/// # Returns
/// Array of round outcomes. Moves after the game ends are ignored.
#[wasm_bindgen]
pub fn replay_game(strategy: &str, moves_json: &str) -> Result<JsValue, JsError> {
    let strategy = parse_strategy(strategy)?;
    let raw: Vec<serde_json::Value> = serde_json::from_str(moves_json)
        .map_err(|e| JsError::new(&format!("Invalid moves: {}", e)))?;

    let moves = raw
        .iter()
        .map(|value| match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| crate::EngineError::InvalidMove(n.to_string()))
                .and_then(Move::try_from),
            serde_json::Value::String(s) => s.parse::<Move>(),
            other => Err(crate::EngineError::InvalidMove(other.to_string())),
        })
        .collect::<Result<Vec<Move>, _>>()
        .map_err(|e| JsError::new(&e.to_string()))?;

    let engine = GameEngine::new(GameConfig::catalyst())
        .map_err(|e| JsError::new(&e.to_string()))?;
    engine.start_session_with_strategy(REPLAY_CONVERSATION, REPLAY_PLAYER, strategy);

    let mut outcomes: Vec<RoundOutcome> = Vec::with_capacity(moves.len());
    for m in moves {
        let outcome = engine
            .apply_move(REPLAY_CONVERSATION, m)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let finished = outcome.is_finished();
        outcomes.push(outcome);
        if finished {
            break;
        }
    }

    serde_wasm_bindgen::to_value(&outcomes)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Payoffs for one round, `[player, counterpart]`, using the numeric move
/// encoding (1 = Cooperate, 2 = Defect).
#[wasm_bindgen]
pub fn payoff_for(player: u8, counterpart: u8) -> Result<js_sys::Array, JsError> {
    let player = Move::try_from(player).map_err(|e| JsError::new(&e.to_string()))?;
    let counterpart = Move::try_from(counterpart).map_err(|e| JsError::new(&e.to_string()))?;
    let (p, c) = payoff(player, counterpart);

    let result = js_sys::Array::new();
    result.push(&JsValue::from_f64(p as f64));
    result.push(&JsValue::from_f64(c as f64));
    Ok(result)
}

#[derive(serde::Serialize)]
struct StrategyInfo {
    id: &'static str,
    label: &'static str,
    description: &'static str,
}

/// Get all counterpart strategies
#[wasm_bindgen]
pub fn get_strategy_types() -> Result<JsValue, JsError> {
    let types: Vec<StrategyInfo> = Strategy::ALL
        .into_iter()
        .map(|s| StrategyInfo {
            id: match s {
                Strategy::AlwaysCooperate => "AlwaysCooperate",
                Strategy::AlwaysDefect => "AlwaysDefect",
                Strategy::TitForTat => "TitForTat",
            },
            label: s.label(),
            description: s.describe(),
        })
        .collect();

    serde_wasm_bindgen::to_value(&types)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}
