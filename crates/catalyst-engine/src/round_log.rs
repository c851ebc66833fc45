//! Append-only round log
//!
//! Every resolved round produces one [`RoundRecord`]. The JSON-lines
//! shape is read by offline analysis tooling, so field names and
//! encodings are fixed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::session::{lock, ConversationId, PlayerId};
use crate::strategy::{Move, Strategy};

/// Source of wall-clock time for log timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payoffs {
    pub player: i64,
    #[serde(rename = "ai")]
    pub counterpart: i64,
}

/// One line of the round log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub timestamp: NaiveDateTime,
    #[serde(rename = "user_id")]
    pub player: PlayerId,
    #[serde(rename = "chat_id")]
    pub conversation: ConversationId,
    /// Round just played
    pub round: u8,
    #[serde(with = "move_code")]
    pub player_move: Move,
    #[serde(rename = "ai_move", with = "move_code")]
    pub counterpart_move: Move,
    pub payoffs: Payoffs,
    pub player_balance: i64,
    #[serde(rename = "ai_balance")]
    pub counterpart_balance: i64,
    #[serde(rename = "ai_strategy")]
    pub strategy: Strategy,
}

/// Moves are logged as `"C"` / `"D"`.
mod move_code {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::strategy::Move;

    pub fn serialize<S: Serializer>(m: &Move, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(m.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Move, D::Error> {
        let code = String::deserialize(deserializer)?;
        match code.as_str() {
            "C" => Ok(Move::Cooperate),
            "D" => Ok(Move::Defect),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Str(other),
                &"\"C\" or \"D\"",
            )),
        }
    }
}

/// Destination for round records.
///
/// Appends are best-effort: the engine logs failures and carries on.
pub trait RoundLogSink: Send + Sync {
    fn append(&self, record: &RoundRecord) -> Result<(), SinkError>;
}

/// Discards every record
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RoundLogSink for NullSink {
    fn append(&self, _record: &RoundRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Appends one JSON object per line to a file, creating it if needed.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    // Serializes writers so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RoundLogSink for JsonLinesSink {
    fn append(&self, record: &RoundRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = lock(&self.write_lock);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<RoundRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RoundRecord> {
        lock(&self.records).clone()
    }
}

impl RoundLogSink for MemorySink {
    fn append(&self, record: &RoundRecord) -> Result<(), SinkError> {
        lock(&self.records).push(record.clone());
        Ok(())
    }
}

impl<T: RoundLogSink + ?Sized> RoundLogSink for std::sync::Arc<T> {
    fn append(&self, record: &RoundRecord) -> Result<(), SinkError> {
        (**self).append(record)
    }
}
