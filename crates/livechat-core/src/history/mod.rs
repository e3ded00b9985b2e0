//! Append-only audit trail of every chat event.
//!
//! # Overview
//!
//! Each state-changing action of the relay produces one [`LogRecord`]. The
//! records are write-only from the relay's point of view: nothing read back
//! from the trail ever influences a session decision. [`EventLog::load_all`]
//! exists for audits and tests.
//!
//! # Formats
//!
//! ```text
//! json   chat_history.json   one pretty-printed JSON array, rewritten on every append
//! jsonl  chat_history.jsonl  one record per line, appended sequentially
//! ```
//!
//! Both formats self-heal on [`EventLog::initialize`]: a missing file is
//! created and a structurally invalid one is reset to empty.

mod document;
mod jsonl;

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::participant::{Endpoint, Sender};

pub use document::JsonDocumentLog;
pub use jsonl::JsonlLog;

/// `chatId` recorded when no chat is active at append time.
pub const NO_ACTIVE_CHAT: &str = "no-active-chat";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A message as handed to the store, before it is stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub time: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

/// One persisted record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub sender: Sender,
    pub text: String,
    pub time: String,
    pub from: Endpoint,
    pub to: Endpoint,
    /// UTC ISO-8601 with milliseconds, e.g. `2026-02-04T10:15:30.123Z`.
    pub timestamp: String,
    pub chat_id: String,
}

impl LogRecord {
    /// Stamp a message with the current time and the given chat id.
    pub fn stamp(message: ChatMessage, chat_id: &str) -> Self {
        Self {
            sender: message.sender,
            text: message.text,
            time: message.time,
            from: message.from,
            to: message.to,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            chat_id: chat_id.to_string(),
        }
    }
}

/// Durable, write-only event trail.
pub trait EventLog: Send {
    /// Ensure the backing file exists and is structurally valid, resetting it
    /// to empty otherwise. Idempotent.
    fn initialize(&mut self) -> Result<(), HistoryError>;

    /// Stamp and persist one message. Returns the record that was written.
    fn append(&mut self, message: ChatMessage, chat_id: &str) -> Result<LogRecord, HistoryError>;

    /// Reload every record in append order.
    fn load_all(&self) -> Result<Vec<LogRecord>, HistoryError>;
}

/// On-disk layout of the trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryFormat {
    /// A single JSON array document.
    #[default]
    Json,
    /// JSON lines, appended sequentially.
    Jsonl,
}

impl FromStr for HistoryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(HistoryFormat::Json),
            "jsonl" => Ok(HistoryFormat::Jsonl),
            other => Err(format!("Unknown history format: {other} (expected json or jsonl)")),
        }
    }
}

impl std::fmt::Display for HistoryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryFormat::Json => write!(f, "json"),
            HistoryFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Open (but do not initialize) a store of the given format at `path`.
pub fn open(path: PathBuf, format: HistoryFormat) -> Box<dyn EventLog> {
    match format {
        HistoryFormat::Json => Box::new(JsonDocumentLog::new(path)),
        HistoryFormat::Jsonl => Box::new(JsonlLog::new(path)),
    }
}
