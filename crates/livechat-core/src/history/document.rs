//! Whole-document JSON array store.
//!
//! # Design Notes
//!
//! - **Read-modify-write**: every append reloads the array, pushes one record
//!   and rewrites the file
//! - **Atomic writes**: write to `{file}.tmp`, then rename over the original
//! - **Self-healing**: unreadable content, or anything other than an array of
//!   records, is treated as empty

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{ChatMessage, EventLog, HistoryError, LogRecord};

/// Event trail persisted as one JSON array.
pub struct JsonDocumentLog {
    path: PathBuf,
}

impl JsonDocumentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record, degrading to empty on any read or parse failure.
    ///
    /// An array holding anything other than records counts as corrupt.
    fn load_entries(&self) -> Vec<LogRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::error!("Error reading chat history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        if contents.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<LogRecord>>(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "Chat history {} is not an array of records, resetting: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn write_entries(&self, entries: &[LogRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp_path = PathBuf::from(temp);

        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn is_valid_document(&self) -> Result<bool, HistoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str::<Vec<LogRecord>>(&contents).is_ok())
    }
}

impl EventLog for JsonDocumentLog {
    fn initialize(&mut self) -> Result<(), HistoryError> {
        let exists = self.path.exists();
        match self.is_valid_document() {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => log::error!("Error initializing chat history file: {}", e),
        }

        self.write_entries(&[])?;
        if exists {
            log::info!("Reset invalid chat history file {}", self.path.display());
        } else {
            log::info!("Created new chat history file {}", self.path.display());
        }
        Ok(())
    }

    fn append(&mut self, message: ChatMessage, chat_id: &str) -> Result<LogRecord, HistoryError> {
        let mut entries = self.load_entries();
        let record = LogRecord::stamp(message, chat_id);
        entries.push(record.clone());
        self.write_entries(&entries)?;
        Ok(record)
    }

    fn load_all(&self) -> Result<Vec<LogRecord>, HistoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
