//! JSONL event trail.
//!
//! Stores records as append-only JSON lines. Appends never reread the file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{ChatMessage, EventLog, HistoryError, LogRecord};

/// Event trail persisted as one JSON record per line.
pub struct JsonlLog {
    path: PathBuf,
    file: Option<File>,
}

impl JsonlLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut File, HistoryError> {
        if self.file.is_none() {
            self.ensure_parent()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(file);
        }

        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "Missing file handle").into())
    }

    /// Count lines, returning `None` as soon as one is not a valid record.
    fn count_valid_lines(&self) -> Result<Option<usize>, HistoryError> {
        let file = File::open(&self.path)?;
        let mut count = 0;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<LogRecord>(&line).is_err() {
                return Ok(None);
            }
            count += 1;
        }
        Ok(Some(count))
    }
}

impl EventLog for JsonlLog {
    fn initialize(&mut self) -> Result<(), HistoryError> {
        self.file = None;

        if !self.path.exists() {
            self.ensure_parent()?;
            File::create(&self.path)?;
            log::info!("Created new chat history file {}", self.path.display());
            return Ok(());
        }

        match self.count_valid_lines() {
            Ok(Some(count)) => {
                log::debug!("Chat history holds {} records", count);
                Ok(())
            }
            Ok(None) | Err(_) => {
                File::create(&self.path)?;
                log::info!("Reset invalid chat history file {}", self.path.display());
                Ok(())
            }
        }
    }

    fn append(&mut self, message: ChatMessage, chat_id: &str) -> Result<LogRecord, HistoryError> {
        let record = LogRecord::stamp(message, chat_id);
        let line = serde_json::to_string(&record)?;

        let result = {
            let file = self.writer()?;
            writeln!(file, "{line}").and_then(|_| file.flush())
        };
        if let Err(e) = result {
            // Reopen on the next append.
            self.file = None;
            return Err(e.into());
        }

        Ok(record)
    }

    fn load_all(&self) -> Result<Vec<LogRecord>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
