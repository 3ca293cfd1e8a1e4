mod file_ops;

use std::{fmt, path::PathBuf};

use self::file_ops::FileOps;

#[derive(Debug)]
pub enum HistoryError {
    Io(std::io::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Io(e) => write!(f, "history file: {}", e),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<std::io::Error> for HistoryError {
    fn from(e: std::io::Error) -> Self {
        HistoryError::Io(e)
    }
}

/// Command lines in the order they were entered, duplicates included.
pub struct History {
    entries: Vec<String>,
    file_ops: FileOps,
    max_entries: usize,
}

impl History {
    pub const DEFAULT_MAX_ENTRIES: usize = 1000;

    pub fn new(history_file: PathBuf, max_entries: usize) -> Result<Self, HistoryError> {
        let file_ops = FileOps::new(history_file);
        let entries = file_ops.load_entries()?;

        let mut history = History {
            entries,
            file_ops,
            max_entries,
        };
        history.trim_entries();
        Ok(history)
    }

    pub fn add(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }

        self.entries.push(entry.to_owned());
        self.trim_entries();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `count` entries (all of them for `None`) with their 1-based
    /// position in the list.
    pub fn recent(&self, count: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
        let count = count.unwrap_or(self.entries.len()).min(self.entries.len());
        let start = self.entries.len() - count;
        self.entries[start..]
            .iter()
            .enumerate()
            .map(move |(i, entry)| (start + i + 1, entry.as_str()))
    }

    pub fn save(&self) -> Result<(), HistoryError> {
        tracing::debug!(
            entries = self.entries.len(),
            "saving history to {}",
            self.file_ops.path().display()
        );
        self.file_ops.write_entries(&self.entries)
    }

    fn trim_entries(&mut self) {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }
}
