//! Save journal: one JSON line per completed save.
//!
//! Records are appended to a JSONL file with file locking. The journal is
//! an audit trail, not primary storage; readers skip lines they cannot
//! parse instead of failing.

use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One completed save of a logged day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SaveRecord {
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub athlete: String,
    pub week_start: NaiveDate,
    pub day: u8,
    pub saved_by: String,
    /// Exercises that produced achieved values in this save.
    pub exercises_logged: usize,
    /// Future week documents updated by forward propagation.
    pub weeks_updated: usize,
}

/// Journal sink trait for recording saves
pub trait SaveJournal {
    fn append(&mut self, record: &SaveRecord) -> Result<()>;
}

/// JSONL-based journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SaveJournal for JsonlJournal {
    fn append(&mut self, record: &SaveRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        // Open file for appending
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        // Write record as JSON line
        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended save {} to journal", record.id);
        Ok(())
    }
}

/// Read all save records from a journal file
pub fn read_records(path: &Path) -> Result<Vec<SaveRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SaveRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse journal line {}: {}", line_num + 1, e);
                // Continue reading, don't fail completely
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} save records from journal", records.len());
    Ok(records)
}

/// Journal held in memory, for tests and previews
#[derive(Default)]
pub struct MemoryJournal {
    records: Vec<SaveRecord>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SaveRecord] {
        &self.records
    }
}

impl SaveJournal for MemoryJournal {
    fn append(&mut self, record: &SaveRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
