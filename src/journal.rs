//! Event journal: one JSON line per engine event, one file per UTC day.
//!
//! Lives next to the state store as `<state_dir>/journal/YYYY-MM-DD.jsonl`.
//! The day file is chosen from the event timestamp, so an event written just
//! after midnight lands in the new day's file without any rotation state.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

use common::{Error, SignalInput, SignalResult};

pub const JOURNAL_DIR: &str = "journal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// Temperature rose above the reset threshold.
    Warmed,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    Start {
        location: String,
        symbol: String,
        sync_interval_secs: u64,
    },
    Sync {
        temperature_f: Option<f64>,
        rsi: f64,
        temperature_updated: bool,
        rsi_updated: bool,
        errors: Vec<String>,
    },
    Evaluation {
        input: SignalInput,
        result: SignalResult,
    },
    FrostAlert {
        hours: f64,
        temperature_f: f64,
    },
    FrostReset {
        reason: ResetReason,
        temperature_f: Option<f64>,
    },
    Stop,
}

#[derive(Serialize)]
struct Line<'a> {
    ts: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a JournalEvent,
}

pub struct EventJournal {
    dir: PathBuf,
}

impl EventJournal {
    pub fn open(state_dir: &Path) -> Result<Self, Error> {
        let dir = state_dir.join(JOURNAL_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    pub fn append(&self, at: DateTime<Utc>, event: &JournalEvent) -> Result<(), Error> {
        let mut line = serde_json::to_string(&Line { ts: at, event })?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_path(at.date_naive()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Append, logging instead of failing. The journal is an audit trail,
    /// never a reason to stop the engine.
    pub fn record(&self, at: DateTime<Utc>, event: JournalEvent) {
        if let Err(e) = self.append(at, &event) {
            warn!("journal write failed: {}", e);
        }
    }
}
