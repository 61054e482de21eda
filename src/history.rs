use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::killmail::Killmail;

/// Cursor sentinel for an empty history: fetch everything from the start.
pub const BEGINNING_OF_TIME: u64 = 0;

/// In-memory killmail log. Insertion order is fetch order; appends are
/// upserts keyed by killmail ID so re-fetched overlap from an aborted cycle
/// replaces in place instead of duplicating.
#[derive(Debug, Default)]
pub struct HistoryLog {
    events: Vec<Killmail>,
    index: HashMap<u64, usize>,
}

impl HistoryLog {
    pub fn from_events(events: Vec<Killmail>) -> Self {
        let mut log = Self::default();
        for killmail in events {
            log.upsert(killmail);
        }
        log
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Killmail] {
        &self.events
    }

    /// Enrichment passes mutate records in place; killmail IDs must not
    /// change or the upsert index goes stale.
    pub fn events_mut(&mut self) -> &mut [Killmail] {
        &mut self.events
    }

    pub fn contains(&self, killmail_id: u64) -> bool {
        self.index.contains_key(&killmail_id)
    }

    /// Highest killmail ID seen so far; only ever moves forward because the
    /// log is never truncated within a run.
    pub fn cursor(&self) -> u64 {
        self.events
            .iter()
            .map(|killmail| killmail.killmail_id)
            .max()
            .unwrap_or(BEGINNING_OF_TIME)
    }

    /// Returns true when the record was newly appended, false when an
    /// existing record with the same ID was replaced in place.
    pub fn upsert(&mut self, killmail: Killmail) -> bool {
        match self.index.get(&killmail.killmail_id) {
            Some(position) => {
                self.events[*position] = killmail;
                false
            }
            None => {
                self.index.insert(killmail.killmail_id, self.events.len());
                self.events.push(killmail);
                true
            }
        }
    }
}

/// File-backed persistence for the history log: a JSON array of enriched
/// killmail records, rewritten whole via temp-file-then-rename so an
/// interrupted run never leaves a truncated log behind.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> Result<HistoryLog> {
        if !self.path.exists() {
            return Ok(HistoryLog::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading history at {}", self.path.display()))?;
        let events = serde_json::from_str::<Vec<Killmail>>(&text)
            .with_context(|| format!("invalid history json at {}", self.path.display()))?;
        Ok(HistoryLog::from_events(events))
    }

    pub fn save(&self, log: &HistoryLog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating history dir at {}", parent.display()))?;
        }
        let payload =
            serde_json::to_string_pretty(log.events()).context("failed serializing history")?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload)
            .with_context(|| format!("failed writing history staging file {}", staging.display()))?;
        fs::rename(&staging, &self.path).with_context(|| {
            format!(
                "failed moving history staging file into place at {}",
                self.path.display()
            )
        })?;
        Ok(())
    }
}
