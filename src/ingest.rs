use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    enrich::enrich_log,
    history::HistoryStore,
    killmail::Killmail,
    label_db::EntityLabelStore,
    roster::Roster,
    zkill::{fetch_since, KillPageSource},
};

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub pages: u32,
    pub fetched: usize,
    pub appended: usize,
    pub replaced: usize,
    pub cursor: u64,
    pub fetch_error: Option<String>,
}

/// One ingestion cycle: fetch everything newer than the stored cursor,
/// upsert it into the history log, enrich in place, and atomically rewrite
/// the persisted log. A page failure stops fetching but keeps everything
/// already appended; re-running with the old cursor re-fetches the overlap
/// and the upsert dedups it.
pub fn run_cycle(
    source: &dyn KillPageSource,
    roster: &Roster,
    store: &HistoryStore,
    labels: Option<&EntityLabelStore>,
    cooldown: Duration,
) -> Result<CycleReport> {
    let mut log = store.load()?;
    let start_cursor = log.cursor();
    let mut report = CycleReport::default();

    info!(
        tracked_characters = roster.len(),
        after_kill_id = start_cursor,
        history_len = log.len(),
        "starting ingestion cycle"
    );

    for batch in fetch_since(source, roster, start_cursor, cooldown) {
        let killmails = match batch {
            Ok(killmails) => killmails,
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    pages = report.pages,
                    "fetch cycle aborted; keeping pages ingested so far"
                );
                report.fetch_error = Some(format!("{err:#}"));
                break;
            }
        };
        report.pages += 1;
        report.fetched += killmails.len();
        for killmail in killmails {
            record_labels(labels, &killmail);
            if log.upsert(killmail) {
                report.appended += 1;
            } else {
                report.replaced += 1;
            }
        }
    }

    enrich_log(&mut log, roster);
    store.save(&log)?;
    report.cursor = log.cursor();

    info!(
        pages = report.pages,
        fetched = report.fetched,
        appended = report.appended,
        replaced = report.replaced,
        cursor = report.cursor,
        path = %store.path().display(),
        "ingestion cycle persisted"
    );
    Ok(report)
}

/// Labels are recorded from the full pre-prune attacker list so the lookup
/// table keeps names for participants the prune pass later discards.
fn record_labels(labels: Option<&EntityLabelStore>, killmail: &Killmail) {
    let Some(store) = labels else {
        return;
    };
    for participant in std::iter::once(&killmail.victim).chain(killmail.attackers.iter()) {
        if !participant.is_named() {
            continue;
        }
        let Some(name) = participant.character_name.as_deref() else {
            continue;
        };
        if let Err(err) = store.upsert(participant.character_id, name) {
            warn!(?err, character_id = participant.character_id, "failed recording entity label");
        }
    }
}
