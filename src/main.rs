use std::{fs, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};

use killtracker::{
    config::TrackerConfig, history::HistoryStore, ingest, label_db::EntityLabelStore,
    stats::build_dashboard_context, zkill::ZkillClient,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_path) = TrackerConfig::load_or_create()?;
    info!(path = %config_path.display(), "loaded tracker config");

    let roster = config.roster()?;
    if roster.is_empty() {
        warn!(
            path = %config_path.display(),
            "no tracked characters configured; add entries to the characters map and re-run"
        );
        return Ok(());
    }

    let data_dir = config.ensure_data_dir()?;
    let store = HistoryStore::new(data_dir.join("history.json"));
    let labels = EntityLabelStore::open(data_dir.join("entities.db"))?;
    let client = ZkillClient::new(
        &config.api_base,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let report = ingest::run_cycle(
        &client,
        &roster,
        &store,
        Some(&labels),
        Duration::from_secs(config.page_cooldown_secs),
    )?;
    if let Some(error) = &report.fetch_error {
        warn!(error = %error, "cycle ended early; ingested pages were kept and will dedup on re-run");
    }

    let log = store.load()?;
    let context = build_dashboard_context(log.events(), &roster);
    let dashboard_path = data_dir.join("dashboard.json");
    let payload =
        serde_json::to_string_pretty(&context).context("failed serializing dashboard context")?;
    fs::write(&dashboard_path, payload)
        .with_context(|| format!("failed writing {}", dashboard_path.display()))?;

    info!(
        kills = context.kills,
        losses = context.losses,
        friendlyfire = context.friendlyfire,
        money_killed = %context.money_killed,
        money_lost = %context.money_lost,
        cursor = report.cursor,
        path = %dashboard_path.display(),
        "dashboard context written"
    );
    Ok(())
}
