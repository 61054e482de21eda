//! Personal EVE killboard tracker core: incremental zKillboard ingestion,
//! roster-relative classification, and dashboard aggregation.
//!
//! The crate is the pipeline only. Presentation (templates, static-site
//! output) is a downstream consumer of [`stats::DashboardContext`]; the
//! binary in `main.rs` is a thin one-shot batch driver around
//! [`ingest::run_cycle`].

pub mod config;
pub mod enrich;
pub mod history;
pub mod ingest;
pub mod killmail;
pub mod label_db;
pub mod roster;
pub mod stats;
pub mod value;
pub mod zkill;
