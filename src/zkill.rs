use std::{thread, time::Duration};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::{
    killmail::{decode_killmail, Killmail},
    roster::Roster,
};

/// zKillboard's de facto pagination contract: a full page holds exactly 200
/// records, so any shorter page is the last one.
pub const FULL_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub character_ids: String,
    pub after_kill_id: u64,
    pub page: u32,
}

/// Seam between the pagination protocol and the transport. The production
/// implementation is [`ZkillClient`]; tests substitute an in-memory source.
pub trait KillPageSource {
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Value>>;
}

#[derive(Debug)]
pub struct ZkillClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ZkillClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building killmail http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn page_url(&self, request: &PageRequest) -> String {
        format!(
            "{}/characterID/{}/afterKillID/{}/orderDirection/asc/no-items/page/{}/",
            self.base_url, request.character_ids, request.after_kill_id, request.page
        )
    }
}

impl KillPageSource for ZkillClient {
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Value>> {
        let url = self.page_url(request);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("killmail page request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("killmail page request rejected: {url}"))?;
        response
            .json::<Vec<Value>>()
            .with_context(|| format!("malformed killmail page body from {url}"))
    }
}

/// Lazy page sequence for one ingestion cycle. Yields decoded batches in
/// fetch order; a short page is terminal, an error batch is terminal, and
/// the mandatory cooldown runs between page requests, never before the
/// first one.
pub struct KillmailPages<'a> {
    source: &'a dyn KillPageSource,
    character_ids: String,
    after_kill_id: u64,
    cooldown: Duration,
    next_page: u32,
    done: bool,
}

pub fn fetch_since<'a>(
    source: &'a dyn KillPageSource,
    roster: &Roster,
    after_kill_id: u64,
    cooldown: Duration,
) -> KillmailPages<'a> {
    KillmailPages {
        source,
        character_ids: roster.joined_ids(),
        after_kill_id,
        cooldown,
        next_page: 1,
        done: roster.is_empty(),
    }
}

impl Iterator for KillmailPages<'_> {
    type Item = Result<Vec<Killmail>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.next_page > 1 && !self.cooldown.is_zero() {
            // zKillboard throttles rapid-fire paging.
            thread::sleep(self.cooldown);
        }
        let request = PageRequest {
            character_ids: self.character_ids.clone(),
            after_kill_id: self.after_kill_id,
            page: self.next_page,
        };
        let raw_page = match self.source.fetch_page(&request) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        self.next_page += 1;
        if raw_page.len() < FULL_PAGE_SIZE {
            self.done = true;
        }
        if raw_page.is_empty() {
            return None;
        }

        let mut batch = Vec::with_capacity(raw_page.len());
        for raw in &raw_page {
            match decode_killmail(raw) {
                Ok(killmail) => batch.push(killmail),
                Err(err) => {
                    warn!(?err, page = request.page, "skipping malformed killmail record");
                }
            }
        }
        Some(Ok(batch))
    }
}
