use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};

/// The killmail API caps a comma-joined character query at ten IDs.
pub const MAX_TRACKED_CHARACTERS: usize = 10;

/// The tracked-character roster: immutable for the duration of a run,
/// addressable by name or by numeric character ID.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    by_name: BTreeMap<String, u64>,
    by_id: HashMap<u64, String>,
}

impl Roster {
    pub fn new(entries: &BTreeMap<String, u64>) -> Result<Self> {
        if entries.len() > MAX_TRACKED_CHARACTERS {
            bail!(
                "roster has {} tracked characters; the killmail API allows at most {}",
                entries.len(),
                MAX_TRACKED_CHARACTERS
            );
        }
        let mut by_name = BTreeMap::new();
        let mut by_id = HashMap::new();
        for (name, character_id) in entries {
            let name = name.trim();
            if name.is_empty() || *character_id == 0 {
                bail!("roster entry {name:?} -> {character_id} is invalid");
            }
            by_name.insert(name.to_owned(), *character_id);
            by_id.insert(*character_id, name.to_owned());
        }
        Ok(Self { by_name, by_id })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains_id(&self, character_id: u64) -> bool {
        self.by_id.contains_key(&character_id)
    }

    pub fn name_for(&self, character_id: u64) -> Option<&str> {
        self.by_id.get(&character_id).map(String::as_str)
    }

    pub fn id_for(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    /// Comma-joined character IDs in ascending order, as the fetch URL wants
    /// them. Stable ordering keeps request URLs reproducible across runs.
    pub fn joined_ids(&self) -> String {
        let mut ids: Vec<u64> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Name-sorted (name, id) pairs for the dashboard context.
    pub fn sorted_pairs(&self) -> Vec<(String, u64)> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect()
    }
}
