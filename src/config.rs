use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::roster::Roster;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tracked-character roster: identity name -> numeric character ID.
    pub characters: BTreeMap<String, u64>,
    pub api_base: String,
    pub page_cooldown_secs: u64,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            characters: BTreeMap::new(),
            api_base: "https://zkillboard.com/api/kills".to_owned(),
            page_cooldown_secs: 10,
            request_timeout_secs: 30,
            data_dir: None,
        }
    }
}

impl TrackerConfig {
    pub fn load_or_create() -> Result<(Self, PathBuf)> {
        let config_dir = dirs::config_dir()
            .context("unable to locate OS config directory")?
            .join("killtracker");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed creating config dir at {}", config_dir.display()))?;

        let config_path = config_dir.join("config.json");
        if !config_path.exists() {
            let default = Self::default();
            default.save(&config_path)?;
            return Ok((default, config_path));
        }

        let text = fs::read_to_string(&config_path)
            .with_context(|| format!("failed reading {}", config_path.display()))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("invalid json in {}", config_path.display()))?;
        Ok((config, config_path))
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let payload = serde_json::to_string_pretty(self).context("failed serializing config")?;
        fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
        Ok(())
    }

    /// Builds the validated roster; more than ten tracked characters is a
    /// fatal configuration error.
    pub fn roster(&self) -> Result<Roster> {
        Roster::new(&self.characters).context("invalid characters roster in config")
    }

    pub fn ensure_data_dir(&self) -> Result<PathBuf> {
        let data_dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .context("unable to locate OS data directory")?
                .join("killtracker"),
        };
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed creating data dir at {}", data_dir.display()))?;
        Ok(data_dir)
    }
}
