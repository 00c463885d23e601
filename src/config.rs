use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{EngineConfig, Repository, StoreError};
use crate::limits::DEFAULT_CLEANING_BUFFER_MINS;
use crate::model::Category;
use crate::settings::RoomSettings;

const JOURNAL_FILE: &str = "roomstate.journal";

/// Process configuration, read from `ROOMSTATE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub reconcile_every: Duration,
    pub cleaning_buffer_mins: i64,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub seed: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            reconcile_every: Duration::from_secs(300),
            cleaning_buffer_mins: DEFAULT_CLEANING_BUFFER_MINS,
            compact_threshold: 1000,
            metrics_port: None,
            seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let reconcile_secs: u64 = parsed(&lookup, "ROOMSTATE_RECONCILE_SECS")
            .filter(|s| *s > 0)
            .unwrap_or(defaults.reconcile_every.as_secs());

        Self {
            data_dir: lookup("ROOMSTATE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            reconcile_every: Duration::from_secs(reconcile_secs),
            cleaning_buffer_mins: parsed(&lookup, "ROOMSTATE_CLEANING_BUFFER_MINS")
                .unwrap_or(defaults.cleaning_buffer_mins),
            compact_threshold: parsed(&lookup, "ROOMSTATE_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            metrics_port: parsed(&lookup, "ROOMSTATE_METRICS_PORT"),
            seed: lookup("ROOMSTATE_SEED").map(PathBuf::from),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            // Out-of-range values are clamped by `Engine::new`.
            cleaning_buffer: chrono::TimeDelta::try_minutes(self.cleaning_buffer_mins)
                .unwrap_or(chrono::TimeDelta::MAX),
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring unparseable {key}={value:?}");
            None
        }
    }
}

// ── Seed import ──────────────────────────────────────────────────

/// Initial property data in the dashboard's JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub settings: RoomSettings,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Store(StoreError),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Io(e) => write!(f, "reading seed: {e}"),
            SeedError::Json(e) => write!(f, "parsing seed: {e}"),
            SeedError::Store(e) => write!(f, "importing seed: {e}"),
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(e) => Some(e),
            SeedError::Json(e) => Some(e),
            SeedError::Store(e) => Some(e),
        }
    }
}

impl From<StoreError> for SeedError {
    fn from(e: StoreError) -> Self {
        SeedError::Store(e)
    }
}

impl Seed {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        serde_json::from_str(json).map_err(SeedError::Json)
    }

    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path).map_err(SeedError::Io)?;
        Self::from_json(&json)
    }

    /// Write the seed into `repo` unless it already holds categories.
    /// Returns whether anything was imported.
    pub async fn import_into(self, repo: &dyn Repository) -> Result<bool, SeedError> {
        if !repo.list_categories().await?.is_empty() {
            info!("store already populated, skipping seed");
            return Ok(false);
        }
        let count = self.categories.len();
        repo.save_settings(self.settings).await?;
        for category in self.categories {
            repo.save_category(category).await?;
        }
        info!("imported seed with {count} categories");
        Ok(true)
    }
}
