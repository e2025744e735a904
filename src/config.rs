use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_cache_file() -> String {
    ".widx-cache.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Worker count for the bulk pool. Unset means
    /// `min(16, 2 × available cores)`.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            max_workers: None,
        }
    }
}

fn default_max_chunk_chars() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            url: None,
            timeout_secs: default_timeout_secs(),
            top_n: default_top_n(),
        }
    }
}

fn default_store_provider() -> String {
    "memory".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_top_n() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

impl Config {
    /// Minimal configuration for a workspace root, with every other setting
    /// at its default. Used when no config file is present.
    pub fn for_root(root: PathBuf) -> Self {
        Self {
            workspace: WorkspaceConfig {
                root,
                cache_file: default_cache_file(),
                exclude_globs: Vec::new(),
            },
            indexing: IndexingConfig::default(),
            store: StoreConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate indexing
    if config.indexing.max_chunk_chars == 0 {
        anyhow::bail!("indexing.max_chunk_chars must be > 0");
    }
    if config.indexing.max_workers == Some(0) {
        anyhow::bail!("indexing.max_workers must be > 0 when set");
    }

    // Validate store
    match config.store.provider.as_str() {
        "memory" => {}
        "http" => {
            if config.store.url.is_none() {
                anyhow::bail!(
                    "store.url must be specified when provider is '{}'",
                    config.store.provider
                );
            }
        }
        other => anyhow::bail!("Unknown store provider: '{}'. Must be http or memory.", other),
    }
    if config.store.timeout_secs == 0 {
        anyhow::bail!("store.timeout_secs must be > 0");
    }
    if config.store.top_n == 0 {
        anyhow::bail!("store.top_n must be >= 1");
    }

    // Validate watcher
    if config.watcher.debounce_ms == 0 {
        anyhow::bail!("watcher.debounce_ms must be > 0");
    }

    Ok(config)
}
