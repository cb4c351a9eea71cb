//! Global settings, layering, and environment overrides

mod cache;

pub use cache::{CacheLayout, CacheStats, LOG_FILE, STAMP_FILE};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use spn_core::error::SpnError;

use crate::manifest::{SpnToml, MANIFEST_FILE};
use crate::ConfigResult;

/// Default delay between coordinator polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// `~/.spn/config.toml`; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

/// Effective settings after layering
#[derive(Debug, Clone, PartialEq)]
pub struct SpnConfig {
    pub cache_dir: Utf8PathBuf,
    /// Package sources, highest precedence first
    pub sources: Vec<Utf8PathBuf>,
    pub poll_interval_ms: u64,
    /// Rebuild even when a stamp exists
    pub force: bool,
}

impl SpnConfig {
    pub fn cache(&self) -> CacheLayout {
        CacheLayout::new(self.cache_dir.clone())
    }
}

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

impl ConfigLoader {
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Find the nearest directory holding spn.toml (walks up directory tree)
    pub fn find_project_dir(&self) -> Option<Utf8PathBuf> {
        let mut current = self.cwd.as_path();
        loop {
            if current.join(MANIFEST_FILE).exists() {
                return Some(current.to_path_buf());
            }
            current = current.parent()?;
        }
    }

    /// Load the project manifest and the directory it lives in
    pub async fn load_project(&self) -> ConfigResult<(SpnToml, Utf8PathBuf)> {
        let dir = self.find_project_dir().ok_or_else(|| SpnError::ConfigValidation {
            field: "spn.toml".to_string(),
            reason: format!("no {} found in {} or any parent directory", MANIFEST_FILE, self.cwd),
        })?;
        let manifest = crate::manifest::load_from_file(&dir.join(MANIFEST_FILE)).await?;
        Ok((manifest, dir))
    }

    /// Location of the global config file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        Ok(spn_home()?.join("config.toml"))
    }

    /// Load the global config, if present
    pub async fn load_global_config(path: &Utf8Path) -> ConfigResult<Option<GlobalConfig>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SpnError::io(format!("Failed to read {}", path), e))?;
        let config = toml::from_str(&content).map_err(|e| SpnError::TomlParse {
            file: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(config))
    }
}

impl ConfigLayering {
    /// Merge layers: defaults, global file, environment, then CLI flags.
    ///
    /// Project sources (already resolved against the project directory) come
    /// ahead of every other source. Relative cache and source paths are
    /// anchored at `cwd`, since hooks run from inside the source checkout.
    pub fn merge_configs(
        cwd: &Utf8Path,
        global_config: Option<GlobalConfig>,
        project_sources: Vec<Utf8PathBuf>,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<SpnConfig> {
        let global = global_config.unwrap_or_default();

        let mut config = SpnConfig {
            cache_dir: match global.cache_dir {
                Some(dir) => dir,
                None => spn_home()?.join("cache"),
            },
            sources: project_sources,
            poll_interval_ms: global.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            force: global.force.unwrap_or(false),
        };

        let mut layered_sources = global.sources;
        for (key, value) in env_overrides {
            match key.as_str() {
                "SPN_CACHE_DIR" => config.cache_dir = Utf8PathBuf::from(value),
                "SPN_SOURCES" => {
                    layered_sources = std::env::split_paths(value)
                        .filter_map(|path| Utf8PathBuf::try_from(path).ok())
                        .filter(|path| !path.as_str().is_empty())
                        .collect();
                },
                "SPN_FORCE" => config.force = parse_flag(key, value)?,
                "SPN_POLL_INTERVAL_MS" => config.poll_interval_ms = parse_number(key, value)?,
                _ => {},
            }
        }
        config
            .sources
            .extend(layered_sources.into_iter().map(|source| cwd.join(source)));

        for (key, value) in cli_overrides {
            match key.as_str() {
                "cache_dir" => config.cache_dir = Utf8PathBuf::from(value),
                "force" => config.force = parse_flag(key, value)?,
                "poll_interval_ms" => config.poll_interval_ms = parse_number(key, value)?,
                _ => {},
            }
        }

        config.cache_dir = cwd.join(&config.cache_dir);

        debug!("Effective settings: {:?}", config);
        Ok(config)
    }

    /// Collect SPN_* environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars().filter(|(key, _)| key.starts_with("SPN_")).collect()
    }
}

fn spn_home() -> ConfigResult<Utf8PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| SpnError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: "Could not determine home directory".to_string(),
    })?;

    Utf8PathBuf::try_from(home_dir)
        .map(|home| home.join(".spn"))
        .map_err(|e| SpnError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: format!("Invalid home directory path: {}", e),
        })
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SpnError::ConfigValidation {
            field: key.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

fn parse_number(key: &str, value: &str) -> ConfigResult<u64> {
    value.parse().map_err(|_| SpnError::ConfigValidation {
        field: key.to_string(),
        reason: format!("expected a number, got '{}'", value),
    })
}
