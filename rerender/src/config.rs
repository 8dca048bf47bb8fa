use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILENAME, DEFAULT_EXTENSION};
use crate::utils::normalize_extensions;

#[derive(Debug, Deserialize, Default, Clone)]
/// Top-level configuration struct.
pub struct Config {
    #[serde(default)]
    /// The `[rerender]` section.
    pub rerender: RerenderConfig,
    /// The path to the configuration file this was loaded from.
    /// Set during `load_from_path`, `None` if using defaults.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// Options of the `[rerender]` section.
pub struct RerenderConfig {
    /// File extensions to migrate, without the dot.
    pub extensions: Option<Vec<String>>,
    /// Extra folders to skip.
    pub exclude_folders: Option<Vec<String>>,
    /// Folders to walk even when excluded by default.
    pub include_folders: Option<Vec<String>>,
    /// Default for `--dry-run`.
    pub dry_run: Option<bool>,
}

impl RerenderConfig {
    /// Configured extensions, normalized, falling back to `erb`.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let configured = self
            .extensions
            .as_deref()
            .map(normalize_extensions)
            .unwrap_or_default();
        if configured.is_empty() {
            vec![DEFAULT_EXTENSION.to_owned()]
        } else {
            configured
        }
    }
}

impl Config {
    /// Loads configuration from the current directory upwards.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// The first `.rerender.toml` found wins. A file that cannot be read or
    /// parsed is skipped with a warning and the search continues upwards.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                match Self::read(&candidate) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %candidate.display(), error = %e, "ignoring config file");
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        Config::default()
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = toml::from_str::<Config>(&content)?;
        config.config_file_path = Some(path.to_path_buf());
        Ok(config)
    }
}
