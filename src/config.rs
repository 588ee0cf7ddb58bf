//! Configuration: the tool's own TOML settings and the shell-style
//! `Vagrantfile.conf` shared with the Vagrant project.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::shell;

/// Environment variable naming an explicit settings file (read by the CLI).
pub const CONFIG_ENV: &str = "WIFI_BENCH_CONFIG";
/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wifi-bench.toml";

// ---------------------------------------------------------------------------
// Tool settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub vm: VmConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load settings from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Try, in order: `explicit` (`--config` or `$WIFI_BENCH_CONFIG`),
    /// `./wifi-bench.toml`, defaults.
    ///
    /// Runs before tracing is installed, so nothing is logged here; every
    /// file that was tried and skipped comes back in [`LoadedConfig::skipped`].
    pub fn load_or_default(explicit: Option<&Path>) -> LoadedConfig {
        let mut skipped = Vec::new();

        let local = Path::new(DEFAULT_CONFIG_FILE);
        let candidates = explicit
            .into_iter()
            .chain(local.exists().then_some(local));

        for path in candidates {
            match Self::load(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.to_path_buf()),
                        skipped,
                    }
                }
                Err(e) => skipped.push(SkippedConfig {
                    path: path.to_path_buf(),
                    error: format!("{:#}", e),
                }),
            }
        }

        LoadedConfig {
            config: Self::default(),
            source: None,
            skipped,
        }
    }

    /// Path of the machine config inside the Vagrant project.
    pub fn machine_conf_path(&self) -> PathBuf {
        self.vm.target_dir.join(&self.vm.machine_conf)
    }
}

/// Result of [`BenchConfig::load_or_default`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BenchConfig,
    /// File the settings came from; `None` means compiled-in defaults.
    pub source: Option<PathBuf>,
    pub skipped: Vec<SkippedConfig>,
}

/// A settings file that exists (or was named explicitly) but did not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedConfig {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Vagrant project directory; every host and guest command runs here.
    pub target_dir: PathBuf,
    /// Shell-style config file, relative to `target_dir`.
    pub machine_conf: PathBuf,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("./ubuntu-16.04"),
            machine_conf: PathBuf::from("Vagrantfile.conf"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Loop bound; the loop body runs `iterations - 1` times.
    pub iterations: usize,
    /// Parent of the per-run session directories.
    pub logs_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            logs_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Vagrantfile.conf
// ---------------------------------------------------------------------------

pub const MACHINE_NAME: &str = "MACHINE_NAME";
pub const SNAPSHOT_NAME: &str = "SNAPSHOT_NAME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Syntax {
        line: usize,
        #[source]
        source: shell::SplitError,
    },

    #[error("missing key {0}")]
    MissingKey(&'static str),
}

/// `KEY=value` pairs from a shell-variable file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineConfig {
    vars: HashMap<String, String>,
}

impl MachineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), keys = config.vars.len(), "loaded machine config");
        Ok(config)
    }

    /// Only lines containing `=` are considered; the first shell word of
    /// each is split on its first `=`. Later assignments win.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            if !line.contains('=') {
                continue;
            }
            let words = shell::split_words(line).map_err(|source| ConfigError::Syntax {
                line: idx + 1,
                source,
            })?;
            let Some(first) = words.first() else {
                continue;
            };
            if let Some((key, value)) = first.split_once('=') {
                vars.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self { vars })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingKey(key))
    }

    pub fn machine_name(&self) -> Result<&str, ConfigError> {
        self.require(MACHINE_NAME)
    }

    pub fn snapshot_name(&self) -> Result<&str, ConfigError> {
        self.require(SNAPSHOT_NAME)
    }
}
