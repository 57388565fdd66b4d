//! Optional bot configuration file.
//!
//! Bots normally run from command-line flags alone; a TOML file can override
//! a few host-specific knobs (job count, scons entry point, how many run
//! manifests to keep).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_SCONS_SCRIPT: &str = "scons.py";
pub const DEFAULT_KEEP_RUNS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Overrides the detected parallel job count.
    pub max_jobs: Option<usize>,
    /// SCons entry point relative to the checkout root.
    #[serde(default = "default_scons_script")]
    pub scons_script: String,
    /// Run manifests retained under the status directory.
    #[serde(default = "default_keep_runs")]
    pub keep_runs: usize,
}

fn default_scons_script() -> String {
    DEFAULT_SCONS_SCRIPT.to_string()
}

fn default_keep_runs() -> usize {
    DEFAULT_KEEP_RUNS
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            max_jobs: None,
            scons_script: default_scons_script(),
            keep_runs: default_keep_runs(),
        }
    }
}

impl BotConfig {
    /// Load a config file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<BotConfig> {
        let Some(path) = path else {
            return Ok(BotConfig::default());
        };
        let bytes = fs::read_to_string(path)
            .with_context(|| format!("reading bot config '{}'", path.display()))?;
        let parsed: BotConfig = toml::from_str(&bytes)
            .with_context(|| format!("parsing bot config '{}'", path.display()))?;
        Ok(parsed)
    }
}
