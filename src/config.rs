//! Driver configuration.
//!
//! Settings are resolved once at startup from defaults, the optional
//! `configs/driver.json`, `DRIVER_*` environment variables and command-line
//! flags (in increasing precedence). The resulting [`DriverConfig`] is
//! immutable and passed by reference to every stage.
use crate::error::DriverError;
use crate::paths::PipelinePaths;
use crate::pipeline::Collaborator;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Current schema version for `configs/driver.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const DEFAULT_MAX_RESULTS: u32 = 100;
const DEFAULT_WORKERS: u32 = 4;
const DEFAULT_ENRICH_PROVIDER: &str = "auto";
const DEFAULT_SEARCH_KEY: &str = "domain";

/// Search backend the discovery provider should query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryProvider {
    Google,
    DuckDuckGo,
    All,
}

impl DiscoveryProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryProvider::Google => "google",
            DiscoveryProvider::DuckDuckGo => "duckduckgo",
            DiscoveryProvider::All => "all",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(DiscoveryProvider::Google),
            "duckduckgo" | "ddg" => Ok(DiscoveryProvider::DuckDuckGo),
            "all" => Ok(DiscoveryProvider::All),
            other => Err(anyhow!(
                "provider must be google, duckduckgo or all (got {other:?})"
            )),
        }
    }
}

impl fmt::Display for DiscoveryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collaborator command line split into program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a shell-style command string.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut words =
            shell_words::split(raw).with_context(|| format!("parse command: {raw}"))?;
        if words.is_empty() {
            return Err(anyhow!("command is empty"));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }
}

/// On-disk shape of `configs/driver.json`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfigFile {
    pub schema_version: u32,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub workers: Option<u32>,
    #[serde(default)]
    pub enrich_provider: Option<String>,
    #[serde(default)]
    pub search_key: Option<String>,
    /// Command overrides keyed by collaborator (`discover`, `enrich`, `audit`, `compile`).
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

/// Values supplied on the command line; `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub run_id: Option<String>,
    pub provider: Option<String>,
    pub max_results: Option<u32>,
    pub workers: Option<u32>,
    pub verbose: bool,
}

/// Fully resolved, immutable driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub paths: PipelinePaths,
    pub run_id: String,
    pub provider: DiscoveryProvider,
    pub max_results: u32,
    pub workers: u32,
    pub verbose: bool,
    pub enrich_provider: String,
    pub search_key: String,
    pub commands: BTreeMap<Collaborator, CommandLine>,
}

impl DriverConfig {
    /// Command line configured for a collaborator.
    pub fn command(&self, collaborator: Collaborator) -> Result<&CommandLine> {
        self.commands
            .get(&collaborator)
            .ok_or_else(|| anyhow!("no command configured for {}", collaborator.key()))
    }
}

/// Default command for each collaborator, relative to the pipeline root.
pub fn default_command(collaborator: Collaborator) -> &'static str {
    match collaborator {
        Collaborator::Discovery => "python3 scripts/discover.py",
        Collaborator::Enrichment => "python3 scripts/enrich_contacts.py",
        Collaborator::Audit => "python3 scripts/run_parallel.py",
        Collaborator::Compiler => "python3 src/main.py",
    }
}

/// Environment variable that overrides a collaborator command.
pub fn command_env_var(collaborator: Collaborator) -> String {
    format!("DRIVER_{}_CMD", collaborator.key().to_ascii_uppercase())
}

/// Load `configs/driver.json` when present.
pub fn load_config_file(paths: &PipelinePaths) -> Result<Option<DriverConfigFile>> {
    let path = paths.driver_config_path();
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let file: DriverConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse driver config {}", path.display()))?;
    if file.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported driver config schema_version {}",
            file.schema_version
        ));
    }
    Ok(Some(file))
}

/// Resolve the configuration from every layer.
///
/// `env` looks up environment variables; callers pass `std::env::var` in
/// production and a map in tests.
pub fn resolve_config(
    overrides: &Overrides,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<DriverConfig> {
    let root = match &overrides.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let paths = PipelinePaths::new(root);
    let file = load_config_file(&paths)?.unwrap_or_default();

    let provider_raw = overrides
        .provider
        .clone()
        .or_else(|| env("DRIVER_PROVIDER"))
        .or_else(|| file.provider.clone());
    let provider = match provider_raw {
        Some(raw) => DiscoveryProvider::parse(&raw)?,
        None => DiscoveryProvider::All,
    };

    let max_results = match overrides.max_results {
        Some(value) => value,
        None => layered_number(
            env("DRIVER_MAX_RESULTS"),
            file.max_results,
            "DRIVER_MAX_RESULTS",
        )?
        .unwrap_or(DEFAULT_MAX_RESULTS),
    };
    let workers = match overrides.workers {
        Some(value) => value,
        None => layered_number(env("DRIVER_WORKERS"), file.workers, "DRIVER_WORKERS")?
            .unwrap_or(DEFAULT_WORKERS),
    };

    let enrich_provider = env("DRIVER_ENRICH_PROVIDER")
        .or_else(|| file.enrich_provider.clone())
        .unwrap_or_else(|| DEFAULT_ENRICH_PROVIDER.to_string());
    let search_key = env("DRIVER_SEARCH_KEY")
        .or_else(|| file.search_key.clone())
        .unwrap_or_else(|| DEFAULT_SEARCH_KEY.to_string());

    for key in file.commands.keys() {
        if !Collaborator::ALL.iter().any(|c| c.key() == key) {
            return Err(anyhow!(
                "unknown command key {key:?} in {}",
                paths.driver_config_path().display()
            ));
        }
    }
    let mut commands = BTreeMap::new();
    for collaborator in Collaborator::ALL {
        let raw = env(&command_env_var(collaborator))
            .or_else(|| file.commands.get(collaborator.key()).cloned())
            .unwrap_or_else(|| default_command(collaborator).to_string());
        let command = CommandLine::parse(&raw)
            .with_context(|| format!("{} command", collaborator.key()))?;
        commands.insert(collaborator, command);
    }

    let run_id = match &overrides.run_id {
        Some(run_id) => run_id.clone(),
        None => default_run_id(Utc::now()),
    };

    let config = DriverConfig {
        paths,
        run_id,
        provider,
        max_results,
        workers,
        verbose: overrides.verbose,
        enrich_provider,
        search_key,
        commands,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Validate resolved values that the layers cannot check individually.
pub fn validate_config(config: &DriverConfig) -> Result<()> {
    if config.max_results == 0 {
        return Err(anyhow!("max_results must be at least 1"));
    }
    if config.workers == 0 {
        return Err(anyhow!("workers must be at least 1"));
    }
    if config.enrich_provider.trim().is_empty() {
        return Err(anyhow!("enrich_provider must be non-empty"));
    }
    if config.search_key.trim().is_empty() {
        return Err(anyhow!("search_key must be non-empty"));
    }
    Ok(())
}

/// Timestamp-derived run identifier, e.g. `20261019T083000Z`.
pub fn default_run_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Reject run identifiers that would not survive being used in file names or env.
pub fn validate_run_id(run_id: &str) -> Result<(), DriverError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("run id pattern is valid")
    });
    if pattern.is_match(run_id) {
        Ok(())
    } else {
        Err(DriverError::Usage(format!(
            "invalid run id {run_id:?}; use letters, digits, '.', '_' or '-'"
        )))
    }
}

fn layered_number(
    env_value: Option<String>,
    file_value: Option<u32>,
    label: &str,
) -> Result<Option<u32>> {
    if let Some(raw) = env_value {
        let value = raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("{label} must be a non-negative integer (got {raw:?})"))?;
        return Ok(Some(value));
    }
    Ok(file_value)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
