use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::commands::DEFAULT_LANGUAGE;

pub const DEFAULT_USER_AGENT: &str = "prophelper/0.1 (property proposal import helper)";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: usize = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 350;

pub const CONFIG_ENV: &str = "PROPHELPER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = ".prophelper/config.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HelperConfig {
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FetchSection {
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct OutputSection {
    pub description_language: Option<String>,
}

impl HelperConfig {
    /// Resolve user agent: env PROPHELPER_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_string("PROPHELPER_USER_AGENT")
            .or_else(|| self.fetch.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Resolve request timeout: env PROPHELPER_HTTP_TIMEOUT_MS > config > default.
    pub fn timeout_ms(&self) -> u64 {
        env_parsed("PROPHELPER_HTTP_TIMEOUT_MS")
            .or(self.fetch.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn retries(&self) -> usize {
        env_parsed("PROPHELPER_HTTP_RETRIES")
            .or(self.fetch.retries)
            .unwrap_or(DEFAULT_RETRIES)
    }

    pub fn retry_delay_ms(&self) -> u64 {
        env_parsed("PROPHELPER_HTTP_RETRY_DELAY_MS")
            .or(self.fetch.retry_delay_ms)
            .unwrap_or(DEFAULT_RETRY_DELAY_MS)
    }

    /// Language for untranslated descriptions and plain-heading labels.
    pub fn description_language(&self) -> &str {
        self.output
            .description_language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// Config path: explicit flag > env PROPHELPER_CONFIG > `.prophelper/config.toml` under `cwd`.
pub fn resolve_config_path(flag: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(path) = env_string(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    cwd.join(DEFAULT_CONFIG_PATH)
}

/// Load and parse a HelperConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<HelperConfig> {
    if !config_path.exists() {
        return Ok(HelperConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: HelperConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn env_string(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|value| value.parse::<T>().ok())
}
