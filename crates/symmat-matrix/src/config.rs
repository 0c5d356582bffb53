//! Configuration for evaluation limits, materialization and logging
//!
//! Sources in order of precedence:
//! 1. Environment variables (`SYMMAT_*`)
//! 2. The first configuration file found (`SYMMAT_CONFIG`, the current
//!    directory, then `~/.config/symmat/`)
//! 3. Built-in defaults

use crate::explicit::ExplicitConfig;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use symmat_logging::{init_logging, LoggingGuard, LoggingOptions};
use symmat_symbolic::EvalOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymmatConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub explicit: ExplicitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limits for `doit` and `evaluate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_max_terms")]
    pub max_terms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive such as `debug` or `symmat_matrix=trace`
    #[serde(default)]
    pub filter: Option<String>,
    /// Forward spans and events to the trace hook
    #[serde(default)]
    pub traces: bool,
}

fn default_max_terms() -> u64 {
    EvalOptions::default().max_terms
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            max_terms: default_max_terms(),
        }
    }
}

impl EvaluationConfig {
    pub fn to_eval_options(&self) -> EvalOptions {
        EvalOptions {
            max_terms: self.max_terms,
        }
    }
}

impl LoggingConfig {
    pub fn to_logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            filter: self.filter.clone(),
            enable_traces: self.traces,
            pid: std::process::id() as i64,
        }
    }
}

impl SymmatConfig {
    /// Install the logging bridge as configured
    pub fn init_logging(&self) -> LoggingGuard {
        init_logging(self.logging.to_logging_options())
    }
}

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<SymmatConfig> {
        let mut config = Self::load_from_files()?;
        Self::apply_environment_variables(&mut config);
        Ok(config)
    }

    fn load_from_files() -> Result<SymmatConfig> {
        for path in Self::find_config_files() {
            if path.is_file() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(SymmatConfig::default())
    }

    /// Candidate configuration paths, most specific first
    pub fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_path) = env::var("SYMMAT_CONFIG") {
            paths.push(PathBuf::from(config_path));
        }

        if let Ok(current_dir) = env::current_dir() {
            for name in [
                ".symmat.toml",
                ".symmat.yaml",
                ".symmat.yml",
                ".symmat.json",
            ] {
                paths.push(current_dir.join(name));
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let dir = home_dir.join(".config/symmat");
            for name in ["config.toml", "config.yaml", "config.yml", "config.json"] {
                paths.push(dir.join(name));
            }
        }

        paths
    }

    /// Load configuration from a specific file, choosing the format by extension
    pub fn load_from_file(path: &Path) -> Result<SymmatConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = toml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else {
                    serde_json::from_str(&content).with_context(|| {
                        format!(
                            "Could not parse config file {} (tried TOML, YAML, JSON)",
                            path.display()
                        )
                    })?
                }
            }
        };

        Ok(config)
    }

    fn apply_environment_variables(config: &mut SymmatConfig) {
        if let Some(max_terms) = env::var("SYMMAT_MAX_TERMS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.evaluation.max_terms = max_terms;
        }

        if let Some(max_dim) = env::var("SYMMAT_MAX_EXPLICIT_DIM")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.explicit.max_dim = max_dim;
        }

        if let Ok(filter) = env::var("SYMMAT_LOG") {
            let trimmed = filter.trim();
            config.logging.filter = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }

        if let Some(flag) = env::var("SYMMAT_TRACES").ok().and_then(|v| parse_bool(&v)) {
            config.logging.traces = flag;
        }
    }

    pub fn save_to_file(config: &SymmatConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::to_string(config).context("Failed to serialize config to YAML")?
            }
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            _ => toml::to_string_pretty(config).context("Failed to serialize config to TOML")?,
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

/// Parse a boolean value from string with various formats
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SymmatConfig::default();
        assert_eq!(config.evaluation.max_terms, 100_000);
        assert_eq!(config.explicit.max_dim, 64);
        assert_eq!(config.logging.filter, None);
        assert!(!config.logging.traces);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: SymmatConfig = toml::from_str("[explicit]\nmax_dim = 8\n").unwrap();
        assert_eq!(config.explicit.max_dim, 8);
        assert_eq!(config.evaluation.max_terms, 100_000);

        let config: SymmatConfig =
            serde_json::from_str(r#"{"logging": {"filter": "debug"}}"#).unwrap();
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
    }

    #[test]
    fn conversions() {
        let config = EvaluationConfig { max_terms: 12 };
        assert_eq!(config.to_eval_options(), EvalOptions { max_terms: 12 });

        let logging = LoggingConfig {
            filter: Some("trace".into()),
            traces: true,
        };
        let opts = logging.to_logging_options();
        assert_eq!(opts.filter.as_deref(), Some("trace"));
        assert!(opts.enable_traces);
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
