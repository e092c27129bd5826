//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.regauditor.toml` files. The scoring penalties and priority policy
//! live here so callers can override them without recompiling.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Narrator (LLM collaborator) settings.
    #[serde(default)]
    pub narrator: NarratorConfig,

    /// Compliance scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "regaudit_report.md".to_string()
}

/// Settings for the external reasoning collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-role call budget in seconds. A role that exceeds it is
    /// skipped, not retried.
    #[serde(default = "default_role_timeout")]
    pub role_timeout_seconds: u64,

    /// Skip all collaborator calls and report deterministic results only.
    #[serde(default)]
    pub disabled: bool,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            role_timeout_seconds: default_role_timeout(),
            disabled: false,
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_role_timeout() -> u64 {
    60
}

/// Severity penalty weights for the compliance score.
///
/// The defaults are policy, not law; override them here or at pipeline
/// construction when an organization weighs severities differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_critical_penalty")]
    pub critical_penalty: u32,

    #[serde(default = "default_high_penalty")]
    pub high_penalty: u32,

    #[serde(default = "default_medium_penalty")]
    pub medium_penalty: u32,

    #[serde(default = "default_low_penalty")]
    pub low_penalty: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            critical_penalty: default_critical_penalty(),
            high_penalty: default_high_penalty(),
            medium_penalty: default_medium_penalty(),
            low_penalty: default_low_penalty(),
        }
    }
}

fn default_critical_penalty() -> u32 {
    30
}

fn default_high_penalty() -> u32 {
    20
}

fn default_medium_penalty() -> u32 {
    10
}

fn default_low_penalty() -> u32 {
    5
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include fix code examples in the Markdown report.
    #[serde(default = "default_true")]
    pub include_fix_examples: bool,

    /// Include the severity priority matrix section.
    #[serde(default = "default_true")]
    pub include_matrix: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_fix_examples: true,
            include_matrix: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".regauditor.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Narrator settings - always override since they have defaults in CLI
        self.narrator.model = args.model.clone();
        self.narrator.ollama_url = args.ollama_url.clone();
        self.narrator.temperature = args.temperature;

        // Timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.role_timeout {
            self.narrator.role_timeout_seconds = timeout;
        }

        if args.no_narrative {
            self.narrator.disabled = true;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.narrator.model, "llama3.2:latest");
        assert_eq!(config.narrator.role_timeout_seconds, 60);
        assert_eq!(config.scoring.critical_penalty, 30);
        assert_eq!(config.scoring.low_penalty, 5);
        assert!(!config.narrator.disabled);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[narrator]
model = "qwen2.5:14b"
temperature = 0.2
role_timeout_seconds = 30

[scoring]
critical_penalty = 40
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.narrator.model, "qwen2.5:14b");
        assert_eq!(config.narrator.temperature, 0.2);
        assert_eq!(config.narrator.role_timeout_seconds, 30);
        assert_eq!(config.scoring.critical_penalty, 40);
        // Unlisted penalties keep their defaults.
        assert_eq!(config.scoring.high_penalty, 20);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[narrator]"));
        assert!(toml_str.contains("[scoring]"));
    }
}
