//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// regauditor - regulation-aware compliance auditor for web pages
///
/// Audit a captured page for GDPR, WCAG, ADA, security, and SEO
/// compliance, with optional LLM-backed legal and risk narrative.
/// Markdown/JSON reports. Built in Rust.
///
/// Examples:
///   regauditor --input page.json --url https://example.com
///   regauditor --input page.json --url https://example.com --model llama3.2:latest
///   regauditor --input page.json --url https://example.com --format json
///   regauditor --input page.json --url http://example.com --dry-run
///   regauditor --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the captured page as a JSON element tree
    ///
    /// The file holds the rendered document in the
    /// `{tag, attributes, children, text}` shape emitted by the capture
    /// provider. Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// URL the page was captured from
    ///
    /// Determines the transport-encryption check and appears in the report.
    #[arg(short, long, value_name = "URL", required_unless_present = "init_config")]
    pub url: Option<String>,

    /// Ollama model to use for narrative analysis
    ///
    /// Can also be set via REGAUDITOR_MODEL env var or .regauditor.toml config.
    #[arg(short, long, default_value = "llama3.2:latest", env = "REGAUDITOR_MODEL")]
    pub model: String,

    /// Output file path for the report
    #[arg(short, long, default_value = "regaudit_report.md", value_name = "FILE")]
    pub output: PathBuf,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Path to configuration file
    ///
    /// If not specified, looks for .regauditor.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// Per-role narrator timeout in seconds
    ///
    /// How long to wait for each of the four narrative roles before
    /// skipping it. Default: from config or 60s.
    #[arg(long, value_name = "SECS")]
    pub role_timeout: Option<u64>,

    /// Skip the narrative roles and report deterministic results only
    ///
    /// The run is reported as `partial`. Overrides config file setting.
    #[arg(long)]
    pub no_narrative: bool,

    /// Dry run: scan the page and print violations without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Fail if the compliance score is below this threshold
    ///
    /// Useful for CI pipelines. Exit code 2 when the score is below it.
    #[arg(long, value_name = "SCORE")]
    pub fail_under: Option<u32>,

    /// Generate a default .regauditor.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        let url = self.url.as_deref().unwrap_or("");
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate Ollama URL format (not needed for dry-run)
        if !self.dry_run
            && !self.no_narrative
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        if let Some(timeout) = self.role_timeout {
            if timeout == 0 {
                return Err("Role timeout must be at least 1 second".to_string());
            }
        }

        if let Some(threshold) = self.fail_under {
            if threshold > 100 {
                return Err("Fail-under threshold must be between 0 and 100".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            url: Some("https://example.com/".to_string()),
            model: "test".to_string(),
            output: PathBuf::from("test.md"),
            ollama_url: "http://localhost:11434".to_string(),
            config: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Markdown,
            temperature: 0.1,
            role_timeout: None,
            no_narrative: false,
            dry_run: false,
            fail_under: None,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.url = Some("example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input_file() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/nonexistent/page.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_fail_under_bounds() {
        let mut args = make_args();
        args.fail_under = Some(80);
        assert!(args.validate().is_ok());

        args.fail_under = Some(101);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.url = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
