//! regauditor - regulation-aware compliance auditor for web pages
//!
//! A CLI tool that scans a captured page for GDPR, WCAG, ADA, security,
//! and SEO compliance, then enriches the deterministic findings with
//! LLM-backed legal, risk, and roadmap narrative via Ollama.
//!
//! Exit codes:
//!   0 - Success (score at or above --fail-under, or no threshold set)
//!   1 - Runtime error (bad input, config, connection failure, etc.)
//!   2 - Compliance score below the --fail-under threshold

mod advisor;
mod citations;
mod cli;
mod config;
mod document;
mod insight;
mod mapper;
mod models;
mod narrator;
mod pipeline;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use document::{Document, RequestContext};
use indicatif::ProgressBar;
use narrator::OllamaNarrator;
use pipeline::AuditPipeline;
use scanner::Scanner;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("regauditor v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the audit
    match run_audit(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Audit failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .regauditor.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".regauditor.toml");

    if path.exists() {
        eprintln!("⚠️  .regauditor.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .regauditor.toml")?;

    println!("✅ Created .regauditor.toml with default settings.");
    println!("   Edit it to customize the model, scoring penalties, and timeouts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete audit workflow. Returns exit code (0 or 2).
async fn run_audit(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Validated in Args::validate; absent only with --init-config.
    let input = args
        .input
        .as_deref()
        .context("--input is required for an audit run")?;
    let url = args
        .url
        .as_deref()
        .context("--url is required for an audit run")?;

    // Step 1: Load the captured page
    println!("📄 Loading page: {}", input.display());
    let page = Document::load(input)?;
    let context = RequestContext::from_url(url);
    info!(
        "Loaded document for {} (scheme: {})",
        context.url, context.scheme
    );

    // Handle --dry-run: scan and print, no LLM calls
    if args.dry_run {
        return handle_dry_run(&page, &context);
    }

    // Step 2: Set up the pipeline
    if !config.narrator.disabled {
        println!("🤖 Narrative analysis enabled");
        println!("   Model: {}", config.narrator.model);
        println!("   Ollama: {}", config.narrator.ollama_url);
        println!("   Per-role timeout: {}s", config.narrator.role_timeout_seconds);
    } else {
        println!("🔇 Narrative analysis disabled; deterministic results only");
    }

    let mut audit_pipeline = AuditPipeline::new(
        config.scoring.clone(),
        Duration::from_secs(config.narrator.role_timeout_seconds),
    );
    if config.narrator.disabled {
        audit_pipeline = audit_pipeline.without_narrative();
    }

    let ollama = OllamaNarrator::new(config.narrator.clone())?;

    // Step 3: Run the audit
    println!("\n🔬 Running compliance analysis...");
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Scanning and consulting narrative roles...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = audit_pipeline.run_audit(&page, &context, &ollama).await;
    spinner.finish_and_clear();
    let combined = result?;

    // Step 4: Generate and save the report
    println!("📝 Generating report...");
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&combined)?,
        OutputFormat::Markdown => report::generate_markdown_report(&combined, &config.report),
    };

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    // Print summary
    let breakdown = &combined.severity_breakdown;
    println!("\n📊 Audit Summary:");
    println!("   Status: {}", combined.status);
    println!("   Compliance score: {}/100", combined.compliance_score);
    println!("   Total issues: {}", combined.mapped_issues.len());
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {} | 🟡 Medium: {} | 🟢 Low: {}",
        breakdown.critical, breakdown.high, breakdown.medium, breakdown.low
    );
    if !combined.roles_succeeded.is_empty() {
        println!(
            "   Narrative roles: {}",
            combined.roles_succeeded.join(", ")
        );
    }
    for warning in &combined.warnings {
        warn!("{}", warning);
    }
    println!(
        "\n✅ Audit complete! Report saved to: {}",
        args.output.display()
    );

    // Check --fail-under threshold
    if let Some(threshold) = args.fail_under {
        if combined.compliance_score < threshold {
            eprintln!(
                "\n⛔ Compliance score {} is below the {} threshold. Failing (exit code 2).",
                combined.compliance_score, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Handle --dry-run: scan the page, print the violations, exit.
fn handle_dry_run(page: &Document, context: &RequestContext) -> Result<i32> {
    println!("\n🔍 Dry run: scanning page (no LLM call)...\n");

    let outcome = Scanner::new().scan(page, context);

    if outcome.violations.is_empty() {
        println!("   No violations found.");
    } else {
        println!("   Found {} violations:\n", outcome.violations.len());
        for violation in &outcome.violations {
            println!(
                "     {} [{}] {}: {}",
                violation.severity.emoji(),
                violation.severity,
                violation.kind,
                violation.description
            );
        }
    }
    for warning in &outcome.warnings {
        println!("     ⚠️  {}", warning);
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .regauditor.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
