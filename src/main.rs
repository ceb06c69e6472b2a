//! QTally - Questionnaire Template Answer Tally
//!
//! A CLI tool that lists questionnaire templates from an HTTP API,
//! fetches the answers recorded against each template, and prints a
//! per-template tally.
//!
//! Exit codes:
//!   0 - Normal completion (individual answer fetches may still have failed)
//!   1 - Runtime error (bad config, unwritable output) or the template
//!       list itself could not be fetched

mod aggregate;
mod api;
mod cli;
mod config;
mod models;
mod report;

use aggregate::{Aggregator, NoProgress, Progress};
use anyhow::{Context, Result};
use api::ApiClient;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::ReportMetadata;
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

    info!("QTally v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the tally
    match run_tally(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Tally failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .qtally.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".qtally.toml");

    if path.exists() {
        eprintln!("⚠️  .qtally.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .qtally.toml")?;

    println!("✅ Created .qtally.toml with default settings.");
    println!("   Edit it to set base_url, token, variant, and ids.");
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

/// Run the complete tally workflow. Returns exit code (0 or 1).
async fn run_tally(args: Args) -> Result<i32> {
    // Load configuration and let CLI flags win
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let api_config = config.resolve_api()?;
    let client = ApiClient::new(&api_config).context("Failed to build HTTP client")?;

    // Banners stay off stdout when JSON is going there
    let chatty = !args.quiet
        && (config.output.format == OutputFormat::Text || args.output.is_some());

    if chatty {
        println!(
            "📡 Querying {} ({} endpoints)",
            api_config.base_url,
            api_config.variant.as_str()
        );
    }

    let metadata = ReportMetadata {
        base_url: api_config.base_url.clone(),
        variant: api_config.variant,
        fetched_at: Utc::now(),
    };

    // Step 1 + 2: fetch the template list, then walk it fetching answers
    let aggregator = Aggregator::new(config.output.show_samples);
    let progress = make_progress(&args);
    let report = aggregator.run(&client, progress.as_ref(), metadata).await;

    // Step 3: render
    let rendered = match config.output.format {
        OutputFormat::Text => report::generate_text_report(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if chatty {
                println!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => {
            println!("{}", rendered.trim_end());
        }
    }

    if chatty {
        println!("\n📊 Tally summary:");
        println!("   Templates:       {}", report.entries.len());
        println!("   Skipped (no id): {}", report.skipped);
        println!("   Failed fetches:  {}", report.failed_count());
        println!("   Total answers:   {}", report.answer_total());
    }

    if report.aborted {
        eprintln!("\n⛔ Template list could not be fetched. See log for details.");
        return Ok(1);
    }

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
            info!("Loaded default config from .qtally.toml");
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

/// Progress bar over the per-template answer fetches.
struct BarProgress {
    bar: ProgressBar,
}

impl Progress for BarProgress {
    fn begin(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn template_done(&self, name: &str) {
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Build the progress sink: a terminal bar, or a no-op in quiet mode.
fn make_progress(args: &Args) -> Box<dyn Progress> {
    if args.quiet {
        return Box::new(NoProgress);
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    Box::new(BarProgress { bar })
}
