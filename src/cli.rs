//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::api::ApiVariant;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// QTally - per-template answer tally for questionnaire APIs
///
/// Lists questionnaire templates from an HTTP API, fetches the answers
/// recorded against each template, and prints a tally. One failed answer
/// fetch never aborts the run.
///
/// Examples:
///   qtally --base-url https://api.example.com --token $TOKEN
///   qtally --base-url https://api.example.com --api external --org 12 --squad 34
///   qtally --base-url https://api.example.com --format json --output tally.json
///   qtally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Base URL of the questionnaire API
    ///
    /// Must start with http:// or https://. Not required when using
    /// --init-config.
    #[arg(
        short,
        long,
        value_name = "URL",
        env = "QTALLY_BASE_URL",
        required_unless_present = "init_config"
    )]
    pub base_url: Option<String>,

    /// API bearer token
    ///
    /// Sent as `Authorization: Bearer <token>` with every request. Can also
    /// be set in .qtally.toml.
    #[arg(
        short,
        long,
        value_name = "TOKEN",
        env = "QTALLY_API_TOKEN",
        hide_env_values = true
    )]
    pub token: Option<String>,

    /// Endpoint variant to target
    ///
    /// `simple` uses /questionnaires/templates; `external` uses the
    /// organisation/squad-scoped gateway and requires --org and --squad.
    #[arg(long, value_name = "VARIANT")]
    pub api: Option<ApiVariant>,

    /// Organisation id (external variant only)
    #[arg(long, value_name = "ID", env = "QTALLY_ORG_ID")]
    pub org: Option<String>,

    /// Squad id (external variant only)
    #[arg(long, value_name = "ID", env = "QTALLY_SQUAD_ID")]
    pub squad: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Include a sample answer for each template in the report
    #[arg(long)]
    pub sample: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .qtally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .qtally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Cross-source rules (token presence, org/squad for the external
    /// variant) are checked after the config merge, not here.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate base URL format
        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
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
