//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.qtally.toml` files, and resolves the final immutable settings handed
//! to the HTTP client.

use crate::api::ApiVariant;
use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API connection settings.
    #[serde(default)]
    pub api: ApiSection,

    /// Output settings.
    #[serde(default)]
    pub output: OutputSection,
}

/// API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL of the questionnaire API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Endpoint variant: "simple" or "external".
    #[serde(default)]
    pub variant: ApiVariant,

    /// Organisation id (external variant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,

    /// Squad id (external variant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_id: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            variant: ApiVariant::default(),
            organisation_id: None,
            squad_id: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    /// Report format: "text" or "json".
    #[serde(default)]
    pub format: OutputFormat,

    /// Include a sample answer per template in the report.
    #[serde(default)]
    pub show_samples: bool,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Immutable settings handed to the HTTP client at construction time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub variant: ApiVariant,
    pub organisation_id: Option<String>,
    pub squad_id: Option<String>,
    pub timeout_seconds: u64,
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
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".qtally.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (including their environment fallbacks) take
    /// precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.api.base_url = Some(base_url.clone());
        }
        if let Some(ref token) = args.token {
            self.api.token = Some(token.clone());
        }
        if let Some(variant) = args.api {
            self.api.variant = variant;
        }
        if let Some(ref org) = args.org {
            self.api.organisation_id = Some(org.clone());
        }
        if let Some(ref squad) = args.squad {
            self.api.squad_id = Some(squad.clone());
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }

        // Flags only ever switch things on
        if args.sample {
            self.output.show_samples = true;
        }
        if args.verbose {
            self.output.verbose = true;
        }
    }

    /// Resolve the merged settings into the immutable client configuration.
    ///
    /// Fails when required settings are missing or inconsistent.
    pub fn resolve_api(&self) -> Result<ApiConfig> {
        let base_url = match self.api.base_url {
            Some(ref url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => bail!("No base URL configured. Pass --base-url or set [api] base_url in .qtally.toml"),
        };

        let token = match self.api.token {
            Some(ref token) if !token.is_empty() => token.clone(),
            _ => bail!("No API token configured. Pass --token or set [api] token in .qtally.toml"),
        };

        if self.api.variant == ApiVariant::External {
            if self.api.organisation_id.is_none() {
                bail!("The external variant requires an organisation id (--org or [api] organisation_id)");
            }
            if self.api.squad_id.is_none() {
                bail!("The external variant requires a squad id (--squad or [api] squad_id)");
            }
        }

        if self.api.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }

        Ok(ApiConfig {
            base_url,
            token,
            variant: self.api.variant,
            organisation_id: self.api.organisation_id.clone(),
            squad_id: self.api.squad_id.clone(),
            timeout_seconds: self.api.timeout_seconds,
        })
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
    use crate::cli::Args;
    use std::path::PathBuf;

    fn make_args() -> Args {
        Args {
            base_url: None,
            token: None,
            api: None,
            org: None,
            squad: None,
            timeout: None,
            format: None,
            output: None,
            sample: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.variant, ApiVariant::Simple);
        assert_eq!(config.api.timeout_seconds, 30);
        assert!(!config.output.show_samples);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
base_url = "https://api.example.com"
token = "secret"
variant = "external"
organisation_id = "org-1"
squad_id = "squad-2"
timeout_seconds = 10

[output]
format = "json"
show_samples = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.api.variant, ApiVariant::External);
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.show_samples);
    }

    #[test]
    fn test_merge_cli_precedence() {
        let mut config: Config = toml::from_str(
            r#"
[api]
base_url = "https://from-config.example.com"
token = "config-token"
"#,
        )
        .unwrap();

        let mut args = make_args();
        args.base_url = Some("https://from-cli.example.com".to_string());
        args.timeout = Some(5);
        args.sample = true;

        config.merge_with_args(&args);

        assert_eq!(
            config.api.base_url.as_deref(),
            Some("https://from-cli.example.com")
        );
        // Config value survives when CLI doesn't provide one
        assert_eq!(config.api.token.as_deref(), Some("config-token"));
        assert_eq!(config.api.timeout_seconds, 5);
        assert!(config.output.show_samples);
    }

    #[test]
    fn test_resolve_requires_base_url_and_token() {
        let config = Config::default();
        assert!(config.resolve_api().is_err());

        let mut config = Config::default();
        config.api.base_url = Some("https://api.example.com".to_string());
        assert!(config.resolve_api().is_err());

        config.api.token = Some("secret".to_string());
        assert!(config.resolve_api().is_ok());
    }

    #[test]
    fn test_resolve_trims_trailing_slash() {
        let mut config = Config::default();
        config.api.base_url = Some("https://api.example.com/".to_string());
        config.api.token = Some("secret".to_string());

        let api = config.resolve_api().unwrap();
        assert_eq!(api.base_url, "https://api.example.com");
    }

    #[test]
    fn test_resolve_external_requires_org_and_squad() {
        let mut config = Config::default();
        config.api.base_url = Some("https://api.example.com".to_string());
        config.api.token = Some("secret".to_string());
        config.api.variant = ApiVariant::External;
        assert!(config.resolve_api().is_err());

        config.api.organisation_id = Some("org-1".to_string());
        assert!(config.resolve_api().is_err());

        config.api.squad_id = Some("squad-2".to_string());
        assert!(config.resolve_api().is_ok());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[output]"));
        // Round-trips
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.timeout_seconds, 30);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Config::load(&PathBuf::from("/nonexistent/.qtally.toml")).is_err());
    }
}
