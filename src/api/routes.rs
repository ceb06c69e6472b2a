//! Endpoint construction for the two API deployments.
//!
//! The questionnaire API is served in two layouts: the plain
//! `/questionnaires/...` endpoints and the external gateway under
//! `/api/external/organisations/...`. All URL building lives here.

use crate::config::ApiConfig;
use crate::models::TemplateId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which deployment of the questionnaire API to target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ApiVariant {
    /// Plain `/questionnaires/templates` endpoints (default)
    #[default]
    Simple,
    /// External gateway endpoints scoped by organisation and squad
    External,
}

impl ApiVariant {
    /// Stable lowercase name, as used in config files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVariant::Simple => "simple",
            ApiVariant::External => "external",
        }
    }
}

impl fmt::Display for ApiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URL builder bound to one base URL and variant.
#[derive(Debug, Clone)]
pub struct Routes {
    base_url: String,
    variant: ApiVariant,
    organisation_id: String,
    squad_id: String,
}

impl Routes {
    /// Build routes from a resolved configuration.
    ///
    /// The config layer guarantees organisation and squad ids are present
    /// for the external variant; for the simple variant they are unused.
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            variant: config.variant,
            organisation_id: config.organisation_id.clone().unwrap_or_default(),
            squad_id: config.squad_id.clone().unwrap_or_default(),
        }
    }

    /// The variant these routes target.
    pub fn variant(&self) -> ApiVariant {
        self.variant
    }

    /// URL of the template listing endpoint.
    pub fn templates_url(&self) -> String {
        match self.variant {
            ApiVariant::Simple => format!("{}/questionnaires/templates", self.base_url),
            ApiVariant::External => format!(
                "{}/api/external/organisations/{}/questionnaire_templates",
                self.base_url, self.organisation_id
            ),
        }
    }

    /// URL of the answers endpoint for one template.
    pub fn answers_url(&self, template_id: &TemplateId) -> String {
        match self.variant {
            ApiVariant::Simple => format!(
                "{}/questionnaires/templates/{}/answers",
                self.base_url, template_id
            ),
            ApiVariant::External => format!(
                "{}/api/external/organisations/{}/squads/{}/questionnaire_templates/{}/answers",
                self.base_url, self.organisation_id, self.squad_id, template_id
            ),
        }
    }
}
