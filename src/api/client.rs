//! HTTP access to the questionnaire API.
//!
//! `ApiClient` is the production implementation of the traversal's
//! `TemplateSource`: GET requests with bearer authorization, a single
//! catchable failure type for transport errors and non-2xx statuses, and
//! response-shape detection applied once per response.

use crate::aggregate::TemplateSource;
use crate::api::routes::{ApiVariant, Routes};
use crate::config::ApiConfig;
use crate::models::{ResponsePayload, TemplateId};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of a single API fetch.
///
/// Transport problems, non-2xx statuses, and unusable body shapes all fold
/// into one type so the traversal can treat any fetch uniformly.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection error, timeout, or body read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The body parsed as JSON but was neither a list nor `{"data": [...]}`.
    #[error("unexpected response shape: expected a list or an object with a `data` key")]
    Shape,
}

impl FetchError {
    /// Short operator-facing description, with the common transport causes
    /// spelled out.
    pub fn summary(&self) -> String {
        match self {
            FetchError::Transport(e) if e.is_timeout() => "request timed out".to_string(),
            FetchError::Transport(e) if e.is_connect() => {
                "cannot connect to the API host".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Client for the questionnaire API.
pub struct ApiClient {
    http: reqwest::Client,
    routes: Routes,
    token: String,
}

impl ApiClient {
    /// Build a client from a resolved configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            routes: Routes::new(config),
            token: config.token.clone(),
        })
    }

    /// Issue one GET and parse the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!("GET {}", url);

        let request = self.http.get(url).bearer_auth(&self.token);

        // The plain deployment expects Accept; the external gateway was
        // only ever exercised with Content-Type. Mirror each one.
        let request = match self.routes.variant() {
            ApiVariant::Simple => request.header(ACCEPT, "application/json"),
            ApiVariant::External => request.header(CONTENT_TYPE, "application/json"),
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    /// GET a list endpoint and unwrap either accepted body shape.
    async fn get_records(&self, url: &str) -> Result<Vec<Value>, FetchError> {
        let body = self.get_json(url).await?;
        ResponsePayload::detect(body)
            .map(ResponsePayload::into_records)
            .ok_or(FetchError::Shape)
    }
}

#[async_trait]
impl TemplateSource for ApiClient {
    async fn fetch_templates(&self) -> Result<Vec<Value>, FetchError> {
        self.get_records(&self.routes.templates_url()).await
    }

    async fn fetch_answers(&self, template_id: &TemplateId) -> Result<Vec<Value>, FetchError> {
        self.get_records(&self.routes.answers_url(template_id)).await
    }
}
