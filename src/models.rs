//! Data models for the answer tally.
//!
//! This module contains the core data structures: template identity,
//! response-shape detection, and the aggregate report built by the
//! traversal.

use crate::api::ApiVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder shown for templates that carry no name.
pub const UNNAMED_TEMPLATE: &str = "(unnamed template)";

/// Identifier of a questionnaire template.
///
/// Deployments disagree on id types: some return numeric ids, others
/// strings. Both are accepted and rendered verbatim in URLs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateId {
    Number(i64),
    Text(String),
}

impl TemplateId {
    /// True for identifiers that must be treated as missing: zero and the
    /// empty string, matching the upstream API's conventions.
    pub fn is_falsy(&self) -> bool {
        match self {
            TemplateId::Number(n) => *n == 0,
            TemplateId::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Number(n) => write!(f, "{}", n),
            TemplateId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A questionnaire template as returned by the listing endpoint.
///
/// Only `id` and `name` are inspected; any other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: Option<TemplateId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Template {
    /// The identifier, with falsy values normalized to `None`.
    pub fn usable_id(&self) -> Option<&TemplateId> {
        self.id.as_ref().filter(|id| !id.is_falsy())
    }

    /// The template name, falling back to a placeholder when absent.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNNAMED_TEMPLATE,
        }
    }
}

/// The two body shapes the API serves for list endpoints.
///
/// Deployments behind the external gateway wrap lists in `{"data": [...]}`;
/// older deployments return the bare array. A response is classified once,
/// here, instead of shape-checking at every use site.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// A bare JSON array.
    Bare(Vec<Value>),
    /// An object carrying the array under a `data` key.
    Wrapped(Vec<Value>),
}

impl ResponsePayload {
    /// Classify a JSON body. Returns `None` for anything that is neither a
    /// list nor an object with a list under `data`.
    pub fn detect(body: Value) -> Option<Self> {
        match body {
            Value::Array(items) => Some(ResponsePayload::Bare(items)),
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(items)) => Some(ResponsePayload::Wrapped(items)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Unwrap to the record list, discarding the shape tag.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            ResponsePayload::Bare(items) | ResponsePayload::Wrapped(items) => items,
        }
    }

    /// Number of records in the payload.
    #[allow(dead_code)] // Utility for inspection
    pub fn len(&self) -> usize {
        match self {
            ResponsePayload::Bare(items) | ResponsePayload::Wrapped(items) => items.len(),
        }
    }

    /// True when the payload holds no records.
    #[allow(dead_code)] // Utility for inspection
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of fetching the answers for one template.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnswerOutcome {
    /// Answers were retrieved. `sample` holds the first answer when
    /// sampling is enabled.
    Fetched {
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample: Option<Value>,
    },
    /// The fetch failed; the traversal carried on with the next template.
    Failed { reason: String },
}

impl AnswerOutcome {
    /// Answer count, zero for failed fetches.
    pub fn count(&self) -> usize {
        match self {
            AnswerOutcome::Fetched { count, .. } => *count,
            AnswerOutcome::Failed { .. } => 0,
        }
    }

    /// True when the fetch for this template failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, AnswerOutcome::Failed { .. })
    }
}

/// One template's entry in the aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
}

/// Metadata about one tally run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Base URL of the queried API.
    pub base_url: String,
    /// Endpoint variant used.
    pub variant: ApiVariant,
    /// When the template list was requested.
    pub fetched_at: DateTime<Utc>,
}

/// The complete aggregate built by the traversal.
///
/// Entries keep the order templates were received in; duplicate names stay
/// as separate entries rather than overwriting each other.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub metadata: ReportMetadata,
    pub entries: Vec<TemplateSummary>,
    /// Templates dropped for lack of a usable identifier.
    pub skipped: usize,
    /// True when the template list itself could not be fetched.
    pub aborted: bool,
}

impl AggregateReport {
    /// Create an empty report for the given run.
    pub fn new(metadata: ReportMetadata) -> Self {
        Self {
            metadata,
            entries: Vec::new(),
            skipped: 0,
            aborted: false,
        }
    }

    /// Look up the first entry with the given template name.
    #[allow(dead_code)] // Utility for lookups
    pub fn get(&self, name: &str) -> Option<&TemplateSummary> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries whose answer fetch failed.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }

    /// Total answers across all successfully fetched templates.
    pub fn answer_total(&self) -> usize {
        self.entries.iter().map(|e| e.outcome.count()).sum()
    }
}
