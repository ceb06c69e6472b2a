//! The fetch-and-aggregate traversal.
//!
//! Fetches the template list once, then walks it in the order received,
//! fetching the answers recorded against each template. A failed answer
//! fetch marks that one entry and the walk continues; only a failed
//! template-list fetch aborts the run.

use crate::api::FetchError;
use crate::models::{AggregateReport, AnswerOutcome, ReportMetadata, Template, TemplateId, TemplateSummary};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Something that serves the template list and per-template answers.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory source.
#[async_trait]
pub trait TemplateSource {
    /// Fetch all templates as raw records.
    async fn fetch_templates(&self) -> Result<Vec<Value>, FetchError>;

    /// Fetch the answers recorded against one template.
    async fn fetch_answers(&self, template_id: &TemplateId) -> Result<Vec<Value>, FetchError>;
}

/// Observer for per-template progress.
///
/// The binary plugs in a terminal progress bar; tests and quiet mode use
/// [`NoProgress`].
pub trait Progress {
    /// Called once, with the number of templates about to be walked.
    fn begin(&self, total: usize);

    /// Called after each template has been handled (fetched, failed, or
    /// skipped).
    fn template_done(&self, name: &str);

    /// Called when the walk is over.
    fn finish(&self);
}

/// Progress sink that does nothing.
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _total: usize) {}
    fn template_done(&self, _name: &str) {}
    fn finish(&self) {}
}

/// Drives the traversal and folds the results into an [`AggregateReport`].
pub struct Aggregator {
    sample_answers: bool,
}

impl Aggregator {
    /// Create an aggregator. When `sample_answers` is set, the first answer
    /// of each template is kept in the report for inspection.
    pub fn new(sample_answers: bool) -> Self {
        Self { sample_answers }
    }

    /// Run the traversal against `source`.
    ///
    /// Never fails: remote errors end up as an aborted report, a skipped
    /// counter, or per-entry failure markers.
    pub async fn run<S>(
        &self,
        source: &S,
        progress: &dyn Progress,
        metadata: ReportMetadata,
    ) -> AggregateReport
    where
        S: TemplateSource + Sync,
    {
        let mut report = AggregateReport::new(metadata);

        let records = match source.fetch_templates().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to fetch template list: {}", e.summary());
                report.aborted = true;
                return report;
            }
        };

        info!("Retrieved {} templates", records.len());
        progress.begin(records.len());

        for record in records {
            let template: Template = match serde_json::from_value(record) {
                Ok(template) => template,
                Err(e) => {
                    warn!("Unrecognized template record, skipping: {}", e);
                    report.skipped += 1;
                    progress.template_done(crate::models::UNNAMED_TEMPLATE);
                    continue;
                }
            };

            let name = template.display_name().to_string();

            let Some(id) = template.usable_id() else {
                warn!("Template '{}' has no usable id, skipping", name);
                report.skipped += 1;
                progress.template_done(&name);
                continue;
            };

            let outcome = match source.fetch_answers(id).await {
                Ok(answers) => {
                    debug!("Template '{}' (id {}): {} answers", name, id, answers.len());
                    let sample = if self.sample_answers {
                        answers.first().cloned()
                    } else {
                        None
                    };
                    AnswerOutcome::Fetched {
                        count: answers.len(),
                        sample,
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to fetch answers for template '{}' (id {}): {}",
                        name,
                        id,
                        e.summary()
                    );
                    AnswerOutcome::Failed {
                        reason: e.summary(),
                    }
                }
            };

            report.entries.push(TemplateSummary {
                id: id.clone(),
                name: name.clone(),
                outcome,
            });
            progress.template_done(&name);
        }

        progress.finish();
        info!(
            "Aggregation complete: {} entries, {} skipped, {} failed",
            report.entries.len(),
            report.skipped,
            report.failed_count()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiVariant;
    use chrono::Utc;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory source: `templates: None` simulates a failed list fetch;
    /// an id missing from `answers` simulates a failed answers fetch.
    struct MockSource {
        templates: Option<Vec<Value>>,
        answers: HashMap<String, Vec<Value>>,
    }

    impl MockSource {
        fn new(templates: Vec<Value>) -> Self {
            Self {
                templates: Some(templates),
                answers: HashMap::new(),
            }
        }

        fn failing() -> Self {
            Self {
                templates: None,
                answers: HashMap::new(),
            }
        }

        fn with_answers(mut self, id: &str, answers: Vec<Value>) -> Self {
            self.answers.insert(id.to_string(), answers);
            self
        }
    }

    #[async_trait]
    impl TemplateSource for MockSource {
        async fn fetch_templates(&self) -> Result<Vec<Value>, FetchError> {
            self.templates.clone().ok_or(FetchError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: String::new(),
            })
        }

        async fn fetch_answers(&self, template_id: &TemplateId) -> Result<Vec<Value>, FetchError> {
            self.answers
                .get(&template_id.to_string())
                .cloned()
                .ok_or(FetchError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                })
        }
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            base_url: "https://api.example.com".to_string(),
            variant: ApiVariant::Simple,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_template_list() {
        let source = MockSource::new(vec![]);
        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert!(!report.aborted);
        assert!(report.entries.is_empty());
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_failed_template_fetch_aborts_empty() {
        let source = MockSource::failing();
        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert!(report.aborted);
        assert!(report.entries.is_empty());
    }

    #[tokio::test]
    async fn test_counts_per_template() {
        let source = MockSource::new(vec![
            json!({"id": 1, "name": "A"}),
            json!({"id": 2, "name": "C"}),
        ])
        .with_answers("1", vec![json!({"x": 1}), json!({"x": 2})])
        .with_answers("2", vec![json!({}), json!({}), json!({})]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].name, "A");
        assert_eq!(report.entries[0].outcome.count(), 2);
        assert_eq!(report.entries[1].name, "C");
        assert_eq!(report.entries[1].outcome.count(), 3);
        assert_eq!(report.answer_total(), 5);
    }

    #[tokio::test]
    async fn test_null_id_skipped() {
        let source = MockSource::new(vec![
            json!({"id": 1, "name": "A"}),
            json!({"id": null, "name": "B"}),
            json!({"id": 2, "name": "C"}),
        ])
        .with_answers("1", vec![json!({})])
        .with_answers("2", vec![json!({})]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        let names: Vec<&str> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(report.skipped, 1);
        assert!(report.get("B").is_none());
    }

    #[tokio::test]
    async fn test_falsy_ids_skipped() {
        let source = MockSource::new(vec![
            json!({"id": 0, "name": "Zero"}),
            json!({"id": "", "name": "Empty"}),
            json!({"name": "Absent"}),
        ]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert!(report.entries.is_empty());
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_walk() {
        let source = MockSource::new(vec![
            json!({"id": 1, "name": "First"}),
            json!({"id": 2, "name": "Broken"}),
            json!({"id": 3, "name": "Last"}),
        ])
        .with_answers("1", vec![json!({})])
        .with_answers("3", vec![json!({}), json!({})]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert_eq!(report.entries.len(), 3);
        assert!(!report.entries[0].outcome.is_failed());
        assert!(report.entries[1].outcome.is_failed());
        assert!(!report.entries[2].outcome.is_failed());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.answer_total(), 3);
    }

    #[tokio::test]
    async fn test_sample_capture() {
        let source = MockSource::new(vec![json!({"id": 1, "name": "A"})])
            .with_answers("1", vec![json!({"score": 9}), json!({"score": 3})]);

        let report = Aggregator::new(true)
            .run(&source, &NoProgress, metadata())
            .await;

        match &report.entries[0].outcome {
            AnswerOutcome::Fetched { count, sample } => {
                assert_eq!(*count, 2);
                assert_eq!(sample.as_ref(), Some(&json!({"score": 9})));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_sample_when_disabled() {
        let source = MockSource::new(vec![json!({"id": 1, "name": "A"})])
            .with_answers("1", vec![json!({"score": 9})]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        match &report.entries[0].outcome {
            AnswerOutcome::Fetched { sample, .. } => assert!(sample.is_none()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_idempotent_against_stable_source() {
        let make_source = || {
            MockSource::new(vec![
                json!({"id": 1, "name": "A"}),
                json!({"id": 2, "name": "B"}),
            ])
            .with_answers("1", vec![json!({})])
            .with_answers("2", vec![json!({}), json!({})])
        };

        let first = tokio_test::block_on(Aggregator::new(false).run(
            &make_source(),
            &NoProgress,
            metadata(),
        ));
        let second = tokio_test::block_on(Aggregator::new(false).run(
            &make_source(),
            &NoProgress,
            metadata(),
        ));

        let counts = |r: &AggregateReport| -> Vec<(String, usize)> {
            r.entries
                .iter()
                .map(|e| (e.name.clone(), e.outcome.count()))
                .collect()
        };
        assert_eq!(counts(&first), counts(&second));
    }

    #[tokio::test]
    async fn test_unnamed_template_gets_placeholder() {
        let source =
            MockSource::new(vec![json!({"id": 5})]).with_answers("5", vec![json!({})]);

        let report = Aggregator::new(false)
            .run(&source, &NoProgress, metadata())
            .await;

        assert_eq!(report.entries[0].name, crate::models::UNNAMED_TEMPLATE);
    }
}
