//! Remediation recommendation aggregation.
//!
//! Merges three recommendation sources into one deduplicated, severity-ranked
//! list: misconceptions detected in the attempt's answer text, misconception
//! labels already stored on the attempt, and keyword/topic fallback heuristics
//! backed by the rule library. Catalog-matched generic resources are appended
//! independently. Detection itself is pure; writing newly detected labels
//! back onto the attempt goes through the [`MisconceptionSink`] hook.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::ContentCatalog;
use crate::config::RemediationConfig;
use crate::error::EngineError;
use crate::rules::{MisconceptionRule, MisconceptionRules};
use crate::types::{
    Category, DetectedMisconception, GradedAttempt, QuizContext, RecommendationItem,
    RemediationOutcome, RemediationReport, RemediationSummary, Severity,
};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("attempt store unavailable: {0}")]
    Unavailable(String),
}

/// Write-back hook for misconception labels detected during a remediation
/// run. The host decides how (and whether) labels are persisted.
#[async_trait]
pub trait MisconceptionSink: Send + Sync {
    async fn append_misconceptions(
        &self,
        attempt_id: &str,
        labels: &[String],
    ) -> Result<(), SinkError>;
}

pub async fn recommend(
    attempt: &GradedAttempt,
    quiz: &QuizContext,
    rules: &MisconceptionRules,
    catalog: &dyn ContentCatalog,
    config: &RemediationConfig,
) -> Result<RemediationOutcome, EngineError> {
    // 1. Detect misconceptions in every answer, in answer order.
    let mut detections: Vec<DetectedMisconception> = Vec::new();
    for answer in &attempt.answers {
        detections.extend(rules.detect(&answer.selected_text, &answer.question_text));
    }

    // 2. Merge stored labels with detections; stored labels carry a default
    // confidence, detections carry their own.
    let mut recommendations: Vec<RecommendationItem> = Vec::new();
    let mentions = attempt
        .misconceptions
        .iter()
        .map(|label| (label.clone(), config.stored_label_confidence))
        .chain(
            detections
                .iter()
                .map(|d| (d.misconception.clone(), d.confidence)),
        );
    for (label, confidence) in mentions {
        for rule in rules.matching_label(&label) {
            push_rule_resources(&mut recommendations, rule, Some(label.clone()), confidence);
        }
    }

    // 3./4. Fallbacks, only when the merge produced nothing: first the
    // keyword groups over everything we know about the attempt, then the
    // bare topic-name map.
    if recommendations.is_empty() {
        let scan_text = fallback_scan_text(attempt, quiz, &detections);
        if let Some(rule) = rules.keyword_fallback(&scan_text) {
            debug!(category = rule.category.as_str(), "keyword fallback matched");
            push_rule_resources(
                &mut recommendations,
                rule,
                Some(rule.label.clone()),
                config.keyword_confidence,
            );
        } else if let Some(rule) = rules.topic_fallback(&quiz.topic) {
            debug!(category = rule.category.as_str(), "topic fallback matched");
            push_rule_resources(
                &mut recommendations,
                rule,
                Some(rule.label.clone()),
                config.topic_confidence,
            );
        }
    }

    // 5. Catalog-backed generic resources for the quiz topic, independent of
    // the rule-based sources.
    if !quiz.topic.trim().is_empty() {
        let items = catalog
            .by_topic_or_tag(&quiz.topic, config.catalog_items)
            .await
            .map_err(EngineError::from)?;
        for item in items {
            for url in &item.visualizations {
                recommendations.push(generic_item("visualization", &item.title, url));
            }
            for url in &item.interactive_elements {
                recommendations.push(generic_item("interactive", &item.title, url));
            }
        }
    }

    // 6. Deduplicate by URL; items without one are never deduplicated.
    let mut seen = HashSet::new();
    recommendations.retain(|rec| rec.url.is_empty() || seen.insert(rec.url.clone()));

    // 7. Severity first, then confidence; stable, so equal keys keep source
    // order, which makes repeated runs byte-identical.
    recommendations.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then_with(|| {
                b.confidence
                    .unwrap_or(0.0)
                    .total_cmp(&a.confidence.unwrap_or(0.0))
            })
    });

    // 8. Summary and category set cover the full deduplicated list; only the
    // returned recommendations are truncated.
    let summary = summarize(&recommendations);
    let categories = distinct_categories(&recommendations);
    recommendations.truncate(config.max_recommendations);

    let new_labels = fresh_labels(attempt, &detections);

    info!(
        attempt_id = %attempt.id,
        detected = detections.len(),
        recommended = recommendations.len(),
        "remediation recommendations assembled"
    );

    Ok(RemediationOutcome {
        report: RemediationReport {
            recommendations,
            detected_misconception_count: detections.len() as u32,
            categories,
            summary,
        },
        detections,
        new_labels,
    })
}

/// Run [`recommend`] and append any newly detected labels to the attempt via
/// the sink. Labels are deduplicated against the attempt's stored list, so
/// repeated calls do not grow it without bound.
pub async fn recommend_and_record(
    attempt: &GradedAttempt,
    quiz: &QuizContext,
    rules: &MisconceptionRules,
    catalog: &dyn ContentCatalog,
    sink: &dyn MisconceptionSink,
    config: &RemediationConfig,
) -> Result<RemediationOutcome, EngineError> {
    let outcome = recommend(attempt, quiz, rules, catalog, config).await?;
    if !outcome.new_labels.is_empty() {
        sink.append_misconceptions(&attempt.id, &outcome.new_labels)
            .await
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
    }
    Ok(outcome)
}

fn push_rule_resources(
    recommendations: &mut Vec<RecommendationItem>,
    rule: &MisconceptionRule,
    reason: Option<String>,
    confidence: f64,
) {
    for resource in &rule.resources {
        recommendations.push(RecommendationItem {
            reason: reason.clone(),
            category: rule.category,
            severity: rule.severity,
            confidence: Some(confidence),
            kind: resource.kind.clone(),
            title: resource.title.clone(),
            url: resource.url.clone(),
        });
    }
}

fn generic_item(kind: &str, title: &str, url: &str) -> RecommendationItem {
    RecommendationItem {
        reason: None,
        category: Category::General,
        severity: Severity::Low,
        confidence: None,
        kind: kind.to_string(),
        title: title.to_string(),
        url: url.to_string(),
    }
}

fn fallback_scan_text(
    attempt: &GradedAttempt,
    quiz: &QuizContext,
    detections: &[DetectedMisconception],
) -> String {
    let mut parts: Vec<&str> = vec![quiz.topic.as_str()];
    parts.extend(quiz.question_texts.iter().map(String::as_str));
    parts.extend(attempt.misconceptions.iter().map(String::as_str));
    parts.extend(detections.iter().map(|d| d.misconception.as_str()));
    parts.join(" ")
}

fn summarize(recommendations: &[RecommendationItem]) -> RemediationSummary {
    let count = |severity: Severity| {
        recommendations.iter().filter(|r| r.severity == severity).count() as u32
    };
    RemediationSummary {
        total: recommendations.len() as u32,
        high_severity: count(Severity::High),
        medium_severity: count(Severity::Medium),
        low_severity: count(Severity::Low),
    }
}

fn distinct_categories(recommendations: &[RecommendationItem]) -> Vec<Category> {
    let mut categories = Vec::new();
    for rec in recommendations {
        if !categories.contains(&rec.category) {
            categories.push(rec.category);
        }
    }
    categories
}

/// Detected canonical labels not yet stored on the attempt, deduplicated in
/// first-detection order.
fn fresh_labels(attempt: &GradedAttempt, detections: &[DetectedMisconception]) -> Vec<String> {
    let stored: HashSet<&str> = attempt.misconceptions.iter().map(String::as_str).collect();
    let mut labels = Vec::new();
    for detection in detections {
        let label = detection.misconception.as_str();
        if !stored.contains(label) && !labels.iter().any(|l: &String| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::rules;
    use crate::types::{AnswerRecord, ContentItem, Difficulty};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        appended: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl MisconceptionSink for RecordingSink {
        async fn append_misconceptions(
            &self,
            attempt_id: &str,
            labels: &[String],
        ) -> Result<(), SinkError> {
            self.appended
                .lock()
                .unwrap()
                .push((attempt_id.to_string(), labels.to_vec()));
            Ok(())
        }
    }

    fn attempt_with_answer(text: &str) -> GradedAttempt {
        GradedAttempt {
            id: "attempt-1".to_string(),
            answers: vec![AnswerRecord {
                selected_text: text.to_string(),
                question_text: String::new(),
            }],
            misconceptions: Vec::new(),
        }
    }

    fn quiz(topic: &str) -> QuizContext {
        QuizContext {
            topic: topic.to_string(),
            question_texts: Vec::new(),
        }
    }

    fn empty_catalog() -> InMemoryCatalog {
        InMemoryCatalog::default()
    }

    fn config() -> RemediationConfig {
        RemediationConfig::default()
    }

    #[tokio::test]
    async fn test_detected_misconception_yields_rule_resources() {
        let attempt = attempt_with_answer("NaOH is an acid");
        let outcome = recommend(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        assert!(outcome.report.detected_misconception_count >= 1);
        assert!(!outcome.report.recommendations.is_empty());
        assert!(outcome
            .report
            .categories
            .contains(&Category::AcidBase));
        assert_eq!(
            outcome.new_labels,
            vec!["Confusing strong bases with acids".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_duplicate_urls_across_sources() {
        // The stored label and the detected misconception resolve to the same
        // rule, so its resources are produced twice before deduplication.
        let mut attempt = attempt_with_answer("naoh is an acid");
        attempt
            .misconceptions
            .push("Confusing strong bases with acids".to_string());

        let outcome = recommend(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        let mut seen = HashSet::new();
        for rec in &outcome.report.recommendations {
            if !rec.url.is_empty() {
                assert!(seen.insert(rec.url.clone()), "duplicate url {}", rec.url);
            }
        }
    }

    #[tokio::test]
    async fn test_sorted_by_severity_then_confidence() {
        let mut attempt = attempt_with_answer("naoh is an acid and the ph scale is confusion");
        attempt
            .misconceptions
            .push("Confusing dissolving with melting and saturation limits".to_string());

        let outcome = recommend(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        let recs = &outcome.report.recommendations;
        assert!(recs.len() >= 3);
        for pair in recs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.severity.rank() >= b.severity.rank(),
                "severity order violated: {:?} before {:?}",
                a.severity,
                b.severity
            );
            if a.severity == b.severity {
                assert!(
                    a.confidence.unwrap_or(0.0) >= b.confidence.unwrap_or(0.0),
                    "confidence order violated within severity"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_keyword_fallback_when_nothing_detected() {
        let attempt = attempt_with_answer("i picked option c");
        let mut quiz = quiz("Chemical Reactions");
        quiz.question_texts
            .push("How many moles of water form from 2 mol H2?".to_string());

        let outcome = recommend(
            &attempt,
            &quiz,
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.report.detected_misconception_count, 0);
        assert!(!outcome.report.recommendations.is_empty());
        assert!(outcome
            .report
            .recommendations
            .iter()
            .all(|r| r.category == Category::Stoichiometry));
        assert!(outcome
            .report
            .recommendations
            .iter()
            .all(|r| r.confidence == Some(0.6)));
    }

    #[tokio::test]
    async fn test_topic_map_fallback_when_keywords_miss() {
        let attempt = attempt_with_answer("no idea");
        let outcome = recommend(
            &attempt,
            &quiz("Stoich Drills"),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        assert!(!outcome.report.recommendations.is_empty());
        assert!(outcome
            .report
            .recommendations
            .iter()
            .all(|r| r.category == Category::Stoichiometry && r.confidence == Some(0.5)));
    }

    #[tokio::test]
    async fn test_catalog_resources_appended_as_low_severity_general() {
        let item = ContentItem {
            id: "c1".to_string(),
            title: "Acid Rain Lab".to_string(),
            topic: "Acids and Bases".to_string(),
            difficulty: Difficulty::Beginner,
            estimated_time: 20,
            tags: Vec::new(),
            visualizations: vec!["https://example.org/acid-rain.png".to_string()],
            interactive_elements: vec!["https://example.org/acid-rain-sim".to_string()],
        };
        let catalog = InMemoryCatalog::new(vec![item]);

        let attempt = attempt_with_answer("naoh is an acid");
        let outcome = recommend(
            &attempt,
            &quiz("Acids and Bases"),
            rules::builtin(),
            &catalog,
            &config(),
        )
        .await
        .unwrap();

        let general: Vec<_> = outcome
            .report
            .recommendations
            .iter()
            .filter(|r| r.category == Category::General)
            .collect();
        assert_eq!(general.len(), 2);
        assert!(general.iter().all(|r| r.severity == Severity::Low));
        // Low severity sorts after the rule-based items.
        assert_eq!(outcome.report.recommendations.last().unwrap().category, Category::General);
    }

    #[tokio::test]
    async fn test_empty_inputs_yield_empty_report_not_error() {
        let attempt = attempt_with_answer("a perfectly reasonable answer");
        let outcome = recommend(
            &attempt,
            &quiz("Organic Nomenclature"),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        assert!(outcome.report.recommendations.is_empty());
        assert_eq!(outcome.report.summary.total, 0);
        assert!(outcome.new_labels.is_empty());
    }

    #[tokio::test]
    async fn test_summary_counts_cover_full_list_before_truncation() {
        let mut attempt = attempt_with_answer(
            "naoh is an acid, ionic bonds share electrons, and the mole ratio equals the mass ratio",
        );
        attempt
            .misconceptions
            .push("Misunderstanding pH scale direction".to_string());

        let mut small = config();
        small.max_recommendations = 3;
        let outcome = recommend(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &small,
        )
        .await
        .unwrap();

        assert_eq!(outcome.report.recommendations.len(), 3);
        assert!(outcome.report.summary.total > 3);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_deterministic() {
        let mut attempt = attempt_with_answer("naoh is an acid and koh is an acid");
        attempt
            .misconceptions
            .push("Confusing different types of chemical bonds".to_string());

        let first = recommend(
            &attempt,
            &quiz("Acids and Bases"),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();
        let second = recommend(
            &attempt,
            &quiz("Acids and Bases"),
            rules::builtin(),
            &empty_catalog(),
            &config(),
        )
        .await
        .unwrap();

        assert_eq!(
            serde_json::to_value(&first.report).unwrap(),
            serde_json::to_value(&second.report).unwrap()
        );
    }

    #[tokio::test]
    async fn test_recording_sink_receives_only_fresh_labels() {
        let mut attempt = attempt_with_answer("naoh is an acid and ionic bonds share electrons");
        attempt
            .misconceptions
            .push("Confusing strong bases with acids".to_string());

        let sink = RecordingSink::default();
        let outcome = recommend_and_record(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &sink,
            &config(),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome.new_labels,
            vec!["Confusing different types of chemical bonds".to_string()]
        );
        let appended = sink.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, "attempt-1");
        assert_eq!(appended[0].1, outcome.new_labels);
    }

    #[tokio::test]
    async fn test_sink_not_called_when_nothing_new() {
        let attempt = attempt_with_answer("clean answer");
        let sink = RecordingSink::default();
        recommend_and_record(
            &attempt,
            &quiz(""),
            rules::builtin(),
            &empty_catalog(),
            &sink,
            &config(),
        )
        .await
        .unwrap();

        assert!(sink.appended.lock().unwrap().is_empty());
    }
}
