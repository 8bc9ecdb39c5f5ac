//! Misconception analytics: real-time detection tallies and aggregate
//! reporting over stored misconception labels.
//!
//! Both entry points are pure aggregations over caller-supplied snapshots and
//! the immutable rule table; nothing here touches a collaborator.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::rules::MisconceptionRules;
use crate::types::{Category, DetectedMisconception, GradedAttempt, QuizContext, Severity};

const TOP_MISCONCEPTIONS: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBreakdown {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl SeverityBreakdown {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// Detection result shaped for real-time feedback surfaces: the raw
/// detections plus count, category, and severity tallies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub misconceptions: Vec<DetectedMisconception>,
    pub count: u32,
    pub categories: Vec<Category>,
    pub by_severity: SeverityBreakdown,
}

/// Run the detector over one piece of text and tally the results.
pub fn analyze_text(text: &str, context: &str, rules: &MisconceptionRules) -> DetectionReport {
    let misconceptions = rules.detect(text, context);

    let mut categories = Vec::new();
    let mut by_severity = SeverityBreakdown::default();
    for detection in &misconceptions {
        by_severity.add(detection.severity);
        if !categories.contains(&detection.category) {
            categories.push(detection.category);
        }
    }

    DetectionReport {
        count: misconceptions.len() as u32,
        categories,
        by_severity,
        misconceptions,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionCount {
    pub misconception: String,
    pub count: u32,
}

/// Aggregate view of misconception labels across many graded attempts.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionAnalytics {
    pub total_misconceptions: u32,
    pub by_category: BTreeMap<String, u32>,
    pub by_severity: SeverityBreakdown,
    pub by_topic: BTreeMap<String, u32>,
    pub top_misconceptions: Vec<MisconceptionCount>,
}

/// Aggregate stored misconception labels over `(attempt, quiz)` snapshots.
///
/// Labels are resolved to rules through the same canonical-label matching the
/// aggregator uses, so a label several rules claim counts once per rule in
/// the category and severity tallies. Labels no rule recognizes still count
/// toward the total, the per-topic tally, and the ranking.
pub fn misconception_analytics(
    entries: &[(GradedAttempt, QuizContext)],
    rules: &MisconceptionRules,
) -> MisconceptionAnalytics {
    let mut analytics = MisconceptionAnalytics::default();
    let mut label_counts: Vec<(String, u32)> = Vec::new();

    for (attempt, quiz) in entries {
        for label in &attempt.misconceptions {
            analytics.total_misconceptions += 1;

            for rule in rules.matching_label(label) {
                *analytics
                    .by_category
                    .entry(rule.category.as_str().to_string())
                    .or_insert(0) += 1;
                analytics.by_severity.add(rule.severity);
            }

            if !quiz.topic.trim().is_empty() {
                *analytics.by_topic.entry(quiz.topic.clone()).or_insert(0) += 1;
            }

            match label_counts.iter_mut().find(|(seen, _)| seen == label) {
                Some((_, count)) => *count += 1,
                None => label_counts.push((label.clone(), 1)),
            }
        }
    }

    // Stable sort, so equally frequent labels keep first-seen order.
    label_counts.sort_by(|a, b| b.1.cmp(&a.1));
    label_counts.truncate(TOP_MISCONCEPTIONS);
    analytics.top_misconceptions = label_counts
        .into_iter()
        .map(|(misconception, count)| MisconceptionCount { misconception, count })
        .collect();

    analytics
}
