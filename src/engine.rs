//! Engine facade tying the calculators, the rule library, and the
//! collaborator seams together behind one handle.

use std::sync::Arc;

use crate::analytics::{self, DetectionReport, MisconceptionAnalytics};
use crate::catalog::ContentCatalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::focus;
use crate::mastery;
use crate::path;
use crate::remediation::{self, MisconceptionSink};
use crate::rules::{self, MisconceptionRules};
use crate::types::{
    AttemptRecord, FocusPartition, GradedAttempt, QuizContext, RemediationOutcome, TopicStat,
    WeeklyPath,
};

/// Stateless handle over the engine's call contracts. Cheap to clone, safe
/// to share: every invocation reads only its own inputs and the immutable
/// rule table.
#[derive(Clone)]
pub struct MasteryEngine {
    config: EngineConfig,
    rules: Arc<MisconceptionRules>,
}

impl Default for MasteryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MasteryEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rules: Arc::clone(rules::builtin()),
        }
    }

    /// Engine with an injected rule table instead of the built-in one.
    pub fn with_rules(config: EngineConfig, rules: Arc<MisconceptionRules>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &MisconceptionRules {
        &self.rules
    }

    /// Mastery stat for one topic from its attempt history, oldest first.
    pub fn compute_mastery(&self, topic: &str, attempts: &[AttemptRecord]) -> TopicStat {
        mastery::compute_mastery(topic, attempts, &self.config.mastery)
    }

    /// Partition topic stats into weak, strong, and emerging focus areas.
    pub fn classify_focus(&self, stats: &[TopicStat]) -> FocusPartition {
        focus::classify_focus(stats, &self.config.focus)
    }

    /// Build the weekly study plan for a learner from their full attempt
    /// history.
    pub async fn generate_path(
        &self,
        learner_id: &str,
        attempts: &[AttemptRecord],
        catalog: &dyn ContentCatalog,
    ) -> Result<WeeklyPath, EngineError> {
        path::generate_path(learner_id, attempts, catalog, &self.config).await
    }

    /// Detect misconceptions in free text and tally the results, for
    /// real-time feedback surfaces.
    pub fn analyze_text(&self, text: &str, context: &str) -> DetectionReport {
        analytics::analyze_text(text, context, &self.rules)
    }

    /// Aggregate stored misconception labels across graded attempts.
    pub fn misconception_analytics(
        &self,
        entries: &[(GradedAttempt, QuizContext)],
    ) -> MisconceptionAnalytics {
        analytics::misconception_analytics(entries, &self.rules)
    }

    /// Assemble remediation recommendations for a graded attempt. Pure:
    /// detected labels are returned, not persisted.
    pub async fn recommend(
        &self,
        attempt: &GradedAttempt,
        quiz: &QuizContext,
        catalog: &dyn ContentCatalog,
    ) -> Result<RemediationOutcome, EngineError> {
        remediation::recommend(attempt, quiz, &self.rules, catalog, &self.config.remediation).await
    }

    /// [`Self::recommend`], then write newly detected labels back onto the
    /// attempt through the sink.
    pub async fn recommend_and_record(
        &self,
        attempt: &GradedAttempt,
        quiz: &QuizContext,
        catalog: &dyn ContentCatalog,
        sink: &dyn MisconceptionSink,
    ) -> Result<RemediationOutcome, EngineError> {
        remediation::recommend_and_record(
            attempt,
            quiz,
            &self.rules,
            catalog,
            sink,
            &self.config.remediation,
        )
        .await
    }
}
