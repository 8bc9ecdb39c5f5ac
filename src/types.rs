use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Trend {
    #[default]
    New,
    Stable,
    Improving,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Stable => "stable",
            Self::Improving => "improving",
            Self::Declining => "declining",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "stable" => Self::Stable,
            "improving" => Self::Improving,
            "declining" => Self::Declining,
            _ => Self::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Default)]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "beginner" => Self::Beginner,
            "advanced" => Self::Advanced,
            _ => Self::Intermediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort key: higher value sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AcidBase,
    PeriodicTable,
    Bonding,
    Stoichiometry,
    Thermodynamics,
    AtomicStructure,
    Equilibrium,
    Solubility,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcidBase => "acid-base",
            Self::PeriodicTable => "periodic-table",
            Self::Bonding => "bonding",
            Self::Stoichiometry => "stoichiometry",
            Self::Thermodynamics => "thermodynamics",
            Self::AtomicStructure => "atomic-structure",
            Self::Equilibrium => "equilibrium",
            Self::Solubility => "solubility",
            Self::General => "general",
        }
    }
}

/// One graded quiz attempt for a single topic. Owned by the attempt-history
/// collaborator; the engine only reads ordered sequences of these, oldest
/// first per topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub topic: String,
    /// Percentage score, 0-100.
    pub score: f64,
    /// Self-reported confidence on a 1-5 scale, if the learner gave one.
    pub confidence_level: Option<u8>,
    pub completed_at: DateTime<Utc>,
}

/// Per-topic mastery estimate, recomputed fresh on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStat {
    pub topic: String,
    pub mastery: i32,
    pub attempt_count: u32,
    pub average_score: i32,
    pub recent_trend: Trend,
    pub confidence: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusPartition {
    pub weak_areas: Vec<TopicStat>,
    pub strong_areas: Vec<TopicStat>,
    pub emerging_areas: Vec<TopicStat>,
}

/// An approved learning item from the content catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Estimated study time in minutes.
    pub estimated_time: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visualizations: Vec<String>,
    #[serde(default)]
    pub interactive_elements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    BeginnerPath,
    PersonalizedPath,
}

impl PathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeginnerPath => "beginner_path",
            Self::PersonalizedPath => "personalized_path",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    pub rank: u32,
    pub title: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub estimated_time: i32,
    pub mastery_level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_trend: Option<Trend>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<i32>,
    pub reason: String,
    pub recommended_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStatistics {
    pub total_quizzes_taken: u32,
    pub average_mastery: i32,
    pub topics_studied: u32,
    pub improving_topics: u32,
    pub declining_topics: u32,
    pub strongest_area: String,
    pub weakest_area: String,
}

/// Personalized weekly study plan, JSON-serializable for the host service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPath {
    pub learner_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub path_type: PathType,
    pub message: String,
    pub weekly_topics: Vec<PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<PathStatistics>,
    pub overall_recommendation: String,
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub topic_details: Vec<TopicStat>,
}

/// One answer from a graded attempt, carrying the text the learner selected
/// and the question it answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub selected_text: String,
    #[serde(default)]
    pub question_text: String,
}

/// A graded attempt as the remediation flow sees it: answers plus any
/// misconception labels already stored on the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAttempt {
    pub id: String,
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizContext {
    pub topic: String,
    #[serde(default)]
    pub question_texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedMisconception {
    pub category: Category,
    pub misconception: String,
    pub severity: Severity,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub category: Category,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    /// Empty string means the item has no URL; such items are exempt from
    /// URL-based deduplication.
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationSummary {
    pub total: u32,
    pub high_severity: u32,
    pub medium_severity: u32,
    pub low_severity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationReport {
    pub recommendations: Vec<RecommendationItem>,
    pub detected_misconception_count: u32,
    pub categories: Vec<Category>,
    pub summary: RemediationSummary,
}

/// Full result of a remediation run. Persisting `new_labels` back onto the
/// attempt is a separate step so the detection itself stays pure.
#[derive(Debug, Clone)]
pub struct RemediationOutcome {
    pub report: RemediationReport,
    pub detections: Vec<DetectedMisconception>,
    pub new_labels: Vec<String>,
}
