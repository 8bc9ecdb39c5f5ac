use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryConfig {
    /// Weight of the recency-weighted quiz score in the mastery blend.
    pub performance_weight: f64,
    /// Weight of the self-reported confidence term in the mastery blend.
    pub confidence_weight: f64,
    /// Margin (score points) the recent window must diverge from the earlier
    /// window before the trend leaves `stable`.
    pub trend_margin: f64,
    /// Number of attempts in each trend comparison window.
    pub trend_window: usize,
    /// Confidence assumed for attempts without a self-report (1-5 scale).
    pub default_confidence: f64,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            performance_weight: 0.6,
            confidence_weight: 0.4,
            trend_margin: 5.0,
            trend_window: 3,
            default_confidence: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Mastery below this marks a topic weak.
    pub weak_threshold: i32,
    /// Mastery at or above this marks a topic strong.
    pub strong_threshold: i32,
    /// Emerging topics sit in [emerging_floor, strong_threshold) with at most
    /// `emerging_max_attempts` attempts.
    pub emerging_floor: i32,
    pub emerging_max_attempts: u32,
    pub max_weak: usize,
    pub max_strong: usize,
    pub max_emerging: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            weak_threshold: 60,
            strong_threshold: 80,
            emerging_floor: 50,
            emerging_max_attempts: 2,
            max_weak: 5,
            max_strong: 3,
            max_emerging: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Hard cap on items in a weekly path.
    pub weekly_cap: usize,
    /// Catalog items fetched per weak topic.
    pub items_per_weak_topic: usize,
    /// Catalog items fetched per emerging topic.
    pub items_per_emerging_topic: usize,
    /// Advanced-difficulty items fetched across all strong topics combined.
    pub advanced_items: usize,
    pub emerging_priority_score: i32,
    pub advanced_priority_score: i32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            weekly_cap: 7,
            items_per_weak_topic: 2,
            items_per_emerging_topic: 1,
            advanced_items: 2,
            emerging_priority_score: 70,
            advanced_priority_score: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationConfig {
    /// Final recommendation list cap.
    pub max_recommendations: usize,
    /// Confidence attached to stored-only misconception labels.
    pub stored_label_confidence: f64,
    /// Confidence attached to keyword-fallback recommendations.
    pub keyword_confidence: f64,
    /// Confidence attached to topic-name-fallback recommendations.
    pub topic_confidence: f64,
    /// Catalog items consulted for generic fallback resources.
    pub catalog_items: usize,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            stored_label_confidence: 0.8,
            keyword_confidence: 0.6,
            topic_confidence: 0.5,
            catalog_items: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mastery: MasteryConfig,
    pub focus: FocusConfig,
    pub path: PathConfig,
    pub remediation: RemediationConfig,
}

impl EngineConfig {
    /// Defaults, with the caps overridable from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(cap) = env_usize("ENGINE_WEEKLY_CAP") {
            config.path.weekly_cap = cap.clamp(1, 20);
        }
        if let Some(cap) = env_usize("ENGINE_MAX_RECOMMENDATIONS") {
            config.remediation.max_recommendations = cap.clamp(1, 50);
        }

        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.focus.weak_threshold, 60);
        assert_eq!(config.focus.strong_threshold, 80);
        assert_eq!(config.path.weekly_cap, 7);
        assert_eq!(config.remediation.max_recommendations, 10);
    }

    #[test]
    fn test_mastery_weights_sum_to_one() {
        let config = MasteryConfig::default();
        assert!((config.performance_weight + config.confidence_weight - 1.0).abs() < f64::EPSILON);
    }
}
