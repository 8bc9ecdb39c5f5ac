//! Weekly study-plan generation.
//!
//! Orchestrates the mastery calculator and focus classifier over a learner's
//! attempt history, then materializes a bounded, ranked plan from the content
//! catalog. Learners with no history get a beginner path without touching the
//! mastery pipeline at all.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::catalog::ContentCatalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::focus::classify_focus;
use crate::mastery::compute_mastery;
use crate::types::{
    AttemptRecord, ContentItem, Difficulty, PathItem, PathStatistics, PathType, Priority,
    TopicStat, Trend, WeeklyPath,
};

/// Bucket for attempts whose topic is missing, so no attempt is silently
/// dropped from the plan.
const UNKNOWN_TOPIC: &str = "Unknown";

const STEP_FOUNDATION: &str = "Step 1: Foundation";
const STEP_REINFORCEMENT: &str = "Step 2: Reinforcement";
const STEP_ADVANCED: &str = "Step 3: Advanced";

pub async fn generate_path(
    learner_id: &str,
    attempts: &[AttemptRecord],
    catalog: &dyn ContentCatalog,
    config: &EngineConfig,
) -> Result<WeeklyPath, EngineError> {
    if attempts.is_empty() {
        return beginner_path(learner_id, catalog, config).await;
    }
    personalized_path(learner_id, attempts, catalog, config).await
}

async fn beginner_path(
    learner_id: &str,
    catalog: &dyn ContentCatalog,
    config: &EngineConfig,
) -> Result<WeeklyPath, EngineError> {
    let items = catalog
        .by_difficulty(Difficulty::Beginner, config.path.weekly_cap)
        .await
        .map_err(|err| {
            warn!(learner_id, error = %err, "catalog lookup failed for beginner path");
            EngineError::from(err)
        })?;

    let weekly_topics: Vec<PathItem> = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| PathItem {
            rank: idx as u32 + 1,
            title: item.title,
            topic: item.topic,
            difficulty: item.difficulty,
            estimated_time: item.estimated_time,
            mastery_level: 0,
            recent_trend: None,
            priority: Priority::High,
            priority_score: None,
            reason: "Foundational concept for chemistry mastery".to_string(),
            recommended_action: "Start learning".to_string(),
            step: None,
        })
        .collect();

    info!(learner_id, items = weekly_topics.len(), "generated beginner path");

    Ok(WeeklyPath {
        learner_id: learner_id.to_string(),
        generated_at: Utc::now(),
        path_type: PathType::BeginnerPath,
        message: "Welcome! Start with these foundational concepts to build your chemistry knowledge."
            .to_string(),
        weekly_topics,
        statistics: None,
        overall_recommendation:
            "Begin with Beginner-level concepts to establish a strong foundation.".to_string(),
        next_steps: vec![
            "Complete at least 3 quizzes to get personalized recommendations".to_string(),
            "Focus on understanding core concepts".to_string(),
        ],
        topic_details: Vec::new(),
    })
}

async fn personalized_path(
    learner_id: &str,
    attempts: &[AttemptRecord],
    catalog: &dyn ContentCatalog,
    config: &EngineConfig,
) -> Result<WeeklyPath, EngineError> {
    let stats = topic_stats(attempts, config);
    let partition = classify_focus(&stats, &config.focus);

    let mut recommended: Vec<PathItem> = Vec::new();

    // Weak topics come in classifier order: declining trend first, then the
    // largest mastery gap.
    for weak in &partition.weak_areas {
        let items = catalog
            .by_topic(&weak.topic, None, config.path.items_per_weak_topic)
            .await
            .map_err(|err| catalog_failure(learner_id, &weak.topic, err))?;
        for item in items {
            recommended.push(path_item(
                &item,
                weak,
                Priority::High,
                Some(100 - weak.mastery),
                format!(
                    "Critical: Strengthen weak area \"{}\" ({}% mastery). This is affecting your overall performance.",
                    weak.topic, weak.mastery
                ),
                "Focus here first",
                STEP_FOUNDATION,
            ));
        }
    }

    for emerging in &partition.emerging_areas {
        let items = catalog
            .by_topic(&emerging.topic, None, config.path.items_per_emerging_topic)
            .await
            .map_err(|err| catalog_failure(learner_id, &emerging.topic, err))?;
        for item in items {
            recommended.push(path_item(
                &item,
                emerging,
                Priority::Medium,
                Some(config.path.emerging_priority_score),
                format!(
                    "Building: Continue progress on \"{}\" ({}% mastery). You're making good progress here!",
                    emerging.topic, emerging.mastery
                ),
                "Continue learning",
                STEP_REINFORCEMENT,
            ));
        }
    }

    // Advanced items are capped across all strong topics combined, not per
    // topic. Strong topics are recomputed from the full stat list so the
    // classifier's top-3 cap does not hide any of them.
    let mut advanced_budget = config.path.advanced_items;
    for stat in stats.iter().filter(|s| s.mastery >= config.focus.strong_threshold) {
        if advanced_budget == 0 {
            break;
        }
        let items = catalog
            .by_topic(&stat.topic, Some(Difficulty::Advanced), advanced_budget)
            .await
            .map_err(|err| catalog_failure(learner_id, &stat.topic, err))?;
        for item in items {
            advanced_budget -= 1;
            recommended.push(path_item(
                &item,
                stat,
                Priority::Low,
                Some(config.path.advanced_priority_score),
                format!(
                    "Challenge: Master advanced topics in your strong area \"{}\". Time to deepen your expertise!",
                    stat.topic
                ),
                "Expand mastery",
                STEP_ADVANCED,
            ));
        }
    }

    recommended.truncate(config.path.weekly_cap);
    for (idx, item) in recommended.iter_mut().enumerate() {
        item.rank = idx as u32 + 1;
    }

    let statistics = build_statistics(attempts.len(), &stats, &partition);
    let overall_recommendation = overall_recommendation(statistics.average_mastery).to_string();
    let next_steps = next_steps(&partition, &statistics, attempts.len());

    info!(
        learner_id,
        topics = stats.len(),
        items = recommended.len(),
        average_mastery = statistics.average_mastery,
        "generated personalized path"
    );

    Ok(WeeklyPath {
        learner_id: learner_id.to_string(),
        generated_at: Utc::now(),
        path_type: PathType::PersonalizedPath,
        message: "Your personalized learning roadmap based on your quiz history and mastery levels."
            .to_string(),
        weekly_topics: recommended,
        statistics: Some(statistics),
        overall_recommendation,
        next_steps,
        topic_details: stats,
    })
}

/// Group attempts by topic in first-seen order and compute one stat per
/// topic. Attempts without a topic go into the `Unknown` bucket.
fn topic_stats(attempts: &[AttemptRecord], config: &EngineConfig) -> Vec<TopicStat> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<AttemptRecord>> = HashMap::new();

    for attempt in attempts {
        let topic = if attempt.topic.trim().is_empty() {
            UNKNOWN_TOPIC.to_string()
        } else {
            attempt.topic.clone()
        };
        let group = groups.entry(topic.clone()).or_insert_with(|| {
            order.push(topic);
            Vec::new()
        });
        group.push(attempt.clone());
    }

    order
        .iter()
        .map(|topic| compute_mastery(topic, &groups[topic], &config.mastery))
        .collect()
}

fn path_item(
    item: &ContentItem,
    stat: &TopicStat,
    priority: Priority,
    priority_score: Option<i32>,
    reason: String,
    action: &str,
    step: &str,
) -> PathItem {
    PathItem {
        rank: 0,
        title: item.title.clone(),
        topic: stat.topic.clone(),
        difficulty: item.difficulty,
        estimated_time: item.estimated_time,
        mastery_level: stat.mastery,
        recent_trend: Some(stat.recent_trend),
        priority,
        priority_score,
        reason,
        recommended_action: action.to_string(),
        step: Some(step.to_string()),
    }
}

fn build_statistics(
    total_attempts: usize,
    stats: &[TopicStat],
    partition: &crate::types::FocusPartition,
) -> PathStatistics {
    let average_mastery = if stats.is_empty() {
        0
    } else {
        (stats.iter().map(|s| s.mastery as f64).sum::<f64>() / stats.len() as f64).round() as i32
    };

    let label = |stat: &TopicStat| format!("{} ({}%)", stat.topic, stat.mastery);

    PathStatistics {
        total_quizzes_taken: total_attempts as u32,
        average_mastery,
        topics_studied: stats.len() as u32,
        improving_topics: stats.iter().filter(|s| s.recent_trend == Trend::Improving).count() as u32,
        declining_topics: stats.iter().filter(|s| s.recent_trend == Trend::Declining).count() as u32,
        strongest_area: partition.strong_areas.first().map_or_else(|| "N/A".to_string(), label),
        weakest_area: partition.weak_areas.first().map_or_else(|| "N/A".to_string(), label),
    }
}

fn overall_recommendation(average_mastery: i32) -> &'static str {
    if average_mastery < 50 {
        "Focus on strengthening foundational concepts. Consistent practice with weak areas will improve your mastery."
    } else if average_mastery < 70 {
        "You're making progress! Continue practicing weak areas and begin exploring advanced topics in your strong areas."
    } else {
        "Excellent progress! You have solid fundamentals. Challenge yourself with advanced topics and help strengthen areas where others struggle."
    }
}

fn next_steps(
    partition: &crate::types::FocusPartition,
    statistics: &PathStatistics,
    total_attempts: usize,
) -> Vec<String> {
    let mut steps = Vec::new();

    if !partition.weak_areas.is_empty() {
        let topics: Vec<&str> = partition.weak_areas.iter().map(|s| s.topic.as_str()).collect();
        steps.push(format!("Focus on improving: {}", topics.join(", ")));
    }

    if statistics.improving_topics > statistics.declining_topics {
        steps.push("Maintain momentum by practicing regularly".to_string());
    } else {
        steps.push("Address declining performance by revisiting recent quizzes".to_string());
    }

    let remaining = (7i64 - total_attempts as i64).max(3);
    steps.push(format!(
        "Complete {remaining} more quizzes to get more accurate recommendations"
    ));

    steps
}

fn catalog_failure(learner_id: &str, topic: &str, err: crate::catalog::CatalogError) -> EngineError {
    warn!(learner_id, topic, error = %err, "catalog lookup failed during path generation");
    EngineError::from(err)
}
