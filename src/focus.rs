//! Partitioning of topic stats into weak, strong, and emerging focus areas.
//!
//! Each filter is applied independently over the full input; the filters are
//! near-disjoint by construction but a topic appearing in more than one
//! partition is legal and must not be deduplicated away.

use std::cmp::Ordering;

use crate::config::FocusConfig;
use crate::types::{FocusPartition, TopicStat, Trend};

pub fn classify_focus(stats: &[TopicStat], config: &FocusConfig) -> FocusPartition {
    let mut weak_areas: Vec<TopicStat> = stats
        .iter()
        .filter(|s| s.mastery < config.weak_threshold || s.recent_trend == Trend::Declining)
        .cloned()
        .collect();
    // Declining topics first, then the largest mastery gap; at equal mastery
    // more attempts means more evidence of a real problem.
    weak_areas.sort_by(|a, b| {
        declining_first(a, b)
            .then_with(|| a.mastery.cmp(&b.mastery))
            .then_with(|| b.attempt_count.cmp(&a.attempt_count))
    });
    weak_areas.truncate(config.max_weak);

    let mut strong_areas: Vec<TopicStat> = stats
        .iter()
        .filter(|s| s.mastery >= config.strong_threshold)
        .cloned()
        .collect();
    strong_areas.sort_by(|a, b| b.mastery.cmp(&a.mastery));
    strong_areas.truncate(config.max_strong);

    let mut emerging_areas: Vec<TopicStat> = stats
        .iter()
        .filter(|s| {
            s.attempt_count <= config.emerging_max_attempts
                && s.mastery >= config.emerging_floor
                && s.mastery < config.strong_threshold
        })
        .cloned()
        .collect();
    emerging_areas.sort_by(|a, b| b.mastery.cmp(&a.mastery));
    emerging_areas.truncate(config.max_emerging);

    FocusPartition {
        weak_areas,
        strong_areas,
        emerging_areas,
    }
}

fn declining_first(a: &TopicStat, b: &TopicStat) -> Ordering {
    let a_declining = a.recent_trend == Trend::Declining;
    let b_declining = b.recent_trend == Trend::Declining;
    b_declining.cmp(&a_declining)
}
