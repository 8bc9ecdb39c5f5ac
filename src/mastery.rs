//! Per-topic mastery estimation.
//!
//! Blends recency-weighted quiz performance with self-reported confidence
//! and classifies the recent score trend. Pure: same attempts in, same
//! stat out, O(N) in the number of attempts.

use tracing::warn;

use crate::config::MasteryConfig;
use crate::types::{AttemptRecord, TopicStat, Trend};

/// Compute the mastery stat for one topic from its attempt history, oldest
/// attempt first.
///
/// Records with a non-finite score are rejected individually (the rest of
/// the history still counts); finite scores are clamped into [0, 100].
pub fn compute_mastery(topic: &str, attempts: &[AttemptRecord], config: &MasteryConfig) -> TopicStat {
    let valid: Vec<&AttemptRecord> = attempts
        .iter()
        .filter(|attempt| {
            if attempt.score.is_finite() {
                true
            } else {
                warn!(topic, "rejecting attempt record with non-finite score");
                false
            }
        })
        .collect();

    if valid.is_empty() {
        return TopicStat {
            topic: topic.to_string(),
            mastery: 0,
            attempt_count: 0,
            average_score: 0,
            recent_trend: Trend::New,
            confidence: 0,
            last_attempted: None,
        };
    }

    let scores: Vec<f64> = valid.iter().map(|a| a.score.clamp(0.0, 100.0)).collect();
    let count = scores.len();
    let average_score = scores.iter().sum::<f64>() / count as f64;

    let recent_trend = classify_trend(&scores, config);

    // Recency weighting: attempt i carries weight (i+1)/N, so the weighted
    // sum must be divided by the weight sum rather than by N.
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, score) in scores.iter().enumerate() {
        let weight = (i + 1) as f64 / count as f64;
        weighted_sum += score * weight;
        weight_sum += weight;
    }
    let weighted_score = weighted_sum / weight_sum;

    let avg_confidence = valid
        .iter()
        .map(|a| a.confidence_level.map_or(config.default_confidence, f64::from))
        .sum::<f64>()
        / count as f64;

    let mastery = weighted_score * config.performance_weight
        + (avg_confidence / 5.0) * 100.0 * config.confidence_weight;

    TopicStat {
        topic: topic.to_string(),
        mastery: mastery.round().clamp(0.0, 100.0) as i32,
        attempt_count: count as u32,
        average_score: average_score.round().clamp(0.0, 100.0) as i32,
        recent_trend,
        confidence: (avg_confidence * 20.0).round().clamp(0.0, 100.0) as i32,
        last_attempted: valid.last().map(|a| a.completed_at),
    }
}

/// Compare the mean of the last `trend_window` scores against the mean of
/// the first `trend_window`. A single attempt yields identical windows and
/// therefore `stable`; the trend needs two distinct windows to diverge.
fn classify_trend(scores: &[f64], config: &MasteryConfig) -> Trend {
    let window = config.trend_window.max(1);
    let recent: &[f64] = &scores[scores.len().saturating_sub(window)..];
    let earlier: &[f64] = &scores[..window.min(scores.len())];

    let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
    let earlier_avg = earlier.iter().sum::<f64>() / earlier.len() as f64;

    if recent_avg > earlier_avg + config.trend_margin {
        Trend::Improving
    } else if recent_avg < earlier_avg - config.trend_margin {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn attempts_with_scores(scores: &[f64]) -> Vec<AttemptRecord> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| AttemptRecord {
                topic: "Acids and Bases".to_string(),
                score,
                confidence_level: None,
                completed_at: start + Duration::days(i as i64),
            })
            .collect()
    }

    fn config() -> MasteryConfig {
        MasteryConfig::default()
    }

    #[test]
    fn test_empty_history_yields_new_topic_sentinel() {
        let stat = compute_mastery("Bonding", &[], &config());
        assert_eq!(stat.mastery, 0);
        assert_eq!(stat.attempt_count, 0);
        assert_eq!(stat.average_score, 0);
        assert_eq!(stat.recent_trend, Trend::New);
        assert_eq!(stat.confidence, 0);
        assert!(stat.last_attempted.is_none());
    }

    #[test]
    fn test_high_scores_with_full_confidence_give_high_mastery() {
        let mut attempts = attempts_with_scores(&[90.0, 92.0, 95.0]);
        for attempt in &mut attempts {
            attempt.confidence_level = Some(5);
        }
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert!(stat.mastery > 85, "expected high mastery, got {}", stat.mastery);
        assert_eq!(stat.confidence, 100);
    }

    #[test]
    fn test_low_scores_give_low_mastery() {
        let mut attempts = attempts_with_scores(&[20.0, 25.0, 22.0]);
        for attempt in &mut attempts {
            attempt.confidence_level = Some(1);
        }
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert!(stat.mastery < 35, "expected low mastery, got {}", stat.mastery);
    }

    #[test]
    fn test_rising_scores_classify_as_improving() {
        let attempts = attempts_with_scores(&[40.0, 40.0, 40.0, 90.0, 90.0, 90.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.recent_trend, Trend::Improving);
    }

    #[test]
    fn test_falling_scores_classify_as_declining() {
        let attempts = attempts_with_scores(&[90.0, 90.0, 90.0, 40.0, 40.0, 40.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.recent_trend, Trend::Declining);
    }

    #[test]
    fn test_flat_scores_classify_as_stable() {
        let attempts = attempts_with_scores(&[70.0, 70.0, 70.0, 70.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.recent_trend, Trend::Stable);
    }

    #[test]
    fn test_single_attempt_is_stable_not_new() {
        let attempts = attempts_with_scores(&[85.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.recent_trend, Trend::Stable);
        assert_eq!(stat.attempt_count, 1);
    }

    #[test]
    fn test_recency_weighting_favors_later_attempts() {
        let late_strong = compute_mastery("t", &attempts_with_scores(&[20.0, 50.0, 90.0]), &config());
        let late_weak = compute_mastery("t", &attempts_with_scores(&[90.0, 50.0, 20.0]), &config());
        assert!(
            late_strong.mastery > late_weak.mastery,
            "recent scores must dominate: {} vs {}",
            late_strong.mastery,
            late_weak.mastery
        );
    }

    #[test]
    fn test_missing_confidence_defaults_to_midpoint() {
        let attempts = attempts_with_scores(&[80.0, 80.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.confidence, 60);
    }

    #[test]
    fn test_non_finite_scores_are_skipped_not_fatal() {
        let mut attempts = attempts_with_scores(&[80.0, 80.0]);
        attempts[0].score = f64::NAN;
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.attempt_count, 1);
        assert_eq!(stat.average_score, 80);
        assert!(stat.mastery >= 0 && stat.mastery <= 100);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let attempts = attempts_with_scores(&[250.0, 250.0, 250.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert!(stat.mastery <= 100);
        assert_eq!(stat.average_score, 100);
    }

    #[test]
    fn test_last_attempted_is_newest_record() {
        let attempts = attempts_with_scores(&[60.0, 70.0, 80.0]);
        let stat = compute_mastery("Acids and Bases", &attempts, &config());
        assert_eq!(stat.last_attempted, Some(attempts[2].completed_at));
    }
}
