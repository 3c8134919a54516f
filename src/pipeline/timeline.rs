//! Timeline status resolver — "what is happening at time T?"
//!
//! A pure, stateless query over the reconciled events: nothing is cached
//! between calls, so a UI scrubbing back and forth over the timeline can
//! resolve any instant in any order.
//!
//! Status detection is an ordered keyword table over the active events'
//! descriptions; the table order *is* the precedence (an equipment
//! breakdown outranks concurrent cargo work, weather outranks a meal
//! break, and so on).

use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use super::category::EventCategory;
use super::interval::merge_runs;
use super::types::ReconciledEvent;

/// Operational status of the port call at a queried instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Breakdown,
    RainDelay,
    MealBreak,
    Working,
    Inspection,
    Survey,
    Stopped,
    Completed,
    Departed,
    /// No active events at the queried instant.
    Idle,
}

struct StatusRule {
    regex: Regex,
    status: OperationStatus,
}

/// Keyword → status rules in precedence order; first match wins.
static STATUS_RULES: LazyLock<Vec<StatusRule>> = LazyLock::new(|| {
    vec![
        StatusRule {
            regex: Regex::new(r"breakdown|mechanical|engine").unwrap(),
            status: OperationStatus::Breakdown,
        },
        StatusRule {
            regex: Regex::new(r"rain|weather|storm").unwrap(),
            status: OperationStatus::RainDelay,
        },
        StatusRule {
            regex: Regex::new(r"meal|lunch|breakfast|dinner|tea").unwrap(),
            status: OperationStatus::MealBreak,
        },
        StatusRule {
            regex: Regex::new(r"work|loading|discharge|unload|cargo").unwrap(),
            status: OperationStatus::Working,
        },
        StatusRule {
            regex: Regex::new(r"inspection|formalities|custom|immigration").unwrap(),
            status: OperationStatus::Inspection,
        },
        StatusRule {
            regex: Regex::new(r"survey").unwrap(),
            status: OperationStatus::Survey,
        },
        StatusRule {
            regex: Regex::new(r"stop|stoppage|waiting|idle|delay").unwrap(),
            status: OperationStatus::Stopped,
        },
        StatusRule {
            regex: Regex::new(r"completed|complete|finished|done").unwrap(),
            status: OperationStatus::Completed,
        },
        StatusRule {
            regex: Regex::new(r"departed|sailing|sailed|etd").unwrap(),
            status: OperationStatus::Departed,
        },
    ]
});

/// Answer to a point-in-time query.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineStatus {
    pub active_events: Vec<ReconciledEvent>,
    pub status: OperationStatus,
    pub work_progress_percent: f64,
}

/// Resolve the operational picture at instant `at`.
///
/// An event is active under half-open semantics: `start <= at < end`.
/// Events with a start but no end are assumed to run for
/// `fallback_duration` *for this query only* — the fallback never feeds
/// into any duration total.
pub fn status_at(
    events: &[ReconciledEvent],
    at: NaiveDateTime,
    fallback_duration: Duration,
) -> TimelineStatus {
    let active_events: Vec<ReconciledEvent> = events
        .iter()
        .filter(|event| {
            let Some(start) = event.start else {
                return false;
            };
            let end = event.end.unwrap_or(start + fallback_duration);
            start <= at && at < end
        })
        .cloned()
        .collect();

    TimelineStatus {
        status: detect_status(&active_events),
        work_progress_percent: work_progress_percent(events, at),
        active_events,
    }
}

/// First matching rule over the joined active descriptions wins.
fn detect_status(active_events: &[ReconciledEvent]) -> OperationStatus {
    if active_events.is_empty() {
        return OperationStatus::Idle;
    }
    let text = active_events
        .iter()
        .map(|event| event.description.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    for rule in STATUS_RULES.iter() {
        if rule.regex.is_match(&text) {
            return rule.status;
        }
    }
    OperationStatus::Idle
}

/// Productive union-duration elapsed strictly before `at`, as a share of
/// the productive union total. Only events with resolved intervals count;
/// the no-end fallback plays no part here.
fn work_progress_percent(events: &[ReconciledEvent], at: NaiveDateTime) -> f64 {
    let spans: Vec<(NaiveDateTime, NaiveDateTime)> = events
        .iter()
        .filter(|event| event.category == EventCategory::Productive)
        .filter_map(|event| event.start.zip(event.end))
        .collect();

    let runs = merge_runs(spans);
    let total: i64 = runs.iter().map(|(start, end)| (*end - *start).num_minutes()).sum();
    if total == 0 {
        return 0.0;
    }

    let completed: i64 = runs
        .iter()
        .map(|(start, end)| {
            let capped_end = at.min(*end);
            (capped_end - *start).num_minutes().max(0)
        })
        .sum();

    100.0 * completed as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn event(description: &str, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> ReconciledEvent {
        ReconciledEvent {
            id: Uuid::new_v4(),
            rank: 0,
            description: description.to_string(),
            category: crate::pipeline::category::categorize(description),
            start,
            end,
            duration_minutes: start
                .zip(end)
                .map(|(s, e)| (e - s).num_minutes()),
            efficiency_rate: None,
            source_document: Some(1),
        }
    }

    fn one_hour() -> Duration {
        Duration::hours(1)
    }

    #[test]
    fn idle_when_nothing_is_active() {
        let events = vec![event("Full Work", Some(at(12, 0, 0)), Some(at(12, 4, 0)))];
        let result = status_at(&events, at(12, 10, 0), one_hour());
        assert!(result.active_events.is_empty());
        assert_eq!(result.status, OperationStatus::Idle);
    }

    #[test]
    fn membership_is_half_open() {
        let events = vec![event("Full Work", Some(at(12, 0, 0)), Some(at(12, 4, 0)))];
        assert_eq!(
            status_at(&events, at(12, 0, 0), one_hour()).active_events.len(),
            1
        );
        // The end instant itself is outside the interval.
        assert!(status_at(&events, at(12, 4, 0), one_hour())
            .active_events
            .is_empty());
    }

    #[test]
    fn endless_event_gets_the_fallback_window() {
        let events = vec![event("Berthed", Some(at(12, 8, 0)), None)];
        assert_eq!(
            status_at(&events, at(12, 8, 30), one_hour()).active_events.len(),
            1
        );
        assert!(status_at(&events, at(12, 9, 0), one_hour())
            .active_events
            .is_empty());
    }

    #[test]
    fn breakdown_outranks_concurrent_work() {
        let events = vec![
            event("Full Work", Some(at(12, 0, 0)), Some(at(12, 8, 0))),
            event("Conveyor breakdown", Some(at(12, 2, 0)), Some(at(12, 3, 0))),
        ];
        let result = status_at(&events, at(12, 2, 30), one_hour());
        assert_eq!(result.active_events.len(), 2);
        assert_eq!(result.status, OperationStatus::Breakdown);
    }

    #[test]
    fn weather_outranks_meal_break() {
        let events = vec![
            event("Rain stoppage", Some(at(12, 0, 0)), Some(at(12, 2, 0))),
            event("Meal break", Some(at(12, 0, 0)), Some(at(12, 2, 0))),
        ];
        let result = status_at(&events, at(12, 1, 0), one_hour());
        assert_eq!(result.status, OperationStatus::RainDelay);
    }

    #[test]
    fn survey_detected_when_nothing_ranks_higher() {
        let events = vec![event("Draft survey", Some(at(12, 0, 0)), Some(at(12, 1, 0)))];
        let result = status_at(&events, at(12, 0, 30), one_hour());
        assert_eq!(result.status, OperationStatus::Survey);
    }

    #[test]
    fn departure_is_lowest_ranked_keyword() {
        let events = vec![event("Vessel sailed", Some(at(14, 0, 0)), Some(at(14, 1, 0)))];
        let result = status_at(&events, at(14, 0, 30), one_hour());
        assert_eq!(result.status, OperationStatus::Departed);
    }

    #[test]
    fn progress_is_zero_before_work_starts() {
        let events = vec![event("Full Work", Some(at(12, 8, 0)), Some(at(12, 12, 0)))];
        let result = status_at(&events, at(12, 0, 0), one_hour());
        assert_eq!(result.work_progress_percent, 0.0);
    }

    #[test]
    fn progress_is_complete_after_the_last_run() {
        let events = vec![event("Full Work", Some(at(12, 8, 0)), Some(at(12, 12, 0)))];
        let result = status_at(&events, at(13, 0, 0), one_hour());
        assert!((result.work_progress_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn progress_uses_union_over_overlapping_work() {
        // Two overlapping productive periods: union is 6 h, and 3 h have
        // elapsed at 03:00.
        let events = vec![
            event("Full Work", Some(at(12, 0, 0)), Some(at(12, 4, 0))),
            event("Loading cargo", Some(at(12, 2, 0)), Some(at(12, 6, 0))),
        ];
        let result = status_at(&events, at(12, 3, 0), one_hour());
        assert!((result.work_progress_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_duration_never_feeds_progress() {
        // An endless productive event contributes nothing to progress math.
        let events = vec![
            event("Full Work", Some(at(12, 0, 0)), Some(at(12, 4, 0))),
            event("Loading commenced", Some(at(12, 0, 0)), None),
        ];
        let midway = status_at(&events, at(12, 2, 0), one_hour());
        assert!((midway.work_progress_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn queries_are_stateless_and_repeatable() {
        let events = vec![
            event("Full Work", Some(at(12, 0, 0)), Some(at(12, 4, 0))),
            event("Rain", Some(at(12, 4, 0)), Some(at(12, 6, 0))),
        ];
        let instants = [at(12, 1, 0), at(12, 5, 0), at(12, 1, 0)];
        let first = status_at(&events, instants[0], one_hour());
        let second = status_at(&events, instants[1], one_hour());
        let repeat = status_at(&events, instants[2], one_hour());
        assert_eq!(first.status, OperationStatus::Working);
        assert_eq!(second.status, OperationStatus::RainDelay);
        assert_eq!(repeat.status, first.status);
        assert_eq!(repeat.work_progress_percent, first.work_progress_percent);
    }
}
