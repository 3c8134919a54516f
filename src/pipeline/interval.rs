//! Time interval construction and union-duration math.
//!
//! Summing event durations naively double-counts time whenever activities
//! run in parallel (a draft survey during cargo work, say). Every duration
//! total in this crate therefore goes through interval merging: sort by
//! start, coalesce anything that overlaps or touches into maximal runs,
//! and sum the runs.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::category::EventCategory;

/// A concrete half-open time span `[start, end)` derived from a validated
/// event. Invariant: `end >= start` (zero-length allowed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub category: EventCategory,
    pub source_event_id: Uuid,
}

impl TimeInterval {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Minutes shared with another interval.
    pub fn overlap_minutes(&self, other: &TimeInterval) -> i64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end - start).num_minutes().max(0)
    }
}

/// Resolve an event's date and times into interval bounds.
///
/// The `24:00` end-of-day sentinel maps to midnight of the following date.
/// Returns `None` when the bounds violate `end >= start` — such events are
/// quarantined by the caller rather than guessed at.
pub fn resolve_bounds(
    date: NaiveDate,
    start: NaiveTime,
    end: Option<NaiveTime>,
    ends_at_midnight: bool,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start_dt = date.and_time(start);
    let end_dt = if ends_at_midnight {
        date.succ_opt()?.and_time(NaiveTime::MIN)
    } else {
        date.and_time(end?)
    };
    (end_dt >= start_dt).then_some((start_dt, end_dt))
}

/// Coalesce spans into maximal non-overlapping runs. Spans that merely
/// touch (`next.start == current.end`) merge as well.
pub fn merge_runs(
    mut spans: Vec<(NaiveDateTime, NaiveDateTime)>,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    spans.sort_by_key(|span| span.0);
    let mut runs: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match runs.last_mut() {
            Some(current) if start <= current.1 => {
                current.1 = current.1.max(end);
            }
            _ => runs.push((start, end)),
        }
    }
    runs
}

/// Total minutes covered by at least one of the spans.
pub fn union_minutes(spans: Vec<(NaiveDateTime, NaiveDateTime)>) -> i64 {
    merge_runs(spans)
        .iter()
        .map(|(start, end)| (*end - *start).num_minutes())
        .sum()
}
