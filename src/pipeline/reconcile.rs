//! Event reconciliation — dedup, union durations, canonical ordering.
//!
//! The same physical timeline is often described redundantly across the
//! input documents (an owner's SOF and an agent's SOF covering the same
//! port call), so raw events go through two duplicate filters before any
//! arithmetic:
//!
//! 1. Exact duplicates — normalized description, date, start, and end all
//!    equal — collapse to the first occurrence.
//! 2. Near duplicates — same controlled-vocabulary category, intervals
//!    overlapping beyond the configured fraction of the shorter one — keep
//!    the copy from the earlier-processed document.
//!
//! Both filters run greedily against the kept set, so deduplication is
//! idempotent: no two survivors can still match each other.
//!
//! Duration totals are interval unions (see `interval`), never naive sums;
//! events without a resolvable interval are kept for display but excluded
//! from all math.

use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime};

use crate::config::PipelineConfig;

use super::category::{categorize, normalize_description, EventCategory};
use super::interval::{resolve_bounds, union_minutes, TimeInterval};
use super::types::{
    CategoryTotals, DuplicateReason, DuplicateRemoval, RawEvent, ReconciledEvent,
};

/// Output of one reconciliation pass.
#[derive(Debug)]
pub struct ReconcileResult {
    pub events: Vec<ReconciledEvent>,
    pub totals: CategoryTotals,
    pub duplicates_removed: Vec<DuplicateRemoval>,
    /// Events without a resolvable `[start, end)` interval.
    pub quarantined: u32,
}

/// Reconcile raw events into the canonical timeline and its totals.
pub fn reconcile(events: Vec<RawEvent>, config: &PipelineConfig) -> ReconcileResult {
    let (kept, duplicates_removed) = dedup(events, config.near_duplicate_overlap);

    let mut reconciled: Vec<ReconciledEvent> = kept.iter().map(promote).collect();
    let quarantined = reconciled.iter().filter(|e| e.end.is_none() || e.start.is_none()).count() as u32;

    // Start ascending; events without a start sort last. The sort is
    // stable, so ties keep their extraction order.
    reconciled.sort_by_key(|event| match event.start {
        Some(start) => (0, start),
        None => (1, NaiveDateTime::MIN),
    });
    for (rank, event) in reconciled.iter_mut().enumerate() {
        event.rank = rank;
    }

    let totals = compute_totals(&reconciled);

    tracing::info!(
        events = reconciled.len(),
        duplicates = duplicates_removed.len(),
        quarantined,
        overall_minutes = totals.overall_union_minutes,
        "Reconciliation complete"
    );

    ReconcileResult {
        events: reconciled,
        totals,
        duplicates_removed,
        quarantined,
    }
}

/// Comparison key for exact-duplicate detection.
type ExactKey = (String, Option<chrono::NaiveDate>, Option<NaiveTime>, Option<NaiveTime>, bool);

fn exact_key(event: &RawEvent) -> ExactKey {
    (
        normalize_description(&event.description),
        event.date,
        event.start_time,
        event.end_time,
        event.ends_at_midnight,
    )
}

/// Resolve an event into a concrete interval, if its fields allow one.
fn event_interval(event: &RawEvent) -> Option<TimeInterval> {
    let (start, end) = resolve_bounds(
        event.date?,
        event.start_time?,
        event.end_time,
        event.ends_at_midnight,
    )?;
    Some(TimeInterval {
        start,
        end,
        category: categorize(&event.description),
        source_event_id: event.id,
    })
}

/// Remove exact and near duplicates. Events are processed in source
/// document order (extraction order within a document, unattributed events
/// last), so the earlier document's copy always wins.
///
/// Idempotent: running the filter on its own output removes nothing.
pub fn dedup(
    mut events: Vec<RawEvent>,
    overlap_threshold: f64,
) -> (Vec<RawEvent>, Vec<DuplicateRemoval>) {
    events.sort_by_key(|e| (e.source_document.unwrap_or(usize::MAX), e.extraction_order));

    let mut kept: Vec<RawEvent> = Vec::with_capacity(events.len());
    let mut kept_intervals: Vec<Option<TimeInterval>> = Vec::new();
    let mut seen_exact: HashMap<ExactKey, uuid::Uuid> = HashMap::new();
    let mut removed = Vec::new();

    for event in events {
        let key = exact_key(&event);
        if let Some(&kept_id) = seen_exact.get(&key) {
            removed.push(DuplicateRemoval {
                removed_id: event.id,
                kept_id,
                description: event.description.clone(),
                reason: DuplicateReason::Exact,
            });
            continue;
        }

        let interval = event_interval(&event);

        let near_match = interval
            .as_ref()
            .filter(|candidate| candidate.category.is_controlled())
            .and_then(|candidate| {
                kept_intervals
                    .iter()
                    .zip(&kept)
                    .find_map(|(kept_interval, kept_event)| {
                        let kept_interval = kept_interval.as_ref()?;
                        if kept_interval.category != candidate.category {
                            return None;
                        }
                        let shorter = candidate
                            .duration_minutes()
                            .min(kept_interval.duration_minutes());
                        if shorter == 0 {
                            return None;
                        }
                        let fraction =
                            candidate.overlap_minutes(kept_interval) as f64 / shorter as f64;
                        (fraction > overlap_threshold).then_some((kept_event.id, fraction))
                    })
            });

        if let Some((kept_id, fraction)) = near_match {
            tracing::debug!(
                description = %event.description,
                fraction,
                "Dropping near-duplicate event"
            );
            removed.push(DuplicateRemoval {
                removed_id: event.id,
                kept_id,
                description: event.description.clone(),
                reason: DuplicateReason::Overlap { fraction },
            });
            continue;
        }

        seen_exact.insert(key, event.id);
        kept_intervals.push(interval);
        kept.push(event);
    }

    (kept, removed)
}

/// Promote a surviving raw event to its canonical form.
fn promote(event: &RawEvent) -> ReconciledEvent {
    let start = event
        .date
        .zip(event.start_time)
        .map(|(date, time)| date.and_time(time));
    let interval = event_interval(event);

    ReconciledEvent {
        id: event.id,
        rank: 0, // assigned after sorting
        description: event.description.clone(),
        category: categorize(&event.description),
        start,
        end: interval.as_ref().map(|i| i.end),
        duration_minutes: interval
            .as_ref()
            .map(TimeInterval::duration_minutes)
            .or(event.duration_minutes),
        efficiency_rate: event.efficiency_rate,
        source_document: event.source_document,
    }
}

/// Union-duration totals per category, overall coverage, and efficiency.
fn compute_totals(events: &[ReconciledEvent]) -> CategoryTotals {
    let mut spans_by_category: HashMap<EventCategory, Vec<(NaiveDateTime, NaiveDateTime)>> =
        HashMap::new();
    let mut all_spans = Vec::new();

    for event in events {
        if let (Some(start), Some(end)) = (event.start, event.end) {
            spans_by_category
                .entry(event.category)
                .or_default()
                .push((start, end));
            all_spans.push((start, end));
        }
    }

    let union_minutes_by_category: std::collections::BTreeMap<_, _> = spans_by_category
        .into_iter()
        .map(|(category, spans)| (category, union_minutes(spans)))
        .collect();

    let overall_union_minutes = union_minutes(all_spans);
    let productive_minutes = union_minutes_by_category
        .get(&EventCategory::Productive)
        .copied()
        .unwrap_or(0);

    let overall_efficiency_percent = if overall_union_minutes > 0 {
        100.0 * productive_minutes as f64 / overall_union_minutes as f64
    } else {
        0.0
    };

    CategoryTotals {
        union_minutes_by_category,
        overall_union_minutes,
        overall_efficiency_percent,
    }
}
