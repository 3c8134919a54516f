//! Domain types flowing through the extraction pipeline.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::EventCategory;

/// An input document: opaque bytes plus the name used for traceability.
/// Position in the batch slice is the document's ordinal index.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// One document's OCR output merged into a single enriched text blob.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub source_index: usize,
    pub name: String,
    pub enriched_text: String,
}

/// An operational event as extracted from the generative-text response.
///
/// Every field except the description has been through per-field
/// validation: a value that failed to parse is `None`, never garbage.
#[derive(Debug, Clone, Serialize)]
pub struct RawEvent {
    pub id: Uuid,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// True when the reported end time was the `24:00` end-of-day sentinel;
    /// the interval then ends at midnight of the following date.
    pub ends_at_midnight: bool,
    /// Duration as reported by the extraction, in minutes.
    pub duration_minutes: Option<i64>,
    /// Laytime counting rate from the source table: 0, 50, or 100 percent.
    pub efficiency_rate: Option<u8>,
    /// Ordinal of the source document within the corpus (1-based, matching
    /// the corpus boundary markers), when the extraction reported one.
    pub source_document: Option<usize>,
    /// Position within the extraction response; dedup and ordering
    /// tie-breaks fall back to this.
    pub extraction_order: usize,
}

/// A raw event promoted to the canonical timeline after reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledEvent {
    pub id: Uuid,
    /// Stable chronological rank within the reconciled set.
    pub rank: usize,
    pub description: String,
    pub category: EventCategory,
    /// Resolved start instant; `None` quarantines the event from all
    /// interval math.
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub efficiency_rate: Option<u8>,
    pub source_document: Option<usize>,
}

/// Union durations per category plus the overall figures.
///
/// All durations are interval-union minutes: parallel activities are
/// counted once, not summed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTotals {
    pub union_minutes_by_category: BTreeMap<EventCategory, i64>,
    /// Wall-clock minutes covered by at least one recorded activity.
    pub overall_union_minutes: i64,
    /// `100 * productive / overall`, or 0 when nothing was recorded.
    pub overall_efficiency_percent: f64,
}

// ──────────────────────────────────────────────
// Analysis summary (pass-through metadata)
// ──────────────────────────────────────────────

/// Narrative analysis returned alongside the events. The pipeline carries
/// this through untouched; only the presentation layer reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub vessel_info: Option<VesselInfo>,
    #[serde(default)]
    pub laytime_details: Option<LaytimeDetails>,
    #[serde(default)]
    pub time_breakdown: TimeBreakdown,
    #[serde(default)]
    pub efficiency_analysis: Option<EfficiencyAnalysis>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VesselInfo {
    #[serde(default)]
    pub vessel_name: Option<String>,
    #[serde(default)]
    pub charter_party_date: Option<String>,
    #[serde(default)]
    pub loading_port: Option<String>,
    #[serde(default)]
    pub cargo: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub charterer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaytimeDetails {
    #[serde(default)]
    pub cargo_quantity: Option<String>,
    #[serde(default)]
    pub loading_rate: Option<String>,
    #[serde(default)]
    pub demurrage_rate: Option<String>,
    #[serde(default)]
    pub despatch_rate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBreakdown {
    #[serde(default = "zero_duration")]
    pub total_time: String,
    #[serde(default = "zero_duration")]
    pub productive_time: String,
    #[serde(default = "zero_duration")]
    pub weather_delays: String,
    #[serde(default = "zero_duration")]
    pub weekend_time: String,
    #[serde(default = "zero_duration")]
    pub breakdown_time: String,
    #[serde(default = "zero_duration")]
    pub other_delays: String,
}

fn zero_duration() -> String {
    "0:00".to_string()
}

impl Default for TimeBreakdown {
    fn default() -> Self {
        Self {
            total_time: zero_duration(),
            productive_time: zero_duration(),
            weather_delays: zero_duration(),
            weekend_time: zero_duration(),
            breakdown_time: zero_duration(),
            other_delays: zero_duration(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EfficiencyAnalysis {
    #[serde(default)]
    pub overall_efficiency: Option<String>,
    /// The model returns this as either a single string or an array.
    #[serde(default, deserialize_with = "string_or_list")]
    pub main_delay_factors: Vec<String>,
    #[serde(default)]
    pub cost_impact: Option<String>,
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

// ──────────────────────────────────────────────
// Diagnostics & pipeline output
// ──────────────────────────────────────────────

/// Why a duplicate event was dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DuplicateReason {
    /// Description, date, start, and end all matched.
    Exact,
    /// Same category, intervals overlapping beyond the configured fraction
    /// of the shorter one.
    Overlap { fraction: f64 },
}

/// Record of one event removed by deduplication.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateRemoval {
    pub removed_id: Uuid,
    pub kept_id: Uuid,
    pub description: String,
    pub reason: DuplicateReason,
}

/// A document dropped from a partial batch.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Non-fatal degradation observed during a run. A clean run has zero
/// counts everywhere.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Generative-text responses that could not be parsed (0 or 1 per run).
    pub parse_errors: u32,
    pub parse_error_detail: Option<String>,
    pub duplicates_removed: Vec<DuplicateRemoval>,
    /// Events kept for display but excluded from interval math.
    pub quarantined_events: u32,
    /// Documents skipped under the partial-batch policy.
    pub skipped_documents: Vec<SkippedDocument>,
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    pub events: Vec<ReconciledEvent>,
    pub category_totals: CategoryTotals,
    pub analysis: AnalysisSummary,
    pub diagnostics: Diagnostics,
}
