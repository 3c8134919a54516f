//! Defensive parsing of the generative-text extraction response.
//!
//! The service returns free text that is *usually* a JSON object, sometimes
//! wrapped in markdown code fences, occasionally a bare array, and
//! sometimes garbage. Parsing never fails the pipeline: an unusable
//! response degrades to an empty-but-valid result, and within a usable
//! response every event field is validated independently — a bad value
//! nulls that field, not the event, and never the batch.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use uuid::Uuid;

use super::types::{AnalysisSummary, RawEvent};

/// Tagged result of one extraction response.
#[derive(Debug)]
pub enum ParseOutcome {
    Parsed {
        events: Vec<RawEvent>,
        analysis: AnalysisSummary,
    },
    /// The response was not parseable JSON in any accepted shape.
    Failure { diagnostic: String },
}

/// Parse the raw completion text into events and analysis.
pub fn parse_extraction_response(response: &str) -> ParseOutcome {
    let json_str = match extract_json_block(response) {
        Some(block) => block,
        None => {
            return ParseOutcome::Failure {
                diagnostic: "No JSON block found in response".to_string(),
            }
        }
    };

    let value: Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => {
            return ParseOutcome::Failure {
                diagnostic: format!("Invalid JSON: {e}"),
            }
        }
    };

    // Accept either a bare events array or an {events, analysis} object.
    let (event_values, analysis_value) = match &value {
        Value::Array(events) => (events.as_slice(), None),
        Value::Object(map) => (
            map.get("events").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]),
            map.get("analysis"),
        ),
        _ => {
            return ParseOutcome::Failure {
                diagnostic: "Response JSON is neither an object nor an array".to_string(),
            }
        }
    };

    let mut events: Vec<RawEvent> = event_values
        .iter()
        .enumerate()
        .map(|(order, v)| validate_event(v, order))
        .collect();
    inherit_dates(&mut events);

    tracing::debug!(events = events.len(), "Extraction response parsed");

    ParseOutcome::Parsed {
        events,
        analysis: parse_analysis(analysis_value),
    }
}

/// The empty-but-valid result substituted for an unparseable response.
pub fn recovered_summary(diagnostic: &str) -> AnalysisSummary {
    AnalysisSummary {
        remarks: Some(format!(
            "Extraction response could not be parsed; no events were recovered. ({diagnostic})"
        )),
        ..Default::default()
    }
}

/// Locate the JSON content inside a possibly-fenced response.
fn extract_json_block(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    // ```json ... ```
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Some(after_fence[..end].trim());
        }
    }

    // Anonymous fence holding an object or array
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') || block.starts_with('[') {
                return Some(block);
            }
        }
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    // Prose around an embedded object or array
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Some(&trimmed[start..=end]);
        }
    }
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            return Some(&trimmed[start..=end]);
        }
    }

    None
}

// ──────────────────────────────────────────────
// Per-field validation
// ──────────────────────────────────────────────

/// Build a `RawEvent` from one response object, validating each field on
/// its own.
fn validate_event(value: &Value, order: usize) -> RawEvent {
    let description = value
        .get("event_description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown Event")
        .to_string();

    let (end_time, ends_at_midnight) = match value.get("event_end_time").and_then(Value::as_str) {
        Some(raw) if raw.trim() == "24:00" => (None, true),
        Some(raw) => (parse_time(raw), false),
        None => (None, false),
    };

    RawEvent {
        id: Uuid::new_v4(),
        description,
        date: value
            .get("event_date")
            .and_then(Value::as_str)
            .and_then(parse_date),
        start_time: value
            .get("event_start_time")
            .and_then(Value::as_str)
            .and_then(parse_time),
        end_time,
        ends_at_midnight,
        duration_minutes: value
            .get("duration")
            .and_then(Value::as_str)
            .and_then(parse_duration_minutes),
        efficiency_rate: value.get("efficiency_rate").and_then(parse_efficiency_rate),
        source_document: value.get("source_document").and_then(parse_ordinal),
        extraction_order: order,
    }
}

/// Rows without an explicit date inherit the most recent one, in response
/// order. The prompt instructs the model to do this already; applying it
/// again here covers models that echo the blank cells instead.
fn inherit_dates(events: &mut [RawEvent]) {
    let mut last_date: Option<NaiveDate> = None;
    for event in events.iter_mut() {
        match event.date {
            Some(date) => last_date = Some(date),
            None => event.date = last_date,
        }
    }
}

/// `YYYY-MM-DD` preferred; the `DD/MM/YY` forms seen in source tables are
/// accepted as fallbacks.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d/%m/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// 24-hour `HH:MM`. The `24:00` sentinel is handled by the caller and is
/// not a valid time here.
fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// `HH:MM` durations; hours may exceed two digits for multi-day periods.
fn parse_duration_minutes(raw: &str) -> Option<i64> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if hours < 0 || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Rate values arrive as `50`, `"50"`, or `"50%"`. Anything outside the
/// {0, 50, 100} vocabulary is rejected.
fn parse_efficiency_rate(value: &Value) -> Option<u8> {
    let rate = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    match rate {
        0 | 50 | 100 => Some(rate as u8),
        _ => None,
    }
}

/// 1-based document ordinal, as a number or numeric string.
fn parse_ordinal(value: &Value) -> Option<usize> {
    let ordinal = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (ordinal >= 1).then_some(ordinal as usize)
}

/// Parse the analysis object section by section — a malformed section
/// drops to its default without taking the rest down.
fn parse_analysis(value: Option<&Value>) -> AnalysisSummary {
    let Some(obj) = value else {
        return AnalysisSummary::default();
    };

    AnalysisSummary {
        vessel_info: obj
            .get("vessel_info")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        laytime_details: obj
            .get("laytime_details")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        time_breakdown: obj
            .get("time_breakdown")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        efficiency_analysis: obj
            .get("efficiency_analysis")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        remarks: obj
            .get("remarks")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
