//! JSON and CSV serialization of pipeline output.
//!
//! Pure string producers; writing the result anywhere is the caller's
//! business.

use std::fmt::Write as _;

use super::types::{ExtractionOutput, ReconciledEvent};

const CSV_HEADERS: [&str; 7] = [
    "Event",
    "Category",
    "Start Time",
    "End Time",
    "Duration",
    "Efficiency Rate",
    "Source Document",
];

/// Pretty-printed JSON of the full pipeline output.
pub fn to_json(output: &ExtractionOutput) -> serde_json::Result<String> {
    serde_json::to_string_pretty(output)
}

/// Reconciled events as CSV, one row per event, every cell quoted.
pub fn events_to_csv(events: &[ReconciledEvent]) -> String {
    let mut csv = String::new();
    let _ = writeln!(csv, "{}", CSV_HEADERS.map(quote).join(","));
    for event in events {
        let row = [
            event.description.clone(),
            event.category.to_string(),
            event
                .start
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default(),
            event
                .end
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default(),
            event
                .duration_minutes
                .map(format_duration)
                .unwrap_or_else(|| "N/A".to_string()),
            event
                .efficiency_rate
                .map(|rate| format!("{rate}%"))
                .unwrap_or_else(|| "N/A".to_string()),
            event
                .source_document
                .map(|n| n.to_string())
                .unwrap_or_default(),
        ];
        let _ = writeln!(csv, "{}", row.map(|cell| quote(&cell)).join(","));
    }
    csv
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn format_duration(minutes: i64) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::EventCategory;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn sample_event() -> ReconciledEvent {
        let date = NaiveDate::from_ymd_opt(2017, 1, 12).unwrap();
        ReconciledEvent {
            id: Uuid::new_v4(),
            rank: 0,
            description: "Full Work".into(),
            category: EventCategory::Productive,
            start: date.and_hms_opt(0, 0, 0),
            end: date.and_hms_opt(4, 0, 0),
            duration_minutes: Some(240),
            efficiency_rate: Some(100),
            source_document: Some(1),
        }
    }

    #[test]
    fn csv_has_header_and_quoted_cells() {
        let csv = events_to_csv(&[sample_event()]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Event\",\"Category\",\"Start Time\",\"End Time\",\"Duration\",\"Efficiency Rate\",\"Source Document\""
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"Full Work\""));
        assert!(row.contains("\"2017-01-12T00:00:00\""));
        assert!(row.contains("\"4:00\""));
        assert!(row.contains("\"100%\""));
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let mut event = sample_event();
        event.description = "Conveyor \"No. 1\" breakdown".into();
        let csv = events_to_csv(&[event]);
        assert!(csv.contains("\"Conveyor \"\"No. 1\"\" breakdown\""));
    }

    #[test]
    fn missing_fields_render_as_na_or_blank() {
        let mut event = sample_event();
        event.start = None;
        event.end = None;
        event.duration_minutes = None;
        event.efficiency_rate = None;
        let csv = events_to_csv(&[event]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("\"\",\"\",\"N/A\",\"N/A\""));
    }

    #[test]
    fn duration_formats_hours_and_minutes() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(90), "1:30");
        assert_eq!(format_duration(24 * 60), "24:00");
        assert_eq!(format_duration(25 * 60 + 5), "25:05");
    }
}
