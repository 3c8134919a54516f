//! Table/text normalizer — turns a raw OCR payload into one enriched blob.
//!
//! Recognized tables are rebuilt as dense grids (the service reports cells
//! sparsely) and serialized row by row after the raw text, so the
//! downstream extraction prompt sees explicit table structure instead of
//! whatever reading order the OCR produced. Documents without tables fall
//! back to the recognized paragraphs. Pure function; identical payloads
//! always yield byte-identical output.

use std::fmt::Write as _;

use crate::clients::{OcrPayload, OcrTable};

use super::types::NormalizedDocument;

const TABLE_SECTION_HEADER: &str = "\n\n=== STRUCTURED TABLE DATA ===\n";
const PARAGRAPH_SECTION_HEADER: &str = "\n\n=== STRUCTURED PARAGRAPHS ===\n";

/// Merge an OCR payload into a single enriched text blob.
pub fn normalize(source_index: usize, name: &str, payload: &OcrPayload) -> NormalizedDocument {
    let mut enriched = payload.text.clone();

    if !payload.tables.is_empty() {
        enriched.push_str(TABLE_SECTION_HEADER);
        for (table_index, table) in payload.tables.iter().enumerate() {
            let _ = write!(enriched, "\nTable {}:\n", table_index + 1);
            for (row_index, row) in rebuild_grid(table).iter().enumerate() {
                let _ = writeln!(enriched, "Row {}: {}", row_index, row.join(" | "));
            }
        }
    } else if !payload.paragraphs.is_empty() {
        enriched.push_str(PARAGRAPH_SECTION_HEADER);
        for (index, paragraph) in payload.paragraphs.iter().enumerate() {
            let _ = writeln!(enriched, "Paragraph {}: {}", index + 1, paragraph.content);
        }
    }

    NormalizedDocument {
        source_index,
        name: name.to_string(),
        enriched_text: enriched,
    }
}

/// Rebuild the dense `row_count x column_count` grid from the sparse cell
/// list. Cells outside the declared bounds are dropped rather than panicking
/// on a malformed payload.
fn rebuild_grid(table: &OcrTable) -> Vec<Vec<String>> {
    let mut grid = vec![vec![String::new(); table.column_count]; table.row_count];
    for cell in &table.cells {
        if cell.row_index < table.row_count && cell.column_index < table.column_count {
            grid[cell.row_index][cell.column_index] = cell.content.clone();
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{OcrCell, OcrParagraph};

    fn cell(row: usize, column: usize, content: &str) -> OcrCell {
        OcrCell {
            row_index: row,
            column_index: column,
            content: content.to_string(),
        }
    }

    #[test]
    fn sparse_cells_fill_dense_grid() {
        let table = OcrTable {
            row_count: 2,
            column_count: 2,
            cells: vec![cell(0, 0, "A"), cell(1, 1, "B")],
        };
        let grid = rebuild_grid(&table);
        assert_eq!(grid, vec![vec!["A".to_string(), String::new()], vec![String::new(), "B".to_string()]]);
    }

    #[test]
    fn out_of_bounds_cells_are_dropped() {
        let table = OcrTable {
            row_count: 1,
            column_count: 1,
            cells: vec![cell(0, 0, "ok"), cell(5, 5, "stray")],
        };
        assert_eq!(rebuild_grid(&table), vec![vec!["ok".to_string()]]);
    }

    #[test]
    fn tables_serialize_after_raw_text() {
        let payload = OcrPayload {
            text: "STATEMENT OF FACTS".into(),
            tables: vec![OcrTable {
                row_count: 2,
                column_count: 3,
                cells: vec![
                    cell(0, 0, "Day"),
                    cell(0, 1, "Date / Time"),
                    cell(0, 2, "Remarks"),
                    cell(1, 0, "Thu"),
                    cell(1, 1, "00:00 - 24:00"),
                    cell(1, 2, "Full Work"),
                ],
            }],
            paragraphs: vec![],
        };

        let doc = normalize(0, "sof.pdf", &payload);
        assert!(doc.enriched_text.starts_with("STATEMENT OF FACTS"));
        assert!(doc.enriched_text.contains("=== STRUCTURED TABLE DATA ==="));
        assert!(doc.enriched_text.contains("Table 1:"));
        assert!(doc.enriched_text.contains("Row 0: Day | Date / Time | Remarks"));
        assert!(doc.enriched_text.contains("Row 1: Thu | 00:00 - 24:00 | Full Work"));
    }

    #[test]
    fn paragraphs_used_only_without_tables() {
        let payload = OcrPayload {
            text: "narrative".into(),
            tables: vec![],
            paragraphs: vec![
                OcrParagraph {
                    content: "Vessel arrived at anchorage.".into(),
                },
                OcrParagraph {
                    content: "NOR tendered.".into(),
                },
            ],
        };

        let doc = normalize(1, "narrative.pdf", &payload);
        assert!(doc.enriched_text.contains("=== STRUCTURED PARAGRAPHS ==="));
        assert!(doc.enriched_text.contains("Paragraph 1: Vessel arrived at anchorage."));
        assert!(doc.enriched_text.contains("Paragraph 2: NOR tendered."));
        assert!(!doc.enriched_text.contains("STRUCTURED TABLE DATA"));
    }

    #[test]
    fn output_is_deterministic() {
        let payload = OcrPayload {
            text: "text".into(),
            tables: vec![OcrTable {
                row_count: 1,
                column_count: 2,
                cells: vec![cell(0, 1, "b"), cell(0, 0, "a")],
            }],
            paragraphs: vec![],
        };
        let first = normalize(0, "doc", &payload);
        let second = normalize(0, "doc", &payload);
        assert_eq!(first.enriched_text, second.enriched_text);
        assert!(first.enriched_text.contains("Row 0: a | b"));
    }

    #[test]
    fn no_structure_leaves_raw_text_untouched() {
        let payload = OcrPayload {
            text: "just text".into(),
            ..Default::default()
        };
        let doc = normalize(0, "plain", &payload);
        assert_eq!(doc.enriched_text, "just text");
    }
}
