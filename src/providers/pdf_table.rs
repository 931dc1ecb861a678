//! Holdings tables out of portfolio disclosure documents.
//!
//! Every fund house lays its disclosure out differently, so columns are
//! located by header aliases rather than by position.

use crate::core::error::ExtractionError;
use crate::core::holding::NormalizedHolding;
use crate::core::normalize::{TableRow, normalize_table};
use regex::{Regex, RegexBuilder};
use std::cmp::Reverse;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const SECURITY_ALIASES: &[&str] = &[
    "Name of the Instrument",
    "Security",
    "Name",
    "Instrument",
    "Company",
];
const WEIGHT_ALIASES: &[&str] = &["% to Net Assets", "% to NAV", "Weight", "Percentage", "%"];
const VALUE_ALIASES: &[&str] = &["Market/Fair Value", "Market Value", "Value", "Amount"];

static CELL_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t|\s{2,}").unwrap());

static REPEATED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new("Name|Security|Instrument")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// A table with its first row taken as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

pub trait TableExtractor: Send + Sync {
    /// All tables of the document, in document order.
    fn extract_tables(&self, path: &Path) -> Result<Vec<Table>, ExtractionError>;
}

/// Rebuilds tables from the text layer: cells are separated by wide gaps and
/// a table is a run of lines with at least two cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLayoutExtractor;

impl TableExtractor for TextLayoutExtractor {
    fn extract_tables(&self, path: &Path) -> Result<Vec<Table>, ExtractionError> {
        let unreadable = |message: String| ExtractionError::Unreadable {
            path: path.to_path_buf(),
            message,
        };
        // pdf-extract panics on some malformed documents.
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|_| unreadable("text extraction panicked".to_string()))?
            .map_err(|e| unreadable(e.to_string()))?;
        Ok(tables_from_text(&text))
    }
}

/// A cell of one text line with its character extent.
#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
    text: String,
}

fn line_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut push = |from: usize, to: usize| {
        let raw = &line[from..to];
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        let lead = raw.len() - raw.trim_start().len();
        let start = line[..from + lead].chars().count();
        spans.push(Span {
            start,
            end: start + text.chars().count(),
            text: text.to_string(),
        });
    };
    let mut from = 0;
    for gap in CELL_GAP.find_iter(line) {
        push(from, gap.start());
        from = gap.end();
    }
    push(from, line.len());
    spans
}

/// Header column a cell sits under: the one it overlaps most, then the one
/// whose center is closest. Blank cells leave their column empty.
fn column_for(headers: &[Span], cell: &Span) -> usize {
    headers
        .iter()
        .enumerate()
        .max_by_key(|(_, h)| {
            let overlap = cell.end.min(h.end).saturating_sub(cell.start.max(h.start));
            let distance = (cell.start + cell.end).abs_diff(h.start + h.end);
            (overlap, Reverse(distance))
        })
        .map_or(0, |(i, _)| i)
}

fn build_table(lines: Vec<Vec<Span>>) -> Option<Table> {
    let mut lines = lines.into_iter();
    let headers = lines.next()?;
    let rows = lines
        .map(|cells| {
            let mut row = vec![String::new(); headers.len()];
            for cell in cells {
                let slot = &mut row[column_for(&headers, &cell)];
                if !slot.is_empty() {
                    slot.push(' ');
                }
                slot.push_str(&cell.text);
            }
            row
        })
        .collect();
    Some(Table {
        headers: headers.into_iter().map(|h| h.text).collect(),
        rows,
    })
}

/// Splits the text layer into tables. Data cells are placed under the header
/// they line up with, so a blank cell does not shift the rest of the row.
pub fn tables_from_text(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<Span>> = Vec::new();

    let mut flush = |lines: &mut Vec<Vec<Span>>| {
        if lines.len() >= 2 {
            tables.extend(build_table(std::mem::take(lines)));
        }
        lines.clear();
    };

    for line in text.lines() {
        let cells = line_spans(line.trim_end());
        if cells.is_empty() {
            continue;
        }
        if cells.len() >= 2 {
            current.push(cells);
        } else {
            flush(&mut current);
        }
    }
    flush(&mut current);
    tables
}

/// Column headers across all tables, in order of first appearance.
fn combined_columns(tables: &[Table]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for header in tables.iter().flat_map(|t| t.headers.iter()) {
        if !columns.contains(&header.as_str()) {
            columns.push(header);
        }
    }
    columns
}

/// First column, in column order, whose header contains any alias.
fn find_column<'a>(columns: &[&'a str], aliases: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .copied()
        .find(|col| aliases.iter().any(|alias| col.contains(alias)))
}

/// Picks the security, weight and value columns out of `tables` and
/// normalizes the resulting rows.
pub fn holdings_from_tables(tables: &[Table]) -> Result<Vec<NormalizedHolding>, ExtractionError> {
    if tables.is_empty() {
        return Err(ExtractionError::NoTables);
    }
    let columns = combined_columns(tables);
    let security_col =
        find_column(&columns, SECURITY_ALIASES).ok_or(ExtractionError::NoSecurityColumn)?;
    let weight_col = find_column(&columns, WEIGHT_ALIASES);
    let value_col = find_column(&columns, VALUE_ALIASES);
    debug!(security_col, ?weight_col, ?value_col, "Selected columns");

    let mut rows = Vec::new();
    for table in tables {
        let Some(security_idx) = table.column(security_col) else {
            continue;
        };
        let weight_idx = weight_col.and_then(|c| table.column(c));
        let value_idx = value_col.and_then(|c| table.column(c));
        for row in &table.rows {
            let Some(security) = row.get(security_idx).filter(|s| !s.is_empty()) else {
                continue;
            };
            rows.push(TableRow {
                security,
                weight: weight_idx.and_then(|i| row.get(i)).map(String::as_str),
                market_value: value_idx.and_then(|i| row.get(i)).map(String::as_str),
            });
        }
    }

    Ok(normalize_table(&rows)
        .into_iter()
        .filter(|h| !REPEATED_HEADER.is_match(&h.security))
        .collect())
}

/// Reads holdings from local disclosure documents.
pub struct PdfHoldingsReader {
    extractor: Box<dyn TableExtractor>,
}

impl PdfHoldingsReader {
    pub fn new(extractor: Box<dyn TableExtractor>) -> Self {
        Self { extractor }
    }

    pub fn read(&self, path: &Path) -> Result<Vec<NormalizedHolding>, ExtractionError> {
        let tables = self.extractor.extract_tables(path)?;
        debug!(file = %path.display(), tables = tables.len(), "Extracted tables");
        holdings_from_tables(&tables)
    }
}

impl Default for PdfHoldingsReader {
    fn default() -> Self {
        Self::new(Box::new(TextLayoutExtractor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_tables_from_text() {
        let text = "\
Axis Bluechip Fund
Monthly Portfolio Statement

Name of the Instrument    ISIN            Quantity    Market/Fair Value    % to Net Assets
Infosys Ltd               INE009A01021    1,000       1,523.40             6.12

HDFC Bank Ltd             INE040A01034    2,000       3,210.00             8.20
Total                                                                      100.00
Notes
Derivatives    Qty
";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers.len(), 5);
        assert_eq!(tables[0].headers[3], "Market/Fair Value");
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[1][0], "HDFC Bank Ltd");
        assert_eq!(tables[0].rows[2], vec!["Total", "", "", "", "100.00"]);
    }

    #[test]
    fn test_blank_cells_keep_column_alignment() {
        let text = "\
Name of the Instrument    ISIN            Quantity    Market/Fair Value    % to Net Assets
Axis Bank Ltd             INE238A01034                410.00               0.55
TREPS                                                 1,250.75             4.10
Infosys Ltd               INE009A01021    1,000       1,523.40             6.12
";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows[0],
            vec!["Axis Bank Ltd", "INE238A01034", "", "410.00", "0.55"]
        );
        assert_eq!(tables[0].rows[1], vec!["TREPS", "", "", "1,250.75", "4.10"]);

        let holdings = holdings_from_tables(&tables).unwrap();
        let parsed: Vec<_> = holdings
            .iter()
            .map(|h| (h.security.as_str(), h.weight, h.market_value))
            .collect();
        assert_eq!(
            parsed,
            vec![
                ("Axis Bank Ltd", Some(0.55), Some(410.0)),
                ("TREPS", Some(4.1), Some(1250.75)),
                ("Infosys Ltd", Some(6.12), Some(1523.4)),
            ]
        );
    }

    #[test]
    fn test_right_aligned_numbers_map_to_their_header() {
        let text = "\
Security          Quantity      Value
Wipro Ltd       12,345,678    250.00
";
        let tables = tables_from_text(text);
        assert_eq!(tables[0].rows[0], vec!["Wipro Ltd", "12,345,678", "250.00"]);
    }

    #[test]
    fn test_column_selection_uses_first_matching_column() {
        let tables = [table(
            &["Sr", "Name of the Instrument", "Industry", "Market Value", "% to NAV"],
            &[&["1", "Infosys Ltd", "IT", "1,523.40", "6.12%"]],
        )];
        let holdings = holdings_from_tables(&tables).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].security, "Infosys Ltd");
        assert_eq!(holdings[0].weight, Some(6.12));
        assert_eq!(holdings[0].market_value, Some(1523.4));
    }

    #[test]
    fn test_tables_are_concatenated_and_header_repeats_dropped() {
        let tables = [
            table(
                &["Company", "Weight"],
                &[&["Reliance Industries", "9.5"], &["ITC", "3.1"], &["", "1.0"]],
            ),
            table(
                &["Company", "Weight"],
                &[&["Company Name", "Weight"], &["Cipla Ltd", "-"]],
            ),
        ];
        let holdings = holdings_from_tables(&tables).unwrap();
        let names: Vec<_> = holdings.iter().map(|h| h.security.as_str()).collect();
        assert_eq!(names, vec!["Reliance Industries", "Cipla Ltd"]);
        assert_eq!(holdings[1].weight, None);
    }

    #[test]
    fn test_tables_without_matching_columns() {
        assert!(matches!(
            holdings_from_tables(&[]),
            Err(ExtractionError::NoTables)
        ));
        let tables = [table(&["ISIN", "Qty"], &[&["INE009A01021", "10"]])];
        assert!(matches!(
            holdings_from_tables(&tables),
            Err(ExtractionError::NoSecurityColumn)
        ));
    }

    #[test]
    fn test_table_missing_security_header_contributes_nothing() {
        let tables = [
            table(&["Security", "%"], &[&["Wipro Ltd", "2.0"]]),
            table(&["Scheme", "Amount"], &[&["Axis Liquid", "100"]]),
        ];
        let holdings = holdings_from_tables(&tables).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].market_value, None);
    }

    struct StaticExtractor(Vec<Table>);

    impl TableExtractor for StaticExtractor {
        fn extract_tables(&self, _path: &Path) -> Result<Vec<Table>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_reader_uses_extractor() {
        let reader = PdfHoldingsReader::new(Box::new(StaticExtractor(vec![table(
            &["Instrument", "% to Net Assets"],
            &[&["NTPC Ltd", "2.25"]],
        )])));
        let holdings = reader.read(Path::new("unused.pdf")).unwrap();
        assert_eq!(holdings[0].security, "NTPC Ltd");
    }

    #[test]
    fn test_unreadable_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let err = PdfHoldingsReader::default().read(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }
}
