use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{Result, ViewerError};

lazy_static! {
    static ref UNNAMED_COLUMN: Regex = Regex::new(r"^Unnamed").unwrap();
}

/// One row of a sheet. `None` is an empty source cell.
pub type Row = Vec<Option<String>>;

/// One named tab of the workbook, every cell held as text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Sheet {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Cell of `row` under `column`, if both exist and the cell is not empty.
    pub fn cell<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        let idx = self.column_index(column)?;
        row.get(idx).and_then(|c| c.as_deref())
    }

    /// Rows whose `column` cell equals `value` exactly, in sheet order.
    pub fn rows_where(&self, column: &str, value: &str) -> Vec<Row> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|row| row.get(idx).and_then(|c| c.as_deref()) == Some(value))
            .cloned()
            .collect()
    }

    /// Rows where any cell equals `value` exactly, in sheet order.
    pub fn scan_rows(&self, value: &str) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|c| c.as_deref() == Some(value)))
            .cloned()
            .collect()
    }
}

/// The full parsed spreadsheet, one [`Sheet`] per tab in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Workbook { sheets }
    }

    /// Sheet lookup by name, ignoring case.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Parse workbook bytes into string-typed sheets.
///
/// The format (xlsx, xlsm, xlsb, xls, ods) is detected from the content. The
/// first row of every sheet is its header. Columns with a blank header (or a
/// header starting with `Unnamed`) are dropped, and repeated headers get a
/// `.1`, `.2`, ... suffix so column names stay unique.
pub fn parse_workbook(bytes: &[u8]) -> Result<Workbook> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = range.rows();

        let header: Vec<String> = match rows.next() {
            Some(cells) => header_names(cells),
            None => {
                sheets.push(Sheet::new(name, Vec::new(), Vec::new()));
                continue;
            }
        };

        let keep: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| !UNNAMED_COLUMN.is_match(h))
            .map(|(i, _)| i)
            .collect();

        let columns = keep.iter().map(|&i| header[i].clone()).collect();
        let data = rows
            .map(|cells| {
                keep.iter()
                    .map(|&i| cells.get(i).and_then(cell_text))
                    .collect()
            })
            .collect();

        sheets.push(Sheet::new(name, columns, data));
    }

    if sheets.is_empty() {
        return Err(ViewerError::Parse("workbook has no sheets".to_string()));
    }

    Ok(Workbook::new(sheets))
}

fn header_names(cells: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::with_capacity(cells.len());

    for (i, cell) in cells.iter().enumerate() {
        let base = match cell_text(cell) {
            Some(text) if !text.trim().is_empty() => text,
            _ => format!("Unnamed: {}", i),
        };

        let mut name = base.clone();
        let count = seen.entry(base.clone()).or_insert(0);
        while names.contains(&name) {
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        names.push(name);
    }

    names
}

/// Text form of a cell value; `None` for empty, empty-string and error cells.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(float_text(*f)),
        Data::Bool(true) => Some("True".to_string()),
        Data::Bool(false) => Some("False".to_string()),
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            Some(when) => date_text(&when),
            None => float_text(dt.as_f64()),
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn date_text(when: &NaiveDateTime) -> String {
    when.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Sheet {
        Sheet::new(
            "ACCOUNT",
            vec!["Account".into(), "Owner".into()],
            vec![
                vec![Some("C100".into()), Some("Alice".into())],
                vec![Some("C200".into()), None],
                vec![Some("C300".into()), Some("".into())],
            ],
        )
    }

    #[test]
    fn numbers_render_like_text() {
        assert_eq!(cell_text(&Data::Float(147572.0)).as_deref(), Some("147572"));
        assert_eq!(cell_text(&Data::Float(1.5)).as_deref(), Some("1.5"));
        assert_eq!(cell_text(&Data::Int(-3)).as_deref(), Some("-3"));
        assert_eq!(cell_text(&Data::Bool(true)).as_deref(), Some("True"));
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn empty_strings_are_absent() {
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::String(" ".into())).as_deref(), Some(" "));
    }

    #[test]
    fn dates_render_with_seconds() {
        let when = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(date_text(&when), "2024-03-01 09:30:00");
    }

    #[test]
    fn blank_and_duplicate_headers() {
        let cells = vec![
            Data::String("Account".into()),
            Data::Empty,
            Data::String("Account".into()),
            Data::String("  ".into()),
        ];
        assert_eq!(
            header_names(&cells),
            vec!["Account", "Unnamed: 1", "Account.1", "Unnamed: 3"]
        );
    }

    #[test]
    fn column_lookup_and_filters() {
        let s = sheet();
        assert_eq!(s.column_index("Owner"), Some(1));
        assert!(!s.has_column("owner"));
        assert_eq!(s.rows_where("Account", "C200").len(), 1);
        assert_eq!(s.scan_rows("Alice").len(), 1);
        assert!(s.rows_where("Missing", "C100").is_empty());
        assert_eq!(s.cell(&s.rows[0], "Owner"), Some("Alice"));
        assert_eq!(s.cell(&s.rows[1], "Owner"), None);
    }

    #[test]
    fn empty_value_matches_only_present_empty_cells() {
        let s = sheet();
        let hits = s.scan_rows("");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0][0].as_deref(), Some("C300"));
    }

    #[test]
    fn sheet_lookup_ignores_case() {
        let wb = Workbook::new(vec![sheet()]);
        assert!(wb.sheet("account").is_some());
        assert!(wb.sheet("Account").is_some());
        assert!(wb.sheet("ACCOUNTS").is_none());
    }
}
