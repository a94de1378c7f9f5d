use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::matcher::{MatchResult, STATUS_COLUMN, Table};

/// Convert a result table to CSV format
///
/// The first line holds the column names. Fields containing commas, quotes or
/// newlines are quoted, with inner quotes doubled. Empty cells are written as
/// empty fields.
///
/// # Examples
/// ```
/// use sheetgate::downloader::to_csv;
/// use sheetgate::matcher::Table;
///
/// let table = Table {
///     sheet: "ACCOUNT".to_string(),
///     columns: vec!["Account".to_string(), "Note".to_string()],
///     rows: vec![vec![Some("C100".to_string()), Some("a, b".to_string())]],
/// };
/// assert_eq!(to_csv(&table), "Account,Note\nC100,\"a, b\"\n");
/// ```
pub fn to_csv(table: &Table) -> String {
    let mut csv_content = String::new();

    push_csv_line(&mut csv_content, table.columns.iter().map(String::as_str));
    for row in &table.rows {
        push_csv_line(
            &mut csv_content,
            row.iter().map(|cell| cell.as_deref().unwrap_or("")),
        );
    }

    csv_content
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, value) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert a result table to XLSX format
///
/// Writes one worksheet named after the source sheet: the header row followed
/// by every cell as a string.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet)?;

    for (c, name) in table.columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, name)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Tabular view of any lookup result; a status becomes a one-cell table.
pub fn as_table(result: &MatchResult) -> Table {
    match result {
        MatchResult::Rows(table) => table.clone(),
        MatchResult::Scalar(value) => Table {
            sheet: "STATUS".to_string(),
            columns: vec![STATUS_COLUMN.to_string()],
            rows: vec![vec![Some(value.clone())]],
        },
    }
}
