//! Row matching.
//!
//! Resolves a routed [`Query`] against a [`Workbook`]. Every intent reads one
//! fixed sheet; a lookup either finds rows, or fails with
//! [`ViewerError::SheetNotFound`], [`ViewerError::NotFound`] or
//! [`ViewerError::InvalidQuery`]. Failed lookups never return partial results.

use serde::Serialize;

use crate::error::{Result, ViewerError};
use crate::query::{Intent, Query};
use crate::workbook::{Row, Sheet, Workbook};

/// Key column of the STATUS sheet.
pub const REFERENCE_COLUMN: &str = "Reference";
/// Value column of the STATUS sheet.
pub const STATUS_COLUMN: &str = "Status";
/// Key column of the ACCOUNT and CLIENTACCOUNT sheets.
pub const ACCOUNT_COLUMN: &str = "Account";
/// Client id aliases, checked in this order.
pub const CLIENT_COLUMNS: [&str; 3] = ["Client ID", "ClientID", "Client"];
/// Column of the TRADELIST sheet stripped of the venue suffix.
pub const INSTRUMENT_COLUMN: &str = "Instrument";
/// Venue suffix removed from instrument names.
pub const INSTRUMENT_SUFFIX: &str = ".lmx";

/// Rows of one sheet in the sheet's column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    fn from_rows(sheet: &Sheet, rows: Vec<Row>) -> Self {
        Table {
            sheet: sheet.name.clone(),
            columns: sheet.columns.clone(),
            rows,
        }
    }

    /// Number of data rows, header excluded.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a successful lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchResult {
    /// A single value (STATUS lookups).
    Scalar(String),
    /// A row set (ACCOUNT, CLIENT, CLIENT/ACCOUNT and TRADELIST).
    Rows(Table),
}

/// Run a query against the workbook.
pub fn run(workbook: &Workbook, query: &Query) -> Result<MatchResult> {
    let intent = query.intent();
    let Some(sheet_name) = intent.sheet_name() else {
        return Err(ViewerError::InvalidQuery);
    };
    let sheet = workbook
        .sheet(sheet_name)
        .ok_or_else(|| ViewerError::SheetNotFound(sheet_name.to_string()))?;

    match query {
        Query::Status(reference) => match_status(sheet, reference),
        Query::Account(value) | Query::ClientAccount(value) => {
            rows_or_not_found(sheet, intent, match_account(sheet, value))
        }
        Query::Client(value) => rows_or_not_found(sheet, intent, match_client(sheet, value)),
        Query::TradeList => Ok(MatchResult::Rows(trade_list(sheet))),
        Query::Invalid => Err(ViewerError::InvalidQuery),
    }
}

fn rows_or_not_found(sheet: &Sheet, intent: Intent, rows: Vec<Row>) -> Result<MatchResult> {
    if rows.is_empty() {
        Err(ViewerError::NotFound(intent))
    } else {
        Ok(MatchResult::Rows(Table::from_rows(sheet, rows)))
    }
}

/// Status of the first row whose reference equals `reference`.
pub fn match_status(sheet: &Sheet, reference: &str) -> Result<MatchResult> {
    if !sheet.has_column(REFERENCE_COLUMN) || !sheet.has_column(STATUS_COLUMN) {
        return Err(ViewerError::NotFound(Intent::Status));
    }

    let rows = sheet.rows_where(REFERENCE_COLUMN, reference);
    match rows.first() {
        Some(row) => {
            let status = sheet.cell(row, STATUS_COLUMN).unwrap_or_default();
            Ok(MatchResult::Scalar(status.to_string()))
        }
        None => Err(ViewerError::NotFound(Intent::Status)),
    }
}

/// Exact match on the `Account` column, falling back to a cell scan.
pub fn match_account(sheet: &Sheet, value: &str) -> Vec<Row> {
    if sheet.has_column(ACCOUNT_COLUMN) {
        let rows = sheet.rows_where(ACCOUNT_COLUMN, value);
        if !rows.is_empty() {
            return rows;
        }
    }
    sheet.scan_rows(value)
}

/// Union of exact matches over every client id alias present on the sheet.
///
/// Matches are concatenated alias by alias, so a row matching under two
/// aliases appears twice. Without any alias column the whole sheet is scanned.
pub fn match_client(sheet: &Sheet, value: &str) -> Vec<Row> {
    let present: Vec<&str> = CLIENT_COLUMNS
        .iter()
        .copied()
        .filter(|c| sheet.has_column(c))
        .collect();

    if present.is_empty() {
        return sheet.scan_rows(value);
    }

    present
        .into_iter()
        .flat_map(|column| sheet.rows_where(column, value))
        .collect()
}

/// The whole sheet with the venue suffix removed from instrument names.
pub fn trade_list(sheet: &Sheet) -> Table {
    let mut table = Table::from_rows(sheet, sheet.rows.clone());
    if let Some(idx) = sheet.column_index(INSTRUMENT_COLUMN) {
        for row in table.rows.iter_mut() {
            if let Some(Some(cell)) = row.get_mut(idx) {
                *cell = cell.replace(INSTRUMENT_SUFFIX, "");
            }
        }
    }
    table
}
