#![allow(dead_code)]

use rust_xlsxwriter::Workbook as XlsxBook;
use sheetgate::{Fetcher, Result, ViewerError};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A typed cell for fixture sheets.
#[derive(Clone, Copy, Debug)]
pub enum Val<'a> {
    Text(&'a str),
    Num(f64),
    Bool(bool),
    Blank,
}

/// Builds an xlsx workbook in memory, one sheet per call.
pub struct BookBuilder {
    book: XlsxBook,
}

impl BookBuilder {
    pub fn new() -> Self {
        BookBuilder {
            book: XlsxBook::new(),
        }
    }

    /// Sheet of text cells; an empty string leaves the cell blank.
    pub fn sheet(self, name: &str, rows: &[&[&str]]) -> Self {
        let typed: Vec<Vec<Val>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_empty() { Val::Blank } else { Val::Text(v) })
                    .collect()
            })
            .collect();
        self.typed_sheet(name, typed)
    }

    pub fn typed_sheet(mut self, name: &str, rows: Vec<Vec<Val>>) -> Self {
        let sheet = self.book.add_worksheet();
        sheet.set_name(name).expect("valid sheet name");
        for (r, row) in rows.iter().enumerate() {
            for (c, val) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match val {
                    Val::Text(s) => {
                        sheet.write_string(r, c, *s).expect("write string");
                    }
                    Val::Num(n) => {
                        sheet.write_number(r, c, *n).expect("write number");
                    }
                    Val::Bool(b) => {
                        sheet.write_boolean(r, c, *b).expect("write boolean");
                    }
                    Val::Blank => {}
                }
            }
        }
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.book.save_to_buffer().expect("save workbook")
    }
}

/// The workbook used across the lookup tests.
pub fn sample_book() -> Vec<u8> {
    BookBuilder::new()
        .sheet(
            "STATUS",
            &[
                &["Reference", "Status", ""],
                &["ABC123", "Active", "stray"],
                &["DEF456", "Closed", ""],
            ],
        )
        .sheet(
            "ACCOUNT",
            &[
                &["Account", "Alias", "Desk"],
                &["C100", "Primary", "FX"],
                &["C200", "C999", "Rates"],
                &["C300", "Spare", "FX"],
            ],
        )
        .sheet(
            "CLIENT",
            &[
                &["Client ID", "ClientID", "Name"],
                &["A0", "B0", "Zero"],
                &["X1", "B1", "One"],
                &["A2", "B2", "Two"],
                &["A3", "B3", "Three"],
                &["A4", "X1", "Four"],
            ],
        )
        .sheet(
            "ClientAccount",
            &[
                &["Client", "Account", "IP"],
                &["147572INET", "147572INET/C1", "10.0.0.1"],
                &["147572INET", "147572INET/C2", "10.0.0.2"],
            ],
        )
        .sheet(
            "TRADELIST",
            &[
                &["Instrument", "Side"],
                &["EURUSD.lmx", "Buy"],
                &["EURUSD", "Sell"],
            ],
        )
        .build()
}

/// In-memory fetcher that counts calls and can be told to fail.
pub struct CountingFetcher {
    bytes: Mutex<Vec<u8>>,
    fail: Mutex<bool>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        CountingFetcher {
            bytes: Mutex::new(bytes),
            fail: Mutex::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_bytes(&self, bytes: Vec<u8>) {
        *self.bytes.lock().unwrap() = bytes;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl Fetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(ViewerError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.bytes.lock().unwrap().clone())
    }
}
