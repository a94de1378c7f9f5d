/*!
# Sheetgate

A password-gated web viewer for a remote spreadsheet, built in Rust.

## Overview

The application downloads a multi-sheet workbook from a configured URL, keeps
it in memory for five minutes and answers short prefix queries against it:

| Query | Sheet | Result |
|---|---|---|
| `STATUS <ref>` | `STATUS` | the `Status` of the first row whose `Reference` matches |
| `ACCOUNT <id>` | `ACCOUNT` | rows matching on `Account`, else rows containing the value anywhere |
| `CLIENT/ACCOUNT <id>` | `CLIENTACCOUNT` | as `ACCOUNT` |
| `CLIENT <id>` | `CLIENT` | rows matching on `Client ID`, `ClientID` or `Client`, else a full scan |
| `TRADELIST` | `TRADELIST` | the whole sheet, `.lmx` stripped from instrument names |

## Architecture

### Core
- **query**: routes the raw input to an [`Intent`](query::Intent) and search value
- **matcher**: resolves a routed query against the workbook
- **workbook**: string-typed sheets parsed from xlsx/xls/ods bytes
- **cache**: process-wide workbook cache with a fixed TTL
- **fetcher**: HTTP download with a one-shot HTTPS to HTTP fallback on TLS failure
- **downloader**: CSV and XLSX export of result tables
- **config**: secrets file, environment and defaults
- **error**: the crate error type

### Web layer (`web` feature)
- **login**: shared-password gate and cookie sessions
- **app**: routing, JSON query API and exports

## REST API Endpoints

- `POST /api/query` - Runs a query, body `{"query": "STATUS ABC123"}`
- `GET /api/export?q=...&format=csv|xlsx` - Downloads the result table
- `GET /login`, `POST /login`, `GET /logout` - Password gate
- `GET /healthz` - Liveness probe
*/

pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod matcher;
pub mod query;
pub mod workbook;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;

/// Re-export the most used items to make them easier to reach
pub use cache::{CACHE_TTL, WorkbookCache};
pub use config::Config;
pub use error::{Result, ViewerError};
pub use fetcher::{Fetcher, HttpFetcher};
pub use matcher::{MatchResult, Table};
pub use query::{Intent, Query, route};
pub use workbook::{Row, Sheet, Workbook, parse_workbook};
