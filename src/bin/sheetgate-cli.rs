#![cfg(not(tarpaulin_include))]

use env_logger::Env;
use sheetgate::fetcher::FETCH_TIMEOUT;
use sheetgate::matcher::{MatchResult, Table};
use sheetgate::{CACHE_TTL, Config, HttpFetcher, ViewerError, WorkbookCache};
use std::io::{self, BufRead, Write};
use std::time::Instant;

const MAX_CELL_WIDTH: usize = 40;

fn print_table(table: &Table) {
    let cell = |v: &Option<String>| -> String {
        let text = v.as_deref().unwrap_or("");
        if text.chars().count() > MAX_CELL_WIDTH {
            let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
            format!("{}…", cut)
        } else {
            text.to_string()
        }
    };

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (i, v) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell(v).chars().count());
            }
        }
    }

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    println!("{}", header.join(" | "));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));

    for row in &table.rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", cell(v), w = *w))
            .collect();
        println!("{}", line.join(" | "));
    }
    println!("({} rows)", table.rows.len());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let config = Config::load()?;
    let cache = WorkbookCache::new(
        HttpFetcher::new(FETCH_TIMEOUT)?,
        config.workbook_url.clone(),
        CACHE_TTL,
    );

    println!("B2B.SAXO.CONNECTION");
    println!("Enter your query (e.g. STATUS ABC123, CLIENT/ACCOUNT 147572INET/C...), or 'exit'");

    let stdin = io::stdin();
    let mut status = String::from("ok");
    let mut elapsed_time = 0.0;
    loop {
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command == "exit" || command == "quit" {
            break;
        }

        let start_time = Instant::now();
        status = match cache.answer(command).await.map(|(_, result)| result) {
            Ok(MatchResult::Scalar(value)) => {
                println!("{}", value);
                "ok".to_string()
            }
            Ok(MatchResult::Rows(table)) => {
                print_table(&table);
                "ok".to_string()
            }
            Err(err @ ViewerError::NotFound(_)) => {
                println!("{}", err);
                "not found".to_string()
            }
            Err(err @ ViewerError::InvalidQuery) => {
                println!("{}", err);
                "invalid".to_string()
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                "error".to_string()
            }
        };
        elapsed_time = start_time.elapsed().as_secs_f64();
    }

    Ok(())
}
