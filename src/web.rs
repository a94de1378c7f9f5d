#![cfg(not(tarpaulin_include))]

use env_logger::Env;
use sheetgate::{Config, app};

/// Main entry point for the web application
///
/// Resolves the configuration (secrets file, then environment, then defaults)
/// and serves the viewer until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    log::info!("Workbook source: {}", config.workbook_url);

    app::run(config).await
}
