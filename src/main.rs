use anyhow::Context;
use log::{error, info};
use std::process::ExitCode;
use std::time::Duration;

use tickerdb::alphavantage::ListingFetcher;
use tickerdb::engine::ReqwestTransport;
use tickerdb::writer::OutputDir;
use tickerdb::{config, pipeline, TickerError};

// nightly entry point; scheduled externally, takes no flags

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real environment wins
    dotenv::dotenv().ok();
    init_logger();

    match fetch_and_write().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("ERROR! {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

// the TickerError sits under the context layers; anything else is a plain failure
fn exit_code_for(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<TickerError>()
        .map(TickerError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

async fn fetch_and_write() -> anyhow::Result<()> {
    // Load config variables
    let config = config::load_from_env().context("failed to load configuration")?;
    let api_key = config::api_key_from_env()?;

    let out = OutputDir::new(&config.output.dir);
    info!("Output directory: {}", out.root().display());

    let transport = ReqwestTransport::new(
        &config.api.user_agent,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    let fetcher = ListingFetcher::new(transport, config.api.base_url.clone(), api_key);

    let report = pipeline::run(&fetcher, &config, &out)
        .await
        .context("ticker run aborted; existing files left untouched")?;

    info!(
        "Stock symbol extraction completed: {} symbols kept, {} rows rejected, {} expected symbols missing",
        report.summary.kept,
        report.rejected_rows,
        report.missing_expected.len()
    );
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
