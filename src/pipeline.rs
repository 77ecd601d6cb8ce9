use log::{info, warn};
use std::collections::HashSet;

use crate::alphavantage::ListingFetcher;
use crate::classify::{classify, ClassifyOptions, ClassifySummary, Classified};
use crate::config::Config;
use crate::engine::{HttpTransport, RunLock};
use crate::error::{Result, TickerError};
use crate::writer::{BucketWritten, OutputDir};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub rejected_rows: usize,
    pub summary: ClassifySummary,
    pub written: Vec<BucketWritten>,
    pub missing_expected: Vec<String>,
}

/// One nightly pass: lock, fetch, classify, write, report.
///
/// Nothing under `out` is replaced unless the fetch succeeded and at least one
/// listing survived classification.
pub async fn run<T: HttpTransport>(
    fetcher: &ListingFetcher<T>,
    config: &Config,
    out: &OutputDir,
) -> Result<RunReport> {
    let _lock = RunLock::acquire(out.root())?;

    let listings = fetcher.fetch_listings().await?;
    let options = ClassifyOptions {
        asset_types: config.filter.asset_types.clone(),
        sort_symbols: config.output.sort_symbols,
    };
    let classified = classify(&listings.records, &options);
    if classified.total() == 0 {
        return Err(TickerError::EmptyResult);
    }

    let written = out.write_all(&classified)?;
    let missing_expected = validate_results(&classified, &config.validation.expected_symbols);

    Ok(RunReport {
        rejected_rows: listings.rejected,
        summary: classified.summary,
        written,
        missing_expected,
    })
}

// logs the per-exchange totals and returns expected symbols that are absent from every bucket
pub fn validate_results(classified: &Classified, expected: &[String]) -> Vec<String> {
    info!("=== VALIDATION RESULTS ===");
    info!("Total stocks: {}", classified.total());
    for bucket in &classified.buckets {
        info!("{}: {} stocks", bucket.exchange.as_str(), bucket.len());
    }

    let present: HashSet<&str> = classified.buckets.iter().flat_map(|b| b.symbols()).collect();
    let mut missing = Vec::new();
    for symbol in expected {
        if present.contains(symbol.as_str()) {
            info!("found {symbol}");
        } else {
            warn!("expected symbol {symbol} not found in any exchange");
            missing.push(symbol.clone());
        }
    }
    missing
}
