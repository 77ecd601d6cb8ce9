//! Splits the fetched listings into per-exchange buckets.

use log::info;

use crate::schema::{Exchange, ListingRecord};

/// Listings for one exchange. Every record is active and on `exchange`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeBucket {
    pub exchange: Exchange,
    pub records: Vec<ListingRecord>,
}

impl ExchangeBucket {
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    pub asset_types: Vec<String>,
    pub sort_symbols: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub seen: usize,
    pub kept: usize,
    pub inactive: usize,
    pub unrecognized_exchange: usize,
    pub filtered_asset_type: usize,
}

/// The three exchange buckets, always present, in NASDAQ, NYSE, AMEX order.
#[derive(Debug, Clone)]
pub struct Classified {
    pub buckets: Vec<ExchangeBucket>,
    pub summary: ClassifySummary,
}

impl Classified {
    pub fn bucket(&self, exchange: &Exchange) -> Option<&ExchangeBucket> {
        self.buckets.iter().find(|b| &b.exchange == exchange)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(ExchangeBucket::len).sum()
    }

    // union of every bucket in bucket order; duplicates across exchanges are kept
    pub fn all_records(&self) -> Vec<ListingRecord> {
        self.buckets
            .iter()
            .flat_map(|b| b.records.iter().cloned())
            .collect()
    }
}

pub fn classify(records: &[ListingRecord], options: &ClassifyOptions) -> Classified {
    let mut buckets: Vec<ExchangeBucket> = Exchange::RECOGNIZED
        .iter()
        .map(|exchange| ExchangeBucket {
            exchange: exchange.clone(),
            records: Vec::new(),
        })
        .collect();
    let mut summary = ClassifySummary {
        seen: records.len(),
        ..ClassifySummary::default()
    };

    for record in records {
        if !record.is_active() {
            summary.inactive += 1;
            continue;
        }
        let Some(bucket) = buckets.iter_mut().find(|b| b.exchange == record.exchange) else {
            summary.unrecognized_exchange += 1;
            continue;
        };
        if !asset_type_allowed(&record.asset_type, &options.asset_types) {
            summary.filtered_asset_type += 1;
            continue;
        }
        bucket.records.push(record.clone());
        summary.kept += 1;
    }

    if options.sort_symbols {
        for bucket in &mut buckets {
            bucket.records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        }
    }

    info!(
        "Classified {} listings: kept {}, inactive {}, other exchange {}, asset type {}",
        summary.seen,
        summary.kept,
        summary.inactive,
        summary.unrecognized_exchange,
        summary.filtered_asset_type
    );
    Classified { buckets, summary }
}

fn asset_type_allowed(asset_type: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(asset_type))
}
