//! Artifact rendering and the two-phase write into the output directory.
//!
//! Every artifact is rendered to memory, then staged as a temp file next to its
//! destination, and only once all of them are staged are they renamed into place.
//! Anything that fails before the rename phase leaves the previous run's files as they were.

use log::info;
use std::path::{Path, PathBuf};

use crate::classify::Classified;
use crate::engine::{self, StagedFile};
use crate::error::Result;
use crate::schema::{Exchange, ListingRecord};

pub const ALL_BUCKET: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    FullDetail,
    SymbolsJson,
    SymbolsText,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::FullDetail, Self::SymbolsJson, Self::SymbolsText];

    fn file_suffix(self) -> &'static str {
        match self {
            Self::FullDetail => "full_tickers.json",
            Self::SymbolsJson => "tickers.json",
            Self::SymbolsText => "tickers.txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Per-bucket result of a write, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketWritten {
    pub bucket: String,
    pub symbols: usize,
}

/// Root the artifacts are written under; injected so tests can point it at a temp dir.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // {root}/{bucket}/{bucket}_{suffix}
    pub fn path_for(&self, bucket: &str, kind: ArtifactKind) -> PathBuf {
        self.root
            .join(bucket)
            .join(format!("{}_{}", bucket, kind.file_suffix()))
    }

    pub fn render_bucket(&self, bucket: &str, records: &[ListingRecord]) -> Result<Vec<Artifact>> {
        ArtifactKind::ALL
            .iter()
            .map(|kind| -> Result<Artifact> {
                Ok(Artifact {
                    path: self.path_for(bucket, *kind),
                    contents: render(*kind, records)?,
                })
            })
            .collect()
    }

    /// Writes the three exchange buckets plus the `all` union.
    pub fn write_all(&self, classified: &Classified) -> Result<Vec<BucketWritten>> {
        let mut artifacts = Vec::new();
        let mut written = Vec::new();

        for bucket in &classified.buckets {
            let name = bucket_name(&bucket.exchange);
            artifacts.extend(self.render_bucket(&name, &bucket.records)?);
            written.push(BucketWritten {
                bucket: name,
                symbols: bucket.len(),
            });
        }
        let all = classified.all_records();
        artifacts.extend(self.render_bucket(ALL_BUCKET, &all)?);
        written.push(BucketWritten {
            bucket: ALL_BUCKET.to_owned(),
            symbols: all.len(),
        });

        let staged = artifacts
            .iter()
            .map(|a| engine::stage_file(&a.path, &a.contents))
            .collect::<Result<Vec<StagedFile>>>()?;
        for file in staged {
            let path = file.commit()?;
            info!("File written: {}", path.display());
        }

        for bucket in &written {
            info!("{}: {} symbols saved", bucket.bucket.to_uppercase(), bucket.symbols);
        }
        Ok(written)
    }
}

pub fn bucket_name(exchange: &Exchange) -> String {
    exchange.as_str().to_ascii_lowercase()
}

pub fn render(kind: ArtifactKind, records: &[ListingRecord]) -> Result<Vec<u8>> {
    let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
    let bytes = match kind {
        ArtifactKind::FullDetail => serde_json::to_vec_pretty(records)?,
        ArtifactKind::SymbolsJson => serde_json::to_vec_pretty(&symbols)?,
        // no trailing newline, empty bucket gives an empty file
        ArtifactKind::SymbolsText => symbols.join("\n").into_bytes(),
    };
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, ClassifyOptions};
    use crate::schema::ListingStatus;
    use std::fs;
    use tempfile::tempdir;

    fn record(symbol: &str, exchange: Exchange) -> ListingRecord {
        ListingRecord {
            symbol: symbol.to_owned(),
            name: format!("{symbol} Inc"),
            exchange_tier: exchange.as_str().to_owned(),
            exchange,
            asset_type: String::from("Stock"),
            ipo_date: Some(String::from("1999-11-01")),
            delisting_date: None,
            status: ListingStatus::Active,
        }
    }

    #[test]
    fn paths_follow_bucket_layout() {
        let out = OutputDir::new("/srv/tickers");
        assert_eq!(
            out.path_for("nasdaq", ArtifactKind::FullDetail),
            PathBuf::from("/srv/tickers/nasdaq/nasdaq_full_tickers.json")
        );
        assert_eq!(
            out.path_for(ALL_BUCKET, ArtifactKind::SymbolsText),
            PathBuf::from("/srv/tickers/all/all_tickers.txt")
        );
        assert_eq!(bucket_name(&Exchange::Amex), "amex");
    }

    #[test]
    fn three_forms_agree_on_symbols_and_order() {
        let records = vec![record("ZION", Exchange::Nasdaq), record("AAPL", Exchange::Nasdaq)];

        let full: Vec<ListingRecord> =
            serde_json::from_slice(&render(ArtifactKind::FullDetail, &records).unwrap()).unwrap();
        let json: Vec<String> =
            serde_json::from_slice(&render(ArtifactKind::SymbolsJson, &records).unwrap()).unwrap();
        let text = String::from_utf8(render(ArtifactKind::SymbolsText, &records).unwrap()).unwrap();

        let from_full: Vec<String> = full.into_iter().map(|r| r.symbol).collect();
        assert_eq!(from_full, vec!["ZION", "AAPL"]);
        assert_eq!(json, from_full);
        assert_eq!(text.lines().collect::<Vec<_>>(), from_full);
    }

    #[test]
    fn empty_bucket_renders_empty_collections() {
        assert_eq!(render(ArtifactKind::FullDetail, &[]).unwrap(), b"[]");
        assert_eq!(render(ArtifactKind::SymbolsJson, &[]).unwrap(), b"[]");
        assert!(render(ArtifactKind::SymbolsText, &[]).unwrap().is_empty());
    }

    #[test]
    fn write_all_emits_twelve_files() {
        let dir = tempdir().unwrap();
        let out = OutputDir::new(dir.path());
        let records = vec![record("BRK-A", Exchange::Nyse), record("MSFT", Exchange::Nasdaq)];
        let classified = classify(&records, &ClassifyOptions::default());

        let written = out.write_all(&classified).unwrap();
        let names: Vec<&str> = written.iter().map(|w| w.bucket.as_str()).collect();
        assert_eq!(names, vec!["nasdaq", "nyse", "amex", "all"]);

        for bucket in names {
            for kind in ArtifactKind::ALL {
                assert!(out.path_for(bucket, kind).is_file(), "{bucket} {kind:?}");
            }
        }
        let nyse = fs::read_to_string(out.path_for("nyse", ArtifactKind::SymbolsText)).unwrap();
        assert_eq!(nyse, "BRK-A");
        let amex = fs::read_to_string(out.path_for("amex", ArtifactKind::SymbolsJson)).unwrap();
        assert_eq!(amex, "[]");
    }
}
