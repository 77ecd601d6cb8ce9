use log::{info, warn};
use serde_json::{Map, Value};

use crate::engine::{HttpTransport, RawResponse};
use crate::error::{Result, TickerError};
use crate::schema::{ListingRecord, ListingRow, REQUIRED_COLUMNS};

// free tier: 25 calls a day; LISTING_STATUS is one call for the whole market
// https://www.alphavantage.co/documentation/#listing-status

/// Outcome of one LISTING_STATUS pass: the typed records plus how many rows were refused.
#[derive(Debug, Default)]
pub struct FetchedListings {
    pub records: Vec<ListingRecord>,
    pub rejected: usize,
}

pub struct ListingFetcher<T> {
    transport: T,
    base_url: String,
    api_key: String,
}

impl<T: HttpTransport> ListingFetcher<T> {
    pub fn new(transport: T, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Pulls every active US listing in a single request.
    pub async fn fetch_listings(&self) -> Result<FetchedListings> {
        if self.api_key.trim().is_empty() {
            return Err(TickerError::Auth(String::from("API key is empty")));
        }

        info!("Requesting LISTING_STATUS from {} ...", self.base_url);
        let query = [
            ("function", "LISTING_STATUS"),
            ("state", "active"),
            ("apikey", self.api_key.as_str()),
        ];
        let response = self.transport.get(&self.base_url, &query).await?;
        check_response(&response)?;

        let listings = parse_listing_csv(&response.body)?;
        info!(
            "Fetched {} listings ({} rows rejected)",
            listings.records.len(),
            listings.rejected
        );
        Ok(listings)
    }
}

// map HTTP status and the provider's 200-with-json error bodies onto the error taxonomy
fn check_response(response: &RawResponse) -> Result<()> {
    match response.status {
        200..=299 => {}
        401 | 403 => {
            return Err(TickerError::Auth(format!(
                "provider rejected credential (HTTP {})",
                response.status
            )))
        }
        429 => return Err(TickerError::RateLimit(String::from("HTTP 429 Too Many Requests"))),
        500..=599 => {
            return Err(TickerError::TransientNetwork(format!(
                "provider returned HTTP {}",
                response.status
            )))
        }
        status => return Err(TickerError::Provider(format!("unexpected HTTP {status}"))),
    }

    let body = trim_start(&response.body);
    if body.is_empty() {
        return Err(TickerError::MalformedResponse(String::from("empty body")));
    }
    if body[0] == b'{' {
        return Err(classify_json_body(body));
    }
    Ok(())
}

fn classify_json_body(body: &[u8]) -> TickerError {
    let object: Map<String, Value> = match serde_json::from_slice(body) {
        Ok(object) => object,
        Err(e) => return TickerError::MalformedResponse(format!("unparseable JSON body: {e}")),
    };

    let message = ["Error Message", "Note", "Information"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_owned();
    let lowered = message.to_ascii_lowercase();

    if lowered.contains("rate limit") || lowered.contains("call frequency") || lowered.contains("requests per day") {
        TickerError::RateLimit(message)
    } else if lowered.contains("api key") || lowered.contains("apikey") {
        TickerError::Auth(message)
    } else if message.is_empty() {
        TickerError::Provider(format!("unexpected JSON body with keys {:?}", object.keys().collect::<Vec<_>>()))
    } else {
        TickerError::Provider(message)
    }
}

/// Parses the LISTING_STATUS csv by header name, validating each row into a `ListingRecord`.
pub fn parse_listing_csv(body: &[u8]) -> Result<FetchedListings> {
    // headers are trimmed so the column check and serde see the same names
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(TickerError::MalformedResponse(format!(
            "listing csv is missing columns {missing:?}"
        )));
    }

    let mut listings = FetchedListings::default();
    for (line, row) in reader.deserialize::<ListingRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable row {}: {}", line + 2, e);
                listings.rejected += 1;
                continue;
            }
        };
        match row.validate() {
            Ok(record) => listings.records.push(record),
            Err(reason) => {
                warn!("Skipping row {}: {}", line + 2, reason);
                listings.rejected += 1;
            }
        }
    }
    Ok(listings)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
