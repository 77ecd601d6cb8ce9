use serde::{Deserialize, Deserializer, Serialize, Serializer};

/*  PROVIDER QUIRKS
    ===============

    1) Exchange is reported per market tier ("NASDAQ GLOBAL SELECT", "NYSE MKT", ...)
        => Exchange::parse() folds the known aliases onto the three buckets

    2) Missing dates come through as the literal string "null"
        => de_nullable() maps "null" and "" to None

    3) Some rows have an empty symbol or exchange
        => ListingRow::validate() rejects them before they reach a bucket

    4) A quoted csv field can carry a newline
        => symbols with control characters are rejected, the txt artifact is one per line
*/

// exchanges we bucket on; everything else is kept verbatim as Other
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exchange {
    Nasdaq,
    Nyse,
    Amex,
    Other(String),
}

impl Exchange {
    pub const RECOGNIZED: [Exchange; 3] = [Exchange::Nasdaq, Exchange::Nyse, Exchange::Amex];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NASDAQ" | "NASDAQ GLOBAL MARKET" | "NASDAQ CAPITAL MARKET" | "NASDAQ GLOBAL SELECT" => {
                Self::Nasdaq
            }
            "NYSE" | "NEW YORK STOCK EXCHANGE" => Self::Nyse,
            "AMEX" | "NYSE AMERICAN" | "NYSE MKT" | "AMERICAN STOCK EXCHANGE" => Self::Amex,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Nasdaq => "NASDAQ",
            Self::Nyse => "NYSE",
            Self::Amex => "AMEX",
            Self::Other(raw) => raw,
        }
    }

    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Serialize for Exchange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Exchange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Active,
    Delisted,
}

impl ListingStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "delisted" => Some(Self::Delisted),
            _ => None,
        }
    }
}

// validated listing; this is also the full-detail artifact shape, every key always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub symbol: String,
    pub name: String,
    pub exchange: Exchange,
    // market tier as the provider reported it, e.g. "NASDAQ GLOBAL SELECT"
    pub exchange_tier: String,
    pub asset_type: String,
    #[serde(default)]
    pub ipo_date: Option<String>,
    #[serde(default)]
    pub delisting_date: Option<String>,
    pub status: ListingStatus,
}

impl ListingRecord {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

// raw LISTING_STATUS csv row, straight off the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRow {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub asset_type: String,
    #[serde(deserialize_with = "de_nullable", default)]
    pub ipo_date: Option<String>,
    #[serde(deserialize_with = "de_nullable", default)]
    pub delisting_date: Option<String>,
    pub status: String,
}

// header names a LISTING_STATUS csv must carry
pub const REQUIRED_COLUMNS: [&str; 5] = ["symbol", "name", "exchange", "assetType", "status"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    MissingSymbol,
    MissingExchange,
    ControlCharacter(String),
    UnknownStatus(String),
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSymbol => f.write_str("missing symbol"),
            Self::MissingExchange => f.write_str("missing exchange"),
            Self::ControlCharacter(raw) => write!(f, "control character in symbol {raw:?}"),
            Self::UnknownStatus(raw) => write!(f, "unknown status {raw:?}"),
        }
    }
}

impl ListingRow {
    pub fn validate(self) -> Result<ListingRecord, RowRejection> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(RowRejection::MissingSymbol);
        }
        if symbol.chars().any(char::is_control) {
            return Err(RowRejection::ControlCharacter(symbol.to_owned()));
        }
        if self.exchange.trim().is_empty() {
            return Err(RowRejection::MissingExchange);
        }
        let status = ListingStatus::parse(&self.status)
            .ok_or_else(|| RowRejection::UnknownStatus(self.status.clone()))?;

        Ok(ListingRecord {
            symbol: symbol.to_owned(),
            name: self.name.trim().to_owned(),
            exchange: Exchange::parse(&self.exchange),
            exchange_tier: self.exchange.trim().to_owned(),
            asset_type: self.asset_type.trim().to_owned(),
            ipo_date: self.ipo_date,
            delisting_date: self.delisting_date,
            status,
        })
    }
}

// "null" is how the provider spells a missing date
fn de_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, exchange: &str, status: &str) -> ListingRow {
        ListingRow {
            symbol: symbol.to_owned(),
            name: String::from("Some Corp"),
            exchange: exchange.to_owned(),
            asset_type: String::from("Stock"),
            ipo_date: None,
            delisting_date: None,
            status: status.to_owned(),
        }
    }

    #[test]
    fn exchange_aliases_fold_onto_buckets() {
        assert_eq!(Exchange::parse("nasdaq global select"), Exchange::Nasdaq);
        assert_eq!(Exchange::parse(" NYSE "), Exchange::Nyse);
        assert_eq!(Exchange::parse("NYSE MKT"), Exchange::Amex);
        assert_eq!(Exchange::parse("NYSE ARCA"), Exchange::Other(String::from("NYSE ARCA")));
        assert!(!Exchange::parse("BATS").is_recognized());
    }

    #[test]
    fn hyphenated_symbol_survives_validation() {
        let record = row("BRK-A", "NYSE", "Active").validate().unwrap();
        assert_eq!(record.symbol, "BRK-A");
        assert!(record.is_active());
    }

    #[test]
    fn incomplete_rows_are_rejected() {
        assert_eq!(row("  ", "NYSE", "Active").validate(), Err(RowRejection::MissingSymbol));
        assert_eq!(row("IBM", "", "Active").validate(), Err(RowRejection::MissingExchange));
        assert_eq!(
            row("IBM", "NYSE", "Suspended").validate(),
            Err(RowRejection::UnknownStatus(String::from("Suspended")))
        );
    }

    #[test]
    fn symbols_with_control_characters_are_rejected() {
        assert_eq!(
            row("AB\nC", "NYSE", "Active").validate(),
            Err(RowRejection::ControlCharacter(String::from("AB\nC")))
        );
        assert!(matches!(
            row("X\tY", "NYSE", "Active").validate(),
            Err(RowRejection::ControlCharacter(_))
        ));
    }

    #[test]
    fn full_record_keeps_every_column() {
        let record = row("AAPL", "NASDAQ Global Select", "Active").validate().unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["assetType"], "Stock");
        assert_eq!(value["exchange"], "NASDAQ");
        assert_eq!(value["exchangeTier"], "NASDAQ Global Select");
        assert_eq!(value["status"], "Active");
        assert_eq!(value["ipoDate"], serde_json::Value::Null);
        assert_eq!(value["delistingDate"], serde_json::Value::Null);
        assert_eq!(value.as_object().unwrap().len(), 8);
    }
}
