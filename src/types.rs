//! Core types, aliases and time helpers

use crate::error::{BacktestError, Result};
use crate::symbol::Symbol;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange-local wall-clock time. A-share data carries no zone.
pub type Timestamp = NaiveDateTime;

/// Price per share
pub type Price = Decimal;

/// Share quantity (fractional after stock transfers)
pub type Quantity = Decimal;

/// Money amount
pub type Cash = Decimal;

/// Output format for every timestamp the crate writes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format for date-only values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(start_of_day)
        .map_err(|_| BacktestError::InvalidTimestamp(s.to_string()))
}

/// Midnight of the given date
pub fn start_of_day(date: NaiveDate) -> Timestamp {
    date.and_time(NaiveTime::MIN)
}

/// Format a timestamp, dropping the time part when it is midnight
pub fn format_date_or_timestamp(ts: &Timestamp) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format(DATE_FORMAT).to_string()
    } else {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Serde adapter for [`Timestamp`] fields written as `YYYY-MM-DD HH:MM:SS`
pub mod serde_timestamp {
    use super::{parse_timestamp, Timestamp, TIMESTAMP_FORMAT};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional timestamps; `None` is an empty field
pub mod serde_timestamp_opt {
    use super::{parse_timestamp, Timestamp, TIMESTAMP_FORMAT};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.collect_str(&ts.format(TIMESTAMP_FORMAT)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse_timestamp(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Serde adapter for K-line `date` columns: date-only for daily bars,
/// full timestamp for intraday bars.
pub mod serde_bar_date {
    use super::{format_date_or_timestamp, parse_timestamp, Timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_date_or_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for date-only fields
pub mod serde_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// OHLCV bar handed to strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: Symbol,
    #[serde(with = "serde_timestamp")]
    pub start_timestamp: Timestamp,
    #[serde(with = "serde_timestamp")]
    pub end_timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
}

impl Bar {
    /// Price range (high - low)
    pub fn range(&self) -> Price {
        self.high - self.low
    }

    /// Check if bar is bullish
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if bar is bearish
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_timestamp_formats() {
        let daily = parse_timestamp("2025-06-12").unwrap();
        assert_eq!(daily.to_string(), "2025-06-12 00:00:00");

        let intraday = parse_timestamp("2025-07-16 10:00:00").unwrap();
        assert_eq!(format_date_or_timestamp(&intraday), "2025-07-16 10:00:00");
        assert_eq!(format_date_or_timestamp(&daily), "2025-06-12");
    }

    #[test]
    fn test_parse_timestamp_rejects_other_shapes() {
        assert!(parse_timestamp("2025/06/12").is_err());
        assert!(parse_timestamp("20250612").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_bar_calculations() {
        let ts = parse_timestamp("2025-07-16").unwrap();
        let bar = Bar {
            symbol: "000001.SZ".parse().unwrap(),
            start_timestamp: ts,
            end_timestamp: ts,
            open: dec!(10.0),
            high: dec!(10.5),
            low: dec!(9.9),
            close: dec!(10.3),
            volume: dec!(1000),
        };

        assert_eq!(bar.range(), dec!(0.6));
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }
}
