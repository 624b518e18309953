//! Archive record types
//!
//! Column names follow the CSV archive exactly; they are what the loaders
//! match on and what the adjusted series is written back with.

use crate::data::kline::KLineType;
use crate::symbol::Symbol;
use crate::types::{serde_bar_date, serde_date, start_of_day, Bar, Price, Quantity, Timestamp};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A record placed on the replay timeline
pub trait Dated {
    fn timestamp(&self) -> Timestamp;
}

/// One K-line row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineRow {
    #[serde(default)]
    pub symbol: String,
    #[serde(with = "serde_bar_date")]
    pub date: Timestamp,
    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub close_price: Price,
    pub volume: Quantity,
    /// Not adjusted by forward adjustment
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub turnover: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub change_percent: Decimal,
}

impl KlineRow {
    /// Build the bar a strategy sees for this row
    pub fn to_bar(&self, symbol: &Symbol, kline_type: KLineType) -> Bar {
        let span = kline_type.bar_span().unwrap_or_else(chrono::Duration::zero);
        Bar {
            symbol: symbol.clone(),
            start_timestamp: self.date - span,
            end_timestamp: self.date,
            open: self.open_price,
            high: self.high_price,
            low: self.low_price,
            close: self.close_price,
            volume: self.volume,
        }
    }
}

impl Dated for KlineRow {
    fn timestamp(&self) -> Timestamp {
        self.date
    }
}

/// Dividend and share transfer plan, quoted per 10 shares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    #[serde(with = "serde_date")]
    pub ex_dividend_date: NaiveDate,
    /// Bonus plus converted shares per 10 shares
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_transfer_ratio: Decimal,
    /// Cash per 10 shares
    #[serde(
        default,
        alias = "cash_dividend_ratio",
        deserialize_with = "decimal_or_zero"
    )]
    pub cash_dividend: Decimal,
}

impl Dated for DividendRecord {
    fn timestamp(&self) -> Timestamp {
        start_of_day(self.ex_dividend_date)
    }
}

/// Financial report row. Only `report_date` is interpreted; every other
/// column is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRecord {
    pub report_date: NaiveDate,
    pub fields: BTreeMap<String, String>,
}

impl FinancialRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Numeric value of a column, `None` when absent, empty or not a number
    pub fn decimal(&self, column: &str) -> Option<Decimal> {
        self.get(column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}

impl Dated for FinancialRecord {
    fn timestamp(&self) -> Timestamp {
        start_of_day(self.report_date)
    }
}

/// Decimal where an empty field means zero
fn decimal_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    let raw = String::deserialize(d)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;
    use rust_decimal_macros::dec;

    fn row(date: &str) -> KlineRow {
        KlineRow {
            symbol: "000001.SZ".to_string(),
            date: parse_timestamp(date).unwrap(),
            open_price: dec!(10),
            high_price: dec!(11),
            low_price: dec!(9.5),
            close_price: dec!(10.5),
            volume: dec!(1000),
            turnover: dec!(10500),
            change_percent: dec!(1.2),
        }
    }

    #[test]
    fn test_daily_bar_covers_same_day() {
        let symbol: Symbol = "000001.SZ".parse().unwrap();
        let bar = row("2025-06-12").to_bar(&symbol, KLineType::Daily);
        assert_eq!(bar.start_timestamp, bar.end_timestamp);
        assert_eq!(bar.open, dec!(10));
        assert_eq!(bar.close, dec!(10.5));
    }

    #[test]
    fn test_minute_bar_start() {
        let symbol: Symbol = "000001.SZ".parse().unwrap();
        let bar = row("2025-06-12 10:00:00").to_bar(&symbol, KLineType::Min15);
        assert_eq!(bar.start_timestamp, parse_timestamp("2025-06-12 09:45:00").unwrap());
    }

    #[test]
    fn test_dividend_alias_and_empty_fields() {
        let data = "ex_dividend_date,total_transfer_ratio,cash_dividend_ratio,progress\n\
                    2025-06-12,,3.62,实施分配\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: DividendRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.total_transfer_ratio, Decimal::ZERO);
        assert_eq!(record.cash_dividend, dec!(3.62));
        assert_eq!(record.timestamp(), parse_timestamp("2025-06-12").unwrap());
    }

    #[test]
    fn test_kline_round_trip_keeps_date_shape() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(row("2025-06-12")).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(out.contains("000001.SZ,2025-06-12,10,11,9.5,10.5,1000,10500,1.2"));
    }

    #[test]
    fn test_financial_lookup() {
        let mut fields = BTreeMap::new();
        fields.insert("eps".to_string(), "0.62".to_string());
        fields.insert("roe".to_string(), "".to_string());
        let record = FinancialRecord {
            report_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            fields,
        };
        assert_eq!(record.decimal("eps"), Some(dec!(0.62)));
        assert_eq!(record.decimal("roe"), None);
        assert_eq!(record.get("missing"), None);
    }
}
