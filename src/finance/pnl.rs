//! End-of-day valuation records

use crate::symbol::Symbol;
use crate::types::{serde_date, Cash, Quantity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per held symbol per trading-day close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlRecord {
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub account_id: String,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub cost: Cash,
    pub market_value: Cash,
    /// Unrealized P&L net of the fees a full liquidation would cost
    pub profit_loss: Cash,
}

/// What happened during one trading session, reported by `end_day`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub orders: usize,
    pub trades: usize,
    /// Orders still open at the close and cancelled by it
    pub cancelled_at_close: usize,
    pub market_value: Cash,
    /// Cash balance plus market value
    pub total_asset: Cash,
    pub profit_loss: Cash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pnl_csv_row() {
        let record = PnlRecord {
            date: NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(),
            account_id: "ACC1".to_string(),
            symbol: "000001.SZ".parse().unwrap(),
            quantity: dec!(250),
            cost: dec!(300.49),
            market_value: dec!(3500),
            profit_loss: dec!(3197.41),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&record).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "date,account_id,symbol,quantity,cost,market_value,profit_loss\n\
             2025-07-16,ACC1,000001.SZ,250,300.49,3500,3197.41\n"
        );
    }
}
