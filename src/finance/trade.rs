//! Trade - an execution against an order
//!
//! A Trade is created by the ledger when part or all of an order executes.
//! It records the actual price, quantity and the fees charged.

use crate::order::OrderSide;
use crate::symbol::Symbol;
use crate::types::{serde_timestamp, serde_timestamp_opt, Cash, Price, Quantity, Timestamp};
use serde::{Deserialize, Serialize};

/// Settlement state of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Pending,
    Confirmed,
    /// Reserved; the ledger never settles trades itself
    Settled,
}

impl TradeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "待确认",
            TradeStatus::Confirmed => "已确认",
            TradeStatus::Settled => "已结算",
        }
    }
}

/// Executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub price: Price,
    /// `quantity * price`
    pub amount: Cash,
    pub commission: Cash,
    /// Stamp tax, zero on buys
    pub tax: Cash,
    pub status: TradeStatus,
    #[serde(with = "serde_timestamp")]
    pub trade_time: Timestamp,
    #[serde(with = "serde_timestamp_opt")]
    pub settle_time: Option<Timestamp>,
    pub account_id: String,
}

impl Trade {
    /// Total fees charged
    pub fn fees(&self) -> Cash {
        self.commission + self.tax
    }

    /// Cash leaving the account on a buy, or entering it on a sell
    pub fn net_cash(&self) -> Cash {
        match self.side {
            OrderSide::Buy => self.amount + self.fees(),
            OrderSide::Sell => self.amount - self.fees(),
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self.side, OrderSide::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self.side, OrderSide::Sell)
    }
}
