//! Order types and lifecycle

use crate::error::{BacktestError, Result};
use crate::symbol::Symbol;
use crate::types::{serde_timestamp_opt, Price, Quantity, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Display label used on broker terminals
    pub fn label(&self) -> &'static str {
        match self {
            OrderSide::Buy => "买入",
            OrderSide::Sell => "卖出",
        }
    }
}

/// Order type. Only [`OrderType::Limit`] can be constructed into an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Market => "市价单",
            OrderType::Limit => "限价单",
            OrderType::Stop => "止损单",
            OrderType::StopLimit => "止损限价单",
        }
    }
}

/// Order status
///
/// `Pending -> Submitted -> PartiallyFilled -> Filled`, with `Cancelled` from
/// either open state and `Rejected` from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "待提交",
            OrderStatus::Submitted => "已提交",
            OrderStatus::PartiallyFilled => "部分成交",
            OrderStatus::Filled => "全部成交",
            OrderStatus::Cancelled => "已撤销",
            OrderStatus::Rejected => "已拒绝",
        }
    }

    /// Stable code, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    /// Submitted or partially filled
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Submitted | OrderStatus::PartiallyFilled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading order
///
/// `remaining_quantity == quantity - filled_quantity` holds for the whole
/// lifetime of the order; only the ledger moves the fill counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Price,
    pub status: OrderStatus,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    #[serde(with = "serde_timestamp_opt")]
    pub create_time: Option<Timestamp>,
    #[serde(with = "serde_timestamp_opt")]
    pub update_time: Option<Timestamp>,
    pub account_id: String,
}

impl Order {
    /// Validate and build an order.
    ///
    /// Non-limit types, a missing or non-positive price, a non-positive
    /// quantity and an empty id are rejected here so that no half-valid
    /// order ever reaches the ledger.
    pub fn new(
        order_id: impl Into<String>,
        account_id: impl Into<String>,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Result<Self> {
        let order_id = order_id.into();
        if order_id.trim().is_empty() {
            return Err(BacktestError::InvalidOrder("order id is empty".to_string()));
        }
        if order_type != OrderType::Limit {
            return Err(BacktestError::InvalidOrder(format!(
                "unsupported order type {:?} for {}",
                order_type, order_id
            )));
        }
        let price = price.ok_or_else(|| {
            BacktestError::InvalidOrder(format!("limit order {} has no price", order_id))
        })?;
        if price <= Decimal::ZERO {
            return Err(BacktestError::InvalidOrder(format!(
                "price must be positive, got {} for {}",
                price, order_id
            )));
        }
        if quantity <= Decimal::ZERO {
            return Err(BacktestError::InvalidOrder(format!(
                "quantity must be positive, got {} for {}",
                quantity, order_id
            )));
        }

        Ok(Self {
            order_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            remaining_quantity: quantity,
            create_time: None,
            update_time: None,
            account_id: account_id.into(),
        })
    }

    /// Create a limit order
    pub fn limit(
        order_id: impl Into<String>,
        account_id: impl Into<String>,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
    ) -> Result<Self> {
        Self::new(
            order_id,
            account_id,
            symbol,
            side,
            OrderType::Limit,
            quantity,
            Some(price),
        )
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity <= Decimal::ZERO
    }

    /// Record a fill. Callers guarantee `quantity <= remaining_quantity`.
    pub(crate) fn fill(&mut self, quantity: Quantity, timestamp: Timestamp) {
        self.filled_quantity += quantity;
        self.remaining_quantity -= quantity;
        self.update_time = Some(timestamp);

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    pub(crate) fn submit(&mut self, timestamp: Timestamp) {
        self.status = OrderStatus::Submitted;
        self.create_time = Some(timestamp);
        self.update_time = Some(timestamp);
    }

    pub(crate) fn reject(&mut self, timestamp: Timestamp) {
        self.status = OrderStatus::Rejected;
        self.update_time = Some(timestamp);
    }

    pub(crate) fn cancel(&mut self, timestamp: Timestamp) {
        self.status = OrderStatus::Cancelled;
        self.update_time = Some(timestamp);
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order({}, {:?}, {}, {}/{} @ {}, {})",
            self.order_id,
            self.side,
            self.symbol,
            self.filled_quantity,
            self.quantity,
            self.price,
            self.status
        )
    }
}
