//! Error types for rusty_ashare
//!
//! Only recoverable conditions live here. Broken ledger invariants (negative
//! balances, over-execution, frozen/available mismatches) are bugs and panic
//! at the point of detection instead of being returned.

use crate::types::Timestamp;
use thiserror::Error;

/// Main error type for rusty_ashare
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid trade for order {order_id}: {reason}")]
    InvalidTrade { order_id: String, reason: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} is not open (status {status})")]
    OrderNotOpen { order_id: String, status: String },

    #[error("Missing closing price for held symbol {symbol} on {date}")]
    MissingPrice { symbol: String, date: Timestamp },

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Unsupported K-line type: {0}")]
    UnsupportedKline(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Strategy error: {0}")]
    StrategyError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for rusty_ashare operations
pub type Result<T> = std::result::Result<T, BacktestError>;
