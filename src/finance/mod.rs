//! Finance module - account, positions, fees and the trading ledger

pub mod account;
pub mod constants;
pub mod fees;
pub mod ledger;
pub mod pnl;
pub mod position;
pub mod sink;
pub mod trade;

pub use account::Account;
pub use fees::FeeSchedule;
pub use ledger::{RejectReason, SubmitResult, TradingSystem};
pub use pnl::{DaySummary, PnlRecord};
pub use position::Position;
pub use sink::{CsvSink, LedgerSinks, MemoryHandles, MemorySink, RecordSink};
pub use trade::{Trade, TradeStatus};
