//! # rusty_ashare
//!
//! Trading ledger and event-driven backtest replay for Chinese A-shares.
//!
//! The ledger ([`finance::TradingSystem`]) keeps one account's cash and
//! positions consistent across order submission, partial fills,
//! cancellation, dividends and share transfers. The replay loop
//! ([`engine::BacktestEngine`]) feeds archived K-lines, dividends and
//! financial reports to a [`strategy::Strategy`] without lookahead and turns
//! its target positions into orders on the ledger.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_ashare::prelude::*;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let config = BacktestConfig::from_file("backtest.toml")?;
//!     let mut feed = BacktestDataFeed::open(config.feed_config())?;
//!
//!     let start = feed.timeline()[0];
//!     let clock = Arc::new(VirtualClock::new(start));
//!     let sinks = LedgerSinks::csv(&config.output_dir)?;
//!
//!     let mut engine = BacktestEngine::new(config.engine_config(), clock, sinks);
//!     let report = engine.run(&mut feed, &mut BuyAndHold::new(Decimal::from(100)))?;
//!     println!("{}", report.performance());
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod finance;
pub mod order;
pub mod performance;
pub mod strategy;
pub mod symbol;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::clock::{Clock, RealClock, VirtualClock};
    pub use crate::config::BacktestConfig;
    pub use crate::data::{
        forward_adjust, BacktestDataFeed, DividendRecord, FeedConfig, FeedMode, FeedStep,
        KLineType, KlineRow,
    };
    pub use crate::engine::{BacktestEngine, BacktestReport, EngineConfig};
    pub use crate::error::{BacktestError, Result};
    pub use crate::finance::{
        Account, FeeSchedule, LedgerSinks, PnlRecord, Position, SubmitResult, Trade,
        TradingSystem,
    };
    pub use crate::order::{Order, OrderSide, OrderStatus, OrderType};
    pub use crate::strategy::{BuyAndHold, ScheduledTargets, Strategy, TargetPosition};
    pub use crate::symbol::{Market, Symbol};
    pub use crate::types::*;
}
