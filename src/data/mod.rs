//! Market data: archive records, loading, point-in-time windowing and
//! forward adjustment

pub mod adjustments;
pub mod feed;
pub mod index_wrapper;
pub mod kline;
pub mod loader;
pub mod records;

pub use adjustments::{forward_adjust, ForwardAdjustCache};
pub use feed::{BacktestDataFeed, FeedConfig, FeedMode, FeedStep, SymbolData, SymbolSeries};
pub use index_wrapper::IndexWrapper;
pub use kline::KLineType;
pub use records::{Dated, DividendRecord, FinancialRecord, KlineRow};
