//! Backtest data feed
//!
//! Holds the complete archive of every symbol and releases it through
//! [`IndexWrapper`] cursors, so a consumer only ever sees rows that were
//! public at the current replay time.
//!
//! Visibility lags:
//!
//! | series     | lag                                     |
//! |------------|-----------------------------------------|
//! | dividends  | none, visible on the ex-dividend date   |
//! | financials | 24h after the report date               |
//! | K-lines    | none when streaming, 24h point-in-time  |

use crate::data::adjustments::ForwardAdjustCache;
use crate::data::index_wrapper::IndexWrapper;
use crate::data::kline::KLineType;
use crate::data::loader::{load_dividends, load_financials, load_klines};
use crate::data::records::{Dated, DividendRecord, FinancialRecord, KlineRow};
use crate::error::{BacktestError, Result};
use crate::symbol::Symbol;
use crate::types::Timestamp;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Archive file with dividend plans, per symbol directory
pub const DIVIDEND_FILE: &str = "dividend_info.csv";

/// Archive file with financial reports, per symbol directory
pub const FINANCIAL_FILE: &str = "financial_data.csv";

/// Delay before a financial report counts as public
pub fn financial_lag() -> Duration {
    Duration::hours(24)
}

/// How K-line rows become visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// A bar is visible at its own timestamp (bar-by-bar replay)
    #[default]
    Streaming,
    /// A bar is visible one day after its timestamp (as-of-date queries)
    PointInTime,
}

impl FeedMode {
    pub fn kline_lag(&self) -> Duration {
        match self {
            FeedMode::Streaming => Duration::zero(),
            FeedMode::PointInTime => Duration::hours(24),
        }
    }
}

/// Where and what to load
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub archive_path: PathBuf,
    pub symbols: Vec<Symbol>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kline_type: KLineType,
    pub mode: FeedMode,
}

impl FeedConfig {
    pub fn new(archive_path: impl Into<PathBuf>, symbols: Vec<Symbol>) -> Self {
        Self {
            archive_path: archive_path.into(),
            symbols,
            start_date: None,
            end_date: None,
            kline_type: KLineType::Daily,
            mode: FeedMode::Streaming,
        }
    }

    /// Restrict every series to `[start, end]`, both inclusive
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_kline_type(mut self, kline_type: KLineType) -> Self {
        self.kline_type = kline_type;
        self
    }

    pub fn with_mode(mut self, mode: FeedMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Materialized series of one symbol
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: Symbol,
    pub dividends: Vec<DividendRecord>,
    pub financials: Vec<FinancialRecord>,
    pub klines: Vec<KlineRow>,
}

impl SymbolSeries {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            dividends: Vec::new(),
            financials: Vec::new(),
            klines: Vec::new(),
        }
    }

    /// Read `{archive}/{symbol}/`
    pub fn load(config: &FeedConfig, symbol: &Symbol) -> Result<Self> {
        let dir = config.archive_path.join(symbol.to_string());
        Ok(Self {
            symbol: symbol.clone(),
            dividends: load_dividends(dir.join(DIVIDEND_FILE))?,
            financials: load_financials(dir.join(FINANCIAL_FILE))?,
            klines: load_klines(dir.join(config.kline_type.archive_file_name()))?,
        })
    }

    /// Keep rows dated within `[start, end]`
    pub fn restrict(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.dividends.retain(|r| in_range(r, start, end));
        self.financials.retain(|r| in_range(r, start, end));
        self.klines.retain(|r| in_range(r, start, end));
        self
    }
}

fn in_range<T: Dated>(row: &T, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    let date = row.timestamp().date();
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

struct SymbolCursor {
    symbol: Symbol,
    dividends: IndexWrapper<DividendRecord>,
    financials: IndexWrapper<FinancialRecord>,
    klines: IndexWrapper<KlineRow>,
    adjusted: ForwardAdjustCache,
}

impl SymbolCursor {
    fn advance(&mut self, time: Timestamp) {
        self.dividends.till(time);
        self.financials.till(time);
        self.klines.till(time);
        self.adjusted
            .update(self.klines.visible(), self.dividends.visible());
    }

    fn snapshot(&self) -> SymbolData<'_> {
        SymbolData {
            symbol: &self.symbol,
            dividend_info: self.dividends.visible(),
            financial_data: self.financials.visible(),
            kline_data: self.klines.visible(),
            forward_adjusted_kline_data: self.adjusted.rows(),
        }
    }
}

/// What one symbol looks like at a replay time
#[derive(Debug, Clone)]
pub struct SymbolData<'a> {
    pub symbol: &'a Symbol,
    pub dividend_info: &'a [DividendRecord],
    pub financial_data: &'a [FinancialRecord],
    pub kline_data: &'a [KlineRow],
    pub forward_adjusted_kline_data: &'a [KlineRow],
}

impl<'a> SymbolData<'a> {
    /// Newest visible raw K-line row
    pub fn latest_kline(&self) -> Option<&'a KlineRow> {
        self.kline_data.last()
    }

    /// Newest visible financial report
    pub fn latest_report(&self) -> Option<&'a FinancialRecord> {
        self.financial_data.last()
    }
}

/// All symbols at one replay time
#[derive(Debug, Clone)]
pub struct FeedStep<'a> {
    pub date: Timestamp,
    pub symbols: Vec<SymbolData<'a>>,
}

impl<'a> FeedStep<'a> {
    pub fn symbol(&self, symbol: &Symbol) -> Option<&SymbolData<'a>> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    /// Visible dividend records per symbol, in the shape the ledger's
    /// day start takes
    pub fn dividends(&self) -> impl Iterator<Item = (&'a Symbol, &'a [DividendRecord])> + '_ {
        self.symbols.iter().map(|s| (s.symbol, s.dividend_info))
    }
}

/// Replay source over per-symbol archives
pub struct BacktestDataFeed {
    kline_type: KLineType,
    mode: FeedMode,
    cursors: Vec<SymbolCursor>,
    timeline: Vec<Timestamp>,
    next_step: usize,
}

impl BacktestDataFeed {
    /// Load every configured symbol from the archive
    pub fn open(config: FeedConfig) -> Result<Self> {
        config.kline_type.ensure_replayable()?;
        if config.symbols.is_empty() {
            return Err(BacktestError::ConfigError("no symbols to replay".to_string()));
        }
        if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
            if start > end {
                return Err(BacktestError::ConfigError(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }

        let mut series = Vec::with_capacity(config.symbols.len());
        for symbol in &config.symbols {
            let loaded = SymbolSeries::load(&config, symbol)?
                .restrict(config.start_date, config.end_date);
            log::info!(
                "Loaded {}: {} K-lines, {} dividends, {} reports",
                symbol,
                loaded.klines.len(),
                loaded.dividends.len(),
                loaded.financials.len()
            );
            series.push(loaded);
        }

        Self::from_series(series, config.kline_type, config.mode)
    }

    /// Build a feed from series already in memory
    pub fn from_series(series: Vec<SymbolSeries>, kline_type: KLineType, mode: FeedMode) -> Result<Self> {
        kline_type.ensure_replayable()?;

        let mut timeline: Vec<Timestamp> = series
            .iter()
            .flat_map(|s| s.klines.iter().map(|r| r.date))
            .collect();
        timeline.sort();
        timeline.dedup();

        let cursors = series
            .into_iter()
            .map(|s| SymbolCursor {
                symbol: s.symbol,
                dividends: IndexWrapper::new(s.dividends, Duration::zero()),
                financials: IndexWrapper::new(s.financials, financial_lag()),
                klines: IndexWrapper::new(s.klines, mode.kline_lag()),
                adjusted: ForwardAdjustCache::new(),
            })
            .collect();

        Ok(Self {
            kline_type,
            mode,
            cursors,
            timeline,
            next_step: 0,
        })
    }

    pub fn kline_type(&self) -> KLineType {
        self.kline_type
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.cursors.iter().map(|c| &c.symbol)
    }

    /// Every K-line timestamp of every symbol, sorted
    pub fn timeline(&self) -> &[Timestamp] {
        &self.timeline
    }

    pub fn remaining_steps(&self) -> usize {
        self.timeline.len() - self.next_step
    }

    /// Advance all cursors to `time` and return what is visible.
    ///
    /// Times must not decrease between calls, including the times
    /// [`BacktestDataFeed::next_step`] moves through.
    pub fn get(&mut self, time: Timestamp) -> FeedStep<'_> {
        for cursor in &mut self.cursors {
            cursor.advance(time);
        }
        self.snapshot(time)
    }

    /// Move to the next K-line timestamp
    pub fn next_step(&mut self) -> Option<FeedStep<'_>> {
        let time = *self.timeline.get(self.next_step)?;
        self.next_step += 1;
        Some(self.get(time))
    }

    fn snapshot(&self, time: Timestamp) -> FeedStep<'_> {
        FeedStep {
            date: time,
            symbols: self.cursors.iter().map(SymbolCursor::snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        ts(s).date()
    }

    fn kline(d: &str, price: Decimal) -> KlineRow {
        KlineRow {
            symbol: "000001.SZ".to_string(),
            date: ts(d),
            open_price: price,
            high_price: price,
            low_price: price,
            close_price: price,
            volume: dec!(100),
            turnover: Decimal::ZERO,
            change_percent: Decimal::ZERO,
        }
    }

    fn series() -> SymbolSeries {
        let mut s = SymbolSeries::new("000001.SZ".parse().unwrap());
        s.klines = vec![
            kline("2025-06-10", dec!(12.5)),
            kline("2025-06-11", dec!(12.5)),
            kline("2025-06-12", dec!(10)),
        ];
        s.dividends = vec![DividendRecord {
            ex_dividend_date: date("2025-06-12"),
            total_transfer_ratio: dec!(2.5),
            cash_dividend: dec!(2),
        }];
        s.financials = vec![FinancialRecord {
            report_date: date("2025-06-10"),
            fields: BTreeMap::new(),
        }];
        s
    }

    #[test]
    fn test_streaming_steps() {
        let mut feed = BacktestDataFeed::from_series(vec![series()], KLineType::Daily, FeedMode::Streaming).unwrap();
        assert_eq!(feed.remaining_steps(), 3);

        let step = feed.next_step().unwrap();
        assert_eq!(step.date, ts("2025-06-10"));
        let data = &step.symbols[0];
        assert_eq!(data.kline_data.len(), 1);
        assert!(data.financial_data.is_empty());
        assert!(data.dividend_info.is_empty());

        let step = feed.next_step().unwrap();
        assert_eq!(step.symbols[0].financial_data.len(), 1);
        assert_eq!(step.symbols[0].forward_adjusted_kline_data[1].close_price, dec!(12.5));

        let step = feed.next_step().unwrap();
        let data = &step.symbols[0];
        assert_eq!(data.dividend_info.len(), 1);
        assert_eq!(data.forward_adjusted_kline_data[0].close_price, dec!(9.84));
        assert_eq!(data.forward_adjusted_kline_data[2].close_price, dec!(10));
        assert_eq!(data.kline_data[0].close_price, dec!(12.5));

        assert!(feed.next_step().is_none());
    }

    #[test]
    fn test_point_in_time_lags_klines() {
        let mut feed = BacktestDataFeed::from_series(vec![series()], KLineType::Daily, FeedMode::PointInTime).unwrap();
        let step = feed.get(ts("2025-06-12"));
        let data = step.symbol(&"000001.SZ".parse().unwrap()).unwrap();
        assert_eq!(data.latest_kline().unwrap().date, ts("2025-06-11"));
        assert_eq!(data.dividend_info.len(), 1);
        assert_eq!(data.latest_report().unwrap().report_date, date("2025-06-10"));
    }

    #[test]
    fn test_restrict_range() {
        let restricted = series().restrict(Some(date("2025-06-11")), Some(date("2025-06-11")));
        assert_eq!(restricted.klines.len(), 1);
        assert!(restricted.dividends.is_empty());
        assert!(restricted.financials.is_empty());
    }

    #[test]
    fn test_weekly_rejected() {
        let result = BacktestDataFeed::from_series(vec![series()], KLineType::Weekly, FeedMode::Streaming);
        assert!(matches!(result, Err(BacktestError::UnsupportedKline(_))));
    }
}
