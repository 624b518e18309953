//! Forward price adjustment for dividends and share transfers
//!
//! Prices before an ex-dividend date are rewritten onto the post-event scale:
//!
//! ```text
//! adjusted = (raw * 10 - cash_dividend) / (10 + total_transfer_ratio)
//! ```
//!
//! Events are applied oldest first, so a row before several events is
//! adjusted once per event. Volume and turnover keep their raw values; they
//! are not comparable across an event after adjustment.

use crate::data::records::{Dated, DividendRecord, KlineRow};
use crate::finance::constants::SHARES_PER_RATIO_UNIT;
use crate::types::{start_of_day, Price};
use chrono::NaiveDate;

/// Forward-adjust `kline` for every event in `dividends`
pub fn forward_adjust(kline: &[KlineRow], dividends: &[DividendRecord]) -> Vec<KlineRow> {
    let mut rows = kline.to_vec();

    let mut events: Vec<&DividendRecord> = dividends.iter().collect();
    events.sort_by_key(|d| d.ex_dividend_date);

    for event in events {
        let cutoff = start_of_day(event.ex_dividend_date);
        let divisor = SHARES_PER_RATIO_UNIT + event.total_transfer_ratio;
        let adjust = |price: Price| -> Price {
            price * SHARES_PER_RATIO_UNIT / divisor - event.cash_dividend / divisor
        };

        for row in rows.iter_mut().filter(|r| r.date < cutoff) {
            row.open_price = adjust(row.open_price);
            row.high_price = adjust(row.high_price);
            row.low_price = adjust(row.low_price);
            row.close_price = adjust(row.close_price);
        }
    }

    rows
}

/// Incrementally maintained forward-adjusted series for one symbol.
///
/// The cached series is valid for the dividend events up to
/// `last_ex_date`. While no newer event shows up, new K-line rows are only
/// appended. A newer event changes every earlier price, so the whole series is
/// rebuilt.
#[derive(Debug, Clone, Default)]
pub struct ForwardAdjustCache {
    rows: Vec<KlineRow>,
    last_ex_date: Option<NaiveDate>,
    built: bool,
    rebuilds: usize,
}

impl ForwardAdjustCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cache up to date with the visible `kline` and `dividends`
    /// and return the adjusted series.
    pub fn update(&mut self, kline: &[KlineRow], dividends: &[DividendRecord]) -> &[KlineRow] {
        let latest_event = dividends.iter().map(|d| d.ex_dividend_date).max();
        let last_cached = self.rows.last().map(|r| r.timestamp());
        let fresh = kline
            .iter()
            .filter(|r| last_cached.map_or(true, |last| r.timestamp() > last));

        let needs_rebuild = !self.built
            || latest_event != self.last_ex_date
            || fresh.clone().any(|r| {
                latest_event.map_or(false, |ex| r.timestamp() < start_of_day(ex))
            });

        if needs_rebuild {
            self.rows = forward_adjust(kline, dividends);
            self.last_ex_date = latest_event;
            self.built = true;
            self.rebuilds += 1;
        } else {
            let appended: Vec<KlineRow> = fresh.cloned().collect();
            self.rows.extend(appended);
        }

        &self.rows
    }

    /// Adjusted series as of the last update
    pub fn rows(&self) -> &[KlineRow] {
        &self.rows
    }

    /// Latest ex-dividend date folded into the series
    pub fn last_ex_date(&self) -> Option<NaiveDate> {
        self.last_ex_date
    }

    /// Number of full recomputations so far
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}
