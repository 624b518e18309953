//! Equity curve and return statistics
//!
//! The ledger keeps money in `Decimal`; statistics are computed in `f64`
//! since they are reported, never booked.

use crate::types::Cash;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Total asset at each trading-day close
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<(NaiveDate, f64)>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the close of `date`. A second record for the same date
    /// replaces the first.
    pub fn record(&mut self, date: NaiveDate, total_asset: Cash) {
        let value = total_asset.to_f64().unwrap_or(0.0);
        match self.points.last_mut() {
            Some(last) if last.0 == date => last.1 = value,
            _ => self.points.push((date, value)),
        }
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close-to-close returns
    pub fn daily_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| if w[0].1 == 0.0 { 0.0 } else { w[1].1 / w[0].1 - 1.0 })
            .collect()
    }

    /// Return from the first to the last close
    pub fn total_return(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if first.1 != 0.0 => last.1 / first.1 - 1.0,
            _ => 0.0,
        }
    }

    /// Total return scaled to a year of trading days
    pub fn annualized_return(&self) -> f64 {
        let periods = self.daily_returns().len();
        if periods == 0 {
            return 0.0;
        }
        let years = periods as f64 / TRADING_DAYS_PER_YEAR;
        (1.0 + self.total_return()).powf(1.0 / years) - 1.0
    }

    /// Largest peak-to-trough loss as a fraction of the peak
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = f64::MIN;
        let mut max_dd = 0.0;
        for &(_, value) in &self.points {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                let drawdown = (peak - value) / peak;
                if drawdown > max_dd {
                    max_dd = drawdown;
                }
            }
        }
        max_dd
    }

    /// Annualized Sharpe ratio with a zero risk-free rate
    pub fn sharpe_ratio(&self) -> f64 {
        let returns = self.daily_returns();
        if returns.len() < 2 {
            return 0.0;
        }
        let sd = std_dev(&returns);
        if sd == 0.0 {
            0.0
        } else {
            mean(&returns) / sd * TRADING_DAYS_PER_YEAR.sqrt()
        }
    }

    /// Day with the largest close-to-close gain, and the one with the
    /// largest loss
    pub fn best_and_worst_days(&self) -> Option<((NaiveDate, f64), (NaiveDate, f64))> {
        let days: Vec<(NaiveDate, f64)> = self
            .points
            .iter()
            .skip(1)
            .map(|p| p.0)
            .zip(self.daily_returns())
            .collect();
        let best = days.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1))?;
        let worst = days.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1))?;
        Some((best, worst))
    }

    pub fn summary(&self) -> PerformanceSummary {
        let extremes = self.best_and_worst_days();
        PerformanceSummary {
            first_day: self.points.first().map(|p| p.0),
            last_day: self.points.last().map(|p| p.0),
            trading_days: self.points.len(),
            opening_asset: self.points.first().map_or(0.0, |p| p.1),
            closing_asset: self.points.last().map_or(0.0, |p| p.1),
            total_return: self.total_return(),
            annualized_return: self.annualized_return(),
            max_drawdown: self.max_drawdown(),
            sharpe_ratio: self.sharpe_ratio(),
            best_day: extremes.map(|e| e.0),
            worst_day: extremes.map(|e| e.1),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Replay result over the trading days of a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub trading_days: usize,
    /// Total asset at the first close
    pub opening_asset: f64,
    /// Total asset at the last close
    pub closing_asset: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub best_day: Option<(NaiveDate, f64)>,
    pub worst_day: Option<(NaiveDate, f64)>,
}

impl std::fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.first_day, self.last_day) {
            (Some(first), Some(last)) => writeln!(
                f,
                "Replay {} to {}, {} trading days",
                first, last, self.trading_days
            )?,
            _ => return writeln!(f, "Replay closed no trading days"),
        }
        writeln!(
            f,
            "  total asset   {:.2} -> {:.2} ({:+.2}%)",
            self.opening_asset,
            self.closing_asset,
            self.total_return * 100.0
        )?;
        writeln!(
            f,
            "  annualized    {:+.2}% ({} days a year)",
            self.annualized_return * 100.0,
            TRADING_DAYS_PER_YEAR
        )?;
        writeln!(f, "  max drawdown  {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  sharpe        {:.2}", self.sharpe_ratio)?;
        if let (Some(best), Some(worst)) = (self.best_day, self.worst_day) {
            writeln!(f, "  best day      {} {:+.2}%", best.0, best.1 * 100.0)?;
            writeln!(f, "  worst day     {} {:+.2}%", worst.0, worst.1 * 100.0)?;
        }
        Ok(())
    }
}
