//! Strategy interface and the strategies shipped with the crate

use crate::data::FeedStep;
use crate::error::{BacktestError, Result};
use crate::finance::Account;
use crate::symbol::Symbol;
use crate::types::{Bar, Quantity, Timestamp};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired holding of a symbol after the next execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub symbol: Symbol,
    pub quantity: Quantity,
}

impl TargetPosition {
    pub fn new(symbol: Symbol, quantity: Quantity) -> Self {
        Self { symbol, quantity }
    }
}

/// Trading strategy driven by the replay loop
pub trait Strategy {
    /// Called once per trading day, after the ledger has applied that day's
    /// dividends and transfers, with everything visible at the day's first
    /// step.
    fn on_fundamentals(&mut self, step: &FeedStep<'_>, account: &Account) -> Result<()>;

    /// Called with the fresh bars of every step. The returned targets are
    /// executed at the next step's open.
    fn on_universe(&mut self, bars: &[Bar]) -> Result<Vec<TargetPosition>>;

    fn name(&self) -> &str {
        "strategy"
    }
}

/// Fail when a held symbol is missing from the feed; its prices could
/// never be valued.
pub fn ensure_holdings_covered(step: &FeedStep<'_>, account: &Account) -> Result<()> {
    for position in account.held_positions() {
        if step.symbol(position.symbol()).is_none() {
            return Err(BacktestError::StrategyError(format!(
                "held symbol {} is not in the feed",
                position.symbol()
            )));
        }
    }
    Ok(())
}

/// Buys a fixed quantity of every symbol the first time it trades, then
/// holds.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    quantity: Quantity,
    targeted: HashSet<Symbol>,
}

impl BuyAndHold {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity,
            targeted: HashSet::new(),
        }
    }
}

impl Strategy for BuyAndHold {
    fn on_fundamentals(&mut self, step: &FeedStep<'_>, account: &Account) -> Result<()> {
        ensure_holdings_covered(step, account)
    }

    fn on_universe(&mut self, bars: &[Bar]) -> Result<Vec<TargetPosition>> {
        let mut targets = Vec::new();
        for bar in bars {
            if self.targeted.insert(bar.symbol.clone()) {
                targets.push(TargetPosition::new(bar.symbol.clone(), self.quantity));
            }
        }
        Ok(targets)
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}

/// Emits preset targets when a bar ending at a scheduled time arrives.
/// Each schedule entry fires once.
#[derive(Debug, Clone, Default)]
pub struct ScheduledTargets {
    schedule: BTreeMap<Timestamp, Vec<TargetPosition>>,
}

impl ScheduledTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, time: Timestamp, targets: Vec<TargetPosition>) -> Self {
        self.schedule.entry(time).or_default().extend(targets);
        self
    }

    /// Entries that have not fired yet
    pub fn pending(&self) -> usize {
        self.schedule.len()
    }
}

impl Strategy for ScheduledTargets {
    fn on_fundamentals(&mut self, step: &FeedStep<'_>, account: &Account) -> Result<()> {
        ensure_holdings_covered(step, account)
    }

    fn on_universe(&mut self, bars: &[Bar]) -> Result<Vec<TargetPosition>> {
        let mut times: Vec<Timestamp> = bars.iter().map(|b| b.end_timestamp).collect();
        times.sort();
        times.dedup();

        let mut targets = Vec::new();
        for time in times {
            if let Some(entry) = self.schedule.remove(&time) {
                log::debug!("Scheduled targets at {}: {} symbols", time, entry.len());
                targets.extend(entry);
            }
        }
        Ok(targets)
    }

    fn name(&self) -> &str {
        "scheduled_targets"
    }
}
