//! Backtest replay loop
//!
//! Walks the feed step by step and drives the ledger and the strategy:
//!
//! 1. On the first step of a new trading day the previous day is closed
//!    (`end_day` at the last seen closes), the clock moves, the ledger opens
//!    the day (`start_day`, which applies dividends), and the strategy gets
//!    `on_fundamentals`. Later steps of the same day only move the clock.
//! 2. Targets the strategy returned on the previous step are executed at the
//!    open of the current step's bar for that symbol. A target for a symbol
//!    without a fresh bar waits for one.
//! 3. The fresh bars go to `on_universe`, whose targets wait for the next
//!    step.
//!
//! After the last step the final day is closed as well.

use crate::clock::VirtualClock;
use crate::data::BacktestDataFeed;
use crate::error::Result;
use crate::finance::{Account, DaySummary, FeeSchedule, LedgerSinks, SubmitResult, TradingSystem};
use crate::order::{Order, OrderSide};
use crate::performance::{EquityCurve, PerformanceSummary};
use crate::strategy::{Strategy, TargetPosition};
use crate::symbol::Symbol;
use crate::types::{Bar, Price, Timestamp};
use chrono::NaiveDate;
use hashbrown::HashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Starting state of the ledger
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub account: Account,
    pub fees: FeeSchedule,
}

/// Result of a replay
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub trading_days: usize,
    pub orders_submitted: usize,
    pub orders_rejected: usize,
    pub trades_executed: usize,
    pub final_account: Account,
    pub equity: EquityCurve,
    pub days: Vec<DaySummary>,
}

impl BacktestReport {
    pub fn performance(&self) -> PerformanceSummary {
        self.equity.summary()
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    trading_days: usize,
    orders_submitted: usize,
    orders_rejected: usize,
    trades_executed: usize,
}

/// Replay engine owning the ledger for one run
pub struct BacktestEngine {
    ledger: TradingSystem,
    clock: Arc<VirtualClock>,
    sinks: LedgerSinks,
    order_seq: u64,
    counters: RunCounters,
    equity: EquityCurve,
    days: Vec<DaySummary>,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig, clock: Arc<VirtualClock>, sinks: LedgerSinks) -> Self {
        let ledger = TradingSystem::new(config.account, clock.clone(), config.fees);
        Self {
            ledger,
            clock,
            sinks,
            order_seq: 0,
            counters: RunCounters::default(),
            equity: EquityCurve::new(),
            days: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &TradingSystem {
        &self.ledger
    }

    /// Replay the whole feed
    pub fn run<S>(&mut self, feed: &mut BacktestDataFeed, strategy: &mut S) -> Result<BacktestReport>
    where
        S: Strategy + ?Sized,
    {
        let kline_type = feed.kline_type();
        log::info!(
            "Starting backtest: {} steps, {} K-lines, strategy {}",
            feed.remaining_steps(),
            kline_type,
            strategy.name()
        );

        let mut current_day: Option<NaiveDate> = None;
        let mut pending: Vec<TargetPosition> = Vec::new();
        let mut last_bar_time: HashMap<Symbol, Timestamp> = HashMap::new();
        let mut last_close: HashMap<Symbol, Price> = HashMap::new();

        while let Some(step) = feed.next_step() {
            let day = step.date.date();
            if current_day != Some(day) {
                if current_day.is_some() {
                    self.close_day(&last_close)?;
                }
                self.clock.set_time(step.date);
                self.ledger.start_day(step.dividends());
                strategy.on_fundamentals(&step, self.ledger.account())?;
                current_day = Some(day);
                self.counters.trading_days += 1;
            } else {
                self.clock.set_time(step.date);
            }

            let mut bars: Vec<Bar> = Vec::new();
            for data in &step.symbols {
                let Some(row) = data.latest_kline() else {
                    continue;
                };
                let fresh = last_bar_time
                    .get(data.symbol)
                    .map_or(true, |seen| row.date > *seen);
                if fresh {
                    last_bar_time.insert(data.symbol.clone(), row.date);
                    last_close.insert(data.symbol.clone(), row.close_price);
                    bars.push(row.to_bar(data.symbol, kline_type));
                }
            }

            pending = self.execute_targets(pending, &bars)?;

            let targets = strategy.on_universe(&bars)?;
            if !targets.is_empty() {
                pending.retain(|p| !targets.iter().any(|t| t.symbol == p.symbol));
                pending.extend(targets);
            }
        }

        if current_day.is_some() {
            self.close_day(&last_close)?;
        }
        if !pending.is_empty() {
            log::warn!("{} targets never executed", pending.len());
        }

        let report = BacktestReport {
            trading_days: self.counters.trading_days,
            orders_submitted: self.counters.orders_submitted,
            orders_rejected: self.counters.orders_rejected,
            trades_executed: self.counters.trades_executed,
            final_account: self.ledger.account().clone(),
            equity: self.equity.clone(),
            days: self.days.clone(),
        };
        log::info!(
            "Backtest complete: {} days, {} trades, final balance {}",
            report.trading_days,
            report.trades_executed,
            report.final_account.balance()
        );
        Ok(report)
    }

    fn close_day(&mut self, prices: &HashMap<Symbol, Price>) -> Result<()> {
        let summary = self.ledger.end_day_into(&mut self.sinks, prices)?;
        self.equity.record(summary.date, summary.total_asset);
        self.days.push(summary);
        Ok(())
    }

    /// Trade toward each target whose symbol has a bar in `bars`, and hand
    /// back the targets still waiting.
    fn execute_targets(&mut self, targets: Vec<TargetPosition>, bars: &[Bar]) -> Result<Vec<TargetPosition>> {
        let mut waiting = Vec::new();
        for target in targets {
            let Some(bar) = bars.iter().find(|b| b.symbol == target.symbol) else {
                waiting.push(target);
                continue;
            };

            let held = self.ledger.account().quantity_of(&target.symbol);
            let delta = target.quantity - held;
            if delta == Decimal::ZERO {
                continue;
            }
            let side = if delta > Decimal::ZERO {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            let quantity = delta.abs();

            self.order_seq += 1;
            let order = Order::limit(
                format!("O{:08}", self.order_seq),
                self.ledger.account().account_id(),
                target.symbol.clone(),
                side,
                quantity,
                bar.open,
            )?;

            self.counters.orders_submitted += 1;
            match self.ledger.submit_order(order) {
                SubmitResult::Accepted { order_id } => {
                    self.ledger.execute_trade(&order_id, quantity, bar.open)?;
                    self.counters.trades_executed += 1;
                }
                SubmitResult::Rejected { reason, .. } => {
                    self.counters.orders_rejected += 1;
                    log::warn!(
                        "Target {} {} not reached: {}",
                        target.symbol,
                        target.quantity,
                        reason
                    );
                }
            }
        }
        Ok(waiting)
    }
}
