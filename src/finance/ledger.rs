//! Trading ledger - order freezing, execution and day boundaries
//!
//! [`TradingSystem`] owns one [`Account`] and is the only code that mutates
//! it. Every order reserves what it needs when it is submitted (cash for buys,
//! shares for sells) and releases or consumes that reservation when it is
//! cancelled or executed, so `balance == available + frozen` holds after every
//! call.
//!
//! Two kinds of failure are kept apart:
//!
//! - insufficient funds or shares at submission is an ordinary outcome and is
//!   reported through [`SubmitResult::Rejected`];
//! - a broken invariant (negative cash, executing more than remains) means the
//!   bookkeeping is wrong, and the ledger panics rather than continue with
//!   corrupted state.

use crate::clock::Clock;
use crate::data::records::DividendRecord;
use crate::error::{BacktestError, Result};
use crate::finance::account::Account;
use crate::finance::constants::SHARES_PER_RATIO_UNIT;
use crate::finance::fees::FeeSchedule;
use crate::finance::pnl::{DaySummary, PnlRecord};
use crate::finance::position::Position;
use crate::finance::sink::{LedgerSinks, RecordSink};
use crate::finance::trade::{Trade, TradeStatus};
use crate::order::{Order, OrderSide, OrderStatus};
use crate::symbol::Symbol;
use crate::types::{Cash, Price, Quantity};
use hashbrown::HashMap;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Why an order could not be submitted
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    InsufficientFunds { required: Cash, available: Cash },
    InsufficientShares { required: Quantity, available: Quantity },
    DuplicateOrderId,
    /// The order was already submitted, filled or otherwise processed
    NotPending(OrderStatus),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientFunds {
                required,
                available,
            } => write!(f, "insufficient funds: need {}, available {}", required, available),
            RejectReason::InsufficientShares {
                required,
                available,
            } => write!(f, "insufficient shares: need {}, available {}", required, available),
            RejectReason::DuplicateOrderId => write!(f, "duplicate order id"),
            RejectReason::NotPending(status) => write!(f, "order is already {}", status),
        }
    }
}

/// Outcome of [`TradingSystem::submit_order`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Accepted { order_id: String },
    /// The order comes back marked `Rejected`; the ledger does not keep it.
    Rejected {
        order: Box<Order>,
        reason: RejectReason,
    },
}

impl SubmitResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitResult::Accepted { .. })
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            SubmitResult::Accepted { .. } => None,
            SubmitResult::Rejected { reason, .. } => Some(reason),
        }
    }
}

/// Single-account ledger
pub struct TradingSystem {
    account: Account,
    clock: Arc<dyn Clock>,
    fees: FeeSchedule,
    /// Orders of the current session, in submission order
    orders: Vec<Order>,
    order_index: HashMap<String, usize>,
    /// Trades of the current session, in execution order
    trades: Vec<Trade>,
    trade_seq: u64,
}

impl TradingSystem {
    pub fn new(account: Account, clock: Arc<dyn Clock>, fees: FeeSchedule) -> Self {
        account.assert_consistent();
        log::info!(
            "Ledger opened for account {} with balance {}",
            account.account_id(),
            account.balance()
        );
        Self {
            account,
            clock,
            fees,
            orders: Vec::new(),
            order_index: HashMap::new(),
            trades: Vec::new(),
            trade_seq: 0,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Give up the ledger and keep the account
    pub fn into_account(self) -> Account {
        self.account
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.account.position(symbol)
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.order_index.get(order_id).map(|&i| &self.orders[i])
    }

    /// Orders submitted in the current session
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Orders still waiting for execution
    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.status.is_open())
    }

    /// Trades executed in the current session
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Reserve cash or shares for an order and start tracking it.
    pub fn submit_order(&mut self, mut order: Order) -> SubmitResult {
        let now = self.clock.now();

        let rejection = if order.status != OrderStatus::Pending {
            Some(RejectReason::NotPending(order.status))
        } else if self.order_index.contains_key(&order.order_id) {
            Some(RejectReason::DuplicateOrderId)
        } else {
            self.freeze(&order).err()
        };

        if let Some(reason) = rejection {
            log::warn!("Order {} rejected: {}", order.order_id, reason);
            if order.status == OrderStatus::Pending {
                order.reject(now);
            }
            return SubmitResult::Rejected {
                order: Box::new(order),
                reason,
            };
        }

        order.submit(now);
        log::debug!("Order submitted: {}", order);
        let order_id = order.order_id.clone();
        self.order_index.insert(order_id.clone(), self.orders.len());
        self.orders.push(order);
        self.account.assert_consistent();

        SubmitResult::Accepted { order_id }
    }

    /// Cancel an open order and release what it still holds frozen.
    ///
    /// Returns `false` for unknown ids and orders that are no longer open,
    /// so a second cancel is a no-op.
    pub fn cancel_order(&mut self, order_id: &str) -> bool {
        let Some(&idx) = self.order_index.get(order_id) else {
            return false;
        };
        if !self.orders[idx].status.is_open() {
            return false;
        }

        self.release(idx);
        let now = self.clock.now();
        self.orders[idx].cancel(now);
        log::debug!("Order cancelled: {}", self.orders[idx]);
        self.account.assert_consistent();
        true
    }

    /// Execute `quantity` of an open order at `price`.
    ///
    /// # Panics
    ///
    /// If `quantity` exceeds the order's remaining quantity, or if the fill
    /// leaves a negative balance or position. A buy executed above its limit
    /// price can do the latter when the account has no spare cash.
    pub fn execute_trade(&mut self, order_id: &str, quantity: Quantity, price: Price) -> Result<Trade> {
        let idx = *self
            .order_index
            .get(order_id)
            .ok_or_else(|| BacktestError::OrderNotFound(order_id.to_string()))?;

        let order = &self.orders[idx];
        if !order.status.is_open() {
            return Err(BacktestError::OrderNotOpen {
                order_id: order_id.to_string(),
                status: order.status.to_string(),
            });
        }
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(BacktestError::InvalidTrade {
                order_id: order_id.to_string(),
                reason: format!("quantity {} and price {} must be positive", quantity, price),
            });
        }
        assert!(
            quantity <= order.remaining_quantity,
            "execution of {} exceeds remaining quantity {} of order {}",
            quantity,
            order.remaining_quantity,
            order_id
        );

        let side = order.side;
        let symbol = order.symbol.clone();
        let limit_price = order.price;

        let amount = quantity * price;
        let commission = self.fees.commission(amount);
        let tax = self.fees.tax(side, amount);

        match side {
            OrderSide::Buy => {
                let spent = amount + commission + tax;
                let freed = self.fees.buy_reservation(quantity, limit_price);
                self.account.frozen_balance -= freed;
                self.account.available_balance += freed - spent;
                self.account.balance -= spent;

                let position = self.account.position_entry(&symbol);
                position.quantity += quantity;
                position.frozen_quantity += quantity;
                position.cost += spent;
            }
            OrderSide::Sell => {
                let received = amount - commission - tax;
                let position = self
                    .account
                    .position_mut(&symbol)
                    .unwrap_or_else(|| panic!("sell order {} has no position in {}", order_id, symbol));
                position.quantity -= quantity;
                position.frozen_quantity -= quantity;
                position.cost -= received;

                self.account.available_balance += received;
                self.account.balance += received;
            }
        }
        self.account.commission_total += commission;
        self.account.tax_total += tax;

        let now = self.clock.now();
        self.orders[idx].fill(quantity, now);

        self.trade_seq += 1;
        let trade = Trade {
            trade_id: format!("T{}{:08}", now.format("%Y%m%d"), self.trade_seq),
            order_id: order_id.to_string(),
            symbol,
            side,
            quantity,
            price,
            amount,
            commission,
            tax,
            status: TradeStatus::Confirmed,
            trade_time: now,
            settle_time: None,
            account_id: self.account.account_id.clone(),
        };

        self.account.assert_consistent();
        log::debug!(
            "Trade {}: {:?} {} {} @ {} (commission {}, tax {})",
            trade.trade_id,
            side,
            quantity,
            trade.symbol,
            price,
            commission,
            tax
        );
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Open a trading day.
    ///
    /// Yesterday's purchases become available, then dividend and transfer
    /// records whose ex-dividend date is today are applied to held symbols.
    /// Cash dividends lower the cost basis; transferred shares are available
    /// immediately.
    pub fn start_day<'a, I>(&mut self, dividends: I)
    where
        I: IntoIterator<Item = (&'a Symbol, &'a [DividendRecord])>,
    {
        let today = self.clock.today();

        for position in self.account.positions.values_mut() {
            position.available_quantity += position.frozen_quantity;
            position.frozen_quantity = Decimal::ZERO;
            assert_eq!(
                position.available_quantity, position.quantity,
                "position {} still has frozen shares at day start",
                position.symbol
            );
        }

        for (symbol, records) in dividends {
            for record in records.iter().filter(|r| r.ex_dividend_date == today) {
                let Some(position) = self.account.positions.get_mut(symbol) else {
                    continue;
                };
                if !position.is_held() {
                    continue;
                }

                let units = position.quantity / SHARES_PER_RATIO_UNIT;
                let cash = units * record.cash_dividend;
                let shares = units * record.total_transfer_ratio;

                position.cost -= cash;
                position.quantity += shares;
                position.available_quantity += shares;
                self.account.balance += cash;
                self.account.available_balance += cash;

                log::info!(
                    "{} ex-dividend on {}: cash {} transfer {} shares",
                    symbol,
                    today,
                    cash,
                    shares
                );
            }
        }

        self.account.assert_consistent();
        log::info!(
            "Day started {}: balance {}, {} held positions",
            today,
            self.account.balance(),
            self.account.held_positions().count()
        );
    }

    /// Close a trading day.
    ///
    /// Open orders are cancelled, the session's orders and trades are flushed
    /// and cleared, and one PNL row per held symbol is written at `prices`.
    /// Every held symbol must have a price; a missing one fails the call
    /// before anything changes.
    pub fn end_day(
        &mut self,
        order_sink: &mut dyn RecordSink<Order>,
        trade_sink: &mut dyn RecordSink<Trade>,
        pnl_sink: &mut dyn RecordSink<PnlRecord>,
        prices: &HashMap<Symbol, Price>,
    ) -> Result<DaySummary> {
        let now = self.clock.now();
        let date = now.date();

        if let Some(missing) = self
            .account
            .held_positions()
            .find(|p| !prices.contains_key(p.symbol()))
        {
            return Err(BacktestError::MissingPrice {
                symbol: missing.symbol().to_string(),
                date: now,
            });
        }

        let open: Vec<String> = self.open_orders().map(|o| o.order_id.clone()).collect();
        for order_id in &open {
            self.cancel_order(order_id);
        }

        self.orders.sort_by_key(|o| o.create_time);
        self.reindex_orders();
        self.trades.sort_by_key(|t| t.trade_time);
        order_sink.write_records(&self.orders)?;
        trade_sink.write_records(&self.trades)?;

        let liquidation = self.fees.liquidation_factor();
        let mut market_value = Decimal::ZERO;
        let mut profit_loss = Decimal::ZERO;
        let mut records = Vec::new();
        for position in self.account.held_positions() {
            let price = prices[position.symbol()];
            let value = position.market_value(price);
            let pnl = value * liquidation - position.cost();
            market_value += value;
            profit_loss += pnl;
            records.push(PnlRecord {
                date,
                account_id: self.account.account_id().to_string(),
                symbol: position.symbol().clone(),
                quantity: position.quantity(),
                cost: position.cost(),
                market_value: value,
                profit_loss: pnl,
            });
        }
        pnl_sink.write_records(&records)?;

        let summary = DaySummary {
            date,
            orders: self.orders.len(),
            trades: self.trades.len(),
            cancelled_at_close: open.len(),
            market_value,
            total_asset: self.account.balance() + market_value,
            profit_loss,
        };

        self.orders.clear();
        self.order_index.clear();
        self.trades.clear();

        log::info!(
            "Day closed {}: {} orders, {} trades, total asset {}",
            date,
            summary.orders,
            summary.trades,
            summary.total_asset
        );
        Ok(summary)
    }

    /// [`TradingSystem::end_day`] into a [`LedgerSinks`] bundle
    pub fn end_day_into(
        &mut self,
        sinks: &mut LedgerSinks,
        prices: &HashMap<Symbol, Price>,
    ) -> Result<DaySummary> {
        self.end_day(
            sinks.orders.as_mut(),
            sinks.trades.as_mut(),
            sinks.pnl.as_mut(),
            prices,
        )
    }

    fn reindex_orders(&mut self) {
        self.order_index = self
            .orders
            .iter()
            .enumerate()
            .map(|(i, o)| (o.order_id.clone(), i))
            .collect();
    }

    /// Reserve what `order` needs, or say why it cannot be reserved
    fn freeze(&mut self, order: &Order) -> std::result::Result<(), RejectReason> {
        match order.side {
            OrderSide::Buy => {
                let required = self
                    .fees
                    .buy_reservation(order.remaining_quantity, order.price);
                let available = self.account.available_balance;
                if available < required {
                    return Err(RejectReason::InsufficientFunds {
                        required,
                        available,
                    });
                }
                self.account.available_balance -= required;
                self.account.frozen_balance += required;
            }
            OrderSide::Sell => {
                let required = order.remaining_quantity;
                let available = self
                    .account
                    .position(&order.symbol)
                    .map(|p| p.available_quantity())
                    .unwrap_or(Decimal::ZERO);
                if available < required {
                    return Err(RejectReason::InsufficientShares {
                        required,
                        available,
                    });
                }
                if let Some(position) = self.account.position_mut(&order.symbol) {
                    position.available_quantity -= required;
                    position.frozen_quantity += required;
                }
            }
        }
        Ok(())
    }

    /// Undo the part of the freeze that belongs to the unfilled remainder
    fn release(&mut self, idx: usize) {
        let order = &self.orders[idx];
        match order.side {
            OrderSide::Buy => {
                let amount = self
                    .fees
                    .buy_reservation(order.remaining_quantity, order.price);
                self.account.frozen_balance -= amount;
                self.account.available_balance += amount;
            }
            OrderSide::Sell => {
                let remaining = order.remaining_quantity;
                if let Some(position) = self.account.positions.get_mut(&order.symbol) {
                    position.frozen_quantity -= remaining;
                    position.available_quantity += remaining;
                }
            }
        }
    }
}

impl fmt::Debug for TradingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradingSystem")
            .field("account", &self.account)
            .field("fees", &self.fees)
            .field("orders", &self.orders.len())
            .field("trades", &self.trades.len())
            .finish()
    }
}
