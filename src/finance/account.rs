//! Cash account with positions
//!
//! The account is owned by the ledger. Callers seed it (initial cash and
//! opening holdings) before handing it over, and read it afterwards; every
//! balance movement in between happens inside [`crate::finance::TradingSystem`].

use crate::finance::position::Position;
use crate::symbol::Symbol;
use crate::types::{Cash, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Funds and holdings of a single trading account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub(crate) account_id: String,
    pub(crate) balance: Cash,
    pub(crate) available_balance: Cash,
    pub(crate) frozen_balance: Cash,
    pub(crate) positions: BTreeMap<Symbol, Position>,
    pub(crate) commission_total: Cash,
    pub(crate) tax_total: Cash,
}

impl Account {
    /// Create an account holding only cash
    pub fn new(account_id: impl Into<String>, cash: Cash) -> Self {
        Self {
            account_id: account_id.into(),
            balance: cash,
            available_balance: cash,
            frozen_balance: Decimal::ZERO,
            positions: BTreeMap::new(),
            commission_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
        }
    }

    /// Add an opening holding, fully available, with the given cash basis
    pub fn with_position(mut self, symbol: Symbol, quantity: Quantity, cost: Cash) -> Self {
        self.positions
            .insert(symbol.clone(), Position::opening(symbol, quantity, cost));
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn balance(&self) -> Cash {
        self.balance
    }

    pub fn available_balance(&self) -> Cash {
        self.available_balance
    }

    pub fn frozen_balance(&self) -> Cash {
        self.frozen_balance
    }

    pub fn commission_total(&self) -> Cash {
        self.commission_total
    }

    pub fn tax_total(&self) -> Cash {
        self.tax_total
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// All positions, including ones that have gone flat
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Positions with a positive quantity
    pub fn held_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_held())
    }

    /// Held quantity of a symbol, zero when absent
    pub fn quantity_of(&self, symbol: &Symbol) -> Quantity {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Market value of held positions at the given prices; symbols without a
    /// price contribute nothing.
    pub fn market_value<F>(&self, price_of: F) -> Cash
    where
        F: Fn(&Symbol) -> Option<Price>,
    {
        self.held_positions()
            .filter_map(|p| price_of(&p.symbol).map(|price| p.market_value(price)))
            .sum()
    }

    pub(crate) fn position_mut(&mut self, symbol: &Symbol) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    pub(crate) fn position_entry(&mut self, symbol: &Symbol) -> &mut Position {
        self.positions
            .entry(symbol.clone())
            .or_insert_with(|| Position::flat(symbol.clone()))
    }

    /// Panic if any cash bucket is negative or the buckets do not add up
    pub(crate) fn assert_consistent(&self) {
        assert!(
            self.balance >= Decimal::ZERO,
            "account {} balance is negative: {}",
            self.account_id,
            self.balance
        );
        assert!(
            self.available_balance >= Decimal::ZERO,
            "account {} available balance is negative: {}",
            self.account_id,
            self.available_balance
        );
        assert!(
            self.frozen_balance >= Decimal::ZERO,
            "account {} frozen balance is negative: {}",
            self.account_id,
            self.frozen_balance
        );
        assert_eq!(
            self.balance,
            self.available_balance + self.frozen_balance,
            "account {} balance does not match available + frozen",
            self.account_id
        );
        for position in self.positions.values() {
            position.assert_consistent();
        }
    }
}
