//! Per-symbol holdings

use crate::symbol::Symbol;
use crate::types::{Cash, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holding in a single symbol.
///
/// `quantity == available_quantity + frozen_quantity` after every mutation.
/// `cost` is the aggregate cash basis, not a per-lot record. Mutation goes
/// through the ledger only; the fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub(crate) symbol: Symbol,
    pub(crate) quantity: Quantity,
    pub(crate) available_quantity: Quantity,
    pub(crate) frozen_quantity: Quantity,
    pub(crate) cost: Cash,
}

impl Position {
    /// Empty position
    pub(crate) fn flat(symbol: Symbol) -> Self {
        Self {
            symbol,
            quantity: Decimal::ZERO,
            available_quantity: Decimal::ZERO,
            frozen_quantity: Decimal::ZERO,
            cost: Decimal::ZERO,
        }
    }

    /// Fully available opening holding with the given cash basis
    pub(crate) fn opening(symbol: Symbol, quantity: Quantity, cost: Cash) -> Self {
        Self {
            symbol,
            quantity,
            available_quantity: quantity,
            frozen_quantity: Decimal::ZERO,
            cost,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn available_quantity(&self) -> Quantity {
        self.available_quantity
    }

    pub fn frozen_quantity(&self) -> Quantity {
        self.frozen_quantity
    }

    pub fn cost(&self) -> Cash {
        self.cost
    }

    /// Whether any shares are held
    pub fn is_held(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Average cost per share, `None` when flat
    pub fn cost_price(&self) -> Option<Price> {
        if self.is_held() {
            Some(self.cost / self.quantity)
        } else {
            None
        }
    }

    pub fn market_value(&self, price: Price) -> Cash {
        self.quantity * price
    }

    /// Panic if the quantity split is broken
    pub(crate) fn assert_consistent(&self) {
        assert!(
            self.quantity >= Decimal::ZERO,
            "position {} quantity is negative: {}",
            self.symbol,
            self.quantity
        );
        assert!(
            self.available_quantity >= Decimal::ZERO,
            "position {} available quantity is negative: {}",
            self.symbol,
            self.available_quantity
        );
        assert!(
            self.frozen_quantity >= Decimal::ZERO,
            "position {} frozen quantity is negative: {}",
            self.symbol,
            self.frozen_quantity
        );
        assert_eq!(
            self.quantity,
            self.available_quantity + self.frozen_quantity,
            "position {} quantity does not match available + frozen",
            self.symbol
        );
    }
}
