//! Fee schedule for commission and stamp tax

use crate::finance::constants::{COMMISSION_RATE, TAX_RATE};
use crate::order::OrderSide;
use crate::types::{Cash, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Proportional fee rates applied at execution time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Commission as a fraction of traded amount, both sides
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    /// Stamp tax as a fraction of traded amount, sells only
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
}

fn default_commission_rate() -> Decimal {
    COMMISSION_RATE
}

fn default_tax_rate() -> Decimal {
    TAX_RATE
}

impl FeeSchedule {
    pub fn new(commission_rate: Decimal, tax_rate: Decimal) -> Self {
        Self {
            commission_rate,
            tax_rate,
        }
    }

    /// Schedule without any fees
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    pub fn commission(&self, amount: Cash) -> Cash {
        amount * self.commission_rate
    }

    pub fn tax(&self, side: OrderSide, amount: Cash) -> Cash {
        match side {
            OrderSide::Buy => Decimal::ZERO,
            OrderSide::Sell => amount * self.tax_rate,
        }
    }

    /// Cash reserved for a buy of `quantity` at `price`, commission included
    pub fn buy_reservation(&self, quantity: Quantity, price: Price) -> Cash {
        quantity * price * (Decimal::ONE + self.commission_rate)
    }

    /// Fraction of market value kept after selling everything
    pub fn liquidation_factor(&self) -> Decimal {
        Decimal::ONE - self.commission_rate - self.tax_rate
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(COMMISSION_RATE, TAX_RATE)
    }
}
