//! Trading constants and defaults
//!
//! Fee rates follow the A-share retail schedule the ledger was calibrated
//! against: commission on both sides, stamp tax on sells only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Commission rate applied to the traded amount on every trade
pub const COMMISSION_RATE: Decimal = dec!(0.0001);

/// Stamp tax rate applied to the traded amount on sell trades
pub const TAX_RATE: Decimal = dec!(0.0005);

/// Default starting capital
pub const DEFAULT_CAPITAL: Decimal = dec!(1000000);

/// Default account identifier
pub const DEFAULT_ACCOUNT_ID: &str = "ACC1";

/// Dividend and transfer ratios are quoted per this many shares
pub const SHARES_PER_RATIO_UNIT: Decimal = dec!(10);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(COMMISSION_RATE > Decimal::ZERO);
        assert!(TAX_RATE > COMMISSION_RATE);
        assert_eq!(SHARES_PER_RATIO_UNIT, Decimal::TEN);
        assert_eq!(DEFAULT_CAPITAL, dec!(1000000));
    }
}
