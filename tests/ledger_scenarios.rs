//! Ledger walkthroughs with exact decimal expectations

use chrono::NaiveDate;
use hashbrown::HashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rusty_ashare::clock::VirtualClock;
use rusty_ashare::data::DividendRecord;
use rusty_ashare::error::BacktestError;
use rusty_ashare::finance::sink::MemorySink;
use rusty_ashare::finance::{
    Account, FeeSchedule, LedgerSinks, PnlRecord, RejectReason, SubmitResult, Trade, TradingSystem,
};
use rusty_ashare::order::{Order, OrderSide, OrderStatus};
use rusty_ashare::symbol::Symbol;
use rusty_ashare::types::parse_timestamp;
use std::fs;
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sz1() -> Symbol {
    "000001.SZ".parse().unwrap()
}

fn sz2() -> Symbol {
    "000002.SZ".parse().unwrap()
}

fn ledger_at(time: &str) -> (TradingSystem, Arc<VirtualClock>) {
    init_logger();
    let clock = Arc::new(VirtualClock::new(parse_timestamp(time).unwrap()));
    let account = Account::new("ACC1", dec!(20000)).with_position(sz1(), dec!(200), Decimal::ZERO);
    let ledger = TradingSystem::new(account, clock.clone(), FeeSchedule::default());
    (ledger, clock)
}

fn ledger() -> TradingSystem {
    ledger_at("2025-07-16 09:30:00").0
}

fn limit(id: &str, symbol: Symbol, side: OrderSide, qty: Decimal, price: Decimal) -> Order {
    Order::limit(id, "ACC1", symbol, side, qty, price).unwrap()
}

fn assert_cash(ledger: &TradingSystem, balance: Decimal, available: Decimal, frozen: Decimal) {
    let account = ledger.account();
    assert_eq!(account.balance(), balance, "balance");
    assert_eq!(account.available_balance(), available, "available balance");
    assert_eq!(account.frozen_balance(), frozen, "frozen balance");
}

fn assert_shares(ledger: &TradingSystem, symbol: &Symbol, qty: Decimal, available: Decimal, frozen: Decimal) {
    let position = ledger.position(symbol).expect("position exists");
    assert_eq!(position.quantity(), qty, "quantity");
    assert_eq!(position.available_quantity(), available, "available quantity");
    assert_eq!(position.frozen_quantity(), frozen, "frozen quantity");
}

#[test]
fn test_buy_freezes_cash_with_commission() {
    let mut ledger = ledger();
    let result = ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));

    assert!(result.is_accepted());
    assert_eq!(ledger.order("B1").unwrap().status, OrderStatus::Submitted);
    assert_cash(&ledger, dec!(20000), dec!(18999.9), dec!(1000.1));
    assert_shares(&ledger, &sz1(), dec!(200), dec!(200), dec!(0));
}

#[test]
fn test_unaffordable_buy_is_rejected_without_side_effects() {
    let mut ledger = ledger();
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));

    match ledger.submit_order(limit("B2", sz1(), OrderSide::Buy, dec!(3000), dec!(100))) {
        SubmitResult::Rejected { order, reason } => {
            assert_eq!(order.status, OrderStatus::Rejected);
            assert!(matches!(reason, RejectReason::InsufficientFunds { .. }));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_cash(&ledger, dec!(20000), dec!(18999.9), dec!(1000.1));
    assert!(ledger.order("B2").is_none());
}

#[test]
fn test_sell_freezes_shares_only() {
    let mut ledger = ledger();
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    assert!(ledger
        .submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(50), dec!(15)))
        .is_accepted());

    assert_cash(&ledger, dec!(20000), dec!(18999.9), dec!(1000.1));
    assert_shares(&ledger, &sz1(), dec!(200), dec!(150), dec!(50));

    let oversell = ledger.submit_order(limit("S2", sz1(), OrderSide::Sell, dec!(1000), dec!(15)));
    assert!(matches!(
        oversell.reject_reason(),
        Some(RejectReason::InsufficientShares { .. })
    ));
    assert_shares(&ledger, &sz1(), dec!(200), dec!(150), dec!(50));
}

#[test]
fn test_full_buy_fill_releases_reservation() {
    let mut ledger = ledger();
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(50), dec!(15)));

    let trade = ledger.execute_trade("B1", dec!(100), dec!(10)).unwrap();
    assert_eq!(trade.quantity, dec!(100));
    assert_eq!(trade.commission, dec!(0.1));
    assert_eq!(trade.tax, dec!(0));

    assert_eq!(ledger.order("B1").unwrap().status, OrderStatus::Filled);
    assert_cash(&ledger, dec!(18999.9), dec!(18999.9), dec!(0));
    // 100 bought today plus 50 reserved by S1
    assert_shares(&ledger, &sz1(), dec!(300), dec!(150), dec!(150));
}

#[test]
fn test_demo_session() {
    let mut ledger = ledger();

    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    ledger.submit_order(limit("B2", sz1(), OrderSide::Buy, dec!(3000), dec!(100)));
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(50), dec!(15)));
    ledger.submit_order(limit("S2", sz1(), OrderSide::Sell, dec!(1000), dec!(15)));
    assert_eq!(ledger.orders().len(), 2);

    ledger.execute_trade("B1", dec!(100), dec!(10)).unwrap();

    let sell = ledger.execute_trade("S1", dec!(50), dec!(14)).unwrap();
    assert_eq!(sell.commission, dec!(0.07));
    assert_eq!(sell.tax, dec!(0.35));
    assert_eq!(sell.net_cash(), dec!(699.58));
    assert_cash(&ledger, dec!(19699.48), dec!(19699.48), dec!(0));
    assert_shares(&ledger, &sz1(), dec!(250), dec!(150), dec!(100));

    // partial fill on a new symbol, then cancel the rest
    assert!(ledger
        .submit_order(limit("B3", sz2(), OrderSide::Buy, dec!(50), dec!(20)))
        .is_accepted());
    assert_cash(&ledger, dec!(19699.48), dec!(18699.38), dec!(1000.1));

    let partial = ledger.execute_trade("B3", dec!(20), dec!(18)).unwrap();
    assert_eq!(partial.amount, dec!(360));
    assert_eq!(ledger.order("B3").unwrap().status, OrderStatus::PartiallyFilled);
    assert_eq!(ledger.order("B3").unwrap().remaining_quantity, dec!(30));
    assert_cash(&ledger, dec!(19339.444), dec!(18739.384), dec!(600.06));

    assert!(ledger.cancel_order("B3"));
    assert_eq!(ledger.order("B3").unwrap().status, OrderStatus::Cancelled);
    assert_cash(&ledger, dec!(19339.444), dec!(19339.444), dec!(0));
    assert_shares(&ledger, &sz2(), dec!(20), dec!(0), dec!(20));

    let account = ledger.account();
    assert_eq!(account.commission_total(), dec!(0.1) + dec!(0.07) + dec!(0.036));
    assert_eq!(account.tax_total(), dec!(0.35));
    assert_eq!(ledger.trades().len(), 3);
}

#[test]
fn test_cancel_is_idempotent() {
    let mut ledger = ledger();
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(80), dec!(12)));

    assert!(ledger.cancel_order("S1"));
    assert_shares(&ledger, &sz1(), dec!(200), dec!(200), dec!(0));

    assert!(!ledger.cancel_order("S1"));
    assert!(!ledger.cancel_order("missing"));
    assert_shares(&ledger, &sz1(), dec!(200), dec!(200), dec!(0));
    assert!(matches!(
        ledger.execute_trade("S1", dec!(10), dec!(12)),
        Err(BacktestError::OrderNotOpen { .. })
    ));
}

#[test]
fn test_filled_order_cannot_be_cancelled() {
    let mut ledger = ledger();
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(200), dec!(12)));
    ledger.execute_trade("S1", dec!(200), dec!(12)).unwrap();

    assert!(!ledger.cancel_order("S1"));
    assert_eq!(ledger.order("S1").unwrap().status, OrderStatus::Filled);
    assert_eq!(ledger.account().quantity_of(&sz1()), dec!(0));
}

#[test]
fn test_buy_below_limit_returns_difference() {
    let mut ledger = ledger();
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    ledger.execute_trade("B1", dec!(100), dec!(9)).unwrap();

    // 900 + 0.09 spent, the rest of the 1000.1 reservation comes back
    assert_cash(&ledger, dec!(19099.91), dec!(19099.91), dec!(0));
    assert_eq!(ledger.position(&sz1()).unwrap().cost(), dec!(900.09));
}

#[test]
fn test_cash_is_conserved_across_a_session() {
    let mut ledger = ledger();
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(300), dec!(11)));
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(120), dec!(12)));
    ledger.execute_trade("B1", dec!(100), dec!(10.5)).unwrap();
    ledger.execute_trade("S1", dec!(120), dec!(12.2)).unwrap();
    ledger.execute_trade("B1", dec!(50), dec!(10.9)).unwrap();

    let account = ledger.account();
    assert_eq!(
        account.balance(),
        account.available_balance() + account.frozen_balance()
    );

    let flows: Decimal = ledger
        .trades()
        .iter()
        .map(|t| if t.is_buy() { -(t.amount + t.fees()) } else { t.amount - t.fees() })
        .sum();
    assert_eq!(account.balance(), dec!(20000) + flows);

    ledger.cancel_order("B1");
    assert_eq!(ledger.account().frozen_balance(), Decimal::ZERO);
}

#[test]
fn test_purchases_unlock_next_day() {
    let (mut ledger, clock) = ledger_at("2025-07-16 09:30:00");
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    ledger.execute_trade("B1", dec!(100), dec!(10)).unwrap();
    assert_shares(&ledger, &sz1(), dec!(300), dec!(200), dec!(100));

    // bought shares cannot be sold the same day
    let same_day = ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(300), dec!(10)));
    assert!(!same_day.is_accepted());

    let mut prices = HashMap::new();
    prices.insert(sz1(), dec!(10));
    let (mut sinks, _handles) = LedgerSinks::in_memory();
    clock.set_time(parse_timestamp("2025-07-16 15:00:00").unwrap());
    ledger.end_day_into(&mut sinks, &prices).unwrap();

    clock.set_time(parse_timestamp("2025-07-17 09:30:00").unwrap());
    ledger.start_day(std::iter::empty());
    assert_shares(&ledger, &sz1(), dec!(300), dec!(300), dec!(0));
    assert!(ledger
        .submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(300), dec!(10)))
        .is_accepted());
}

#[test]
fn test_dividend_and_transfer_on_ex_date() {
    let (mut ledger, clock) = ledger_at("2025-07-17 09:30:00");
    let dividends = vec![
        DividendRecord {
            ex_dividend_date: NaiveDate::from_ymd_opt(2025, 7, 17).unwrap(),
            total_transfer_ratio: dec!(5),
            cash_dividend: dec!(1.5),
        },
        DividendRecord {
            ex_dividend_date: NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
            total_transfer_ratio: dec!(3),
            cash_dividend: dec!(9),
        },
    ];
    let held = sz1();
    let unheld = sz2();

    ledger.start_day(vec![(&held, dividends.as_slice()), (&unheld, dividends.as_slice())]);

    // 200 shares: 20 units, 30 cash, 100 new shares
    assert_shares(&ledger, &sz1(), dec!(300), dec!(300), dec!(0));
    assert_eq!(ledger.position(&sz1()).unwrap().cost(), dec!(-30));
    assert_cash(&ledger, dec!(20030), dec!(20030), dec!(0));
    assert!(ledger.position(&sz2()).is_none());

    // the same records do nothing on another day
    clock.set_time(parse_timestamp("2025-07-18 09:30:00").unwrap());
    ledger.start_day(vec![(&held, dividends.as_slice())]);
    assert_eq!(ledger.account().balance(), dec!(20030));
}

#[test]
fn test_end_day_writes_csv_and_values_positions() {
    let (mut ledger, clock) = ledger_at("2025-07-16 09:30:00");
    ledger.submit_order(limit("B1", sz1(), OrderSide::Buy, dec!(100), dec!(10)));
    clock.set_time(parse_timestamp("2025-07-16 10:00:00").unwrap());
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(50), dec!(15)));
    ledger.execute_trade("B1", dec!(100), dec!(10)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut sinks = LedgerSinks::csv(dir.path()).unwrap();
    let mut prices = HashMap::new();
    prices.insert(sz1(), dec!(14));
    clock.set_time(parse_timestamp("2025-07-16 15:00:00").unwrap());

    let summary = ledger.end_day_into(&mut sinks, &prices).unwrap();
    drop(sinks);

    assert_eq!(summary.orders, 2);
    assert_eq!(summary.trades, 1);
    assert_eq!(summary.cancelled_at_close, 1);
    assert_eq!(summary.market_value, dec!(4200));
    assert_eq!(summary.total_asset, dec!(18999.9) + dec!(4200));
    // 4200 * (1 - 0.0001 - 0.0005) - 1000.1
    assert_eq!(summary.profit_loss, dec!(3197.38));

    assert!(ledger.orders().is_empty());
    assert!(ledger.trades().is_empty());
    assert_shares(&ledger, &sz1(), dec!(300), dec!(200), dec!(100));

    let orders = fs::read_to_string(dir.path().join("orders.csv")).unwrap();
    let lines: Vec<&str> = orders.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("order_id,"));
    assert!(lines[1].starts_with("B1,"));
    assert!(lines[2].starts_with("S1,"));
    assert!(lines[2].contains("CANCELLED"));

    let trades = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), 2);

    let mut reader = csv::Reader::from_path(dir.path().join("pnl.csv")).unwrap();
    let rows: Vec<PnlRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 7, 16).unwrap());
    assert_eq!(rows[0].symbol, sz1());
    assert_eq!(rows[0].quantity, dec!(300));
    assert_eq!(rows[0].cost, dec!(1000.1));
    assert_eq!(rows[0].profit_loss, dec!(3197.38));
}

#[test]
fn test_end_day_missing_price_changes_nothing() {
    let (mut ledger, _clock) = ledger_at("2025-07-16 09:30:00");
    ledger.submit_order(limit("S1", sz1(), OrderSide::Sell, dec!(50), dec!(15)));

    let mut orders: MemorySink<Order> = MemorySink::new();
    let mut trades: MemorySink<Trade> = MemorySink::new();
    let mut pnl: MemorySink<PnlRecord> = MemorySink::new();
    let result = ledger.end_day(&mut orders, &mut trades, &mut pnl, &HashMap::new());

    assert!(matches!(result, Err(BacktestError::MissingPrice { .. })));
    assert!(orders.is_empty());
    assert_eq!(ledger.order("S1").unwrap().status, OrderStatus::Submitted);
    assert_shares(&ledger, &sz1(), dec!(200), dec!(150), dec!(50));
}
