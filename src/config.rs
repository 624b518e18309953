//! Backtest configuration loaded from TOML
//!
//! ```toml
//! archive_path = "archive"
//! symbols = ["000001.SZ", "600000.SH"]
//! start_date = "2025-06-01"
//! end_date = "2025-07-31"
//! kline_type = "DAILY"
//! mode = "streaming"
//! initial_cash = 1000000
//! output_dir = "output"
//!
//! [fees]
//! commission_rate = 0.0001
//! tax_rate = 0.0005
//!
//! [[positions]]
//! symbol = "000001.SZ"
//! quantity = 200
//! cost = 2000
//! ```
//!
//! Dates are quoted strings. Every key except `symbols` has a default.

use crate::data::{FeedConfig, FeedMode, KLineType};
use crate::engine::EngineConfig;
use crate::error::{BacktestError, Result};
use crate::finance::constants::{DEFAULT_ACCOUNT_ID, DEFAULT_CAPITAL};
use crate::finance::{Account, FeeSchedule};
use crate::symbol::Symbol;
use crate::types::{Cash, Quantity};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Holding the account starts with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningPosition {
    pub symbol: Symbol,
    pub quantity: Quantity,
    #[serde(default)]
    pub cost: Cash,
}

/// Everything one backtest run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_kline_type")]
    pub kline_type: KLineType,
    #[serde(default)]
    pub mode: FeedMode,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Cash,
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub positions: Vec<OpeningPosition>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("archive")
}

fn default_kline_type() -> KLineType {
    KLineType::Daily
}

fn default_initial_cash() -> Cash {
    DEFAULT_CAPITAL
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl BacktestConfig {
    /// Config for `symbols` with every other key at its default
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            archive_path: default_archive_path(),
            symbols,
            start_date: None,
            end_date: None,
            kline_type: default_kline_type(),
            mode: FeedMode::default(),
            initial_cash: default_initial_cash(),
            account_id: default_account_id(),
            fees: FeeSchedule::default(),
            positions: Vec::new(),
            output_dir: default_output_dir(),
        }
    }

    /// Read and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            BacktestError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(BacktestError::ConfigError("symbols must not be empty".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(BacktestError::ConfigError(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        if self.initial_cash < Decimal::ZERO {
            return Err(BacktestError::ConfigError(format!(
                "initial_cash must not be negative, got {}",
                self.initial_cash
            )));
        }
        if self.fees.commission_rate < Decimal::ZERO || self.fees.tax_rate < Decimal::ZERO {
            return Err(BacktestError::ConfigError("fee rates must not be negative".to_string()));
        }
        if self.account_id.trim().is_empty() {
            return Err(BacktestError::ConfigError("account_id must not be empty".to_string()));
        }
        for position in &self.positions {
            if position.quantity < Decimal::ZERO {
                return Err(BacktestError::ConfigError(format!(
                    "opening quantity of {} is negative",
                    position.symbol
                )));
            }
        }
        self.kline_type.ensure_replayable()
    }

    pub fn feed_config(&self) -> FeedConfig {
        let mut feed = FeedConfig::new(self.archive_path.clone(), self.symbols.clone())
            .with_kline_type(self.kline_type)
            .with_mode(self.mode);
        feed.start_date = self.start_date;
        feed.end_date = self.end_date;
        feed
    }

    /// Account seeded with the initial cash and opening positions
    pub fn opening_account(&self) -> Account {
        self.positions.iter().fold(
            Account::new(self.account_id.clone(), self.initial_cash),
            |account, p| account.with_position(p.symbol.clone(), p.quantity, p.cost),
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            account: self.opening_account(),
            fees: self.fees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_config_defaults() {
        let config = BacktestConfig::from_toml_str("symbols = [\"000001.SZ\"]").unwrap();
        assert_eq!(config.archive_path, PathBuf::from("archive"));
        assert_eq!(config.kline_type, KLineType::Daily);
        assert_eq!(config.mode, FeedMode::Streaming);
        assert_eq!(config.initial_cash, DEFAULT_CAPITAL);
        assert_eq!(config.account_id, "ACC1");
        assert_eq!(config.fees, FeeSchedule::default());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            archive_path = "data/archive"
            symbols = ["000001.SZ", "600000.SH"]
            start_date = "2025-06-01"
            end_date = "2025-07-31"
            kline_type = "MIN5"
            mode = "point_in_time"
            initial_cash = 20000
            output_dir = "out"

            [fees]
            commission_rate = "0.0003"

            [[positions]]
            symbol = "000001.SZ"
            quantity = 200
        "#;
        let config = BacktestConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.kline_type, KLineType::Min5);
        assert_eq!(config.mode, FeedMode::PointInTime);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(config.fees.commission_rate, dec!(0.0003));

        let account = config.opening_account();
        assert_eq!(account.balance(), dec!(20000));
        assert_eq!(account.quantity_of(&"000001.SZ".parse().unwrap()), dec!(200));

        let feed = config.feed_config();
        assert_eq!(feed.end_date, NaiveDate::from_ymd_opt(2025, 7, 31));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(BacktestConfig::from_toml_str("symbols = []").is_err());
        assert!(BacktestConfig::from_toml_str(
            "symbols = [\"000001.SZ\"]\nstart_date = \"2025-08-01\"\nend_date = \"2025-07-01\""
        )
        .is_err());
        assert!(BacktestConfig::from_toml_str("symbols = [\"000001.SZ\"]\nkline_type = \"WEEKLY\"").is_err());
        assert!(matches!(
            BacktestConfig::from_toml_str("symbols = [\"bogus\"]"),
            Err(BacktestError::TomlError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.toml");
        fs::write(&path, "symbols = [\"600000.SH\"]\ninitial_cash = \"50000\"").unwrap();
        let config = BacktestConfig::from_file(&path).unwrap();
        assert_eq!(config.initial_cash, dec!(50000));

        assert!(matches!(
            BacktestConfig::from_file(dir.path().join("missing.toml")),
            Err(BacktestError::ConfigError(_))
        ));
    }
}
