//! Security symbols

use crate::error::{BacktestError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Exchange a security is listed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Market {
    /// Shanghai Stock Exchange
    SH,
    /// Shenzhen Stock Exchange
    SZ,
    /// Beijing Stock Exchange
    BJ,
}

impl Market {
    /// Derive the exchange from a bare security code
    pub fn from_code(code: &str) -> Result<Self> {
        if code.starts_with('6') {
            Ok(Market::SH)
        } else if code.starts_with('0') || code.starts_with('3') {
            Ok(Market::SZ)
        } else if code.starts_with('8') || code.starts_with('4') || code.starts_with("920") {
            Ok(Market::BJ)
        } else {
            Err(BacktestError::InvalidSymbol(format!(
                "unsupported stock code {}: expected 0, 3, 6, 8, 4 or 920 prefix",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::SH => "SH",
            Market::SZ => "SZ",
            Market::BJ => "BJ",
        }
    }
}

impl FromStr for Market {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SH" => Ok(Market::SH),
            "SZ" => Ok(Market::SZ),
            "BJ" => Ok(Market::BJ),
            other => Err(BacktestError::InvalidSymbol(format!("unknown market {}", other))),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of security
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Stock,
    Fund,
    Bond,
    Index,
    Etf,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityType::Stock => "STOCK",
            SecurityType::Fund => "FUND",
            SecurityType::Bond => "BOND",
            SecurityType::Index => "INDEX",
            SecurityType::Etf => "ETF",
        }
    }
}

impl FromStr for SecurityType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STOCK" => Ok(SecurityType::Stock),
            "FUND" => Ok(SecurityType::Fund),
            "BOND" => Ok(SecurityType::Bond),
            "INDEX" => Ok(SecurityType::Index),
            "ETF" => Ok(SecurityType::Etf),
            other => Err(BacktestError::InvalidSymbol(format!(
                "unknown security type {}",
                other
            ))),
        }
    }
}

/// Tradable instrument identifier.
///
/// Identity is `(code, market)`. `kind` only affects the display form, so a
/// bond and a stock sharing code and market compare equal.
#[derive(Debug, Clone)]
pub struct Symbol {
    code: String,
    market: Market,
    kind: SecurityType,
}

impl Symbol {
    pub fn new(code: impl Into<String>, market: Market, kind: SecurityType) -> Self {
        Self {
            code: code.into(),
            market,
            kind,
        }
    }

    /// Stock symbol with the exchange inferred from the code
    pub fn from_code(code: &str) -> Result<Self> {
        Ok(Self::new(code, Market::from_code(code)?, SecurityType::Stock))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn kind(&self) -> SecurityType {
        self.kind
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.market == other.market
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.market.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code
            .cmp(&other.code)
            .then_with(|| self.market.cmp(&other.market))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SecurityType::Stock => write!(f, "{}.{}", self.code, self.market),
            kind => write!(f, "{}.{}.{}", self.code, self.market, kind.as_str()),
        }
    }
}

impl FromStr for Symbol {
    type Err = BacktestError;

    /// Parse `code.MARKET` or `code.MARKET.KIND`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        match parts.as_slice() {
            [code, market] if !code.is_empty() => {
                Ok(Self::new(*code, market.parse()?, SecurityType::Stock))
            }
            [code, market, kind] if !code.is_empty() => {
                Ok(Self::new(*code, market.parse()?, kind.parse()?))
            }
            _ => Err(BacktestError::InvalidSymbol(format!(
                "invalid symbol format: {}",
                s
            ))),
        }
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
