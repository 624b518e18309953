//! K-line (candlestick) periods

use crate::error::{BacktestError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// K-line period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KLineType {
    Daily,
    Weekly,
    Monthly,
    Min5,
    Min15,
    Min30,
    Min60,
}

impl KLineType {
    /// Name used in archive file names
    pub fn name(&self) -> &'static str {
        match self {
            KLineType::Daily => "DAILY",
            KLineType::Weekly => "WEEKLY",
            KLineType::Monthly => "MONTHLY",
            KLineType::Min5 => "MIN5",
            KLineType::Min15 => "MIN15",
            KLineType::Min30 => "MIN30",
            KLineType::Min60 => "MIN60",
        }
    }

    /// Period code used by the quote provider
    pub fn code(&self) -> &'static str {
        match self {
            KLineType::Daily => "101",
            KLineType::Weekly => "102",
            KLineType::Monthly => "103",
            KLineType::Min5 => "5",
            KLineType::Min15 => "15",
            KLineType::Min30 => "30",
            KLineType::Min60 => "60",
        }
    }

    /// Time covered by one bar, measured back from its timestamp.
    ///
    /// Daily bars are stamped with the trading date and cover that same
    /// date, so their span is zero. Weekly and monthly bars have no fixed
    /// span and return `None`.
    pub fn bar_span(&self) -> Option<Duration> {
        match self {
            KLineType::Daily => Some(Duration::zero()),
            KLineType::Min5 => Some(Duration::minutes(5)),
            KLineType::Min15 => Some(Duration::minutes(15)),
            KLineType::Min30 => Some(Duration::minutes(30)),
            KLineType::Min60 => Some(Duration::minutes(60)),
            KLineType::Weekly | KLineType::Monthly => None,
        }
    }

    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            KLineType::Min5 | KLineType::Min15 | KLineType::Min30 | KLineType::Min60
        )
    }

    /// Archive file holding the unadjusted series of this type
    pub fn archive_file_name(&self) -> String {
        format!("historical_data_{}_NONE.csv", self.name())
    }

    /// Error unless the replay can build bars of this type
    pub fn ensure_replayable(&self) -> Result<()> {
        match self.bar_span() {
            Some(_) => Ok(()),
            None => Err(BacktestError::UnsupportedKline(self.name().to_string())),
        }
    }
}

impl FromStr for KLineType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" | "101" => Ok(KLineType::Daily),
            "WEEKLY" | "102" => Ok(KLineType::Weekly),
            "MONTHLY" | "103" => Ok(KLineType::Monthly),
            "MIN5" | "5" => Ok(KLineType::Min5),
            "MIN15" | "15" => Ok(KLineType::Min15),
            "MIN30" | "30" => Ok(KLineType::Min30),
            "MIN60" | "60" => Ok(KLineType::Min60),
            _ => Err(BacktestError::UnsupportedKline(s.to_string())),
        }
    }
}

impl fmt::Display for KLineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_names() {
        assert_eq!(
            KLineType::Daily.archive_file_name(),
            "historical_data_DAILY_NONE.csv"
        );
        assert_eq!(
            KLineType::Min15.archive_file_name(),
            "historical_data_MIN15_NONE.csv"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("daily".parse::<KLineType>().unwrap(), KLineType::Daily);
        assert_eq!("5".parse::<KLineType>().unwrap(), KLineType::Min5);
        assert_eq!("MIN60".parse::<KLineType>().unwrap(), KLineType::Min60);
        assert!("hourly".parse::<KLineType>().is_err());
    }

    #[test]
    fn test_spans() {
        assert_eq!(KLineType::Daily.bar_span(), Some(Duration::zero()));
        assert_eq!(KLineType::Min30.bar_span(), Some(Duration::minutes(30)));
        assert!(KLineType::Min30.is_intraday());
        assert!(KLineType::Weekly.ensure_replayable().is_err());
        assert!(KLineType::Min5.ensure_replayable().is_ok());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&KLineType::Min5).unwrap();
        assert_eq!(json, "\"MIN5\"");
    }
}
