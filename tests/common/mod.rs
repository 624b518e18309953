//! Archive fixtures shared by the integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const KLINE_HEADER: &str =
    "date,open_price,high_price,low_price,close_price,volume,turnover,change_percent";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write one symbol's three archive files
pub fn write_symbol(root: &Path, symbol: &str, klines: &[&str], dividends: &[&str], reports: &[&str]) {
    let dir = root.join(symbol);
    fs::create_dir_all(&dir).unwrap();

    let mut kline = String::from(KLINE_HEADER);
    for row in klines {
        kline.push('\n');
        kline.push_str(row);
    }
    fs::write(dir.join("historical_data_DAILY_NONE.csv"), kline + "\n").unwrap();

    let mut dividend = String::from("ex_dividend_date,total_transfer_ratio,cash_dividend_ratio,progress");
    for row in dividends {
        dividend.push('\n');
        dividend.push_str(row);
    }
    fs::write(dir.join("dividend_info.csv"), dividend + "\n").unwrap();

    let mut financial = String::from("report_date,revenue,net_profit");
    for row in reports {
        financial.push('\n');
        financial.push_str(row);
    }
    fs::write(dir.join("financial_data.csv"), financial + "\n").unwrap();
}

/// Two symbols over 2025-07-14..17.
///
/// 000001.SZ trades every day and goes ex-dividend on the 16th
/// (2.5 transfer, 2 cash per 10 shares). 600000.SH trades on the 15th and
/// 17th only.
pub fn sample_archive() -> TempDir {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    write_symbol(
        dir.path(),
        "000001.SZ",
        &[
            "2025-07-14,12.5,12.8,12.3,12.6,1000,12600,0.8",
            "2025-07-15,12.6,12.9,12.4,12.8,1200,15360,1.59",
            "2025-07-16,10.0,10.3,9.9,10.2,1500,15300,",
            "2025-07-17,10.2,10.5,10.1,10.4,900,9360,1.96",
        ],
        &["2025-07-16,2.5,2,implemented", ",,,proposed"],
        &["2025-07-14,100,10", "2025-07-16,120,12"],
    );
    write_symbol(
        dir.path(),
        "600000.SH",
        &[
            "2025-07-15,8.0,8.2,7.9,8.1,5000,40500,0",
            "2025-07-17,8.2,8.4,8.1,8.3,4000,33200,2.47",
        ],
        &[],
        &[],
    );
    dir
}
