//! CSV archive loading
//!
//! Every loader fails on the first row it cannot parse, with the file and
//! line in the message. The one deliberate exception is dividend rows without
//! an ex-dividend date: announced plans that have not been scheduled yet are
//! common in the archive and carry no price effect, so they are dropped.
//! Dividend terms must be non-negative; forward adjustment divides by
//! `10 + total_transfer_ratio`.

use crate::data::records::{Dated, DividendRecord, FinancialRecord, KlineRow};
use crate::error::{BacktestError, Result};
use crate::types::DATE_FORMAT;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

/// Load a K-line archive, sorted by date with duplicate dates removed
/// (first occurrence wins).
pub fn load_klines<P: AsRef<Path>>(path: P) -> Result<Vec<KlineRow>> {
    let path = path.as_ref();
    let reader = open(path)?;
    read_klines(reader).map_err(|e| with_path(path, e))
}

pub fn read_klines<R: Read>(reader: csv::Reader<R>) -> Result<Vec<KlineRow>> {
    let mut reader = reader;
    let mut rows = Vec::new();
    for row in reader.deserialize::<KlineRow>() {
        rows.push(row?);
    }
    sort_by_time(&mut rows);
    rows.dedup_by_key(|r| r.date);
    Ok(rows)
}

/// Load a dividend archive, sorted by ex-dividend date
pub fn load_dividends<P: AsRef<Path>>(path: P) -> Result<Vec<DividendRecord>> {
    let path = path.as_ref();
    let reader = open(path)?;
    read_dividends(reader).map_err(|e| with_path(path, e))
}

pub fn read_dividends<R: Read>(reader: csv::Reader<R>) -> Result<Vec<DividendRecord>> {
    let mut reader = reader;
    let headers = reader.headers()?.clone();
    let date_column = headers
        .iter()
        .position(|h| h == "ex_dividend_date")
        .ok_or_else(|| BacktestError::DataError("missing column ex_dividend_date".to_string()))?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.get(date_column).map_or(true, |s| s.trim().is_empty()) {
            dropped += 1;
            continue;
        }
        let row = record.deserialize::<DividendRecord>(Some(&headers))?;
        if row.total_transfer_ratio < Decimal::ZERO || row.cash_dividend < Decimal::ZERO {
            return Err(BacktestError::DataError(format!(
                "record {}: negative dividend terms (transfer {}, cash {})",
                line + 1,
                row.total_transfer_ratio,
                row.cash_dividend
            )));
        }
        rows.push(row);
    }
    if dropped > 0 {
        log::debug!("Dropped {} dividend rows without an ex-dividend date", dropped);
    }
    sort_by_time(&mut rows);
    Ok(rows)
}

/// Load a financial report archive, sorted by report date
pub fn load_financials<P: AsRef<Path>>(path: P) -> Result<Vec<FinancialRecord>> {
    let path = path.as_ref();
    let reader = open(path)?;
    read_financials(reader).map_err(|e| with_path(path, e))
}

pub fn read_financials<R: Read>(reader: csv::Reader<R>) -> Result<Vec<FinancialRecord>> {
    let mut reader = reader;
    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == "report_date") {
        return Err(BacktestError::DataError("missing column report_date".to_string()));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let mut report_date = None;
        let mut fields = BTreeMap::new();
        for (name, value) in headers.iter().zip(record.iter()) {
            if name == "report_date" {
                let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
                    BacktestError::DataError(format!(
                        "record {}: invalid report_date {:?}",
                        line + 1,
                        value
                    ))
                })?;
                report_date = Some(date);
            } else {
                fields.insert(name.to_string(), value.to_string());
            }
        }
        if let Some(report_date) = report_date {
            rows.push(FinancialRecord {
                report_date,
                fields,
            });
        }
    }
    sort_by_time(&mut rows);
    Ok(rows)
}

/// Write K-line rows with the archive's column layout
pub fn write_klines<W: Write>(writer: W, rows: &[KlineRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::Reader::from_path(path).map_err(|e| with_path(path, e.into()))
}

fn sort_by_time<T: Dated>(rows: &mut [T]) {
    rows.sort_by_key(|r| r.timestamp());
}

fn with_path(path: &Path, err: BacktestError) -> BacktestError {
    match err {
        BacktestError::IoError(e) => BacktestError::DataError(format!("{}: {}", path.display(), e)),
        BacktestError::CsvError(e) => BacktestError::DataError(format!("{}: {}", path.display(), e)),
        BacktestError::DataError(msg) => BacktestError::DataError(format!("{}: {}", path.display(), msg)),
        other => other,
    }
}
