//! Persistence sinks for ledger output
//!
//! The ledger flushes orders, trades and PNL rows once per trading day.
//! A sink is opened once for the whole run, so CSV output has a single header
//! and every later day appends below it.

use crate::error::{BacktestError, Result};
use crate::finance::pnl::PnlRecord;
use crate::finance::trade::Trade;
use crate::order::Order;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Destination for a batch of records
pub trait RecordSink<T> {
    fn write_records(&mut self, records: &[T]) -> Result<()>;
}

/// CSV writer that keeps its header across batches
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Create (truncate) a CSV file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| BacktestError::IoError(e.into_error()))
    }
}

impl<T: Serialize, W: Write> RecordSink<T> for CsvSink<W> {
    fn write_records(&mut self, records: &[T]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer, so a caller can keep one
/// handle and give the other to the ledger.
#[derive(Debug)]
pub struct MemorySink<T> {
    records: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for MemorySink<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> MemorySink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn records(&self) -> Vec<T> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> RecordSink<T> for MemorySink<T> {
    fn write_records(&mut self, records: &[T]) -> Result<()> {
        let mut guard = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend_from_slice(records);
        Ok(())
    }
}

/// The three sinks `end_day` writes to
pub struct LedgerSinks {
    pub orders: Box<dyn RecordSink<Order>>,
    pub trades: Box<dyn RecordSink<Trade>>,
    pub pnl: Box<dyn RecordSink<PnlRecord>>,
}

/// Read handles for sinks built by [`LedgerSinks::in_memory`]
#[derive(Clone, Default)]
pub struct MemoryHandles {
    pub orders: MemorySink<Order>,
    pub trades: MemorySink<Trade>,
    pub pnl: MemorySink<PnlRecord>,
}

impl LedgerSinks {
    /// Open `orders.csv`, `trades.csv` and `pnl.csv` in `dir`, creating it
    pub fn csv<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        log::info!("Writing ledger output to {}", dir.display());
        Ok(Self {
            orders: Box::new(CsvSink::create(dir.join("orders.csv"))?),
            trades: Box::new(CsvSink::create(dir.join("trades.csv"))?),
            pnl: Box::new(CsvSink::create(dir.join("pnl.csv"))?),
        })
    }

    /// Memory-backed sinks plus handles to read them back
    pub fn in_memory() -> (Self, MemoryHandles) {
        let handles = MemoryHandles::default();
        let sinks = Self {
            orders: Box::new(handles.orders.clone()),
            trades: Box::new(handles.trades.clone()),
            pnl: Box::new(handles.pnl.clone()),
        };
        (sinks, handles)
    }
}
