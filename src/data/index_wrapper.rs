//! Point-in-time view over a sorted series

use crate::data::records::Dated;
use crate::types::Timestamp;
use chrono::Duration;

/// A chronologically sorted series with a forward-only visibility cursor.
///
/// A row becomes visible once the query time reaches its timestamp plus
/// `lag`. The cursor never moves back: queries must come with non-decreasing
/// times, and an earlier time returns the prefix of the latest query rather
/// than a recomputed one.
#[derive(Debug, Clone)]
pub struct IndexWrapper<T> {
    rows: Vec<T>,
    lag: Duration,
    next_index: usize,
}

impl<T: Dated> IndexWrapper<T> {
    /// Wrap `rows`; they are stably sorted by timestamp here
    pub fn new(mut rows: Vec<T>, lag: Duration) -> Self {
        rows.sort_by_key(|r| r.timestamp());
        Self {
            rows,
            lag,
            next_index: 0,
        }
    }

    /// Advance the cursor to `time` and return every visible row
    pub fn till(&mut self, time: Timestamp) -> &[T] {
        while self.next_index < self.rows.len()
            && time >= self.rows[self.next_index].timestamp() + self.lag
        {
            self.next_index += 1;
        }
        &self.rows[..self.next_index]
    }

    /// Rows visible as of the last query
    pub fn visible(&self) -> &[T] {
        &self.rows[..self.next_index]
    }

    /// Most recent visible row
    pub fn latest(&self) -> Option<&T> {
        self.visible().last()
    }

    pub fn cursor(&self) -> usize {
        self.next_index
    }

    pub fn lag(&self) -> Duration {
        self.lag
    }

    /// All rows, visible or not
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row is already visible
    pub fn is_exhausted(&self) -> bool {
        self.next_index >= self.rows.len()
    }
}
