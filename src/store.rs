//! Bounded in-memory telemetry store
//!
//! [`TelemetryStore`] keeps the most recent telemetry records in a FIFO ring
//! buffer. It is constructed once at process start and shared by handle
//! (`Arc<TelemetryStore>`) with every request handler.
//!
//! # Invariants
//!
//! - `len() <= capacity()` at all times
//! - Records are kept in arrival order; once full, the oldest record is
//!   evicted to make room for a new one
//! - A record is never modified after it has been appended; readers get
//!   owned clones
//!
//! # Thread Safety
//!
//! The buffer lives behind a single mutex. Every operation takes the lock
//! exactly once, so an append is atomic and every read observes a consistent
//! snapshot. No I/O happens while the lock is held.

use crate::types::{IncrementalStats, TelemetryRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of records retained
pub const DEFAULT_CAPACITY: usize = 100;

/// Receipt returned by [`TelemetryStore::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Producer timestamp (or the receive time when the producer sent none), ms since epoch
    pub timestamp: i64,
    /// Server receive time stamped on the record
    pub received_at: DateTime<Utc>,
    /// Whether an older record was evicted to make room
    pub evicted: bool,
}

/// Aggregate statistics over the retained records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub total_records: usize,
    /// Number of records carrying `control.error`
    pub error_samples: u64,
    pub avg_error: f64,
    pub max_left_speed: f64,
    pub min_left_speed: f64,
    pub max_right_speed: f64,
    pub min_right_speed: f64,
}

/// Every retained record, ready for a one-shot download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryExport {
    pub filename: String,
    pub count: usize,
    pub data: Vec<TelemetryRecord>,
}

/// Bounded, thread-safe FIFO store of telemetry records
#[derive(Debug)]
pub struct TelemetryStore {
    capacity: usize,
    records: Mutex<VecDeque<TelemetryRecord>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryStore {
    /// Create a store holding at most `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of records retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently retained
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no record has been retained yet (or the store was cleared)
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append a record, stamping it with the current time
    pub fn append(&self, record: TelemetryRecord) -> AppendReceipt {
        self.append_at(record, Utc::now())
    }

    /// Append a record, stamping it with `now` where the record has no times of its own
    pub fn append_at(&self, mut record: TelemetryRecord, now: DateTime<Utc>) -> AppendReceipt {
        let received_at = *record.received_at.get_or_insert(now);
        let timestamp = *record
            .timestamp
            .get_or_insert_with(|| received_at.timestamp_millis());

        let mut records = self.lock();
        let evicted = if records.len() >= self.capacity {
            records.pop_front().is_some()
        } else {
            false
        };
        records.push_back(record);

        AppendReceipt {
            timestamp,
            received_at,
            evicted,
        }
    }

    /// The most recently appended record, `None` when the store is empty
    pub fn latest(&self) -> Option<TelemetryRecord> {
        self.lock().back().cloned()
    }

    /// The last `min(n, len)` records, oldest first; every record when `n` is `None`
    pub fn history(&self, n: Option<usize>) -> Vec<TelemetryRecord> {
        let records = self.lock();
        let take = n.map_or(records.len(), |n| n.min(records.len()));
        records.iter().skip(records.len() - take).cloned().collect()
    }

    /// Every retained record together with a generated download filename
    pub fn export(&self) -> TelemetryExport {
        self.export_at(Utc::now())
    }

    /// Same as [`export`](Self::export) with an explicit clock
    pub fn export_at(&self, now: DateTime<Utc>) -> TelemetryExport {
        let data = self.history(None);
        TelemetryExport {
            filename: export_filename(now),
            count: data.len(),
            data,
        }
    }

    /// Drop every record, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut records = self.lock();
        let count = records.len();
        records.clear();
        count
    }

    /// Aggregate statistics, `None` when the store is empty
    ///
    /// Each aggregate only considers records that carry the field; an
    /// aggregate without any contributing record reports 0.
    pub fn stats(&self) -> Option<TelemetryStats> {
        let records = self.lock();
        if records.is_empty() {
            return None;
        }

        let mut error = IncrementalStats::new();
        let mut left = IncrementalStats::new();
        let mut right = IncrementalStats::new();

        for record in records.iter() {
            error.push_opt(record.control_error());
            left.push_opt(record.left_speed().map(f64::from));
            right.push_opt(record.right_speed().map(f64::from));
        }

        let (min_left, max_left, _) = left.as_tuple();
        let (min_right, max_right, _) = right.as_tuple();

        Some(TelemetryStats {
            total_records: records.len(),
            error_samples: error.count,
            avg_error: error.average(),
            max_left_speed: max_left,
            min_left_speed: min_left,
            max_right_speed: max_right,
            min_right_speed: min_right,
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TelemetryRecord>> {
        // Every mutation completes under the guard, so a poisoned buffer is still consistent
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the export filename, e.g. `telemetry_2024-05-01T12-30-00-123Z.json`
pub fn export_filename(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("telemetry_{}.json", stamp)
}
