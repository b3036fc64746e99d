//! Per-partition in-memory write buffer.
//!
//! A `MemTableWriter` is one accounting user. Every byte it buffers has been
//! acquired from the controller first, and `held` always equals the bytes it
//! has acquired and not yet released. Flushing or dropping the writer gives
//! exactly `held` back.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use memctl_core::controller::MemoryController;
use memctl_core::id::UserId;
use memctl_core::level::UsageLevel;
use memctl_mem::SharedController;

use crate::error::{Result, WriteError};
use crate::metrics;
use crate::policy::{Admission, BackpressurePolicy};
use crate::sink::FlushSink;

/// Bookkeeping cost of one buffered point beyond its value bytes.
const POINT_OVERHEAD: u64 = 24;
/// Bookkeeping cost of one buffered series beyond its path bytes.
const SERIES_OVERHEAD: u64 = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: String,
}

impl DataPoint {
    fn accounted_bytes(&self) -> u64 {
        point_bytes(&self.value)
    }
}

fn point_bytes(value: &str) -> u64 {
    POINT_OVERHEAD + value.len() as u64
}

fn series_bytes(path: &str) -> u64 {
    SERIES_OVERHEAD + path.len() as u64
}

/// Result of an accepted write. The data is buffered even when a follow-up
/// flush failed; retrying the write would buffer it twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Level returned by the controller for this write's acquisition.
    pub level: UsageLevel,
    /// Whether the writer flushed after buffering.
    pub flushed: bool,
    /// Set when a follow-up flush was attempted and the sink failed.
    pub flush_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub series: usize,
    pub points: usize,
    pub bytes: u64,
}

/// The mutation half of a query-process executor.
pub trait WriteExecutor {
    /// Insert one value for one series at `time`.
    fn insert(&mut self, path: &str, time: i64, value: &str) -> Result<WriteOutcome>;

    /// Insert one value per measurement of `device` at `time`, all or nothing.
    fn multi_insert(
        &mut self,
        device: &str,
        time: i64,
        measurements: &[&str],
        values: &[&str],
    ) -> Result<WriteOutcome>;

    /// Drop buffered points of `path` at or before `delete_time`. Returns points removed.
    fn delete(&mut self, path: &str, delete_time: i64) -> Result<usize>;

    /// Overwrite buffered values of `path` within `[start, end]`. Returns points changed.
    ///
    /// Growth is admitted like an insert; a failed follow-up flush does not fail the update.
    fn update(&mut self, path: &str, start: i64, end: i64, value: &str) -> Result<usize>;
}

pub struct MemTableWriter<C: MemoryController, S: FlushSink> {
    controller: Arc<C>,
    user: UserId,
    policy: BackpressurePolicy,
    sink: S,
    series: BTreeMap<String, Vec<DataPoint>>,
    held: u64,
}

impl<S: FlushSink> MemTableWriter<SharedController, S> {
    /// New writer with a fresh user id issued by `shared`.
    pub fn register(shared: Arc<SharedController>, policy: BackpressurePolicy, sink: S) -> Self {
        let user = shared.register_user();
        Self::new(shared, user, policy, sink)
    }
}

impl<C: MemoryController, S: FlushSink> MemTableWriter<C, S> {
    pub fn new(controller: Arc<C>, user: UserId, policy: BackpressurePolicy, sink: S) -> Self {
        Self {
            controller,
            user,
            policy,
            sink,
            series: BTreeMap::new(),
            held: 0,
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Bytes acquired from the controller and not yet released.
    pub fn held_bytes(&self) -> u64 {
        self.held
    }

    pub fn point_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Write every buffered series to the sink and release the writer's bytes.
    ///
    /// Each series leaves the buffer, and its bytes are released, as soon as
    /// the sink accepts it. On a sink error the failing series and everything
    /// after it stay buffered, so a retry never rewrites accepted series.
    pub fn flush(&mut self) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        while let Some((path, mut points)) = self.series.pop_first() {
            points.sort_by_key(|p| p.timestamp);
            if let Err(e) = self.sink.write_series(&path, &points) {
                self.series.insert(path, points);
                metrics::emit_flush_failure(self.user, stats.series, &e);
                return Err(e);
            }
            let bytes = series_bytes(&path)
                + points.iter().map(DataPoint::accounted_bytes).sum::<u64>();
            self.give_back(bytes);
            stats.series += 1;
            stats.points += points.len();
            stats.bytes += bytes;
        }
        if stats.series > 0 {
            metrics::emit_flush(self.user, stats.series, stats.points, stats.bytes);
        }
        Ok(stats)
    }

    /// Acquire `bytes` and decide whether the write may proceed.
    fn admit(&mut self, op: &'static str, bytes: u64) -> Result<(UsageLevel, Admission)> {
        let level = self.controller.acquire_usage(self.user, bytes);
        let admission = self.policy.admission(level);
        if admission == Admission::Reject {
            self.controller.release_usage(self.user, bytes);
            metrics::emit_reject(self.user, bytes, level);
            return Err(WriteError::Rejected {
                level,
                requested: bytes,
            });
        }
        self.held += bytes;
        metrics::emit_write(op, self.user, bytes, level);
        Ok((level, admission))
    }

    fn give_back(&mut self, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let bytes = bytes.min(self.held);
        self.held -= bytes;
        self.controller.release_usage(self.user, bytes);
    }

    /// Flush after an accepted write. A sink failure does not undo the write.
    fn flush_after_write(&mut self) -> Option<String> {
        self.flush().err().map(|e| e.to_string())
    }

    fn finish(&mut self, level: UsageLevel, admission: Admission) -> Result<WriteOutcome> {
        let attempted = admission == Admission::ProceedAndFlush;
        let flush_error = if attempted {
            self.flush_after_write()
        } else {
            None
        };
        Ok(WriteOutcome {
            level,
            flushed: attempted && flush_error.is_none(),
            flush_error,
        })
    }

    fn cost_of(&self, path: &str, value: &str) -> u64 {
        let series = if self.series.contains_key(path) {
            0
        } else {
            series_bytes(path)
        };
        series + point_bytes(value)
    }

    fn buffer(&mut self, path: &str, time: i64, value: &str) {
        self.series
            .entry(path.to_string())
            .or_default()
            .push(DataPoint {
                timestamp: time,
                value: value.to_string(),
            });
    }
}

impl<C: MemoryController, S: FlushSink> WriteExecutor for MemTableWriter<C, S> {
    fn insert(&mut self, path: &str, time: i64, value: &str) -> Result<WriteOutcome> {
        if path.is_empty() {
            return Err(WriteError::InvalidInput("empty series path".into()));
        }
        let bytes = self.cost_of(path, value);
        let (level, admission) = self.admit("insert", bytes)?;
        self.buffer(path, time, value);
        self.finish(level, admission)
    }

    fn multi_insert(
        &mut self,
        device: &str,
        time: i64,
        measurements: &[&str],
        values: &[&str],
    ) -> Result<WriteOutcome> {
        if measurements.len() != values.len() {
            return Err(WriteError::InvalidInput(format!(
                "{} measurements but {} values",
                measurements.len(),
                values.len()
            )));
        }
        if device.is_empty() || measurements.is_empty() {
            return Err(WriteError::InvalidInput("empty device or measurement list".into()));
        }
        let mut distinct = measurements.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != measurements.len() {
            return Err(WriteError::InvalidInput(format!(
                "duplicate measurement in multi-insert for {device}"
            )));
        }
        let paths: Vec<String> = measurements
            .iter()
            .map(|m| format!("{device}.{m}"))
            .collect();
        let bytes = paths
            .iter()
            .zip(values)
            .map(|(p, v)| self.cost_of(p, v))
            .sum();
        let (level, admission) = self.admit("multi_insert", bytes)?;
        for (path, value) in paths.iter().zip(values) {
            self.buffer(path, time, value);
        }
        self.finish(level, admission)
    }

    fn delete(&mut self, path: &str, delete_time: i64) -> Result<usize> {
        let Some(points) = self.series.get_mut(path) else {
            return Ok(0);
        };
        let before = points.len();
        let mut freed = 0;
        points.retain(|p| {
            if p.timestamp <= delete_time {
                freed += p.accounted_bytes();
                false
            } else {
                true
            }
        });
        let removed = before - points.len();
        if points.is_empty() {
            self.series.remove(path);
            freed += series_bytes(path);
        }
        self.give_back(freed);
        Ok(removed)
    }

    fn update(&mut self, path: &str, start: i64, end: i64, value: &str) -> Result<usize> {
        if start > end {
            return Err(WriteError::InvalidInput(format!(
                "update range start {start} is after end {end}"
            )));
        }
        let Some(points) = self.series.get(path) else {
            return Ok(0);
        };
        let (count, old_bytes) = points
            .iter()
            .filter(|p| (start..=end).contains(&p.timestamp))
            .fold((0usize, 0u64), |(n, b), p| (n + 1, b + p.accounted_bytes()));
        if count == 0 {
            return Ok(0);
        }
        let new_bytes = count as u64 * point_bytes(value);
        let mut flush_after = false;
        if new_bytes > old_bytes {
            let (_, admission) = self.admit("update", new_bytes - old_bytes)?;
            flush_after = admission == Admission::ProceedAndFlush;
        }
        if let Some(points) = self.series.get_mut(path) {
            for p in points
                .iter_mut()
                .filter(|p| (start..=end).contains(&p.timestamp))
            {
                p.value = value.to_string();
            }
        }
        if old_bytes > new_bytes {
            self.give_back(old_bytes - new_bytes);
        }
        if flush_after {
            // Logged by the flush; the update stands either way.
            let _ = self.flush_after_write();
        }
        Ok(count)
    }
}

impl<C: MemoryController, S: FlushSink> Drop for MemTableWriter<C, S> {
    fn drop(&mut self) {
        // Unflushed data is discarded; its bytes must not stay claimed.
        let held = self.held;
        self.give_back(held);
    }
}
