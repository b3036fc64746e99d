//! Tracing hooks for the write path.
//!
//! Wire these to a metrics backend in the binary layer.

use memctl_core::id::UserId;
use memctl_core::level::UsageLevel;

#[cfg(feature = "tracing")]
pub fn emit_write(op: &'static str, user: UserId, bytes: u64, level: UsageLevel) {
    let span = tracing::span!(tracing::Level::TRACE, "memctl.write", op, %user);
    let _enter = span.enter();
    tracing::trace!(bytes, %level, "buffered");
}

#[cfg(not(feature = "tracing"))]
pub fn emit_write(_op: &'static str, _user: UserId, _bytes: u64, _level: UsageLevel) {}

#[cfg(feature = "tracing")]
pub fn emit_flush(user: UserId, series: usize, points: usize, bytes: u64) {
    tracing::debug!(%user, series, points, bytes, "memtable flushed");
}

#[cfg(not(feature = "tracing"))]
pub fn emit_flush(_user: UserId, _series: usize, _points: usize, _bytes: u64) {}

#[cfg(feature = "tracing")]
pub fn emit_reject(user: UserId, bytes: u64, level: UsageLevel) {
    tracing::warn!(%user, bytes, %level, "write rejected by memory backpressure");
}

#[cfg(not(feature = "tracing"))]
pub fn emit_reject(_user: UserId, _bytes: u64, _level: UsageLevel) {}

#[cfg(feature = "tracing")]
pub fn emit_flush_failure(user: UserId, written: usize, err: &crate::error::WriteError) {
    tracing::warn!(%user, written, error = %err, "memtable flush failed; unwritten series stay buffered");
}

#[cfg(not(feature = "tracing"))]
pub fn emit_flush_failure(_user: UserId, _written: usize, _err: &crate::error::WriteError) {}
