//! The controller interface every write path calls.
//!
//! Two implementations exist in `memctl-mem`: a tracking controller that keeps a
//! ledger and classifies it against thresholds, and a disabled controller that
//! does nothing and always answers `Safe`. Write paths call this interface
//! unconditionally; which variant sits behind it is a configuration choice.

use crate::id::UserId;
use crate::level::UsageLevel;

/// Accounting for memory claimed by concurrent writers.
///
/// None of these calls block, allocate on the writer's behalf, or fail. Pressure
/// is reported only through the returned [`UsageLevel`]; reacting to it (flush,
/// stall, refuse) is the caller's job.
pub trait MemoryController: Send + Sync {
    /// Claim `usage` bytes for `user` and classify the resulting total.
    fn acquire_usage(&self, user: UserId, usage: u64) -> UsageLevel;

    /// Return `size` bytes previously claimed by `user`.
    ///
    /// Releasing more than was claimed is a caller bug; it is clamped, never
    /// propagated as a negative total.
    fn release_usage(&self, user: UserId, size: u64);

    /// Point-in-time total of claimed bytes.
    fn total_usage(&self) -> u64;

    /// Classify the current total without changing it.
    fn current_level(&self) -> UsageLevel;

    /// Reset the ledger to empty.
    fn clear(&self);
}
