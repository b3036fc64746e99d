//! The no-op controller, used when tracking overhead is not worth paying.
//!
//! Holds no state and touches no shared memory, so it costs nothing on the
//! write hot path. Indistinguishable from memory control being switched off.

use memctl_core::controller::MemoryController;
use memctl_core::id::UserId;
use memctl_core::level::UsageLevel;

use crate::report::UsageReport;

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledController;

impl DisabledController {
    pub const fn new() -> Self {
        Self
    }

    pub fn report(&self) -> UsageReport {
        UsageReport::disabled()
    }
}

impl MemoryController for DisabledController {
    #[inline]
    fn acquire_usage(&self, _user: UserId, _usage: u64) -> UsageLevel {
        UsageLevel::Safe
    }

    #[inline]
    fn release_usage(&self, _user: UserId, _size: u64) {}

    #[inline]
    fn total_usage(&self) -> u64 {
        0
    }

    #[inline]
    fn current_level(&self) -> UsageLevel {
        UsageLevel::Safe
    }

    #[inline]
    fn clear(&self) {}
}
