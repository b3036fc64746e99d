//! Controller selection.
//!
//! `MemController` is the one type write paths hold. It is a plain enum over
//! the two variants so each call is a direct match, not a vtable hop, and the
//! variant is fixed for the lifetime of the instance.

use memctl_core::config::MemControlConfig;
use memctl_core::controller::MemoryController;
use memctl_core::error::Result;
use memctl_core::id::{UserId, UserIdAllocator};
use memctl_core::level::UsageLevel;

use crate::disabled::DisabledController;
use crate::report::UsageReport;
use crate::tracking::TrackingController;

pub enum MemController {
    Tracking(TrackingController),
    Disabled(DisabledController),
}

/// A controller together with the allocator issuing its user ids.
pub struct SharedController {
    controller: MemController,
    ids: UserIdAllocator,
}

impl MemController {
    /// Pick and build the variant described by `cfg`.
    ///
    /// Threshold validation only applies when tracking is enabled.
    pub fn from_config(cfg: &MemControlConfig) -> Result<Self> {
        if cfg.enabled {
            Ok(MemController::Tracking(TrackingController::from_config(cfg)?))
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("memory control disabled");
            Ok(MemController::Disabled(DisabledController::new()))
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, MemController::Tracking(_))
    }

    pub fn usage_of(&self, user: UserId) -> u64 {
        match self {
            MemController::Tracking(c) => c.usage_of(user),
            MemController::Disabled(_) => 0,
        }
    }

    pub fn active_users(&self) -> usize {
        match self {
            MemController::Tracking(c) => c.active_users(),
            MemController::Disabled(_) => 0,
        }
    }

    pub fn peak_usage(&self) -> u64 {
        match self {
            MemController::Tracking(c) => c.peak_usage(),
            MemController::Disabled(_) => 0,
        }
    }

    pub fn report(&self) -> UsageReport {
        match self {
            MemController::Tracking(c) => c.report(),
            MemController::Disabled(c) => c.report(),
        }
    }
}

impl MemoryController for MemController {
    #[inline]
    fn acquire_usage(&self, user: UserId, usage: u64) -> UsageLevel {
        match self {
            MemController::Tracking(c) => c.acquire_usage(user, usage),
            MemController::Disabled(c) => c.acquire_usage(user, usage),
        }
    }

    #[inline]
    fn release_usage(&self, user: UserId, size: u64) {
        match self {
            MemController::Tracking(c) => c.release_usage(user, size),
            MemController::Disabled(c) => c.release_usage(user, size),
        }
    }

    #[inline]
    fn total_usage(&self) -> u64 {
        match self {
            MemController::Tracking(c) => c.total_usage(),
            MemController::Disabled(c) => c.total_usage(),
        }
    }

    #[inline]
    fn current_level(&self) -> UsageLevel {
        match self {
            MemController::Tracking(c) => c.current_level(),
            MemController::Disabled(c) => c.current_level(),
        }
    }

    #[inline]
    fn clear(&self) {
        match self {
            MemController::Tracking(c) => c.clear(),
            MemController::Disabled(c) => c.clear(),
        }
    }
}

impl SharedController {
    pub fn from_config(cfg: &MemControlConfig) -> Result<Self> {
        Ok(Self::new(MemController::from_config(cfg)?))
    }

    pub fn new(controller: MemController) -> Self {
        Self {
            controller,
            ids: UserIdAllocator::new(),
        }
    }

    /// Issue a fresh accounting identity for a new writer.
    pub fn register_user(&self) -> UserId {
        self.ids.next_id()
    }

    pub fn controller(&self) -> &MemController {
        &self.controller
    }
}

impl std::ops::Deref for SharedController {
    type Target = MemController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl MemoryController for SharedController {
    #[inline]
    fn acquire_usage(&self, user: UserId, usage: u64) -> UsageLevel {
        self.controller.acquire_usage(user, usage)
    }

    #[inline]
    fn release_usage(&self, user: UserId, size: u64) {
        self.controller.release_usage(user, size)
    }

    #[inline]
    fn total_usage(&self) -> u64 {
        self.controller.total_usage()
    }

    #[inline]
    fn current_level(&self) -> UsageLevel {
        self.controller.current_level()
    }

    #[inline]
    fn clear(&self) {
        self.controller.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memctl_core::error::Error;

    #[test]
    fn selects_variant_from_config() {
        let c = MemController::from_config(&MemControlConfig::default()).unwrap();
        assert!(c.is_tracking());

        let c = MemController::from_config(&MemControlConfig::disabled()).unwrap();
        assert!(!c.is_tracking());
        assert!(!c.report().enabled);
    }

    #[test]
    fn bad_thresholds_fail_only_when_tracking() {
        let mut cfg = MemControlConfig::with_byte_thresholds(1000, 500, 100);
        assert!(matches!(
            MemController::from_config(&cfg),
            Err(Error::Config(_))
        ));
        cfg.enabled = false;
        assert!(MemController::from_config(&cfg).is_ok());
    }

    #[test]
    fn shared_controller_issues_distinct_users() {
        let shared =
            SharedController::from_config(&MemControlConfig::with_byte_thresholds(1000, 100, 200))
                .unwrap();
        let a = shared.register_user();
        let b = shared.register_user();
        assert_ne!(a, b);

        shared.acquire_usage(a, 40);
        shared.acquire_usage(b, 70);
        assert_eq!(shared.usage_of(a), 40);
        assert_eq!(shared.active_users(), 2);
        assert_eq!(shared.current_level(), UsageLevel::Warning);
    }
}
