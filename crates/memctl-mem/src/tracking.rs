//! The tracking controller and its peak/level hooks.
//!
//! Classification always uses the total returned by the ledger update itself,
//! never a separate re-read, so a caller cannot be handed a level computed from
//! a total that a concurrent acquire already raised.

use std::sync::atomic::{AtomicU64, Ordering};

use memctl_core::config::{MemControlConfig, Thresholds};
use memctl_core::controller::MemoryController;
use memctl_core::error::Result;
use memctl_core::id::UserId;
use memctl_core::level::UsageLevel;

use crate::ledger::UsageLedger;
use crate::report::{UsageReport, UserUsage};

#[derive(Default)]
pub struct PeakTracker {
    peak_bytes: AtomicU64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak_bytes: AtomicU64::new(0),
        }
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record_used(&self, used_bytes: u64) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while used_bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                used_bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
    }

    pub fn peak(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.peak_bytes.store(0, Ordering::Relaxed);
    }
}

/// Ledger-backed controller classifying totals against fixed thresholds.
pub struct TrackingController {
    thresholds: Thresholds,
    ledger: UsageLedger,
    peak: PeakTracker,
    transitions: AtomicU64,
}

impl TrackingController {
    pub fn new(thresholds: Thresholds, per_user_accounting: bool) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            budget = thresholds.budget,
            warning = thresholds.warning,
            dangerous = thresholds.dangerous,
            reject = ?thresholds.reject,
            per_user_accounting,
            "tracking memory controller created"
        );
        Self {
            thresholds,
            ledger: UsageLedger::new(per_user_accounting),
            peak: PeakTracker::new(),
            transitions: AtomicU64::new(0),
        }
    }

    /// Validate `cfg` and build. Fails fast on bad thresholds.
    pub fn from_config(cfg: &MemControlConfig) -> Result<Self> {
        Ok(Self::new(cfg.thresholds()?, cfg.per_user_accounting))
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn usage_of(&self, user: UserId) -> u64 {
        self.ledger.usage_of(user)
    }

    pub fn active_users(&self) -> usize {
        self.ledger.active_users()
    }

    pub fn peak_usage(&self) -> u64 {
        self.peak.peak()
    }

    /// Level changes observed since construction or the last `clear`.
    pub fn level_transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> UsageReport {
        let total_bytes = self.ledger.total();
        UsageReport {
            enabled: true,
            total_bytes,
            peak_bytes: self.peak.peak(),
            level: self.thresholds.level_for(total_bytes),
            budget_bytes: self.thresholds.budget,
            warning_bytes: self.thresholds.warning,
            dangerous_bytes: self.thresholds.dangerous,
            reject_bytes: self.thresholds.reject,
            users: self
                .ledger
                .users_snapshot()
                .into_iter()
                .map(|(user, bytes)| UserUsage { user, bytes })
                .collect(),
        }
    }

    /// Log a level change between the totals on either side of one ledger
    /// update. Both totals come from the same atomic step, so concurrent
    /// updates each see their own crossing and none is counted twice.
    fn note_transition(&self, before: u64, after: u64) -> Option<(UsageLevel, UsageLevel)> {
        let prev = self.thresholds.level_for(before);
        let level = self.thresholds.level_for(after);
        if prev == level {
            return None;
        }
        self.transitions.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        {
            let budget = self.thresholds.budget;
            if level > prev && level >= UsageLevel::Dangerous {
                tracing::warn!(%prev, %level, total = after, budget, "memory usage level raised");
            } else {
                tracing::info!(%prev, %level, total = after, budget, "memory usage level changed");
            }
        }
        Some((prev, level))
    }
}

impl MemoryController for TrackingController {
    fn acquire_usage(&self, user: UserId, usage: u64) -> UsageLevel {
        let claim = self.ledger.add(user, usage);
        self.peak.record_used(claim.total);
        let level = self.thresholds.level_for(claim.total);
        #[cfg(feature = "tracing")]
        tracing::trace!(%user, usage, total = claim.total, %level, "acquire");
        self.note_transition(claim.before, claim.total);
        level
    }

    fn release_usage(&self, user: UserId, size: u64) {
        let r = self.ledger.sub(user, size);
        if r.shortfall > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                %user,
                requested = size,
                released = r.released,
                "released more memory than was acquired; clamped"
            );
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(%user, size, total = r.total, "release");
        self.note_transition(r.before, r.total);
    }

    fn total_usage(&self) -> u64 {
        self.ledger.total()
    }

    fn current_level(&self) -> UsageLevel {
        self.thresholds.level_for(self.ledger.total())
    }

    fn clear(&self) {
        self.ledger.clear();
        self.peak.reset();
        self.transitions.store(0, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::debug!("memory controller cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn controller(low: u64, high: u64) -> TrackingController {
        let cfg = MemControlConfig::with_byte_thresholds(1000, low, high);
        TrackingController::from_config(&cfg).unwrap()
    }

    #[test]
    fn escalates_through_bands_and_releases() {
        let c = controller(100, 200);
        let u = UserId::new(1);

        assert_eq!(c.acquire_usage(u, 50), UsageLevel::Safe);
        assert_eq!(c.total_usage(), 50);
        assert_eq!(c.acquire_usage(u, 60), UsageLevel::Warning);
        assert_eq!(c.total_usage(), 110);
        assert_eq!(c.acquire_usage(u, 100), UsageLevel::Dangerous);
        assert_eq!(c.total_usage(), 210);

        c.release_usage(u, 150);
        assert_eq!(c.total_usage(), 60);
        assert_eq!(c.current_level(), UsageLevel::Safe);
        assert_eq!(c.peak_usage(), 210);
    }

    #[test]
    fn transitions_follow_each_crossing() {
        let c = controller(100, 200);
        let u = UserId::new(1);
        c.acquire_usage(u, 50);
        assert_eq!(c.level_transitions(), 0);
        c.acquire_usage(u, 60);
        c.acquire_usage(u, 100);
        assert_eq!(c.level_transitions(), 2);
        c.release_usage(u, 150);
        assert_eq!(c.level_transitions(), 3);
        assert_eq!(
            c.note_transition(210, 60),
            Some((UsageLevel::Dangerous, UsageLevel::Safe))
        );
        assert_eq!(c.note_transition(10, 20), None);
    }

    #[test]
    fn concurrent_crossings_pair_up() {
        let cfg = MemControlConfig::with_byte_thresholds(1_000_000, 100, 900_000);
        let c = Arc::new(TrackingController::from_config(&cfg).unwrap());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        c.acquire_usage(UserId::new(i), 60);
                        c.release_usage(UserId::new(i), 60);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread panicked");
        }
        assert_eq!(c.total_usage(), 0);
        // Back at Safe: every upward crossing was matched by exactly one downward one.
        assert_eq!(c.level_transitions() % 2, 0);
    }

    #[test]
    fn reject_band_when_configured() {
        let mut cfg = MemControlConfig::with_byte_thresholds(1000, 100, 200);
        cfg.reject = Some(memctl_core::config::Threshold::Bytes(1000));
        let c = TrackingController::from_config(&cfg).unwrap();
        let u = UserId::new(7);
        assert_eq!(c.acquire_usage(u, 1000), UsageLevel::Dangerous);
        assert_eq!(c.acquire_usage(u, 1), UsageLevel::Reject);
    }

    #[test]
    fn over_release_keeps_a_sane_baseline() {
        let c = controller(100, 200);
        let u = UserId::new(1);
        c.acquire_usage(u, 30);
        c.release_usage(u, 10_000);
        assert_eq!(c.total_usage(), 0);
        assert_eq!(c.acquire_usage(u, 150), UsageLevel::Warning);
        assert_eq!(c.total_usage(), 150);
    }

    #[test]
    fn clear_resets_everything() {
        let c = controller(100, 200);
        c.acquire_usage(UserId::new(1), 500);
        c.acquire_usage(UserId::new(2), 5);
        c.clear();
        assert_eq!(c.total_usage(), 0);
        assert_eq!(c.active_users(), 0);
        assert_eq!(c.peak_usage(), 0);
        c.clear();
        assert_eq!(c.total_usage(), 0);
        assert_eq!(c.current_level(), UsageLevel::Safe);
    }

    #[test]
    fn report_lists_users() {
        let c = controller(100, 200);
        c.acquire_usage(UserId::new(1), 20);
        c.acquire_usage(UserId::new(2), 90);
        let r = c.report();
        assert!(r.enabled);
        assert_eq!(r.total_bytes, 110);
        assert_eq!(r.level, UsageLevel::Warning);
        assert_eq!(r.users[0], UserUsage { user: UserId::new(2), bytes: 90 });
        assert_eq!(r.users.len(), 2);
    }

    #[test]
    fn peak_tracker_keeps_max() {
        let p = PeakTracker::new();
        p.record_used(10);
        p.record_used(5);
        p.record_used(12);
        assert_eq!(p.peak(), 12);
    }

    #[test]
    fn concurrent_acquire_levels_reflect_post_update_totals() {
        let cfg = MemControlConfig::with_byte_thresholds(1_000_000, 1000, 900_000);
        let c = Arc::new(TrackingController::from_config(&cfg).unwrap());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    let mut levels = Vec::new();
                    for _ in 0..500 {
                        levels.push(c.acquire_usage(UserId::new(i), 10));
                    }
                    levels
                })
            })
            .collect();
        let mut warnings = 0;
        for h in handles {
            warnings += h
                .join()
                .expect("thread panicked")
                .into_iter()
                .filter(|l| *l == UsageLevel::Warning)
                .count();
        }
        assert_eq!(c.total_usage(), 40_000);
        // Every acquire after the 100th overall sees a post-update total > 1000.
        assert_eq!(warnings, 4000 - 100);
    }
}
