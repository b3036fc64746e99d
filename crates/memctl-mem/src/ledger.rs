//! The usage ledger: total claimed bytes plus an optional per-user breakdown.
//!
//! Without per-user accounting the total is a lone atomic updated with CAS
//! loops. With it, every mutation of the map *and* the total happens under the
//! map lock, so the total equals the sum of the entries whenever the lock is
//! free. The total stays an atomic in both modes so `total()` never locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use memctl_core::id::UserId;

/// Outcome of an addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Total immediately before this addition.
    pub before: u64,
    /// Bytes actually added; less than requested only at `u64::MAX`.
    pub granted: u64,
    /// Total after the addition.
    pub total: u64,
}

/// Outcome of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    /// Total immediately before this release.
    pub before: u64,
    /// Bytes actually subtracted from the ledger.
    pub released: u64,
    /// Requested bytes that were not held (caller over-release).
    pub shortfall: u64,
    /// Total after the release.
    pub total: u64,
}

pub struct UsageLedger {
    total: AtomicU64,
    users: Option<Mutex<HashMap<UserId, u64>>>,
}

impl UsageLedger {
    pub fn new(per_user: bool) -> Self {
        Self {
            total: AtomicU64::new(0),
            users: per_user.then(|| Mutex::new(HashMap::new())),
        }
    }

    pub fn tracks_users(&self) -> bool {
        self.users.is_some()
    }

    /// Add `bytes` for `user`.
    ///
    /// Entry and total are clamped together so their sum invariant survives
    /// saturation: every entry is <= the total, so the total's headroom bounds both.
    pub fn add(&self, user: UserId, bytes: u64) -> Claim {
        match &self.users {
            Some(users) => {
                let mut users = lock(users);
                let before = self.total.load(Ordering::Relaxed);
                let granted = bytes.min(u64::MAX - before);
                let entry = users.entry(user).or_insert(0);
                *entry += granted;
                let total = before + granted;
                self.total.store(total, Ordering::Release);
                Claim {
                    before,
                    granted,
                    total,
                }
            }
            None => loop {
                let before = self.total.load(Ordering::Relaxed);
                let granted = bytes.min(u64::MAX - before);
                let total = before + granted;
                if self
                    .total
                    .compare_exchange(before, total, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    return Claim {
                        before,
                        granted,
                        total,
                    };
                }
            },
        }
    }

    /// Subtract up to `bytes` for `user`, clamping at what is held.
    ///
    /// With per-user accounting the clamp is the user's own entry; otherwise it
    /// is the global total.
    pub fn sub(&self, user: UserId, bytes: u64) -> Release {
        match &self.users {
            Some(users) => {
                let mut users = lock(users);
                let before = self.total.load(Ordering::Relaxed);
                let held = users.get(&user).copied().unwrap_or(0);
                let released = held.min(bytes);
                if held == released {
                    users.remove(&user);
                } else {
                    users.insert(user, held - released);
                }
                let next = before.saturating_sub(released);
                self.total.store(next, Ordering::Release);
                Release {
                    before,
                    released,
                    shortfall: bytes - released,
                    total: next,
                }
            }
            None => loop {
                let cur = self.total.load(Ordering::Relaxed);
                let released = cur.min(bytes);
                let next = cur - released;
                if self
                    .total
                    .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    return Release {
                        before: cur,
                        released,
                        shortfall: bytes - released,
                        total: next,
                    };
                }
            },
        }
    }

    /// Point-in-time total.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Bytes held by `user`; 0 when unknown or when users are not tracked.
    pub fn usage_of(&self, user: UserId) -> u64 {
        self.users
            .as_ref()
            .and_then(|users| lock(users).get(&user).copied())
            .unwrap_or(0)
    }

    /// Number of users currently holding bytes.
    pub fn active_users(&self) -> usize {
        self.users.as_ref().map_or(0, |users| lock(users).len())
    }

    /// Copy of the per-user breakdown, largest holders first.
    pub fn users_snapshot(&self) -> Vec<(UserId, u64)> {
        let Some(users) = &self.users else {
            return Vec::new();
        };
        let mut out: Vec<(UserId, u64)> = lock(users).iter().map(|(u, b)| (*u, *b)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Drop every entry and zero the total.
    pub fn clear(&self) {
        match &self.users {
            Some(users) => {
                let mut users = lock(users);
                users.clear();
                self.total.store(0, Ordering::Release);
            }
            None => self.total.store(0, Ordering::Release),
        }
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A writer that panicked mid-update cannot leave the map half-written (every
/// critical section is a handful of infallible ops), so poisoning is ignored.
fn lock(m: &Mutex<HashMap<UserId, u64>>) -> MutexGuard<'_, HashMap<UserId, u64>> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
