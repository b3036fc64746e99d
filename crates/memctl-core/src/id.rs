//! Strongly-typed identifiers used across memctl.
//!
//! A `UserId` names one memory claimant (typically one in-memory write buffer).
//! The controller never looks inside it; it only needs `Eq + Hash + Ord`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(UserId);

/// Issues process-unique `UserId`s, starting at 1.
#[derive(Debug)]
pub struct UserIdAllocator {
    next: AtomicU64,
}

impl UserIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> UserId {
        UserId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for UserIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
