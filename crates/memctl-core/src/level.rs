//! Discrete memory pressure levels.
//!
//! Callers branch on the level, never on raw byte counts, so thresholds can be
//! retuned without touching write paths. Variants are declared in increasing
//! order of pressure; the derived `Ord` is the contract.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UsageLevel {
    #[default]
    Safe = 0,
    Warning = 1,
    Dangerous = 2,
    /// Above the reject cut. The caller must not proceed with the write.
    Reject = 3,
}

impl UsageLevel {
    pub const ALL: [UsageLevel; 4] = [
        UsageLevel::Safe,
        UsageLevel::Warning,
        UsageLevel::Dangerous,
        UsageLevel::Reject,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UsageLevel::Safe => "safe",
            UsageLevel::Warning => "warning",
            UsageLevel::Dangerous => "dangerous",
            UsageLevel::Reject => "reject",
        }
    }

    /// Compact encoding for storing a level in an atomic.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`UsageLevel::as_u8`]; out-of-range values saturate to `Reject`.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => UsageLevel::Safe,
            1 => UsageLevel::Warning,
            2 => UsageLevel::Dangerous,
            _ => UsageLevel::Reject,
        }
    }

    /// True for levels at which buffered data should be flushed.
    pub fn is_elevated(self) -> bool {
        self > UsageLevel::Safe
    }
}

impl fmt::Display for UsageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
