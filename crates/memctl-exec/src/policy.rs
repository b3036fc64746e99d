//! Caller-side interpretation of usage levels.
//!
//! The controller only reports pressure. Whether a given level means "go on",
//! "go on but flush", or "refuse" is decided here, per writer.

use serde::{Deserialize, Serialize};

use memctl_core::level::UsageLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Proceed,
    /// Buffer the write, then flush this writer.
    ProceedAndFlush,
    /// Do not buffer; give the claimed bytes back.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackpressurePolicy {
    /// Flush after buffering at this level or above.
    pub flush_at: UsageLevel,
    /// Refuse writes at this level or above; `None` never refuses.
    pub reject_at: Option<UsageLevel>,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self {
            flush_at: UsageLevel::Warning,
            reject_at: Some(UsageLevel::Reject),
        }
    }
}

impl BackpressurePolicy {
    /// Treat `Dangerous` as a hard stop.
    pub fn strict() -> Self {
        Self {
            flush_at: UsageLevel::Warning,
            reject_at: Some(UsageLevel::Dangerous),
        }
    }

    /// Never refuse; only flush.
    pub fn advisory() -> Self {
        Self {
            flush_at: UsageLevel::Warning,
            reject_at: None,
        }
    }

    pub fn admission(&self, level: UsageLevel) -> Admission {
        if self.reject_at.is_some_and(|r| level >= r) {
            Admission::Reject
        } else if level >= self.flush_at {
            Admission::ProceedAndFlush
        } else {
            Admission::Proceed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_rejects_only_reject_band() {
        let p = BackpressurePolicy::default();
        assert_eq!(p.admission(UsageLevel::Safe), Admission::Proceed);
        assert_eq!(p.admission(UsageLevel::Warning), Admission::ProceedAndFlush);
        assert_eq!(p.admission(UsageLevel::Dangerous), Admission::ProceedAndFlush);
        assert_eq!(p.admission(UsageLevel::Reject), Admission::Reject);
    }

    #[test]
    fn strict_and_advisory() {
        assert_eq!(
            BackpressurePolicy::strict().admission(UsageLevel::Dangerous),
            Admission::Reject
        );
        assert_eq!(
            BackpressurePolicy::advisory().admission(UsageLevel::Reject),
            Admission::ProceedAndFlush
        );
    }

    #[test]
    fn policy_deserializes() {
        let p: BackpressurePolicy =
            serde_json::from_str(r#"{"flush_at":"dangerous","reject_at":null}"#).unwrap();
        assert_eq!(p.admission(UsageLevel::Warning), Admission::Proceed);
        assert_eq!(p.admission(UsageLevel::Reject), Admission::ProceedAndFlush);
    }
}
