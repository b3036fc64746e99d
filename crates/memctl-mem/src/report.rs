//! Serializable point-in-time view of the controller, for diagnostics.

use serde::{Deserialize, Serialize};

use memctl_core::id::UserId;
use memctl_core::level::UsageLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    pub user: UserId,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub enabled: bool,
    pub total_bytes: u64,
    pub peak_bytes: u64,
    pub level: UsageLevel,
    pub budget_bytes: u64,
    pub warning_bytes: u64,
    pub dangerous_bytes: u64,
    pub reject_bytes: Option<u64>,
    /// Largest holders first. Empty without per-user accounting.
    pub users: Vec<UserUsage>,
}

impl UsageReport {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            total_bytes: 0,
            peak_bytes: 0,
            level: UsageLevel::Safe,
            budget_bytes: 0,
            warning_bytes: 0,
            dangerous_bytes: 0,
            reject_bytes: None,
            users: Vec::new(),
        }
    }

    /// Fraction of the budget in use; 0 when disabled.
    pub fn utilization(&self) -> f64 {
        if self.budget_bytes == 0 {
            0.0
        } else {
            self.total_bytes as f64 / self.budget_bytes as f64
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
