//! Memory-control configuration that downstream crates can serialize/deserialize.
//!
//! A `MemControlConfig` is loaded once at engine startup. Cut points may be
//! given in absolute bytes or as fractions of `budget_bytes`; both resolve to
//! absolute [`Thresholds`] at controller construction, where validation
//! failures stop the engine before it takes any writes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::level::UsageLevel;

const DEFAULT_BUDGET_BYTES: u64 = 512 * 1024 * 1024; // 512 MiB

/// One cut point over `[0, budget]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Bytes(u64),
    /// Fraction of the configured budget, rounded down to whole bytes.
    Fraction(f64),
}

impl Threshold {
    fn resolve(self, budget_bytes: u64, name: &str) -> Result<u64> {
        match self {
            Threshold::Bytes(b) => Ok(b),
            Threshold::Fraction(f) => {
                if !f.is_finite() || f < 0.0 {
                    return Err(Error::Config(format!(
                        "{name} fraction must be a finite, non-negative number (got {f})"
                    )));
                }
                // `as` saturates on overflow, which is what we want for huge fractions.
                Ok((budget_bytes as f64 * f).floor() as u64)
            }
        }
    }

    /// Parse `"60%"`, `"0.6"` (fractions) or `"1048576"` (bytes).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            return pct.trim().parse::<f64>().ok().map(|p| Threshold::Fraction(p / 100.0));
        }
        if s.contains('.') {
            return s.parse::<f64>().ok().map(Threshold::Fraction);
        }
        s.parse::<u64>().ok().map(Threshold::Bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemControlConfig {
    /// When false the disabled controller is used and nothing is tracked.
    pub enabled: bool,

    /// Memory budget for buffered ingestion data (in bytes).
    pub budget_bytes: u64,

    /// Totals above this are `Warning`.
    pub warning: Threshold,

    /// Totals above this are `Dangerous`.
    pub dangerous: Threshold,

    /// Optional cut above which totals are `Reject`. May exceed the budget.
    pub reject: Option<Threshold>,

    /// Keep a per-user breakdown next to the total.
    pub per_user_accounting: bool,
}

impl Default for MemControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            budget_bytes: DEFAULT_BUDGET_BYTES,
            warning: Threshold::Fraction(0.6),
            dangerous: Threshold::Fraction(0.75),
            reject: None,
            per_user_accounting: true,
        }
    }
}

/// Resolved, validated cut points in absolute bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub budget: u64,
    pub warning: u64,
    pub dangerous: u64,
    pub reject: Option<u64>,
}

impl Thresholds {
    /// Build from absolute byte cut points, validating monotonicity.
    pub fn new(budget: u64, warning: u64, dangerous: u64, reject: Option<u64>) -> Result<Self> {
        if budget == 0 {
            return Err(Error::Config("budget_bytes must be > 0".into()));
        }
        if warning > dangerous {
            return Err(Error::Config(format!(
                "warning threshold ({warning}) exceeds dangerous threshold ({dangerous})"
            )));
        }
        if dangerous > budget {
            return Err(Error::Config(format!(
                "dangerous threshold ({dangerous}) exceeds budget ({budget})"
            )));
        }
        if let Some(r) = reject {
            if r < dangerous {
                return Err(Error::Config(format!(
                    "reject threshold ({r}) is below dangerous threshold ({dangerous})"
                )));
            }
        }
        Ok(Self {
            budget,
            warning,
            dangerous,
            reject,
        })
    }

    /// Classify a total. Non-decreasing in `total_bytes`.
    pub fn level_for(&self, total_bytes: u64) -> UsageLevel {
        if self.reject.is_some_and(|r| total_bytes > r) {
            UsageLevel::Reject
        } else if total_bytes > self.dangerous {
            UsageLevel::Dangerous
        } else if total_bytes > self.warning {
            UsageLevel::Warning
        } else {
            UsageLevel::Safe
        }
    }
}

impl MemControlConfig {
    /// A tracking config with absolute byte cut points.
    pub fn with_byte_thresholds(budget_bytes: u64, warning: u64, dangerous: u64) -> Self {
        Self {
            budget_bytes,
            warning: Threshold::Bytes(warning),
            dangerous: Threshold::Bytes(dangerous),
            ..Self::default()
        }
    }

    /// A config that selects the disabled controller.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Validate and resolve the cut points.
    pub fn thresholds(&self) -> Result<Thresholds> {
        let budget = self.budget_bytes;
        let warning = self.warning.resolve(budget, "warning")?;
        let dangerous = self.dangerous.resolve(budget, "dangerous")?;
        let reject = self
            .reject
            .map(|r| r.resolve(budget, "reject"))
            .transpose()?;
        Thresholds::new(budget, warning, dangerous, reject)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `MEMCTL_ENABLED`: `true`/`false`
    /// - `MEMCTL_BUDGET_BYTES`: budget in bytes
    /// - `MEMCTL_WARNING`, `MEMCTL_DANGEROUS`, `MEMCTL_REJECT`: cut points (`"60%"`, `"0.6"`, or bytes)
    /// - `MEMCTL_PER_USER`: `true`/`false`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MemControlConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("MEMCTL_ENABLED").and_then(|s| parse_bool(&s)) {
            cfg.enabled = v;
        }

        if let Some(s) = lookup("MEMCTL_BUDGET_BYTES") {
            if let Ok(v) = s.trim().parse::<u64>() {
                cfg.budget_bytes = v;
            }
        }

        if let Some(t) = lookup("MEMCTL_WARNING").and_then(|s| Threshold::parse(&s)) {
            cfg.warning = t;
        }

        if let Some(t) = lookup("MEMCTL_DANGEROUS").and_then(|s| Threshold::parse(&s)) {
            cfg.dangerous = t;
        }

        if let Some(t) = lookup("MEMCTL_REJECT").and_then(|s| Threshold::parse(&s)) {
            cfg.reject = Some(t);
        }

        if let Some(v) = lookup("MEMCTL_PER_USER").and_then(|s| parse_bool(&s)) {
            cfg.per_user_accounting = v;
        }

        cfg
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
