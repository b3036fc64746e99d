//! Convenient re-exports for downstream crates.

pub use crate::config::{MemControlConfig, Threshold, Thresholds};
pub use crate::controller::MemoryController;
pub use crate::error::{Error, Result};
pub use crate::id::{UserId, UserIdAllocator};
pub use crate::level::UsageLevel;
