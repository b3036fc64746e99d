#![forbid(unsafe_code)]
//! memctl: write-path memory admission for a time-series storage engine.
//!
//! Facade over the workspace crates:
//! - `memctl-core`: `UsageLevel`, `UserId`, `MemControlConfig`, the `MemoryController` trait.
//! - `memctl-mem`: the usage ledger, tracking/disabled controllers, controller selection.
//! - `memctl-exec`: buffered writers that acquire before buffering and release on flush.

pub use memctl_core;
pub use memctl_exec;
pub use memctl_mem;

pub mod prelude {
    pub use memctl_core::prelude::*;
    pub use memctl_exec::{BackpressurePolicy, MemTableWriter, WriteExecutor};
    pub use memctl_mem::{MemController, SharedController, UsageReport};
}
