#![forbid(unsafe_code)]
//! memctl-mem: the usage ledger and the two controller variants.
//!
//! This crate provides concrete implementations of the `MemoryController`
//! interface defined in `memctl-core::controller`. Every write path in the
//! engine reports buffered bytes through one shared controller so the total is
//! meaningful; `MemController::from_config` picks the variant once at startup.

pub mod controller;
pub mod disabled;
pub mod global;
pub mod ledger;
pub mod report;
pub mod tracking;

pub use controller::{MemController, SharedController};
pub use disabled::DisabledController;
pub use ledger::{Claim, Release, UsageLedger};
pub use report::{UsageReport, UserUsage};
pub use tracking::{PeakTracker, TrackingController};
