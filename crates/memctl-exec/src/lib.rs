#![forbid(unsafe_code)]
//! memctl-exec: the write path as seen by the memory controller.
//!
//! Mutations (insert, multi-insert, delete, update) land in a per-partition
//! `MemTableWriter`. The writer claims bytes from the shared controller before
//! buffering, turns the returned level into an admission decision through its
//! `BackpressurePolicy`, and returns the bytes when a flush drains the buffer.
//! Query execution never touches the controller and does not live here.

pub mod error;
pub mod metrics;
pub mod policy;
pub mod sink;
pub mod writer;

pub use error::{Result, WriteError};
pub use policy::{Admission, BackpressurePolicy};
pub use sink::{CollectingSink, FlushSink};
pub use writer::{DataPoint, FlushStats, MemTableWriter, WriteExecutor, WriteOutcome};
