#![forbid(unsafe_code)]
//! memctl-core: value types and interfaces for ingestion memory control.
//!
//! Nothing here synchronizes or allocates on a writer's behalf. The ledger and
//! the two controller variants live in `memctl-mem`; this crate only defines
//! what they exchange with writers.

pub mod config;
pub mod controller;
pub mod error;
pub mod id;
pub mod level;
pub mod prelude;
