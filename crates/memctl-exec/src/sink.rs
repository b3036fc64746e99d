//! Flush destinations.
//!
//! The on-disk format is not this crate's concern; a sink receives drained
//! series and persists them however the storage layer sees fit.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::writer::DataPoint;

pub trait FlushSink {
    /// Persist one series. Points arrive sorted by timestamp.
    fn write_series(&mut self, path: &str, points: &[DataPoint]) -> Result<()>;
}

/// In-memory sink that records every flushed series. Used in tests.
#[derive(Clone, Default)]
pub struct CollectingSink {
    flushed: Arc<Mutex<Vec<(String, Vec<DataPoint>)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything flushed so far, in flush order.
    pub fn flushed(&self) -> Vec<(String, Vec<DataPoint>)> {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn point_count(&self) -> usize {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, p)| p.len())
            .sum()
    }
}

impl FlushSink for CollectingSink {
    fn write_series(&mut self, path: &str, points: &[DataPoint]) -> Result<()> {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_string(), points.to_vec()));
        Ok(())
    }
}
