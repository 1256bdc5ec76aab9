//! In-memory sink

use super::traits::PersistenceSink;
use crate::{PersistenceError, Result};
use std::sync::Mutex;

/// Keeps saved rows in memory
///
/// Each `save` call is recorded as one batch, so callers can check both
/// what was stored and how it was grouped.
#[derive(Debug, Default)]
pub struct MemorySink<T> {
    batches: Mutex<Vec<Vec<T>>>,
}

impl<T: Clone> MemorySink<T> {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }

    /// All saved rows, in save order
    pub fn rows(&self) -> Vec<T> {
        self.batches()
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn batches(&self) -> Vec<Vec<T>> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    /// Number of `save` calls
    pub fn save_count(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl<T: Clone + Send> PersistenceSink<T> for MemorySink<T> {
    fn save(&self, data: &[T]) -> Result<()> {
        let mut batches = self.batches.lock().map_err(|_| PersistenceError::Poisoned)?;
        batches.push(data.to_vec());
        tracing::debug!("Stored {} rows in memory", data.len());
        Ok(())
    }
}
