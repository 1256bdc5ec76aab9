//! Admission control around the persistence stage

use crate::{ConfigError, CrawlError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A lock or counting semaphore shared by concurrent workers
///
/// Both flavors are a [`Semaphore`]: a lock is a semaphore with a single
/// permit. Works from async tasks and from plain threads.
#[derive(Debug, Clone)]
pub struct ConcurrencyGuard {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

impl ConcurrencyGuard {
    /// Mutual exclusion: one holder at a time
    pub fn lock() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            permits: 1,
        }
    }

    /// Counting semaphore with `value` permits
    ///
    /// # Errors
    ///
    /// Returns a validation error when `value` is 0.
    pub fn semaphore(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ConfigError::Validation(
                "semaphore value must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(value)),
            permits: value,
        })
    }

    /// Picks the guard from the `lock` / `sema_value` pair
    ///
    /// `sema_value` only matters when `lock` is false.
    pub fn from_settings(lock: bool, sema_value: usize) -> Result<Self> {
        if lock {
            Ok(Self::lock())
        } else {
            Self::semaphore(sema_value)
        }
    }

    /// Total number of permits
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CrawlError::Other(e.into()))
    }

    /// Blocks the current thread until a permit is free
    ///
    /// Must not be called from inside an async task; use
    /// [`acquire`](Self::acquire) there.
    pub fn acquire_blocking(&self) -> Result<OwnedSemaphorePermit> {
        futures::executor::block_on(self.acquire())
    }
}
