//! The persistence sink contract

use crate::Result;
use std::sync::Arc;

/// Receives the final rows of a crawl
///
/// A sink either stores the whole slice or fails. Saves are never retried
/// by the crawlers. Implementations are shared between workers, so `save`
/// takes `&self` and must synchronize internally.
pub trait PersistenceSink<T>: Send + Sync {
    fn save(&self, data: &[T]) -> Result<()>;
}

impl<T, S> PersistenceSink<T> for Arc<S>
where
    S: PersistenceSink<T> + ?Sized,
{
    fn save(&self, data: &[T]) -> Result<()> {
        (**self).save(data)
    }
}

impl<T, S> PersistenceSink<T> for Box<S>
where
    S: PersistenceSink<T> + ?Sized,
{
    fn save(&self, data: &[T]) -> Result<()> {
        (**self).save(data)
    }
}
