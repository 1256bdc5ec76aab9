//! Row-level adapter for sinks

use super::traits::PersistenceSink;
use crate::Result;

/// Stores every element of every saved batch as its own row
///
/// Handlers that yield one table per URL (`Vec<Row>`) can feed a sink
/// that stores single rows. The flattened slice is still saved in one
/// call, so the inner sink's all-or-nothing guarantee holds.
#[derive(Debug)]
pub struct FlattenSink<S> {
    inner: S,
}

impl<S> FlattenSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<T, S> PersistenceSink<Vec<T>> for FlattenSink<S>
where
    T: Clone,
    S: PersistenceSink<T>,
{
    fn save(&self, data: &[Vec<T>]) -> Result<()> {
        let rows: Vec<T> = data.iter().flatten().cloned().collect();
        self.inner.save(&rows)
    }
}
