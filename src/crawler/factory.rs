//! Component registration for the crawler roles

use crate::components::DataHandler;
use crate::persistence::PersistenceSink;

/// The components one crawler is built from
///
/// A factory owns a transport, a parser and a data handler, and optionally
/// a persistence sink. The crawler roles take a factory and drive the
/// components through the pipeline; nothing here checks that the types
/// line up, the roles' trait bounds do.
pub struct CrawlerFactory<T, P, H: DataHandler> {
    pub transport: T,
    pub parser: P,
    pub handler: H,
    pub persistence: Option<Box<dyn PersistenceSink<H::Output>>>,
}

impl<T, P, H: DataHandler> CrawlerFactory<T, P, H> {
    pub fn new(transport: T, parser: P, handler: H) -> Self {
        Self {
            transport,
            parser,
            handler,
            persistence: None,
        }
    }

    /// Registers the sink used by the `*_and_save` operations
    pub fn with_persistence(mut self, sink: impl PersistenceSink<H::Output> + 'static) -> Self {
        self.persistence = Some(Box::new(sink));
        self
    }

    pub fn has_persistence(&self) -> bool {
        self.persistence.is_some()
    }
}
