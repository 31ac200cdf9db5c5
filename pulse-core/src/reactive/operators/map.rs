use std::sync::Arc;

use crate::reactive::publisher::{Publisher, Sink};
use crate::reactive::subscription::Subscription;

/// Publisher returned by [`PublisherExt::map`](crate::reactive::PublisherExt::map).
pub struct Map<P, F> {
    source: P,
    transform: Arc<F>,
}

impl<P, F> Map<P, F> {
    pub(crate) fn new(source: P, transform: F) -> Self {
        Self {
            source,
            transform: Arc::new(transform),
        }
    }
}

impl<P, F, U> Publisher for Map<P, F>
where
    P: Publisher,
    F: Fn(P::Output) -> U + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    type Output = U;

    fn subscribe_sink(&self, sink: Sink<U>) -> Subscription {
        let transform = Arc::clone(&self.transform);
        self.source
            .subscribe_sink(Arc::new(move |value: P::Output| sink(transform(value))))
    }
}
