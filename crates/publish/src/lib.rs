//! Event-publishing collaborator for the funnel generator.
//!
//! Predictions are wrapped in an [`Envelope`] and broadcast over a ZeroMQ
//! PUB socket; downstream feature-store consumers subscribe by topic. The
//! contract is fire-and-forget: no acknowledgment is expected.

pub mod envelope;
pub mod error;
pub mod topics;
pub mod zmq;

use std::sync::Arc;

use async_trait::async_trait;

pub use envelope::Envelope;
pub use error::PublishError;
pub use zmq::ZmqPredictionPublisher;

/// Publishes envelopes to any interested subscribers.
#[async_trait]
pub trait PredictionPublisher: Send + Sync {
    /// Publish an envelope. Subscribers filter by its topic.
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError>;
}

/// Blanket implementation so `Arc<dyn PredictionPublisher>` can be used directly.
#[async_trait]
impl<T: PredictionPublisher + ?Sized> PredictionPublisher for Arc<T> {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        (**self).publish(envelope).await
    }
}
