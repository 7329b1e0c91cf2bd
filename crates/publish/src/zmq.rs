use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use zeromq::prelude::*;
use zeromq::{PubSocket, ZmqMessage};

use crate::error::PublishError;
use crate::{Envelope, PredictionPublisher};

/// ZeroMQ PUB socket publisher.
///
/// Envelopes go out as two-frame ZMQ messages:
/// 1. Topic string (for SUB-side prefix filtering)
/// 2. MessagePack-encoded [`Envelope`]
pub struct ZmqPredictionPublisher {
    socket: Mutex<PubSocket>,
}

impl ZmqPredictionPublisher {
    /// Bind to the given endpoint; subscribers connect to it.
    pub async fn bind(endpoint: &str) -> Result<Self, PublishError> {
        let mut socket = PubSocket::new();
        info!(endpoint = %endpoint, "binding PUB socket");
        socket.bind(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Connect to a broker frontend instead of binding.
    pub async fn connect(endpoint: &str) -> Result<Self, PublishError> {
        let mut socket = PubSocket::new();
        info!(endpoint = %endpoint, "connecting PUB socket");
        socket.connect(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl PredictionPublisher for ZmqPredictionPublisher {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        let topic = envelope.topic.clone();
        let envelope_bytes = envelope.to_bytes()?;

        let mut zmq_msg = ZmqMessage::from(topic.as_str());
        zmq_msg.push_back(envelope_bytes.into());

        let mut socket = self.socket.lock().await;
        socket.send(zmq_msg).await?;

        debug!(topic = %topic, "published envelope");
        Ok(())
    }
}
