use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire-format envelope for published records.
///
/// The payload is MessagePack for compact transport; `topic` drives
/// subscriber-side prefix filtering and `correlation_id` lets consumers
/// stitch records back to a producing iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Routing topic (e.g. "funnel.prediction.logged").
    pub topic: String,

    /// MessagePack-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    /// When this envelope was created.
    pub emitted_at: DateTime<Utc>,

    /// Correlation ID for tracing a record back to its producer iteration.
    pub correlation_id: Uuid,
}

impl Envelope {
    /// Create a new envelope, serializing the payload with MessagePack.
    pub fn new<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self {
            topic: topic.into(),
            payload: rmp_serde::to_vec(payload)?,
            emitted_at: Utc::now(),
            correlation_id: Uuid::new_v4(),
        })
    }

    /// Deserialize the payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, rmp_serde::decode::Error> {
        rmp_serde::from_slice(&self.payload)
    }

    /// Serialize the whole envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics;

    #[test]
    fn payload_roundtrip() {
        let env = Envelope::new(topics::PREDICTION_LOGGED, &"hello".to_string()).unwrap();
        assert_eq!(env.topic, topics::PREDICTION_LOGGED);
        assert_eq!(env.decode::<String>().unwrap(), "hello");
    }

    #[test]
    fn envelope_bytes_roundtrip() {
        let env = Envelope::new("funnel.test", &1234u64).unwrap();
        let bytes = env.to_bytes().unwrap();
        let decoded = Envelope::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.topic, "funnel.test");
        assert_eq!(decoded.correlation_id, env.correlation_id);
        assert_eq!(decoded.decode::<u64>().unwrap(), 1234);
    }
}
