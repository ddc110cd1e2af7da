use crate::errors::MqttError;
use crate::topics::Topic;
use rumqttc::QoS;

/// A message payload.
pub type Payload = Vec<u8>;

/// A message to be sent to or received from MQTT.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub topic: Topic,
    payload: Payload,
    pub qos: QoS,
    pub retain: bool,
}

impl Message {
    pub fn new<B>(topic: &Topic, payload: B) -> Message
    where
        B: Into<Payload>,
    {
        Message {
            topic: topic.clone(),
            payload: payload.into(),
            qos: QoS::AtLeastOnce,
            retain: false,
        }
    }

    pub fn with_qos(self, qos: QoS) -> Self {
        Self { qos, ..self }
    }

    pub fn with_retain(self) -> Self {
        Self {
            retain: true,
            ..self
        }
    }

    /// The payload as a `serde_json`-decodable string (unless not UTF8).
    pub fn payload_str(&self) -> Result<&str, MqttError> {
        let bytes = self.payload_bytes();
        std::str::from_utf8(bytes).map_err(|err| MqttError::new_invalid_utf8_payload(bytes, err))
    }

    /// The bytes of the payload (stripping a single trailing NUL, which some
    /// firmware / client libraries append).
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload
            .strip_suffix(&[0])
            .unwrap_or_else(|| self.payload.as_slice())
    }
}

impl From<rumqttc::Publish> for Message {
    fn from(msg: rumqttc::Publish) -> Self {
        Message {
            topic: Topic {
                name: msg.topic,
            },
            payload: msg.payload.to_vec(),
            qos: msg.qos,
            retain: msg.retain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_null_terminated_messages() {
        let topic = Topic::new("trimmed").unwrap();
        let message = Message::new(&topic, &b"123\0"[..]);
        assert_eq!(message.payload_bytes(), b"123");
    }

    #[test]
    fn check_non_null_terminated_messages() {
        let topic = Topic::new("trimmed").unwrap();
        let message = Message::new(&topic, &b"123"[..]);
        assert_eq!(message.payload_bytes(), b"123");
    }

    #[test]
    fn payload_str_roundtrips_json() {
        let topic = Topic::new("trimmed").unwrap();
        let message = Message::new(&topic, r#"{"state":"ON"}"#);
        assert_eq!(message.payload_str().unwrap(), r#"{"state":"ON"}"#);
    }
}
