#[derive(Debug, thiserror::Error)]
pub enum MqttBridgeError {
    #[error(transparent)]
    Mqtt(#[from] mqtt_channel::MqttError),
    #[error("malformed JSON command body: {0}")]
    Json(#[from] serde_json::Error),
}
