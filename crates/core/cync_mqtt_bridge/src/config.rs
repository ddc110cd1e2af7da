/// MQTT broker connection and topic-root configuration (§6).
#[derive(Debug, Clone)]
pub struct MqttBridgeConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    /// `cync_topic` ≈ `cync_lan` (§6).
    pub cync_topic: String,
    /// `hass_topic` ≈ `homeassistant` (§6).
    pub hass_topic: String,
}

impl Default for MqttBridgeConfig {
    fn default() -> Self {
        MqttBridgeConfig {
            host: "localhost".to_string(),
            port: 1883,
            credentials: None,
            cync_topic: "cync_lan".to_string(),
            hass_topic: "homeassistant".to_string(),
        }
    }
}

impl MqttBridgeConfig {
    /// `${cync_topic}/connected`, the LWT / birth topic (§6).
    pub fn connected_topic(&self) -> String {
        format!("{}/connected", self.cync_topic)
    }

    pub fn client_id(&self) -> String {
        format!("cync_lan_{}", uuid::Uuid::new_v4())
    }
}
