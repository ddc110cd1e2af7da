mod config;
mod discovery;
mod error;
mod publisher;
mod router;

pub use config::MqttBridgeConfig;
pub use discovery::bridge_discovery_messages;
pub use discovery::device_discovery_message;
pub use discovery::device_hass_id;
pub use discovery::group_discovery_message;
pub use discovery::group_hass_id;
pub use discovery::suggested_area;
pub use error::MqttBridgeError;
pub use publisher::DeviceMeta;
pub use publisher::MqttStatePublisher;
pub use router::route_message;
pub use router::RouterAction;
