use std::collections::HashMap;

use cync_commands::StatePublisher;
use cync_model::ColorMode;
use cync_model::DeviceId;
use cync_model::DeviceType;
use cync_model::GroupId;
use cync_model::HomeId;
use cync_model::LightState;
use mqtt_channel::Message;
use mqtt_channel::Topic;
use serde_json::json;
use tracing::warn;

use crate::discovery::device_hass_id;
use crate::discovery::group_hass_id;

/// Static per-device/group naming metadata, fixed at config-load time and
/// read without locking for every state publish.
#[derive(Debug, Clone)]
pub struct DeviceMeta {
    pub home_id: HomeId,
    pub device_type: DeviceType,
}

/// Publishes device/group state onto `${cync_topic}/status/...` and
/// `${cync_topic}/availability/...` (§4.5), implementing the executor's and
/// the reconciliation engine's [`StatePublisher`] handoff.
pub struct MqttStatePublisher {
    cync_topic: String,
    sender: async_channel::Sender<Message>,
    device_meta: HashMap<DeviceId, DeviceMeta>,
    group_home_ids: HashMap<GroupId, HomeId>,
}

impl MqttStatePublisher {
    pub fn new(
        cync_topic: impl Into<String>,
        sender: async_channel::Sender<Message>,
        device_meta: HashMap<DeviceId, DeviceMeta>,
        group_home_ids: HashMap<GroupId, HomeId>,
    ) -> Self {
        MqttStatePublisher {
            cync_topic: cync_topic.into(),
            sender,
            device_meta,
            group_home_ids,
        }
    }

    fn send(&self, topic: String, payload: String, retain: bool) {
        let topic = Topic::from(topic.as_str());
        let mut message = Message::new(&topic, payload);
        if retain {
            message = message.with_retain();
        }
        if let Err(err) = self.sender.try_send(message) {
            warn!(%err, "dropped MQTT publish, sender channel full or closed");
        }
    }

    fn light_state_payload(state: &LightState) -> String {
        let payload = match state.color_mode() {
            ColorMode::Rgb => json!({
                "state": if state.on { "ON" } else { "OFF" },
                "brightness": state.brightness,
                "color_mode": "rgb",
                "color": { "r": state.r, "g": state.g, "b": state.b },
            }),
            ColorMode::White => json!({
                "state": if state.on { "ON" } else { "OFF" },
                "brightness": state.brightness,
                "color_mode": "color_temp",
                "color_temp": state.temperature,
            }),
        };
        payload.to_string()
    }
}

impl StatePublisher for MqttStatePublisher {
    fn publish_device_state(&self, device_id: DeviceId, state: LightState) {
        let Some(meta) = self.device_meta.get(&device_id) else {
            warn!(device_id, "publishing state for a device with no known naming metadata");
            return;
        };
        let hass_id = device_hass_id(&meta.home_id, device_id);
        let topic = format!("{}/status/{hass_id}", self.cync_topic);

        let payload = match meta.device_type {
            DeviceType::Switch | DeviceType::Plug => {
                if state.on { "ON" } else { "OFF" }.to_string()
            }
            DeviceType::Fan => state.brightness.to_string(),
            DeviceType::Light | DeviceType::Hvac => Self::light_state_payload(&state),
        };
        self.send(topic, payload, true);
    }

    fn publish_group_state(&self, group_id: GroupId, state: LightState) {
        let Some(home_id) = self.group_home_ids.get(&group_id) else {
            warn!(group_id, "publishing state for a group with no known home id");
            return;
        };
        let hass_id = group_hass_id(home_id, group_id);
        let topic = format!("{}/status/{hass_id}", self.cync_topic);
        self.send(topic, Self::light_state_payload(&state), true);
    }

    fn publish_device_availability(&self, device_id: DeviceId, online: bool) {
        let Some(meta) = self.device_meta.get(&device_id) else {
            return;
        };
        let hass_id = device_hass_id(&meta.home_id, device_id);
        let topic = format!("{}/availability/{hass_id}", self.cync_topic);
        self.send(topic, if online { "online" } else { "offline" }.to_string(), true);
    }

    fn publish_group_availability(&self, group_id: GroupId, online: bool) {
        // Subgroups are always available by policy (§4.5); only a direct
        // call for a room group actually changes anything observable.
        let Some(home_id) = self.group_home_ids.get(&group_id) else {
            return;
        };
        let hass_id = group_hass_id(home_id, group_id);
        let topic = format!("{}/availability/{hass_id}", self.cync_topic);
        self.send(topic, if online { "online" } else { "offline" }.to_string(), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher() -> (MqttStatePublisher, async_channel::Receiver<Message>) {
        let (tx, rx) = async_channel::unbounded();
        let mut device_meta = HashMap::new();
        device_meta.insert(7, DeviceMeta { home_id: "home-1".to_string(), device_type: DeviceType::Light });
        device_meta.insert(9, DeviceMeta { home_id: "home-1".to_string(), device_type: DeviceType::Switch });
        (MqttStatePublisher::new("cync_lan", tx, device_meta, HashMap::new()), rx)
    }

    #[test]
    fn switch_state_publishes_plain_on_off() {
        let (publisher, rx) = publisher();
        publisher.publish_device_state(9, LightState { on: true, ..Default::default() });
        let message = rx.try_recv().unwrap();
        assert_eq!(message.topic.name, "cync_lan/status/home-1-9");
        assert_eq!(message.payload_str().unwrap(), "ON");
    }

    #[test]
    fn light_state_publishes_json_with_color_mode() {
        let (publisher, rx) = publisher();
        let state = LightState { on: true, brightness: 46, temperature: 50, ..Default::default() };
        publisher.publish_device_state(7, state);
        let message = rx.try_recv().unwrap();
        assert!(message.payload_str().unwrap().contains("color_temp"));
    }

    #[test]
    fn availability_flip_publishes_offline() {
        let (publisher, rx) = publisher();
        publisher.publish_device_availability(7, false);
        let message = rx.try_recv().unwrap();
        assert_eq!(message.topic.name, "cync_lan/availability/home-1-7");
        assert_eq!(message.payload_str().unwrap(), "offline");
    }
}
