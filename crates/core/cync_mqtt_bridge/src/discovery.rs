use cync_model::Device;
use cync_model::DeviceId;
use cync_model::DeviceType;
use cync_model::GroupId;
use cync_model::Registry;
use mqtt_channel::Message;
use mqtt_channel::Topic;
use serde_json::json;

/// Name-suffix tokens stripped when deriving an area from the device name
/// itself (§B, `suggested_area` derivation).
const DEVICE_TYPE_SUFFIXES: &[&str] = &[
    "Switch", "Light", "Floodlight", "Lamp", "Bulb", "Dimmer", "Plug", "Outlet", "Fan",
];

/// `home-{id}` for devices, `home-group-{id}` for groups (§4.6).
pub fn device_hass_id(home_id: &str, device_id: DeviceId) -> String {
    format!("{home_id}-{device_id}")
}

pub fn group_hass_id(home_id: &str, group_id: GroupId) -> String {
    format!("{home_id}-group-{group_id}")
}

/// First room group (non-subgroup) that lists this device, else the device
/// name with a trailing type-suffix token stripped (§B).
pub fn suggested_area(registry: &Registry, device: &Device) -> Option<String> {
    if let Some(group) = registry
        .groups()
        .find(|g| !g.is_subgroup && g.member_ids.contains(&device.id))
    {
        return Some(group.name.clone());
    }

    let name = device.name.trim();
    for suffix in DEVICE_TYPE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            let stripped = stripped.trim();
            if !stripped.is_empty() {
                return Some(stripped.to_string());
            }
        }
    }
    None
}

fn device_connections(device: &Device) -> Vec<[String; 2]> {
    let mut connections = vec![["bluetooth".to_string(), device.mac.clone()]];
    if !device.bt_only {
        connections.push(["mac".to_string(), device.wifi_mac.clone()]);
    }
    connections
}

/// Home Assistant MQTT discovery platform a device type publishes under.
fn ha_platform(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::Light | DeviceType::Hvac => "light",
        DeviceType::Switch | DeviceType::Plug => "switch",
        DeviceType::Fan => "fan",
    }
}

/// Build the retained discovery config for one device (§4.5).
pub fn device_discovery_message(
    registry: &Registry,
    device: &Device,
    hass_topic: &str,
    cync_topic: &str,
) -> Message {
    let hass_id = device_hass_id(&device.home_id, device.id);
    let platform = ha_platform(device.device_type);
    let caps = device.device_type.capabilities();

    let mut config = json!({
        "name": device.name,
        "unique_id": hass_id,
        "state_topic": format!("{cync_topic}/status/{hass_id}"),
        "availability_topic": format!("{cync_topic}/availability/{hass_id}"),
        "payload_available": "online",
        "payload_not_available": "offline",
        "command_topic": format!("{cync_topic}/set/{hass_id}"),
        "device": {
            "identifiers": [hass_id.clone()],
            "connections": device_connections(device),
            "name": device.name,
            "sw_version": device.firmware_version,
            "suggested_area": suggested_area(registry, device),
        },
    });

    if platform == "light" {
        let mut modes = Vec::new();
        if caps.rgb {
            modes.push("rgb");
        }
        if caps.tunable_white {
            modes.push("color_temp");
        }
        if modes.is_empty() {
            modes.push("onoff");
        }
        config["schema"] = json!("json");
        config["brightness"] = json!(caps.dimmable);
        config["supported_color_modes"] = json!(modes);
    } else if platform == "fan" {
        config["percentage_command_topic"] = json!(format!("{cync_topic}/set/{hass_id}/percentage"));
        config["preset_mode_command_topic"] = json!(format!("{cync_topic}/set/{hass_id}/preset"));
        config["preset_modes"] = json!(["low", "medium", "high", "max"]);
    }
    // Switches/plugs intentionally omit `schema`/`brightness`: plain ON/OFF.

    let topic = Topic::from(format!("{hass_topic}/{platform}/{hass_id}/config").as_str());
    Message::new(&topic, config.to_string()).with_retain()
}

/// Subgroups publish as virtual light entities (§4.5); room groups publish
/// the same way their own members' type would suggest, but in practice
/// every group in this system is lighting-capable.
pub fn group_discovery_message(
    home_id: &str,
    group_id: GroupId,
    group_name: &str,
    hass_topic: &str,
    cync_topic: &str,
) -> Message {
    let hass_id = group_hass_id(home_id, group_id);
    let config = json!({
        "name": group_name,
        "unique_id": hass_id,
        "schema": "json",
        "brightness": true,
        "supported_color_modes": ["brightness"],
        "state_topic": format!("{cync_topic}/status/{hass_id}"),
        "availability_topic": format!("{cync_topic}/availability/{hass_id}"),
        "payload_available": "online",
        "payload_not_available": "offline",
        "command_topic": format!("{cync_topic}/set/{hass_id}"),
    });
    let topic = Topic::from(format!("{hass_topic}/light/{hass_id}/config").as_str());
    Message::new(&topic, config.to_string()).with_retain()
}

/// The bridge's own entity: restart/export/refresh buttons and a handful of
/// diagnostic sensors (§4.5).
pub fn bridge_discovery_messages(hass_topic: &str, cync_topic: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    for (suffix, name) in [
        ("restart", "Restart bridge"),
        ("export", "Export devices"),
        ("refresh_status", "Refresh status"),
    ] {
        let config = json!({
            "name": name,
            "unique_id": format!("bridge-{suffix}"),
            "command_topic": format!("{cync_topic}/set/bridge/{suffix}"),
        });
        let topic = Topic::from(format!("{hass_topic}/button/bridge-{suffix}/config").as_str());
        messages.push(Message::new(&topic, config.to_string()).with_retain());
    }
    for (suffix, name) in [
        ("tcp_connections", "TCP device count"),
        ("total_devices", "Total device count"),
        ("mqtt_connected", "MQTT connected"),
    ] {
        let config = json!({
            "name": name,
            "unique_id": format!("bridge-{suffix}"),
            "state_topic": format!("{cync_topic}/status/bridge-{suffix}"),
        });
        let platform = if suffix == "mqtt_connected" { "binary_sensor" } else { "sensor" };
        let topic = Topic::from(format!("{hass_topic}/{platform}/bridge-{suffix}/config").as_str());
        messages.push(Message::new(&topic, config.to_string()).with_retain());
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use cync_model::Group;

    fn lamp(name: &str) -> Device {
        let mut device = Device::new(7, "home-1", DeviceType::Light, name);
        device.mac = "AA:BB".to_string();
        device.wifi_mac = "CC:DD".to_string();
        device
    }

    #[test]
    fn suggested_area_prefers_room_group_membership() {
        let mut registry = Registry::new();
        let device = lamp("Kitchen Light");
        registry.insert_device(device.clone()).unwrap();
        let mut group = Group::new(50, "home-1", "Kitchen");
        group.member_ids = vec![7];
        registry.insert_group(group).unwrap();

        assert_eq!(suggested_area(&registry, &device).as_deref(), Some("Kitchen"));
    }

    #[test]
    fn suggested_area_falls_back_to_name_suffix_strip() {
        let registry = Registry::new();
        let device = lamp("Office Switch");
        assert_eq!(suggested_area(&registry, &device).as_deref(), Some("Office"));
    }

    #[test]
    fn bt_only_device_omits_wifi_mac_connection() {
        let mut device = lamp("Lamp");
        device.bt_only = true;
        assert_eq!(device_connections(&device).len(), 1);
    }

    #[test]
    fn light_discovery_includes_supported_color_modes() {
        let registry = Registry::new();
        let device = lamp("Lamp");
        let msg = device_discovery_message(&registry, &device, "homeassistant", "cync_lan");
        assert!(msg.payload_str().unwrap().contains("supported_color_modes"));
        assert_eq!(msg.topic.name, "homeassistant/light/home-1-7/config");
    }

    #[test]
    fn switch_discovery_omits_schema() {
        let registry = Registry::new();
        let mut device = lamp("Switch One");
        device.device_type = DeviceType::Switch;
        let msg = device_discovery_message(&registry, &device, "homeassistant", "cync_lan");
        assert!(!msg.payload_str().unwrap().contains("schema"));
    }
}
