//! The state reconciliation engine (§4.4): turns a parsed `StatusFrame` or
//! mesh-info snapshot into registry writes and MQTT publications, applying
//! the online hysteresis and subgroup-aggregation rules.

use cync_commands::StatePublisher;
use cync_model::DeviceId;
use cync_model::GroupId;
use cync_model::Registry;
use cync_wire::MeshDeviceInfo;
use cync_wire::StatusFrame;
use tracing::warn;

fn state_from_frame(frame: &StatusFrame) -> cync_model::LightState {
    cync_model::LightState {
        on: frame.state != 0,
        brightness: frame.brightness,
        temperature: frame.temperature,
        r: frame.r,
        g: frame.g,
        b: frame.b,
    }
}

/// Apply one status frame to whichever registry entry (device, then room
/// group) owns `frame.device_id`. Unknown ids are logged and dropped
/// (§7 "semantic error").
pub fn reconcile_status(
    registry: &mut Registry,
    publisher: &dyn StatePublisher,
    frame: StatusFrame,
    source: &str,
) {
    let device_id: DeviceId = frame.device_id;

    if registry.device(device_id).is_some() {
        reconcile_device(registry, publisher, frame, source);
        return;
    }

    let group_id: GroupId = frame.device_id;
    if registry.group(group_id).is_some() {
        reconcile_room_group(registry, publisher, frame, source);
        return;
    }

    warn!(id = frame.device_id, source, "status frame for unknown device/group id");
}

fn reconcile_device(registry: &mut Registry, publisher: &dyn StatePublisher, frame: StatusFrame, source: &str) {
    let device_id: DeviceId = frame.device_id;
    let Some(device) = registry.device_mut(device_id) else {
        return;
    };

    let online_changed = device.note_online_report(frame.online_byte);
    if device.online {
        device.apply_frame(state_from_frame(&frame));
    }
    let state = device.state;
    let online = device.online;

    // Always publish, even if the fields didn't change (§4.4).
    publisher.publish_device_state(device_id, state);
    if online_changed {
        publisher.publish_device_availability(device_id, online);
    }

    for group_id in registry.subgroups_containing(device_id).to_vec() {
        if registry.reaggregate_subgroup(group_id).is_ok() {
            if let Some(group) = registry.group(group_id) {
                publisher.publish_group_state(group_id, group.state);
            }
        }
    }

    tracing::debug!(device_id, source, "device status reconciled");
}

fn reconcile_room_group(registry: &mut Registry, publisher: &dyn StatePublisher, frame: StatusFrame, source: &str) {
    let group_id: GroupId = frame.device_id;
    let Some(group) = registry.group_mut(group_id) else {
        return;
    };
    if group.is_subgroup {
        // Subgroups never report directly; a frame with this id is
        // unexpected but harmless to ignore.
        return;
    }

    let was_online = group.online;
    group.state = state_from_frame(&frame);
    group.online = frame.online_byte != 0;
    let state = group.state;
    let online = group.online;
    let online_changed = online != was_online;

    publisher.publish_group_state(group_id, state);
    if online_changed {
        publisher.publish_group_availability(group_id, online);
    }
    tracing::debug!(group_id, source, "room group status reconciled");
}

/// Apply a full mesh-info reply (§4.2, §4.4): order across ids is
/// immaterial, last-writer-wins per id.
pub fn reconcile_mesh_info(registry: &mut Registry, publisher: &dyn StatePublisher, devices: Vec<MeshDeviceInfo>) {
    for info in devices {
        let frame: StatusFrame = info.into();
        reconcile_status(registry, publisher, frame, "mesh info");
    }
}

/// Record a parsed firmware version string against a device (§B). No MQTT
/// publish of its own; picked up by the next discovery republish.
pub fn apply_firmware_version(registry: &mut Registry, device_id: DeviceId, version: String) {
    if let Some(device) = registry.device_mut(device_id) {
        device.firmware_version = Some(version);
    } else {
        warn!(device_id, "firmware version for unknown device id");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cync_model::DeviceType;
    use cync_model::Group;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        device_states: Mutex<Vec<(DeviceId, bool, u8)>>,
        group_states: Mutex<Vec<(GroupId, bool, u8)>>,
        availability: Mutex<Vec<(DeviceId, bool)>>,
        group_availability: Mutex<Vec<(GroupId, bool)>>,
    }

    impl StatePublisher for RecordingPublisher {
        fn publish_device_state(&self, device_id: DeviceId, state: cync_model::LightState) {
            self.device_states.lock().unwrap().push((device_id, state.on, state.brightness));
        }
        fn publish_group_state(&self, group_id: GroupId, state: cync_model::LightState) {
            self.group_states.lock().unwrap().push((group_id, state.on, state.brightness));
        }
        fn publish_device_availability(&self, device_id: DeviceId, online: bool) {
            self.availability.lock().unwrap().push((device_id, online));
        }
        fn publish_group_availability(&self, group_id: GroupId, online: bool) {
            self.group_availability.lock().unwrap().push((group_id, online));
        }
    }

    fn seed_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .insert_device(cync_model::Device::new(7, "home-1", DeviceType::Light, "Lamp"))
            .unwrap();
        registry
            .insert_device(cync_model::Device::new(8, "home-1", DeviceType::Light, "Other Lamp"))
            .unwrap();
        let mut subgroup = Group::new(100, "home-1", "Subgroup");
        subgroup.is_subgroup = true;
        subgroup.member_ids = vec![7, 8];
        registry.insert_group(subgroup).unwrap();
        registry
    }

    #[test]
    fn status_scenario_updates_device_and_subgroup() {
        let mut registry = seed_registry();
        let publisher = RecordingPublisher::default();
        let frame = StatusFrame {
            device_id: 7,
            state: 1,
            brightness: 46,
            temperature: 50,
            r: 0,
            g: 0,
            b: 0,
            online_byte: 1,
        };

        reconcile_status(&mut registry, &publisher, frame, "status");

        let device = registry.device(7).unwrap();
        assert!(device.online);
        assert!(device.state.on);
        assert_eq!(device.state.brightness, 46);

        let group = registry.group(100).unwrap();
        assert_eq!(group.state.brightness, 46); // only member 7 online so far

        assert_eq!(publisher.device_states.lock().unwrap().len(), 1);
        assert_eq!(publisher.group_states.lock().unwrap().len(), 1);
    }

    #[test]
    fn offline_debouncing_publishes_availability_only_on_flip() {
        let mut registry = seed_registry();
        let publisher = RecordingPublisher::default();
        let offline_frame = |id: u16| StatusFrame {
            device_id: id,
            state: 0,
            brightness: 0,
            temperature: 0,
            r: 0,
            g: 0,
            b: 0,
            online_byte: 0,
        };

        registry.device_mut(7).unwrap().online = true;

        reconcile_status(&mut registry, &publisher, offline_frame(7), "status");
        assert!(registry.device(7).unwrap().online);
        reconcile_status(&mut registry, &publisher, offline_frame(7), "status");
        assert!(registry.device(7).unwrap().online);
        reconcile_status(&mut registry, &publisher, offline_frame(7), "status");
        assert!(!registry.device(7).unwrap().online);

        let flips = publisher.availability.lock().unwrap();
        assert_eq!(flips.len(), 1);
        assert_eq!(flips[0], (7, false));
    }

    #[test]
    fn unknown_id_is_dropped_without_panicking() {
        let mut registry = seed_registry();
        let publisher = RecordingPublisher::default();
        let frame = StatusFrame {
            device_id: 999,
            state: 1,
            brightness: 1,
            temperature: 1,
            r: 0,
            g: 0,
            b: 0,
            online_byte: 1,
        };
        reconcile_status(&mut registry, &publisher, frame, "status");
        assert!(publisher.device_states.lock().unwrap().is_empty());
    }

    #[test]
    fn mesh_info_reconciles_every_device() {
        let mut registry = seed_registry();
        let publisher = RecordingPublisher::default();
        let devices = vec![
            MeshDeviceInfo { device_id: 7, device_type: 0, state: 1, brightness: 10, temperature: 50, r: 0, g: 0, b: 0 },
            MeshDeviceInfo { device_id: 8, device_type: 0, state: 1, brightness: 20, temperature: 50, r: 0, g: 0, b: 0 },
        ];
        reconcile_mesh_info(&mut registry, &publisher, devices);

        assert_eq!(registry.device(7).unwrap().state.brightness, 10);
        assert_eq!(registry.device(8).unwrap().state.brightness, 20);
    }

    #[test]
    fn room_group_publishes_availability_only_on_flip() {
        let mut registry = Registry::new();
        let mut room = Group::new(200, "home-1", "Living Room");
        room.is_subgroup = false;
        registry.insert_group(room).unwrap();

        let publisher = RecordingPublisher::default();
        let frame = |online_byte: u8| StatusFrame {
            device_id: 200,
            state: 1,
            brightness: 50,
            temperature: 50,
            r: 0,
            g: 0,
            b: 0,
            online_byte,
        };

        reconcile_status(&mut registry, &publisher, frame(1), "status");
        assert!(registry.group(200).unwrap().online);
        reconcile_status(&mut registry, &publisher, frame(1), "status");
        assert!(registry.group(200).unwrap().online);
        reconcile_status(&mut registry, &publisher, frame(0), "status");
        assert!(!registry.group(200).unwrap().online);

        let flips = publisher.group_availability.lock().unwrap();
        assert_eq!(*flips, vec![(200, true), (200, false)]);
    }

    #[test]
    fn firmware_version_is_recorded_on_known_device() {
        let mut registry = seed_registry();
        apply_firmware_version(&mut registry, 7, "1.2.345".to_string());
        assert_eq!(registry.device(7).unwrap().firmware_version.as_deref(), Some("1.2.345"));
    }
}
