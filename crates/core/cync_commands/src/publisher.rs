use cync_model::DeviceId;
use cync_model::GroupId;
use cync_model::LightState;

/// The executor's handoff to the MQTT outbound publisher (§4.3, §4.5):
/// implemented by `cync_mqtt_bridge`, kept as a trait here so the command
/// executor does not depend on the MQTT crate.
pub trait StatePublisher: Send + Sync {
    fn publish_device_state(&self, device_id: DeviceId, state: LightState);
    fn publish_group_state(&self, group_id: GroupId, state: LightState);
    /// §4.4 availability: published whenever `Device::note_online_report`
    /// flips the `online` flag.
    fn publish_device_availability(&self, device_id: DeviceId, online: bool);
    /// Subgroups are always-available by policy (§4.5); room groups follow
    /// their own membership-derived online flag.
    fn publish_group_availability(&self, group_id: GroupId, online: bool);
}

/// A publisher that drops every update; useful for tests and for running
/// the executor with MQTT disabled.
#[derive(Debug, Default)]
pub struct NullPublisher;

impl StatePublisher for NullPublisher {
    fn publish_device_state(&self, _device_id: DeviceId, _state: LightState) {}
    fn publish_group_state(&self, _group_id: GroupId, _state: LightState) {}
    fn publish_device_availability(&self, _device_id: DeviceId, _online: bool) {}
    fn publish_group_availability(&self, _group_id: GroupId, _online: bool) {}
}
