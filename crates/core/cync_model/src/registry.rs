use std::collections::HashMap;

use crate::Device;
use crate::DeviceId;
use crate::Group;
use crate::GroupId;
use crate::RegistryError;

/// The owner of all `Device` and `Group` records (§3 "Global registry",
/// §9 "Runtime coupling through globals" — passed explicitly rather than
/// reached through a hidden singleton).
#[derive(Debug, Default)]
pub struct Registry {
    devices: HashMap<DeviceId, Device>,
    groups: HashMap<GroupId, Group>,
    /// Derived `device_id -> [subgroup_id]` index (§9 "Back-references"),
    /// rebuilt whenever group membership changes.
    subgroup_index: HashMap<DeviceId, Vec<GroupId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_device(&mut self, device: Device) -> Result<(), RegistryError> {
        if self.devices.contains_key(&device.id) {
            return Err(RegistryError::DuplicateDevice(device.id));
        }
        self.devices.insert(device.id, device);
        Ok(())
    }

    pub fn insert_group(&mut self, group: Group) -> Result<(), RegistryError> {
        if self.groups.contains_key(&group.id) {
            return Err(RegistryError::DuplicateGroup(group.id));
        }
        self.rebuild_subgroup_index_for(&group);
        self.groups.insert(group.id, group);
        Ok(())
    }

    fn rebuild_subgroup_index_for(&mut self, group: &Group) {
        if !group.is_subgroup {
            return;
        }
        for member in &group.member_ids {
            self.subgroup_index.entry(*member).or_default().push(group.id);
        }
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Every subgroup that `device_id` is a member of (§4.4 "For every
    /// subgroup containing this device, re-aggregate").
    pub fn subgroups_containing(&self, device_id: DeviceId) -> &[GroupId] {
        self.subgroup_index
            .get(&device_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Recompute a subgroup's aggregate state from its current members.
    /// Returns `Err` if the group id is unknown or is not a subgroup.
    pub fn reaggregate_subgroup(&mut self, group_id: GroupId) -> Result<(), RegistryError> {
        let member_ids = self
            .groups
            .get(&group_id)
            .ok_or(RegistryError::UnknownGroup(group_id))?
            .member_ids
            .clone();

        let members: Vec<&Device> = member_ids.iter().filter_map(|id| self.devices.get(id)).collect();

        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or(RegistryError::UnknownGroup(group_id))?;
        group.aggregate(&members);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceType;

    #[test]
    fn duplicate_device_insert_is_rejected() {
        let mut registry = Registry::new();
        registry
            .insert_device(Device::new(1, "home-1", DeviceType::Light, "Lamp"))
            .unwrap();
        let err = registry
            .insert_device(Device::new(1, "home-1", DeviceType::Light, "Lamp2"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDevice(1)));
    }

    #[test]
    fn subgroup_index_tracks_membership() {
        let mut registry = Registry::new();
        registry
            .insert_device(Device::new(7, "home-1", DeviceType::Light, "Lamp"))
            .unwrap();
        let mut group = Group::new(100, "home-1", "Subgroup");
        group.is_subgroup = true;
        group.member_ids = vec![7];
        registry.insert_group(group).unwrap();

        assert_eq!(registry.subgroups_containing(7), &[100]);
    }

    #[test]
    fn reaggregate_subgroup_pulls_live_member_state() {
        let mut registry = Registry::new();
        let mut device = Device::new(7, "home-1", DeviceType::Light, "Lamp");
        device.online = true;
        device.state.on = true;
        device.state.brightness = 46;
        registry.insert_device(device).unwrap();

        let mut group = Group::new(100, "home-1", "Subgroup");
        group.is_subgroup = true;
        group.member_ids = vec![7];
        registry.insert_group(group).unwrap();

        registry.reaggregate_subgroup(100).unwrap();
        let group = registry.group(100).unwrap();
        assert!(group.state.on);
        assert_eq!(group.state.brightness, 46);
    }
}
