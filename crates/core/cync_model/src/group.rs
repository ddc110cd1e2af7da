use crate::Device;
use crate::DeviceId;
use crate::GroupId;
use crate::HomeId;
use crate::LightState;

/// A logical group of devices (§3). A *room group* may report its own state
/// directly over the mesh; a *subgroup* never does and must be aggregated
/// from its members (§4.4 "Subgroup").
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub home_id: HomeId,
    pub name: String,
    pub member_ids: Vec<DeviceId>,
    pub is_subgroup: bool,

    /// For room groups, the last state reported directly. For subgroups,
    /// the last aggregate computed from members.
    pub state: LightState,
    pub online: bool,
}

impl Group {
    pub fn new(id: GroupId, home_id: impl Into<HomeId>, name: impl Into<String>) -> Self {
        Group {
            id,
            home_id: home_id.into(),
            name: name.into(),
            member_ids: Vec::new(),
            is_subgroup: false,
            state: LightState::default(),
            online: false,
        }
    }

    /// Recompute this group's aggregate state from its online members (§3,
    /// §8): `on` = any member on; `brightness`/`temperature` = mean over
    /// online members; `online` = any member online.
    pub fn aggregate(&mut self, members: &[&Device]) {
        let online_members: Vec<&&Device> = members.iter().filter(|d| d.online).collect();

        self.online = !online_members.is_empty();
        if online_members.is_empty() {
            self.state.on = false;
            return;
        }

        self.state.on = online_members.iter().any(|d| d.state.on);

        let count = online_members.len() as u32;
        let brightness_sum: u32 = online_members.iter().map(|d| d.state.brightness as u32).sum();
        let temperature_sum: u32 = online_members
            .iter()
            .map(|d| d.state.temperature as u32)
            .sum();

        self.state.brightness = round_mean(brightness_sum, count);
        self.state.temperature = round_mean(temperature_sum, count);
    }
}

fn round_mean(sum: u32, count: u32) -> u8 {
    debug_assert!(count > 0);
    (((sum * 2 / count) + 1) / 2) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceType;

    fn device_with(id: DeviceId, on: bool, brightness: u8, online: bool) -> Device {
        let mut d = Device::new(id, "home-1", DeviceType::Light, format!("d{id}"));
        d.online = online;
        d.state.on = on;
        d.state.brightness = brightness;
        d
    }

    #[test]
    fn aggregates_on_as_any_member_on() {
        let members = vec![
            device_with(1, false, 0, true),
            device_with(2, true, 50, true),
        ];
        let refs: Vec<&Device> = members.iter().collect();
        let mut group = Group::new(100, "home-1", "Subgroup");
        group.aggregate(&refs);
        assert!(group.state.on);
        assert!(group.online);
    }

    #[test]
    fn offline_members_are_excluded_from_mean() {
        let members = vec![
            device_with(1, true, 46, true),
            device_with(2, false, 0, false),
        ];
        let refs: Vec<&Device> = members.iter().collect();
        let mut group = Group::new(100, "home-1", "Subgroup");
        group.aggregate(&refs);
        assert_eq!(group.state.brightness, 46);
    }

    #[test]
    fn all_members_offline_yields_offline_group() {
        let members = vec![device_with(1, true, 80, false)];
        let refs: Vec<&Device> = members.iter().collect();
        let mut group = Group::new(100, "home-1", "Subgroup");
        group.online = true;
        group.aggregate(&refs);
        assert!(!group.online);
        assert!(!group.state.on);
    }
}
