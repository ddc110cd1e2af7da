use crate::DeviceId;
use crate::HomeId;

/// Numeric device class → capability set. Mirrors the `type` byte carried in
/// mesh-info and discovery (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Light,
    Switch,
    Plug,
    Fan,
    Hvac,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    pub dimmable: bool,
    pub tunable_white: bool,
    pub rgb: bool,
    pub fan_control: bool,
    pub plug_only: bool,
}

impl DeviceType {
    pub fn capabilities(self) -> DeviceCapabilities {
        match self {
            DeviceType::Light => DeviceCapabilities {
                dimmable: true,
                tunable_white: true,
                rgb: true,
                ..Default::default()
            },
            DeviceType::Switch => DeviceCapabilities {
                dimmable: true,
                ..Default::default()
            },
            DeviceType::Plug => DeviceCapabilities {
                plug_only: true,
                ..Default::default()
            },
            DeviceType::Fan => DeviceCapabilities {
                fan_control: true,
                dimmable: true,
                ..Default::default()
            },
            DeviceType::Hvac => DeviceCapabilities {
                tunable_white: false,
                ..Default::default()
            },
        }
    }
}

/// Whether a device's current frame should be read as a white-temperature
/// value or an RGB one (§4.4: `temperature > 100` ⇒ RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    White,
    Rgb,
}

/// The mutable lighting/power state shared by devices and groups.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightState {
    pub on: bool,
    pub brightness: u8,
    pub temperature: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LightState {
    pub fn color_mode(&self) -> ColorMode {
        if self.temperature > 100 {
            ColorMode::Rgb
        } else {
            ColorMode::White
        }
    }
}

/// The bridge's per-device control-byte counter (§3): a `(low, carry)` pair
/// incremented mod 256 for every outbound control packet. `low` is the
/// single-byte `ctrl_id` placed in the inner struct; `carry` tracks how many
/// times `low` has wrapped, so retries minted a full rotation apart are still
/// distinguishable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlByteCounter {
    low: u8,
    carry: u8,
}

impl ControlByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next `ctrl_id`, wrapping mod 256 and bumping `carry` on wrap.
    pub fn next(&mut self) -> u8 {
        let (next, wrapped) = self.low.overflowing_add(1);
        self.low = next;
        if wrapped {
            self.carry = self.carry.wrapping_add(1);
        }
        self.low
    }

    pub fn carry(&self) -> u8 {
        self.carry
    }
}

/// A single Cync device (§3).
#[derive(Debug, Clone)]
pub struct Device {
    pub id: DeviceId,
    pub home_id: HomeId,
    pub device_type: DeviceType,
    pub name: String,
    pub mac: String,
    pub wifi_mac: String,
    pub firmware_version: Option<String>,
    /// BT-mesh-only peer, relayed by a Wi-Fi bridge rather than reachable by
    /// direct TCP session.
    pub bt_only: bool,

    pub state: LightState,
    pub online: bool,
    offline_count: u8,
    control_counter: ControlByteCounter,
}

/// Consecutive offline reports required before a device is actually flipped
/// offline (§4.4, §8 invariant).
const OFFLINE_HYSTERESIS: u8 = 3;

impl Device {
    pub fn new(
        id: DeviceId,
        home_id: impl Into<HomeId>,
        device_type: DeviceType,
        name: impl Into<String>,
    ) -> Self {
        Device {
            id,
            home_id: home_id.into(),
            device_type,
            name: name.into(),
            mac: String::new(),
            wifi_mac: String::new(),
            firmware_version: None,
            bt_only: false,
            state: LightState::default(),
            online: false,
            offline_count: 0,
            control_counter: ControlByteCounter::new(),
        }
    }

    /// Apply an online/offline report byte, per the hysteresis rule in §4.4
    /// and §8: `online_byte != 0` resets the counter and marks online
    /// immediately; `online_byte == 0` increments the counter and only flips
    /// to offline once it reaches [`OFFLINE_HYSTERESIS`]. Returns `true` if
    /// the `online` flag changed as a result.
    pub fn note_online_report(&mut self, online_byte: u8) -> bool {
        let was_online = self.online;
        if online_byte != 0 {
            self.offline_count = 0;
            self.online = true;
        } else {
            self.offline_count = self.offline_count.saturating_add(1);
            if self.offline_count >= OFFLINE_HYSTERESIS {
                self.online = false;
            }
        }
        was_online != self.online
    }

    pub fn offline_count(&self) -> u8 {
        self.offline_count
    }

    /// Write through a freshly-parsed status frame (§4.4 "State apply").
    pub fn apply_frame(&mut self, state: LightState) {
        self.state = state;
    }

    pub fn next_ctrl_id(&mut self) -> u8 {
        self.control_counter.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_byte_counter_wraps_and_tracks_carry() {
        let mut counter = ControlByteCounter::new();
        for _ in 0..255 {
            counter.next();
        }
        assert_eq!(counter.carry(), 0);
        let wrapped = counter.next();
        assert_eq!(wrapped, 0);
        assert_eq!(counter.carry(), 1);
    }

    #[test]
    fn offline_hysteresis_requires_three_reports() {
        let mut device = Device::new(9, "home-1", DeviceType::Light, "Lamp");
        device.online = true;

        assert!(!device.note_online_report(0));
        assert!(device.online);
        assert_eq!(device.offline_count(), 1);

        assert!(!device.note_online_report(0));
        assert!(device.online);
        assert_eq!(device.offline_count(), 2);

        assert!(device.note_online_report(0));
        assert!(!device.online);
        assert_eq!(device.offline_count(), 3);
    }

    #[test]
    fn any_online_report_resets_counter() {
        let mut device = Device::new(9, "home-1", DeviceType::Light, "Lamp");
        device.online = true;
        device.note_online_report(0);
        device.note_online_report(0);
        assert!(!device.note_online_report(1));
        assert_eq!(device.offline_count(), 0);
        assert!(device.online);
    }

    #[test]
    fn color_mode_follows_temperature_threshold() {
        let mut state = LightState {
            temperature: 50,
            ..Default::default()
        };
        assert_eq!(state.color_mode(), ColorMode::White);
        state.temperature = 254;
        assert_eq!(state.color_mode(), ColorMode::Rgb);
    }
}
