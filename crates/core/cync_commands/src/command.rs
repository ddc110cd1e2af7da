use cync_model::DeviceId;
use cync_model::GroupId;
use cync_wire::LightshowEffect;

/// Either a single device or a logical group; most commands accept either
/// (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Device(DeviceId),
    Group(GroupId),
}

impl Target {
    /// The 16-bit id placed in the control inner struct's `target_id`
    /// field. Device and group ids share one numeric space on the wire;
    /// the distinction only matters for fan-out policy (§8 scenario 6).
    pub fn wire_id(self) -> u16 {
        match self {
            Target::Device(id) => id,
            Target::Group(id) => id,
        }
    }

    pub fn is_group(self) -> bool {
        matches!(self, Target::Group(_))
    }
}

/// Fan preset, mapped onto the lighting brightness register (§4.3): the
/// percent-scale path, per the §9 open-question resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSpeed {
    Off,
    Low,
    Medium,
    High,
    Max,
}

impl FanSpeed {
    pub fn to_brightness(self) -> u8 {
        match self {
            FanSpeed::Off => 0,
            FanSpeed::Low => 25,
            FanSpeed::Medium => 50,
            FanSpeed::High => 75,
            FanSpeed::Max => 100,
        }
    }

    /// Map an inbound percentage (0-100) to the nearest preset (§4.6).
    pub fn from_percent(percent: u8) -> FanSpeed {
        match percent {
            0 => FanSpeed::Off,
            1..=37 => FanSpeed::Low,
            38..=62 => FanSpeed::Medium,
            63..=87 => FanSpeed::High,
            _ => FanSpeed::Max,
        }
    }
}

/// A queued command (§4.3). Lightshow commands are one-shot/fire-and-forget
/// and carry no ack callback; everything else follows the optimistic
/// publish → fan-out → ack-wait → settle → mesh-refresh lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPower { target: Target, state: bool },
    SetBrightness { target: Target, brightness: u8 },
    SetTemperature { target: Target, temperature: u8 },
    SetRgb { target: Target, r: u8, g: u8, b: u8 },
    SetLightshow { target: Target, effect: LightshowEffect },
    SetFanSpeed { target: Target, speed: FanSpeed },
}

impl Command {
    pub fn target(&self) -> Target {
        match *self {
            Command::SetPower { target, .. }
            | Command::SetBrightness { target, .. }
            | Command::SetTemperature { target, .. }
            | Command::SetRgb { target, .. }
            | Command::SetLightshow { target, .. }
            | Command::SetFanSpeed { target, .. } => target,
        }
    }

    /// Lightshow commands fire-and-forget; nothing else is (§4.3 "Effects").
    pub fn is_fire_and_forget(&self) -> bool {
        matches!(self, Command::SetLightshow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_speed_round_trips_through_percent_buckets() {
        assert_eq!(FanSpeed::from_percent(0), FanSpeed::Off);
        assert_eq!(FanSpeed::from_percent(25).to_brightness(), 25);
        assert_eq!(FanSpeed::from_percent(100), FanSpeed::Max);
    }

    #[test]
    fn only_lightshow_is_fire_and_forget() {
        let target = Target::Device(7);
        assert!(Command::SetLightshow {
            target,
            effect: LightshowEffect::Candle,
        }
        .is_fire_and_forget());
        assert!(!Command::SetPower { target, state: true }.is_fire_and_forget());
    }
}
