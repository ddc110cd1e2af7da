use cync_commands::Command;
use cync_commands::FanSpeed;
use cync_commands::Target;
use cync_model::DeviceId;
use cync_model::GroupId;
use cync_wire::LightshowEffect;
use mqtt_channel::Message;
use serde::Deserialize;
use tracing::warn;

/// What the bridge's command-enqueue loop should do with one inbound MQTT
/// message (§4.6). Kept as plain data, mirroring
/// `cync_session::SessionAction`: this module only classifies, the binary's
/// MQTT loop performs the actual `enqueue`/restart/refresh side effects.
#[derive(Debug, PartialEq)]
pub enum RouterAction {
    Enqueue(Command),
    BridgeRestart,
    BridgeRefreshStatus,
    /// Recognized but out of scope here (export/OTP subsystem, §1 Non-goals).
    Forwarded,
    Ignored,
}

#[derive(Debug, Deserialize, Default)]
struct CommandBody {
    state: Option<String>,
    brightness: Option<u8>,
    color_temp: Option<u8>,
    color: Option<RgbBody>,
    effect: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RgbBody {
    r: u8,
    g: u8,
    b: u8,
}

enum ParsedTarget {
    Device(DeviceId),
    Group(GroupId),
    Bridge,
}

/// `home-N` → device, `home-group-N` → group, literal `bridge` → bridge
/// control (§4.6). `home_id` itself may contain hyphens, so only the
/// trailing numeric segment (and the `group` marker immediately before it)
/// is significant.
fn parse_hass_id(hass_id: &str) -> Option<ParsedTarget> {
    if hass_id == "bridge" {
        return Some(ParsedTarget::Bridge);
    }
    if let Some(idx) = hass_id.rfind("-group-") {
        let id = hass_id[idx + "-group-".len()..].parse::<GroupId>().ok()?;
        return Some(ParsedTarget::Group(id));
    }
    let idx = hass_id.rfind('-')?;
    let id = hass_id[idx + 1..].parse::<DeviceId>().ok()?;
    Some(ParsedTarget::Device(id))
}

fn parse_command_body(msg: &Message) -> Result<CommandBody, serde_json::Error> {
    let raw = msg.payload_str().unwrap_or("");
    match raw.trim() {
        "ON" => Ok(CommandBody { state: Some("ON".to_string()), ..Default::default() }),
        "OFF" => Ok(CommandBody { state: Some("OFF".to_string()), ..Default::default() }),
        _ => serde_json::from_str(raw),
    }
}

/// One JSON body maps to exactly one `Command` variant, in priority order
/// effect > color > color_temp > brightness > state (an HA light update
/// typically carries a single changed field per publish).
fn device_command(target: Target, body: CommandBody) -> Option<Command> {
    if let Some(effect) = body.effect {
        return effect.parse::<LightshowEffect>().ok().map(|effect| Command::SetLightshow { target, effect });
    }
    if let Some(color) = body.color {
        return Some(Command::SetRgb { target, r: color.r, g: color.g, b: color.b });
    }
    if let Some(temperature) = body.color_temp {
        return Some(Command::SetTemperature { target, temperature });
    }
    if let Some(brightness) = body.brightness {
        return Some(Command::SetBrightness { target, brightness });
    }
    body.state.map(|state| Command::SetPower { target, state: state == "ON" })
}

/// Groups only ever accept power/brightness/temperature (§4.6); color and
/// lightshow are device-only.
fn group_command(target: Target, body: CommandBody) -> Option<Command> {
    if body.color.is_some() || body.effect.is_some() {
        warn!("group commands do not support color or lightshow; ignoring those fields");
    }
    if let Some(temperature) = body.color_temp {
        return Some(Command::SetTemperature { target, temperature });
    }
    if let Some(brightness) = body.brightness {
        return Some(Command::SetBrightness { target, brightness });
    }
    body.state.map(|state| Command::SetPower { target, state: state == "ON" })
}

fn fan_speed_from_preset(preset: &str) -> Option<FanSpeed> {
    match preset.to_lowercase().as_str() {
        "off" => Some(FanSpeed::Off),
        "low" => Some(FanSpeed::Low),
        "medium" => Some(FanSpeed::Medium),
        "high" => Some(FanSpeed::High),
        "max" => Some(FanSpeed::Max),
        _ => None,
    }
}

/// Route one inbound `${cync_topic}/set/...` message (§4.6). Malformed JSON
/// or an unparseable `hass_id` is logged and dropped.
pub fn route_message(msg: &Message, cync_topic: &str) -> RouterAction {
    let prefix = format!("{cync_topic}/set/");
    let Some(rest) = msg.topic.name.strip_prefix(&prefix) else {
        return RouterAction::Ignored;
    };
    let mut segments = rest.splitn(2, '/');
    let hass_id = segments.next().unwrap_or("");
    let subfield = segments.next();

    let Some(target) = parse_hass_id(hass_id) else {
        warn!(hass_id, "could not parse hass_id into a device, group or bridge target");
        return RouterAction::Ignored;
    };

    match (target, subfield) {
        (ParsedTarget::Bridge, Some("restart")) => RouterAction::BridgeRestart,
        (ParsedTarget::Bridge, Some("refresh_status")) => RouterAction::BridgeRefreshStatus,
        (ParsedTarget::Bridge, Some("otp/submit")) | (ParsedTarget::Bridge, Some("otp/input")) => {
            RouterAction::Forwarded
        }
        (ParsedTarget::Bridge, other) => {
            warn!(?other, "unhandled bridge control subfield");
            RouterAction::Ignored
        }
        (ParsedTarget::Device(device_id), Some("percentage")) => {
            let Ok(percent) = msg.payload_str().unwrap_or("").trim().parse::<u8>() else {
                warn!(device_id, "malformed fan percentage payload");
                return RouterAction::Ignored;
            };
            RouterAction::Enqueue(Command::SetFanSpeed {
                target: Target::Device(device_id),
                speed: FanSpeed::from_percent(percent),
            })
        }
        (ParsedTarget::Device(device_id), Some("preset")) => {
            let preset = msg.payload_str().unwrap_or("");
            let Some(speed) = fan_speed_from_preset(preset) else {
                warn!(device_id, preset, "unknown fan preset");
                return RouterAction::Ignored;
            };
            RouterAction::Enqueue(Command::SetFanSpeed { target: Target::Device(device_id), speed })
        }
        (ParsedTarget::Device(device_id), None) => match parse_command_body(msg) {
            Ok(body) => device_command(Target::Device(device_id), body)
                .map(RouterAction::Enqueue)
                .unwrap_or(RouterAction::Ignored),
            Err(err) => {
                warn!(device_id, %err, "malformed device command JSON");
                RouterAction::Ignored
            }
        },
        (ParsedTarget::Group(group_id), None) => match parse_command_body(msg) {
            Ok(body) => group_command(Target::Group(group_id), body)
                .map(RouterAction::Enqueue)
                .unwrap_or(RouterAction::Ignored),
            Err(err) => {
                warn!(group_id, %err, "malformed group command JSON");
                RouterAction::Ignored
            }
        },
        (ParsedTarget::Group(group_id), Some(other)) => {
            warn!(group_id, other, "unhandled group command subfield");
            RouterAction::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqtt_channel::Topic;

    fn msg(topic: &str, payload: &str) -> Message {
        Message::new(&Topic::from(topic), payload)
    }

    #[test]
    fn plain_on_maps_to_set_power() {
        let action = route_message(&msg("cync_lan/set/home-1-7", "ON"), "cync_lan");
        assert_eq!(
            action,
            RouterAction::Enqueue(Command::SetPower { target: Target::Device(7), state: true })
        );
    }

    #[test]
    fn json_brightness_maps_to_set_brightness() {
        let action = route_message(&msg("cync_lan/set/home-1-7", r#"{"brightness":46}"#), "cync_lan");
        assert_eq!(
            action,
            RouterAction::Enqueue(Command::SetBrightness { target: Target::Device(7), brightness: 46 })
        );
    }

    #[test]
    fn group_command_parses_group_id() {
        let action = route_message(&msg("cync_lan/set/home-1-group-256", r#"{"state":"OFF"}"#), "cync_lan");
        assert_eq!(
            action,
            RouterAction::Enqueue(Command::SetPower { target: Target::Group(256), state: false })
        );
    }

    #[test]
    fn malformed_json_is_dropped() {
        let action = route_message(&msg("cync_lan/set/home-1-7", "{not json"), "cync_lan");
        assert_eq!(action, RouterAction::Ignored);
    }

    #[test]
    fn fan_percentage_subfield_maps_to_fan_speed() {
        let action = route_message(&msg("cync_lan/set/home-1-7/percentage", "80"), "cync_lan");
        assert_eq!(
            action,
            RouterAction::Enqueue(Command::SetFanSpeed { target: Target::Device(7), speed: FanSpeed::High })
        );
    }

    #[test]
    fn bridge_restart_is_recognized() {
        let action = route_message(&msg("cync_lan/set/bridge/restart", ""), "cync_lan");
        assert_eq!(action, RouterAction::BridgeRestart);
    }
}
