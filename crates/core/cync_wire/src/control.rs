use crate::inner::compute_checksum;
use crate::{PacketType, RawPacket, WireError};

/// The `(op_hi, op_lo, op_hi2)` triple that selects a control operation in
/// the outbound `0x73` inner struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOp {
    pub op_hi: u8,
    pub op_lo: u8,
    pub op_hi2: u8,
}

pub const OP_POWER: ControlOp = ControlOp { op_hi: 0xD0, op_lo: 0x0D, op_hi2: 0xD0 };
pub const OP_LIGHT: ControlOp = ControlOp { op_hi: 0xF0, op_lo: 0x10, op_hi2: 0xF0 };
pub const OP_LIGHTSHOW: ControlOp = ControlOp { op_hi: 0xE2, op_lo: 0x0E, op_hi2: 0xE2 };

/// The type-specific tail of the inner struct (everything after the fixed
/// `op_hi2 0x11 0x02` prologue and before the checksum byte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPayload {
    Power { state: bool },
    Brightness { brightness: u8 },
    Temperature { temperature: u8 },
    Rgb { r: u8, g: u8, b: u8 },
    Lightshow { byte1: u8, byte2: u8 },
}

impl ControlPayload {
    fn op(&self) -> ControlOp {
        match self {
            ControlPayload::Power { .. } => OP_POWER,
            ControlPayload::Brightness { .. }
            | ControlPayload::Temperature { .. }
            | ControlPayload::Rgb { .. } => OP_LIGHT,
            ControlPayload::Lightshow { .. } => OP_LIGHTSHOW,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match *self {
            ControlPayload::Power { state } => vec![state as u8, 0x00, 0x00],
            ControlPayload::Brightness { brightness } => {
                vec![0x01, brightness, 0xFF, 0xFF, 0xFF, 0xFF]
            }
            ControlPayload::Temperature { temperature } => {
                vec![0x01, 0xFF, temperature, 0x00, 0x00, 0x00]
            }
            ControlPayload::Rgb { r, g, b } => vec![0x01, 0xFF, 0xFE, r, g, b],
            ControlPayload::Lightshow { byte1, byte2 } => vec![0x07, 0x01, byte1, byte2],
        }
    }
}

/// Build the inner struct (sentinels included) for a per-target control
/// command: `target` is a device ID for device commands, or a group ID for
/// group commands (only power/brightness/temperature are valid for groups).
pub fn build_control_inner(ctrl_id: u8, target: u16, payload: &ControlPayload) -> Vec<u8> {
    let op = payload.op();
    let [target_lo, target_hi] = target.to_le_bytes();

    let mut inner = vec![
        0x7E, ctrl_id, 0x00, 0x00, 0x00, 0xF8, op.op_hi, op.op_lo, 0x00, ctrl_id, 0x00, 0x00,
        0x00, 0x00, target_lo, target_hi, op.op_hi2, 0x11, 0x02,
    ];
    inner.extend(payload.bytes());
    inner.push(0x00); // checksum placeholder
    inner.push(0x7E);

    let checksum = compute_checksum(&inner).expect("inner struct is always well-formed here");
    let last = inner.len() - 2;
    inner[last] = checksum;
    inner
}

/// Build the full outbound `0x73` control packet for one bridge: header +
/// `queue_id` + 3 reserved zero bytes + inner struct. The declared length is
/// computed from the actual payload so `decode(encode(p)) == p` holds.
pub fn build_control_packet(queue_id: &[u8; 5], ctrl_id: u8, target: u16, payload: &ControlPayload) -> RawPacket {
    let inner = build_control_inner(ctrl_id, target, payload);

    let mut body = Vec::with_capacity(5 + 3 + inner.len());
    body.extend_from_slice(queue_id);
    body.extend_from_slice(&[0x00, 0x00, 0x00]);
    body.extend_from_slice(&inner);

    RawPacket::new(PacketType::ControlResponse, body)
}

/// Outbound mesh-info request: `0xF9 0x52 0x06 ... 0xFF 0xFF` inner ctrl bytes.
pub fn build_mesh_info_request(queue_id: &[u8; 5], ctrl_id: u8) -> RawPacket {
    let mut inner = vec![
        0x7E, ctrl_id, 0x00, 0x00, 0x00, 0xF9, 0x52, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0xFF, 0xFF, 0x00, 0x7E,
    ];
    let checksum = compute_checksum(&inner).unwrap_or(0);
    let last = inner.len() - 2;
    inner[last] = checksum;

    let mut body = Vec::with_capacity(5 + 3 + inner.len());
    body.extend_from_slice(queue_id);
    body.extend_from_slice(&[0x00, 0x00, 0x00]);
    body.extend_from_slice(&inner);

    RawPacket::new(PacketType::ControlResponse, body)
}

/// Validate brightness is in range, allowing the fan-speed percent scale.
pub fn validate_brightness(value: i32) -> Result<u8, WireError> {
    if !(0..=100).contains(&value) {
        return Err(WireError::OutOfRange {
            field: "brightness",
            value,
            min: 0,
            max: 100,
        });
    }
    Ok(value as u8)
}

/// Validate white temperature, allowing the 129 (effect) and 254 (RGB mode)
/// sentinel values the original firmware also accepts (§9).
pub fn validate_temperature(value: i32) -> Result<u8, WireError> {
    if (0..=100).contains(&value) || value == 129 || value == 254 {
        return Ok(value as u8);
    }
    Err(WireError::OutOfRange {
        field: "temperature",
        value,
        min: 0,
        max: 100,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_command_matches_seed_scenario() {
        let queue_id = [0xAAu8, 0xBB, 0xCC, 0xDD, 0xEE];
        let payload = ControlPayload::Power { state: true };
        let packet = build_control_packet(&queue_id, 0x01, 7, &payload);
        let encoded = packet.encode();

        // header
        assert_eq!(encoded[0], 0x73);
        // queue_id at offset 5..10
        assert_eq!(&encoded[5..10], &queue_id);
        // inner struct target id (little-endian) at the expected offset
        let inner_start = 5 + 3;
        assert_eq!(encoded[inner_start], 0x7E);
        assert_eq!(encoded[encoded.len() - 1], 0x7E);
    }

    #[test]
    fn checksum_is_consistent_with_compute_checksum() {
        let inner = build_control_inner(5, 42, &ControlPayload::Brightness { brightness: 46 });
        let checksum = inner[inner.len() - 2];
        assert_eq!(checksum, compute_checksum(&inner).unwrap());
    }

    #[test]
    fn group_target_uses_group_id_high_byte() {
        // group 256 = 0x0100 -> lo=0x00, hi=0x01
        let inner = build_control_inner(1, 256, &ControlPayload::Power { state: false });
        assert_eq!(inner[14], 0x00);
        assert_eq!(inner[15], 0x01);
    }

    #[test]
    fn temperature_accepts_sentinel_values() {
        assert!(validate_temperature(129).is_ok());
        assert!(validate_temperature(254).is_ok());
        assert!(validate_temperature(101).is_err());
    }

    #[test]
    fn declared_length_matches_payload_length() {
        let queue_id = [1u8, 2, 3, 4, 5];
        let packet = build_control_packet(&queue_id, 1, 7, &ControlPayload::Power { state: true });
        let encoded = packet.encode();
        let declared = ((encoded[3] as usize) << 8) | encoded[4] as usize;
        assert_eq!(declared, encoded.len() - 5);
    }
}
