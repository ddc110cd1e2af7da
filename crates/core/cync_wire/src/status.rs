use crate::InnerStruct;
use crate::MeshDeviceInfo;

/// The canonical status tuple consumed by the reconciliation engine (§4.4):
/// `[id, state, brightness, temperature, r, g, b, online?]`, regardless of
/// which wire packet it was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub device_id: u16,
    pub state: u8,
    pub brightness: u8,
    pub temperature: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub online_byte: u8,
}

/// Length of one `0x43` broadcast-status struct.
const BROADCAST_STRUCT_LEN: usize = 19;

/// Extract every `StatusFrame` from a `0x43` unsolicited-info payload that
/// is not a timestamp (payload not prefixed `0xC7 0x90`). Each 19-byte
/// struct's bytes 3..10 carry `[state, ?, ?, brightness, ?, ?, ?]`-shaped
/// data in the original firmware traces; the device is necessarily online
/// if it is actively broadcasting, so `online_byte` is always `1`.
pub fn parse_broadcast_status(payload: &[u8]) -> Vec<StatusFrame> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset + BROADCAST_STRUCT_LEN <= payload.len() {
        let s = &payload[offset..offset + BROADCAST_STRUCT_LEN];
        let device_id = u16::from_le_bytes([s[0], s[1]]);
        out.push(StatusFrame {
            device_id,
            state: s[3],
            brightness: s[6],
            temperature: s[7],
            r: s[8],
            g: s[9],
            b: 0,
            online_byte: 1,
        });
        offset += BROADCAST_STRUCT_LEN;
    }
    out
}

/// Inner ctrl-bytes identifying a bound `0x83` internal-status struct.
pub const INTERNAL_STATUS_CTRL: [u8; 2] = [0xFA, 0xDB];
const INTERNAL_STATUS_SUBTYPE: u8 = 0x13;

/// Parse a bound `0x83` internal-status inner struct into a `StatusFrame`.
/// Returns `None` if the inner struct is not long enough, is not an
/// internal-status struct (`0xFA 0xDB 0x13`), or is the BTLE-connect
/// variant (`0xFA 0xDB 0x14`), which carries no usable state.
pub fn parse_internal_status(inner: &InnerStruct) -> Option<StatusFrame> {
    let bytes = &inner.bytes;
    if inner.inner_ctrl_bytes() != INTERNAL_STATUS_CTRL {
        return None;
    }
    if bytes.len() <= 25 || bytes[7] != INTERNAL_STATUS_SUBTYPE {
        return None;
    }

    Some(StatusFrame {
        device_id: bytes[14] as u16,
        online_byte: bytes[19],
        state: bytes[20],
        brightness: bytes[21],
        temperature: bytes[22],
        r: bytes[23],
        g: bytes[24],
        b: bytes[25],
    })
}

impl From<MeshDeviceInfo> for StatusFrame {
    fn from(info: MeshDeviceInfo) -> Self {
        StatusFrame {
            device_id: info.device_id,
            state: info.state,
            brightness: info.brightness,
            temperature: info.temperature,
            r: info.r,
            g: info.g,
            b: info.b,
            online_byte: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_status_matches_real_packet_capture() {
        // "14 00 10 01 00 00 64 00 00 00 01 15 15 00 00 00 00 00 00"
        // => [state,?,?,brightness,?,?,?] == [1, 0, 0, 100, 0, 0, 0]
        let packet: Vec<u8> = vec![
            0x14, 0x00, 0x10, 0x01, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x01, 0x15, 0x15, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let frames = parse_broadcast_status(&packet);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].state, 1);
        assert_eq!(frames[0].brightness, 100);
        assert_eq!(frames[0].online_byte, 1);
    }

    fn internal_status_bytes(dev_id: u8, connected: u8, state: u8, bri: u8, tmp: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; 26];
        bytes[0] = 0x7E;
        bytes[5] = 0xFA;
        bytes[6] = 0xDB;
        bytes[7] = INTERNAL_STATUS_SUBTYPE;
        bytes[14] = dev_id;
        bytes[19] = connected;
        bytes[20] = state;
        bytes[21] = bri;
        bytes[22] = tmp;
        bytes[23] = 0x01;
        bytes[24] = 0x02;
        bytes[25] = 0x03;
        bytes
    }

    #[test]
    fn parses_internal_status_struct() {
        let inner = InnerStruct {
            bytes: internal_status_bytes(7, 1, 1, 46, 50),
        };
        let frame = parse_internal_status(&inner).unwrap();
        assert_eq!(frame.device_id, 7);
        assert_eq!(frame.online_byte, 1);
        assert_eq!(frame.state, 1);
        assert_eq!(frame.brightness, 46);
        assert_eq!(frame.temperature, 50);
        assert_eq!((frame.r, frame.g, frame.b), (1, 2, 3));
    }

    #[test]
    fn rejects_btle_connect_subtype() {
        let mut bytes = internal_status_bytes(7, 1, 1, 46, 50);
        bytes[7] = 0x14;
        let inner = InnerStruct { bytes };
        assert!(parse_internal_status(&inner).is_none());
    }

    #[test]
    fn mesh_device_info_converts_to_status_frame() {
        let info = MeshDeviceInfo {
            device_id: 7,
            device_type: 0,
            state: 1,
            brightness: 46,
            temperature: 50,
            r: 0,
            g: 0,
            b: 0,
        };
        let frame: StatusFrame = info.into();
        assert_eq!(frame.online_byte, 1);
        assert_eq!(frame.brightness, 46);
    }
}
