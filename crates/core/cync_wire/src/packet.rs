use crate::WireError;

/// The known outer-frame header bytes. Anything else is logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Identification handshake.
    Handshake,
    /// App-ID response; may fragment across reads.
    AppId,
    /// Connection request.
    ConnectionRequest,
    /// Heartbeat.
    Heartbeat,
    /// "Want to control".
    WantToControl,
    /// Ack of a prior control request.
    ControlAck,
    /// Unsolicited info (timestamp or status structs).
    UnsolicitedInfo,
    /// Firmware/status payload.
    Status,
    /// Response to a control/mesh-info request.
    ControlResponse,
}

impl PacketType {
    pub const fn byte(self) -> u8 {
        match self {
            PacketType::Handshake => 0x23,
            PacketType::AppId => 0xAB,
            PacketType::ConnectionRequest => 0xC3,
            PacketType::Heartbeat => 0xD3,
            PacketType::WantToControl => 0xA3,
            PacketType::ControlAck => 0x7B,
            PacketType::UnsolicitedInfo => 0x43,
            PacketType::Status => 0x83,
            PacketType::ControlResponse => 0x73,
        }
    }

    pub fn from_byte(byte: u8) -> Result<PacketType, WireError> {
        Ok(match byte {
            0x23 => PacketType::Handshake,
            0xAB => PacketType::AppId,
            0xC3 => PacketType::ConnectionRequest,
            0xD3 => PacketType::Heartbeat,
            0xA3 => PacketType::WantToControl,
            0x7B => PacketType::ControlAck,
            0x43 => PacketType::UnsolicitedInfo,
            0x83 => PacketType::Status,
            0x73 => PacketType::ControlResponse,
            other => return Err(WireError::UnknownHeader(other)),
        })
    }
}

/// A fully reassembled frame: `[type:1][reserved:2][len_hi:1][len_lo:1][payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
}

impl RawPacket {
    pub fn new(packet_type: PacketType, payload: Vec<u8>) -> Self {
        RawPacket {
            packet_type,
            payload,
        }
    }

    /// Encode this packet back onto the wire, as `[type,0,0,len_hi,len_lo,payload...]`.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len();
        let mut buf = Vec::with_capacity(5 + len);
        buf.push(self.packet_type.byte());
        buf.push(0);
        buf.push(0);
        buf.push((len >> 8) as u8);
        buf.push((len & 0xFF) as u8);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Build a fixed, payload-less acknowledgement packet.
pub fn ack_packet(packet_type: PacketType, payload: Vec<u8>) -> RawPacket {
    RawPacket::new(packet_type, payload)
}

/// `auth_ack`: acknowledges a `0x23` handshake.
pub fn auth_ack() -> RawPacket {
    RawPacket::new(PacketType::Handshake, vec![0x00, 0x00])
}

/// `connection_ack`: acknowledges a `0xC3` connection request.
pub fn connection_ack() -> RawPacket {
    RawPacket::new(PacketType::ConnectionRequest, vec![0x00])
}

/// `ping_ack`: acknowledges a `0xD3` heartbeat.
pub fn ping_ack() -> RawPacket {
    RawPacket::new(PacketType::Heartbeat, vec![])
}

/// `x48_ack(msg_id)`: acknowledges a `0x43` unsolicited-info packet.
pub fn x48_ack(msg_id: u8) -> RawPacket {
    RawPacket::new(PacketType::UnsolicitedInfo, vec![msg_id, 0x00])
}

/// `x88_ack(msg_id)`: acknowledges a `0x83` status packet.
pub fn x88_ack(msg_id: u8) -> RawPacket {
    RawPacket::new(PacketType::Status, vec![msg_id, 0x00])
}

/// `x7B_ack(queue_id, msg_id)`: acknowledges a `0x73` control-response packet.
pub fn x7b_ack(queue_id: &[u8; 5], msg_id: u8) -> RawPacket {
    let mut payload = Vec::with_capacity(6);
    payload.extend_from_slice(queue_id);
    payload.push(msg_id);
    RawPacket::new(PacketType::ControlAck, payload)
}

/// `app_id_ack(msg_id)`: acknowledges an `0xA3` "want to control" packet sent
/// by a device or companion app (as opposed to one the bridge itself sends).
pub fn app_id_ack(msg_id: u8) -> RawPacket {
    RawPacket::new(PacketType::AppId, vec![msg_id, 0x00])
}

/// The bridge's own outbound `0xA3`: `queue_id` (5 bytes) followed by a
/// 2-byte message id.
pub fn want_to_control(queue_id: &[u8; 5], msg_id: [u8; 2]) -> RawPacket {
    let mut payload = Vec::with_capacity(7);
    payload.extend_from_slice(queue_id);
    payload.extend_from_slice(&msg_id);
    RawPacket::new(PacketType::WantToControl, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_headers_roundtrip() {
        for b in [0x23u8, 0xAB, 0xC3, 0xD3, 0xA3, 0x7B, 0x43, 0x83, 0x73] {
            let t = PacketType::from_byte(b).unwrap();
            assert_eq!(t.byte(), b);
        }
    }

    #[test]
    fn unknown_header_errors() {
        assert!(PacketType::from_byte(0x00).is_err());
    }

    #[test]
    fn encode_includes_declared_length() {
        let packet = RawPacket::new(PacketType::Heartbeat, vec![1, 2, 3]);
        let bytes = packet.encode();
        assert_eq!(bytes, vec![0xD3, 0x00, 0x00, 0x00, 0x03, 1, 2, 3]);
    }

    #[test]
    fn want_to_control_declares_seven_byte_payload() {
        let queue_id = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let packet = want_to_control(&queue_id, [0x01, 0x02]);
        let bytes = packet.encode();
        assert_eq!(bytes[0], 0xA3);
        assert_eq!(bytes[4], 0x07);
        assert_eq!(&bytes[5..10], &queue_id);
    }
}
