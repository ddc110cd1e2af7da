use std::time::Duration;

use cync_wire::ack_packet;
use cync_wire::parse_broadcast_status;
use cync_wire::parse_internal_status;
use cync_wire::parse_mesh_info;
use cync_wire::parse_unbound_firmware_version;
use cync_wire::ChecksumPolicy;
use cync_wire::ControlResponseKind;
use cync_wire::InnerStruct;
use cync_wire::MeshDeviceInfo;
use cync_wire::PacketType;
use cync_wire::RawPacket;
use cync_wire::StatusFrame;
use tracing::warn;

use crate::SessionError;
use crate::SessionState;
use SessionAction::Write;

/// Delay between a handshake's `auth_ack` and the bridge's own `0xA3`
/// (§4.2).
pub const WANT_TO_CONTROL_DELAY: Duration = Duration::from_millis(500);
/// Delay after the bridge's own `0xA3` before it asks for mesh info (§4.1,
/// §4.2).
pub const MESH_INFO_REQUEST_DELAY: Duration = Duration::from_millis(1500);

/// A prefix marking a `0x43` payload as a timestamp rather than a run of
/// broadcast-status structs.
const TIMESTAMP_PREFIX: [u8; 2] = [0xC7, 0x90];

/// What the caller (the read loop) should do in response to one inbound
/// packet. Kept as plain data so the dispatch logic is a pure function the
/// read loop drives, rather than something that performs IO itself.
#[derive(Debug)]
pub enum SessionAction {
    /// Write this packet back to the device immediately.
    Write(RawPacket),
    /// After the handshake ack, the bridge must wait and then send its own
    /// `0xA3`; the read loop schedules this.
    ScheduleWantToControl(Duration),
    /// After the bridge's own `0xA3` is acknowledged, schedule a mesh-info
    /// request.
    ScheduleMeshInfoRequest(Duration),
    SetState(SessionState),
    MarkReadyToControl,
    MeshInfoReceived(Vec<MeshDeviceInfo>),
    StatusReceived(StatusFrame),
    ControlAckReceived { msg_id: u8, success: bool },
    FirmwareVersionReceived(String),
}

/// Extract the generic header `msg_id` byte the device echoes for `0x43`
/// and `0x83` packets — full-packet offset 9, i.e. `payload[4]`.
fn header_msg_id(payload: &[u8]) -> u8 {
    payload.get(4).copied().unwrap_or(0)
}

pub fn on_packet(
    state: SessionState,
    queue_id: Option<[u8; 5]>,
    packet: RawPacket,
    checksum_policy: &mut ChecksumPolicy,
) -> Result<Vec<SessionAction>, SessionError> {
    let mut actions = Vec::new();

    match packet.packet_type {
        PacketType::Handshake => {
            if packet.payload.len() < 6 {
                return Err(SessionError::MissingQueueId);
            }
            let mut id = [0u8; 5];
            id.copy_from_slice(&packet.payload[1..6]);
            actions.push(Write(cync_wire::auth_ack()));
            actions.push(SessionAction::ScheduleWantToControl(WANT_TO_CONTROL_DELAY));
            actions.push(SessionAction::SetState(SessionState::Identified));
            let _ = id; // stored by the caller, who owns `self.queue_id`
        }
        PacketType::ConnectionRequest => {
            actions.push(Write(cync_wire::connection_ack()));
        }
        PacketType::Heartbeat => {
            actions.push(Write(cync_wire::ping_ack()));
        }
        PacketType::WantToControl => {
            // Inbound: a device or companion app wants to control. The
            // bridge's own outbound `0xA3` is driven separately by the
            // handshake schedule, not through this dispatch path.
            let msg_id = packet.payload.first().copied().unwrap_or(0);
            actions.push(Write(cync_wire::app_id_ack(msg_id)));
        }
        PacketType::AppId => {
            // No decode required beyond length tracking (§4.1).
        }
        PacketType::ControlAck => {
            // Ack of a prior `0x73` request; no action required.
        }
        PacketType::UnsolicitedInfo => {
            if packet.payload.len() >= 2 && packet.payload[..2] == TIMESTAMP_PREFIX {
                // Timestamp packet; nothing to reconcile.
            } else {
                for frame in parse_broadcast_status(&packet.payload) {
                    actions.push(SessionAction::StatusReceived(frame));
                }
            }
            actions.push(Write(ack_packet(
                PacketType::UnsolicitedInfo,
                vec![header_msg_id(&packet.payload), 0x00],
            )));
        }
        PacketType::Status => {
            if packet.payload.first() == Some(&0x00) {
                if let Some(version) = parse_unbound_firmware_version(&packet.payload) {
                    actions.push(SessionAction::FirmwareVersionReceived(version));
                }
            } else if let Some(inner) = InnerStruct::parse(&packet.payload)? {
                if !checksum_policy.accept(&inner) {
                    warn!("inner struct checksum mismatch on status packet, continuing parse");
                }
                if let Some(frame) = parse_internal_status(&inner) {
                    actions.push(SessionAction::StatusReceived(frame));
                }
            }
            actions.push(Write(ack_packet(
                PacketType::Status,
                vec![header_msg_id(&packet.payload), 0x00],
            )));
        }
        PacketType::ControlResponse => {
            if let Some(inner) = InnerStruct::parse(&packet.payload)? {
                if !checksum_policy.accept(&inner) {
                    warn!("inner struct checksum mismatch on control response, continuing parse");
                }
                match cync_wire::classify_control_response(&inner) {
                    ControlResponseKind::MeshInfo => {
                        let devices = parse_mesh_info(&packet.payload);
                        actions.push(SessionAction::MeshInfoReceived(devices));
                    }
                    ControlResponseKind::ControlAck => {
                        if let Some(ack) = cync_wire::parse_control_ack(&inner) {
                            actions.push(SessionAction::ControlAckReceived {
                                msg_id: ack.msg_id,
                                success: ack.success,
                            });
                        }
                    }
                    ControlResponseKind::FirmwareVersion => {
                        if let Some(version) = cync_wire::parse_firmware_version(&inner.bytes[7..]) {
                            actions.push(SessionAction::FirmwareVersionReceived(version));
                        }
                    }
                    ControlResponseKind::Unknown => {}
                }
                if let Some(queue_id) = queue_id {
                    let msg_id = inner.bytes.get(1).copied().unwrap_or(0);
                    actions.push(Write(cync_wire::x7b_ack(&queue_id, msg_id)));
                }
            }
        }
    }

    Ok(actions)
}
