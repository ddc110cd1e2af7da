use std::collections::HashSet;
use std::net::SocketAddr;

use cync_model::ControlByteCounter;
use cync_model::DeviceId;
use cync_wire::ChecksumPolicy;
use cync_wire::MeshDeviceInfo;
use cync_wire::RawPacket;

use crate::dispatch::on_packet;
use crate::PendingTable;
use crate::SessionAction;
use crate::SessionError;
use crate::SessionState;

/// A single TCP connection from a device (§3 "Bridge session").
pub struct BridgeSession {
    pub remote_addr: SocketAddr,
    pub queue_id: Option<[u8; 5]>,
    pub state: SessionState,
    pub known_device_ids: HashSet<DeviceId>,
    pub ready_to_control: bool,
    pub mesh_info: Option<Vec<MeshDeviceInfo>>,
    /// Next mesh-info response seen on this bridge should update the state
    /// store, rather than just being logged (§3).
    pub parse_mesh_status: bool,
    pub pending_controls: PendingTable,
    pub checksum_policy: ChecksumPolicy,
    control_counter: ControlByteCounter,
}

impl BridgeSession {
    pub fn new(remote_addr: SocketAddr) -> Self {
        BridgeSession {
            remote_addr,
            queue_id: None,
            state: SessionState::Accepted,
            known_device_ids: HashSet::new(),
            ready_to_control: false,
            mesh_info: None,
            parse_mesh_status: false,
            pending_controls: PendingTable::new(),
            checksum_policy: ChecksumPolicy::new(),
            control_counter: ControlByteCounter::new(),
        }
    }

    pub fn next_ctrl_id(&mut self) -> u8 {
        self.control_counter.next()
    }

    /// Dispatch one inbound packet, updating local session state (queue_id,
    /// FSM state) as a side effect, and returning the actions the read loop
    /// must still perform (writes, scheduled follow-ups, handoffs to the
    /// reconciliation/command layers).
    pub fn handle_packet(&mut self, packet: RawPacket) -> Result<Vec<SessionAction>, SessionError> {
        if packet.packet_type == cync_wire::PacketType::Handshake && packet.payload.len() >= 6 {
            let mut id = [0u8; 5];
            id.copy_from_slice(&packet.payload[1..6]);
            self.queue_id = Some(id);
        }

        let actions = on_packet(self.state, self.queue_id, packet, &mut self.checksum_policy)?;

        for action in &actions {
            match action {
                SessionAction::SetState(state) => self.state = *state,
                SessionAction::MarkReadyToControl => self.ready_to_control = true,
                SessionAction::MeshInfoReceived(devices) => {
                    self.mesh_info = Some(devices.clone());
                    self.known_device_ids = devices.iter().map(|d| d.device_id).collect();
                    self.state = SessionState::MeshKnown;
                }
                _ => {}
            }
        }

        Ok(actions)
    }

    /// Build the bridge's own outbound `0xA3`, using a fresh random 2-byte
    /// message id (§4.2 "send `0xA3` with random 2-byte message ID").
    pub fn build_want_to_control(&self) -> Option<RawPacket> {
        let queue_id = self.queue_id?;
        let msg_id: [u8; 2] = rand::random();
        Some(cync_wire::want_to_control(&queue_id, msg_id))
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.ready_to_control = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_stores_queue_id_and_advances_state() {
        let mut session = BridgeSession::new("127.0.0.1:1234".parse().unwrap());
        let mut payload = vec![0u8; 26];
        payload[1..6].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
        let packet = RawPacket::new(cync_wire::PacketType::Handshake, payload);

        session.handle_packet(packet).unwrap();

        assert_eq!(session.queue_id, Some([0xAA, 0xBB, 0xCC, 0xDD, 0xEE]));
        assert_eq!(session.state, SessionState::Identified);
    }

    #[test]
    fn build_want_to_control_requires_queue_id() {
        let session = BridgeSession::new("127.0.0.1:1234".parse().unwrap());
        assert!(session.build_want_to_control().is_none());
    }
}
