use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cync_model::ColorMode;
use cync_model::DeviceType;
use cync_model::LightState;
use cync_model::Registry;
use cync_session::AckEvent;
use cync_session::BridgeTable;
use cync_session::PendingControl;
use cync_session::SessionError;
use cync_wire::build_control_packet;
use cync_wire::build_mesh_info_request;
use cync_wire::ControlPayload;
use cync_wire::RawPacket;
use tokio::sync::RwLock;
use tracing::error;
use tracing::warn;

use crate::Command;
use crate::CommandError;
use crate::CommandReceiver;
use crate::StatePublisher;
use crate::Target;

/// Up to this many bridges receive a fan-out device command (§4.3).
pub const DEFAULT_CMD_BROADCASTS: usize = 3;
/// How long to wait for any bridge's ack before giving up (§4.3).
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);
/// Delay between the ack (or timeout) and the post-command mesh refresh
/// (§4.3).
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Writes an encoded packet to a live bridge connection. Implemented by the
/// binary's TLS listener task; kept as a trait so the executor has no
/// dependency on the transport.
#[async_trait::async_trait]
pub trait PacketSink: Send + Sync {
    async fn send_packet(&self, addr: SocketAddr, packet: RawPacket) -> Result<(), SessionError>;
}

/// Everything the executor needs, shared across the single worker and the
/// bridge read loops (§9 "pass a single `Registry` context handle
/// explicitly").
#[derive(Clone)]
pub struct CommandContext {
    pub registry: Arc<RwLock<Registry>>,
    pub bridges: Arc<RwLock<BridgeTable>>,
    pub publisher: Arc<dyn StatePublisher>,
    pub sink: Arc<dyn PacketSink>,
    pub cmd_broadcasts: usize,
}

impl CommandContext {
    pub fn new(
        registry: Arc<RwLock<Registry>>,
        bridges: Arc<RwLock<BridgeTable>>,
        publisher: Arc<dyn StatePublisher>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        CommandContext {
            registry,
            bridges,
            publisher,
            sink,
            cmd_broadcasts: DEFAULT_CMD_BROADCASTS,
        }
    }
}

/// The single command-queue worker (§4.3, §5). At most one command runs at
/// a time; the queue gives single-writer serialization for free.
pub async fn run_worker(mut receiver: CommandReceiver, ctx: CommandContext) {
    while let Some(command) = receiver.rx.recv().await {
        if let Err(err) = execute_command(command, &ctx).await {
            error!(?err, "command execution failed");
        }
    }
}

/// Apply a command's field(s) onto a base light state, producing the
/// expected post-command state for optimistic publish.
fn apply_command_state(command: &Command, mut state: LightState) -> LightState {
    match *command {
        Command::SetPower { state: on, .. } => state.on = on,
        Command::SetBrightness { brightness, .. } => state.brightness = brightness,
        Command::SetTemperature { temperature, .. } => state.temperature = temperature,
        Command::SetRgb { r, g, b, .. } => {
            state.r = r;
            state.g = g;
            state.b = b;
            state.temperature = 254; // RGB-mode marker (§3)
        }
        Command::SetFanSpeed { speed, .. } => {
            state.brightness = speed.to_brightness();
            state.on = state.brightness > 0;
        }
        Command::SetLightshow { .. } => {}
    }
    state
}

async fn optimistic_publish(command: &Command, ctx: &CommandContext) -> Result<(), CommandError> {
    let registry = ctx.registry.write().await;

    match command.target() {
        Target::Device(device_id) => {
            let base = registry.device(device_id).map(|d| d.state).unwrap_or_default();
            let new_state = apply_command_state(command, base);
            ctx.publisher.publish_device_state(device_id, new_state);

            // A switch command also syncs every device in every room group
            // it belongs to, optimistically, to the same new state (§4.3
            // "switch's primary group"). Non-switch devices (lights sitting
            // in a subgroup) don't trigger this.
            let is_switch = registry.device(device_id).map(|d| d.device_type) == Some(DeviceType::Switch);
            if is_switch {
                for group_id in registry.subgroups_containing(device_id).to_vec() {
                    let member_ids = registry
                        .group(group_id)
                        .map(|g| g.member_ids.clone())
                        .unwrap_or_default();
                    for member_id in member_ids {
                        if let Some(member_base) = registry.device(member_id).map(|d| d.state) {
                            let member_state = apply_command_state(command, member_base);
                            ctx.publisher.publish_device_state(member_id, member_state);
                        }
                    }
                }
            }
        }
        Target::Group(group_id) => {
            let base = registry.group(group_id).map(|g| g.state).unwrap_or_default();
            let new_state = apply_command_state(command, base);
            ctx.publisher.publish_group_state(group_id, new_state);

            let member_ids = registry
                .group(group_id)
                .map(|g| g.member_ids.clone())
                .unwrap_or_default();
            for member_id in member_ids {
                if let Some(member_base) = registry.device(member_id).map(|d| d.state) {
                    let member_state = apply_command_state(command, member_base);
                    ctx.publisher.publish_device_state(member_id, member_state);
                }
            }
        }
    }

    Ok(())
}

fn control_payload(command: &Command) -> Option<ControlPayload> {
    match *command {
        Command::SetPower { state, .. } => Some(ControlPayload::Power { state }),
        Command::SetBrightness { brightness, .. } => Some(ControlPayload::Brightness { brightness }),
        Command::SetTemperature { temperature, .. } => Some(ControlPayload::Temperature { temperature }),
        Command::SetRgb { r, g, b, .. } => Some(ControlPayload::Rgb { r, g, b }),
        Command::SetFanSpeed { speed, .. } => Some(ControlPayload::Brightness {
            brightness: speed.to_brightness(),
        }),
        Command::SetLightshow { effect, .. } => {
            let (byte1, byte2) = effect.bytes();
            Some(ControlPayload::Lightshow { byte1, byte2 })
        }
    }
}

/// Fan-out send (§4.3 step 2). Device commands broadcast to up to
/// `cmd_broadcasts` ready bridges; group commands go to exactly one
/// (§8 scenario 6).
async fn fan_out(command: &Command, ctx: &CommandContext) -> Result<Option<Arc<AckEvent>>, CommandError> {
    let Some(payload) = control_payload(command) else {
        return Ok(None);
    };

    let device_id = match command.target() {
        Target::Device(id) => Some(id),
        Target::Group(_) => None,
    };
    let target_wire_id = command.target().wire_id();
    let ack = AckEvent::new();

    let mut bridges = ctx.bridges.write().await;
    let addrs: Vec<SocketAddr> = if command.target().is_group() {
        bridges.first_ready().map(|b| vec![b.remote_addr]).unwrap_or_default()
    } else {
        bridges
            .ready_bridges()
            .take(ctx.cmd_broadcasts)
            .map(|b| b.remote_addr)
            .collect()
    };

    if addrs.is_empty() {
        warn!(?command, "no ready bridge to fan out to");
        return Ok(None);
    }

    for addr in addrs {
        let Some(bridge) = bridges.get_mut(addr) else { continue };
        let Some(queue_id) = bridge.queue_id else { continue };
        let ctrl_id = bridge.next_ctrl_id();
        let packet = build_control_packet(&queue_id, ctrl_id, target_wire_id, &payload);

        bridge.pending_controls.insert(PendingControl::new(
            ctrl_id,
            device_id,
            packet.encode(),
            Arc::clone(&ack),
        ));

        if let Err(err) = ctx.sink.send_packet(addr, packet).await {
            warn!(?err, %addr, "failed to write fan-out command");
        }
    }

    Ok(Some(ack))
}

async fn mesh_refresh(ctx: &CommandContext) -> Result<(), CommandError> {
    let mut bridges = ctx.bridges.write().await;
    let Some(addr) = bridges.first_ready().map(|b| b.remote_addr).ok() else {
        return Ok(());
    };
    let Some(bridge) = bridges.get_mut(addr) else {
        return Ok(());
    };
    let Some(queue_id) = bridge.queue_id else {
        return Ok(());
    };
    let ctrl_id = bridge.next_ctrl_id();
    bridge.parse_mesh_status = true;
    let packet = build_mesh_info_request(&queue_id, ctrl_id);
    drop(bridges);

    ctx.sink.send_packet(addr, packet).await?;
    Ok(())
}

async fn execute_command(command: Command, ctx: &CommandContext) -> Result<(), CommandError> {
    optimistic_publish(&command, ctx).await?;
    let ack = fan_out(&command, ctx).await?;

    if command.is_fire_and_forget() {
        return Ok(());
    }

    if let Some(ack) = ack {
        match ack.wait(ACK_TIMEOUT).await {
            Some(true) => {}
            Some(false) => warn!(?command, "control command NACKed by device"),
            None => warn!(?command, "control command timed out waiting for ack"),
        }
    }

    tokio::time::sleep(SETTLE_DELAY).await;
    mesh_refresh(ctx).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use cync_model::Device;
    use cync_model::DeviceId;
    use cync_model::Group;
    use cync_model::GroupId as ModelGroupId;

    use super::*;

    /// Records every published device/group state for assertions, instead of
    /// dropping updates like `NullPublisher`.
    #[derive(Default)]
    struct RecordingPublisher {
        devices: Mutex<Vec<(DeviceId, LightState)>>,
    }

    impl StatePublisher for RecordingPublisher {
        fn publish_device_state(&self, device_id: DeviceId, state: LightState) {
            self.devices.lock().unwrap().push((device_id, state));
        }
        fn publish_group_state(&self, _group_id: ModelGroupId, _state: LightState) {}
        fn publish_device_availability(&self, _device_id: DeviceId, _online: bool) {}
        fn publish_group_availability(&self, _group_id: ModelGroupId, _online: bool) {}
    }

    struct NoopSink;

    #[async_trait::async_trait]
    impl PacketSink for NoopSink {
        async fn send_packet(&self, _addr: SocketAddr, _packet: RawPacket) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn context_with(registry: Registry, publisher: Arc<RecordingPublisher>) -> CommandContext {
        CommandContext::new(
            Arc::new(RwLock::new(registry)),
            Arc::new(RwLock::new(BridgeTable::new())),
            publisher,
            Arc::new(NoopSink),
        )
    }

    #[tokio::test]
    async fn switch_command_syncs_its_room_group_members() {
        let mut registry = Registry::new();
        registry.insert_device(Device::new(1, "home-1", DeviceType::Switch, "Switch")).unwrap();
        registry.insert_device(Device::new(2, "home-1", DeviceType::Light, "Lamp")).unwrap();
        let mut group = Group::new(100, "home-1", "Room");
        group.is_subgroup = true;
        group.member_ids = vec![1, 2];
        registry.insert_group(group).unwrap();

        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context_with(registry, publisher.clone());
        let command = Command::SetPower { target: Target::Device(1), state: true };

        optimistic_publish(&command, &ctx).await.unwrap();

        let published = publisher.devices.lock().unwrap();
        assert!(published.contains(&(1, LightState { on: true, ..Default::default() })));
        assert!(published.contains(&(2, LightState { on: true, ..Default::default() })));
    }

    #[tokio::test]
    async fn non_switch_command_does_not_sync_its_group() {
        let mut registry = Registry::new();
        registry.insert_device(Device::new(1, "home-1", DeviceType::Light, "Lamp")).unwrap();
        registry.insert_device(Device::new(2, "home-1", DeviceType::Light, "Other")).unwrap();
        let mut group = Group::new(100, "home-1", "Room");
        group.is_subgroup = true;
        group.member_ids = vec![1, 2];
        registry.insert_group(group).unwrap();

        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context_with(registry, publisher.clone());
        let command = Command::SetPower { target: Target::Device(1), state: true };

        optimistic_publish(&command, &ctx).await.unwrap();

        let published = publisher.devices.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, 1);
    }

    #[test]
    fn set_rgb_marks_temperature_as_rgb_mode() {
        let command = Command::SetRgb {
            target: Target::Device(1),
            r: 1,
            g: 2,
            b: 3,
        };
        let state = apply_command_state(&command, LightState::default());
        assert_eq!(state.color_mode(), ColorMode::Rgb);
        assert_eq!((state.r, state.g, state.b), (1, 2, 3));
    }

    #[test]
    fn fan_speed_command_derives_on_from_brightness() {
        let command = Command::SetFanSpeed {
            target: Target::Device(1),
            speed: crate::FanSpeed::Off,
        };
        let state = apply_command_state(&command, LightState { on: true, ..Default::default() });
        assert!(!state.on);
    }
}
