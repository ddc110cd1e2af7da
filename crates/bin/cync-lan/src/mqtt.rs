use cync_commands::CommandQueue;
use cync_mqtt_bridge::bridge_discovery_messages;
use cync_mqtt_bridge::device_discovery_message;
use cync_mqtt_bridge::group_discovery_message;
use cync_mqtt_bridge::route_message;
use cync_mqtt_bridge::MqttBridgeConfig;
use cync_mqtt_bridge::RouterAction;
use cync_wire::build_mesh_info_request;
use mqtt_channel::Config;
use mqtt_channel::Connection;
use mqtt_channel::Message;
use mqtt_channel::Topic;
use mqtt_channel::TopicFilter;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use crate::connection::write_packet;
use crate::connection::SharedState;

/// Open the broker connection and subscribe, without yet running the
/// message loop. Split from [`drive`] so `main` can build the state
/// publisher from `connection.published` before the loop takes ownership
/// of the connection.
pub async fn connect(bridge_config: &MqttBridgeConfig) -> anyhow::Result<Connection> {
    let connected_topic = bridge_config.connected_topic();
    let last_will = Message::new(&Topic::from(connected_topic.as_str()), "offline").with_retain();

    let mut config = Config::new(bridge_config.host.clone(), bridge_config.port)
        .with_client_id(bridge_config.client_id())
        .with_last_will(last_will);
    if let Some((user, pass)) = &bridge_config.credentials {
        config = config.with_credentials(user.clone(), pass.clone());
    }

    let mut filter = TopicFilter::new(&format!("{}/set/#", bridge_config.cync_topic))?;
    filter.add(&format!("{}/status", bridge_config.hass_topic))?;

    let connection = Connection::connect("cync-lan", &config, filter).await?;
    info!("MQTT bridge connected");
    Ok(connection)
}

/// Publish discovery + birth, then drive inbound `${cync_topic}/set/...`
/// traffic into the command queue until shutdown (§4.5, §4.6, §6).
pub async fn drive(
    connection: Connection,
    bridge_config: MqttBridgeConfig,
    shared: SharedState,
    queue: CommandQueue,
    restart_tx: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let connected_topic = bridge_config.connected_topic();

    publish_discovery(&connection, &bridge_config, &shared).await;
    connection
        .published
        .send(Message::new(&Topic::from(connected_topic.as_str()), "online").with_retain())
        .await
        .ok();

    let mut received = connection.received;
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("MQTT loop shutting down");
                connection
                    .published
                    .send(Message::new(&Topic::from(connected_topic.as_str()), "offline").with_retain())
                    .await
                    .ok();
                return Ok(());
            }
            message = received.recv() => {
                let Ok(message) = message else {
                    warn!("MQTT receive channel closed");
                    return Ok(());
                };
                handle_message(&message, &bridge_config, &shared, &queue, &restart_tx).await;
            }
        }
    }
}

async fn handle_message(
    message: &Message,
    bridge_config: &MqttBridgeConfig,
    shared: &SharedState,
    queue: &CommandQueue,
    restart_tx: &watch::Sender<bool>,
) {
    match route_message(message, &bridge_config.cync_topic) {
        RouterAction::Enqueue(command) => {
            if queue.enqueue(command).is_err() {
                warn!("command queue worker has shut down, dropping command");
            }
        }
        RouterAction::BridgeRestart => {
            // "Emit restart signal" (§4.5): the process itself doesn't
            // restart in place. A supervisor (systemd, a container runtime)
            // is expected to relaunch it on exit, the same as on a fatal
            // error.
            info!("bridge restart requested over MQTT, initiating shutdown");
            restart_tx.send_replace(true);
        }
        RouterAction::BridgeRefreshStatus => {
            refresh_status(shared).await;
        }
        RouterAction::Forwarded | RouterAction::Ignored => {}
    }
}

async fn refresh_status(shared: &SharedState) {
    let packet = {
        let mut bridges = shared.bridges.write().await;
        let Ok(bridge) = bridges.first_ready() else {
            warn!("no ready bridge to refresh status from");
            return;
        };
        let addr = bridge.remote_addr;
        let Some(bridge) = bridges.get_mut(addr) else { return };
        let Some(queue_id) = bridge.queue_id else { return };
        let ctrl_id = bridge.next_ctrl_id();
        bridge.parse_mesh_status = true;
        (addr, build_mesh_info_request(&queue_id, ctrl_id))
    };
    let (addr, packet) = packet;
    if let Err(err) = write_packet(&shared.writers, addr, &packet.encode()).await {
        warn!(%addr, %err, "failed to send manual mesh-info refresh");
    }
}

async fn publish_discovery(connection: &Connection, bridge_config: &MqttBridgeConfig, shared: &SharedState) {
    let registry = shared.registry.read().await;

    for device in registry.devices() {
        let msg = device_discovery_message(&registry, device, &bridge_config.hass_topic, &bridge_config.cync_topic);
        connection.published.send(msg).await.ok();
    }
    for group in registry.groups() {
        let msg = group_discovery_message(
            &group.home_id,
            group.id,
            &group.name,
            &bridge_config.hass_topic,
            &bridge_config.cync_topic,
        );
        connection.published.send(msg).await.ok();
    }
    for msg in bridge_discovery_messages(&bridge_config.hass_topic, &bridge_config.cync_topic) {
        connection.published.send(msg).await.ok();
    }
}

/// Convenience re-export so `main` can build the publisher's naming tables
/// without reaching into `cync_mqtt_bridge` directly.
pub fn device_meta_tables(
    registry: &cync_model::Registry,
) -> (
    std::collections::HashMap<cync_model::DeviceId, cync_mqtt_bridge::DeviceMeta>,
    std::collections::HashMap<cync_model::GroupId, cync_model::HomeId>,
) {
    let device_meta = registry
        .devices()
        .map(|d| {
            (
                d.id,
                cync_mqtt_bridge::DeviceMeta {
                    home_id: d.home_id.clone(),
                    device_type: d.device_type,
                },
            )
        })
        .collect();
    let group_home_ids = registry.groups().map(|g| (g.id, g.home_id.clone())).collect();
    (device_meta, group_home_ids)
}
