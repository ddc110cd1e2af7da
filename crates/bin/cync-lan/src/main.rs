//! Entry point for the LAN bridge: terminates TLS from Cync Wi-Fi bridges,
//! tracks device/group state in a shared registry, and mirrors it onto MQTT
//! for Home Assistant discovery and control.

use std::net::SocketAddr;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use cync_commands::CommandContext;
use cync_commands::CommandQueue;
use cync_commands::StatePublisher;
use cync_model::Registry;
use cync_mqtt_bridge::MqttStatePublisher;
use cync_session::BridgeTable;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::sync::RwLock;
use tracing::error;
use tracing::info;
use tracing::warn;

mod config;
mod connection;
mod listener;
mod mqtt;
mod tls;

use config::CyncLanConfig;
use connection::SharedState;
use connection::TlsPacketSink;
use connection::WriteHandles;

fn default_config_path() -> &'static str {
    "/etc/cync-lan/config.toml"
}

#[derive(Debug, Clone, clap::Parser)]
#[clap(
    name = clap::crate_name!(),
    version = clap::crate_version!(),
    about = clap::crate_description!()
)]
struct CyncLanOpt {
    /// Turn on the debug log level.
    ///
    /// If off only reports ERROR, WARN, and INFO.
    #[clap(long)]
    debug: bool,

    /// Path to the TOML configuration file.
    #[clap(long = "config", default_value = default_config_path())]
    config_path: Utf8PathBuf,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!("cync_lan={level},cync_session={level},cync_commands={level},cync_reconcile={level},cync_mqtt_bridge={level},cync_wire={level}")))
        .init();
}

fn seed_registry(config: &CyncLanConfig) -> anyhow::Result<Registry> {
    let mut registry = Registry::new();
    for seed in &config.devices {
        let mut device = cync_model::Device::new(seed.id, seed.home_id.clone(), seed.device_type.into(), &seed.name);
        device.mac = seed.mac.clone();
        device.wifi_mac = seed.wifi_mac.clone();
        device.bt_only = seed.bt_only;
        registry
            .insert_device(device)
            .map_err(|err| anyhow::anyhow!("duplicate device {} in config: {err}", seed.id))?;
    }
    for seed in &config.groups {
        let mut group = cync_model::Group::new(seed.id, seed.home_id.clone(), &seed.name);
        group.is_subgroup = seed.is_subgroup;
        group.member_ids = seed.member_ids.clone();
        registry
            .insert_group(group)
            .map_err(|err| anyhow::anyhow!("duplicate group {} in config: {err}", seed.id))?;
    }
    for seed in &config.groups {
        if seed.is_subgroup {
            registry.reaggregate_subgroup(seed.id).ok();
        }
    }
    Ok(registry)
}

/// Periodically logs the pool's shape: live bridges, total devices (§5
/// "diagnostic timers").
async fn pool_monitor_loop(registry: Arc<RwLock<Registry>>, bridges: Arc<RwLock<BridgeTable>>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
    loop {
        interval.tick().await;
        let bridge_count = bridges.read().await.len();
        let device_count = registry.read().await.devices().count();
        info!(bridge_count, device_count, "pool status");
    }
}

/// Optional periodic mesh-info refresh across all ready bridges, disabled
/// unless configured (§5, §9 "leave periodic refresh behind a config flag").
async fn periodic_mesh_refresh_loop(bridges: Arc<RwLock<BridgeTable>>, writers: WriteHandles, period_secs: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(period_secs));
    loop {
        interval.tick().await;
        let packet = {
            let mut bridges = bridges.write().await;
            let Ok(bridge) = bridges.first_ready() else { continue };
            let addr = bridge.remote_addr;
            let Some(bridge) = bridges.get_mut(addr) else { continue };
            let Some(queue_id) = bridge.queue_id else { continue };
            let ctrl_id = bridge.next_ctrl_id();
            bridge.parse_mesh_status = true;
            (addr, cync_wire::build_mesh_info_request(&queue_id, ctrl_id))
        };
        let (addr, packet) = packet;
        if let Err(err) = connection::write_packet(&writers, addr, &packet.encode()).await {
            warn!(%addr, %err, "periodic mesh refresh failed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = CyncLanOpt::parse();
    init_logging(opt.debug);

    let content = std::fs::read_to_string(&opt.config_path)
        .map_err(|err| anyhow::anyhow!("failed to read {}: {err}", opt.config_path))?;
    let config = CyncLanConfig::from_toml_str(&content)?;

    let registry = Arc::new(RwLock::new(seed_registry(&config)?));
    let bridges = Arc::new(RwLock::new(BridgeTable::new()));
    let writers = WriteHandles::default();

    let (device_meta, group_home_ids) = mqtt::device_meta_tables(&*registry.read().await);

    let bridge_config = config.mqtt.to_bridge_config();
    let mqtt_connection = mqtt::connect(&bridge_config).await?;
    let publisher: Arc<dyn StatePublisher> = Arc::new(MqttStatePublisher::new(
        bridge_config.cync_topic.clone(),
        mqtt_connection.published.clone(),
        device_meta,
        group_home_ids,
    ));

    let sink = Arc::new(TlsPacketSink::new(writers.clone()));
    let shared = SharedState {
        registry: registry.clone(),
        bridges: bridges.clone(),
        publisher: publisher.clone(),
        writers: writers.clone(),
    };

    let (queue, receiver) = CommandQueue::new();
    let ctx = CommandContext::new(registry.clone(), bridges.clone(), publisher, sink);
    let worker = tokio::spawn(cync_commands::run_worker(receiver, ctx));

    let acceptor = Arc::new(tls::build_acceptor(config.tls_cert_path.as_ref(), config.tls_key_path.as_ref())?);
    let listen_addr: SocketAddr = format!("{}:{}", config.listen_host, config.listen_port)
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid listen address: {err}"))?;
    let tcp_listener = TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "listening for bridge connections");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let accept_task = tokio::spawn(listener::accept_loop(
        tcp_listener,
        acceptor,
        shared.clone(),
        config.max_tcp_conn,
        config.ip_whitelist.clone(),
        shutdown_rx.clone(),
    ));

    let pool_monitor = tokio::spawn(pool_monitor_loop(registry.clone(), bridges.clone()));

    let mesh_refresh_task = config.periodic_mesh_refresh_secs.map(|secs| {
        tokio::spawn(periodic_mesh_refresh_loop(bridges.clone(), writers.clone(), secs))
    });

    let mqtt_task = tokio::spawn(mqtt::drive(
        mqtt_connection,
        bridge_config,
        shared,
        queue,
        shutdown_tx.clone(),
        shutdown_rx.clone(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(%err, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
        }
        _ = wait_for_restart(shutdown_rx.clone()) => {
            info!("restart requested over MQTT");
        }
    }

    shutdown_tx.send_replace(true);
    accept_task.abort();
    pool_monitor.abort();
    if let Some(task) = mesh_refresh_task {
        task.abort();
    }
    worker.abort();
    let _ = mqtt_task.await;

    Ok(())
}

async fn wait_for_restart(mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
