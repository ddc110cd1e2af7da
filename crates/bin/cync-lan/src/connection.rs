use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use cync_commands::PacketSink;
use cync_model::Registry;
use cync_reconcile::reconcile_mesh_info;
use cync_reconcile::reconcile_status;
use cync_session::BridgeSession;
use cync_session::BridgeTable;
use cync_session::CleanupAction;
use cync_session::SessionAction;
use cync_session::SessionError;
use cync_session::MESH_INFO_REQUEST_DELAY;
use cync_session::RETRY_INTERVAL;
use cync_wire::build_mesh_info_request;
use cync_wire::FrameCodec;
use cync_wire::RawPacket;
use futures::StreamExt;
use openssl::ssl::Ssl;
use openssl::ssl::SslAcceptor;
use tokio::io::AsyncWriteExt;
use tokio::io::ReadHalf;
use tokio::io::WriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio_openssl::SslStream;
use tokio_util::codec::FramedRead;
use tracing::debug;
use tracing::info;
use tracing::warn;

type TlsStream = SslStream<TcpStream>;
type Writer = WriteHalf<TlsStream>;

/// Outstanding write half for every live bridge session, keyed by remote
/// address (§5: "a write holds the session's write lock for its entire
/// duration including drain").
#[derive(Default, Clone)]
pub struct WriteHandles {
    writers: Arc<RwLock<HashMap<SocketAddr, Arc<Mutex<Writer>>>>>,
}

impl WriteHandles {
    async fn insert(&self, addr: SocketAddr, writer: Writer) {
        self.writers.write().await.insert(addr, Arc::new(Mutex::new(writer)));
    }

    async fn remove(&self, addr: SocketAddr) {
        self.writers.write().await.remove(&addr);
    }

    async fn get(&self, addr: SocketAddr) -> Option<Arc<Mutex<Writer>>> {
        self.writers.read().await.get(&addr).cloned()
    }
}

/// The executor's handoff to live TLS connections (§4.3 `PacketSink`).
pub struct TlsPacketSink {
    writers: WriteHandles,
}

impl TlsPacketSink {
    pub fn new(writers: WriteHandles) -> Self {
        TlsPacketSink { writers }
    }
}

#[async_trait::async_trait]
impl PacketSink for TlsPacketSink {
    async fn send_packet(&self, addr: SocketAddr, packet: RawPacket) -> Result<(), SessionError> {
        write_packet(&self.writers, addr, &packet.encode()).await
    }
}

pub(crate) async fn write_packet(writers: &WriteHandles, addr: SocketAddr, bytes: &[u8]) -> Result<(), SessionError> {
    let Some(writer) = writers.get(addr).await else {
        return Err(SessionError::UnknownBridge(addr));
    };
    let mut writer = writer.lock().await;
    writer.write_all(bytes).await.map_err(|_| SessionError::UnknownBridge(addr))?;
    writer.flush().await.map_err(|_| SessionError::UnknownBridge(addr))
}

/// Shared state every connection task needs (§9: pass a context handle
/// explicitly rather than reach through a hidden singleton).
#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<RwLock<Registry>>,
    pub bridges: Arc<RwLock<BridgeTable>>,
    pub publisher: Arc<dyn cync_commands::StatePublisher>,
    pub writers: WriteHandles,
}

/// Accept one TCP connection, perform the TLS handshake, and run its read
/// loop and callback-cleanup loop until EOF or cancellation (§5 "Tasks").
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, acceptor: Arc<SslAcceptor>, shared: SharedState) {
    let ssl = match Ssl::new(acceptor.context()) {
        Ok(ssl) => ssl,
        Err(err) => {
            warn!(%addr, %err, "failed to build TLS session");
            return;
        }
    };
    let mut tls_stream = match SslStream::new(ssl, stream) {
        Ok(s) => s,
        Err(err) => {
            warn!(%addr, %err, "failed to wrap TCP stream in TLS");
            return;
        }
    };
    if let Err(err) = Pin::new(&mut tls_stream).accept().await {
        warn!(%addr, %err, "TLS handshake failed");
        return;
    }

    let (read_half, write_half) = tokio::io::split(tls_stream);
    shared.writers.insert(addr, write_half).await;
    shared.bridges.write().await.insert(BridgeSession::new(addr));
    info!(%addr, "bridge connected");

    let cleanup = tokio::spawn(cleanup_loop(addr, shared.bridges.clone(), shared.writers.clone()));

    read_loop(read_half, addr, shared.clone()).await;

    cleanup.abort();
    shared.bridges.write().await.remove(addr);
    shared.writers.remove(addr).await;
    info!(%addr, "bridge disconnected");
}

async fn read_loop(read_half: ReadHalf<TlsStream>, addr: SocketAddr, shared: SharedState) {
    let mut frames = FramedRead::new(read_half, FrameCodec);

    while let Some(result) = frames.next().await {
        let packet = match result {
            Ok(packet) => packet,
            Err(err) => {
                warn!(%addr, %err, "protocol error, continuing");
                continue;
            }
        };

        let actions = {
            let mut bridges = shared.bridges.write().await;
            let Some(session) = bridges.get_mut(addr) else { break };
            match session.handle_packet(packet) {
                Ok(actions) => actions,
                Err(err) => {
                    warn!(%addr, %err, "packet dispatch failed, continuing");
                    continue;
                }
            }
        };

        for action in actions {
            apply_action(action, addr, &shared).await;
        }
    }
}

async fn apply_action(action: SessionAction, addr: SocketAddr, shared: &SharedState) {
    match action {
        SessionAction::Write(packet) => {
            if let Err(err) = write_packet(&shared.writers, addr, &packet.encode()).await {
                warn!(%addr, %err, "failed to write response packet");
            }
        }
        SessionAction::ScheduleWantToControl(delay) => {
            let shared = shared.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                send_want_to_control(addr, &shared).await;
            });
        }
        SessionAction::ScheduleMeshInfoRequest(delay) => {
            let shared = shared.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                send_mesh_info_request(addr, &shared, true).await;
            });
        }
        SessionAction::SetState(_) | SessionAction::MarkReadyToControl => {
            // Already applied inside `BridgeSession::handle_packet`.
        }
        SessionAction::MeshInfoReceived(devices) => {
            let parse_this_one = {
                let mut bridges = shared.bridges.write().await;
                let Some(session) = bridges.get_mut(addr) else { return };
                let parse = session.parse_mesh_status;
                session.parse_mesh_status = false;
                parse
            };
            if parse_this_one && shared.bridges.read().await.is_primary(addr) {
                reconcile_mesh_info(&mut *shared.registry.write().await, shared.publisher.as_ref(), devices);
            }
        }
        SessionAction::StatusReceived(frame) => {
            if shared.bridges.read().await.is_primary(addr) {
                reconcile_status(&mut *shared.registry.write().await, shared.publisher.as_ref(), frame, "bridge read loop");
            } else {
                debug!(%addr, "status from non-primary bridge suppressed");
            }
        }
        SessionAction::ControlAckReceived { msg_id, success } => {
            let mut bridges = shared.bridges.write().await;
            if let Some(session) = bridges.get_mut(addr) {
                session.pending_controls.complete(msg_id, success).await;
            }
        }
        SessionAction::FirmwareVersionReceived(version) => {
            // No device id travels with this action; the wire format
            // doesn't disambiguate the bridge's own firmware from a bound
            // device's (§9). Logged for now; see DESIGN.md.
            info!(%addr, version, "firmware version reported");
        }
    }
}

/// Build and send the bridge's own `0xA3`, then schedule the mesh-info
/// follow-up (§4.2, §8 scenario 2).
async fn send_want_to_control(addr: SocketAddr, shared: &SharedState) {
    let packet = {
        let bridges = shared.bridges.read().await;
        bridges.get(addr).and_then(|session| session.build_want_to_control())
    };
    let Some(packet) = packet else { return };
    if let Err(err) = write_packet(&shared.writers, addr, &packet.encode()).await {
        warn!(%addr, %err, "failed to send want-to-control");
        return;
    }

    let shared = shared.clone();
    tokio::spawn(async move {
        tokio::time::sleep(MESH_INFO_REQUEST_DELAY).await;
        send_mesh_info_request(addr, &shared, false).await;
    });
}

async fn send_mesh_info_request(addr: SocketAddr, shared: &SharedState, parse_next_reply: bool) {
    let packet = {
        let mut bridges = shared.bridges.write().await;
        let Some(session) = bridges.get_mut(addr) else { return };
        session.ready_to_control = true;
        session.parse_mesh_status = parse_next_reply || session.parse_mesh_status;
        let Some(queue_id) = session.queue_id else { return };
        let ctrl_id = session.next_ctrl_id();
        build_mesh_info_request(&queue_id, ctrl_id)
    };
    if let Err(err) = write_packet(&shared.writers, addr, &packet.encode()).await {
        warn!(%addr, %err, "failed to send mesh-info request");
    }
}

/// The per-bridge callback-cleanup loop (§4.2, §5): resends unacknowledged
/// controls on a fixed interval and expires anything older than
/// [`cync_session::MAX_AGE`].
async fn cleanup_loop(addr: SocketAddr, bridges: Arc<RwLock<BridgeTable>>, writers: WriteHandles) {
    loop {
        tokio::time::sleep(RETRY_INTERVAL).await;

        let actions = {
            let mut bridges = bridges.write().await;
            let Some(session) = bridges.get_mut(addr) else { return };
            // MAX_AGE (30s) / RETRY_INTERVAL (500ms); retries stop being
            // capped well before the age-based expiry takes over.
            let max_retries = (cync_session::MAX_AGE.as_millis() / cync_session::RETRY_INTERVAL.as_millis()) as u32;
            session.pending_controls.tick(max_retries, Instant::now())
        };

        for action in actions {
            match action {
                CleanupAction::Resend(payload) => {
                    if let Err(err) = write_packet(&writers, addr, &payload).await {
                        warn!(%addr, %err, "failed to resend pending control");
                    }
                }
                CleanupAction::Expired(entry) => {
                    entry.ack.set(false).await;
                }
            }
        }
    }
}
