use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("wire error: {0}")]
    Wire(#[from] cync_wire::WireError),
    #[error("handshake packet missing a 5-byte queue_id")]
    MissingQueueId,
    #[error("no bridge session registered for {0}")]
    UnknownBridge(SocketAddr),
    #[error("no ready bridge session is available")]
    NoReadyBridge,
}
