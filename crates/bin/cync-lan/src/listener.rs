use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use openssl::ssl::SslAcceptor;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use crate::connection::handle_connection;
use crate::connection::SharedState;

/// A rejected connection sleeps here before the socket is dropped, to
/// dampen a flooding client rather than bounce it instantly (§5 "Resource
/// policy").
const BLACKHOLE_SLEEP: Duration = Duration::from_secs(2);

/// The accept loop (§5 "Tasks"): one per listening port, capped at
/// `max_tcp_conn` live bridges and gated by an optional IP whitelist.
pub async fn accept_loop(
    listener: TcpListener,
    acceptor: Arc<SslAcceptor>,
    shared: SharedState,
    max_tcp_conn: usize,
    ip_whitelist: Vec<IpAddr>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.changed() => {
                info!("accept loop shutting down");
                return;
            }
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(%err, "failed to accept TCP connection");
                    continue;
                }
            },
        };

        if !ip_whitelist.is_empty() && !ip_whitelist.contains(&addr.ip()) {
            warn!(%addr, "rejecting connection from address outside the IP whitelist");
            tokio::time::sleep(BLACKHOLE_SLEEP).await;
            drop(stream);
            continue;
        }

        if shared.bridges.read().await.len() >= max_tcp_conn {
            warn!(%addr, max_tcp_conn, "rejecting connection, bridge cap reached");
            tokio::time::sleep(BLACKHOLE_SLEEP).await;
            drop(stream);
            continue;
        }

        let acceptor = acceptor.clone();
        let shared = shared.clone();
        tokio::spawn(async move {
            handle_connection(stream, addr, acceptor, shared).await;
        });
    }
}
