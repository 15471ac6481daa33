//! TCP message server
//!
//! Handles one peer at a time: accept, read one message, classify it
//! through the gate, reply, close. A failing listener ends the loop; errors
//! on a single connection are logged and the next peer is accepted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{GuardError, Result};
use crate::gate::AdmissionGate;

pub struct MessageServer {
    listener: TcpListener,
    gate: AdmissionGate,
    recv_buffer: usize,
    io_timeout: Duration,
}

impl MessageServer {
    /// Bind the listening socket
    pub async fn bind(config: &ServerConfig, gate: AdmissionGate) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GuardError::Bind { addr, source })?;

        info!("TCP server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            gate,
            recv_buffer: config.recv_buffer,
            io_timeout: Duration::from_millis(config.io_timeout_ms),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve peers sequentially until accept fails
    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    return Err(GuardError::Accept(e));
                }
            };

            info!("New TCP connection from {}", peer);
            if let Err(e) = self.handle_connection(stream, peer).await {
                warn!("Connection from {} failed: {}", peer, e);
            }
            debug!("TCP connection from {} closed", peer);
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let Some(ip) = peer_ipv4(peer) else {
            warn!("Ignoring non-IPv4 peer {}", peer);
            return Ok(());
        };

        let mut buf = vec![0u8; self.recv_buffer - 1];
        let len = match timeout(self.io_timeout, stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => {
                warn!("Receive from {} timed out", peer);
                return Ok(());
            }
        };

        if len == 0 {
            info!("Connection closed by client {}", peer);
            return Ok(());
        }

        // Payload ends at the first NUL; invalid UTF-8 is replaced, not echoed raw
        let end = buf[..len].iter().position(|&b| b == 0).unwrap_or(len);
        let payload = String::from_utf8_lossy(&buf[..end]);
        let verdict = self.gate.handle_message(ip, &payload);

        match timeout(self.io_timeout, stream.write_all(verdict.reply().as_bytes())).await {
            Ok(written) => written?,
            Err(_) => warn!("Send to {} timed out", peer),
        }
        debug!("Reply sent to {}: {}", peer, verdict.reply());

        // Peer may already be gone
        let _ = stream.shutdown().await;
        Ok(())
    }
}

/// IPv4 address of a peer, unwrapping IPv4-mapped IPv6
pub fn peer_ipv4(peer: SocketAddr) -> Option<Ipv4Addr> {
    match peer.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}
