//! Single bound UDP endpoint (spec §4.B). Sends are best-effort; there is
//! no fragmentation, reassembly, or retry anywhere in this layer.

use std::net::SocketAddr;

use color_eyre::Result;
use color_eyre::eyre::Context;
use tokio::net::UdpSocket;
use tracing::warn;

const MAX_DATAGRAM: usize = 2048;

pub struct Transport {
    socket: UdpSocket,
}

pub struct Session {
    pub slot: u32,
    pub addr: SocketAddr,
}

impl Transport {
    pub async fn bind(port: u16) -> Result<Transport> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .wrap_err_with(|| format!("binding UDP socket on port {port}"))?;
        Ok(Transport { socket })
    }

    /// Blocks until a datagram arrives, returning its source address and
    /// raw bytes. Demultiplexing by opcode happens upstream in `dispatch`.
    pub async fn recv(&self, buf: &mut [u8; MAX_DATAGRAM]) -> Result<(SocketAddr, usize)> {
        let (n, addr) = self.socket.recv_from(buf).await.wrap_err("receiving UDP datagram")?;
        Ok((addr, n))
    }

    /// Idempotent send-to-address: fires a single best-effort datagram at
    /// an address the caller already resolved (typically via the identity
    /// cache's slot → address entry).
    pub async fn send_to(&self, addr: SocketAddr, bytes: &[u8]) {
        if let Err(e) = self.socket.send_to(bytes, addr).await {
            warn!(%addr, error = %e, "send_to failed, dropping");
        }
    }

    /// Fans a frame out to every session in the roster except (optionally)
    /// one excluded slot. Not atomic: each send is independent and a
    /// partial failure is logged, never surfaced as an operation error
    /// (spec §5 "Broadcast of a frame ... is not atomic").
    pub async fn broadcast(&self, roster: &[Session], bytes: &[u8], exclude_slot: Option<u32>) {
        for session in roster {
            if Some(session.slot) == exclude_slot {
                continue;
            }
            self.send_to(session.addr, bytes).await;
        }
    }
}
