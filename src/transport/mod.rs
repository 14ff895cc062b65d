//! UDP transport for the peer link.
//!
//! The peer owns one unconnected UDP socket for the life of its started
//! state. A failed socket operation is repaired by swapping in a freshly
//! bound socket; the trait seam lets tests substitute a loopback fake.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::net::UdpSocket as TokioUdpSocket;

use crate::error::{Result, TransportError};

/// Datagram transport used by the peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Local socket address.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Send a datagram to an address.
    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<usize>;

    /// Receive a datagram.
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Tear down and re-establish the underlying socket.
    async fn reconnect(&self) -> Result<()>;
}

/// UDP implementation of [`Transport`].
pub struct UdpTransport {
    socket: RwLock<Arc<TokioUdpSocket>>,
    bind_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind to a local address. Port 0 selects an ephemeral port.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self> {
        let socket = TokioUdpSocket::bind(bind_addr)
            .await
            .map_err(|e| TransportError::BindFailed {
                addr: bind_addr,
                reason: e.to_string(),
            })?;

        Ok(Self {
            socket: RwLock::new(Arc::new(socket)),
            bind_addr,
        })
    }

    /// Bind an ephemeral IPv4 socket.
    pub async fn bind_ephemeral() -> Result<Self> {
        Self::bind("0.0.0.0:0".parse().expect("static addr")).await
    }

    fn current(&self) -> Arc<TokioUdpSocket> {
        Arc::clone(&self.socket.read())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        self.current()
            .local_addr()
            .map_err(|e| TransportError::SocketError(e.to_string()).into())
    }

    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<usize> {
        // Clone the socket handle out before awaiting.
        let socket = self.current();
        socket
            .send_to(data, addr)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()).into())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let socket = self.current();
        socket
            .recv_from(buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()).into())
    }

    async fn reconnect(&self) -> Result<()> {
        let fresh = TokioUdpSocket::bind(self.bind_addr)
            .await
            .map_err(|e| TransportError::BindFailed {
                addr: self.bind_addr,
                reason: e.to_string(),
            })?;

        *self.socket.write() = Arc::new(fresh);
        Ok(())
    }
}
