use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::{ProbeError, ProbeResult};

/// This is an abstraction for datagram I/O, introduced to facilitate mocking the network away
///  for testing
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    /// returns the number of bytes actually handed to the network, which may be less than
    ///  `buf.len()`
    async fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize>;

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl DatagramSocket for UdpSocket {
    async fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        trace!("UDP socket: sending {} bytes to {:?}", buf.len(), to);
        UdpSocket::send_to(self, buf, to).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// binds an ephemeral socket of the same address family as `destination`
pub async fn bind_for_destination(destination: SocketAddr) -> ProbeResult<UdpSocket> {
    let local = if destination.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    }
    else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    bind(local).await
}

pub async fn bind(addr: SocketAddr) -> ProbeResult<UdpSocket> {
    let socket = UdpSocket::bind(addr).await
        .map_err(ProbeError::Bind)?;
    debug!("bound UDP socket to {:?}", socket.local_addr());
    Ok(socket)
}

/// Releases a socket at the end of a session. Dropping closes the file descriptor, and any error
///  doing so is swallowed by the runtime - this only makes the release visible in the log.
pub fn release(socket: UdpSocket) {
    debug!("closing UDP socket {:?}", socket.local_addr());
    drop(socket);
}
