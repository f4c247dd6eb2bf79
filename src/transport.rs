//! Datagram transport to the companion server.
//!
//! [`Transport`] is the seam between the session logic and the socket; the
//! real implementation is [`UdpTransport`], tests plug in scripted doubles.

use crate::config::BridgeConfig;
use crate::error::TransportError;
use crate::protocol::{Datagram, DATAGRAM_LEN};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::{debug, trace};

/// Fixed-size request/response exchange with one peer.
pub trait Transport: Send {
    /// (Re)create the underlying channel. Opening an open transport reopens it.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Release the channel. Safe to call repeatedly.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Send one datagram to the peer.
    fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError>;

    /// Receive one datagram, blocking at most for the configured timeout.
    ///
    /// Returns the number of bytes the peer actually sent; the remainder of
    /// `buf` is zeroed.
    fn recv(&mut self, buf: &mut Datagram) -> Result<usize, TransportError>;
}

/// UDP socket bound to a fixed local address, talking to a fixed peer.
pub struct UdpTransport {
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    recv_timeout: Duration,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(local_addr: SocketAddr, peer_addr: SocketAddr, recv_timeout: Duration) -> Self {
        Self {
            local_addr,
            peer_addr,
            recv_timeout,
            socket: None,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.local_addr, config.server_addr, config.recv_timeout())
    }

    /// Address the socket is actually bound to (useful when binding port 0).
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn create_socket(&self) -> Result<UdpSocket, TransportError> {
        let setup = |stage: &'static str| move |source: io::Error| TransportError::Setup { stage, source };

        // A zero read timeout means "block forever" to the OS.
        if self.recv_timeout.is_zero() {
            return Err(setup("read_timeout")(io::Error::new(
                io::ErrorKind::InvalidInput,
                "receive timeout must be non-zero",
            )));
        }

        let domain = Domain::for_address(self.local_addr);
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(setup("create"))?;
        socket
            .set_reuse_address(true)
            .map_err(setup("reuse_address"))?;
        socket
            .set_read_timeout(Some(self.recv_timeout))
            .map_err(setup("read_timeout"))?;
        socket
            .bind(&SockAddr::from(self.local_addr))
            .map_err(setup("bind"))?;
        Ok(socket.into())
    }
}

impl Transport for UdpTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        self.close();
        let socket = self.create_socket()?;
        debug!(
            local = %self.local_addr,
            peer = %self.peer_addr,
            timeout_ms = self.recv_timeout.as_millis() as u64,
            "transport open"
        );
        self.socket = Some(socket);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(local = %self.local_addr, "transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        socket.send_to(datagram, self.peer_addr)?;
        trace!(code = datagram[0], peer = %self.peer_addr, "datagram sent");
        Ok(())
    }

    fn recv(&mut self, buf: &mut Datagram) -> Result<usize, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        buf.fill(0);
        match socket.recv_from(buf) {
            Ok((n, from)) => {
                trace!(len = n, %from, code = buf[0], "datagram received");
                Ok(n.min(DATAGRAM_LEN))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(TransportError::Timeout)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_get_gamepad, encode_release};
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
    }

    #[test]
    fn closed_transport_refuses_io() {
        let mut t = UdpTransport::new(loopback(0), loopback(9), Duration::from_millis(10));
        let mut buf = [0u8; DATAGRAM_LEN];
        assert!(matches!(t.send(&buf), Err(TransportError::NotOpen)));
        assert!(matches!(t.recv(&mut buf), Err(TransportError::NotOpen)));
        t.close();
        t.close();
        assert!(!t.is_open());
    }

    #[test]
    fn exchange_with_peer_and_timeout() {
        let peer = UdpSocket::bind(loopback(0)).unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let mut t = UdpTransport::new(loopback(0), peer_addr, Duration::from_millis(50));
        t.open().unwrap();
        assert!(t.is_open());
        let ours = t.bound_addr().unwrap();

        t.send(&encode_get_gamepad(true)).unwrap();
        let mut got = [0u8; DATAGRAM_LEN];
        let (n, from) = peer.recv_from(&mut got).unwrap();
        assert_eq!(n, DATAGRAM_LEN);
        assert_eq!(from, ours);
        assert_eq!(&got[..3], &[8, 0, 1]);

        peer.send_to(&encode_release()[..4], ours).unwrap();
        let mut buf = [0xffu8; DATAGRAM_LEN];
        assert_eq!(t.recv(&mut buf).unwrap(), 4);
        assert_eq!(buf[0], 10);
        assert!(buf[4..].iter().all(|&b| b == 0));

        assert!(t.recv(&mut buf).unwrap_err().is_timeout());
    }

    #[test]
    fn reopen_rebinds() {
        let mut t = UdpTransport::new(loopback(0), loopback(9), Duration::from_millis(10));
        t.open().unwrap();
        t.open().unwrap();
        assert!(t.is_open());
        t.close();
        assert!(t.bound_addr().is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut t = UdpTransport::new(loopback(0), loopback(9), Duration::ZERO);
        match t.open() {
            Err(TransportError::Setup { stage, source }) => {
                assert_eq!(stage, "read_timeout");
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!t.is_open());
    }

    #[test]
    fn bind_failure_names_the_stage() {
        // 192.0.2.0/24 is TEST-NET-1 and never assigned to a local interface.
        let unroutable = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 0));
        let mut t = UdpTransport::new(unroutable, loopback(9), Duration::from_millis(10));
        match t.open() {
            Err(TransportError::Setup { stage, .. }) => assert_eq!(stage, "bind"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!t.is_open());
    }
}
