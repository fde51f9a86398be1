//! Network infrastructure for the emulator.
//!
//! # Sub-modules
//!
//! - **`udp_service`** – Binds the protocol UDP socket and forwards every
//!   datagram to the dispatch thread.  This is the transport controller apps
//!   use for discovery and almost all control traffic.
//!
//! - **`tcp_service`** – Optional TCP listener on the same port.  Each
//!   connection carries a stream of length-prefixed frames; a shared
//!   connection map lets responses find their way back to the right stream.
//!
//! Both services run blocking socket loops on dedicated named threads and
//! feed the dispatcher through a tokio channel, keeping synchronous I/O off
//! the async runtime.

pub mod tcp_service;
pub mod udp_service;

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use thiserror::Error;

use crate::application::dispatch::ResponseTransport;
use tcp_service::TcpConnectionMap;

/// Error type for transport bring-up.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A socket could not be bound.
    #[error("failed to bind {transport} socket on {addr}: {source}")]
    BindFailed {
        transport: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Where an inbound packet came from, and therefore where its responses go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PacketSource {
    /// A UDP datagram from this peer address.
    Udp(SocketAddr),
    /// A frame read from an accepted TCP connection.
    Tcp {
        connection_id: u64,
        peer: SocketAddr,
    },
}

/// One raw inbound buffer, exactly as received, tagged with its origin.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub source: PacketSource,
    pub bytes: Vec<u8>,
}

// ── Outbound transport ────────────────────────────────────────────────────────

/// Response sender over both LAN transports.
///
/// Replies are unicast to the requesting peer: UDP responses go straight to
/// the datagram's source address, TCP responses are written back to the
/// originating connection via the shared [`TcpConnectionMap`].
pub struct LanTransport {
    udp: Arc<UdpSocket>,
    tcp: Option<Arc<TcpConnectionMap>>,
}

impl LanTransport {
    pub fn new(udp: Arc<UdpSocket>, tcp: Option<Arc<TcpConnectionMap>>) -> Self {
        Self { udp, tcp }
    }
}

impl ResponseTransport for LanTransport {
    fn send(&self, destination: &PacketSource, bytes: &[u8]) -> Result<(), String> {
        match destination {
            PacketSource::Udp(addr) => self
                .udp
                .send_to(bytes, addr)
                .map(|_| ())
                .map_err(|e| format!("udp send to {addr}: {e}")),
            PacketSource::Tcp { connection_id, peer } => match &self.tcp {
                Some(map) => map.send(*connection_id, bytes),
                None => Err(format!(
                    "tcp response to {peer} but the tcp service is not running"
                )),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lan_transport_sends_udp_response_to_peer() {
        // Arrange – a loopback receiver standing in for the controller app
        let receiver = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
        let peer = receiver.local_addr().unwrap();
        let sender = Arc::new(UdpSocket::bind("127.0.0.1:0").expect("bind sender"));
        let transport = LanTransport::new(Arc::clone(&sender), None);

        // Act
        transport
            .send(&PacketSource::Udp(peer), b"response bytes")
            .expect("send must succeed");

        // Assert
        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).expect("datagram must arrive");
        assert_eq!(&buf[..len], b"response bytes");
    }

    #[test]
    fn test_lan_transport_rejects_tcp_destination_without_tcp_service() {
        // Arrange
        let sender = Arc::new(UdpSocket::bind("127.0.0.1:0").expect("bind sender"));
        let transport = LanTransport::new(sender, None);
        let destination = PacketSource::Tcp {
            connection_id: 1,
            peer: "127.0.0.1:56700".parse().unwrap(),
        };

        // Act / Assert
        assert!(transport.send(&destination, b"x").is_err());
    }

    #[test]
    fn test_packet_source_equality_distinguishes_connections() {
        let peer: SocketAddr = "192.168.1.20:56700".parse().unwrap();
        let a = PacketSource::Tcp {
            connection_id: 1,
            peer,
        };
        let b = PacketSource::Tcp {
            connection_id: 2,
            peer,
        };
        assert_ne!(a, b, "same peer, different connections");
    }
}
