//! UDP protocol socket service.
//!
//! The emulator binds one UDP socket on the protocol port (default 56700)
//! and forwards every received datagram to the dispatch thread untouched —
//! envelope validation belongs to the codec, not the socket loop.  The same
//! socket sends the responses, so replies leave from the port controllers
//! expect.
//!
//! The receiver runs as a blocking loop on a dedicated thread to keep
//! synchronous socket I/O off the Tokio runtime.
//!
//! # Read timeout
//!
//! The socket is configured with a 500 ms read timeout.  `recv_from` blocks
//! for at most that long before returning a timeout error; on each timeout
//! we check the `running` flag and exit the loop cleanly when the
//! application is shutting down.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use super::{InboundPacket, PacketSource, ServiceError};

/// Receive buffer size.  Larger than any valid packet, so oversized
/// datagrams arrive whole and are rejected by the codec instead of being
/// silently truncated into something that might parse.
const RECV_BUF_LEN: usize = 1024;

/// Binds the protocol UDP socket on `addr` and spawns a background thread
/// that forwards incoming datagrams to `inbound`.
///
/// Returns the socket so the response transport can send from it.
///
/// # Errors
///
/// Returns [`ServiceError::BindFailed`] if the socket cannot be bound.
pub fn start_udp_service(
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    inbound: mpsc::Sender<InboundPacket>,
) -> Result<Arc<UdpSocket>, ServiceError> {
    let socket = UdpSocket::bind(addr).map_err(|source| ServiceError::BindFailed {
        transport: "udp",
        addr,
        source,
    })?;
    socket
        .set_read_timeout(Some(Duration::from_millis(500)))
        .ok();

    let socket = Arc::new(socket);
    let loop_socket = Arc::clone(&socket);

    std::thread::Builder::new()
        .name("lumen-udp".to_string())
        .spawn(move || {
            udp_loop(loop_socket, inbound, running);
        })
        .expect("failed to spawn udp thread");

    info!("udp service listening on {addr}");
    Ok(socket)
}

/// The main receive loop executed on the UDP thread.
fn udp_loop(socket: Arc<UdpSocket>, inbound: mpsc::Sender<InboundPacket>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; RECV_BUF_LEN];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                error!("udp recv error: {e}");
                continue;
            }
        };

        let packet = InboundPacket {
            source: PacketSource::Udp(src),
            bytes: buf[..len].to_vec(),
        };

        if inbound.blocking_send(packet).is_err() {
            // Receiver dropped – application is shutting down.
            break;
        }
    }

    info!("udp service stopped");
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
