//! TCP protocol listener service.
//!
//! Some controllers keep a TCP connection open to the device instead of
//! spraying datagrams.  The stream carries the same packets as UDP, back to
//! back; because every packet starts with its own little-endian `size`
//! field, the first two bytes of each frame double as the length prefix.
//!
//! The listener accepts on a dedicated thread; every accepted connection
//! gets its own named reader thread plus an entry in the shared
//! [`TcpConnectionMap`] so the response transport can write replies back to
//! the right stream.  A connection that sends an impossible frame size is
//! dropped — there is no way to resynchronise a corrupt stream.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use lumen_core::HEADER_LEN;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{InboundPacket, PacketSource, ServiceError};

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Error type for stream framing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The declared frame size can never hold a valid packet.
    #[error("declared frame size {size} outside {min}..={max}")]
    InvalidSize { size: usize, min: usize, max: usize },
}

// ── Connection map ────────────────────────────────────────────────────────────

/// Shared registry of open connections, keyed by connection id.
///
/// The reader threads insert and remove entries; the response transport
/// looks streams up to write replies.
#[derive(Default)]
pub struct TcpConnectionMap {
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl TcpConnectionMap {
    fn insert(&self, id: u64, stream: TcpStream) {
        self.streams.lock().unwrap().insert(id, stream);
    }

    fn remove(&self, id: u64) {
        self.streams.lock().unwrap().remove(&id);
    }

    /// Number of currently open connections.
    pub fn len(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes one encoded packet to the connection, if it is still open.
    pub fn send(&self, id: u64, bytes: &[u8]) -> Result<(), String> {
        let streams = self.streams.lock().unwrap();
        let Some(stream) = streams.get(&id) else {
            return Err(format!("tcp connection {id} is gone"));
        };
        (&*stream)
            .write_all(bytes)
            .map_err(|e| format!("tcp write on connection {id}: {e}"))
    }
}

// ── Service bring-up ──────────────────────────────────────────────────────────

/// Binds the TCP listener on `addr` and spawns the accept thread.
///
/// Returns the connection map so the response transport can reach open
/// streams.
///
/// # Errors
///
/// Returns [`ServiceError::BindFailed`] if the listener cannot be bound.
pub fn start_tcp_service(
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    inbound: mpsc::Sender<InboundPacket>,
    max_packet_len: usize,
) -> Result<Arc<TcpConnectionMap>, ServiceError> {
    let listener = TcpListener::bind(addr).map_err(|source| ServiceError::BindFailed {
        transport: "tcp",
        addr,
        source,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ServiceError::BindFailed {
            transport: "tcp",
            addr,
            source,
        })?;

    let connections = Arc::new(TcpConnectionMap::default());
    let accept_connections = Arc::clone(&connections);

    std::thread::Builder::new()
        .name("lumen-tcp".to_string())
        .spawn(move || {
            accept_loop(listener, accept_connections, inbound, running, max_packet_len);
        })
        .expect("failed to spawn tcp accept thread");

    info!("tcp service listening on {addr}");
    Ok(connections)
}

/// The accept loop executed on the listener thread.
fn accept_loop(
    listener: TcpListener,
    connections: Arc<TcpConnectionMap>,
    inbound: mpsc::Sender<InboundPacket>,
    running: Arc<AtomicBool>,
    max_packet_len: usize,
) {
    let next_id = AtomicU64::new(1);

    while running.load(Ordering::Relaxed) {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(e) => {
                error!("tcp accept error: {e}");
                continue;
            }
        };

        let id = next_id.fetch_add(1, Ordering::Relaxed);
        debug!("tcp connection {id} accepted from {peer}");

        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .ok();
        match stream.try_clone() {
            Ok(write_half) => connections.insert(id, write_half),
            Err(e) => {
                warn!("failed to clone tcp stream for {peer}: {e}");
                continue;
            }
        }

        let conn_connections = Arc::clone(&connections);
        let conn_inbound = inbound.clone();
        let conn_running = Arc::clone(&running);
        let spawned = std::thread::Builder::new()
            .name(format!("lumen-tcp-conn-{id}"))
            .spawn(move || {
                connection_loop(stream, peer, id, conn_inbound, conn_running, max_packet_len);
                conn_connections.remove(id);
                debug!("tcp connection {id} closed");
            });
        if spawned.is_err() {
            error!("failed to spawn reader thread for tcp connection {id}");
            connections.remove(id);
        }
    }

    info!("tcp service stopped");
}

/// Reads frames from one connection until it closes, misbehaves, or the
/// application shuts down.
fn connection_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    id: u64,
    inbound: mpsc::Sender<InboundPacket>,
    running: Arc<AtomicBool>,
    max_packet_len: usize,
) {
    let mut chunk = [0u8; 512];
    let mut pending: Vec<u8> = Vec::new();

    while running.load(Ordering::Relaxed) {
        let read = match stream.read(&mut chunk) {
            Ok(0) => break, // peer closed
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => {
                warn!("tcp read error on connection {id} ({peer}): {e}");
                break;
            }
        };
        pending.extend_from_slice(&chunk[..read]);

        let frames = match drain_frames(&mut pending, max_packet_len) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("dropping tcp connection {id} ({peer}): {e}");
                break;
            }
        };
        for bytes in frames {
            let packet = InboundPacket {
                source: PacketSource::Tcp {
                    connection_id: id,
                    peer,
                },
                bytes,
            };
            if inbound.blocking_send(packet).is_err() {
                return; // dispatcher gone, shutting down
            }
        }
    }
}

/// Splits complete frames off the front of `pending`.
///
/// A frame is complete once `pending` holds the number of bytes its first
/// two bytes declare.  Incomplete frames stay buffered for the next read.
///
/// # Errors
///
/// Returns [`FramingError::InvalidSize`] when a declared size falls outside
/// `HEADER_LEN..=max_packet_len`; the caller must drop the connection.
fn drain_frames(pending: &mut Vec<u8>, max_packet_len: usize) -> Result<Vec<Vec<u8>>, FramingError> {
    let mut frames = Vec::new();

    while pending.len() >= 2 {
        let size = usize::from(u16::from_le_bytes([pending[0], pending[1]]));
        if size < HEADER_LEN || size > max_packet_len {
            return Err(FramingError::InvalidSize {
                size,
                min: HEADER_LEN,
                max: max_packet_len,
            });
        }
        if pending.len() < size {
            break;
        }
        frames.push(pending.drain(..size).collect());
    }

    Ok(frames)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
