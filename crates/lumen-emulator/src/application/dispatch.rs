//! Dispatcher: turns each inbound request packet into response packets.
//!
//! This use case is the heart of the emulator. It decodes one raw buffer,
//! classifies the message type, runs the matching handler against the owned
//! [`DeviceState`], and hands every produced response to the
//! [`ResponseTransport`] for sending.
//!
//! # Architecture
//!
//! The dispatcher depends only on a trait (`ResponseTransport`) and domain
//! types from `lumen-core`. All infrastructure implementations are injected
//! at construction time, making the use case fully unit-testable.
//!
//! Each request runs to completion before the next is accepted: the
//! dispatcher is single-threaded by design, so `DeviceState` needs no lock —
//! it is mutated fully before any response payload reads it, and a response
//! therefore always reflects the state *after* the request that triggered it.
//!
//! # Handler table
//!
//! Request handling is data-driven: a [`HandlerTable`] maps each request
//! code to the response kind it produces and a pure handler function.
//! SET-class handlers decode their payload, mutate state, then call the
//! matching GET handler to build the reply, so a SET always answers with
//! fresh state. The table is verified at construction: a request code
//! without a handler fails [`Dispatcher::new`] instead of surfacing as a
//! silent runtime gap.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_core::protocol::header::PacketHeader;
use lumen_core::protocol::payloads::{
    CollectionPayload, EchoPayload, LabelPayload, LightSetPowerPayload, LightStatePayload,
    PowerPayload, Service, SetColorPayload, StateFirmwarePayload, StateServicePayload,
    StateVersionPayload,
};
use lumen_core::{
    classify, decode_packet_bounded, encode_packet, CollectionRef, DeviceSnapshot, DeviceState,
    MessageKind, Packet, WireError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::infrastructure::network::{InboundPacket, PacketSource};

/// Error type for dispatcher construction.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A request code in the registry has no handler table entry.
    #[error("no handler registered for request {name} (code {code})")]
    MissingHandler { name: &'static str, code: u16 },
}

/// Trait for sending encoded response packets back to a requesting peer.
///
/// Infrastructure implementations write to UDP/TCP sockets; test
/// implementations record calls.
pub trait ResponseTransport: Send + Sync {
    /// Sends one encoded packet to `destination`.
    fn send(&self, destination: &PacketSource, bytes: &[u8]) -> Result<(), String>;
}

/// The transports the device advertises in StateService replies.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAdvert {
    /// Port both transports listen on.
    pub port: u16,
    /// Whether the TCP listener is up and worth advertising.
    pub tcp_enabled: bool,
}

/// Why a packet produced no responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The buffer failed envelope validation.
    DecodeError,
    /// The code is a response/notification or unknown; devices never answer those.
    NotARequest,
    /// A registered request code had no handler entry.
    NoHandler,
    /// The handler rejected the payload (too short or otherwise malformed).
    BadPayload,
}

/// One event per processed inbound packet, consumed by the binary for
/// logging and settings persistence.
#[derive(Debug)]
pub enum DispatchEvent {
    /// The request was answered.
    Handled {
        kind: MessageKind,
        peer: PacketSource,
        /// Number of response packets produced, acknowledgement included.
        responses: usize,
        /// Present when the request changed a persisted field (label,
        /// location, group); the consumer writes it back to disk.
        snapshot: Option<DeviceSnapshot>,
    },
    /// The packet was dropped without responses or state changes.
    Ignored {
        peer: PacketSource,
        /// The message type code, when the envelope decoded far enough to have one.
        code: Option<u16>,
        reason: IgnoreReason,
    },
}

// ── Handler table ─────────────────────────────────────────────────────────────

/// One response under construction: its kind and payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Reply {
    fn new(kind: MessageKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }
}

/// A handler: reads (and for SET codes mutates) the device state, returns
/// the replies the request earns. Payload problems surface as [`WireError`]
/// and drop the request whole — no partial state application.
type HandlerFn = fn(&mut DeviceState, &[u8], &ServiceAdvert) -> Result<Vec<Reply>, WireError>;

/// Table entry: the response kind a request code produces plus its handler.
pub struct HandlerEntry {
    /// Primary response kind, for logs and table audits.
    pub response: MessageKind,
    run: HandlerFn,
}

/// Read-only map from request kind to handler, built once at startup.
pub struct HandlerTable {
    entries: HashMap<MessageKind, HandlerEntry>,
}

impl HandlerTable {
    /// Builds the full table.
    pub fn new() -> Self {
        let mut entries: HashMap<MessageKind, HandlerEntry> = HashMap::new();
        let mut add = |kind: MessageKind, response: MessageKind, run: HandlerFn| {
            entries.insert(kind, HandlerEntry { response, run });
        };

        add(MessageKind::GetService, MessageKind::StateService, handle_get_service);
        add(
            MessageKind::GetHostFirmware,
            MessageKind::StateHostFirmware,
            handle_get_host_firmware,
        );
        add(
            MessageKind::GetWifiFirmware,
            MessageKind::StateWifiFirmware,
            handle_get_wifi_firmware,
        );
        add(MessageKind::GetPower, MessageKind::StatePower, handle_get_power);
        add(MessageKind::SetPower, MessageKind::StatePower, handle_set_power);
        add(MessageKind::GetLabel, MessageKind::StateLabel, handle_get_label);
        add(MessageKind::SetLabel, MessageKind::StateLabel, handle_set_label);
        add(MessageKind::GetVersion, MessageKind::StateVersion, handle_get_version);
        add(MessageKind::GetLocation, MessageKind::StateLocation, handle_get_location);
        add(MessageKind::SetLocation, MessageKind::StateLocation, handle_set_location);
        add(MessageKind::GetGroup, MessageKind::StateGroup, handle_get_group);
        add(MessageKind::SetGroup, MessageKind::StateGroup, handle_set_group);
        add(MessageKind::EchoRequest, MessageKind::EchoResponse, handle_echo);
        add(MessageKind::LightGet, MessageKind::LightState, handle_light_get);
        add(MessageKind::LightSetColor, MessageKind::LightState, handle_light_set_color);
        add(
            MessageKind::LightGetPower,
            MessageKind::LightStatePower,
            handle_light_get_power,
        );
        add(
            MessageKind::LightSetPower,
            MessageKind::LightStatePower,
            handle_light_set_power,
        );

        Self { entries }
    }

    /// Looks up the handler for a request kind.
    pub fn get(&self, kind: MessageKind) -> Option<&HandlerEntry> {
        self.entries.get(&kind)
    }

    /// Proves every request code in the registry has an entry.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingHandler`] naming the first uncovered
    /// request code.
    pub fn verify(&self) -> Result<(), DispatchError> {
        for kind in MessageKind::ALL {
            if kind.is_request() && !self.entries.contains_key(&kind) {
                return Err(DispatchError::MissingHandler {
                    name: kind.name(),
                    code: kind.code(),
                });
            }
        }
        Ok(())
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Handler functions ─────────────────────────────────────────────────────────

fn payload_bytes(write: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut buf = Vec::new();
    write(&mut buf);
    buf
}

fn handle_get_service(
    _state: &mut DeviceState,
    _payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let advert = |service: Service| {
        let p = StateServicePayload {
            service,
            port: u32::from(services.port),
        };
        Reply::new(MessageKind::StateService, payload_bytes(|buf| p.write_into(buf)))
    };

    let mut replies = vec![advert(Service::Udp)];
    if services.tcp_enabled {
        replies.push(advert(Service::Tcp));
    }
    Ok(replies)
}

fn firmware_reply(kind: MessageKind, firmware: lumen_core::FirmwareInfo) -> Reply {
    let p = StateFirmwarePayload {
        build: firmware.build,
        install: firmware.install,
        version_minor: firmware.version_minor,
        version_major: firmware.version_major,
    };
    Reply::new(kind, payload_bytes(|buf| p.write_into(buf)))
}

fn handle_get_host_firmware(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    Ok(vec![firmware_reply(
        MessageKind::StateHostFirmware,
        state.host_firmware(),
    )])
}

fn handle_get_wifi_firmware(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    Ok(vec![firmware_reply(
        MessageKind::StateWifiFirmware,
        state.wifi_firmware(),
    )])
}

fn handle_get_power(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let p = PowerPayload {
        level: state.power(),
    };
    Ok(vec![Reply::new(
        MessageKind::StatePower,
        payload_bytes(|buf| p.write_into(buf)),
    )])
}

fn handle_set_power(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = PowerPayload::read(payload)?;
    state.set_power(set.level);
    // A SET doubles as a GET of the same resource: answer with fresh state.
    handle_get_power(state, &[], services)
}

fn handle_get_label(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let p = LabelPayload {
        label: state.label(),
    };
    Ok(vec![Reply::new(
        MessageKind::StateLabel,
        payload_bytes(|buf| p.write_into(buf)),
    )])
}

fn handle_set_label(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = LabelPayload::read(payload)?;
    state.set_label(set.label);
    handle_get_label(state, &[], services)
}

fn handle_get_version(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let identity = state.identity();
    let p = StateVersionPayload {
        vendor: identity.vendor,
        product: identity.product,
        version: identity.version,
    };
    Ok(vec![Reply::new(
        MessageKind::StateVersion,
        payload_bytes(|buf| p.write_into(buf)),
    )])
}

fn collection_reply(kind: MessageKind, collection: CollectionRef) -> Reply {
    let p = CollectionPayload {
        id: collection.id,
        label: collection.label,
        updated_at: collection.updated_at,
    };
    Reply::new(kind, payload_bytes(|buf| p.write_into(buf)))
}

fn handle_get_location(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    Ok(vec![collection_reply(
        MessageKind::StateLocation,
        state.location(),
    )])
}

fn handle_set_location(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = CollectionPayload::read(payload)?;
    state.set_location(CollectionRef {
        id: set.id,
        label: set.label,
        updated_at: set.updated_at,
    });
    handle_get_location(state, &[], services)
}

fn handle_get_group(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    Ok(vec![collection_reply(MessageKind::StateGroup, state.group())])
}

fn handle_set_group(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = CollectionPayload::read(payload)?;
    state.set_group(CollectionRef {
        id: set.id,
        label: set.label,
        updated_at: set.updated_at,
    });
    handle_get_group(state, &[], services)
}

fn handle_echo(
    _state: &mut DeviceState,
    payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    // Short echoes are malformed, not zero-padded: padding would fabricate
    // bytes the client never sent.
    let echo = EchoPayload::read(payload)?;
    Ok(vec![Reply::new(
        MessageKind::EchoResponse,
        payload_bytes(|buf| echo.write_into(buf)),
    )])
}

fn handle_light_get(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let p = LightStatePayload {
        color: state.color(),
        dim: 0,
        power: state.power(),
        label: state.label(),
        tags: 0,
    };
    Ok(vec![Reply::new(
        MessageKind::LightState,
        payload_bytes(|buf| p.write_into(buf)),
    )])
}

fn handle_light_set_color(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = SetColorPayload::read(payload)?;
    // duration_ms is a fade hint for the driver; the state change itself is
    // immediate.
    state.set_color(set.color);
    handle_light_get(state, &[], services)
}

fn handle_light_get_power(
    state: &mut DeviceState,
    _payload: &[u8],
    _services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let p = PowerPayload {
        level: state.power(),
    };
    Ok(vec![Reply::new(
        MessageKind::LightStatePower,
        payload_bytes(|buf| p.write_into(buf)),
    )])
}

fn handle_light_set_power(
    state: &mut DeviceState,
    payload: &[u8],
    services: &ServiceAdvert,
) -> Result<Vec<Reply>, WireError> {
    let set = LightSetPowerPayload::read(payload)?;
    state.set_power(set.level);
    handle_light_get_power(state, &[], services)
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// The request dispatcher.
///
/// Owns the device state and the handler table; everything else is an
/// injected collaborator.
pub struct Dispatcher {
    state: DeviceState,
    table: HandlerTable,
    transport: Arc<dyn ResponseTransport>,
    services: ServiceAdvert,
    max_packet_len: usize,
    events: mpsc::Sender<DispatchEvent>,
}

impl Dispatcher {
    /// Creates the dispatcher and returns it together with the event receiver.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingHandler`] when the handler table does
    /// not cover every request code — a bring-up defect the binary treats as
    /// fatal.
    pub fn new(
        state: DeviceState,
        transport: Arc<dyn ResponseTransport>,
        services: ServiceAdvert,
        max_packet_len: usize,
    ) -> Result<(Self, mpsc::Receiver<DispatchEvent>), DispatchError> {
        let table = HandlerTable::new();
        table.verify()?;

        let (tx, rx) = mpsc::channel(64);
        Ok((
            Self {
                state,
                table,
                transport,
                services,
                max_packet_len,
                events: tx,
            },
            rx,
        ))
    }

    /// Read access to the device state, for tests and diagnostics.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Processes one inbound buffer end to end.
    ///
    /// Never fails: malformed packets, unknown codes, and transport faults
    /// are absorbed locally. The only externally visible effect of a failure
    /// is that no response was sent.
    pub fn dispatch(&mut self, inbound: &InboundPacket) {
        let packet = match decode_packet_bounded(&inbound.bytes, self.max_packet_len) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("dropping malformed packet from {:?}: {e}", inbound.source);
                self.emit(DispatchEvent::Ignored {
                    peer: inbound.source.clone(),
                    code: None,
                    reason: IgnoreReason::DecodeError,
                });
                return;
            }
        };

        let code = packet.message_type();
        let classification = classify(code);
        if !classification.is_request {
            debug!(
                "ignoring {} (code {code}) from {:?}",
                classification.name, inbound.source
            );
            self.emit(DispatchEvent::Ignored {
                peer: inbound.source.clone(),
                code: Some(code),
                reason: IgnoreReason::NotARequest,
            });
            return;
        }
        let Ok(kind) = MessageKind::try_from(code) else {
            // classify() only reports registered codes as requests.
            return;
        };

        let Some(entry) = self.table.get(kind) else {
            warn!("request {} (code {code}) has no handler", kind.name());
            self.emit(DispatchEvent::Ignored {
                peer: inbound.source.clone(),
                code: Some(code),
                reason: IgnoreReason::NoHandler,
            });
            return;
        };

        let mut replies = match (entry.run)(&mut self.state, &packet.payload, &self.services) {
            Ok(replies) => replies,
            Err(e) => {
                debug!("dropping {} from {:?}: {e}", kind.name(), inbound.source);
                self.emit(DispatchEvent::Ignored {
                    peer: inbound.source.clone(),
                    code: Some(code),
                    reason: IgnoreReason::BadPayload,
                });
                return;
            }
        };

        // SET-class requests earn a trailing bare acknowledgement when asked
        // for one, after the primary replies.
        if packet.header.frame_address.ack_required && kind.is_set() {
            replies.push(Reply::new(MessageKind::Acknowledgement, Vec::new()));
        }

        for reply in &replies {
            let response = Packet {
                header: self.response_header(&packet.header, reply.kind, reply.payload.len()),
                payload: reply.payload.clone(),
            };
            let bytes = encode_packet(&response);
            if let Err(e) = self.transport.send(&inbound.source, &bytes) {
                warn!(
                    "failed to send {} to {:?}: {e}",
                    reply.kind.name(),
                    inbound.source
                );
            }
        }

        let snapshot = if self.state.take_settings_dirty() {
            Some(self.state.snapshot())
        } else {
            None
        };

        debug!(
            "handled {} from {:?}: {} response(s)",
            kind.name(),
            inbound.source,
            replies.len()
        );
        self.emit(DispatchEvent::Handled {
            kind,
            peer: inbound.source.clone(),
            responses: replies.len(),
            snapshot,
        });
    }

    /// Builds a fresh response header for `kind`: echoes the request's
    /// `source` and `sequence`, stamps the device's own identity as `target`
    /// (never the broadcast value, even when the request was tagged).
    fn response_header(
        &self,
        request: &PacketHeader,
        kind: MessageKind,
        payload_len: usize,
    ) -> PacketHeader {
        PacketHeader::response_to(
            request,
            kind.code(),
            self.state.identity().target,
            payload_len,
        )
    }

    fn emit(&self, event: DispatchEvent) {
        // Receiver dropped means the binary is shutting down; nothing to do.
        self.events.blocking_send(event).ok();
    }
}

/// The blocking dispatch loop, run on a dedicated thread.
///
/// Exits when every inbound sender (the transport services) has been dropped.
pub fn run_dispatch_loop(mut dispatcher: Dispatcher, mut inbound: mpsc::Receiver<InboundPacket>) {
    info!("dispatch loop started");
    while let Some(packet) = inbound.blocking_recv() {
        dispatcher.dispatch(&packet);
    }
    info!("dispatch loop stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
