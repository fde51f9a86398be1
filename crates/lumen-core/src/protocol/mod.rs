//! Protocol module containing the packet header, message registry,
//! typed payloads, and the binary codec.

pub mod codec;
pub mod header;
pub mod payloads;
pub mod registry;

pub use codec::{decode_packet, decode_packet_bounded, encode_packet, Packet, WireError};
pub use header::{Frame, FrameAddress, PacketHeader, ProtocolHeader};
pub use registry::{classify, Classification, MessageKind};
