//! Message type registry.
//!
//! Every packet names its meaning with a `u16` code in the ProtocolHeader.
//! This module is the single place that knows the full set of codes the
//! device understands, which of them are requests a device answers, and
//! which of those mutate state.
//!
//! Codes outside the registry are not an error: [`classify`] reports them as
//! `"unknown"` / not-a-request and the dispatcher drops them quietly.  New
//! controller app versions routinely emit codes older firmware has never
//! heard of.

// ── Message kinds ─────────────────────────────────────────────────────────────

/// Every message type code the device understands, requests and responses
/// alike.
///
/// Response-class codes appear here so inbound copies of them (devices do
/// occasionally hear each other's replies on broadcast) are recognized and
/// ignored by name instead of logged as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageKind {
    GetService = 2,
    StateService = 3,
    StateHostInfo = 13,
    GetHostFirmware = 14,
    StateHostFirmware = 15,
    StateWifiInfo = 17,
    GetWifiFirmware = 18,
    StateWifiFirmware = 19,
    GetPower = 20,
    SetPower = 21,
    StatePower = 22,
    GetLabel = 23,
    SetLabel = 24,
    StateLabel = 25,
    GetVersion = 32,
    StateVersion = 33,
    Acknowledgement = 45,
    GetLocation = 48,
    SetLocation = 49,
    StateLocation = 50,
    GetGroup = 51,
    SetGroup = 52,
    StateGroup = 53,
    EchoRequest = 58,
    EchoResponse = 59,
    LightGet = 101,
    LightSetColor = 102,
    LightState = 107,
    LightGetPower = 116,
    LightSetPower = 117,
    LightStatePower = 118,
}

impl MessageKind {
    /// Every registered kind, in code order.  Startup verification walks this
    /// to prove the handler table covers every request.
    pub const ALL: [MessageKind; 31] = [
        MessageKind::GetService,
        MessageKind::StateService,
        MessageKind::StateHostInfo,
        MessageKind::GetHostFirmware,
        MessageKind::StateHostFirmware,
        MessageKind::StateWifiInfo,
        MessageKind::GetWifiFirmware,
        MessageKind::StateWifiFirmware,
        MessageKind::GetPower,
        MessageKind::SetPower,
        MessageKind::StatePower,
        MessageKind::GetLabel,
        MessageKind::SetLabel,
        MessageKind::StateLabel,
        MessageKind::GetVersion,
        MessageKind::StateVersion,
        MessageKind::Acknowledgement,
        MessageKind::GetLocation,
        MessageKind::SetLocation,
        MessageKind::StateLocation,
        MessageKind::GetGroup,
        MessageKind::SetGroup,
        MessageKind::StateGroup,
        MessageKind::EchoRequest,
        MessageKind::EchoResponse,
        MessageKind::LightGet,
        MessageKind::LightSetColor,
        MessageKind::LightState,
        MessageKind::LightGetPower,
        MessageKind::LightSetPower,
        MessageKind::LightStatePower,
    ];

    /// The wire code for this kind.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Human-readable name used in logs and classification.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::GetService => "GetService",
            MessageKind::StateService => "StateService",
            MessageKind::StateHostInfo => "StateHostInfo",
            MessageKind::GetHostFirmware => "GetHostFirmware",
            MessageKind::StateHostFirmware => "StateHostFirmware",
            MessageKind::StateWifiInfo => "StateWifiInfo",
            MessageKind::GetWifiFirmware => "GetWifiFirmware",
            MessageKind::StateWifiFirmware => "StateWifiFirmware",
            MessageKind::GetPower => "GetPower",
            MessageKind::SetPower => "SetPower",
            MessageKind::StatePower => "StatePower",
            MessageKind::GetLabel => "GetLabel",
            MessageKind::SetLabel => "SetLabel",
            MessageKind::StateLabel => "StateLabel",
            MessageKind::GetVersion => "GetVersion",
            MessageKind::StateVersion => "StateVersion",
            MessageKind::Acknowledgement => "Acknowledgement",
            MessageKind::GetLocation => "GetLocation",
            MessageKind::SetLocation => "SetLocation",
            MessageKind::StateLocation => "StateLocation",
            MessageKind::GetGroup => "GetGroup",
            MessageKind::SetGroup => "SetGroup",
            MessageKind::StateGroup => "StateGroup",
            MessageKind::EchoRequest => "EchoRequest",
            MessageKind::EchoResponse => "EchoResponse",
            MessageKind::LightGet => "LightGet",
            MessageKind::LightSetColor => "LightSetColor",
            MessageKind::LightState => "LightState",
            MessageKind::LightGetPower => "LightGetPower",
            MessageKind::LightSetPower => "LightSetPower",
            MessageKind::LightStatePower => "LightStatePower",
        }
    }

    /// `true` for codes a device is expected to answer.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::GetService
                | MessageKind::GetHostFirmware
                | MessageKind::GetWifiFirmware
                | MessageKind::GetPower
                | MessageKind::SetPower
                | MessageKind::GetLabel
                | MessageKind::SetLabel
                | MessageKind::GetVersion
                | MessageKind::GetLocation
                | MessageKind::SetLocation
                | MessageKind::GetGroup
                | MessageKind::SetGroup
                | MessageKind::EchoRequest
                | MessageKind::LightGet
                | MessageKind::LightSetColor
                | MessageKind::LightGetPower
                | MessageKind::LightSetPower
        )
    }

    /// `true` for requests that mutate device state.  Only these earn an
    /// Acknowledgement when the sender set `ack_required`.
    pub fn is_set(self) -> bool {
        matches!(
            self,
            MessageKind::SetPower
                | MessageKind::SetLabel
                | MessageKind::SetLocation
                | MessageKind::SetGroup
                | MessageKind::LightSetColor
                | MessageKind::LightSetPower
        )
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            2 => Ok(MessageKind::GetService),
            3 => Ok(MessageKind::StateService),
            13 => Ok(MessageKind::StateHostInfo),
            14 => Ok(MessageKind::GetHostFirmware),
            15 => Ok(MessageKind::StateHostFirmware),
            17 => Ok(MessageKind::StateWifiInfo),
            18 => Ok(MessageKind::GetWifiFirmware),
            19 => Ok(MessageKind::StateWifiFirmware),
            20 => Ok(MessageKind::GetPower),
            21 => Ok(MessageKind::SetPower),
            22 => Ok(MessageKind::StatePower),
            23 => Ok(MessageKind::GetLabel),
            24 => Ok(MessageKind::SetLabel),
            25 => Ok(MessageKind::StateLabel),
            32 => Ok(MessageKind::GetVersion),
            33 => Ok(MessageKind::StateVersion),
            45 => Ok(MessageKind::Acknowledgement),
            48 => Ok(MessageKind::GetLocation),
            49 => Ok(MessageKind::SetLocation),
            50 => Ok(MessageKind::StateLocation),
            51 => Ok(MessageKind::GetGroup),
            52 => Ok(MessageKind::SetGroup),
            53 => Ok(MessageKind::StateGroup),
            58 => Ok(MessageKind::EchoRequest),
            59 => Ok(MessageKind::EchoResponse),
            101 => Ok(MessageKind::LightGet),
            102 => Ok(MessageKind::LightSetColor),
            107 => Ok(MessageKind::LightState),
            116 => Ok(MessageKind::LightGetPower),
            117 => Ok(MessageKind::LightSetPower),
            118 => Ok(MessageKind::LightStatePower),
            other => Err(other),
        }
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// What the dispatcher needs to know about an inbound code before touching
/// any payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Registry name, or `"unknown"` for unregistered codes.
    pub name: &'static str,
    /// Whether a device answers this code.
    pub is_request: bool,
}

/// Classifies a raw message type code.
///
/// Never fails: codes outside the registry come back as
/// `{ name: "unknown", is_request: false }`.
pub fn classify(code: u16) -> Classification {
    match MessageKind::try_from(code) {
        Ok(kind) => Classification {
            name: kind.name(),
            is_request: kind.is_request(),
        },
        Err(_) => Classification {
            name: "unknown",
            is_request: false,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
