//! Control Channel Payloads
//!
//! The wire format is plain text. Three forms are recognized on the
//! control channel: the `connect` handshake, its `ack`, and
//! `message:<text>` operator broadcasts. Everything else is ignored by
//! the receiver. The health channel carries the single `healthcheck`
//! payload, echoed back verbatim.

/// Liveness payload exchanged on the health-probe channel
pub const HEALTHCHECK_PAYLOAD: &str = "healthcheck";

/// Peer-discovery handshake payload
pub const CONNECT_PAYLOAD: &str = "connect";

/// Handshake acknowledgment payload
pub const ACK_PAYLOAD: &str = "ack";

/// Prefix of operator-originated broadcasts
const MESSAGE_PREFIX: &str = "message:";

/// A recognized control-channel payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Peer-discovery handshake; any reply acknowledges it
    Connect,
    /// Acknowledgment of a handshake
    Ack,
    /// An operator broadcast; only the leader sends these
    Broadcast(String),
}

impl ControlMessage {
    /// Parse a received payload. Unrecognized payloads yield `None` and
    /// have no defined behavior upstream.
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        if payload == CONNECT_PAYLOAD {
            Some(ControlMessage::Connect)
        } else if payload == ACK_PAYLOAD {
            Some(ControlMessage::Ack)
        } else {
            payload
                .strip_prefix(MESSAGE_PREFIX)
                .map(|text| ControlMessage::Broadcast(text.to_string()))
        }
    }

    /// Render the payload for the wire
    pub fn encode(&self) -> String {
        match self {
            ControlMessage::Connect => CONNECT_PAYLOAD.to_string(),
            ControlMessage::Ack => ACK_PAYLOAD.to_string(),
            ControlMessage::Broadcast(text) => format!("{}{}", MESSAGE_PREFIX, text),
        }
    }
}
