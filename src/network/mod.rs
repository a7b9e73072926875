//! Network Module
//!
//! UDP communication between nodes: the two channel sockets, the
//! plain-text payloads carried on them, the listener loops, and startup
//! address resolution.

pub mod discovery;
mod protocol;
mod server;
mod transport;

pub use protocol::{ControlMessage, ACK_PAYLOAD, CONNECT_PAYLOAD, HEALTHCHECK_PAYLOAD};
pub use server::{ControlListener, HealthResponder};
pub use transport::{RecvOutcome, UdpTransport};
