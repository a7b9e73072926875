//! Wolfpack - Leader Election and Failure Detection
//!
//! A small Rust daemon that keeps a fixed set of peer nodes agreeing on a
//! single leader over an unreliable UDP network. Each node probes every
//! configured peer, tracks which ones are reachable, and deterministically
//! elects the reachable node with the smallest address-derived identifier.
//! When the leader stops answering, it is dropped from the active set and a
//! new election runs automatically.
//!
//! # Architecture
//!
//! Wolfpack runs four long-lived tasks per process: a health sweep that
//! probes every peer on the health channel, a control listener that handles
//! handshake and broadcast datagrams, a health responder that answers
//! probes, and an operator console. All of them share a single cluster
//! state container; the state is only ever touched in short, non-blocking
//! critical sections.
//!
//! # Features
//!
//! - Deterministic leader election (smallest identifier wins)
//! - Periodic UDP health probing with automatic failover
//! - Leader-gated operator broadcasts on a dedicated control channel
//! - Static, pre-configured membership - no discovery protocol to run

pub mod config;
pub mod console;
pub mod error;
pub mod health;
pub mod identity;
pub mod network;
pub mod state;

pub use config::WolfpackConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfpackConfig;
    pub use crate::error::{Error, Result};
    pub use crate::health::{HealthMonitor, Prober};
    pub use crate::identity::Node;
    pub use crate::network::{ControlMessage, RecvOutcome, UdpTransport};
    pub use crate::state::ClusterState;
}
