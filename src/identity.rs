//! Node Identity
//!
//! Derives a numeric identifier from a node's IPv4 address by summing the
//! four dotted-quad octets. The derivation is a pure function of the
//! address, so every node computes the same identifier for every peer
//! without ever exchanging it. Identifiers are only used as a total order
//! key for election tie-breaking; deployments are expected to pick
//! addresses whose sums are distinct.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// One cluster participant: a resolved IPv4 address and its derived
/// identifier. Immutable once constructed and always compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Network address of the node
    pub addr: Ipv4Addr,
    /// Identifier derived from `addr`
    pub id: u32,
}

impl Node {
    /// Create a node from a resolved address
    pub fn new(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            id: node_id(addr),
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id {})", self.addr, self.id)
    }
}

impl From<Ipv4Addr> for Node {
    fn from(addr: Ipv4Addr) -> Self {
        Self::new(addr)
    }
}

/// Derive the identifier for an address: the sum of its four octets.
///
/// Total for any `Ipv4Addr` - malformed addresses cannot reach this point
/// because the type is already resolved.
pub fn node_id(addr: Ipv4Addr) -> u32 {
    addr.octets().iter().map(|&octet| u32::from(octet)).sum()
}
