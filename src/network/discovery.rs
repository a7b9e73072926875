//! Startup Discovery
//!
//! Resolves which configured address belongs to this machine and runs the
//! initial `connect` round against the other peers. Both are thin I/O
//! wrappers run once at startup; failing to resolve a local identity is
//! the one condition that aborts the process.

use std::net::Ipv4Addr;

use crate::config::WolfpackConfig;
use crate::error::{Error, Result};
use crate::identity::Node;
use crate::network::transport::UdpTransport;

/// Determine the local node's address.
///
/// An explicit `[node] address` wins (the config layer has already
/// checked it against the peer list). Otherwise each configured address
/// is bind-probed: binding succeeds only on an address a local interface
/// owns, so the first address that binds is ours. No match means this
/// machine is not part of the configured deployment - fatal.
pub fn resolve_local_addr(config: &WolfpackConfig) -> Result<Ipv4Addr> {
    if let Some(address) = config.node.address {
        return Ok(address);
    }

    for &address in &config.cluster.peers {
        if std::net::UdpSocket::bind((address, 0)).is_ok() {
            return Ok(address);
        }
    }

    Err(Error::LocalAddressNotFound {
        configured: config.cluster.peers.len(),
    })
}

/// Send a `connect` handshake to every peer and log who answered. Purely
/// informational - reachability tracking starts with the first health
/// sweep.
pub async fn connect_sweep(transport: &UdpTransport, peers: &[Node]) {
    for peer in peers {
        if transport.handshake(peer).await {
            tracing::info!("Connected to peer {}", peer);
        } else {
            tracing::debug!("No answer from peer {}", peer);
        }
    }
}
