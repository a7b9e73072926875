//! Health Monitor
//!
//! Drives failure detection: a recurring sweep probes every configured
//! peer on the health channel and applies the outcome to the cluster
//! state. Losing the leader, or finding the node alone with no leader
//! set, triggers an election. The sweep blocks on probes without holding
//! any state lock; each outcome is applied in its own short update.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::identity::Node;
use crate::state::ClusterState;

/// Reachability probe seam between the monitor and the transport
#[async_trait]
pub trait Prober: Send + Sync {
    /// Whether the peer answered a liveness probe within the bounded wait
    async fn probe(&self, peer: &Node) -> bool;
}

/// Periodic probe sweep over the configured peer set
pub struct HealthMonitor {
    prober: Arc<dyn Prober>,
    state: Arc<ClusterState>,
    peers: Vec<Node>,
    interval: Duration,
}

impl HealthMonitor {
    /// Create a monitor over the configured peers
    pub fn new(
        prober: Arc<dyn Prober>,
        state: Arc<ClusterState>,
        peers: Vec<Node>,
        interval: Duration,
    ) -> Self {
        Self {
            prober,
            state,
            peers,
            interval,
        }
    }

    /// Run sweeps at the configured interval for the life of the process
    pub async fn run(self) {
        tracing::info!(
            "Health monitor started: {} peers, sweep every {:?}",
            self.peers.len(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// One pass over every configured peer, then the bootstrap check.
    ///
    /// A peer that never answers is never added to the active set; that
    /// is an absence, not an error.
    pub async fn sweep(&self) {
        for peer in &self.peers {
            if self.prober.probe(peer).await {
                if self.state.mark_reachable(*peer).await {
                    tracing::info!("Added peer {}", peer);
                }
            } else {
                let removal = self.state.mark_unreachable(peer).await;
                if removal.removed {
                    tracing::warn!("Removed unreachable peer {}", peer);
                }
                if removal.leader_lost {
                    tracing::warn!("Leader {} became unreachable", peer);
                    self.state.run_election().await;
                }
            }
        }

        // Bootstraps single-node leadership when fully isolated, and
        // covers the very first sweep after startup.
        if self.state.alone_without_leader().await {
            self.state.run_election().await;
        }
    }
}
