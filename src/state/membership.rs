//! Cluster Membership State
//!
//! `ClusterState` is the single container for everything the concurrent
//! loops share: the active set, the leader reference, and the derived
//! local-leadership flag. One mutex guards all of it, and every composite
//! update that must appear atomic to readers - removing the leader and
//! clearing the reference, or snapshotting the active set and assigning a
//! new leader - is a single method, so no caller can observe a half-applied
//! transition. The lock is never held across a blocking wait.

use tokio::sync::Mutex;

use crate::identity::Node;
use crate::state::election::{select_leader, ElectionPhase};

/// Outcome of marking a peer unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The peer was in the active set and has been removed
    pub removed: bool,
    /// The removed peer was the current leader; the leader reference has
    /// been cleared in the same operation
    pub leader_lost: bool,
}

struct Inner {
    /// Nodes currently believed reachable, in insertion order. The local
    /// node is always a member.
    active: Vec<Node>,
    /// The node currently recognized as leader, if any. When set, it is a
    /// member of `active`.
    leader: Option<Node>,
    /// Derived flag: the leader's identifier equals the local identifier
    is_leader: bool,
    phase: ElectionPhase,
}

/// Shared membership and leadership state for one node
pub struct ClusterState {
    local: Node,
    inner: Mutex<Inner>,
}

impl ClusterState {
    /// Create the state container. The active set starts as the local node
    /// alone - a node can always reach itself.
    pub fn new(local: Node) -> Self {
        Self {
            local,
            inner: Mutex::new(Inner {
                active: vec![local],
                leader: None,
                is_leader: false,
                phase: ElectionPhase::Idle,
            }),
        }
    }

    /// The local node's identity
    pub fn local(&self) -> Node {
        self.local
    }

    /// Whether a node is currently in the active set
    pub async fn is_reachable(&self, node: &Node) -> bool {
        let inner = self.inner.lock().await;
        inner.active.contains(node)
    }

    /// Add a peer to the active set. Returns true if the peer was newly
    /// added, false if it was already present.
    pub async fn mark_reachable(&self, node: Node) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.active.contains(&node) {
            return false;
        }
        inner.active.push(node);
        true
    }

    /// Remove a peer from the active set. If the removed peer is the
    /// current leader, the leader reference is cleared in the same
    /// critical section - a concurrent reader can never see an
    /// unreachable leader still holding the reference.
    ///
    /// The local node is never removed.
    pub async fn mark_unreachable(&self, node: &Node) -> Removal {
        if *node == self.local {
            return Removal {
                removed: false,
                leader_lost: false,
            };
        }

        let mut inner = self.inner.lock().await;
        let before = inner.active.len();
        inner.active.retain(|member| member != node);
        let removed = inner.active.len() < before;

        let leader_lost = removed && inner.leader.map(|l| l.id) == Some(node.id);
        if leader_lost {
            inner.leader = None;
            inner.is_leader = false;
        }

        Removal {
            removed,
            leader_lost,
        }
    }

    /// Point-in-time copy of the active set, in insertion order. The
    /// registry keeps mutating after this returns.
    pub async fn active_nodes(&self) -> Vec<Node> {
        let inner = self.inner.lock().await;
        inner.active.clone()
    }

    /// The node currently recognized as leader, if any
    pub async fn leader(&self) -> Option<Node> {
        let inner = self.inner.lock().await;
        inner.leader
    }

    /// Whether this node is the current leader. Gates operator broadcasts.
    pub async fn is_leader(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.is_leader
    }

    /// Current election phase
    pub async fn phase(&self) -> ElectionPhase {
        let inner = self.inner.lock().await;
        inner.phase
    }

    /// Whether the active set has shrunk to the local node alone with no
    /// leader set - the bootstrap condition for a fresh election.
    pub async fn alone_without_leader(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.active.len() == 1 && inner.leader.is_none()
    }

    /// Clear the leader reference if `node` currently holds it. Used by
    /// the receive path when a socket failure is attributed to the
    /// leader; the active set is left for the health sweep to settle.
    pub async fn demote_if_leader(&self, node: &Node) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.leader.map(|l| l.id) == Some(node.id) {
            inner.leader = None;
            inner.is_leader = false;
            return true;
        }
        false
    }

    /// Run an election over the current active set: the member with the
    /// numerically smallest identifier becomes leader and the local
    /// leadership flag is recomputed, all in one critical section.
    /// Idempotent - an unchanged active set yields the same leader.
    pub async fn run_election(&self) -> Node {
        let mut inner = self.inner.lock().await;
        inner.phase = ElectionPhase::Running;
        tracing::info!("Starting election over {} active nodes", inner.active.len());

        // The active set always holds at least the local node.
        let winner = select_leader(&inner.active).unwrap_or(self.local);
        inner.leader = Some(winner);
        inner.is_leader = winner.id == self.local.id;
        inner.phase = ElectionPhase::Idle;

        if inner.is_leader {
            tracing::info!("Elected leader: {} (this node)", winner);
        } else {
            tracing::info!("Elected leader: {}", winner);
        }

        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn node(d: u8) -> Node {
        Node::new(Ipv4Addr::new(10, 0, 0, d))
    }

    #[tokio::test]
    async fn test_local_always_active() {
        let state = ClusterState::new(node(5));

        assert!(state.is_reachable(&node(5)).await);
        assert_eq!(state.active_nodes().await, vec![node(5)]);

        // Marking the local node unreachable is refused.
        let removal = state.mark_unreachable(&node(5)).await;
        assert!(!removal.removed);
        assert!(state.is_reachable(&node(5)).await);
    }

    #[tokio::test]
    async fn test_mark_reachable_is_idempotent() {
        let state = ClusterState::new(node(5));

        assert!(state.mark_reachable(node(7)).await);
        assert!(!state.mark_reachable(node(7)).await);
        assert_eq!(state.active_nodes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_election_selects_smallest_id() {
        let state = ClusterState::new(node(5));
        state.mark_reachable(node(3)).await;
        state.mark_reachable(node(9)).await;

        let leader = state.run_election().await;
        assert_eq!(leader, node(3));
        assert_eq!(state.leader().await, Some(node(3)));
        assert!(!state.is_leader().await);
        assert_eq!(state.phase().await, ElectionPhase::Idle);
    }

    #[tokio::test]
    async fn test_election_is_idempotent() {
        let state = ClusterState::new(node(5));
        state.mark_reachable(node(3)).await;

        let first = state.run_election().await;
        let second = state.run_election().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_leadership_flag_tracks_leader_identity() {
        let state = ClusterState::new(node(2));
        state.mark_reachable(node(8)).await;

        state.run_election().await;
        assert!(state.is_leader().await);
        assert_eq!(state.leader().await.map(|l| l.id), Some(state.local().id));
    }

    #[tokio::test]
    async fn test_removing_leader_clears_reference_atomically() {
        let state = ClusterState::new(node(9));
        state.mark_reachable(node(3)).await;
        state.run_election().await;
        assert_eq!(state.leader().await, Some(node(3)));

        let removal = state.mark_unreachable(&node(3)).await;
        assert!(removal.removed);
        assert!(removal.leader_lost);
        assert_eq!(state.leader().await, None);
        assert!(!state.is_leader().await);

        // Re-election over the remaining members promotes the local node.
        let leader = state.run_election().await;
        assert_eq!(leader, node(9));
        assert!(state.is_leader().await);
    }

    #[tokio::test]
    async fn test_removing_follower_keeps_leader() {
        let state = ClusterState::new(node(2));
        state.mark_reachable(node(6)).await;
        state.run_election().await;

        let removal = state.mark_unreachable(&node(6)).await;
        assert!(removal.removed);
        assert!(!removal.leader_lost);
        assert_eq!(state.leader().await, Some(node(2)));
    }

    #[tokio::test]
    async fn test_removing_unknown_peer_is_absence_not_error() {
        let state = ClusterState::new(node(2));

        let removal = state.mark_unreachable(&node(200)).await;
        assert!(!removal.removed);
        assert!(!removal.leader_lost);
    }

    #[tokio::test]
    async fn test_alone_without_leader() {
        let state = ClusterState::new(node(4));
        assert!(state.alone_without_leader().await);

        state.run_election().await;
        assert!(!state.alone_without_leader().await);

        let state = ClusterState::new(node(4));
        state.mark_reachable(node(6)).await;
        assert!(!state.alone_without_leader().await);
    }

    #[tokio::test]
    async fn test_demote_if_leader() {
        let state = ClusterState::new(node(7));
        state.mark_reachable(node(3)).await;
        state.run_election().await;

        // A non-leader peer does not demote anyone.
        assert!(!state.demote_if_leader(&node(7)).await);
        assert_eq!(state.leader().await, Some(node(3)));

        assert!(state.demote_if_leader(&node(3)).await);
        assert_eq!(state.leader().await, None);
        assert!(!state.is_leader().await);
    }
}
