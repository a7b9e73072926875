//! Channel Listeners
//!
//! The two long-lived receive loops: the control listener, which handles
//! handshakes and operator broadcasts and watches for receive-path leader
//! loss, and the health responder, which echoes probes. Both loops block
//! on the network without holding any state lock; shared state is only
//! touched for the short decision step after a receive completes.

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::identity::Node;
use crate::network::protocol::{ControlMessage, ACK_PAYLOAD, HEALTHCHECK_PAYLOAD};
use crate::network::transport::{RecvOutcome, UdpTransport};
use crate::state::ClusterState;

/// Receive loop for the control channel
pub struct ControlListener {
    transport: Arc<UdpTransport>,
    state: Arc<ClusterState>,
}

impl ControlListener {
    /// Create a listener over the shared transport and state
    pub fn new(transport: Arc<UdpTransport>, state: Arc<ClusterState>) -> Self {
        Self { transport, state }
    }

    /// Run the receive loop for the life of the process
    pub async fn run(self) {
        tracing::info!(
            "Control listener started on port {}",
            self.transport.control_port()
        );

        // Sender of the most recent datagram; a socket failure is
        // attributed to it, matching how leader loss is detected on the
        // receive path.
        let mut last_sender: Option<Ipv4Addr> = None;

        loop {
            match self.transport.recv_control().await {
                RecvOutcome::Datagram { payload, from } => {
                    if let IpAddr::V4(ip) = from.ip() {
                        last_sender = Some(ip);
                    }
                    self.dispatch(&payload, from).await;
                }
                RecvOutcome::TimedOut => {
                    // Ordinary silence; reachability is the health
                    // sweep's job.
                }
                RecvOutcome::Failed => {
                    if let Some(ip) = last_sender {
                        self.handle_receive_failure(Node::new(ip)).await;
                    }
                }
            }
        }
    }

    /// Handle one received payload
    async fn dispatch(&self, payload: &str, from: std::net::SocketAddr) {
        match ControlMessage::parse(payload) {
            Some(ControlMessage::Connect) => {
                tracing::info!("Handshake from {}", from);
                self.transport.send_control(from, ACK_PAYLOAD).await;
            }
            Some(ControlMessage::Broadcast(text)) => {
                tracing::info!("Broadcast from {}: {}", from, text);
            }
            Some(ControlMessage::Ack) => {
                // Late ack for a handshake that already gave up.
            }
            None => {
                tracing::debug!("Ignoring unrecognized payload from {}", from);
            }
        }
    }

    /// A socket failure attributed to the current leader clears the
    /// leader reference and triggers a re-election. The active set is
    /// left to the health sweep.
    async fn handle_receive_failure(&self, sender: Node) {
        if self.state.demote_if_leader(&sender).await {
            tracing::warn!("Lost connection to leader {}", sender);
            self.state.run_election().await;
        }
    }
}

/// Echo loop for the health channel. Any probe datagram is answered with
/// the liveness payload; the probe side only cares that something came
/// back.
pub struct HealthResponder {
    transport: Arc<UdpTransport>,
}

impl HealthResponder {
    /// Create a responder over the shared transport
    pub fn new(transport: Arc<UdpTransport>) -> Self {
        Self { transport }
    }

    /// Run the echo loop for the life of the process
    pub async fn run(self) {
        tracing::info!(
            "Health responder started on port {}",
            self.transport.health_port()
        );

        loop {
            if let Some(from) = self.transport.recv_health().await {
                self.transport.send_health(from, HEALTHCHECK_PAYLOAD).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;

    fn test_config() -> ClusterConfig {
        ClusterConfig {
            peers: vec![Ipv4Addr::LOCALHOST],
            control_port: 0,
            health_port: 0,
            probe_interval_ms: 1000,
            probe_timeout_ms: 200,
            recv_timeout_ms: 200,
        }
    }

    #[tokio::test]
    async fn test_responder_answers_probes() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());

        let responder = HealthResponder::new(Arc::clone(&transport));
        let handle = tokio::spawn(responder.run());

        let peer = Node::new(Ipv4Addr::LOCALHOST);
        assert!(transport.probe(&peer).await);

        handle.abort();
    }

    #[tokio::test]
    async fn test_listener_acks_handshakes() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());
        let state = Arc::new(ClusterState::new(Node::new(Ipv4Addr::LOCALHOST)));

        let listener = ControlListener::new(Arc::clone(&transport), state);
        let handle = tokio::spawn(listener.run());

        let peer = Node::new(Ipv4Addr::LOCALHOST);
        assert!(transport.handshake(&peer).await);

        handle.abort();
    }

    #[tokio::test]
    async fn test_receive_failure_from_leader_triggers_reelection() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());
        let local = Node::new(Ipv4Addr::new(10, 0, 0, 9));
        let leader = Node::new(Ipv4Addr::new(10, 0, 0, 3));

        let state = Arc::new(ClusterState::new(local));
        state.mark_reachable(leader).await;
        state.run_election().await;
        assert_eq!(state.leader().await, Some(leader));

        let listener = ControlListener::new(transport, Arc::clone(&state));
        listener.handle_receive_failure(leader).await;

        // The reference was cleared and the election re-ran; the failed
        // leader is still in the active set until the sweep drops it, so
        // it wins again - same as a fresh election over an unchanged set.
        assert_eq!(state.leader().await, Some(leader));
    }

    #[tokio::test]
    async fn test_receive_failure_from_follower_is_ignored() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());
        let local = Node::new(Ipv4Addr::new(10, 0, 0, 2));
        let follower = Node::new(Ipv4Addr::new(10, 0, 0, 8));

        let state = Arc::new(ClusterState::new(local));
        state.mark_reachable(follower).await;
        state.run_election().await;
        assert_eq!(state.leader().await, Some(local));

        let listener = ControlListener::new(transport, Arc::clone(&state));
        listener.handle_receive_failure(follower).await;

        assert_eq!(state.leader().await, Some(local));
        assert!(state.is_leader().await);
    }
}
