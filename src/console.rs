//! Operator Console
//!
//! Line-oriented operator input: each line becomes a `message:` broadcast
//! to every configured peer when this node is the leader, and is rejected
//! with a notice otherwise. This is a thin caller of the cluster state's
//! leadership query and the transport's broadcast - no leadership or
//! membership decisions are made here.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::identity::Node;
use crate::network::{ControlMessage, UdpTransport};
use crate::state::ClusterState;

/// Operator input loop
pub struct Console {
    transport: Arc<UdpTransport>,
    state: Arc<ClusterState>,
    peers: Vec<Node>,
}

impl Console {
    /// Create a console over the shared transport and state
    pub fn new(transport: Arc<UdpTransport>, state: Arc<ClusterState>, peers: Vec<Node>) -> Self {
        Self {
            transport,
            state,
            peers,
        }
    }

    /// Read operator lines until stdin closes
    pub async fn run(self) {
        tracing::info!("Operator console ready; lines from the leader are broadcast");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if self.state.is_leader().await {
                let payload = ControlMessage::Broadcast(text.to_string()).encode();
                self.transport.broadcast(&self.peers, &payload).await;
                tracing::info!("Broadcast sent to {} peers", self.peers.len());
            } else {
                tracing::warn!("Broadcast rejected: only the leader may send messages");
            }
        }

        tracing::info!("Operator console closed");
    }
}
