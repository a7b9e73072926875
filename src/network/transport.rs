//! Messaging Transport
//!
//! Raw datagram I/O on the two logical channels: the control/broadcast
//! channel and the health-probe channel. The transport moves bytes and
//! reports outcomes; it never touches membership or leadership state, and
//! no failure here is ever raised to the caller as a process-ending error.
//!
//! Probes and handshakes use a fresh ephemeral socket per call so that a
//! reply can only ever reach the waiter that asked for it; the two bound
//! sockets belong to the listener loops.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use crate::health::Prober;
use crate::identity::Node;
use crate::network::protocol::{CONNECT_PAYLOAD, HEALTHCHECK_PAYLOAD};

/// Largest payload the channels carry
const MAX_DATAGRAM: usize = 1024;

/// Outcome of a bounded-wait receive on the control channel
#[derive(Debug)]
pub enum RecvOutcome {
    /// A datagram arrived
    Datagram {
        /// Payload text, lossily decoded
        payload: String,
        /// Sender address
        from: SocketAddr,
    },
    /// Nothing arrived within the bounded wait
    TimedOut,
    /// The socket reported an error; details are logged at the call site
    Failed,
}

/// UDP transport bound to the control and health channels
pub struct UdpTransport {
    control: UdpSocket,
    health: UdpSocket,
    control_port: u16,
    health_port: u16,
    probe_timeout: Duration,
    recv_timeout: Duration,
}

impl UdpTransport {
    /// Bind both channel sockets. The stored ports are the ones actually
    /// bound, so configuring port 0 yields usable ephemeral channels.
    pub async fn bind(config: &ClusterConfig) -> Result<Self> {
        let control = UdpSocket::bind(("0.0.0.0", config.control_port))
            .await
            .map_err(|e| Error::Network(format!("Failed to bind control channel: {}", e)))?;
        let health = UdpSocket::bind(("0.0.0.0", config.health_port))
            .await
            .map_err(|e| Error::Network(format!("Failed to bind health channel: {}", e)))?;

        let control_port = control
            .local_addr()
            .map_err(|e| Error::Network(format!("Control channel has no local address: {}", e)))?
            .port();
        let health_port = health
            .local_addr()
            .map_err(|e| Error::Network(format!("Health channel has no local address: {}", e)))?
            .port();

        Ok(Self {
            control,
            health,
            control_port,
            health_port,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            recv_timeout: Duration::from_millis(config.recv_timeout_ms),
        })
    }

    /// Port of the control channel
    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// Port of the health channel
    pub fn health_port(&self) -> u16 {
        self.health_port
    }

    /// Send a short liveness payload to a peer's health channel and wait
    /// for any answer within the probe timeout. Reports reachability
    /// only; all I/O errors count as unreachable.
    pub async fn probe(&self, peer: &Node) -> bool {
        self.ask(
            HEALTHCHECK_PAYLOAD,
            SocketAddr::from((peer.addr, self.health_port)),
        )
        .await
    }

    /// Send a `connect` handshake to a peer's control channel and wait
    /// for any reply within the probe timeout.
    pub async fn handshake(&self, peer: &Node) -> bool {
        self.ask(
            CONNECT_PAYLOAD,
            SocketAddr::from((peer.addr, self.control_port)),
        )
        .await
    }

    /// Fire a payload from an ephemeral socket and wait for any datagram
    /// back. The reply content is ignored; arrival is the signal.
    async fn ask(&self, payload: &str, target: SocketAddr) -> bool {
        let socket = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::debug!("Failed to bind probe socket: {}", e);
                return false;
            }
        };

        if let Err(e) = socket.send_to(payload.as_bytes(), target).await {
            tracing::debug!("Probe send to {} failed: {}", target, e);
            return false;
        }

        let mut buf = [0u8; MAX_DATAGRAM];
        match timeout(self.probe_timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Probe receive from {} failed: {}", target, e);
                false
            }
            Err(_) => false,
        }
    }

    /// Send a payload to every peer's control channel, best-effort.
    /// Per-peer failures are logged and do not abort the remaining sends.
    pub async fn broadcast(&self, peers: &[Node], payload: &str) {
        for peer in peers {
            let target = SocketAddr::from((peer.addr, self.control_port));
            if let Err(e) = self.control.send_to(payload.as_bytes(), target).await {
                tracing::warn!("Failed to send to {}: {}", peer, e);
            }
        }
    }

    /// Send a single payload on the control channel, used for replies
    pub async fn send_control(&self, to: SocketAddr, payload: &str) {
        if let Err(e) = self.control.send_to(payload.as_bytes(), to).await {
            tracing::debug!("Control reply to {} failed: {}", to, e);
        }
    }

    /// Bounded-wait receive on the control channel
    pub async fn recv_control(&self) -> RecvOutcome {
        let mut buf = [0u8; MAX_DATAGRAM];
        match timeout(self.recv_timeout, self.control.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => RecvOutcome::Datagram {
                payload: String::from_utf8_lossy(&buf[..len]).into_owned(),
                from,
            },
            Ok(Err(e)) => {
                tracing::debug!("Control receive failed: {}", e);
                RecvOutcome::Failed
            }
            Err(_) => RecvOutcome::TimedOut,
        }
    }

    /// Blocking receive on the health channel. Returns the sender to echo
    /// to, or `None` on a socket error (logged, loop continues).
    pub async fn recv_health(&self) -> Option<SocketAddr> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.health.recv_from(&mut buf).await {
            Ok((_, from)) => Some(from),
            Err(e) => {
                tracing::debug!("Health receive failed: {}", e);
                None
            }
        }
    }

    /// Send a single payload on the health channel, used for echoes
    pub async fn send_health(&self, to: SocketAddr, payload: &str) {
        if let Err(e) = self.health.send_to(payload.as_bytes(), to).await {
            tracing::debug!("Health echo to {} failed: {}", to, e);
        }
    }
}

#[async_trait]
impl Prober for UdpTransport {
    async fn probe(&self, peer: &Node) -> bool {
        UdpTransport::probe(self, peer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

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
    async fn test_probe_reaches_an_answering_peer() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());

        // Answer one probe on the health channel, as the responder would.
        let echo = Arc::clone(&transport);
        tokio::spawn(async move {
            if let Some(from) = echo.recv_health().await {
                echo.send_health(from, HEALTHCHECK_PAYLOAD).await;
            }
        });

        let peer = Node::new(Ipv4Addr::LOCALHOST);
        assert!(transport.probe(&peer).await);
    }

    #[tokio::test]
    async fn test_probe_times_out_on_silent_peer() {
        // Nothing reads the health channel, so no echo ever comes back.
        let transport = UdpTransport::bind(&test_config()).await.unwrap();

        let peer = Node::new(Ipv4Addr::LOCALHOST);
        assert!(!transport.probe(&peer).await);
    }

    #[tokio::test]
    async fn test_handshake_succeeds_on_any_reply() {
        let transport = Arc::new(UdpTransport::bind(&test_config()).await.unwrap());

        let ack = Arc::clone(&transport);
        tokio::spawn(async move {
            if let RecvOutcome::Datagram { from, .. } = ack.recv_control().await {
                ack.send_control(from, "ack").await;
            }
        });

        let peer = Node::new(Ipv4Addr::LOCALHOST);
        assert!(transport.handshake(&peer).await);
    }

    #[tokio::test]
    async fn test_recv_control_times_out_distinguishably() {
        let transport = UdpTransport::bind(&test_config()).await.unwrap();

        assert!(matches!(
            transport.recv_control().await,
            RecvOutcome::TimedOut
        ));
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_control_channel() {
        let receiver = UdpTransport::bind(&test_config()).await.unwrap();

        // Aim the sender's broadcasts at the receiver's control port.
        let mut sender = UdpTransport::bind(&test_config()).await.unwrap();
        sender.control_port = receiver.control_port();

        let peers = vec![Node::new(Ipv4Addr::LOCALHOST)];
        sender.broadcast(&peers, "message:hello").await;

        match receiver.recv_control().await {
            RecvOutcome::Datagram { payload, .. } => assert_eq!(payload, "message:hello"),
            other => panic!("expected datagram, got {:?}", other),
        }
    }
}
