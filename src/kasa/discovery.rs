// ABOUTME: UDP broadcast discovery for Kasa devices on the local network
// ABOUTME: Collects encrypted sysinfo replies until the deadline, deduplicated in arrival order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::time::{timeout as tokio_timeout, Instant};
use tracing::{debug, warn};

use crate::device::{DiscoveryTransport, LampDevice};
use crate::kasa::codec::{decrypt, encrypt};
use crate::kasa::device::{parse_sysinfo, KasaDevice};
use crate::kasa::DEFAULT_PORT;
use crate::types::LampError;

/// Plaintext discovery query
const DISCOVERY_QUERY: &[u8] = br#"{"system":{"get_sysinfo":{}}}"#;

/// Number of times the query is broadcast; UDP may drop any one of them
const DISCOVERY_PACKETS: usize = 3;

/// Receive buffer size; sysinfo replies are a few hundred bytes
const RECV_BUFFER_BYTES: usize = 4096;

/// Broadcast discovery for Kasa devices
pub struct KasaDiscovery {
    target: String,
    device_port: u16,
}

impl KasaDiscovery {
    /// Probe `target` (normally `255.255.255.255:9999`)
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            device_port: DEFAULT_PORT,
        }
    }

    /// TCP port used for commands to discovered devices
    #[must_use]
    pub const fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }
}

#[async_trait]
impl DiscoveryTransport for KasaDiscovery {
    async fn probe(
        &self,
        timeout: Duration,
    ) -> Result<Vec<(String, Arc<dyn LampDevice>)>, LampError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .map_err(|e| LampError::transient("discovery", format!("bind failed: {e}")))?;
        socket
            .set_broadcast(true)
            .map_err(|e| LampError::transient("discovery", format!("broadcast denied: {e}")))?;

        let query = encrypt(DISCOVERY_QUERY);
        for _ in 0..DISCOVERY_PACKETS {
            socket
                .send_to(&query, self.target.as_str())
                .await
                .map_err(|e| LampError::transient(&self.target, format!("send failed: {e}")))?;
        }

        let deadline = Instant::now() + timeout;
        let mut seen = HashSet::new();
        let mut found: Vec<(String, Arc<dyn LampDevice>)> = Vec::new();
        let mut buf = vec![0u8; RECV_BUFFER_BYTES];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let (len, from) = match tokio_timeout(remaining, socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Err(e)) => {
                    warn!(error = %e, "Discovery receive failed");
                    break;
                }
                Ok(Ok(received)) => received,
            };

            let host = from.ip().to_string();
            if seen.contains(&host) {
                continue;
            }

            let reply: Value = match serde_json::from_slice(&decrypt(&buf[..len])) {
                Ok(value) => value,
                Err(e) => {
                    debug!(%host, error = %e, "Ignoring undecodable discovery reply");
                    continue;
                }
            };

            match parse_sysinfo(&host, &reply) {
                Ok(info) => {
                    debug!(%host, alias = %info.alias, model = %info.model, "Kasa device answered");
                    let device: Arc<dyn LampDevice> = Arc::new(
                        KasaDevice::new(host.clone(), info.kind()).with_port(self.device_port),
                    );
                    seen.insert(host.clone());
                    found.push((host, device));
                }
                Err(e) => debug!(%host, error = %e, "Ignoring malformed discovery reply"),
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn collects_replies_once_per_host_skipping_noise() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let target = responder.local_addr().expect("addr").to_string();

        let reply = json!({"system": {"get_sysinfo": {
            "alias": "MCP Lamp", "model": "KL110(US)", "mic_type": "IOT.SMARTBULB",
            "is_dimmable": 1, "light_state": {"on_off": 0}
        }}});
        let reply = encrypt(reply.to_string().as_bytes());

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            for _ in 0..DISCOVERY_PACKETS {
                let (len, from) = responder.recv_from(&mut buf).await.expect("query");
                assert_eq!(decrypt(&buf[..len]), DISCOVERY_QUERY);
                responder.send_to(b"not json", from).await.expect("noise");
                responder.send_to(&reply, from).await.expect("reply");
            }
        });

        let discovery = KasaDiscovery::new(target);
        let found = discovery
            .probe(Duration::from_millis(500))
            .await
            .expect("probe");
        server.await.expect("responder");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "127.0.0.1");
        assert_eq!(found[0].1.address(), "127.0.0.1");
    }

    #[tokio::test]
    async fn silent_network_finds_nothing() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let target = silent.local_addr().expect("addr").to_string();

        let found = KasaDiscovery::new(target)
            .probe(Duration::from_millis(100))
            .await
            .expect("probe");
        assert!(found.is_empty());
        drop(silent);
    }

    #[test]
    fn device_port_override() {
        let discovery = KasaDiscovery::new("255.255.255.255:9999").with_device_port(10_000);
        assert_eq!(discovery.device_port, 10_000);
    }
}
