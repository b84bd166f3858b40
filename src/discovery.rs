// ABOUTME: Time-bounded lamp discovery over a pluggable network transport
// ABOUTME: Transport errors and timeouts degrade to an empty result instead of failing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout as tokio_timeout;
use tracing::{debug, info, warn};

use crate::device::{DeviceRecord, DiscoveryTransport};

/// Extra time granted to a transport past its own deadline
const OVERRUN_GRACE: Duration = Duration::from_millis(500);

/// Issues discovery probes and turns the replies into [`DeviceRecord`]s
pub struct DiscoveryClient {
    transport: Arc<dyn DiscoveryTransport>,
    timeout: Duration,
}

impl DiscoveryClient {
    /// Create a client probing through `transport`, waiting at most `timeout`
    pub fn new(transport: Arc<dyn DiscoveryTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Discover reachable devices, in response order
    ///
    /// Never fails: a transport error or an overrun of the timeout is logged
    /// and reported as zero devices found.
    pub async fn discover(&self) -> Vec<DeviceRecord> {
        debug!(timeout = ?self.timeout, "Searching for lamps");

        // Transports collect replies until `timeout`; the grace period only
        // cuts off transports that overrun it.
        let probe = tokio_timeout(
            self.timeout + OVERRUN_GRACE,
            self.transport.probe(self.timeout),
        )
        .await;

        let found = match probe {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(error = %e, "Lamp discovery failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Lamp discovery timed out");
                return Vec::new();
            }
        };

        info!(count = found.len(), "Discovery finished");

        found
            .into_iter()
            .map(|(address, handle)| DeviceRecord::new(address, handle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::device::LampDevice;
    use crate::testing::{FakeDevice, FakeTransport};
    use crate::types::LampError;

    #[tokio::test]
    async fn discover_preserves_response_order() {
        let transport = FakeTransport::new(vec![
            FakeDevice::dimmable("10.0.0.2", "B", "KL110"),
            FakeDevice::dimmable("10.0.0.1", "A", "KL110"),
        ]);
        let client = DiscoveryClient::new(transport, Duration::from_secs(6));

        let records = client.discover().await;
        let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, ["10.0.0.2", "10.0.0.1"]);
        assert!(records.iter().all(|r| r.state.is_none()));
    }

    #[tokio::test]
    async fn transport_error_degrades_to_empty() {
        let transport = FakeTransport::new(vec![FakeDevice::dimmable("10.0.0.1", "A", "KL110")]);
        transport.set_fail(true);
        let client = DiscoveryClient::new(
            Arc::clone(&transport) as Arc<dyn DiscoveryTransport>,
            Duration::from_secs(6),
        );

        assert!(client.discover().await.is_empty());
        assert_eq!(transport.probe_calls.load(Ordering::SeqCst), 1);
    }

    struct HangingTransport;

    #[async_trait]
    impl DiscoveryTransport for HangingTransport {
        async fn probe(
            &self,
            _timeout: Duration,
        ) -> Result<Vec<(String, Arc<dyn LampDevice>)>, LampError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_transport_is_cut_off() {
        let client = DiscoveryClient::new(Arc::new(HangingTransport), Duration::from_secs(6));
        assert!(client.discover().await.is_empty());
    }
}
