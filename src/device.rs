// ABOUTME: Transport seam for lamps: the device handle and discovery probe traits
// ABOUTME: Also defines the refreshed device snapshot, the discovered record, and per-call timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Device Seam
//!
//! The acquisition core never speaks a wire protocol itself. It drives devices
//! through [`LampDevice`] handles produced by a [`DiscoveryTransport`]; the
//! [`kasa`](crate::kasa) module provides the concrete implementation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout as tokio_timeout;
use tracing::warn;

use crate::types::{DeviceCapabilities, LampError};

/// Snapshot of a device as of its most recent refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Display name configured in the vendor app
    pub alias: String,
    /// Model identifier without region suffix (e.g. `KL110`)
    pub model: String,
    /// Whether the lamp is currently on
    pub is_on: bool,
    /// Features the device reported
    pub capabilities: DeviceCapabilities,
    /// Brightness carried in the refresh reply, when the device reports one
    pub brightness: Option<u8>,
}

impl DeviceState {
    /// Create a snapshot with on/off support only
    pub fn new(alias: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            model: model.into(),
            is_on: false,
            capabilities: DeviceCapabilities::ON_OFF,
            brightness: None,
        }
    }

    /// Set the on/off state
    #[must_use]
    pub const fn with_power(mut self, is_on: bool) -> Self {
        self.is_on = is_on;
        self
    }

    /// Mark the device dimmable and record its current brightness
    #[must_use]
    pub fn with_brightness(mut self, level: u8) -> Self {
        self.capabilities = DeviceCapabilities::dimmable();
        self.brightness = Some(level);
        self
    }
}

/// Live handle to one lamp on the network
///
/// Each method is one request/response against the device. Implementations
/// report network and device failures as [`ErrorKind::TransientDevice`](crate::types::ErrorKind)
/// and undecodable replies as [`ErrorKind::Protocol`](crate::types::ErrorKind).
#[async_trait]
pub trait LampDevice: Send + Sync {
    /// Network address the device answered from
    fn address(&self) -> &str;

    /// Fetch the device's current state
    async fn refresh(&self) -> Result<DeviceState, LampError>;

    /// Switch the lamp on
    async fn turn_on(&self) -> Result<(), LampError>;

    /// Switch the lamp off
    async fn turn_off(&self) -> Result<(), LampError>;

    /// Set brightness; `level` is already validated to 0-100
    async fn set_brightness(&self, level: u8) -> Result<(), LampError>;

    /// Read the current brightness
    async fn brightness(&self) -> Result<u8, LampError>;
}

/// Time-bounded network probe enumerating reachable devices
#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    /// Probe the network, returning `(address, handle)` pairs in response order
    async fn probe(&self, timeout: Duration)
        -> Result<Vec<(String, Arc<dyn LampDevice>)>, LampError>;
}

/// One discovered device together with its live handle
#[derive(Clone)]
pub struct DeviceRecord {
    /// Address supplied by the discovery transport
    pub address: String,
    /// State as of the last successful refresh (`None` if never refreshed)
    pub state: Option<DeviceState>,
    /// Handle used to issue commands
    pub handle: Arc<dyn LampDevice>,
}

impl DeviceRecord {
    /// Wrap a freshly discovered handle that has not been refreshed yet
    pub fn new(address: impl Into<String>, handle: Arc<dyn LampDevice>) -> Self {
        Self {
            address: address.into(),
            state: None,
            handle,
        }
    }

    /// Display name, if the device has been refreshed
    pub fn alias(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.alias.as_str())
    }

    /// Model identifier, if the device has been refreshed
    pub fn model(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.model.as_str())
    }
}

impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("address", &self.address)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Run one device call, converting an elapsed `timeout` into a transient error
pub async fn call_with_timeout<T, F>(
    timeout: Duration,
    device: &str,
    operation: &str,
    call: F,
) -> Result<T, LampError>
where
    F: Future<Output = Result<T, LampError>>,
{
    tokio_timeout(timeout, call).await.unwrap_or_else(|_| {
        warn!(device, operation, ?timeout, "Device call timed out");
        Err(LampError::transient(
            device,
            format!("{operation} timed out after {timeout:?}"),
        ))
    })
}
