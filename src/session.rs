// ABOUTME: Owns the single live lamp session and its reconnect-on-failure state machine
// ABOUTME: Hands out a freshly refreshed session guard, re-running discovery when a refresh fails
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Session Management
//!
//! At most one [`Session`] exists per [`SessionManager`]. The slot moves
//! between three states:
//!
//! - **Empty**: no session; the next [`SessionManager::ensure_connected`]
//!   runs discovery and selection.
//! - **Live**: a session exists and was refreshed by the last call.
//! - **Refreshing**: a call is refreshing the session. On failure the session
//!   is dropped (back to Empty) and acquisition is re-run once, in the same call.
//!
//! The slot is guarded by an async mutex held for the whole lifetime of the
//! returned [`SessionGuard`], so concurrent callers are serialized and cannot
//! race to acquire two sessions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::LampConfig;
use crate::device::{call_with_timeout, DeviceRecord, DeviceState, DiscoveryTransport, LampDevice};
use crate::discovery::DiscoveryClient;
use crate::selector::{DeviceSelector, SelectionPolicy};
use crate::types::{DeviceCapabilities, LampError};

/// Message when the first acquisition finds nothing
pub const NO_LAMP_FOUND: &str =
    "No lamp found. Make sure the lamp is powered on and connected to wifi.";

/// Message when a lost session cannot be re-acquired
pub const LOST_CONNECTION: &str = "Lost connection to lamp!";

/// Exclusive borrow of the live session for the duration of one operation
pub type SessionGuard<'a> = MappedMutexGuard<'a, Session>;

/// Observable state of the session slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the next call acquires one
    Empty,
    /// A session exists
    Live,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Handle to the currently selected lamp plus its latest refreshed state
pub struct Session {
    address: String,
    handle: Arc<dyn LampDevice>,
    state: DeviceState,
}

impl Session {
    /// Promote a selected record, refreshing it if selection could not
    async fn establish(record: DeviceRecord, timeout: Duration) -> Result<Self, LampError> {
        let state = match record.state {
            Some(state) => state,
            None => {
                call_with_timeout(timeout, &record.address, "refresh", record.handle.refresh())
                    .await?
            }
        };

        Ok(Self {
            address: record.address,
            handle: record.handle,
            state,
        })
    }

    /// Re-read the device state
    ///
    /// # Errors
    ///
    /// Returns the device's error, typically
    /// [`ErrorKind::TransientDevice`](crate::types::ErrorKind).
    pub async fn refresh(&mut self, timeout: Duration) -> Result<&DeviceState, LampError> {
        self.state =
            call_with_timeout(timeout, &self.address, "refresh", self.handle.refresh()).await?;
        Ok(&self.state)
    }

    /// Network address of the lamp
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Display name as of the last refresh
    pub fn alias(&self) -> &str {
        &self.state.alias
    }

    /// Model identifier as of the last refresh
    pub fn model(&self) -> &str {
        &self.state.model
    }

    /// Power state as of the last refresh
    pub const fn is_on(&self) -> bool {
        self.state.is_on
    }

    /// Capabilities as of the last refresh
    pub const fn capabilities(&self) -> DeviceCapabilities {
        self.state.capabilities
    }

    /// Full state as of the last refresh
    pub const fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Live device handle for issuing commands
    pub fn device(&self) -> &dyn LampDevice {
        self.handle.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Owner of the single session slot
pub struct SessionManager {
    discovery: DiscoveryClient,
    selector: DeviceSelector,
    command_timeout: Duration,
    slot: Mutex<Option<Session>>,
}

impl SessionManager {
    /// Create an empty manager from its collaborators
    pub fn new(
        discovery: DiscoveryClient,
        selector: DeviceSelector,
        command_timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            selector,
            command_timeout,
            slot: Mutex::new(None),
        }
    }

    /// Wire discovery and selection from configuration
    pub fn from_config(config: &LampConfig, transport: Arc<dyn DiscoveryTransport>) -> Self {
        Self::new(
            DiscoveryClient::new(transport, config.discovery_timeout),
            DeviceSelector::new(SelectionPolicy::from_config(config), config.command_timeout),
            config.command_timeout,
        )
    }

    /// Whether a session currently exists
    pub async fn state(&self) -> SessionState {
        if self.slot.lock().await.is_some() {
            SessionState::Live
        } else {
            SessionState::Empty
        }
    }

    /// Return the live session, refreshed as of this call
    ///
    /// With no session, runs discovery and selection. With a session, refreshes
    /// it; if that fails the session is dropped and acquisition runs once more.
    /// No retries beyond that: a failed call leaves the slot empty so the next
    /// call starts from scratch.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Acquisition`](crate::types::ErrorKind) error when
    /// no lamp can be found or the lost one cannot be re-acquired.
    pub async fn ensure_connected(&self) -> Result<SessionGuard<'_>, LampError> {
        let mut slot = self.slot.lock().await;

        match slot.take() {
            None => {
                debug!(state = %SessionState::Empty, "Acquiring lamp session");
                *slot = Some(self.acquire(NO_LAMP_FOUND).await?);
            }
            Some(mut session) => {
                debug!(address = %session.address, "Refreshing lamp session");
                let refreshed = session.refresh(self.command_timeout).await.map(|_| ());
                match refreshed {
                    Ok(()) => *slot = Some(session),
                    Err(e) => {
                        warn!(
                            address = %session.address,
                            error = %e,
                            transient = e.kind.is_transient(),
                            "Lamp refresh failed, dropping session and reconnecting"
                        );
                        drop(session);
                        *slot = Some(self.acquire(LOST_CONNECTION).await?);
                    }
                }
            }
        }

        MutexGuard::try_map(slot, Option::as_mut)
            .map_err(|_| LampError::internal("Session slot empty after acquisition"))
    }

    /// Drop the current session, if any
    pub async fn disconnect(&self) {
        if let Some(session) = self.slot.lock().await.take() {
            info!(address = %session.address, "Lamp session closed");
        }
    }

    /// Run discovery and selection once, failing with `failure` when nothing usable is found
    async fn acquire(&self, failure: &str) -> Result<Session, LampError> {
        let records = self.discovery.discover().await;
        let Some(record) = self.selector.select(records).await else {
            warn!("No lamp available");
            return Err(LampError::acquisition(failure));
        };

        match Session::establish(record, self.command_timeout).await {
            Ok(session) => {
                info!(
                    address = %session.address,
                    alias = %session.state.alias,
                    model = %session.state.model,
                    "Connected to lamp"
                );
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Selected lamp did not answer");
                Err(LampError::acquisition(failure))
            }
        }
    }
}
