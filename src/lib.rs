// ABOUTME: Smart-lamp acquisition library: discovery, selection, session management, tool dispatch
// ABOUTME: Re-exports the session core and the TP-Link Kasa local transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Lampctl: Smart Lamp Sessions
//!
//! Finds one smart lamp on the local network, keeps a live session to it,
//! and exposes power, brightness, and status as named tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lampctl::{KasaDiscovery, LampConfig, ToolDispatcher};
//!
//! # async fn example() {
//! let config = LampConfig::default().with_preferred_name("Desk Lamp");
//! let transport = Arc::new(KasaDiscovery::new(config.broadcast_addr.clone()));
//! let dispatcher = ToolDispatcher::from_config(&config, transport);
//!
//! let response = dispatcher
//!     .dispatch("turn_lamp_on", &serde_json::json!({}))
//!     .await;
//! println!("{}", response.text);
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: `LampError`, error kinds, capability flags
//! - [`config`]: Selection preferences and timeouts
//! - [`device`]: `LampDevice` / `DiscoveryTransport` traits and device snapshots
//! - [`discovery`]: Time-bounded discovery that degrades to "nothing found"
//! - [`selector`]: Name, then model, then first-record selection
//! - [`session`]: The single live session and its reconnect state machine
//! - [`invoker`]: Power, brightness, and status operations
//! - [`dispatch`]: Tool-name routing and text responses
//! - [`kasa`]: TP-Link Kasa legacy protocol transport

/// Core types: errors and capability flags
pub mod types;

/// Selection preferences, timeouts, and environment overrides
pub mod config;
/// Device handle and discovery transport traits
pub mod device;
/// Discovery client
pub mod discovery;
/// Tool dispatcher
pub mod dispatch;
/// Capability invoker
pub mod invoker;
/// TP-Link Kasa transport
pub mod kasa;
/// Device selector
pub mod selector;
/// Session manager
pub mod session;

/// In-memory fakes for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::LampConfig;
pub use device::{DeviceRecord, DeviceState, DiscoveryTransport, LampDevice};
pub use discovery::DiscoveryClient;
pub use dispatch::{LampTool, ToolDispatcher, ToolResponse};
pub use invoker::{Brightness, CapabilityInvoker, LampStatus};
pub use kasa::{KasaDevice, KasaDiscovery};
pub use selector::{DeviceSelector, SelectionPolicy};
pub use session::{Session, SessionManager, SessionState};
pub use types::{DeviceCapabilities, ErrorKind, LampError};
