// ABOUTME: Concrete TP-Link Kasa transport for the legacy local protocol
// ABOUTME: Broadcast discovery over UDP and per-command TCP requests, both on port 9999
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

/// XOR autokey cipher and TCP framing
pub mod codec;
/// Device handle and sysinfo parsing
pub mod device;
/// UDP broadcast discovery
pub mod discovery;

/// Port Kasa devices listen on for both UDP discovery and TCP commands
pub const DEFAULT_PORT: u16 = 9999;

pub use device::{KasaDevice, KasaKind, SysInfo};
pub use discovery::KasaDiscovery;
