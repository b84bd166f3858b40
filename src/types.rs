// ABOUTME: Core types for lamp acquisition: the error type, error kinds, and capability flags
// ABOUTME: Shared by discovery, selection, session management, invocation, and tool dispatch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Core Types
//!
//! Self-contained error and capability definitions used across the crate.
//! Every fallible operation returns [`LampError`]; the [`ErrorKind`] tells
//! callers whether a failure is worth a reconnect or should be surfaced as is.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Error Type
// ============================================================================

/// Error type for lamp discovery, session, and command operations
#[derive(Debug, Clone)]
pub struct LampError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced while acquiring or driving a lamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No device could be selected, or a lost session could not be re-acquired
    Acquisition,
    /// A tool argument was missing, of the wrong type, or out of range
    Validation,
    /// The selected device lacks the capability a command needs
    UnsupportedCapability,
    /// The dispatcher received a tool name it does not know
    UnknownTool,
    /// A single refresh or command against an otherwise-live device failed
    TransientDevice,
    /// The device replied with something that could not be decoded
    Protocol,
    /// Configuration error
    Config,
    /// Internal error (bug, unexpected state)
    Internal,
}

impl ErrorKind {
    /// Whether a session should be dropped and re-acquired after this failure
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientDevice | Self::Protocol)
    }
}

impl LampError {
    /// Create an acquisition error
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Acquisition,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    /// Create an unsupported-capability error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnsupportedCapability,
            message: message.into(),
        }
    }

    /// Create an unknown-tool error naming the rejected tool
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnknownTool,
            message: format!("Unknown tool '{}'", name.into()),
        }
    }

    /// Create a transient device error, prefixed with the failing device address
    pub fn transient(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::TransientDevice,
            message: format!("{}: {}", device.into(), message.into()),
        }
    }

    /// Create a protocol (malformed reply) error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl fmt::Display for LampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for LampError {}

// ============================================================================
// Capability Flags
// ============================================================================

bitflags::bitflags! {
    /// Optional features a lamp may support
    ///
    /// Computed once from the device's own report at refresh time and checked
    /// before any capability-specific command is issued.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DeviceCapabilities: u8 {
        /// Device can be switched on and off
        const ON_OFF = 0b0000_0001;
        /// Device accepts brightness levels 0-100
        const BRIGHTNESS = 0b0000_0010;
    }
}

impl DeviceCapabilities {
    /// Capabilities of a dimmable lamp
    #[must_use]
    pub const fn dimmable() -> Self {
        Self::ON_OFF.union(Self::BRIGHTNESS)
    }

    /// Check if brightness control is supported
    #[must_use]
    pub const fn supports_brightness(&self) -> bool {
        self.contains(Self::BRIGHTNESS)
    }
}
