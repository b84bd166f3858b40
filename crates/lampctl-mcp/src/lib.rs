// ABOUTME: Library surface of the lamp MCP server: protocol types, server core, tools, transports
// ABOUTME: Split from the binary so integration tests can drive McpServer directly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

/// JSON-RPC and MCP wire types
pub mod protocol;
/// Request routing
pub mod server;
/// Lamp tool definitions
pub mod tools;
/// Transport backends
pub mod transport;

pub use server::McpServer;
