// ABOUTME: CLI entry point for the lamp MCP server binary
// ABOUTME: Parses lamp preferences and timeouts, wires Kasa discovery, and serves MCP over stdio
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lampctl::config::{default_config_path, load_config_file};
use lampctl::{KasaDiscovery, LampConfig, LampError, ToolDispatcher};
use lampctl_mcp::transport::stdio::StdioTransport;
use lampctl_mcp::transport::McpTransport;
use lampctl_mcp::McpServer;

/// lampctl-mcp: MCP server that lets an AI agent control a Kasa smart lamp
///
/// Settings are layered: built-in defaults, then the TOML config file, then
/// flags or their environment variables.
#[derive(Parser)]
#[command(name = "lampctl-mcp", version, about)]
struct Cli {
    /// TOML config file (defaults to the user config dir's lampctl/config.toml if present)
    #[arg(long, env = "LAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Display name of the lamp to prefer (as set in the Kasa app); empty disables
    #[arg(long, env = "LAMP_PREFERRED_NAME")]
    preferred_name: Option<String>,

    /// Model to prefer when no lamp has the preferred name; empty disables
    #[arg(long, env = "LAMP_PREFERRED_MODEL")]
    preferred_model: Option<String>,

    /// Seconds to wait for discovery replies
    #[arg(long, env = "LAMP_DISCOVERY_TIMEOUT")]
    discovery_timeout: Option<u64>,

    /// Seconds to wait for a single lamp command
    #[arg(long, env = "LAMP_COMMAND_TIMEOUT")]
    command_timeout: Option<u64>,

    /// Address discovery probes are broadcast to
    #[arg(long, env = "LAMP_BROADCAST_ADDR")]
    broadcast_addr: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration
    fn into_config(self) -> Result<LampConfig, LampError> {
        let path = self
            .config
            .or_else(|| default_config_path().filter(|p| p.exists()));
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                load_config_file(&path)?
            }
            None => LampConfig::default(),
        };

        if let Some(name) = self.preferred_name {
            config.preferred_name = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(model) = self.preferred_model {
            config.preferred_model = Some(model).filter(|m| !m.trim().is_empty());
        }
        if let Some(secs) = self.discovery_timeout {
            config.discovery_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(addr) = self.broadcast_addr {
            config.broadcast_addr = addr;
        }

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr to keep stdout clean for stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;

    tracing::info!(
        preferred_name = ?config.preferred_name,
        preferred_model = ?config.preferred_model,
        broadcast = %config.broadcast_addr,
        "Starting lamp MCP server"
    );

    let transport = Arc::new(KasaDiscovery::new(config.broadcast_addr.clone()));
    let dispatcher = Arc::new(ToolDispatcher::from_config(&config, transport));
    let server = Arc::new(McpServer::new(dispatcher));

    StdioTransport.serve(server).await?;

    Ok(())
}
