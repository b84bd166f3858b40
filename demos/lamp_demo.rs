// ABOUTME: Walk-through against a real Kasa lamp on the local network
// ABOUTME: Connects to the preferred lamp, then toggles power and brightness before switching off
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai
//
// Usage: LAMP_PREFERRED_NAME="Desk Lamp" cargo run --example lamp_demo

//! Manual end-to-end check of lamp discovery and control.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use lampctl::{CapabilityInvoker, DiscoveryTransport, KasaDiscovery, LampConfig, SessionManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match LampConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  ❌ {e}");
            process::exit(1);
        }
    };
    let transport: Arc<dyn DiscoveryTransport> =
        Arc::new(KasaDiscovery::new(config.broadcast_addr.clone()));
    let sessions = SessionManager::from_config(&config, transport);
    let invoker = CapabilityInvoker::new(config.command_timeout);

    // ── 1. Discovery & selection ──
    println!(
        "━━━ 1. Discovery & Selection ({}, up to {:?}) ━━━",
        config.broadcast_addr, config.discovery_timeout
    );
    let mut session = match sessions.ensure_connected().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("  ❌ {e}");
            process::exit(1);
        }
    };
    println!("  Name:         {}", session.alias());
    println!("  Model:        {}", session.model());
    println!("  Address:      {}", session.address());
    println!("  Capabilities: {:?}", session.capabilities());

    // ── 2. Power on ──
    println!("\n━━━ 2. Power On ━━━");
    match invoker.power_on(&session).await {
        Ok(name) => println!("  ✅ {name} is on"),
        Err(e) => eprintln!("  ❌ {e}"),
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    // ── 3. Brightness ──
    println!("\n━━━ 3. Brightness ━━━");
    if session.capabilities().supports_brightness() {
        match invoker.set_brightness(&session, 40).await {
            Ok((name, level)) => println!("  ✅ {name} dimmed to {level}"),
            Err(e) => eprintln!("  ❌ {e}"),
        }
    } else {
        println!("  ⚠️  Lamp is not dimmable, skipping");
    }

    // ── 4. Status ──
    println!("\n━━━ 4. Status ━━━");
    match invoker.get_status(&mut session).await {
        Ok(status) => print!("{status}"),
        Err(e) => eprintln!("  ❌ {e}"),
    }

    // ── 5. Power off ──
    println!("\n━━━ 5. Power Off ━━━");
    match invoker.power_off(&session).await {
        Ok(name) => println!("  ✅ {name} is off"),
        Err(e) => eprintln!("  ❌ {e}"),
    }

    drop(session);
    sessions.disconnect().await;
    println!("\n━━━ Done ━━━");
}
