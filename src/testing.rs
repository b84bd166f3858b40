// ABOUTME: In-memory fake discovery transport and lamp devices with call counters
// ABOUTME: Lets session, invoker, and dispatcher tests run without a network
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::device::{DeviceState, DiscoveryTransport, LampDevice};
use crate::types::LampError;

/// Scriptable lamp that records every command it receives
pub struct FakeDevice {
    address: String,
    state: Mutex<DeviceState>,
    fail_refresh: AtomicBool,
    fail_commands: AtomicBool,
    fail_brightness_read: AtomicBool,
    /// Number of `refresh` calls
    pub refresh_calls: AtomicUsize,
    /// Number of `turn_on` calls
    pub turn_on_calls: AtomicUsize,
    /// Number of `turn_off` calls
    pub turn_off_calls: AtomicUsize,
    /// Number of `set_brightness` calls
    pub set_brightness_calls: AtomicUsize,
}

impl FakeDevice {
    /// Create a fake lamp at `address` reporting `state`
    pub fn new(address: impl Into<String>, state: DeviceState) -> Arc<Self> {
        Arc::new(Self {
            address: address.into(),
            state: Mutex::new(state),
            fail_refresh: AtomicBool::new(false),
            fail_commands: AtomicBool::new(false),
            fail_brightness_read: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            turn_on_calls: AtomicUsize::new(0),
            turn_off_calls: AtomicUsize::new(0),
            set_brightness_calls: AtomicUsize::new(0),
        })
    }

    /// Shorthand for a dimmable lamp that is currently off at 50%
    pub fn dimmable(address: &str, alias: &str, model: &str) -> Arc<Self> {
        Self::new(address, DeviceState::new(alias, model).with_brightness(50))
    }

    /// Make subsequent refreshes fail (or succeed again)
    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent on/off/brightness commands fail
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent brightness reads fail
    pub fn set_fail_brightness_read(&self, fail: bool) {
        self.fail_brightness_read.store(fail, Ordering::SeqCst);
    }

    /// Current simulated device state
    pub fn state(&self) -> DeviceState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_commands(&self) -> Result<(), LampError> {
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(LampError::transient(&self.address, "command rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl LampDevice for FakeDevice {
    fn address(&self) -> &str {
        &self.address
    }

    async fn refresh(&self) -> Result<DeviceState, LampError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(LampError::transient(&self.address, "host unreachable"));
        }
        Ok(self.state())
    }

    async fn turn_on(&self) -> Result<(), LampError> {
        self.turn_on_calls.fetch_add(1, Ordering::SeqCst);
        self.check_commands()?;
        self.lock_state().is_on = true;
        Ok(())
    }

    async fn turn_off(&self) -> Result<(), LampError> {
        self.turn_off_calls.fetch_add(1, Ordering::SeqCst);
        self.check_commands()?;
        self.lock_state().is_on = false;
        Ok(())
    }

    async fn set_brightness(&self, level: u8) -> Result<(), LampError> {
        self.set_brightness_calls.fetch_add(1, Ordering::SeqCst);
        self.check_commands()?;
        self.lock_state().brightness = Some(level);
        Ok(())
    }

    async fn brightness(&self) -> Result<u8, LampError> {
        if self.fail_brightness_read.load(Ordering::SeqCst) {
            return Err(LampError::transient(&self.address, "brightness unavailable"));
        }
        self.lock_state()
            .brightness
            .ok_or_else(|| LampError::protocol("no brightness reported"))
    }
}

/// Discovery transport answering with a fixed, replaceable device list
pub struct FakeTransport {
    devices: Mutex<Vec<Arc<FakeDevice>>>,
    fail: AtomicBool,
    /// Number of `probe` calls
    pub probe_calls: AtomicUsize,
}

impl FakeTransport {
    /// Create a transport that discovers `devices` in the given order
    pub fn new(devices: Vec<Arc<FakeDevice>>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
            fail: AtomicBool::new(false),
            probe_calls: AtomicUsize::new(0),
        })
    }

    /// Transport on which nothing ever answers
    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Replace the devices seen by subsequent probes
    pub fn set_devices(&self, devices: Vec<Arc<FakeDevice>>) {
        *self.devices.lock().unwrap_or_else(PoisonError::into_inner) = devices;
    }

    /// Make subsequent probes fail at the transport level
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of probes issued so far
    pub fn probes(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryTransport for FakeTransport {
    async fn probe(
        &self,
        _timeout: Duration,
    ) -> Result<Vec<(String, Arc<dyn LampDevice>)>, LampError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        // Let other tasks run mid-probe, like a real broadcast wait
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(LampError::transient("broadcast", "network unreachable"));
        }
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(devices
            .iter()
            .map(|d| {
                let handle: Arc<dyn LampDevice> = Arc::clone(d) as Arc<dyn LampDevice>;
                (d.address().to_owned(), handle)
            })
            .collect())
    }
}
