// ABOUTME: Typed lamp operations (power, brightness, status) against the live session
// ABOUTME: Enforces the brightness range and capability checks before any command is sent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::device::call_with_timeout;
use crate::session::Session;
use crate::types::LampError;

/// Highest accepted brightness level
pub const MAX_BRIGHTNESS: u8 = 100;

/// Brightness level validated to the inclusive range 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Brightness(u8);

impl Brightness {
    /// Validate a raw level
    ///
    /// # Errors
    ///
    /// Returns a validation error when `level` is outside 0-100.
    pub fn new(level: i64) -> Result<Self, LampError> {
        u8::try_from(level)
            .ok()
            .filter(|l| *l <= MAX_BRIGHTNESS)
            .map(Self)
            .ok_or_else(|| LampError::validation("Brightness must be between 0 and 100."))
    }

    /// Level as a percentage
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lamp status report produced by [`CapabilityInvoker::get_status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LampStatus {
    /// Display name
    pub name: String,
    /// Model identifier
    pub model: String,
    /// Whether the lamp is on
    pub is_on: bool,
    /// Current brightness, when supported and readable
    pub brightness: Option<u8>,
}

impl fmt::Display for LampStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lamp Status:")?;
        writeln!(f, " Name: {}", self.name)?;
        writeln!(f, " Model: {}", self.model)?;
        writeln!(f, " State: {}", if self.is_on { "ON" } else { "OFF" })?;
        if let Some(level) = self.brightness {
            writeln!(f, " Brightness: {level}")?;
        }
        Ok(())
    }
}

/// Translates typed operations into calls on the session's device handle
pub struct CapabilityInvoker {
    command_timeout: Duration,
}

impl CapabilityInvoker {
    /// Create an invoker bounding each device call by `command_timeout`
    pub const fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// Switch the lamp on, returning its display name
    pub async fn power_on(&self, session: &Session) -> Result<String, LampError> {
        call_with_timeout(
            self.command_timeout,
            session.address(),
            "turn_on",
            session.device().turn_on(),
        )
        .await?;
        info!(lamp = session.alias(), "Lamp turned on");
        Ok(session.alias().to_owned())
    }

    /// Switch the lamp off, returning its display name
    pub async fn power_off(&self, session: &Session) -> Result<String, LampError> {
        call_with_timeout(
            self.command_timeout,
            session.address(),
            "turn_off",
            session.device().turn_off(),
        )
        .await?;
        info!(lamp = session.alias(), "Lamp turned off");
        Ok(session.alias().to_owned())
    }

    /// Set brightness, returning the display name and the applied level
    ///
    /// # Errors
    ///
    /// Fails with a validation error for levels outside 0-100 and with an
    /// unsupported-capability error for lamps that cannot dim; neither case
    /// sends anything to the device.
    pub async fn set_brightness(
        &self,
        session: &Session,
        level: i64,
    ) -> Result<(String, Brightness), LampError> {
        let level = Brightness::new(level)?;

        if !session.capabilities().supports_brightness() {
            return Err(LampError::unsupported(
                "The lamp does not support brightness adjustment.",
            ));
        }

        call_with_timeout(
            self.command_timeout,
            session.address(),
            "set_brightness",
            session.device().set_brightness(level.get()),
        )
        .await?;
        info!(lamp = session.alias(), level = level.get(), "Lamp brightness set");
        Ok((session.alias().to_owned(), level))
    }

    /// Refresh the session and report name, model, power, and brightness
    ///
    /// A failed brightness read only omits the brightness line.
    pub async fn get_status(&self, session: &mut Session) -> Result<LampStatus, LampError> {
        session.refresh(self.command_timeout).await?;

        let brightness = if session.capabilities().supports_brightness() {
            match call_with_timeout(
                self.command_timeout,
                session.address(),
                "brightness",
                session.device().brightness(),
            )
            .await
            {
                Ok(level) => Some(level),
                Err(e) => {
                    debug!(error = %e, "Brightness unreadable, omitting from status");
                    None
                }
            }
        } else {
            None
        };

        Ok(LampStatus {
            name: session.alias().to_owned(),
            model: session.model().to_owned(),
            is_on: session.is_on(),
            brightness,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::config::LampConfig;
    use crate::device::{DeviceState, DiscoveryTransport};
    use crate::session::SessionManager;
    use crate::testing::{FakeDevice, FakeTransport};
    use crate::types::ErrorKind;

    fn sessions_for(lamp: &Arc<FakeDevice>) -> SessionManager {
        let transport = FakeTransport::new(vec![Arc::clone(lamp)]) as Arc<dyn DiscoveryTransport>;
        SessionManager::from_config(&LampConfig::default(), transport)
    }

    fn invoker() -> CapabilityInvoker {
        CapabilityInvoker::new(Duration::from_secs(6))
    }

    #[test]
    fn brightness_range_is_inclusive() {
        assert_eq!(Brightness::new(0).map(Brightness::get).ok(), Some(0));
        assert_eq!(Brightness::new(100).map(Brightness::get).ok(), Some(100));
        assert!(Brightness::new(-1).is_err());
        assert!(Brightness::new(101).is_err());
        assert!(Brightness::new(i64::MAX).is_err());
    }

    #[tokio::test]
    async fn power_on_returns_alias_and_commands_once() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        let sessions = sessions_for(&lamp);
        let session = sessions.ensure_connected().await.expect("connected");

        let name = invoker().power_on(&session).await.expect("on");
        assert_eq!(name, "MCP Lamp");
        assert_eq!(lamp.turn_on_calls.load(Ordering::SeqCst), 1);
        assert!(lamp.state().is_on);
    }

    #[tokio::test]
    async fn power_off_propagates_device_failure() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        lamp.set_fail_commands(true);
        let sessions = sessions_for(&lamp);
        let session = sessions.ensure_connected().await.expect("connected");

        let err = invoker().power_off(&session).await.expect_err("rejected");
        assert_eq!(err.kind, ErrorKind::TransientDevice);
    }

    #[tokio::test]
    async fn out_of_range_brightness_sends_nothing() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        let sessions = sessions_for(&lamp);
        let session = sessions.ensure_connected().await.expect("connected");

        for level in [-5, 101, 150] {
            let err = invoker()
                .set_brightness(&session, level)
                .await
                .expect_err("out of range");
            assert_eq!(err.kind, ErrorKind::Validation);
        }
        assert_eq!(lamp.set_brightness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn brightness_on_plain_lamp_is_unsupported() {
        let lamp = FakeDevice::new("10.0.0.5", DeviceState::new("Plug", "HS100"));
        let sessions = sessions_for(&lamp);
        let session = sessions.ensure_connected().await.expect("connected");

        let err = invoker()
            .set_brightness(&session, 40)
            .await
            .expect_err("cannot dim");
        assert_eq!(err.kind, ErrorKind::UnsupportedCapability);
        assert_eq!(lamp.set_brightness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_brightness_forwards_level() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        let sessions = sessions_for(&lamp);
        let session = sessions.ensure_connected().await.expect("connected");

        let (name, level) = invoker().set_brightness(&session, 40).await.expect("dimmed");
        assert_eq!(name, "MCP Lamp");
        assert_eq!(level.get(), 40);
        assert_eq!(lamp.state().brightness, Some(40));
    }

    #[tokio::test]
    async fn status_reports_fresh_state() {
        let lamp = FakeDevice::new(
            "10.0.0.5",
            DeviceState::new("MCP Lamp", "KL110")
                .with_brightness(70)
                .with_power(true),
        );
        let sessions = sessions_for(&lamp);
        let mut session = sessions.ensure_connected().await.expect("connected");

        let status = invoker().get_status(&mut session).await.expect("status");
        assert_eq!(
            status.to_string(),
            "Lamp Status:\n Name: MCP Lamp\n Model: KL110\n State: ON\n Brightness: 70\n"
        );
    }

    #[tokio::test]
    async fn unreadable_brightness_is_omitted() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        lamp.set_fail_brightness_read(true);
        let sessions = sessions_for(&lamp);
        let mut session = sessions.ensure_connected().await.expect("connected");

        let status = invoker().get_status(&mut session).await.expect("status");
        assert!(status.brightness.is_none());
        assert!(!status.to_string().contains("Brightness"));
        assert!(status.to_string().contains("State: OFF"));
    }
}
