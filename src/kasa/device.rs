// ABOUTME: Kasa lamp handle speaking the legacy JSON-over-TCP protocol on port 9999
// ABOUTME: Parses get_sysinfo into DeviceState and issues bulb, plug, and dimmer commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::device::{DeviceState, LampDevice};
use crate::kasa::codec::{encode_frame, read_frame};
use crate::kasa::DEFAULT_PORT;
use crate::types::{DeviceCapabilities, LampError};

/// Module and method of the sysinfo query
const SYSTEM: &str = "system";
const GET_SYSINFO: &str = "get_sysinfo";

/// Bulb lighting service
const LIGHTING_SERVICE: &str = "smartlife.iot.smartbulb.lightingservice";

/// Dimmer switch service
const DIMMER_SERVICE: &str = "smartlife.iot.dimmer";

/// Hardware family, which decides the command set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KasaKind {
    /// Smart bulb (`IOT.SMARTBULB`)
    Bulb,
    /// Plug or switch with a relay only
    Plug,
    /// Wall dimmer (`IOT.SMARTPLUGSWITCH` reporting a brightness)
    Dimmer,
}

/// Subset of the `get_sysinfo` reply this crate reads
#[derive(Debug, Clone, Deserialize)]
pub struct SysInfo {
    /// User-assigned display name
    pub alias: String,
    /// Model with region suffix, e.g. `KL110(US)`
    pub model: String,
    /// Device type on bulbs
    #[serde(default)]
    pub mic_type: Option<String>,
    /// Device type on plugs and switches
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    /// Relay state on plugs (1 = on)
    #[serde(default)]
    pub relay_state: Option<u8>,
    /// Dimmable flag on bulbs (1 = dimmable)
    #[serde(default)]
    pub is_dimmable: Option<u8>,
    /// Brightness on dimmer switches
    #[serde(default)]
    pub brightness: Option<u8>,
    /// Light state on bulbs
    #[serde(default)]
    pub light_state: Option<LightState>,
}

/// Bulb light state; when off, the last brightness lives in `dft_on_state`
#[derive(Debug, Clone, Deserialize)]
pub struct LightState {
    /// 1 = on
    pub on_off: u8,
    /// Brightness while on
    #[serde(default)]
    pub brightness: Option<u8>,
    /// Settings restored on power-up
    #[serde(default)]
    pub dft_on_state: Option<DefaultOnState>,
}

/// Settings a bulb restores when switched on
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultOnState {
    /// Brightness to restore
    #[serde(default)]
    pub brightness: Option<u8>,
}

impl SysInfo {
    /// Hardware family inferred from the type fields
    pub fn kind(&self) -> KasaKind {
        let type_field = self
            .mic_type
            .as_deref()
            .or(self.device_type.as_deref())
            .unwrap_or_default()
            .to_ascii_uppercase();

        if type_field.contains("SMARTBULB") || self.light_state.is_some() {
            KasaKind::Bulb
        } else if self.brightness.is_some() {
            KasaKind::Dimmer
        } else {
            KasaKind::Plug
        }
    }

    /// Model without the region suffix (`KL110(US)` becomes `KL110`)
    pub fn base_model(&self) -> &str {
        self.model
            .split_once('(')
            .map_or(self.model.as_str(), |(base, _)| base)
            .trim()
    }

    /// Convert to the transport-neutral snapshot
    pub fn to_state(&self) -> DeviceState {
        let (is_on, brightness, dimmable) = match self.kind() {
            KasaKind::Bulb => {
                let light = self.light_state.as_ref();
                let level = light.and_then(|l| {
                    l.brightness
                        .or_else(|| l.dft_on_state.as_ref().and_then(|d| d.brightness))
                });
                (
                    light.is_some_and(|l| l.on_off == 1),
                    level,
                    self.is_dimmable == Some(1),
                )
            }
            KasaKind::Dimmer => (self.relay_state == Some(1), self.brightness, true),
            KasaKind::Plug => (self.relay_state == Some(1), None, false),
        };

        DeviceState {
            alias: self.alias.clone(),
            model: self.base_model().to_owned(),
            is_on,
            capabilities: if dimmable {
                DeviceCapabilities::dimmable()
            } else {
                DeviceCapabilities::ON_OFF
            },
            brightness: if dimmable { brightness } else { None },
        }
    }
}

/// Extract `reply[module][method]`, failing on a non-zero `err_code`
pub fn unwrap_reply(
    device: &str,
    reply: &Value,
    module: &str,
    method: &str,
) -> Result<Value, LampError> {
    let body = reply
        .get(module)
        .and_then(|m| m.get(method))
        .ok_or_else(|| {
            LampError::protocol(format!("{device}: reply lacks {module}.{method}"))
        })?;

    match body.get("err_code").and_then(Value::as_i64) {
        None | Some(0) => Ok(body.clone()),
        Some(code) => {
            let msg = body
                .get("err_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Err(LampError::transient(
                device,
                format!("{module}.{method} failed with code {code}: {msg}"),
            ))
        }
    }
}

/// Parse a `get_sysinfo` reply
pub fn parse_sysinfo(device: &str, reply: &Value) -> Result<SysInfo, LampError> {
    let body = unwrap_reply(device, reply, SYSTEM, GET_SYSINFO)?;
    serde_json::from_value(body)
        .map_err(|e| LampError::protocol(format!("{device}: malformed sysinfo: {e}")))
}

/// Handle to one Kasa device
pub struct KasaDevice {
    host: String,
    port: u16,
    kind: KasaKind,
}

impl KasaDevice {
    /// Create a handle for a device whose family is already known
    pub fn new(host: impl Into<String>, kind: KasaKind) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            kind,
        }
    }

    /// Use a non-standard port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Send one request and return the decoded JSON reply
    async fn request(&self, payload: &Value) -> Result<Value, LampError> {
        let device = self.host.as_str();
        let frame = encode_frame(payload.to_string().as_bytes())?;

        let mut stream = TcpStream::connect((device, self.port))
            .await
            .map_err(|e| LampError::transient(device, format!("connect failed: {e}")))?;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| LampError::transient(device, format!("send failed: {e}")))?;

        let reply = read_frame(&mut stream, device).await?;
        serde_json::from_slice(&reply)
            .map_err(|e| LampError::protocol(format!("{device}: reply is not JSON: {e}")))
    }

    /// Call `module.method` with `params`, returning the method's reply body
    async fn call(&self, module: &str, method: &str, params: Value) -> Result<Value, LampError> {
        debug!(device = %self.host, module, method, "Kasa request");
        let reply = self.request(&json!({ module: { method: params } })).await?;
        unwrap_reply(&self.host, &reply, module, method)
    }

    async fn sysinfo(&self) -> Result<SysInfo, LampError> {
        let body = self.call(SYSTEM, GET_SYSINFO, json!({})).await?;
        serde_json::from_value(body)
            .map_err(|e| LampError::protocol(format!("{}: malformed sysinfo: {e}", self.host)))
    }

    async fn set_power(&self, on: bool) -> Result<(), LampError> {
        let state = u8::from(on);
        match self.kind {
            KasaKind::Bulb => {
                self.call(
                    LIGHTING_SERVICE,
                    "transition_light_state",
                    json!({"on_off": state, "ignore_default": 1, "transition_period": 0}),
                )
                .await?;
            }
            KasaKind::Plug | KasaKind::Dimmer => {
                self.call(SYSTEM, "set_relay_state", json!({ "state": state }))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LampDevice for KasaDevice {
    fn address(&self) -> &str {
        &self.host
    }

    async fn refresh(&self) -> Result<DeviceState, LampError> {
        Ok(self.sysinfo().await?.to_state())
    }

    async fn turn_on(&self) -> Result<(), LampError> {
        self.set_power(true).await
    }

    async fn turn_off(&self) -> Result<(), LampError> {
        self.set_power(false).await
    }

    async fn set_brightness(&self, level: u8) -> Result<(), LampError> {
        match self.kind {
            KasaKind::Bulb => {
                self.call(
                    LIGHTING_SERVICE,
                    "transition_light_state",
                    json!({"brightness": level, "transition_period": 0}),
                )
                .await?;
            }
            KasaKind::Dimmer => {
                self.call(DIMMER_SERVICE, "set_brightness", json!({ "brightness": level }))
                    .await?;
            }
            KasaKind::Plug => {
                return Err(LampError::unsupported(format!(
                    "{} has no brightness control",
                    self.host
                )));
            }
        }
        Ok(())
    }

    async fn brightness(&self) -> Result<u8, LampError> {
        self.sysinfo()
            .await?
            .to_state()
            .brightness
            .ok_or_else(|| LampError::protocol(format!("{}: no brightness reported", self.host)))
    }
}
