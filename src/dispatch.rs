// ABOUTME: Protocol-facing tool dispatcher mapping tool names and JSON arguments to lamp operations
// ABOUTME: Every outcome, success or failure, becomes a single text response; nothing escapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::LampConfig;
use crate::device::DiscoveryTransport;
use crate::invoker::CapabilityInvoker;
use crate::session::SessionManager;
use crate::types::LampError;

/// Prefix marking a failed tool call; callers pattern-match on it
pub const ERROR_PREFIX: &str = "Error: ";

/// The lamp tools exposed to agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LampTool {
    /// `turn_lamp_on`
    TurnOn,
    /// `turn_lamp_off`
    TurnOff,
    /// `set_lamp_brightness`
    SetBrightness,
    /// `get_lamp_status`
    GetStatus,
}

impl LampTool {
    /// All tools, in listing order
    pub const ALL: [Self; 4] = [
        Self::TurnOn,
        Self::TurnOff,
        Self::SetBrightness,
        Self::GetStatus,
    ];

    /// Wire name of the tool
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_lamp_on",
            Self::TurnOff => "turn_lamp_off",
            Self::SetBrightness => "set_lamp_brightness",
            Self::GetStatus => "get_lamp_status",
        }
    }

    /// Look a tool up by its wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }
}

impl fmt::Display for LampTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text result of one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    /// Message shown to the caller
    pub text: String,
    /// Whether `text` describes a failure (it then starts with [`ERROR_PREFIX`])
    pub is_error: bool,
}

impl ToolResponse {
    /// Successful response
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Failure response carrying the error's message
    pub fn failure(error: &LampError) -> Self {
        Self {
            text: format!("{ERROR_PREFIX}{}", error.message),
            is_error: true,
        }
    }
}

/// A tool call whose arguments have been converted to typed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolCall {
    TurnOn,
    TurnOff,
    SetBrightness(i64),
    GetStatus,
}

impl ToolCall {
    fn from_arguments(tool: LampTool, arguments: &Value) -> Result<Self, LampError> {
        Ok(match tool {
            LampTool::TurnOn => Self::TurnOn,
            LampTool::TurnOff => Self::TurnOff,
            LampTool::SetBrightness => Self::SetBrightness(parse_brightness(arguments)?),
            LampTool::GetStatus => Self::GetStatus,
        })
    }
}

/// Coerce the `brightness` argument to an integer, truncating fractions
fn parse_brightness(arguments: &Value) -> Result<i64, LampError> {
    let invalid = || LampError::validation("Brightness must be a number between 0 and 100.");

    match arguments.get("brightness") {
        None | Some(Value::Null) => Err(LampError::validation(
            "Missing required argument 'brightness'.",
        )),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Routes tool calls through the session manager to the capability invoker
pub struct ToolDispatcher {
    sessions: SessionManager,
    invoker: CapabilityInvoker,
}

impl ToolDispatcher {
    /// Create a dispatcher from its collaborators
    pub const fn new(sessions: SessionManager, invoker: CapabilityInvoker) -> Self {
        Self { sessions, invoker }
    }

    /// Wire the whole acquisition stack from configuration
    pub fn from_config(config: &LampConfig, transport: Arc<dyn DiscoveryTransport>) -> Self {
        Self::new(
            SessionManager::from_config(config, transport),
            CapabilityInvoker::new(config.command_timeout),
        )
    }

    /// Session manager backing this dispatcher
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Run the named tool and render its outcome as text
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> ToolResponse {
        match self.run(name, arguments).await {
            Ok(text) => {
                debug!(tool = name, "Tool call succeeded");
                ToolResponse::success(text)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolResponse::failure(&e)
            }
        }
    }

    /// Unknown names and malformed arguments are rejected before any device traffic
    ///
    /// Validation runs before `ensure_connected`, so with no lamp on the network an
    /// out-of-range brightness reports the range error instead of "No lamp found".
    async fn run(&self, name: &str, arguments: &Value) -> Result<String, LampError> {
        let tool = LampTool::parse(name).ok_or_else(|| LampError::unknown_tool(name))?;
        let call = ToolCall::from_arguments(tool, arguments)?;

        let mut session = self.sessions.ensure_connected().await?;

        match call {
            ToolCall::TurnOn => {
                let lamp = self.invoker.power_on(&session).await?;
                Ok(format!("Lamp {lamp} turned ON successfully."))
            }
            ToolCall::TurnOff => {
                let lamp = self.invoker.power_off(&session).await?;
                Ok(format!("Lamp {lamp} turned OFF successfully."))
            }
            ToolCall::SetBrightness(level) => {
                let (lamp, level) = self.invoker.set_brightness(&session, level).await?;
                Ok(format!("Lamp {lamp} brightness got set to {level}."))
            }
            ToolCall::GetStatus => {
                let status = self.invoker.get_status(&mut session).await?;
                Ok(status.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::session::SessionState;
    use crate::testing::{FakeDevice, FakeTransport};

    fn dispatcher(transport: &Arc<FakeTransport>) -> ToolDispatcher {
        ToolDispatcher::from_config(
            &LampConfig::default(),
            Arc::clone(transport) as Arc<dyn DiscoveryTransport>,
        )
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in LampTool::ALL {
            assert_eq!(LampTool::parse(tool.name()), Some(tool));
        }
        assert_eq!(LampTool::parse("TURN_LAMP_ON"), None);
    }

    #[test]
    fn brightness_coercion() {
        assert_eq!(parse_brightness(&json!({"brightness": 40})).ok(), Some(40));
        assert_eq!(parse_brightness(&json!({"brightness": 40.9})).ok(), Some(40));
        assert_eq!(parse_brightness(&json!({"brightness": " 75 "})).ok(), Some(75));
        assert_eq!(parse_brightness(&json!({"brightness": 150})).ok(), Some(150));
        assert!(parse_brightness(&json!({"brightness": "bright"})).is_err());
        assert!(parse_brightness(&json!({"brightness": true})).is_err());
        assert!(parse_brightness(&json!({})).is_err());
    }

    #[tokio::test]
    async fn unknown_tool_touches_nothing() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        let transport = FakeTransport::new(vec![Arc::clone(&lamp)]);
        let dispatcher = dispatcher(&transport);

        let response = dispatcher.dispatch("unknown_tool", &json!({})).await;
        assert!(response.is_error);
        assert_eq!(response.text, "Error: Unknown tool 'unknown_tool'");
        assert_eq!(transport.probes(), 0);
        assert_eq!(lamp.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn turn_on_selects_preferred_lamp() {
        let desk = FakeDevice::dimmable("10.0.0.1", "Desk Lamp", "KL110");
        let mcp = FakeDevice::dimmable("10.0.0.2", "MCP Lamp", "KL110");
        let transport = FakeTransport::new(vec![Arc::clone(&desk), Arc::clone(&mcp)]);
        let dispatcher = dispatcher(&transport);

        let response = dispatcher.dispatch("turn_lamp_on", &json!({})).await;
        assert_eq!(response, ToolResponse::success("Lamp MCP Lamp turned ON successfully."));
        assert_eq!(mcp.turn_on_calls.load(Ordering::SeqCst), 1);
        assert_eq!(desk.turn_on_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn turn_off_reports_alias() {
        let transport = FakeTransport::new(vec![FakeDevice::dimmable("a", "MCP Lamp", "KL110")]);
        let response = dispatcher(&transport)
            .dispatch("turn_lamp_off", &json!({}))
            .await;
        assert_eq!(response.text, "Lamp MCP Lamp turned OFF successfully.");
    }

    #[tokio::test]
    async fn brightness_range_is_checked_before_discovery() {
        let transport = FakeTransport::empty();
        let response = dispatcher(&transport)
            .dispatch("set_lamp_brightness", &json!({"brightness": 150}))
            .await;

        assert_eq!(response.text, "Error: Brightness must be between 0 and 100.");
        assert_eq!(transport.probes(), 0);
    }

    #[tokio::test]
    async fn brightness_out_of_range_is_error_without_command() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        let transport = FakeTransport::new(vec![Arc::clone(&lamp)]);
        let response = dispatcher(&transport)
            .dispatch("set_lamp_brightness", &json!({"brightness": 150}))
            .await;

        assert!(response.text.starts_with("Error:"));
        assert_eq!(response.text, "Error: Brightness must be between 0 and 100.");
        assert_eq!(lamp.set_brightness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn brightness_success_message() {
        let transport = FakeTransport::new(vec![FakeDevice::dimmable("a", "MCP Lamp", "KL110")]);
        let response = dispatcher(&transport)
            .dispatch("set_lamp_brightness", &json!({"brightness": 40}))
            .await;
        assert_eq!(response.text, "Lamp MCP Lamp brightness got set to 40.");
    }

    #[tokio::test]
    async fn no_lamp_yields_acquisition_error_text() {
        let transport = FakeTransport::empty();
        let dispatcher = dispatcher(&transport);

        let response = dispatcher.dispatch("get_lamp_status", &json!({})).await;
        assert!(response.is_error);
        assert!(response.text.starts_with("Error: No lamp found"));
        assert_eq!(dispatcher.sessions().state().await, SessionState::Empty);
    }

    #[tokio::test]
    async fn device_failure_becomes_error_text() {
        let lamp = FakeDevice::dimmable("10.0.0.5", "MCP Lamp", "KL110");
        lamp.set_fail_commands(true);
        let transport = FakeTransport::new(vec![lamp]);
        let response = dispatcher(&transport)
            .dispatch("turn_lamp_on", &json!({}))
            .await;
        assert!(response.is_error);
        assert!(response.text.starts_with("Error: 10.0.0.5:"));
    }
}
