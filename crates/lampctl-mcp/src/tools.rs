// ABOUTME: MCP tool definitions (name, description, input schema) for the four lamp tools
// ABOUTME: Names come from lampctl's LampTool so listing and dispatch cannot drift apart
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use lampctl::invoker::MAX_BRIGHTNESS;
use lampctl::LampTool;
use serde_json::{json, Value};

use crate::protocol::ToolDefinition;

/// Schema for tools that take no arguments
fn no_arguments() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// MCP definition for one lamp tool
pub fn definition(tool: LampTool) -> ToolDefinition {
    let (description, input_schema) = match tool {
        LampTool::TurnOn => ("Turn the smart lamp ON", no_arguments()),
        LampTool::TurnOff => ("Turn the smart lamp OFF", no_arguments()),
        LampTool::SetBrightness => (
            "Set the brightness of the smart lamp (0-100%)",
            json!({
                "type": "object",
                "properties": {
                    "brightness": {
                        "type": "number",
                        "description": "Brightness level from 0 to 100",
                        "minimum": 0,
                        "maximum": MAX_BRIGHTNESS
                    }
                },
                "required": ["brightness"]
            }),
        ),
        LampTool::GetStatus => ("Get the current status of the smart lamp", no_arguments()),
    };

    ToolDefinition {
        name: tool.name(),
        description,
        input_schema,
    }
}

/// Definitions for every lamp tool, in listing order
pub fn list_definitions() -> Vec<ToolDefinition> {
    LampTool::ALL.into_iter().map(definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_all_four_tools_in_order() {
        let names: Vec<&str> = list_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "turn_lamp_on",
                "turn_lamp_off",
                "set_lamp_brightness",
                "get_lamp_status"
            ]
        );
    }

    #[test]
    fn brightness_schema_requires_bounded_number() {
        let schema = definition(LampTool::SetBrightness).input_schema;
        assert_eq!(schema["properties"]["brightness"]["type"], "number");
        assert_eq!(schema["properties"]["brightness"]["maximum"], 100);
        assert_eq!(schema["required"], json!(["brightness"]));
    }

    #[test]
    fn argumentless_tools_have_empty_schema() {
        let schema = definition(LampTool::GetStatus).input_schema;
        assert_eq!(schema["properties"], json!({}));
    }
}
