use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_input, Tool, ToolOutput};
use crate::error::Result;
use crate::probe::{check_port_async, DEFAULT_PROBE_HOST};

/// Checks whether a TCP port accepts connections.
#[derive(Debug, Clone)]
pub struct CheckPortTool {
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CheckPortInput {
    port: u16,
    #[serde(default)]
    destination: Option<String>,
}

impl CheckPortTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Tool for CheckPortTool {
    fn name(&self) -> &'static str {
        "check_port_open"
    }

    fn description(&self) -> &'static str {
        "Check whether a TCP port on a host accepts connections. Exit code 0 means open."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "port": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 65535,
                    "description": "Port to check"
                },
                "destination": {
                    "type": "string",
                    "description": format!("Host name or address (default: {})", DEFAULT_PROBE_HOST)
                }
            },
            "required": ["port"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: CheckPortInput = parse_input(self.name(), input)?;
        let host = input
            .destination
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROBE_HOST.to_string());

        let probe = check_port_async(host, input.port, self.timeout).await;
        ToolOutput::json(&probe.into_command_result())
    }
}
