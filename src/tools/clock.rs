use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::{Tool, ToolOutput};
use crate::error::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reports the local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn description(&self) -> &'static str {
        "Get the current local date and time as YYYY-MM-DD HH:MM:SS."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _input: Value) -> Result<ToolOutput> {
        Ok(ToolOutput::text(Local::now().format(TIME_FORMAT).to_string()))
    }
}
