//! Local clock tool

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::ToolTrait;

/// Lets the engine work out what "today" and "tomorrow" mean
pub struct CurrentTimeTool;

#[async_trait]
impl ToolTrait for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time. Use it to decide whether a requested date is \
         today, in the future or in the past."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(format!(
            "Current local time: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }
}
