//! Tools callable by the reasoning engine

pub mod time;
pub mod weather;

pub use time::CurrentTimeTool;
pub use weather::{weather_client, WeatherForecastTool, WeatherNowTool, WeatherPastTool};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nimbus_provider::Tool;
use nimbus_weather::ResponseAssembler;
use serde_json::Value;

use crate::AgentError;

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    /// Usage hint shown to the engine
    fn description(&self) -> &str;
    /// JSON schema of the arguments
    fn parameters(&self) -> Value;
    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Engine-facing definitions, sorted by name
    pub fn definitions(&self) -> Vec<Tool> {
        let mut defs: Vec<Tool> = self
            .tools
            .values()
            .map(|t| to_provider_tool(t.as_ref()))
            .collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    pub async fn execute(&self, name: &str, args: Value) -> crate::Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(args)
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the three weather tools and `current_time`
pub fn register_weather_tools(registry: &mut ToolRegistry, assembler: Arc<ResponseAssembler>) {
    registry.register(WeatherNowTool::new(assembler.clone()));
    registry.register(WeatherForecastTool::new(assembler.clone()));
    registry.register(WeatherPastTool::new(assembler));
    registry.register(CurrentTimeTool);
}
