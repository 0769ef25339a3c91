//! Prompt assembly for each engine round

use chrono::Local;

use nimbus_provider::{Message, ToolCallDef};

const WEATHER_RULES: &str = r#"# Weather assistant

You answer questions about the weather. You have these tools:
- weather_now: current conditions, when the question is about today
- weather_forecast: daily forecast, when the question is about a future date
- weather_past: recorded weather, when the question is about one of the 10 days before today
- current_time: the current local date and time

Rules:
- Call one or more tools as needed, then answer the question directly.
- Do not describe which tools you used or how you got the data.
- When the user gives a date without a year or month, assume the current year and month.
- If a tool returns an error, explain the problem to the user in plain words."#;

/// Builds the system prompt and per-turn message list
pub struct ContextBuilder {
    system_prompt: Option<String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: None,
        }
    }

    /// Replace the built-in rules; the current time is still appended
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let rules = self.system_prompt.as_deref().unwrap_or(WEATHER_RULES);
        let now = Local::now().format("%Y-%m-%d %H:%M:%S (%A)");
        format!("{}\n\n## Current Time\n{}", rules, now)
    }

    /// System prompt, then history, then the new user message
    pub fn build_messages(&self, history: Vec<Message>, current_message: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.build_system_prompt())];
        messages.extend(history);
        messages.push(Message::user(current_message));
        messages
    }

    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        name: &str,
        result: &str,
    ) {
        messages.push(Message::tool(tool_call_id, name, result));
    }

    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: Vec<ToolCallDef>,
    ) {
        messages.push(Message::assistant_tool_calls(
            content.map(str::to_string),
            tool_calls,
        ));
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
