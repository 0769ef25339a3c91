//! OpenAI-compatible chat-completions client (DeepSeek by default)

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::{ChatParams, ChatResponse, Provider, ProviderError, Result, ToolCall, Usage};

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Engine client speaking `/chat/completions`
pub struct ChatCompletionsProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl ChatCompletionsProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }


    fn build_request(&self, params: &ChatParams) -> Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": params.messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": false,
        });

        if !params.tools.is_empty() {
            body["tools"] = json!(params.tools);
            body["tool_choice"] = json!("auto");
        }

        // The wire format carries arguments as a JSON-encoded string.
        if let Some(messages) = body["messages"].as_array_mut() {
            for message in messages {
                if let Some(calls) = message["tool_calls"].as_array_mut() {
                    for call in calls {
                        let args = &mut call["function"]["arguments"];
                        if !args.is_string() {
                            *args = Value::String(args.to_string());
                        }
                    }
                }
            }
        }

        body
    }

    fn parse_response(&self, body: Value) -> Result<ChatResponse> {
        let choice = body["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];

        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let function = &call["function"];
                        // Arguments arrive as a string; fall back to the raw value.
                        let arguments = function["arguments"]
                            .as_str()
                            .and_then(|s| serde_json::from_str(s).ok())
                            .unwrap_or_else(|| function["arguments"].clone());
                        ToolCall {
                            id: call["id"].as_str().unwrap_or_default().to_string(),
                            name: function["name"].as_str().unwrap_or_default().to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = body
            .get("usage")
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
            .unwrap_or_default();

        Ok(ChatResponse {
            content: message["content"].as_str().map(str::to_string),
            tool_calls,
            finish_reason: choice["finish_reason"]
                .as_str()
                .unwrap_or("stop")
                .to_string(),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for ChatCompletionsProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = format!("{}/chat/completions", self.api_base);
        trace!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(&params))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        let body: Value = response.json().await?;
        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api(format!("{}: {}", status, message)));
        }

        let parsed = self.parse_response(body)?;
        debug!(
            "Engine answered with {} tool call(s), finish_reason={}",
            parsed.tool_calls.len(),
            parsed.finish_reason
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }
}
