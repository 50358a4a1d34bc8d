use crate::providers::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart, Usage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ultron_common::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI chat completions API (and compatible servers).
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let openai_request = self.convert_request(request)?;

        debug!(
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("failed to parse OpenAI response: {e}")))?;

        self.convert_response(openai_response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Map a failed send (no HTTP response) onto the error taxonomy.
fn classify_transport_error(e: reqwest::Error) -> Error {
    if e.is_connect() || e.is_timeout() {
        Error::Network(format!("OpenAI request failed: {e}"))
    } else {
        Error::Agent(format!("OpenAI request failed: {e}"))
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
fn classify_status(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Authentication(format!("OpenAI rejected the API key: {body}")),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(format!("OpenAI rate limit: {body}")),
        _ => Error::Agent(format!("OpenAI API error ({status}): {body}")),
    }
}

impl OpenAiProvider {
    fn convert_request(&self, request: &LlmRequest) -> Result<OpenAiRequest> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system_prompt) = &request.system {
            messages.push(OpenAiMessage::System {
                content: system_prompt.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(self.convert_message(msg)?);
        }

        let (tools, tool_choice) = if request.tools.is_empty() {
            (None, None)
        } else {
            let tools = request
                .tools
                .iter()
                .map(|t| OpenAiTool {
                    kind: "function".to_string(),
                    function: OpenAiFunctionDefinition {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    },
                })
                .collect();
            (Some(tools), Some("auto"))
        };

        Ok(OpenAiRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            frequency_penalty: request.sampling.frequency_penalty,
            presence_penalty: request.sampling.presence_penalty,
            tools,
            tool_choice,
        })
    }

    fn convert_message(&self, msg: &ChatMessage) -> Result<OpenAiMessage> {
        match msg.role {
            ChatRole::System => Ok(OpenAiMessage::System {
                content: text_of(&msg.content),
            }),
            ChatRole::User => Ok(OpenAiMessage::User {
                content: text_of(&msg.content),
            }),
            ChatRole::Assistant => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();

                match &msg.content {
                    MessagePart::Text(t) => text_parts.push(t.clone()),
                    MessagePart::Parts(parts) => {
                        for part in parts {
                            match part {
                                ContentBlock::Text { text } => text_parts.push(text.clone()),
                                ContentBlock::ToolUse { id, name, input } => {
                                    let arguments = match input {
                                        serde_json::Value::String(raw) => raw.clone(),
                                        other => serde_json::to_string(other)?,
                                    };
                                    tool_calls.push(OpenAiToolCall {
                                        id: id.clone(),
                                        kind: "function".to_string(),
                                        function: OpenAiFunctionCall {
                                            name: name.clone(),
                                            arguments,
                                        },
                                    });
                                }
                                ContentBlock::ToolResult { .. } => {}
                            }
                        }
                    }
                }

                Ok(OpenAiMessage::Assistant {
                    content: if text_parts.is_empty() {
                        None
                    } else {
                        Some(text_parts.join("\n"))
                    },
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                })
            }
            ChatRole::Tool => {
                let (tool_call_id, content) = match &msg.content {
                    MessagePart::Parts(parts) => parts
                        .iter()
                        .find_map(|p| match p {
                            ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                            } => Some((tool_use_id.clone(), content.clone())),
                            _ => None,
                        })
                        .ok_or_else(|| {
                            Error::Agent("tool message missing tool_result content".to_string())
                        })?,
                    MessagePart::Text(_) => {
                        return Err(Error::Agent(
                            "tool message must carry a tool_result block".to_string(),
                        ));
                    }
                };

                Ok(OpenAiMessage::Tool {
                    tool_call_id,
                    content,
                })
            }
        }
    }

    fn convert_response(&self, response: OpenAiResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Agent("no choices in OpenAI response".to_string()))?;
        let message = choice.message;

        let mut content_blocks = Vec::new();

        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            content_blocks.push(ContentBlock::Text { text });
        }

        for tc in message.tool_calls.unwrap_or_default() {
            // Unparseable arguments are kept raw; the tool rejects them.
            let input: serde_json::Value = serde_json::from_str(&tc.function.arguments)
                .unwrap_or(serde_json::Value::String(tc.function.arguments));

            content_blocks.push(ContentBlock::ToolUse {
                id: tc.id,
                name: tc.function.name,
                input,
            });
        }

        Ok(LlmResponse {
            content: content_blocks,
            model: response.model,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            stop_reason: choice.finish_reason,
        })
    }
}

fn text_of(part: &MessagePart) -> String {
    match part {
        MessagePart::Text(t) => t.clone(),
        MessagePart::Parts(parts) => crate::providers::extract_text(parts),
    }
}

// Request Types
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAiMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAiToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: OpenAiFunctionCall,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: String,
    function: OpenAiFunctionDefinition,
}

#[derive(Serialize)]
struct OpenAiFunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// Response Types
#[derive(Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{SamplingParams, ToolDefinition};
    use serde_json::json;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("sk-test".into(), Some("http://localhost".into()))
    }

    fn request(tools: Vec<ToolDefinition>) -> LlmRequest {
        LlmRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::text(ChatRole::User, "hello")],
            system: Some("be nice".into()),
            max_tokens: Some(500),
            sampling: SamplingParams::default(),
            tools,
        }
    }

    #[test]
    fn system_prompt_is_the_first_message() {
        let body = serde_json::to_value(provider().convert_request(&request(vec![])).unwrap())
            .unwrap();
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "be nice"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hello"}));
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["frequency_penalty"], 0.5);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn tools_are_offered_with_auto_choice() {
        let tools = vec![ToolDefinition {
            name: "get_crypto_price".into(),
            description: "prices".into(),
            input_schema: json!({"type": "object"}),
        }];
        let body =
            serde_json::to_value(provider().convert_request(&request(tools)).unwrap()).unwrap();
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_crypto_price");
    }

    #[test]
    fn tool_round_trip_messages_convert() {
        let assistant = ChatMessage {
            role: ChatRole::Assistant,
            content: MessagePart::Parts(vec![ContentBlock::ToolUse {
                id: "call_1".into(),
                name: "get_crypto_price".into(),
                input: json!({"symbols": ["BTC"]}),
            }]),
        };
        let tool = ChatMessage {
            role: ChatRole::Tool,
            content: MessagePart::Parts(vec![ContentBlock::ToolResult {
                tool_use_id: "call_1".into(),
                content: "{\"BTC\":{}}".into(),
            }]),
        };

        let p = provider();
        let assistant = serde_json::to_value(p.convert_message(&assistant).unwrap()).unwrap();
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("content").is_none());
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            assistant["tool_calls"][0]["function"]["arguments"],
            "{\"symbols\":[\"BTC\"]}"
        );

        let tool = serde_json::to_value(p.convert_message(&tool).unwrap()).unwrap();
        assert_eq!(tool, json!({"role": "tool", "tool_call_id": "call_1", "content": "{\"BTC\":{}}"}));
    }

    #[test]
    fn tool_message_without_result_is_rejected() {
        let msg = ChatMessage::text(ChatRole::Tool, "orphan");
        assert!(provider().convert_message(&msg).is_err());
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            Error::Authentication(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            Error::Agent(_)
        ));
    }
}
