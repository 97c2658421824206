use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use clinrag_core::config::GeneratorSettings;
use clinrag_core::error::GenerationError;
use clinrag_core::traits::Generator;

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    /// Ollama's JSON mode: the reply content is constrained to valid JSON.
    format: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: String,
}

/// Client for a local Ollama server's `/api/chat` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(settings: &GeneratorSettings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        // Local inference server; never route through a proxy from the environment.
        let client = reqwest::Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self { client, endpoint: chat_endpoint(&settings.base_url), model: settings.model.clone(), timeout })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

/// Resolve the chat endpoint from a base URL.
pub fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/api/chat") {
        base.to_string()
    } else if base.ends_with("/api") {
        format!("{}/chat", base)
    } else {
        format!("{}/api/chat", base)
    }
}

/// Extract `message.content` from a non-streaming chat reply and parse it as
/// a JSON object.
pub fn parse_chat_reply(body: &str) -> Result<Value, GenerationError> {
    let reply: ChatReply = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(format!("chat envelope: {e}")))?;
    let value: Value = serde_json::from_str(reply.message.content.trim()).map_err(|e| GenerationError::Malformed(format!("message content: {e}")))?;
    if !value.is_object() {
        return Err(GenerationError::Malformed(format!("expected a JSON object, got {}", kind_of(&value))));
    }
    Ok(value)
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Generator for OllamaGenerator {
    async fn complete(&self, system: &str, user: &str) -> Result<Value, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            format: "json",
            messages: [ChatMessage { role: "system", content: system }, ChatMessage { role: "user", content: user }],
        };
        let to_error = |e: reqwest::Error| if e.is_timeout() { GenerationError::Timeout(self.timeout) } else { GenerationError::Transport(e.to_string()) };
        let resp = self.client.post(&self.endpoint).json(&request).send().await.map_err(to_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(to_error)?;
        if !status.is_success() {
            return Err(GenerationError::Status { status: status.as_u16(), body: body.chars().take(MAX_ERROR_BODY_CHARS).collect() });
        }
        debug!(model = %self.model, bytes = body.len(), "generator replied");
        parse_chat_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_variants() {
        assert_eq!(chat_endpoint("http://127.0.0.1:11434"), "http://127.0.0.1:11434/api/chat");
        assert_eq!(chat_endpoint("http://127.0.0.1:11434/"), "http://127.0.0.1:11434/api/chat");
        assert_eq!(chat_endpoint("http://host/api"), "http://host/api/chat");
        assert_eq!(chat_endpoint("http://host/api/chat"), "http://host/api/chat");
    }

    #[test]
    fn parses_object_content() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"summary\":\"x [C1]\",\"quotes\":[]}"},"done":true}"#;
        let v = parse_chat_reply(body).expect("object");
        assert_eq!(v["summary"], "x [C1]");
    }

    #[test]
    fn rejects_free_text_and_non_objects() {
        let free_text = r#"{"message":{"role":"assistant","content":"Metformin is first line."}}"#;
        assert!(matches!(parse_chat_reply(free_text), Err(GenerationError::Malformed(_))));
        let array = r#"{"message":{"role":"assistant","content":"[1,2]"}}"#;
        assert!(matches!(parse_chat_reply(array), Err(GenerationError::Malformed(m)) if m.contains("array")));
        assert!(matches!(parse_chat_reply("<html>bad gateway</html>"), Err(GenerationError::Malformed(_))));
    }

    #[test]
    fn request_uses_json_mode() {
        let req = ChatRequest {
            model: "llama3.2",
            stream: false,
            format: "json",
            messages: [ChatMessage { role: "system", content: "s" }, ChatMessage { role: "user", content: "u" }],
        };
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["format"], "json");
        assert_eq!(v["stream"], false);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "u");
    }
}
