//! HTTP streaming client for OpenAI-compatible chat completion endpoints.
//!
//! Runs one SSE exchange per call and converts every failure into content:
//! a user-facing apology chunk followed by the terminal event. The engine
//! therefore never needs an error branch around a streaming exchange.

use serde_json::{Value, json};

use crate::backend::{ChatBackend, ReplyStream};
use crate::config::ChatConfig;
use crate::logging;
use crate::models::{ChatMessage, ReplyEvent};
use crate::prompts::system_directive;
use crate::utils::truncate_with_ellipsis;

/// Reply substituted when no API key is configured. Checked before any
/// network attempt is made.
pub const MISSING_KEY_REPLY: &str =
    "Sorry, I'm not connected to the assistant service yet (missing API key).";

/// Reply substituted when the exchange fails in transport or remotely.
pub const FAILURE_REPLY: &str =
    "Something went wrong while reaching the assistant. Please try again later.";

/// Streaming client for the remote model.
#[must_use]
pub struct SseChatClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl SseChatClient {
    pub fn new(config: &ChatConfig) -> Self {
        logging::info(format!("Chat backend base URL: {}", config.base_url));
        Self {
            http_client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// === Trait Implementations ===

#[async_trait::async_trait]
impl ChatBackend for SseChatClient {
    fn provider_name(&self) -> &'static str {
        "sse-chat"
    }

    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        new_text: &str,
        display_name: &str,
    ) -> ReplyStream {
        let Some(api_key) = self.api_key.clone() else {
            // Fail fast through the same signaling channel as transport
            // errors: content first, then the terminal.
            logging::warn("No API key configured; substituting apology reply");
            let stream = async_stream::stream! {
                yield ReplyEvent::Chunk(MISSING_KEY_REPLY.to_string());
                yield ReplyEvent::Failed("api key not configured".to_string());
            };
            return Box::pin(stream);
        };

        let body = json!({
            "model": self.model,
            "messages": build_chat_messages(history, new_text, display_name),
            "stream": true,
        });
        let url = self.completions_url();
        let request = self.http_client.post(url).bearer_auth(api_key).json(&body);

        let stream = async_stream::stream! {
            use futures_util::StreamExt;

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    logging::warn(format!("Stream request failed: {e}"));
                    yield ReplyEvent::Chunk(FAILURE_REPLY.to_string());
                    yield ReplyEvent::Failed(format!("request failed: {e}"));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                logging::warn(format!(
                    "Stream request rejected: HTTP {status}: {}",
                    truncate_with_ellipsis(&error_text, 500, "...")
                ));
                yield ReplyEvent::Chunk(FAILURE_REPLY.to_string());
                yield ReplyEvent::Failed(format!("HTTP {status}"));
                return;
            }

            let mut line_buf = String::new();
            let mut byte_buf = Vec::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        logging::warn(format!("Stream read error: {e}"));
                        yield ReplyEvent::Chunk(FAILURE_REPLY.to_string());
                        yield ReplyEvent::Failed(format!("stream read error: {e}"));
                        return;
                    }
                };

                byte_buf.extend_from_slice(&chunk);

                // Process complete SSE lines from the buffer
                loop {
                    let buf_str = String::from_utf8_lossy(&byte_buf);
                    let Some(newline_pos) = buf_str.find('\n') else { break };
                    let line: String = buf_str[..newline_pos].trim_end_matches('\r').to_string();
                    let consumed = newline_pos + 1;
                    byte_buf = byte_buf[consumed..].to_vec();

                    if line.is_empty() {
                        // Empty line = event boundary, process accumulated data
                        if !line_buf.is_empty() {
                            let data = std::mem::take(&mut line_buf);
                            if data.trim() == "[DONE]" {
                                // Stream complete
                            } else if let Some(text) = parse_delta_text(&data) {
                                if !text.is_empty() {
                                    yield ReplyEvent::Chunk(text);
                                }
                            }
                        }
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        line_buf.push_str(data);
                    }
                    // Ignore other SSE fields (event:, id:, retry:)
                }
            }

            // Trailing event without a final blank line
            if !line_buf.is_empty() && line_buf.trim() != "[DONE]" {
                if let Some(text) = parse_delta_text(&line_buf) {
                    if !text.is_empty() {
                        yield ReplyEvent::Chunk(text);
                    }
                }
            }

            yield ReplyEvent::Done;
        };

        Box::pin(stream)
    }
}

// === Request / Response Helpers ===

/// Map the log snapshot plus the new user text into wire messages: the fixed
/// system directive first, the history in order, the new message last.
fn build_chat_messages(history: &[ChatMessage], new_text: &str, display_name: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(history.len() + 2);
    out.push(json!({
        "role": "system",
        "content": system_directive(display_name),
    }));
    for message in history {
        out.push(json!({
            "role": message.role.as_api_str(),
            "content": message.text,
        }));
    }
    out.push(json!({
        "role": "user",
        "content": new_text,
    }));
    out
}

/// Extract the text delta from one SSE data payload. Non-JSON payloads and
/// chunks without a text delta (role preambles, finish markers) yield `None`.
fn parse_delta_text(data: &str) -> Option<String> {
    let value: Value = serde_json::from_str(data).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ChatConfig {
        ChatConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            ..ChatConfig::default()
        }
    }

    async fn collect(client: &SseChatClient, history: &[ChatMessage]) -> Vec<ReplyEvent> {
        client
            .stream_reply(history, "2+2?", "Lan")
            .await
            .collect()
            .await
    }

    fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let payload = json!({"choices": [{"delta": {"content": delta}}]});
            body.push_str(&format!("data: {payload}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn chunks_arrive_in_order_then_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["4", " is the", " answer."]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = SseChatClient::new(&config_for(&server));
        let events = collect(&client, &[]).await;
        assert_eq!(
            events,
            vec![
                ReplyEvent::Chunk("4".to_string()),
                ReplyEvent::Chunk(" is the".to_string()),
                ReplyEvent::Chunk(" answer.".to_string()),
                ReplyEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn request_carries_directive_history_and_new_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse_body(&["ok"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let history = vec![ChatMessage::assistant("Hi Lan!"), ChatMessage::user("hey")];
        let client = SseChatClient::new(&config_for(&server));
        let _ = collect(&client, &history).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["stream"], json!(true));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert!(
            messages[0]["content"]
                .as_str()
                .unwrap()
                .contains("The user's name is \"Lan\".")
        );
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[3], json!({"role": "user", "content": "2+2?"}));
    }

    #[tokio::test]
    async fn server_error_becomes_apology_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = SseChatClient::new(&config_for(&server));
        let events = collect(&client, &[]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ReplyEvent::Chunk(FAILURE_REPLY.to_string()));
        assert!(matches!(events[1], ReplyEvent::Failed(_)));
    }

    #[tokio::test]
    async fn missing_api_key_fails_fast_without_network() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.api_key = None;

        let client = SseChatClient::new(&config);
        let events = collect(&client, &[]).await;
        assert_eq!(events[0], ReplyEvent::Chunk(MISSING_KEY_REPLY.to_string()));
        assert!(matches!(events[1], ReplyEvent::Failed(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_delta_payloads_are_skipped() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n\
                    data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = SseChatClient::new(&config_for(&server));
        let events = collect(&client, &[]).await;
        assert_eq!(
            events,
            vec![ReplyEvent::Chunk("hi".to_string()), ReplyEvent::Done]
        );
    }
}
