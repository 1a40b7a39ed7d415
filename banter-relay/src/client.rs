//! Streaming client for the upstream completion API

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use banter_core::config::UpstreamConfig;

use crate::base::{RelayError, RelayEvent, RelayEventStream, RelayResult};

/// Upstream chat completion request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Streamed chunk format; only the incremental text field is consumed
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Upstream completion client
///
/// Holds the connection parameters only. The API credential arrives with
/// each chat request from the browser and is passed per call, never stored.
pub struct CompletionClient {
    client: Client,
    api_base: String,
    model: String,
    temperature: f64,
}

impl CompletionClient {
    /// Create a new completion client
    pub fn new(api_base: impl Into<String>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: Client::builder()
                .http1_only() // Force HTTP/1.1 to avoid issues with some local servers
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base: api_base.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Create a client from the upstream config section
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.api_base, &config.model, config.temperature)
    }

    /// Open a streaming completion for a single user message.
    ///
    /// Fails before any body is produced if the upstream rejects the
    /// request; after that, errors surface through the returned stream.
    pub async fn chat_stream(&self, api_key: &str, message: &str) -> RelayResult<RelayEventStream> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: message.to_string(),
            }],
            stream: true,
            temperature: self.temperature,
        };

        debug!("Opening streaming completion against {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RelayError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(RelayError::HttpError(err)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                for payload in parse_sse_events(&mut buffer) {
                    if payload == "[DONE]" {
                        // Stop reading entirely. Anything still in the
                        // buffer is dropped and the sentinel itself is
                        // never forwarded as a delta.
                        let _ = tx.send(Ok(RelayEvent::Done));
                        return;
                    }

                    let parsed = match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            let _ = tx.send(Err(RelayError::JsonError(err)));
                            return;
                        }
                    };

                    if let Some(content) = parsed
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.as_ref())
                    {
                        if tx.send(Ok(RelayEvent::Delta(content.clone()))).is_err() {
                            // Receiver dropped: the client disconnected,
                            // stop reading to release the upstream body.
                            return;
                        }
                    }
                }
            }

            let _ = tx.send(Ok(RelayEvent::Done));
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

/// Split complete `data:` events out of the buffer.
///
/// Events are terminated by a blank line; a partial event, including a
/// `data:` line cut mid-chunk by the network, stays buffered for the next
/// read.
fn parse_sse_events(buffer: &mut String) -> Vec<String> {
    let mut events = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let raw = buffer[..pos].to_string();
        buffer.drain(..pos + 2);

        let mut data_lines = Vec::new();
        for line in raw.lines() {
            if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim().to_string());
            }
        }

        if !data_lines.is_empty() {
            events.push(data_lines.join("\n"));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_parse_sse_events() {
        let mut buffer =
            "data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\ntrailing".to_string();
        let events = parse_sse_events(&mut buffer);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], "{\"a\":1}");
        assert_eq!(events[1], "{\"b\":2}");
        assert_eq!(events[2], "[DONE]");
        assert_eq!(buffer, "trailing");
    }

    #[test]
    fn test_parse_sse_events_buffers_partial_line() {
        let mut buffer = "data: {\"choices\":[{\"del".to_string();
        assert!(parse_sse_events(&mut buffer).is_empty());

        buffer.push_str("ta\":{\"content\":\"Hi\"}}]}\n\n");
        let events = parse_sse_events(&mut buffer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], "{\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_parse_sse_events_ignores_non_data_lines() {
        let mut buffer = ": keep-alive\n\nevent: message\ndata: {\"a\":1}\n\n".to_string();
        let events = parse_sse_events(&mut buffer);
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    async fn collect_events(stream: RelayEventStream) -> Vec<RelayResult<RelayEvent>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_chat_stream_forwards_delta_then_done() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                 data: [DONE]\n\n\
                 data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
            )
            .create_async()
            .await;

        let client = CompletionClient::new(server.url(), "grok-beta", 0.0);
        let stream = client.chat_stream("test-key", "hello").await.unwrap();
        let events = collect_events(stream).await;

        // Exactly one delta; the sentinel stops the read loop before the
        // trailing event in the same chunk is processed.
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(RelayEvent::Delta(text)) if text == "Hi"));
        assert!(matches!(&events[1], Ok(RelayEvent::Done)));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_stream_done_when_upstream_closes_without_sentinel() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url(), "grok-beta", 0.0);
        let stream = client.chat_stream("test-key", "hello").await.unwrap();
        let events = collect_events(stream).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(RelayEvent::Delta(text)) if text == "partial"));
        assert!(matches!(&events[1], Ok(RelayEvent::Done)));
    }

    #[tokio::test]
    async fn test_chat_stream_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("{\"error\":\"invalid api key\"}")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url(), "grok-beta", 0.0);
        let result = client.chat_stream("bad-key", "hello").await;

        assert!(matches!(result, Err(RelayError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_chat_stream_fails_on_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("data: not json at all\n\n")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url(), "grok-beta", 0.0);
        let stream = client.chat_stream("test-key", "hello").await.unwrap();
        let events = collect_events(stream).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Err(RelayError::JsonError(_))));
    }

    #[tokio::test]
    async fn test_chat_stream_sends_bearer_credential_and_stream_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "grok-beta",
                "stream": true,
                "messages": [{"role": "user", "content": "hello"}],
            })))
            .with_status(200)
            .with_body("data: [DONE]\n\n")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url(), "grok-beta", 0.0);
        let stream = client.chat_stream("secret-key", "hello").await.unwrap();
        let events = collect_events(stream).await;

        assert!(matches!(&events[0], Ok(RelayEvent::Done)));
        mock.assert_async().await;
    }
}
