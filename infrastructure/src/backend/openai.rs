//! OpenAI-compatible streaming chat-completions client.
//!
//! Implements the inference backend port over `POST {base}/chat/completions`
//! with `stream: true`, consuming the `text/event-stream` response one event
//! at a time. The stream ends on the `[DONE]` sentinel or when the server
//! closes the connection; either way the port reports a clean EOF and the
//! runner emits its own final chunk.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource, RequestBuilderExt};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tokiame_application::{
    BackendError, CompletionChunk, CompletionRequest, CompletionStream, InferenceBackend,
};
use tokiame_domain::{ChatMessage, ContentPart, MessageContent, MessageRole};

pub struct OpenAiBackend {
    client: reqwest::Client,
    /// Bearer token, if the backends expect one. Local servers usually take
    /// any non-empty value or none at all.
    api_key: Option<String>,
}

impl OpenAiBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct RequestBody {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i32>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Serialize)]
struct WireImageUrl {
    url: String,
}

/// Roles the wire knows about; anything else is sent as `assistant`.
fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::System => "system",
        MessageRole::Assistant | MessageRole::Tool => "assistant",
    }
}

fn message_to_wire(message: ChatMessage) -> WireMessage {
    let content = match message.content {
        MessageContent::Text(text) => WireContent::Text(text),
        MessageContent::Parts(parts) => WireContent::Parts(
            parts
                .into_iter()
                .map(|part| match part {
                    ContentPart::Text(text) => WirePart::Text { text },
                    ContentPart::ImageUrl(url) => WirePart::ImageUrl {
                        image_url: WireImageUrl { url },
                    },
                })
                .collect(),
        ),
    };
    WireMessage {
        role: role_name(message.role),
        content,
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl InferenceBackend for OpenAiBackend {
    async fn open_chat_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Box<dyn CompletionStream>, BackendError> {
        let url = format!(
            "{}/chat/completions",
            request.base_url.trim_end_matches('/')
        );
        debug!(%url, model = %request.model, "opening chat completion stream");

        let body = RequestBody {
            model: request.model,
            messages: request.messages.into_iter().map(message_to_wire).collect(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stream: true,
        };

        let mut builder = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let events = builder
            .eventsource()
            .map_err(|e| BackendError::Open(e.to_string()))?;
        Ok(Box::new(SseCompletionStream { events }))
    }
}

struct SseCompletionStream {
    events: EventSource,
}

#[async_trait]
impl CompletionStream for SseCompletionStream {
    async fn recv(&mut self) -> Result<Option<CompletionChunk>, BackendError> {
        loop {
            match self.events.next().await {
                None => return Ok(None),
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) => {
                    if message.data == "[DONE]" {
                        self.events.close();
                        return Ok(None);
                    }
                    let parsed: StreamChunk = serde_json::from_str(&message.data)
                        .map_err(|e| BackendError::Recv(format!("malformed stream data: {e}")))?;
                    let chunk = match parsed.choices.into_iter().next() {
                        Some(choice) => CompletionChunk {
                            delta_content: choice.delta.content,
                            finish_reason: choice.finish_reason,
                        },
                        None => CompletionChunk::default(),
                    };
                    return Ok(Some(chunk));
                }
                Some(Err(EventSourceError::StreamEnded)) => {
                    self.events.close();
                    return Ok(None);
                }
                Some(Err(EventSourceError::InvalidStatusCode(status, response))) => {
                    let detail = response.text().await.unwrap_or_default();
                    self.events.close();
                    return Err(BackendError::Recv(format!("status {status}: {detail}")));
                }
                Some(Err(e)) => {
                    self.events.close();
                    return Err(BackendError::Recv(e.to_string()));
                }
            }
        }
    }
}
