//! Inference backend port
//!
//! Defines the interface to an OpenAI-compatible chat-completions endpoint
//! in streaming mode. The task runner opens one stream per instruction and
//! pulls chunks until end-of-stream or error; everything transport-specific
//! (HTTP, SSE framing) stays behind this port.

use async_trait::async_trait;
use thiserror::Error;
use tokiame_domain::ChatMessage;

/// Errors raised while talking to a backend. Both kinds are task-scoped:
/// they surface as a single error chunk on the task and never affect the
/// coordinator session.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The streaming request could not be opened.
    #[error("backend request failed: {0}")]
    Open(String),

    /// The stream broke while receiving.
    #[error("backend stream error: {0}")]
    Recv(String),
}

/// One streaming chat-completion request, fully resolved: the runner has
/// already applied sampling defaults and picked the backend base URL from
/// the model descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub base_url: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<i32>,
}

/// One upstream chunk. Either field may be absent; a chunk with neither is
/// skipped by the runner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionChunk {
    pub delta_content: Option<String>,
    pub finish_reason: Option<String>,
}

/// An open streaming completion.
#[async_trait]
pub trait CompletionStream: Send {
    /// Receives the next chunk. `Ok(None)` means the backend finished the
    /// stream normally.
    async fn recv(&mut self) -> Result<Option<CompletionChunk>, BackendError>;
}

/// Opens streaming chat completions against a backend.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn open_chat_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Box<dyn CompletionStream>, BackendError>;
}
