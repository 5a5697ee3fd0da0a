//! Shared fakes for the session-core tests.

use crate::outbound::OutboundReceiver;
use crate::ports::coordinator::{
    CoordinatorLink, EnvelopeSink, EnvelopeSource, LinkError, LinkResult,
};
use crate::ports::catalog::ModelCatalog;
use crate::ports::inference::{
    BackendError, CompletionChunk, CompletionRequest, CompletionStream, InferenceBackend,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokiame_domain::{
    ChatMessage, InboundEnvelope, MessageRole, ModelDescriptor, OutboundEnvelope, TaskInstruction,
};

pub fn model(id: &str) -> ModelDescriptor {
    ModelDescriptor {
        id: id.to_string(),
        description: String::new(),
        kind: "llm".to_string(),
        capabilities: Default::default(),
        backend_engine: "llama.cpp".to_string(),
        backend_base: "http://localhost:11434/v1".to_string(),
        status: Default::default(),
        current_load_factor: 0,
    }
}

pub fn instruction(task_id: &str, model: &str) -> TaskInstruction {
    TaskInstruction {
        task_id: task_id.to_string(),
        model: model.to_string(),
        messages: vec![ChatMessage::text(MessageRole::User, "hi")],
        temperature: None,
        top_p: None,
        max_tokens: None,
    }
}

pub fn text_chunk(content: &str) -> Result<CompletionChunk, BackendError> {
    Ok(CompletionChunk {
        delta_content: Some(content.to_string()),
        finish_reason: None,
    })
}

/// Collects whatever reaches the queue within a short grace period.
pub async fn drain(rx: &mut OutboundReceiver) -> Vec<OutboundEnvelope> {
    let mut out = Vec::new();
    while let Ok(Some(env)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
        out.push(env);
    }
    out
}

pub struct StaticCatalog(pub Vec<ModelDescriptor>);

impl ModelCatalog for StaticCatalog {
    fn snapshot(&self) -> Vec<ModelDescriptor> {
        self.0.clone()
    }
}

/// Backend whose stream replays a script of recv results, then EOF.
pub struct ScriptedBackend {
    script: Mutex<Vec<Result<CompletionChunk, BackendError>>>,
    opened: AtomicBool,
    fail_open: bool,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<CompletionChunk, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script),
            opened: AtomicBool::new(false),
            fail_open: false,
        }
    }

    pub fn failing_open() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            opened: AtomicBool::new(false),
            fail_open: true,
        }
    }

    pub fn was_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }
}

pub struct ScriptedStream {
    items: Vec<Result<CompletionChunk, BackendError>>,
}

#[async_trait]
impl CompletionStream for ScriptedStream {
    async fn recv(&mut self) -> Result<Option<CompletionChunk>, BackendError> {
        if self.items.is_empty() {
            return Ok(None);
        }
        self.items.remove(0).map(Some)
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn open_chat_stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<Box<dyn CompletionStream>, BackendError> {
        self.opened.store(true, Ordering::SeqCst);
        if self.fail_open {
            return Err(BackendError::Open("connection refused".to_string()));
        }
        let items = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::new(ScriptedStream { items }))
    }
}

/// Backend whose stream never yields until cancelled.
pub struct PendingBackend;

pub struct PendingStream;

#[async_trait]
impl CompletionStream for PendingStream {
    async fn recv(&mut self) -> Result<Option<CompletionChunk>, BackendError> {
        std::future::pending().await
    }
}

#[async_trait]
impl InferenceBackend for PendingBackend {
    async fn open_chat_stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<Box<dyn CompletionStream>, BackendError> {
        Ok(Box::new(PendingStream))
    }
}

/// Sink half backed by a channel the test reads from.
pub struct ChannelSink(pub mpsc::UnboundedSender<OutboundEnvelope>);

#[async_trait]
impl EnvelopeSink for ChannelSink {
    async fn send(&mut self, envelope: OutboundEnvelope) -> LinkResult<()> {
        self.0
            .send(envelope)
            .map_err(|_| LinkError::Send("stream closed".to_string()))
    }
}

/// Source half backed by a channel the test feeds; dropping the sender is
/// the coordinator closing the stream.
pub struct ChannelSource(pub mpsc::UnboundedReceiver<InboundEnvelope>);

#[async_trait]
impl EnvelopeSource for ChannelSource {
    async fn recv(&mut self) -> LinkResult<Option<InboundEnvelope>> {
        Ok(self.0.recv().await)
    }
}

/// The test half of one scripted link session.
pub struct SessionProbe {
    /// Envelopes the agent sent on this session's stream.
    pub sent: mpsc::UnboundedReceiver<OutboundEnvelope>,
    /// Feed for inbound envelopes; drop it to end the stream.
    pub inbound: mpsc::UnboundedSender<InboundEnvelope>,
}

impl SessionProbe {
    pub async fn next_sent(&mut self) -> OutboundEnvelope {
        tokio::time::timeout(Duration::from_secs(1), self.sent.recv())
            .await
            .expect("timed out waiting for an outbound envelope")
            .expect("stream sink dropped")
    }
}

/// Link that hands out pre-scripted sessions in order; once exhausted every
/// connect attempt fails.
pub struct ScriptedLink {
    sessions: Mutex<VecDeque<(ChannelSink, ChannelSource)>>,
    connects: AtomicUsize,
}

impl ScriptedLink {
    pub fn with_sessions(count: usize) -> (Self, Vec<SessionProbe>) {
        let mut sessions = VecDeque::new();
        let mut probes = Vec::new();
        for _ in 0..count {
            let (sent_tx, sent_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            sessions.push_back((ChannelSink(sent_tx), ChannelSource(inbound_rx)));
            probes.push(SessionProbe {
                sent: sent_rx,
                inbound: inbound_tx,
            });
        }
        (
            Self {
                sessions: Mutex::new(sessions),
                connects: AtomicUsize::new(0),
            },
            probes,
        )
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinatorLink for ScriptedLink {
    async fn connect(&self) -> LinkResult<(Box<dyn EnvelopeSink>, Box<dyn EnvelopeSource>)> {
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some((sink, source)) => {
                self.connects.fetch_add(1, Ordering::SeqCst);
                Ok((Box::new(sink), Box::new(source)))
            }
            None => Err(LinkError::Dial("no more scripted sessions".to_string())),
        }
    }
}
