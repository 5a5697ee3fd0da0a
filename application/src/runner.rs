//! Task runner — drives one instruction against its backend.
//!
//! For each accepted [`TaskInstruction`] the runner resolves the model,
//! opens a streaming completion, and forwards chunks as envelopes until the
//! backend finishes or fails. Per task the coordinator observes the sequence
//! `(Chunk)* (final | error)?` — cancellation is silent on the wire.

use crate::outbound::OutboundQueue;
use crate::ports::catalog::ModelCatalog;
use crate::ports::inference::{CompletionRequest, InferenceBackend};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tokiame_domain::envelope::FINISH_REASON_STOP;
use tokiame_domain::{OutboundEnvelope, TaskInstruction};

/// Upstream finish reasons are sometimes the literal string "null"; treat it
/// as absent.
fn effective_finish_reason(reason: Option<String>) -> Option<String> {
    reason.filter(|r| !r.is_empty() && r != "null")
}

/// Spawned once per accepted instruction; owns the full lifecycle of one
/// chat-completion stream.
pub struct TaskRunner {
    catalog: Arc<dyn ModelCatalog>,
    backend: Arc<dyn InferenceBackend>,
    queue: OutboundQueue,
    default_temperature: f32,
    default_top_p: f32,
}

impl TaskRunner {
    pub fn new(
        catalog: Arc<dyn ModelCatalog>,
        backend: Arc<dyn InferenceBackend>,
        queue: OutboundQueue,
        default_temperature: f32,
        default_top_p: f32,
    ) -> Self {
        Self {
            catalog,
            backend,
            queue,
            default_temperature,
            default_top_p,
        }
    }

    /// Runs one task to completion. Emits at most one terminal envelope;
    /// emits nothing once `cancel` fires.
    pub async fn run(&self, instruction: TaskInstruction, cancel: CancellationToken) {
        let task_id = instruction.task_id.clone();
        debug!(task_id, model = %instruction.model, "starting task stream");

        // Fresh snapshot per task; later registry changes do not affect us.
        let Some(descriptor) = self.catalog.find(&instruction.model) else {
            error!(task_id, model = %instruction.model, "model not registered");
            let detail = format!(
                "Model {} not supported by this Tokiame instance",
                instruction.model
            );
            self.report_error(&task_id, detail, &cancel).await;
            return;
        };

        let request = CompletionRequest {
            base_url: descriptor.backend_base,
            model: instruction.model,
            messages: instruction.messages,
            temperature: instruction.temperature.unwrap_or(self.default_temperature),
            top_p: instruction.top_p.unwrap_or(self.default_top_p),
            max_tokens: instruction.max_tokens,
        };

        if cancel.is_cancelled() {
            info!(task_id, "task cancelled before backend open");
            return;
        }

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task_id, "task cancelled while opening backend stream");
                return;
            }
            opened = self.backend.open_chat_stream(request) => match opened {
                Ok(stream) => stream,
                Err(e) => {
                    error!(task_id, "failed to open backend stream: {e}");
                    self.report_error(&task_id, format!("Internal error creating backend stream: {e}"), &cancel)
                        .await;
                    return;
                }
            },
        };

        let mut chunks_sent = 0usize;
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task_id, chunks_sent, "task cancelled, stopping backend recv");
                    return;
                }
                received = stream.recv() => received,
            };

            match received {
                Ok(None) => {
                    info!(task_id, chunks_sent, "backend stream finished");
                    let _ = self
                        .queue
                        .push_for_task(
                            OutboundEnvelope::final_chunk(&task_id, FINISH_REASON_STOP),
                            &cancel,
                        )
                        .await;
                    return;
                }
                Err(e) => {
                    // A recv error caused by our own cancellation stays
                    // silent on the wire.
                    if cancel.is_cancelled() {
                        info!(task_id, "backend stream cancelled via task token");
                        return;
                    }
                    error!(task_id, "backend stream error: {e}");
                    self.report_error(&task_id, format!("Backend stream error: {e}"), &cancel)
                        .await;
                    return;
                }
                Ok(Some(chunk)) => {
                    let finish = effective_finish_reason(chunk.finish_reason);
                    let content = match chunk.delta_content {
                        Some(content) if !content.is_empty() => content,
                        _ => {
                            debug!(task_id, "skipping empty backend chunk");
                            continue;
                        }
                    };

                    let terminal = finish.is_some();
                    let envelope = OutboundEnvelope::content_chunk(&task_id, content, finish);
                    if self.queue.push_for_task(envelope, &cancel).await.is_err() {
                        return;
                    }
                    chunks_sent += 1;

                    if terminal {
                        info!(task_id, chunks_sent, "backend reported finish reason");
                        return;
                    }
                }
            }
        }
    }

    /// Queues a single error chunk for the task. Respects the task token and
    /// the shutdown signal; an enqueue failure only means nobody is left to
    /// care.
    async fn report_error(&self, task_id: &str, detail: String, cancel: &CancellationToken) {
        let envelope = OutboundEnvelope::error_chunk(task_id, &detail);
        if let Err(e) = self.queue.push_for_task(envelope, cancel).await {
            debug!(task_id, "error chunk not delivered: {e}");
        }
    }
}
