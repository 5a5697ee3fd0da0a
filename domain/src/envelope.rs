//! Envelopes exchanged on the coordinator stream.
//!
//! Every message leaving the agent is an [`OutboundEnvelope`]; every message
//! arriving from the coordinator is an [`InboundEnvelope`]. Both are tagged
//! unions; the wire layout lives in the infrastructure layer. The associated
//! constructors are the only way envelopes are built, so the shape of each
//! variant (e.g. the `ERROR: ` finish-reason prefix) is decided in one place.

use crate::chat::TaskInstruction;
use crate::model::ModelDescriptor;
use chrono::{DateTime, Utc};

/// Prefix distinguishing error reports from normal finish reasons.
pub const ERROR_FINISH_PREFIX: &str = "ERROR: ";

/// Finish reason used when the backend stream ends without one of its own.
pub const FINISH_REASON_STOP: &str = "stop";

/// Health status advertised in heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingStatus {
    Serving,
    NotServing,
}

/// A periodic liveness signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
    pub status: ServingStatus,
}

/// One streamed choice: a content delta, a finish reason, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkChoice {
    pub delta_content: Option<String>,
    pub finish_reason: Option<String>,
}

impl ChunkChoice {
    /// True once this choice carries a finish reason; no further envelopes
    /// for the task may follow it.
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// A message from the agent to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEnvelope {
    Registration {
        namespace: String,
        models: Vec<ModelDescriptor>,
    },
    Heartbeat(Heartbeat),
    Chunk {
        task_id: String,
        choice: ChunkChoice,
    },
    ModelsList {
        task_id: String,
        models: Vec<ModelDescriptor>,
    },
}

impl OutboundEnvelope {
    /// Handshake envelope; always the first message of a session.
    pub fn registration(namespace: impl Into<String>, models: Vec<ModelDescriptor>) -> Self {
        OutboundEnvelope::Registration {
            namespace: namespace.into(),
            models,
        }
    }

    pub fn heartbeat(timestamp: DateTime<Utc>) -> Self {
        OutboundEnvelope::Heartbeat(Heartbeat {
            timestamp,
            status: ServingStatus::Serving,
        })
    }

    /// A content delta for a task, optionally carrying the backend's own
    /// finish reason when both arrive on the same upstream chunk.
    pub fn content_chunk(
        task_id: impl Into<String>,
        content: impl Into<String>,
        finish_reason: Option<String>,
    ) -> Self {
        OutboundEnvelope::Chunk {
            task_id: task_id.into(),
            choice: ChunkChoice {
                delta_content: Some(content.into()),
                finish_reason,
            },
        }
    }

    /// Terminal envelope for a task that completed normally.
    pub fn final_chunk(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        OutboundEnvelope::Chunk {
            task_id: task_id.into(),
            choice: ChunkChoice {
                delta_content: None,
                finish_reason: Some(reason.into()),
            },
        }
    }

    /// Terminal envelope reporting a task-scoped failure to the coordinator.
    pub fn error_chunk(task_id: impl Into<String>, detail: impl AsRef<str>) -> Self {
        OutboundEnvelope::Chunk {
            task_id: task_id.into(),
            choice: ChunkChoice {
                delta_content: None,
                finish_reason: Some(format!("{ERROR_FINISH_PREFIX}{}", detail.as_ref())),
            },
        }
    }

    /// Reply to a `Models` control command.
    pub fn models_list(task_id: impl Into<String>, models: Vec<ModelDescriptor>) -> Self {
        OutboundEnvelope::ModelsList {
            task_id: task_id.into(),
            models,
        }
    }

    /// The task this envelope belongs to, if any. Registration and heartbeat
    /// envelopes are correlated by namespace instead.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            OutboundEnvelope::Chunk { task_id, .. }
            | OutboundEnvelope::ModelsList { task_id, .. } => Some(task_id),
            OutboundEnvelope::Registration { .. } | OutboundEnvelope::Heartbeat(_) => None,
        }
    }
}

/// Coordinator response to a registration or other agent message.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    pub success: bool,
    pub details: String,
}

/// Control command kinds the coordinator may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Cancel the task named by the envelope's task id.
    ShutdownGracefully,
    /// Request the current supported-model list.
    Models,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlCommand {
    pub kind: CommandKind,
    pub reason: String,
}

/// A message from the coordinator to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEnvelope {
    Ack {
        task_id: String,
        ack: Acknowledgement,
    },
    Task(TaskInstruction),
    Command {
        task_id: String,
        command: ControlCommand,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chunk_prefixes_finish_reason() {
        let env = OutboundEnvelope::error_chunk("T1", "Model x not supported");
        match env {
            OutboundEnvelope::Chunk { task_id, choice } => {
                assert_eq!(task_id, "T1");
                assert_eq!(choice.delta_content, None);
                assert_eq!(
                    choice.finish_reason.as_deref(),
                    Some("ERROR: Model x not supported")
                );
                assert!(choice.is_terminal());
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn content_chunk_may_carry_finish_reason() {
        let env = OutboundEnvelope::content_chunk("T1", "tail", Some("stop".to_string()));
        match env {
            OutboundEnvelope::Chunk { choice, .. } => {
                assert_eq!(choice.delta_content.as_deref(), Some("tail"));
                assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn heartbeat_reports_serving() {
        let env = OutboundEnvelope::heartbeat(Utc::now());
        match env {
            OutboundEnvelope::Heartbeat(hb) => assert_eq!(hb.status, ServingStatus::Serving),
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }

    #[test]
    fn task_id_present_only_on_task_scoped_envelopes() {
        assert_eq!(
            OutboundEnvelope::final_chunk("T2", "stop").task_id(),
            Some("T2")
        );
        assert_eq!(OutboundEnvelope::registration("ns", vec![]).task_id(), None);
        assert_eq!(OutboundEnvelope::heartbeat(Utc::now()).task_id(), None);
    }
}
