//! Conversions between domain envelopes and the wire messages.
//!
//! Encoding is total: every [`OutboundEnvelope`] has exactly one wire shape.
//! Decoding is lenient at the edges the coordinator controls — unknown
//! payload variants yield `None` (the caller logs and drops them), unknown
//! roles collapse to `assistant`, and unknown content-part variants are
//! dropped silently, matching the coordinator's own tolerance.

use super::pb;
use tokiame_domain::{
    Acknowledgement, ChatMessage, ChunkChoice, CommandKind, ContentPart, ControlCommand,
    Heartbeat, InboundEnvelope, MessageContent, MessageRole, ModelDescriptor, OutboundEnvelope,
    ServingStatus, TaskInstruction,
};

/// Encodes an outbound envelope. `namespace` identifies the agent on
/// non-task messages.
pub fn encode_outbound(envelope: OutboundEnvelope, namespace: &str) -> pb::TokiameMessage {
    match envelope {
        OutboundEnvelope::Registration { namespace, models } => pb::TokiameMessage {
            tokiame_id: namespace.clone(),
            payload: Some(pb::tokiame_message::Payload::Registration(
                pb::RegistrationDetails {
                    tokiame_namespace: namespace,
                    supported_models: models.into_iter().map(model_to_pb).collect(),
                },
            )),
        },
        OutboundEnvelope::Heartbeat(heartbeat) => pb::TokiameMessage {
            tokiame_id: namespace.to_string(),
            payload: Some(pb::tokiame_message::Payload::Heartbeat(heartbeat_to_pb(
                heartbeat,
            ))),
        },
        OutboundEnvelope::Chunk { task_id, choice } => pb::TokiameMessage {
            tokiame_id: task_id.clone(),
            payload: Some(pb::tokiame_message::Payload::Chunk(
                pb::StreamedInferenceChunk {
                    request_id: task_id,
                    chunk: Some(pb::ChatCompletionChunk {
                        choices: vec![choice_to_pb(choice)],
                    }),
                },
            )),
        },
        OutboundEnvelope::ModelsList { task_id, models } => pb::TokiameMessage {
            tokiame_id: task_id,
            payload: Some(pb::tokiame_message::Payload::Models(pb::Models {
                supported_models: models.into_iter().map(model_to_pb).collect(),
            })),
        },
    }
}

/// Decodes an inbound wire message. Returns `None` for empty or unknown
/// payloads.
pub fn decode_inbound(message: pb::TokilakeMessage) -> Option<InboundEnvelope> {
    let task_id = message.task_id;
    match message.payload? {
        pb::tokilake_message::Payload::Ack(ack) => Some(InboundEnvelope::Ack {
            task_id,
            ack: Acknowledgement {
                success: ack.success,
                details: ack.details,
            },
        }),
        pb::tokilake_message::Payload::ChatcompletionRequest(request) => {
            Some(InboundEnvelope::Task(TaskInstruction {
                task_id,
                model: request.model,
                messages: request.messages.into_iter().map(message_from_pb).collect(),
                temperature: request.temperature,
                top_p: request.top_p,
                max_tokens: request.max_tokens,
            }))
        }
        pb::tokilake_message::Payload::Command(command) => {
            let kind = match pb::CommandType::try_from(command.command_type) {
                Ok(pb::CommandType::ShutdownGracefully) => CommandKind::ShutdownGracefully,
                Ok(pb::CommandType::Models) => CommandKind::Models,
                Ok(pb::CommandType::Unspecified) | Err(_) => return None,
            };
            Some(InboundEnvelope::Command {
                task_id,
                command: ControlCommand {
                    kind,
                    reason: command.reason,
                },
            })
        }
    }
}

fn model_to_pb(model: ModelDescriptor) -> pb::ModelDetails {
    // backend_base stays local; it is routing detail, not capability.
    pb::ModelDetails {
        id: model.id,
        description: model.description,
        r#type: model.kind,
        capabilities: model.capabilities,
        backend_engine: model.backend_engine,
        status: model.status.as_str().to_string(),
        current_load_factor: model.current_load_factor,
    }
}

fn heartbeat_to_pb(heartbeat: Heartbeat) -> pb::Heartbeat {
    let status = match heartbeat.status {
        ServingStatus::Serving => pb::ServingStatus::Serving,
        ServingStatus::NotServing => pb::ServingStatus::NotServing,
    };
    pb::Heartbeat {
        timestamp: Some(::prost_types::Timestamp {
            seconds: heartbeat.timestamp.timestamp(),
            nanos: heartbeat.timestamp.timestamp_subsec_nanos() as i32,
        }),
        current_status: status as i32,
    }
}

fn choice_to_pb(choice: ChunkChoice) -> pb::ChunkChoice {
    pb::ChunkChoice {
        delta: choice
            .delta_content
            .map(|content| pb::ChatMessageDelta {
                content: Some(content),
            }),
        finish_reason: choice.finish_reason,
    }
}

fn message_from_pb(message: pb::ChatMessage) -> ChatMessage {
    // Unknown roles map to assistant.
    let role = match pb::Role::try_from(message.role) {
        Ok(pb::Role::User) => MessageRole::User,
        Ok(pb::Role::System) => MessageRole::System,
        Ok(pb::Role::Assistant) => MessageRole::Assistant,
        Ok(pb::Role::Tool) => MessageRole::Tool,
        Ok(pb::Role::Unspecified) | Err(_) => MessageRole::Assistant,
    };

    let content = match message.content_type {
        Some(pb::chat_message::ContentType::TextContent(text)) => MessageContent::Text(text),
        Some(pb::chat_message::ContentType::MultiContent(parts)) => MessageContent::Parts(
            parts.parts.into_iter().filter_map(part_from_pb).collect(),
        ),
        None => MessageContent::Text(String::new()),
    };

    ChatMessage { role, content }
}

/// Unknown part variants (and image parts without a URI) are dropped.
fn part_from_pb(part: pb::ContentPart) -> Option<ContentPart> {
    match part.part_type? {
        pb::content_part::PartType::Text(text) => Some(ContentPart::Text(text)),
        pb::content_part::PartType::ImageData(image) => image.uri.map(ContentPart::ImageUrl),
    }
}
