//! Domain layer for tokiame
//!
//! This crate contains the core types exchanged with the coordinator and the
//! pure logic of the session engine: model descriptors, chat messages, wire
//! envelopes, the reconnect backoff policy, and session lifecycle states.
//! It has no dependencies on transport or runtime concerns.

pub mod chat;
pub mod envelope;
pub mod model;
pub mod retry;
pub mod session;

// Re-export commonly used types
pub use chat::{ChatMessage, ContentPart, MessageContent, MessageRole, TaskInstruction};
pub use envelope::{
    Acknowledgement, ChunkChoice, CommandKind, ControlCommand, Heartbeat, InboundEnvelope,
    OutboundEnvelope, ServingStatus,
};
pub use model::{ModelDescriptor, ModelStatus};
pub use retry::RetryPolicy;
pub use session::SessionState;
