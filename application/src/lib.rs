//! Application layer for tokiame
//!
//! The session and task fan-out engine: ports toward the coordinator link,
//! the inference backends, and the model catalog, plus the use cases that
//! drive them — outbound queue, task registry, task runner, heartbeat,
//! session workers, and the reconnecting supervisor.

pub mod config;
pub mod dispatch;
pub mod heartbeat;
pub mod outbound;
pub mod ports;
pub mod runner;
pub mod session;
pub mod supervisor;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::AgentConfig;
pub use dispatch::InboundDispatcher;
pub use outbound::{EnqueueError, OutboundQueue, OutboundReceiver, outbound_queue};
pub use ports::catalog::ModelCatalog;
pub use ports::coordinator::{
    CoordinatorLink, EnvelopeSink, EnvelopeSource, LinkError, LinkResult,
};
pub use ports::inference::{
    BackendError, CompletionChunk, CompletionRequest, CompletionStream, InferenceBackend,
};
pub use runner::TaskRunner;
pub use supervisor::Supervisor;
pub use tasks::{TaskGuard, TaskRegistry};
