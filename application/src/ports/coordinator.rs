//! Coordinator link port
//!
//! Defines the interface for one bidirectional envelope stream to the
//! coordinator. The supervisor dials through [`CoordinatorLink`]; a
//! successful connect yields the two halves of a fresh stream, owned by the
//! session's sender and receiver workers respectively.

use async_trait::async_trait;
use thiserror::Error;
use tokiame_domain::{InboundEnvelope, OutboundEnvelope};

/// Errors raised by the coordinator link.
///
/// All of these are recoverable at the supervisor level: a failed dial or a
/// broken stream ends the session and triggers a backoff reconnect.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("invalid coordinator address: {0}")]
    InvalidAddress(String),

    #[error("dial failed: {0}")]
    Dial(String),

    #[error("failed to open coordinator stream: {0}")]
    OpenStream(String),

    #[error("stream send failed: {0}")]
    Send(String),

    #[error("stream receive failed: {0}")]
    Recv(String),
}

/// Result type alias for link operations.
pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Write half of an established coordinator stream.
#[async_trait]
pub trait EnvelopeSink: Send {
    async fn send(&mut self, envelope: OutboundEnvelope) -> LinkResult<()>;
}

/// Read half of an established coordinator stream.
#[async_trait]
pub trait EnvelopeSource: Send {
    /// Receives the next inbound envelope. `Ok(None)` means the coordinator
    /// closed the stream (EOF).
    async fn recv(&mut self) -> LinkResult<Option<InboundEnvelope>>;
}

/// Dials the coordinator and opens the bidirectional envelope stream.
#[async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn connect(&self) -> LinkResult<(Box<dyn EnvelopeSink>, Box<dyn EnvelopeSource>)>;
}
