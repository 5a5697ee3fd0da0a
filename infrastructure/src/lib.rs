//! Infrastructure layer for tokiame
//!
//! Adapters behind the application ports: the gRPC coordinator link, the
//! OpenAI-compatible streaming backend client, the file-backed model
//! registry with live reload, and the admin HTTP surface.

pub mod admin;
pub mod backend;
pub mod coordinator;
pub mod registry;

// Re-export commonly used types
pub use backend::OpenAiBackend;
pub use coordinator::GrpcCoordinatorLink;
pub use registry::{FileModelRegistry, RegistryError};
