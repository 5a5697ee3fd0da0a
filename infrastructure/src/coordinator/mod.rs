//! Coordinator link adapter: gRPC transport for the envelope stream.

mod convert;
mod link;
pub mod pb;

pub use link::GrpcCoordinatorLink;
