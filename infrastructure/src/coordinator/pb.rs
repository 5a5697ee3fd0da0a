//! Protobuf messages and client for the Tokilake coordinator service.
//!
//! Hand-maintained prost mirror of `tokilake.inference.v1`. Field tags must
//! stay in lockstep with the server's schema; the shapes themselves are
//! exercised only through the conversions in this module's parent.

use std::collections::HashMap;

/// A message from the agent to the coordinator.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokiameMessage {
    /// Task id for task-scoped payloads, otherwise the agent namespace.
    #[prost(string, tag = "1")]
    pub tokiame_id: String,
    #[prost(oneof = "tokiame_message::Payload", tags = "2, 3, 4, 5")]
    pub payload: Option<tokiame_message::Payload>,
}

pub mod tokiame_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Registration(super::RegistrationDetails),
        #[prost(message, tag = "3")]
        Heartbeat(super::Heartbeat),
        #[prost(message, tag = "4")]
        Chunk(super::StreamedInferenceChunk),
        #[prost(message, tag = "5")]
        Models(super::Models),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegistrationDetails {
    #[prost(string, tag = "1")]
    pub tokiame_namespace: String,
    #[prost(message, repeated, tag = "2")]
    pub supported_models: Vec<ModelDetails>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelDetails {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub r#type: String,
    #[prost(map = "string, string", tag = "4")]
    pub capabilities: HashMap<String, String>,
    #[prost(string, tag = "5")]
    pub backend_engine: String,
    #[prost(string, tag = "6")]
    pub status: String,
    #[prost(int32, tag = "7")]
    pub current_load_factor: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Heartbeat {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(enumeration = "ServingStatus", tag = "2")]
    pub current_status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ServingStatus {
    Unspecified = 0,
    Serving = 1,
    NotServing = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamedInferenceChunk {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(message, optional, tag = "2")]
    pub chunk: Option<ChatCompletionChunk>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatCompletionChunk {
    #[prost(message, repeated, tag = "1")]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChunkChoice {
    #[prost(message, optional, tag = "1")]
    pub delta: Option<ChatMessageDelta>,
    #[prost(string, optional, tag = "2")]
    pub finish_reason: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatMessageDelta {
    #[prost(string, optional, tag = "1")]
    pub content: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Models {
    #[prost(message, repeated, tag = "1")]
    pub supported_models: Vec<ModelDetails>,
}

/// A message from the coordinator to the agent.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokilakeMessage {
    /// Task id the payload correlates with.
    #[prost(string, tag = "1")]
    pub task_id: String,
    #[prost(oneof = "tokilake_message::Payload", tags = "2, 3, 4")]
    pub payload: Option<tokilake_message::Payload>,
}

pub mod tokilake_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Ack(super::Acknowledgement),
        #[prost(message, tag = "3")]
        ChatcompletionRequest(super::ChatCompletionRequest),
        #[prost(message, tag = "4")]
        Command(super::ControlCommand),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Acknowledgement {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub details: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatCompletionRequest {
    #[prost(string, tag = "1")]
    pub model: String,
    #[prost(message, repeated, tag = "2")]
    pub messages: Vec<ChatMessage>,
    #[prost(float, optional, tag = "3")]
    pub temperature: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub top_p: Option<f32>,
    #[prost(int32, optional, tag = "5")]
    pub max_tokens: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatMessage {
    #[prost(enumeration = "Role", tag = "1")]
    pub role: i32,
    #[prost(oneof = "chat_message::ContentType", tags = "2, 3")]
    pub content_type: Option<chat_message::ContentType>,
}

pub mod chat_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ContentType {
        #[prost(string, tag = "2")]
        TextContent(String),
        #[prost(message, tag = "3")]
        MultiContent(super::ContentParts),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Role {
    Unspecified = 0,
    User = 1,
    System = 2,
    Assistant = 3,
    Tool = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContentParts {
    #[prost(message, repeated, tag = "1")]
    pub parts: Vec<ContentPart>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContentPart {
    #[prost(oneof = "content_part::PartType", tags = "1, 2")]
    pub part_type: Option<content_part::PartType>,
}

pub mod content_part {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PartType {
        #[prost(string, tag = "1")]
        Text(String),
        #[prost(message, tag = "2")]
        ImageData(super::ImageData),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageData {
    #[prost(string, optional, tag = "1")]
    pub uri: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CommandType {
    Unspecified = 0,
    ShutdownGracefully = 1,
    Models = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlCommand {
    #[prost(enumeration = "CommandType", tag = "1")]
    pub command_type: i32,
    #[prost(string, tag = "2")]
    pub reason: String,
}

/// Client for the coordinator's bidirectional link RPC.
#[derive(Debug, Clone)]
pub struct TokilakeCoordinatorClient {
    inner: tonic::client::Grpc<tonic::transport::Channel>,
}

impl TokilakeCoordinatorClient {
    pub fn new(channel: tonic::transport::Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Opens the `EstablishTokiameLink` bidirectional stream.
    pub async fn establish_tokiame_link(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = TokiameMessage>,
    ) -> Result<tonic::Response<tonic::codec::Streaming<TokilakeMessage>>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {e}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = tonic::codegen::http::uri::PathAndQuery::from_static(
            "/tokilake.inference.v1.TokilakeCoordinatorService/EstablishTokiameLink",
        );
        self.inner
            .streaming(request.into_streaming_request(), path, codec)
            .await
    }
}
