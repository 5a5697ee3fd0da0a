//! Chat messages and task instructions.
//!
//! [`TaskInstruction`] is the unit of work dispatched by the coordinator:
//! one chat-completion request with a server-assigned task id, to be driven
//! against the backend serving the named model.

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    System,
    Assistant,
    /// Tool output. Backends without a native tool role receive this as
    /// `assistant` (see the backend adapter).
    Tool,
}

/// One element of a multi-part message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// A URL or data URI pointing at an image.
    ImageUrl(String),
}

/// Message content: either plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }
}

/// A chat-completion instruction received from the coordinator.
///
/// `task_id` is server-assigned and unique among the tasks currently live on
/// this agent; the coordinator uses it to demultiplex the chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInstruction {
    pub task_id: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_constructor_builds_plain_content() {
        let msg = ChatMessage::text(MessageRole::User, "hi");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, MessageContent::Text("hi".to_string()));
    }
}
