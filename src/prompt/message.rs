use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `{role, content}` entry of a resolved prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Shape a resolved prompt into a message array: an optional system
/// message followed by exactly one user message.
pub fn to_messages(system_message: Option<&str>, prompt: impl Into<String>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_message {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));
    messages
}
