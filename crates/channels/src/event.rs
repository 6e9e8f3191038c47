//! Inbound platform events as seen by the router.

use std::fmt;

use serde::Serialize;

/// The three subscriptions installed on a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewMessage,
    MessageEdited,
    MessageDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::NewMessage,
        EventKind::MessageEdited,
        EventKind::MessageDeleted,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new",
            Self::MessageEdited => "edit",
            Self::MessageDeleted => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message observed in a source chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayMessage {
    /// Message id within its chat.
    pub id: i32,
    /// Marked id of the chat the message was posted in.
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub text: Option<String>,
}

impl RelayMessage {
    /// First `max` characters of the text, for log lines.
    #[must_use]
    pub fn preview(&self, max: usize) -> String {
        self.text
            .as_deref()
            .map(|t| t.chars().take(max).collect())
            .unwrap_or_default()
    }
}

/// A platform notification delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    NewMessage(RelayMessage),
    MessageEdited(RelayMessage),
    /// Deletions carry ids only. The chat is unknown for some peer types.
    MessageDeleted {
        chat_id: Option<i64>,
        message_ids: Vec<i32>,
    },
}

impl InboundEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::MessageEdited(_) => EventKind::MessageEdited,
            Self::MessageDeleted { .. } => EventKind::MessageDeleted,
        }
    }

    /// Marked chat id the event originated from, if known.
    #[must_use]
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            Self::NewMessage(msg) | Self::MessageEdited(msg) => Some(msg.chat_id),
            Self::MessageDeleted { chat_id, .. } => *chat_id,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&RelayMessage> {
        match self {
            Self::NewMessage(msg) | Self::MessageEdited(msg) => Some(msg),
            Self::MessageDeleted { .. } => None,
        }
    }
}
