use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    User,
    Assistant,
    Log,
}

/// One entry in a thread's append-only activity timeline: user submissions,
/// assistant outputs, and intermediate node-execution markers. Display only,
/// never fed back into the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, content: impl Into<String>) -> Self {
        ActivityEvent {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn log(content: impl Into<String>) -> Self {
        Self::new(ActivityKind::Log, content)
    }

    /// Timeline entry mirroring a recorded chat message.
    pub fn from_message(message: &Message) -> Self {
        let kind = match message.role {
            Role::User => ActivityKind::User,
            Role::Assistant => ActivityKind::Assistant,
        };
        ActivityEvent {
            kind,
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_maps_role() {
        let user = Message::user("hello");
        let event = ActivityEvent::from_message(&user);
        assert_eq!(event.kind, ActivityKind::User);
        assert_eq!(event.content, "hello");
        assert_eq!(event.timestamp, user.timestamp);

        let reply = Message::assistant("done");
        assert_eq!(
            ActivityEvent::from_message(&reply).kind,
            ActivityKind::Assistant
        );
    }
}
