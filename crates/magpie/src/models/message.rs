use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::gather_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message in a thread.
///
/// Immutable once recorded; the one in-flight assistant message per send
/// operation lives in the run accumulator until it is committed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Message {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            tags: None,
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tags: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Normalize one opaque server-side message record.
    ///
    /// The role lives under `type` or `role` (whichever is first non-empty)
    /// and is matched case-insensitively by substring against human/user and
    /// ai/assistant. Records with absent or unrecognized roles are dropped.
    pub fn from_record(record: &Value) -> Option<Message> {
        let map = record.as_object()?;

        let role_text = ["type", "role"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let role = if role_text.contains("human") || role_text.contains("user") {
            Role::User
        } else if role_text.contains("ai") || role_text.contains("assistant") {
            Role::Assistant
        } else {
            return None;
        };

        let content = match map.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => gather_text(other),
            None => String::new(),
        };

        let timestamp = ["created_at", "timestamp"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find_map(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let tags = map.get("tags").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

        Some(Message {
            role,
            content,
            timestamp,
            tags,
        })
    }
}

/// Normalize an opaque `messages` array, dropping unrecognized records.
pub fn normalize_records(records: Option<&Value>) -> Vec<Message> {
    records
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Message::from_record).collect())
        .unwrap_or_default()
}
