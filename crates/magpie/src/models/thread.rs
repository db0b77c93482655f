use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

/// Character budget for thread titles derived from the first user message.
pub const TITLE_MAX_CHARS: usize = 30;

/// Fallback title for threads with no usable first message.
pub const DEFAULT_THREAD_TITLE: &str = "New conversation";

/// A conversation thread as known locally. Mirrors, but is not guaranteed
/// consistent with, the server's durable thread state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<Message>,
}

impl Thread {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Thread {
            id: id.into(),
            title: title.into(),
            created_at: Utc::now(),
            message_count: 0,
            messages: Vec::new(),
        }
    }

    /// Build a local entry from server-side data, titling it from the first
    /// message when one exists.
    pub fn from_remote(
        id: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        messages: Vec<Message>,
    ) -> Self {
        let title = messages
            .first()
            .map(|m| derive_title(&m.content))
            .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string());
        Thread {
            id: id.into(),
            title,
            created_at: created_at.unwrap_or_else(Utc::now),
            message_count: messages.len(),
            messages,
        }
    }
}

/// Truncate a first-message to the title budget, marking the cut with an
/// ellipsis. Applied once per thread; titles never change afterwards.
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// The local registry of known threads.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: HashMap<String, Thread>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.get(thread_id)
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.threads.contains_key(thread_id)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    pub fn insert(&mut self, thread: Thread) {
        self.threads.insert(thread.id.clone(), thread);
    }

    /// Merge a server-side snapshot without clobbering a thread already
    /// known locally.
    pub fn merge_remote(&mut self, thread: Thread) {
        self.threads.entry(thread.id.clone()).or_insert(thread);
    }

    /// Append a message to a thread and bump its count. The title is set
    /// exactly once: at creation, or when the first message recorded into an
    /// empty thread comes from the user.
    pub fn record_message(&mut self, thread_id: &str, message: Message) {
        match self.threads.get_mut(thread_id) {
            Some(thread) => {
                if thread.message_count == 0 && message.role == Role::User {
                    thread.title = derive_title(&message.content);
                }
                thread.message_count += 1;
                thread.messages.push(message);
            }
            None => {
                let mut thread = Thread::new(thread_id, derive_title(&message.content));
                thread.message_count = 1;
                thread.messages.push(message);
                self.threads.insert(thread_id.to_string(), thread);
            }
        }
    }

    /// Wholesale refresh of a thread's messages from server state, as done
    /// when switching into a thread.
    pub fn replace_messages(&mut self, thread_id: &str, messages: Vec<Message>) {
        match self.threads.get_mut(thread_id) {
            Some(thread) => {
                thread.message_count = messages.len();
                thread.messages = messages;
            }
            None => {
                let title = messages
                    .iter()
                    .find(|m| m.role == Role::User)
                    .map(|m| derive_title(&m.content))
                    .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string());
                let mut thread = Thread::new(thread_id, title);
                thread.message_count = messages.len();
                thread.messages = messages;
                self.threads.insert(thread_id.to_string(), thread);
            }
        }
    }
}
