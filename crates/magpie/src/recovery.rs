use serde_json::Value;

use crate::client::Runtime;
use crate::extract::{display_text, is_truthy};
use crate::models::message::{Message, Role};

/// Pull a usable assistant answer out of a thread-state snapshot.
///
/// Prefers the snapshot's `final_report`; otherwise scans the message
/// history from the end for the most recent assistant entry with non-empty
/// content. `None` means the snapshot holds nothing usable.
pub fn recover_from_state(values: &Value) -> Option<String> {
    if let Some(report) = values.get("final_report") {
        if is_truthy(report) {
            return Some(display_text(report));
        }
    }

    if let Some(records) = values.get("messages").and_then(Value::as_array) {
        for record in records.iter().rev() {
            if let Some(message) = Message::from_record(record) {
                if message.role == Role::Assistant && !message.content.is_empty() {
                    return Some(message.content);
                }
            }
        }
    }

    None
}

/// Query the server's durable state for the thread and extract an answer.
///
/// Never fails: a fetch error or an unusable snapshot both mean "no result",
/// and the caller falls through to its fixed placeholder. Performs no
/// mutation, so it is safe to call from both the empty-result path and the
/// error path of the same send operation.
pub async fn fetch_final_response(runtime: &dyn Runtime, thread_id: &str) -> Option<String> {
    match runtime.thread_state(thread_id).await {
        Ok(state) => recover_from_state(&state.values),
        Err(err) => {
            tracing::warn!("state recovery failed: {err}");
            None
        }
    }
}
