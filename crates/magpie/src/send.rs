use futures::StreamExt;

use crate::client::Runtime;
use crate::errors::AgentError;
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::message::Message;
use crate::models::state::AppState;
use crate::recovery;
use crate::reducer::{Applied, RunAccumulator, RunOutcome, MISSING_RESPONSE_PLACEHOLDER};

/// Progress published while a send operation is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SendProgress {
    /// Full live assistant text after a new streamed delta.
    Text(String),
    /// A newly appended process-log line.
    Log(String),
}

/// Result of one completed send operation. Send never fails outright; the
/// worst case resolves to the fixed placeholder text.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Final assistant text, placeholder included.
    pub text: String,
    pub logs: Vec<String>,
    /// The stream error, when one aborted consumption.
    pub error: Option<AgentError>,
    /// Set when the failure was retryable and this was the original
    /// attempt; the caller may offer a one-shot retry.
    pub retry_offered: bool,
}

/// Run one send operation end to end: record the user message, stream the
/// run, fold events through the accumulator, then commit the final text and
/// activity into the application state exactly once.
///
/// On a retry the user message is already recorded and is not re-appended.
pub async fn send_message(
    runtime: &dyn Runtime,
    state: &mut AppState,
    thread_id: &str,
    text: &str,
    is_retry: bool,
    mut progress: impl FnMut(SendProgress),
) -> SendOutcome {
    if !is_retry {
        let user = Message::user(text);
        state.push_activity(thread_id, ActivityEvent::from_message(&user));
        state.registry.record_message(thread_id, user);
    }

    let mut acc = RunAccumulator::new();
    let mut stream_error: Option<AgentError> = None;

    match runtime.stream_run(thread_id, text).await {
        Ok(mut stream) => {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(event) => match acc.apply(&event) {
                        Applied::LiveText(content) => progress(SendProgress::Text(content)),
                        Applied::Logged(lines) => {
                            for line in lines {
                                progress(SendProgress::Log(line));
                            }
                        }
                        Applied::Nothing => {}
                    },
                    Err(err) => {
                        stream_error = Some(err);
                        break;
                    }
                }
            }
        }
        Err(err) => stream_error = Some(err),
    }

    let RunOutcome {
        text: folded,
        logs,
        activity,
    } = acc.finish();

    // On a stream error the partial accumulators are not trusted; recovery
    // runs first, exactly as it does when the stream produced nothing.
    let resolved = match (&stream_error, folded) {
        (None, Some(answer)) => Some(answer),
        _ => recovery::fetch_final_response(runtime, thread_id).await,
    };

    let final_text = resolved
        .clone()
        .unwrap_or_else(|| MISSING_RESPONSE_PLACEHOLDER.to_string());

    // Single commit: node logs gathered during the run, then the outcome.
    for event in activity {
        state.push_activity(thread_id, event);
    }
    if let Some(answer) = &resolved {
        state
            .registry
            .record_message(thread_id, Message::assistant(answer.clone()));
    }
    state.push_activity(
        thread_id,
        ActivityEvent::new(ActivityKind::Assistant, final_text.clone()),
    );
    progress(SendProgress::Text(final_text.clone()));

    let retry_offered = !is_retry
        && stream_error
            .as_ref()
            .map(AgentError::is_retryable)
            .unwrap_or(false);

    SendOutcome {
        text: final_text,
        logs,
        error: stream_error,
        retry_offered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::client::ThreadState;
    use crate::errors::AgentResult;
    use crate::models::message::Role;
    use crate::stream::StreamEvent;

    /// Canned runtime: a queue of stream results plus a fixed state
    /// snapshot for recovery.
    struct MockRuntime {
        events: Mutex<Vec<AgentResult<StreamEvent>>>,
        open_error: Option<AgentError>,
        state: AgentResult<ThreadState>,
    }

    impl MockRuntime {
        fn streaming(events: Vec<AgentResult<StreamEvent>>) -> Self {
            MockRuntime {
                events: Mutex::new(events),
                open_error: None,
                state: Ok(ThreadState::default()),
            }
        }

        fn with_state(mut self, values: serde_json::Value) -> Self {
            self.state = Ok(ThreadState { values });
            self
        }

        fn failing_open(error: AgentError) -> Self {
            MockRuntime {
                events: Mutex::new(Vec::new()),
                open_error: Some(error),
                state: Ok(ThreadState::default()),
            }
        }
    }

    #[async_trait]
    impl Runtime for MockRuntime {
        async fn stream_run(
            &self,
            _thread_id: &str,
            _message: &str,
        ) -> AgentResult<BoxStream<'static, AgentResult<StreamEvent>>> {
            if let Some(err) = &self.open_error {
                return Err(err.clone());
            }
            let events: Vec<_> = self.events.lock().unwrap().drain(..).collect();
            Ok(Box::pin(futures::stream::iter(events)))
        }

        async fn thread_state(&self, _thread_id: &str) -> AgentResult<ThreadState> {
            self.state.clone()
        }
    }

    #[tokio::test]
    async fn test_streamed_completion_commits_once() {
        let runtime = MockRuntime::streaming(vec![
            Ok(StreamEvent::Messages(json!({"content": "hel"}))),
            Ok(StreamEvent::Messages(json!({"content": "lo"}))),
        ]);
        let mut state = AppState::new();
        let mut seen = Vec::new();

        let outcome = send_message(&runtime, &mut state, "t1", "hi", false, |p| seen.push(p)).await;

        assert_eq!(outcome.text, "hello");
        assert!(!outcome.retry_offered);
        assert!(outcome.error.is_none());

        let thread = state.registry.get("t1").expect("thread recorded");
        assert_eq!(thread.message_count, 2);
        assert_eq!(thread.messages[0].role, Role::User);
        assert_eq!(thread.messages[1].content, "hello");

        // Live deltas in order, then the final publish.
        assert_eq!(
            seen,
            vec![
                SendProgress::Text("hel".to_string()),
                SendProgress::Text("hello".to_string()),
                SendProgress::Text("hello".to_string()),
            ]
        );

        // Timeline: user submission, then the assistant outcome.
        let activity = state.activity_for("t1");
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].kind, ActivityKind::User);
        assert_eq!(activity[1].kind, ActivityKind::Assistant);
    }

    #[tokio::test]
    async fn test_final_report_beats_streamed_text() {
        let runtime = MockRuntime::streaming(vec![
            Ok(StreamEvent::Values(json!({"final_report": "report"}))),
            Ok(StreamEvent::Messages(json!({"content": "partial"}))),
        ]);
        let mut state = AppState::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;

        assert_eq!(outcome.text, "report");
        assert_eq!(
            state.registry.get("t1").unwrap().messages[1].content,
            "report"
        );
    }

    #[tokio::test]
    async fn test_empty_stream_recovers_from_state() {
        let runtime = MockRuntime::streaming(Vec::new())
            .with_state(json!({"values_ignored": true, "final_report": "R"}));
        let mut state = AppState::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;

        assert_eq!(outcome.text, "R");
        assert_eq!(state.registry.get("t1").unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_placeholder_when_recovery_empty() {
        let runtime = MockRuntime::streaming(Vec::new());
        let mut state = AppState::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;

        assert_eq!(outcome.text, MISSING_RESPONSE_PLACEHOLDER);
        // The placeholder reaches the timeline but is not recorded as a
        // thread message.
        assert_eq!(state.registry.get("t1").unwrap().message_count, 1);
        let activity = state.activity_for("t1");
        assert_eq!(activity.last().unwrap().content, MISSING_RESPONSE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_stream_error_ignores_partial_text_and_recovers() {
        let runtime = MockRuntime::streaming(vec![
            Ok(StreamEvent::Messages(json!({"content": "half an ans"}))),
            Err(AgentError::Network("connection reset".into())),
        ])
        .with_state(json!({"messages": [
            {"type": "ai", "content": "durable answer"}
        ]}));
        let mut state = AppState::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;

        assert_eq!(outcome.text, "durable answer");
        assert!(outcome.retry_offered);
    }

    #[tokio::test]
    async fn test_retryable_open_failure_offers_retry_once() {
        let runtime = MockRuntime::failing_open(AgentError::Network("refused".into()));
        let mut state = AppState::new();

        let first = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;
        assert!(first.retry_offered);
        assert_eq!(first.text, MISSING_RESPONSE_PLACEHOLDER);

        // The retry itself never offers another retry, and does not
        // duplicate the user message.
        let runtime = MockRuntime::failing_open(AgentError::Network("refused".into()));
        let second = send_message(&runtime, &mut state, "t1", "q", true, |_| {}).await;
        assert!(!second.retry_offered);

        let thread = state.registry.get("t1").unwrap();
        let users = thread
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_offers_no_retry() {
        let runtime = MockRuntime::failing_open(AgentError::service(422, "bad request"));
        let mut state = AppState::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |_| {}).await;

        assert!(!outcome.retry_offered);
        assert_eq!(outcome.error, Some(AgentError::service(422, "bad request")));
    }

    #[tokio::test]
    async fn test_node_logs_reach_progress_and_timeline() {
        let mut nodes = serde_json::Map::new();
        nodes.insert("search_web".to_string(), json!({"hits": 3}));
        let runtime = MockRuntime::streaming(vec![
            Ok(StreamEvent::Updates(nodes)),
            Ok(StreamEvent::Values(json!({"final_report": "done"}))),
        ]);
        let mut state = AppState::new();
        let mut log_lines = Vec::new();

        let outcome = send_message(&runtime, &mut state, "t1", "q", false, |p| {
            if let SendProgress::Log(line) = p {
                log_lines.push(line);
            }
        })
        .await;

        assert_eq!(log_lines.len(), 1);
        assert!(log_lines[0].contains("search_web"));
        assert_eq!(outcome.logs, log_lines);

        let kinds: Vec<_> = state
            .activity_for("t1")
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::User, ActivityKind::Log, ActivityKind::Assistant]
        );
    }
}
