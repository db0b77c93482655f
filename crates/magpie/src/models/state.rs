use std::collections::HashMap;

use super::activity::ActivityEvent;
use super::thread::ThreadRegistry;

/// Explicitly owned application state, passed by reference through the CLI.
///
/// Holds everything that outlives a single send operation; the operation's
/// transient accumulator is merged in exactly once on completion.
#[derive(Debug, Default)]
pub struct AppState {
    pub registry: ThreadRegistry,
    pub current_thread: Option<String>,
    pub pending_switch: Option<String>,
    /// Set after the one-shot server thread hydration has run.
    pub hydrated: bool,
    activity: HashMap<String, Vec<ActivityEvent>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity_for(&self, thread_id: &str) -> &[ActivityEvent] {
        self.activity
            .get(thread_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn push_activity(&mut self, thread_id: &str, event: ActivityEvent) {
        self.activity
            .entry(thread_id.to_string())
            .or_default()
            .push(event);
    }

    /// Seed a thread's timeline from hydrated history. A timeline that
    /// already exists locally is left untouched.
    pub fn seed_activity(&mut self, thread_id: &str, events: Vec<ActivityEvent>) {
        self.activity.entry(thread_id.to_string()).or_insert(events);
    }

    /// Clear the active conversation without forgetting known threads.
    pub fn reset(&mut self) {
        self.current_thread = None;
        self.pending_switch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityKind;
    use crate::models::thread::Thread;

    #[test]
    fn test_seed_activity_does_not_overwrite() {
        let mut state = AppState::new();
        state.push_activity("t1", ActivityEvent::new(ActivityKind::User, "q"));

        state.seed_activity(
            "t1",
            vec![ActivityEvent::new(ActivityKind::Assistant, "stale")],
        );
        assert_eq!(state.activity_for("t1").len(), 1);
        assert_eq!(state.activity_for("t1")[0].content, "q");

        state.seed_activity("t2", vec![ActivityEvent::log("node ran")]);
        assert_eq!(state.activity_for("t2").len(), 1);
    }

    #[test]
    fn test_reset_keeps_registry() {
        let mut state = AppState::new();
        state.registry.insert(Thread::new("t1", "kept"));
        state.current_thread = Some("t1".to_string());
        state.pending_switch = Some("t2".to_string());

        state.reset();

        assert!(state.current_thread.is_none());
        assert!(state.pending_switch.is_none());
        assert!(state.registry.contains("t1"));
    }
}
