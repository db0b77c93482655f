use crate::client::AgentClient;
use crate::errors::AgentResult;
use crate::models::activity::ActivityEvent;
use crate::models::message::normalize_records;
use crate::models::state::AppState;
use crate::models::thread::{Thread, DEFAULT_THREAD_TITLE};

/// One-shot hydration of the local registry from server-side threads.
///
/// Failures degrade gracefully: the registry keeps whatever it already has
/// and the CLI proceeds with an empty or partial thread list. Locally known
/// threads are never clobbered by hydrated snapshots.
pub async fn hydrate_threads(client: &AgentClient, state: &mut AppState) {
    if state.hydrated {
        return;
    }

    let remote = match client.search_threads().await {
        Ok(remote) => remote,
        Err(err) => {
            tracing::warn!("thread hydration failed: {err}");
            return;
        }
    };

    for record in remote {
        if state.registry.contains(&record.thread_id) {
            continue;
        }

        let messages = normalize_records(record.values.get("messages"));
        let timeline = messages.iter().map(ActivityEvent::from_message).collect();
        let thread = Thread::from_remote(record.thread_id.clone(), record.created_at, messages);

        state.seed_activity(&record.thread_id, timeline);
        state.registry.merge_remote(thread);
    }

    state.hydrated = true;
}

/// Create a fresh server-side thread, register it locally, and make it the
/// active conversation.
pub async fn start_new_thread(client: &AgentClient, state: &mut AppState) -> AgentResult<String> {
    state.reset();

    let created = client.create_thread().await?;
    let thread_id = created.thread_id;

    state
        .registry
        .merge_remote(Thread::new(thread_id.clone(), DEFAULT_THREAD_TITLE));
    state.seed_activity(&thread_id, Vec::new());
    state.current_thread = Some(thread_id.clone());

    Ok(thread_id)
}

/// Apply a pending thread switch: refresh the target's messages wholesale
/// from the server's durable state and make it current.
pub async fn process_pending_switch(client: &AgentClient, state: &mut AppState) -> AgentResult<()> {
    let Some(thread_id) = state.pending_switch.clone() else {
        return Ok(());
    };

    let snapshot = client.get_thread_state(&thread_id).await?;
    let messages = normalize_records(snapshot.values.get("messages"));

    state.registry.replace_messages(&thread_id, messages);
    state.current_thread = Some(thread_id);
    state.pending_switch = None;

    Ok(())
}
