//! src/eventbus/escalation_logger.rs
//!
//! Spawns a task that subscribes to the EventBus and writes every tracker
//! event to the log. Drains whatever is queued once shutdown is signalled.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::eventbus::{EventBus, TrackerEvent};

pub async fn spawn_escalation_logger(event_bus: &EventBus) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe(None).await;
    let mut shutdown_rx = event_bus.shutdown_rx.clone();

    tokio::spawn(async move {
        debug!("Escalation logger started");
        loop {
            tokio::select! {
                biased;
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => log_event(&event),
                        None => break,
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        while let Ok(event) = rx.try_recv() {
                            log_event(&event);
                        }
                        break;
                    }
                }
            }
        }
        info!("Escalation logger stopped");
    })
}

fn log_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::AuthorBlacklisted { owner_id, entry, .. } => {
            info!(
                owner = %owner_id,
                author = %entry.author_handle,
                negative_count = entry.negative_count,
                "Author blacklisted after repeated negative tweets"
            );
        }
        TrackerEvent::AuthorUnblacklisted { owner_id, entry_id, .. } => {
            info!(owner = %owner_id, entry = %entry_id, "Author removed from blacklist");
        }
        TrackerEvent::BlacklistCleared { owner_id, cleared, .. } => {
            info!(owner = %owner_id, cleared, "Blacklist cleared");
        }
    }
}
