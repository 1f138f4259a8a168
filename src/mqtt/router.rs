//! MQTT command router.
//!
//! Broker callbacks enqueue into a bounded queue; a single consumer task
//! drains it, so panel mutations are serialized process-wide (the panel's
//! session model cannot take parallel writes). Every command is answered on
//! its sibling `command_result` topic — `ok:<code>` or one of the
//! `error:*` kinds — and never retried.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::types::CommandCategory;
use crate::core::BridgeState;
use crate::mqtt::publisher::Publisher;
use crate::mqtt::topics;
use crate::panel::actions::{self, PanelAction};
use crate::panel::PanelError;

/// Commands queued ahead of the single consumer.
pub const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub category: CommandCategory,
    pub id: String,
    pub payload: String,
}

/// Bounded FIFO; overflow evicts the oldest entry so a stalled panel can
/// never wedge the broker callback thread.
pub struct CommandQueue {
    inner: Mutex<VecDeque<Command>>,
    notify: Notify,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        CommandQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue a command, returning the evicted oldest one on overflow.
    pub fn push(&self, command: Command) -> Option<Command> {
        let dropped = {
            let Ok(mut queue) = self.inner.lock() else {
                return None;
            };
            let dropped = if queue.len() >= self.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(command);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Wait for the next command.
    pub async fn pop(&self) -> Command {
        loop {
            if let Ok(mut queue) = self.inner.lock() {
                if let Some(command) = queue.pop_front() {
                    return command;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer task: drain the queue until cancellation, finishing the
/// in-flight command before exiting.
pub async fn run(
    state: Arc<BridgeState>,
    publisher: Arc<Publisher>,
    queue: Arc<CommandQueue>,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = queue.pop() => command,
        };
        handle(&state, &publisher, command).await;
    }
}

async fn handle(state: &BridgeState, publisher: &Publisher, command: Command) {
    let base = &state.config.mqtt.base_topic;
    let ack_topic = topics::command_result_topic(base, command.category, &command.id);

    if !state.config.watchdog.controle.enabled(command.category) {
        publisher.publish_ack(&ack_topic, "error:control-disabled").await;
        return;
    }

    let Some(action) = PanelAction::parse(command.category, &command.payload) else {
        info!(
            "router: bad payload '{}' for {} {}",
            command.payload, command.category, command.id
        );
        publisher.publish_ack(&ack_topic, "error:bad-payload").await;
        return;
    };

    let session_id = match state.session.get_or_login().await {
        Ok(Some(sid)) => sid,
        Ok(None) => {
            publisher.publish_ack(&ack_topic, "error:no-session").await;
            return;
        }
        Err(e) => {
            warn!("router: session cache failure: {}", e);
            publisher.publish_ack(&ack_topic, "error:no-session").await;
            return;
        }
    };

    // Whole fetch-discover-submit unit under the panel gate: a scan must not
    // interleave between reading the page and posting the form.
    let result = {
        let _flight = state.panel_gate.lock().await;
        actions::execute(
            &state.panel,
            &session_id,
            command.category,
            &command.id,
            &action,
        )
        .await
    };

    match result {
        Ok(()) => {
            info!(
                "router: {} {} ← {} ok",
                command.category, command.id, command.payload
            );
            publisher
                .publish_ack(&ack_topic, &format!("ok:{}", action.ack_code()))
                .await;
        }
        Err(PanelError::Http(code)) => {
            warn!(
                "router: panel rejected {} {} with HTTP {}",
                command.category, command.id, code
            );
            publisher
                .publish_ack(&ack_topic, &format!("error:http-{}", code))
                .await;
        }
        Err(PanelError::ActionNotFound) => {
            warn!(
                "router: no {} control found for {} {}",
                command.payload, command.category, command.id
            );
            publisher.publish_ack(&ack_topic, "error:action-not-found").await;
        }
        Err(e) => {
            warn!(
                "router: {} {} failed: {}",
                command.category, command.id, e
            );
            publisher.publish_ack(&ack_topic, "error:network").await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: &str) -> Command {
        Command {
            category: CommandCategory::Zones,
            id: id.to_string(),
            payload: "inhibit".to_string(),
        }
    }

    #[test]
    fn test_queue_fifo_order() {
        let queue = CommandQueue::new(4);
        assert!(queue.push(command("a")).is_none());
        assert!(queue.push(command("b")).is_none());
        let first = tokio_test::block_on(queue.pop());
        assert_eq!(first.id, "a");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let queue = CommandQueue::new(2);
        assert!(queue.push(command("a")).is_none());
        assert!(queue.push(command("b")).is_none());
        let dropped = queue.push(command("c")).unwrap();
        assert_eq!(dropped.id, "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(tokio_test::block_on(queue.pop()).id, "b");
        assert_eq!(tokio_test::block_on(queue.pop()).id, "c");
    }
}
