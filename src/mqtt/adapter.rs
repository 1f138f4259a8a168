//! rumqttc adapter.
//!
//! The broker connection is one `AsyncClient` plus an event-loop task. The
//! rest of the crate never touches rumqttc events: the loop forwards them
//! through the [`MqttHooks`] trait, so the wire library stays swappable and
//! the hooks stay testable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::{FlagMatrix, MqttConfig};
use crate::core::types::CommandCategory;
use crate::mqtt::publisher::Publisher;
use crate::mqtt::router::{Command, CommandQueue};
use crate::mqtt::{qos_from_u8, topics};

#[async_trait]
pub trait MqttHooks: Send + Sync {
    /// Connection (re)established — subscriptions must be replayed here,
    /// the session is clean.
    async fn on_connect(&self);
    async fn on_disconnect(&self);
    async fn on_message(&self, topic: &str, payload: &[u8]);
}

pub fn connect(config: &MqttConfig) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(30));
    if !config.user.is_empty() {
        options.set_credentials(config.user.clone(), config.pass.clone());
    }
    AsyncClient::new(options, 64)
}

/// Drive the rumqttc event loop until cancellation. Poll errors are logged
/// and retried after a pause — rumqttc reconnects on the next poll, and
/// `on_connect` re-subscribes.
pub async fn run_event_loop(
    mut event_loop: EventLoop,
    hooks: Arc<dyn MqttHooks>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => hooks.on_connect().await,
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    hooks.on_message(&publish.topic, &publish.payload).await;
                }
                Ok(Event::Incoming(Packet::Disconnect)) => hooks.on_disconnect().await,
                Ok(_) => {}
                Err(e) => {
                    warn!("mqtt: connection error: {} — retrying", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            },
        }
    }
    debug!("mqtt: event loop stopped");
}

/// Production hooks: subscribe the enabled control categories, feed `set`
/// messages into the command queue.
pub struct BridgeHooks {
    pub client: AsyncClient,
    pub base_topic: String,
    pub controle: FlagMatrix,
    pub qos: u8,
    pub queue: Arc<CommandQueue>,
    pub publisher: Arc<Publisher>,
}

#[async_trait]
impl MqttHooks for BridgeHooks {
    async fn on_connect(&self) {
        let categories: Vec<CommandCategory> = self.controle.enabled_categories();
        if categories.is_empty() {
            info!("mqtt: connected (control disabled for every category)");
            return;
        }
        for category in &categories {
            let filter = topics::set_filter(&self.base_topic, *category);
            match self.client.subscribe(filter.clone(), qos_from_u8(self.qos)).await {
                Ok(()) => info!("mqtt: subscribed {}", filter),
                Err(e) => warn!("mqtt: subscribe failed for {}: {}", filter, e),
            }
        }
    }

    async fn on_disconnect(&self) {
        info!("mqtt: broker closed the connection");
    }

    async fn on_message(&self, topic: &str, payload: &[u8]) {
        let Some((category, id)) = topics::parse_set_topic(&self.base_topic, topic) else {
            debug!("mqtt: ignoring message on unexpected topic {}", topic);
            return;
        };
        let payload = String::from_utf8_lossy(payload).trim().to_string();
        let dropped = self.queue.push(Command {
            category,
            id,
            payload,
        });
        if let Some(dropped) = dropped {
            warn!(
                "router: command queue full — dropping oldest ({} {})",
                dropped.category, dropped.id
            );
            let topic =
                topics::command_result_topic(&self.base_topic, dropped.category, &dropped.id);
            self.publisher.publish_ack(&topic, "error:overloaded").await;
        }
    }
}
