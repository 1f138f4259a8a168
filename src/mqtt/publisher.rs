//! MQTT publication.
//!
//! State topics are retained so the broker always reflects the latest
//! observation; `command_result` acks are transient and never retained.
//! Publish failures are logged and swallowed — the retained prior value plus
//! the next scan's re-emit make the store eventually consistent.

use rumqttc::{AsyncClient, QoS};
use tracing::{debug, warn};

use crate::core::config::MqttConfig;
use crate::mqtt::qos_from_u8;

pub struct Publisher {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
}

impl Publisher {
    pub fn new(client: AsyncClient, config: &MqttConfig) -> Self {
        Publisher {
            client,
            qos: qos_from_u8(config.qos),
            retain: config.retain,
        }
    }

    /// Publish a state value. Returns `true` when the publish was accepted
    /// by the client (the snapshot is only committed then).
    pub async fn publish_state(&self, topic: &str, value: &str) -> bool {
        match self
            .client
            .publish(topic.to_string(), self.qos, self.retain, value.to_string())
            .await
        {
            Ok(()) => {
                debug!("mqtt: {} = {}", topic, value);
                true
            }
            Err(e) => {
                warn!("mqtt: publish failed for {}: {}", topic, e);
                false
            }
        }
    }

    /// Publish a command acknowledgement (never retained).
    pub async fn publish_ack(&self, topic: &str, value: &str) {
        if let Err(e) = self
            .client
            .publish(topic.to_string(), self.qos, false, value.to_string())
            .await
        {
            warn!("mqtt: ack publish failed for {}: {}", topic, e);
        }
    }
}
