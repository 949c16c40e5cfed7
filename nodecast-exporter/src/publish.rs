//! Bounded-retry delivery to one or two MQTT brokers.
//!
//! Every attempt stands alone: fresh connection, authentication when
//! credentials are configured, QoS 1 publish confirmed by the broker's
//! acknowledgement, disconnect. A failed attempt is assumed to mean a broken
//! or stale connection, so nothing is reused across retries.

use crate::config::BrokerTarget;
use crate::error::TransportError;
use crate::model::PublishUnit;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// One delivery attempt against one broker. Implementations must not hold
/// connection state across calls.
#[async_trait]
pub trait MqttTransport {
    async fn deliver(
        &self,
        target: &BrokerTarget,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError>;
}

/// rumqttc-backed transport. Each call is bounded by the configured timeout
/// so one broken broker cannot stall the whole node run.
pub struct RumqttcTransport {
    pub timeout: Duration,
}

#[async_trait]
impl MqttTransport for RumqttcTransport {
    async fn deliver(
        &self,
        target: &BrokerTarget,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError> {
        match tokio::time::timeout(
            self.timeout,
            deliver_once(target, topic, payload, retain),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                topic: topic.to_string(),
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

async fn deliver_once(
    target: &BrokerTarget,
    topic: &str,
    payload: &[u8],
    retain: bool,
) -> Result<(), TransportError> {
    let client_id = format!("nodecast-{}", Uuid::new_v4().simple());
    let mut options = MqttOptions::new(client_id, &target.host, target.port);
    options.set_keep_alive(Duration::from_secs(15));
    options.set_clean_session(true);
    if let Some(username) = &target.username {
        options.set_credentials(username, target.password.as_deref().unwrap_or(""));
    }

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    client
        .publish(topic, QoS::AtLeastOnce, retain, payload)
        .await
        .map_err(|e| TransportError::Connection {
            endpoint: target.endpoint(),
            reason: e.to_string(),
        })?;

    // Drive the event loop until the broker acknowledges the publish.
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::PubAck(_))) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(TransportError::Unacknowledged {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
    let _ = client.disconnect().await;
    Ok(())
}

/// Outcome of delivering one unit: primary result plus, when a secondary
/// target is configured, its independent result.
#[derive(Debug)]
pub struct DeliveryReport {
    pub primary: Result<(), TransportError>,
    pub secondary: Option<Result<(), TransportError>>,
}

pub struct Publisher<'a, T: MqttTransport> {
    transport: &'a T,
    primary: &'a BrokerTarget,
    secondary: Option<&'a BrokerTarget>,
}

impl<'a, T: MqttTransport> Publisher<'a, T> {
    pub fn new(
        transport: &'a T,
        primary: &'a BrokerTarget,
        secondary: Option<&'a BrokerTarget>,
    ) -> Self {
        Self {
            transport,
            primary,
            secondary,
        }
    }

    /// Deliver one unit to the primary and, when configured, replay it to the
    /// secondary with the topic prefix rewritten. The secondary's outcome
    /// never affects the primary's.
    pub async fn publish(&self, unit: &PublishUnit) -> Result<DeliveryReport, TransportError> {
        let payload = serde_json::to_vec(&unit.payload)?;

        let primary = self
            .deliver_with_retry(self.primary, &unit.topic, &payload)
            .await;

        let secondary = match self.secondary {
            Some(target) => {
                let topic = rewrite_prefix(
                    &unit.topic,
                    &self.primary.topic_prefix,
                    &target.topic_prefix,
                );
                Some(self.deliver_with_retry(target, &topic, &payload).await)
            }
            None => None,
        };

        Ok(DeliveryReport { primary, secondary })
    }

    /// Up to `retries + 1` attempts; the first clean attempt wins, otherwise
    /// the last transport error is returned.
    async fn deliver_with_retry(
        &self,
        target: &BrokerTarget,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .transport
                .deliver(target, topic, payload, target.retain)
                .await
            {
                Ok(()) => {
                    debug!(topic, attempt, endpoint = %target.endpoint(), "delivered");
                    return Ok(());
                }
                Err(e) if attempt > target.retries => return Err(e),
                Err(e) => {
                    warn!(
                        topic,
                        attempt,
                        endpoint = %target.endpoint(),
                        error = %e,
                        "publish attempt failed, retrying"
                    );
                }
            }
        }
    }
}

/// Secondary topics are the primary topic with the prefix swapped. A topic
/// that does not carry the primary prefix keeps its full path under the
/// secondary prefix.
fn rewrite_prefix(topic: &str, from: &str, to: &str) -> String {
    match topic.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => format!("{}/{}", to, topic.trim_start_matches('/')),
    }
}
