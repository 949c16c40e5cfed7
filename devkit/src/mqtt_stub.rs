/*!
Mock MQTT delivery recorder for development without a broker.

Records every delivery attempt per endpoint and can be scripted to fail the
next N attempts against a given endpoint, which is how retry and
secondary-target paths are exercised in tests.
*/

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One successfully recorded delivery.
#[derive(Debug, Clone)]
pub struct MockDelivery {
    pub endpoint: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

/// Mock broker standing in for the real MQTT transport.
#[derive(Clone, Default)]
pub struct MockBroker {
    deliveries: Arc<Mutex<Vec<MockDelivery>>>,
    attempts: Arc<Mutex<HashMap<String, usize>>>,
    failures: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` delivery attempts against `endpoint`.
    pub fn fail_next(&self, endpoint: &str, count: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), count);
    }

    /// Record one delivery attempt; fails while a failure script is armed.
    pub async fn deliver(
        &self,
        endpoint: &str,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<()> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_insert(0) += 1;

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(endpoint) {
                if *remaining > 0 {
                    *remaining -= 1;
                    log::info!("[MOCK] injected failure for {endpoint} on {topic}");
                    bail!("injected failure for {endpoint}");
                }
            }
        }

        self.deliveries.lock().unwrap().push(MockDelivery {
            endpoint: endpoint.to_string(),
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        });
        log::info!(
            "[MOCK] delivered {} bytes to {endpoint} topic {topic}",
            payload.len()
        );
        Ok(())
    }

    /// Delivery attempts seen for an endpoint, failed ones included.
    pub fn attempts(&self, endpoint: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// All recorded deliveries (for test assertions).
    pub fn deliveries(&self) -> Vec<MockDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Recorded deliveries for one topic.
    pub fn find_by_topic(&self, topic: &str) -> Vec<MockDelivery> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|delivery| delivery.topic == topic)
            .cloned()
            .collect()
    }

    /// Parse the last payload delivered on a topic as JSON.
    pub fn last_json(&self, topic: &str) -> Result<Option<Value>> {
        let deliveries = self.find_by_topic(topic);
        match deliveries.last() {
            Some(delivery) => Ok(Some(serde_json::from_slice(&delivery.payload)?)),
            None => Ok(None),
        }
    }

    /// Reset recorded deliveries, attempts and failure scripts.
    pub fn clear(&self) {
        self.deliveries.lock().unwrap().clear();
        self.attempts.lock().unwrap().clear();
        self.failures.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_deliveries_per_endpoint() {
        crate::init_test_logging();
        let broker = MockBroker::new();

        broker
            .deliver("primary:1883", "nmis/node7/health", b"{}", false)
            .await
            .unwrap();
        broker
            .deliver("mirror:1883", "dr/nmis/node7/health", b"{}", true)
            .await
            .unwrap();

        assert_eq!(broker.deliveries().len(), 2);
        assert_eq!(broker.attempts("primary:1883"), 1);
        assert_eq!(broker.attempts("mirror:1883"), 1);
        assert!(broker.find_by_topic("dr/nmis/node7/health")[0].retain);
    }

    #[tokio::test]
    async fn failure_script_drains_then_recovers() {
        let broker = MockBroker::new();
        broker.fail_next("primary:1883", 2);

        assert!(broker.deliver("primary:1883", "t", b"{}", false).await.is_err());
        assert!(broker.deliver("primary:1883", "t", b"{}", false).await.is_err());
        assert!(broker.deliver("primary:1883", "t", b"{}", false).await.is_ok());

        // another endpoint is never affected
        assert!(broker.deliver("mirror:1883", "t", b"{}", false).await.is_ok());
        assert_eq!(broker.attempts("primary:1883"), 3);
        assert_eq!(broker.find_by_topic("t").len(), 2);
    }

    #[tokio::test]
    async fn parses_last_json_payload() {
        let broker = MockBroker::new();
        let payload = serde_json::to_vec(&json!({ "octets_in": 42 })).unwrap();
        broker
            .deliver("primary:1883", "nmis/node7/intf/Gi0-0", &payload, false)
            .await
            .unwrap();

        let parsed = broker.last_json("nmis/node7/intf/Gi0-0").unwrap().unwrap();
        assert_eq!(parsed["octets_in"], 42);
        assert!(broker.last_json("no/such/topic").unwrap().is_none());
    }
}
