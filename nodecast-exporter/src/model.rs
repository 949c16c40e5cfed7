//! Value objects handed over by the monitoring store.
//!
//! Everything here is constructed once per run from the store's node dump and
//! never mutated afterwards; the pipeline only reads these shapes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Per-node invariant data for one export run.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeContext {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, alias = "nodeType")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub unreachable: bool,
}

/// Latest successfully collected data for one inventory instance.
///
/// `subconcepts` maps subconcept name to metric name to value; `derived`
/// has the same shape and holds computed metrics. A snapshot with
/// `valid == false` means no fresh data existed at collection time.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementSnapshot {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub subconcepts: HashMap<String, HashMap<String, Value>>,
    #[serde(default)]
    pub derived: HashMap<String, HashMap<String, Value>>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

impl MeasurementSnapshot {
    /// Stable identifier of this instance within its concept, `"0"` when the
    /// store recorded none.
    pub fn instance_index(&self) -> String {
        if let Some(ix) = &self.index {
            if !ix.is_empty() {
                return ix.clone();
            }
        }
        match self.attributes.get("index") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        }
    }
}

/// One (topic, payload) pair ready for delivery.
///
/// The payload is a flat sorted map so the encoded JSON always has
/// deterministic key order.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishUnit {
    pub topic: String,
    pub payload: BTreeMap<String, Value>,
}
