//! Per-node message envelope.
//!
//! Every message of a run carries the same node-identifying block, built once
//! from the `NodeContext`. Missing attributes are emitted as empty strings so
//! downstream consumers always see the full key set.

use crate::model::NodeContext;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Fixed service identifier stamped on every message.
const SERVICE: &str = "nmis";
/// Fixed scope identifier: this exporter publishes node-level data.
const SCOPE: &str = "node";

pub fn build(node: &NodeContext) -> BTreeMap<String, Value> {
    let mut envelope = BTreeMap::new();
    envelope.insert("node".to_string(), json!(node.name));
    envelope.insert("uuid".to_string(), json!(text(&node.uuid)));
    envelope.insert("group".to_string(), json!(text(&node.group)));
    envelope.insert("system".to_string(), json!(text(&node.system)));
    envelope.insert("host".to_string(), json!(text(&node.host)));
    envelope.insert("node_type".to_string(), json!(text(&node.node_type)));
    envelope.insert("service".to_string(), json!(SERVICE));
    envelope.insert("scope".to_string(), json!(SCOPE));
    envelope.insert(
        "agent".to_string(),
        json!(format!("nodecast-exporter/{}", env!("CARGO_PKG_VERSION"))),
    );
    envelope
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> NodeContext {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_context_round_trips() {
        let envelope = build(&node(json!({
            "name": "core-rtr-01",
            "uuid": "2fc5…",
            "group": "DataCenter",
            "system": "core-rtr-01.example.net",
            "host": "10.0.0.1",
            "node_type": "router"
        })));
        assert_eq!(envelope.get("node").unwrap(), "core-rtr-01");
        assert_eq!(envelope.get("group").unwrap(), "DataCenter");
        assert_eq!(envelope.get("host").unwrap(), "10.0.0.1");
        assert_eq!(envelope.get("service").unwrap(), "nmis");
        assert_eq!(envelope.get("scope").unwrap(), "node");
    }

    #[test]
    fn missing_attributes_become_empty_strings() {
        let sparse = build(&node(json!({ "name": "lonely" })));
        let full = build(&node(json!({
            "name": "lonely",
            "uuid": "u",
            "group": "g",
            "system": "s",
            "host": "h",
            "node_type": "t"
        })));
        // stable key set regardless of what the store knew about the node
        assert_eq!(
            sparse.keys().collect::<Vec<_>>(),
            full.keys().collect::<Vec<_>>()
        );
        assert_eq!(sparse.get("group").unwrap(), "");
        assert_eq!(sparse.get("node_type").unwrap(), "");
    }
}
