/*!
Builders fabricating monitoring-store node dumps for tests.

Produce the same JSON shape the exporter's node source reads, without
touching a real monitoring installation.
*/

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Builds one node dump: a context record plus instance entries per concept.
pub struct NodeDumpBuilder {
    node: Map<String, Value>,
    concepts: Map<String, Value>,
}

impl NodeDumpBuilder {
    pub fn new(name: &str) -> Self {
        let mut node = Map::new();
        node.insert("name".to_string(), json!(name));
        Self {
            node,
            concepts: Map::new(),
        }
    }

    pub fn group(mut self, group: &str) -> Self {
        self.node.insert("group".to_string(), json!(group));
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.node.insert("host".to_string(), json!(host));
        self
    }

    pub fn node_type(mut self, node_type: &str) -> Self {
        self.node.insert("node_type".to_string(), json!(node_type));
        self
    }

    pub fn down(mut self, down: bool) -> Self {
        self.node.insert("down".to_string(), json!(down));
        self
    }

    pub fn unreachable(mut self, unreachable: bool) -> Self {
        self.node.insert("unreachable".to_string(), json!(unreachable));
        self
    }

    /// Add one concept's instance list.
    pub fn concept(mut self, name: &str, instances: Vec<Value>) -> Self {
        self.concepts.insert(name.to_string(), Value::Array(instances));
        self
    }

    pub fn build(self) -> Value {
        json!({
            "node": Value::Object(self.node),
            "concepts": Value::Object(self.concepts),
        })
    }
}

/// Builds one instance entry within a concept.
pub struct InstanceBuilder {
    entry: Map<String, Value>,
}

impl InstanceBuilder {
    pub fn new(index: &str) -> Self {
        let mut entry = Map::new();
        entry.insert("index".to_string(), json!(index));
        Self { entry }
    }

    pub fn attribute(mut self, name: &str, value: Value) -> Self {
        self.nested("attributes", name, value);
        self
    }

    pub fn subconcept(mut self, name: &str, fields: Value) -> Self {
        self.nested("subconcepts", name, fields);
        self
    }

    pub fn derived(mut self, name: &str, fields: Value) -> Self {
        self.nested("derived", name, fields);
        self
    }

    fn nested(&mut self, section: &str, name: &str, value: Value) {
        if let Some(map) = self
            .entry
            .entry(section)
            .or_insert_with(|| json!({}))
            .as_object_mut()
        {
            map.insert(name.to_string(), value);
        }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.entry.insert("observed_at".to_string(), json!(at.to_rfc3339()));
        self
    }

    pub fn stale(mut self) -> Self {
        self.entry.insert("valid".to_string(), json!(false));
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_store_dump_shape() {
        let dump = NodeDumpBuilder::new("core-rtr-01")
            .group("DataCenter")
            .down(false)
            .concept(
                "interface",
                vec![InstanceBuilder::new("1")
                    .attribute("ifDescr", json!("Gi0/0"))
                    .subconcept("interface", json!({ "ifInOctets": 5 }))
                    .build()],
            )
            .build();

        assert_eq!(dump["node"]["name"], "core-rtr-01");
        assert_eq!(dump["node"]["group"], "DataCenter");
        let instance = &dump["concepts"]["interface"][0];
        assert_eq!(instance["index"], "1");
        assert_eq!(instance["attributes"]["ifDescr"], "Gi0/0");
        assert_eq!(instance["subconcepts"]["interface"]["ifInOctets"], 5);
    }

    #[test]
    fn stale_instances_are_flagged_invalid() {
        let instance = InstanceBuilder::new("2").stale().build();
        assert_eq!(instance["valid"], false);
    }
}
