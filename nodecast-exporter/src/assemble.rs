//! Message assembly: fan-out policy, topic construction, payload flattening.
//!
//! One assembler per (node, concept) pair turns the concept's snapshots into
//! publish units. Singleton concepts split into one unit per subconcept;
//! everything else emits one unit per instance with all subconcept data
//! flattened under the concept's rename scope.

use crate::canon;
use crate::describe;
use crate::model::{MeasurementSnapshot, PublishUnit};
use crate::routing::RoutingRule;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Derived metrics with these key prefixes are the 8/16-hour summary windows;
/// consumers must not see them republished.
const DERIVED_SKIP_PREFIXES: &[&str] = &["08", "16"];

pub struct Assembler<'a> {
    pub rule: &'a RoutingRule,
    pub envelope: &'a BTreeMap<String, Value>,
    pub topic_prefix: &'a str,
    pub node_name: &'a str,
    /// Stamped on units whose snapshot has no collection timestamp.
    pub fallback_time: DateTime<Utc>,
}

impl Assembler<'_> {
    /// Units for every valid snapshot of this concept. Stale snapshots
    /// produce nothing; that is a skip, not an error.
    pub fn assemble(&self, instances: &[MeasurementSnapshot]) -> Vec<PublishUnit> {
        let mut units = Vec::new();
        for snapshot in instances {
            if !snapshot.valid {
                debug!(
                    concept = %self.rule.concept,
                    index = %snapshot.instance_index(),
                    "no fresh data, skipping instance"
                );
                continue;
            }
            if self.rule.singleton {
                units.extend(self.singleton_units(snapshot));
            } else if let Some(unit) = self.instance_unit(snapshot) {
                units.push(unit);
            }
        }
        units
    }

    /// Singleton fan-out: one unit per non-empty subconcept, renamed under
    /// the subconcept's own scope, derived summary windows filtered out.
    fn singleton_units(&self, snapshot: &MeasurementSnapshot) -> Vec<PublishUnit> {
        let description = describe::resolve(self.rule, &snapshot.attributes);
        let mut names: Vec<&String> = snapshot.subconcepts.keys().collect();
        names.sort();

        let mut units = Vec::new();
        for subconcept in names {
            let fields = &snapshot.subconcepts[subconcept];
            if fields.is_empty() {
                continue;
            }
            let renames = self.rule.renames_for(subconcept);
            let mut payload = self.base_payload(subconcept, snapshot, &description);
            payload.extend(canon::canonicalize(renames, fields));
            if let Some(derived) = snapshot.derived.get(subconcept) {
                let kept: HashMap<String, Value> = derived
                    .iter()
                    .filter(|(key, _)| {
                        !DERIVED_SKIP_PREFIXES.iter().any(|p| key.starts_with(p))
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                payload.extend(canon::canonicalize(renames, &kept));
            }
            units.push(PublishUnit {
                topic: format!("{}/{}/{}", self.topic_prefix, self.node_name, subconcept),
                payload,
            });
        }
        units
    }

    /// Per-instance fan-out: all subconcept data flattened into one unit,
    /// addressed by sanitized description, or index when no label exists.
    fn instance_unit(&self, snapshot: &MeasurementSnapshot) -> Option<PublishUnit> {
        let mut flat: HashMap<String, Value> = HashMap::new();
        for fields in snapshot.subconcepts.values() {
            for (key, value) in fields {
                flat.insert(key.clone(), value.clone());
            }
        }
        if flat.is_empty() {
            debug!(
                concept = %self.rule.concept,
                index = %snapshot.instance_index(),
                "instance carries no measurement data, skipping"
            );
            return None;
        }

        let description = describe::resolve(self.rule, &snapshot.attributes);
        let leaf = {
            let sanitized = sanitize_description(&description);
            if sanitized.is_empty() {
                sanitize_index(&snapshot.instance_index())
            } else {
                sanitized
            }
        };

        let mut payload = self.base_payload(self.rule.published_name(), snapshot, &description);
        payload.extend(canon::canonicalize(
            self.rule.renames_for(&self.rule.concept),
            &flat,
        ));

        Some(PublishUnit {
            topic: format!(
                "{}/{}/{}/{}",
                self.topic_prefix,
                self.node_name,
                self.rule.published_name(),
                leaf
            ),
            payload,
        })
    }

    fn base_payload(
        &self,
        concept: &str,
        snapshot: &MeasurementSnapshot,
        description: &str,
    ) -> BTreeMap<String, Value> {
        let time = snapshot.observed_at.unwrap_or(self.fallback_time);
        let mut payload = self.envelope.clone();
        payload.insert("concept".to_string(), json!(concept));
        payload.insert("index".to_string(), json!(snapshot.instance_index()));
        payload.insert("description".to_string(), json!(description));
        payload.insert("time".to_string(), json!(time.to_rfc3339()));
        payload
    }
}

/// Topic segment from a free-text label: leading slashes stripped, `/` and
/// `:` become `-`, whitespace becomes `_`.
pub fn sanitize_description(raw: &str) -> String {
    raw.trim_start_matches('/')
        .chars()
        .map(|c| match c {
            '/' | ':' => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Topic segment from an instance index: `/`, `:` and whitespace all become
/// `_`. Not the same replacement as the description sanitizer.
pub fn sanitize_index(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | ':' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
