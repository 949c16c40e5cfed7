//! Per-concept routing policy.
//!
//! A `RoutingRule` is pure data: fan-out mode, display alias, label field
//! order and rename tables, looked up per scope (subconcept for singleton
//! concepts, the concept itself otherwise). The table ships with defaults for
//! the stock concepts and takes `[concepts.<name>]` overrides from the config
//! file; after that merge it is immutable for the whole run.

use crate::config::ConceptOverride;
use std::collections::HashMap;

/// Label fields tried after any concept-specific order, in this order.
pub const FALLBACK_DESCRIPTION_FIELDS: &[&str] =
    &["Description", "description", "Name", "name", "index"];

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub concept: String,
    /// Singleton concepts publish once per subconcept; everything else
    /// publishes once per instance.
    pub singleton: bool,
    published_name: Option<String>,
    pub description_fields: Vec<String>,
    /// scope name -> raw field -> canonical field
    renames: HashMap<String, HashMap<String, String>>,
}

impl RoutingRule {
    /// Default policy for a concept nothing was configured for.
    pub fn per_instance(concept: &str) -> Self {
        Self {
            concept: concept.to_string(),
            singleton: false,
            published_name: None,
            description_fields: Vec::new(),
            renames: HashMap::new(),
        }
    }

    pub fn published_name(&self) -> &str {
        self.published_name.as_deref().unwrap_or(&self.concept)
    }

    pub fn renames_for(&self, scope: &str) -> Option<&HashMap<String, String>> {
        self.renames.get(scope)
    }
}

/// All routing rules for a run, keyed by concept name.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: HashMap<String, RoutingRule>,
}

impl RoutingTable {
    pub fn with_defaults() -> Self {
        let mut rules = HashMap::new();
        for rule in default_rules() {
            rules.insert(rule.concept.clone(), rule);
        }
        Self { rules }
    }

    /// Merge config-file overrides over the defaults. Override rename entries
    /// win per key; unknown concepts get a fresh per-instance rule first.
    pub fn with_overrides(mut self, overrides: &HashMap<String, ConceptOverride>) -> Self {
        for (concept, over) in overrides {
            let rule = self
                .rules
                .entry(concept.clone())
                .or_insert_with(|| RoutingRule::per_instance(concept));
            if let Some(singleton) = over.singleton {
                rule.singleton = singleton;
            }
            if over.published_name.is_some() {
                rule.published_name = over.published_name.clone();
            }
            if let Some(fields) = &over.description_fields {
                rule.description_fields = fields.clone();
            }
            for (scope, table) in &over.rename {
                let scoped = rule.renames.entry(scope.clone()).or_default();
                for (raw, canonical) in table {
                    scoped.insert(raw.clone(), canonical.clone());
                }
            }
        }
        self
    }

    /// The rule for a concept, falling back to plain per-instance fan-out so
    /// an unconfigured concept still exports.
    pub fn rule_for(&self, concept: &str) -> RoutingRule {
        self.rules
            .get(concept)
            .cloned()
            .unwrap_or_else(|| RoutingRule::per_instance(concept))
    }
}

fn default_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            concept: "health".into(),
            singleton: true,
            published_name: None,
            description_fields: Vec::new(),
            renames: scopes(&[
                (
                    "health",
                    &[
                        ("response", "response_time"),
                        ("loss", "packet_loss"),
                        ("health", "health_score"),
                        ("reachability", "reachability"),
                        ("availability", "availability"),
                    ],
                ),
                (
                    "tcp",
                    &[
                        ("tcpCurrEstab", "tcp_established"),
                        ("tcpActiveOpens", "tcp_active_opens"),
                        ("tcpRetransSegs", "tcp_retransmits"),
                    ],
                ),
                (
                    "laload",
                    &[
                        ("laLoad1", "load_1min"),
                        ("laLoad5", "load_5min"),
                        ("laLoad15", "load_15min"),
                    ],
                ),
            ]),
        },
        RoutingRule {
            concept: "interface".into(),
            singleton: false,
            published_name: None,
            description_fields: vec!["ifDescr".into(), "Description".into()],
            renames: scopes(&[(
                "interface",
                &[
                    ("ifInOctets", "octets_in"),
                    ("ifOutOctets", "octets_out"),
                    ("ifInUcastPkts", "packets_in"),
                    ("ifOutUcastPkts", "packets_out"),
                    ("ifInErrors", "errors_in"),
                    ("ifOutErrors", "errors_out"),
                    ("ifOperStatus", "oper_status"),
                    ("ifAdminStatus", "admin_status"),
                    ("ifSpeed", "speed_bps"),
                ],
            )]),
        },
        RoutingRule {
            concept: "storage".into(),
            singleton: false,
            published_name: None,
            description_fields: vec!["hrStorageDescr".into()],
            renames: scopes(&[(
                "storage",
                &[
                    ("hrStorageSize", "size_units"),
                    ("hrStorageUsed", "used_units"),
                    ("hrStorageUnits", "unit_bytes"),
                ],
            )]),
        },
        RoutingRule {
            concept: "ping".into(),
            singleton: false,
            published_name: None,
            description_fields: Vec::new(),
            renames: scopes(&[(
                "ping",
                &[("response", "response_time"), ("loss", "packet_loss")],
            )]),
        },
    ]
}

fn scopes(entries: &[(&str, &[(&str, &str)])]) -> HashMap<String, HashMap<String, String>> {
    entries
        .iter()
        .map(|(scope, pairs)| {
            (
                scope.to_string(),
                pairs
                    .iter()
                    .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                    .collect(),
            )
        })
        .collect()
}
