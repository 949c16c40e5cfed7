//! Field canonicalization.
//!
//! Raw measurement fields are renamed to the stable external vocabulary
//! before publishing. The rename table is resolved per scope by the caller:
//! the subconcept name for singleton concepts, the concept name otherwise.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Volatile raw-counter fields never leave the collector.
pub const RAW_COUNTER_SUFFIX: &str = "_raw";

/// Namespace for fields without a canonical rename, so producer-specific
/// fields neither collide with canonical names nor silently disappear.
pub const UNMAPPED_PREFIX: &str = "nmis.";

/// Rename every raw field: drop `*_raw` counters, apply the scope's rename
/// table, prefix everything else with the reserved namespace. Values pass
/// through unchanged.
pub fn canonicalize(
    renames: Option<&HashMap<String, String>>,
    raw: &HashMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        if key.ends_with(RAW_COUNTER_SUFFIX) {
            continue;
        }
        let name = match renames.and_then(|table| table.get(key)) {
            Some(canonical) => canonical.clone(),
            None => format!("{UNMAPPED_PREFIX}{key}"),
        };
        out.insert(name, value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
            .collect()
    }

    fn fields(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renames_known_fields_and_prefixes_the_rest() {
        let renames = table(&[("ifInOctets", "octets_in")]);
        let out = canonicalize(
            Some(&renames),
            &fields(&[
                ("ifInOctets", json!(123456)),
                ("ifPromiscuousMode", json!("false")),
            ]),
        );
        assert_eq!(out.get("octets_in").unwrap(), &json!(123456));
        assert_eq!(out.get("nmis.ifPromiscuousMode").unwrap(), &json!("false"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drops_volatile_raw_counters() {
        let out = canonicalize(
            None,
            &fields(&[("octets_raw", json!(99)), ("octets", json!(42))]),
        );
        assert!(out.keys().all(|k| !k.ends_with(RAW_COUNTER_SUFFIX)));
        assert_eq!(out.get("nmis.octets").unwrap(), &json!(42));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn every_output_key_is_canonical_or_namespaced() {
        let renames = table(&[("response", "response_time")]);
        let out = canonicalize(
            Some(&renames),
            &fields(&[
                ("response", json!(12.5)),
                ("loss", json!(0)),
                ("weird field", json!("x")),
            ]),
        );
        for key in out.keys() {
            assert!(
                key == "response_time" || key.starts_with(UNMAPPED_PREFIX),
                "unexpected key {key}"
            );
        }
    }

    #[test]
    fn values_pass_through_untouched() {
        let out = canonicalize(None, &fields(&[("speed", json!("100000000"))]));
        // no coercion: the string stays a string
        assert_eq!(out.get("nmis.speed").unwrap(), &json!("100000000"));
    }
}
