//! Access to the monitoring store's per-node data.
//!
//! The collection system itself is an external collaborator; the pipeline
//! only sees a read-only view of one node's latest cycle through the
//! `NodeSource` seam. The shipped implementation reads the store's JSON dump
//! for the node.

use crate::error::SourceError;
use crate::model::{MeasurementSnapshot, NodeContext};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Read-only view of one node's collected data for a run.
pub trait NodeSource {
    fn context(&self) -> &NodeContext;

    /// Latest snapshots for every instance of one concept. A concept the
    /// store never collected yields an empty list, not an error.
    fn instances(&self, concept: &str) -> Result<Vec<MeasurementSnapshot>, SourceError>;
}

/// One node's dump file: context record plus raw instance entries per
/// concept. Instances stay raw JSON until asked for, so a single malformed
/// entry only costs that entry.
#[derive(Debug, Deserialize)]
pub struct NodeDump {
    pub node: NodeContext,
    #[serde(default)]
    concepts: HashMap<String, Vec<Value>>,
}

impl NodeDump {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| SourceError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl NodeSource for NodeDump {
    fn context(&self) -> &NodeContext {
        &self.node
    }

    fn instances(&self, concept: &str) -> Result<Vec<MeasurementSnapshot>, SourceError> {
        let raw = match self.concepts.get(concept) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        let mut snapshots = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_value::<MeasurementSnapshot>(entry.clone()) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(
                        node = %self.node.name,
                        concept,
                        error = %e,
                        "malformed instance entry, skipping"
                    );
                }
            }
        }
        Ok(snapshots)
    }
}
