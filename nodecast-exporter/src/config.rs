//! Exporter configuration.
//!
//! Loaded once per invocation from TOML and immutable afterwards:
//! - primary (and optional secondary) broker target
//! - ordered list of concepts to export
//! - per-concept routing overrides (fan-out policy, label fields, renames)
//!
//! The path comes from `NODECAST_CONFIG` or defaults to `./nodecast.toml`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "NODECAST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "nodecast.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub export: ExportSection,
    /// Routing overrides merged over the built-in concept defaults.
    #[serde(default)]
    pub concepts: HashMap<String, ConceptOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerSection {
    pub primary: Option<BrokerTarget>,
    pub secondary: Option<BrokerTarget>,
}

/// One broker destination.
#[derive(Clone, Deserialize)]
pub struct BrokerTarget {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default)]
    pub retain: bool,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl BrokerTarget {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Passwords must never reach logs.
impl fmt::Debug for BrokerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("topic_prefix", &self.topic_prefix)
            .field("retain", &self.retain)
            .field("retries", &self.retries)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    /// Concepts exported per run, in this order.
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub extra_logging: bool,
    /// Upper bound for one delivery attempt, connection included.
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            concepts: Vec::new(),
            extra_logging: false,
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

/// Per-concept routing override from `[concepts.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptOverride {
    pub singleton: Option<bool>,
    pub published_name: Option<String>,
    pub description_fields: Option<Vec<String>>,
    /// scope name -> raw field -> canonical field
    #[serde(default)]
    pub rename: HashMap<String, HashMap<String, String>>,
}

fn default_port() -> u16 {
    1883
}

fn default_topic_prefix() -> String {
    "nmis".to_string()
}

fn default_retries() -> u32 {
    2
}

fn default_publish_timeout() -> u64 {
    10
}

impl ExporterConfig {
    /// Load and parse the config file. A missing file is an error: without a
    /// broker endpoint there is nothing this exporter can do.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Invalid {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }

    /// `NODECAST_CONFIG` when set, `./nodecast.toml` otherwise.
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Fatal-at-startup checks. An empty concept list is deliberately not
    /// checked here: that is a valid no-op run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.broker.primary.as_ref() {
            Some(target) if !target.host.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingEndpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [broker.primary]
        host = "mqtt.example.net"
        username = "exporter"
        password = "hunter2"
        topic_prefix = "nmis"
        retain = true

        [broker.secondary]
        host = "mirror.example.net"
        port = 8883
        topic_prefix = "dr/nmis"

        [export]
        concepts = ["health", "interface"]
        extra_logging = true

        [concepts.interface]
        published_name = "intf"

        [concepts.interface.rename.interface]
        ifInOctets = "octets_in"
    "#;

    #[test]
    fn parses_full_config() {
        let cfg: ExporterConfig = toml::from_str(SAMPLE).unwrap();
        let primary = cfg.broker.primary.as_ref().unwrap();
        assert_eq!(primary.host, "mqtt.example.net");
        assert_eq!(primary.port, 1883);
        assert_eq!(primary.retries, 2);
        assert!(primary.retain);

        let secondary = cfg.broker.secondary.as_ref().unwrap();
        assert_eq!(secondary.port, 8883);
        assert_eq!(secondary.topic_prefix, "dr/nmis");
        assert!(!secondary.retain);

        assert_eq!(cfg.export.concepts, vec!["health", "interface"]);
        assert!(cfg.export.extra_logging);

        let intf = cfg.concepts.get("interface").unwrap();
        assert_eq!(intf.published_name.as_deref(), Some("intf"));
        assert_eq!(
            intf.rename.get("interface").unwrap().get("ifInOctets").unwrap(),
            "octets_in"
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_endpoint_is_fatal() {
        let cfg: ExporterConfig = toml::from_str("[export]\nconcepts = [\"health\"]").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingEndpoint)));

        let cfg: ExporterConfig = toml::from_str("[broker.primary]\nhost = \"  \"").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExporterConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodecast.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = ExporterConfig::load(&path).unwrap();
        assert_eq!(cfg.export.concepts.len(), 2);
    }

    #[test]
    fn debug_never_prints_passwords() {
        let cfg: ExporterConfig = toml::from_str(SAMPLE).unwrap();
        let rendered = format!("{:?}", cfg.broker.primary);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
