//! Exporter error types.
//!
//! Three failure families, matching how the run driver treats them:
//! - `ConfigError`: aborts the whole run before anything is published
//! - `SourceError`: isolates one concept fetch, the run continues
//! - `TransportError`: isolates one delivery attempt, the run continues

use thiserror::Error;

/// Configuration problems. These are the only errors that turn a run fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file missing or unreadable.
    #[error("cannot read config {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file present but not valid TOML for the expected shape.
    #[error("invalid config {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// No primary broker endpoint configured.
    #[error("no primary broker endpoint configured")]
    MissingEndpoint,
}

/// Failures reading node data from the monitoring store.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Node dump file missing or unreadable.
    #[error("cannot read node dump {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Node dump present but not parseable.
    #[error("malformed node dump {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One failed delivery attempt against one broker.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach or authenticate against the broker.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// Broker reachable but the publish was never acknowledged.
    #[error("publish to {topic} not acknowledged: {reason}")]
    Unacknowledged { topic: String, reason: String },

    /// The whole attempt exceeded the configured transport timeout.
    #[error("publish to {topic} timed out after {ms}ms")]
    Timeout { topic: String, ms: u64 },

    /// Payload could not be encoded as JSON.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
