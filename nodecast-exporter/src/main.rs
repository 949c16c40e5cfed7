//! nodecast-exporter - publishes a node's latest monitored measurements to MQTT
//!
//! One invocation per node per collection cycle, driven by the external
//! scheduler:
//! - Labels each measured instance from its inventory attributes
//! - Renames measurement fields to the canonical external vocabulary
//! - Assembles one topic and one flat JSON payload per publishable unit
//! - Delivers to a primary and optional secondary broker with bounded retry

mod assemble;
mod canon;
mod config;
mod describe;
mod envelope;
mod error;
mod model;
mod pipeline;
mod publish;
mod routing;
mod source;

use anyhow::{Context, Result};
use config::ExporterConfig;
use publish::RumqttcTransport;
use routing::RoutingTable;
use source::{NodeDump, NodeSource};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = ExporterConfig::default_path();
    let cfg = ExporterConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    init_tracing(cfg.export.extra_logging);
    cfg.validate().context("invalid exporter configuration")?;

    let dump_paths: Vec<String> = std::env::args().skip(1).collect();
    if dump_paths.is_empty() {
        anyhow::bail!("usage: nodecast-exporter <node-dump.json> [more dumps...]");
    }

    let routing = RoutingTable::with_defaults().with_overrides(&cfg.concepts);
    let transport = RumqttcTransport {
        timeout: Duration::from_secs(cfg.export.publish_timeout_secs),
    };

    info!(
        config = %config_path.display(),
        nodes = dump_paths.len(),
        "starting export"
    );

    let mut exit_code = 0;
    for path in &dump_paths {
        let dump = match NodeDump::load(Path::new(path)) {
            Ok(dump) => dump,
            Err(e) => {
                error!(path = %path, error = %e, "cannot load node dump");
                if exit_code == 0 {
                    exit_code = 1;
                }
                continue;
            }
        };

        let outcome = pipeline::run_node_export(&cfg, &routing, &dump, &transport).await;
        if outcome.code != 0 {
            error!(
                node = %dump.context().name,
                code = outcome.code,
                message = outcome.message.as_deref().unwrap_or(""),
                "export run failed"
            );
            if exit_code == 0 {
                exit_code = outcome.code;
            }
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn init_tracing(extra_logging: bool) {
    let default_filter = if extra_logging {
        "nodecast_exporter=debug"
    } else {
        "nodecast_exporter=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
