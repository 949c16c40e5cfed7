//! Per-node export run.
//!
//! One run walks Guard -> Config -> PerConcept -> Done, sequentially and
//! single-threaded per the scheduler contract. Only configuration problems
//! turn a run fatal; everything data- or transport-level is isolated so one
//! broken instance or unreachable broker never blocks the rest.

use crate::assemble::Assembler;
use crate::config::ExporterConfig;
use crate::envelope;
use crate::publish::{MqttTransport, Publisher};
use crate::routing::RoutingTable;
use crate::source::NodeSource;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Aggregate result of one node run, handed back to the external scheduler.
#[derive(Debug)]
pub struct RunOutcome {
    /// 0 for success or no-op, non-zero for fatal configuration problems.
    pub code: i32,
    pub message: Option<String>,
    pub published: usize,
    pub failed: usize,
}

impl RunOutcome {
    fn ok() -> Self {
        Self {
            code: 0,
            message: None,
            published: 0,
            failed: 0,
        }
    }

    fn fatal(message: impl Into<String>) -> Self {
        Self {
            code: 1,
            message: Some(message.into()),
            published: 0,
            failed: 0,
        }
    }
}

pub async fn run_node_export<S, T>(
    config: &ExporterConfig,
    routing: &RoutingTable,
    source: &S,
    transport: &T,
) -> RunOutcome
where
    S: NodeSource,
    T: MqttTransport,
{
    let node = source.context();

    // Guard: a down or unreachable node has nothing fresh; publishing its
    // stale data would be worse than silence.
    if node.down || node.unreachable {
        info!(node = %node.name, "node down or unreachable, skipping export");
        return RunOutcome::ok();
    }

    let primary = match config.broker.primary.as_ref() {
        Some(target) if !target.host.trim().is_empty() => target,
        _ => return RunOutcome::fatal("no primary broker endpoint configured"),
    };
    if config.export.concepts.is_empty() {
        info!(node = %node.name, "no concepts configured, nothing to export");
        return RunOutcome::ok();
    }

    let started = Utc::now();
    let envelope = envelope::build(node);
    let publisher = Publisher::new(transport, primary, config.broker.secondary.as_ref());
    let mut outcome = RunOutcome::ok();

    for concept in &config.export.concepts {
        let rule = routing.rule_for(concept);
        let instances = match source.instances(concept) {
            Ok(instances) => instances,
            Err(e) => {
                warn!(node = %node.name, concept = %concept, error = %e, "cannot fetch instances, skipping concept");
                continue;
            }
        };
        if instances.is_empty() {
            debug!(node = %node.name, concept = %concept, "no instances collected");
            continue;
        }

        let assembler = Assembler {
            rule: &rule,
            envelope: &envelope,
            topic_prefix: &primary.topic_prefix,
            node_name: &node.name,
            fallback_time: started,
        };

        for unit in assembler.assemble(&instances) {
            match publisher.publish(&unit).await {
                Ok(report) => {
                    match report.primary {
                        Ok(()) => outcome.published += 1,
                        Err(e) => {
                            outcome.failed += 1;
                            warn!(topic = %unit.topic, error = %e, "primary delivery failed");
                        }
                    }
                    if let Some(Err(e)) = report.secondary {
                        warn!(topic = %unit.topic, error = %e, "secondary delivery failed");
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    warn!(topic = %unit.topic, error = %e, "cannot encode payload");
                }
            }
        }
    }

    info!(
        node = %node.name,
        published = outcome.published,
        failed = outcome.failed,
        elapsed_ms = (Utc::now() - started).num_milliseconds(),
        "export run complete"
    );
    outcome
}
