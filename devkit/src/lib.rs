/*!
# nodecast DevKit - Stubs and Utilities for Development

Library easing exporter development without a live broker or monitoring
store:
- Mock MQTT delivery recorder with scripted per-endpoint failures
- Node dump builders for fabricating monitoring-store exports in tests
*/

pub mod dump_builder;
pub mod mqtt_stub;

pub use dump_builder::{InstanceBuilder, NodeDumpBuilder};
pub use mqtt_stub::{MockBroker, MockDelivery};

/// Best-effort logger init for tests; repeated calls are fine.
pub fn init_test_logging() {
    env_logger::try_init().ok();
}
