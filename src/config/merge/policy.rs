//! Base builder carrying the defaults every other source overrides.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("registry.backend", "sled")?
        .set_default("hardware.source", "fixed")?
        .set_default("hardware.device_pattern", "nvme{}n1")?
        .set_default("logging.output", "stderr")
}
