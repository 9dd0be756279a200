//! Conversion from the `[logging]` config section.

use tessera_config::LoggingSection;

use crate::logging::{LogConfig, LogFormat};

/// Build a [`LogConfig`] from the `[logging]` section.
///
/// Unknown formats fall back to compact; the config crate rejects them
/// during validation.
#[must_use]
pub fn to_log_config(section: &LoggingSection) -> LogConfig {
    let format = section.format.parse().unwrap_or(LogFormat::Compact);

    section
        .directives
        .iter()
        .fold(
            LogConfig::new(&section.level).with_format(format),
            |config, directive| config.with_directive(directive),
        )
}
