// Initializes the tracing subscriber for the s3up binary.

use std::env;
use std::io::IsTerminal;

use tracing::Level;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

const CRATE_TARGETS: [&str; 3] = ["s3up", "s3up_core", "s3up_s3"];

/// Logging settings derived from the global flags
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub level: Level,
    pub disable_color: bool,
}

impl TracingConfig {
    pub fn from_flags(debug: bool, quiet: bool, no_color: bool) -> Self {
        let level = if debug {
            Level::DEBUG
        } else if quiet {
            Level::WARN
        } else {
            Level::INFO
        };
        Self {
            level,
            disable_color: no_color,
        }
    }
}

/// Filter directive for the workspace crates at `level`
fn default_filter(level: Level) -> String {
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn init_tracing(config: &TracingConfig) {
    let event_filter =
        env::var(EVENT_FILTER_ENV_VAR).unwrap_or_else(|_| default_filter(config.level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .with_ansi(!config.disable_color && std::io::stderr().is_terminal())
        .with_env_filter(event_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_from_flags() {
        assert_eq!(TracingConfig::from_flags(false, false, false).level, Level::INFO);
        assert_eq!(TracingConfig::from_flags(false, true, false).level, Level::WARN);
        // --debug wins over --quiet
        assert_eq!(TracingConfig::from_flags(true, true, false).level, Level::DEBUG);
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter(Level::DEBUG),
            "s3up=DEBUG,s3up_core=DEBUG,s3up_s3=DEBUG"
        );
    }
}
