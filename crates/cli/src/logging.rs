//! One-time `env_logger` setup.

use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "learngl_core=debug"). When absent, `RUST_LOG` is used, then `level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            level: log::LevelFilter::Info,
        }
    }
}

impl LoggingConfig {
    /// Level from the `-v`/`-q` counts: each `-v` raises the default `info`
    /// one step, each `-q` lowers it. An explicit `-v`/`-q` wins over
    /// `RUST_LOG`.
    pub fn from_verbosity(verbose: u8, quiet: u8) -> Self {
        const LEVELS: [log::LevelFilter; 6] = [
            log::LevelFilter::Off,
            log::LevelFilter::Error,
            log::LevelFilter::Warn,
            log::LevelFilter::Info,
            log::LevelFilter::Debug,
            log::LevelFilter::Trace,
        ];
        let index = (3 + i32::from(verbose) - i32::from(quiet)).clamp(0, 5) as usize;
        let level = LEVELS[index];
        Self {
            env_filter: (verbose > 0 || quiet > 0).then(|| level.to_string().to_lowercase()),
            level,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.level);
        }

        builder.init();
        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_verbosity_is_info_and_defers_to_rust_log() {
        let config = LoggingConfig::from_verbosity(0, 0);
        assert_eq!(config.level, log::LevelFilter::Info);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn verbose_flags_raise_the_level() {
        let config = LoggingConfig::from_verbosity(1, 0);
        assert_eq!(config.level, log::LevelFilter::Debug);
        assert_eq!(config.env_filter.as_deref(), Some("debug"));
        assert_eq!(LoggingConfig::from_verbosity(9, 0).level, log::LevelFilter::Trace);
    }

    #[test]
    fn quiet_flags_lower_the_level() {
        assert_eq!(LoggingConfig::from_verbosity(0, 1).level, log::LevelFilter::Warn);
        assert_eq!(LoggingConfig::from_verbosity(0, 7).level, log::LevelFilter::Off);
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::from_verbosity(2, 0));
        log::info!("still one logger");
    }
}
