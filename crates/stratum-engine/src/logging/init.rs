use std::sync::Once;

/// Logger setup for the engine and its host binary.
///
/// `env_filter` uses the `env_logger` directive syntax, e.g.
/// `"info,stratum_engine::region=trace"`. When unset, `RUST_LOG` applies,
/// then plain `info`.
///
/// `quiet_gpu_stack` caps wgpu and naga at `warn` unless a directive names
/// them; their `info` chatter buries canvas diagnostics.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub quiet_gpu_stack: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            quiet_gpu_stack: true,
        }
    }
}

impl LoggingConfig {
    /// Default config with explicit directives.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self { env_filter: Some(filter.into()), ..Self::default() }
    }
}

const GPU_STACK: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

fn builder(config: &LoggingConfig, rust_log: Option<String>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();

    if config.quiet_gpu_stack {
        for module in GPU_STACK {
            builder.filter_module(module, log::LevelFilter::Warn);
        }
    }

    match config.env_filter.clone().or(rust_log) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }

    builder.write_style(config.write_style);
    builder
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect; call it
/// early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        builder(&config, rust_log).init();
        log::debug!("logging initialized");
    });
}

/// Routes log output through the test harness capture.
///
/// Safe to call from every test; only the first call installs a logger.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_rust_log() {
        let logger = builder(&LoggingConfig::with_filter("warn"), Some("trace".into())).build();
        assert_eq!(logger.filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn rust_log_then_info() {
        let config = LoggingConfig::default();
        assert_eq!(builder(&config, Some("debug".into())).build().filter(), log::LevelFilter::Debug);
        assert_eq!(builder(&config, None).build().filter(), log::LevelFilter::Info);
    }
}
