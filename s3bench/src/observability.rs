use std::env;
use std::io::IsTerminal;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

use crate::config::{Config, LogFormat};

/// Installs the global tracing subscriber, logging to stderr.
pub fn init_tracing(config: &Config) {
    let level = effective_level(config);
    let env_filter = match env::var(EnvFilter::DEFAULT_ENV) {
        // Use RUST_LOG literally if the user knows which overrides they want to run.
        Ok(value) if value.parse::<Level>().is_err() => EnvFilter::new(value),
        Ok(value) => EnvFilter::new(format!("INFO,s3bench={value}")),
        Err(_) => EnvFilter::new(format!("INFO,s3bench={level}")),
    };

    let format = match config.logging.format {
        LogFormat::Auto if std::io::stderr().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        format => format,
    };

    let layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .pretty()
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .flatten_event(true)
            .boxed(),
        LogFormat::Auto | LogFormat::Simplified => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .init();
}

/// The configured log level, raised to `DEBUG` when debug output is requested.
fn effective_level(config: &Config) -> LevelFilter {
    if config.debug {
        config.logging.level.max(LevelFilter::DEBUG)
    } else {
        config.logging.level
    }
}
