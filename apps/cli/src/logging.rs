//! Global tracing subscriber setup.
//!
//! Console output goes to stderr so that command results on stdout stay machine-readable.
//! When `log.directory` is set, a daily rolling file is written through a non-blocking worker.

use anyhow::Context;
use mstore_domain::config::LogConfig;
use std::io::IsTerminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const MAX_LOG_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

/// Keeps the file worker alive. Dropping it flushes pending records.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Installs the global subscriber.
    ///
    /// `RUST_LOG` wins over the configured level; `-v` flags win over both.
    pub fn init(name: &str, config: &LogConfig, verbose: u8) -> anyhow::Result<Self> {
        let env_filter = build_env_filter(&level_directive(&config.level, verbose))?;

        let mut layers = Vec::new();
        layers.push(
            layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .boxed(),
        );

        let guard = if let Some(path) = &config.directory {
            std::fs::create_dir_all(path)
                .with_context(|| format!("Failed to create log directory {}", path.display()))?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(MAX_LOG_FILES)
                .build(path)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = layer().with_writer(non_blocking).with_ansi(false);
            layers.push(if config.json { file_layer.json().boxed() } else { file_layer.boxed() });
            Some(guard)
        } else {
            None
        };

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

        Ok(Self { guard })
    }

    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn level_directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_owned(),
        1 => "debug".to_owned(),
        _ => "trace".to_owned(),
    }
}

fn build_env_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::builder().from_env_lossy());
    }
    EnvFilter::builder()
        .parse(directive)
        .with_context(|| format!("Invalid log level directive '{directive}'"))
}
