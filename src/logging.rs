//! Logging setup.
//!
//! Records go to stdout as JSON (default) or human-readable text. The level
//! comes from the configuration unless `RUST_LOG` is set.

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::{LogConfig, LogFormat};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    Init(#[from] TryInitError),
}

/// Build the level filter for `config`.
///
/// `RUST_LOG` directives take precedence over the configured level; invalid
/// directives are ignored.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy()
}

/// Build a subscriber for `config` writing records to `writer`.
pub fn subscriber<W>(config: &LogConfig, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_file(config.add_source)
            .with_line_number(config.add_source)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_file(config.add_source)
            .with_line_number(config.add_source)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layer)
}

/// Install the global tracing subscriber writing to stdout.
///
/// # Errors
/// Returns `LoggingError::Init` if a global subscriber is already set.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    subscriber(config, std::io::stdout).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// In-memory log sink.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn emit(config: &LogConfig) -> String {
        let capture = Capture::default();
        tracing::subscriber::with_default(subscriber(config, capture.clone()), || {
            tracing::error!(exporter = "attic", "Collection failed");
        });
        capture.contents()
    }

    #[test]
    fn test_json_records_with_source() {
        let output = emit(&LogConfig {
            level: LogLevel::Info,
            format: LogFormat::Json,
            add_source: true,
        });

        let record: serde_json::Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["fields"]["message"], "Collection failed");
        assert_eq!(record["fields"]["exporter"], "attic");
        assert!(record["filename"].is_string());
        assert!(record["line_number"].is_number());
    }

    #[test]
    fn test_json_records_without_source() {
        let output = emit(&LogConfig::default());

        let record: serde_json::Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert!(record.get("filename").is_none());
        assert!(record.get("line_number").is_none());
    }

    #[test]
    fn test_text_records() {
        let output = emit(&LogConfig {
            level: LogLevel::Warn,
            format: LogFormat::Text,
            add_source: false,
        });

        assert!(output.contains("Collection failed"));
        assert!(serde_json::from_str::<serde_json::Value>(output.trim()).is_err());
    }

    #[test]
    fn test_env_filter_builds_for_every_level() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let config = LogConfig {
                level,
                ..LogConfig::default()
            };
            assert!(env_filter(&config).max_level_hint().is_some());
        }
    }
}
