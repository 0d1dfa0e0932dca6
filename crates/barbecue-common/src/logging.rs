//! ---
//! bbq_section: "01-core-functionality"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Shared primitives for the barbecue binary."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "BARBECUE_LOG";

/// Output format of the stderr log stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Verbosity selected with `--level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl Verbosity {
    /// Unknown levels fall back to `warn`.
    pub fn parse_lenient(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "debug" => Verbosity::Debug,
            "info" => Verbosity::Info,
            "warn" => Verbosity::Warn,
            "error" => Verbosity::Error,
            _ => Verbosity::Warn,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warn => "warn",
            Verbosity::Error => "error",
        }
    }
}

/// Install the global subscriber. `BARBECUE_LOG` overrides `verbosity`.
///
/// Logs go to stderr so stdout only carries the camera report.
pub fn init_tracing(verbosity: Verbosity, format: LogFormat) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); using {}",
                LOG_ENV,
                err,
                verbosity.directive()
            );
            EnvFilter::new(verbosity.directive())
        }),
        Err(_) => EnvFilter::new(verbosity.directive()),
    };

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .ok();

    debug!(level = verbosity.directive(), format = ?format, "tracing initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_leniently() {
        assert_eq!(Verbosity::parse_lenient("debug"), Verbosity::Debug);
        assert_eq!(Verbosity::parse_lenient("INFO"), Verbosity::Info);
        assert_eq!(Verbosity::parse_lenient("error"), Verbosity::Error);
        assert_eq!(Verbosity::parse_lenient("chatty"), Verbosity::Warn);
        assert_eq!(Verbosity::default(), Verbosity::Warn);
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing(Verbosity::Debug, LogFormat::Pretty);
        init_tracing(Verbosity::Warn, LogFormat::Json);
    }
}
