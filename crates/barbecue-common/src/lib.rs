//! ---
//! bbq_section: "01-core-functionality"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Shared primitives for the barbecue binary."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
//! Configuration discovery and tracing initialisation shared by the
//! barbecue binary.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedConfig, SessionSettings, TcpServerConfig, VoyagerConfig};
pub use logging::{init_tracing, LogFormat, Verbosity};
