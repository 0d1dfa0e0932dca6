//! ---
//! bbq_section: "01-core-functionality"
//! bbq_subsection: "binary"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Binary entrypoint reporting the Voyager camera cooling state."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use barbecue_common::config::DEFAULT_ADDRESS;
use barbecue_common::{init_tracing, AppConfig, LogFormat, Verbosity};
use barbecue_voyager::{start, CameraSnapshot, SessionConfig};
use clap::Parser;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Voyager camera cooling reporter", long_about = None)]
struct Cli {
    #[arg(long, default_value = DEFAULT_ADDRESS, help = "Voyager application server host:port")]
    addr: String,

    #[arg(long, default_value = "warn", help = "Log level: debug, info, warn or error")]
    level: String,

    #[arg(long, value_name = "FILE", help = "Path to barbecue.yml")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, help = "Log output format")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(Verbosity::parse_lenient(&cli.level), cli.log_format);

    let loaded = AppConfig::load(cli.config.as_deref())?;
    if let Some(source) = &loaded.source {
        info!(config = %source.display(), "configuration loaded");
    }
    let settings = &loaded.config.session;
    let address = loaded.config.resolve_address(&cli.addr);

    let session_config = SessionConfig {
        address,
        handshake_timeout: settings.handshake_timeout,
        heartbeat_interval: settings.heartbeat_interval,
        idle_threshold: settings.idle_threshold,
        dispatch_delay: settings.dispatch_delay,
        handle_interrupt: true,
    };

    let session = match start(session_config).await {
        Ok(session) => session,
        Err(err) => {
            debug!(error = %err, "Voyager is not running or is not responding");
            return Ok(());
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(settings.settle) => {}
        reason = session.stopped() => {
            warn!(?reason, "session stopped before telemetry settled");
        }
    }

    let reader = session.reader();
    reader.log_status_report();
    print_report(&reader.read());

    let summary = session.shutdown().await;
    debug!(reason = ?summary.reason, polls_sent = summary.polls_sent, "exiting");
    Ok(())
}

fn print_report(snapshot: &CameraSnapshot) {
    println!("Ambient Temperature: {}", snapshot.ambient);
    println!("Camera Temperature: {}", snapshot.temperature);
    println!("Camera Status: {}", snapshot.status);
    println!("Camera Power: {}", snapshot.power_label());
    if snapshot.is_idle() {
        println!("OK CAMERA IDLE!");
    }
}
