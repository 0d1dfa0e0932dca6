//! ---
//! bbq_section: "01-core-functionality"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Shared primitives for the barbecue binary."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::{debug, warn};

/// File name searched in the configuration directories.
pub const CONFIG_FILE_NAME: &str = "barbecue.yml";
/// Default Voyager host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Voyager application server port.
pub const DEFAULT_PORT: u16 = 5950;
/// Default value of the `--addr` flag.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5950";

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_idle_threshold() -> Duration {
    Duration::from_secs(10)
}

fn default_dispatch_delay() -> Duration {
    Duration::from_millis(50)
}

fn default_settle() -> Duration {
    Duration::from_secs(1)
}

/// Root of `barbecue.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub voyager: VoyagerConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoyagerConfig {
    #[serde(default)]
    pub tcpserver: TcpServerConfig,
}

/// Voyager application server endpoint. Unset keys fall back to localhost defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcpServerConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Session timing knobs.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "handshake_timeout_ms", default = "default_handshake_timeout")]
    pub handshake_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "heartbeat_interval_ms", default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "idle_threshold_ms", default = "default_idle_threshold")]
    pub idle_threshold: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "dispatch_delay_ms", default = "default_dispatch_delay")]
    pub dispatch_delay: Duration,
    /// How long to collect telemetry before reporting.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "settle_ms", default = "default_settle")]
    pub settle: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: default_handshake_timeout(),
            heartbeat_interval: default_heartbeat_interval(),
            idle_threshold: default_idle_threshold(),
            dispatch_delay: default_dispatch_delay(),
            settle: default_settle(),
        }
    }
}

/// Effective configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "BARBECUE_CONFIG";

    /// Load configuration: explicit path, then `BARBECUE_CONFIG`, then the
    /// standard search directories. No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
        if let Some(path) = explicit {
            return Self::loaded_from(path.to_path_buf());
        }
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::loaded_from(PathBuf::from(env_path));
            }
        }
        Self::load_from(&search_paths())
    }

    /// First existing candidate wins; none existing falls back to defaults.
    pub fn load_from<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig> {
        for candidate in candidates {
            if candidate.as_ref().is_file() {
                return Self::loaded_from(candidate.as_ref().to_path_buf());
            }
        }
        warn!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using localhost defaults"
        );
        Ok(LoadedConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn loaded_from(path: PathBuf) -> Result<LoadedConfig> {
        let config = Self::from_path(&path)?;
        Ok(LoadedConfig {
            config,
            source: Some(path),
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = serde_yaml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.voyager.tcpserver.port == Some(0) {
            return Err(anyhow!("voyager.tcpserver.port must be non-zero"));
        }
        if let Some(address) = &self.voyager.tcpserver.address {
            if address.trim().is_empty() {
                return Err(anyhow!("voyager.tcpserver.address must not be empty"));
            }
        }
        if self.session.heartbeat_interval.is_zero() {
            return Err(anyhow!("session.heartbeat_interval_ms must be non-zero"));
        }
        Ok(())
    }

    /// Merge the `--addr` flag with the file: the file only wins while the
    /// flag still holds its default and the file sets address or port.
    pub fn resolve_address(&self, cli_address: &str) -> String {
        let tcp = &self.voyager.tcpserver;
        if cli_address == DEFAULT_ADDRESS && (tcp.address.is_some() || tcp.port.is_some()) {
            let host = tcp.address.as_deref().unwrap_or(DEFAULT_HOST);
            let port = tcp.port.unwrap_or(DEFAULT_PORT);
            return format!("{host}:{port}");
        }
        cli_address.to_owned()
    }
}

/// `<exe dir>/conf`, `<exe dir>/../conf` and `./conf`, each holding `barbecue.yml`.
pub fn search_paths() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir.join("conf"));
        dirs.push(exe_dir.join("..").join("conf"));
    }
    dirs.push(PathBuf::from("conf"));
    dirs.into_iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded =
            AppConfig::load_from(&[dir.path().join(CONFIG_FILE_NAME)]).expect("defaults");
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.config.resolve_address(DEFAULT_ADDRESS), DEFAULT_ADDRESS);
    }

    #[test]
    fn first_existing_candidate_wins() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            second.path(),
            "voyager:\n  tcpserver:\n    address: 192.168.1.20\n    port: 5951\n",
        );
        let loaded = AppConfig::load_from(&[first.path().join(CONFIG_FILE_NAME), path.clone()])
            .expect("config");
        assert_eq!(loaded.source, Some(path));
        assert_eq!(
            loaded.config.resolve_address(DEFAULT_ADDRESS),
            "192.168.1.20:5951"
        );
    }

    #[test]
    fn explicit_flag_beats_file() {
        let config = AppConfig {
            voyager: VoyagerConfig {
                tcpserver: TcpServerConfig {
                    address: Some("10.0.0.5".into()),
                    port: None,
                },
            },
            ..AppConfig::default()
        };
        assert_eq!(config.resolve_address(DEFAULT_ADDRESS), "10.0.0.5:5950");
        assert_eq!(config.resolve_address("10.0.0.9:6000"), "10.0.0.9:6000");
    }

    #[test]
    fn session_timings_are_read_in_milliseconds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            "session:\n  heartbeat_interval_ms: 250\n  settle_ms: 3000\n",
        );
        let loaded = AppConfig::load(Some(path.as_path())).expect("config");
        let session = loaded.config.session;
        assert_eq!(session.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(session.settle, Duration::from_secs(3));
        assert_eq!(session.idle_threshold, Duration::from_secs(10));
    }

    #[test]
    fn invalid_files_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "voyager: [not, a, map]\n");
        assert!(AppConfig::load(Some(path.as_path())).is_err());

        let path = write_config(dir.path(), "voyager:\n  tcpserver:\n    port: 0\n");
        assert!(AppConfig::load(Some(path.as_path())).is_err());

        let path = write_config(dir.path(), "session:\n  heartbeat_interval_ms: 0\n");
        assert!(AppConfig::load(Some(path.as_path())).is_err());

        assert!(AppConfig::load(Some(dir.path().join("absent.yml").as_path())).is_err());
    }
}
