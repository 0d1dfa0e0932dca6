//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Latest-wins telemetry store and camera snapshot reader."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::info;

use crate::model::{CcdPower, ControlData};

/// Holds the single live [`ControlData`] record.
///
/// `None` means no telemetry has arrived yet. Writers swap a whole `Arc`, so
/// readers observe either the previous or the new record, never a mix.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: RwLock<Option<Arc<ControlData>>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live record wholesale.
    pub fn replace(&self, data: ControlData) {
        *self.latest.write() = Some(Arc::new(data));
    }

    /// Latest record, if any telemetry was ever received.
    pub fn latest(&self) -> Option<Arc<ControlData>> {
        self.latest.read().clone()
    }

    pub fn has_data(&self) -> bool {
        self.latest.read().is_some()
    }
}

/// Camera readings derived from the latest telemetry at read time.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CameraSnapshot {
    /// Focuser temperature, rounded.
    pub ambient: i64,
    /// CCD temperature, rounded.
    pub temperature: i64,
    /// Cooler power; `None` before the first telemetry frame.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub power: Option<CcdPower>,
    /// CCD state name.
    pub status: String,
}

impl CameraSnapshot {
    pub fn from_control_data(data: &ControlData) -> Self {
        Self {
            ambient: data.focuser_temperature.round() as i64,
            temperature: data.ccd_temperature.round() as i64,
            power: Some(data.ccd_power),
            status: data.ccd_state.to_string(),
        }
    }

    /// `"OFF"` when the cooler is off, the raw power value otherwise, empty
    /// before any telemetry.
    pub fn power_label(&self) -> String {
        self.power.map(|power| power.to_string()).unwrap_or_default()
    }

    /// Camera has warmed up to ambient with the cooler switched off.
    pub fn is_idle(&self) -> bool {
        self.temperature >= self.ambient && self.power == Some(CcdPower::Off)
    }
}

/// Read-only view handed to callers of the session.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    store: Arc<TelemetryStore>,
}

impl SnapshotReader {
    pub fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store }
    }

    /// Current camera snapshot; all zero/empty before the first telemetry frame.
    pub fn read(&self) -> CameraSnapshot {
        self.store
            .latest()
            .map(|data| CameraSnapshot::from_control_data(&data))
            .unwrap_or_default()
    }

    /// Emit the Voyager status summary at info level, if telemetry is available.
    pub fn log_status_report(&self) {
        let Some(data) = self.store.latest() else {
            return;
        };
        info!(
            voyager_status = data.voyager_status,
            camera_status = %data.ccd_state,
            camera_cooling = data.ccd_cooling,
            ccd_temperature = data.ccd_temperature,
            ccd_power = %data.ccd_power,
            focuser_temperature = data.focuser_temperature,
            "voyager status"
        );
    }
}
