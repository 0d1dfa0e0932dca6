//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Dashboard mode activation command."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::connection::FrameSink;
use crate::errors::WriteError;

/// JSON-RPC method enabling the telemetry broadcast.
pub const DASHBOARD_METHOD: &str = "RemoteSetDashboardMode";

/// Request envelope for Voyager remote commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand<P> {
    pub method: String,
    pub params: P,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardParams {
    #[serde(rename = "UID")]
    pub uid: Uuid,
    #[serde(rename = "IsOn")]
    pub is_on: bool,
}

impl RemoteCommand<DashboardParams> {
    /// Dashboard-on command tagged with a fresh identifier.
    pub fn enable_dashboard() -> Self {
        Self {
            method: DASHBOARD_METHOD.to_owned(),
            params: DashboardParams {
                uid: Uuid::new_v4(),
                is_on: true,
            },
            id: 1,
        }
    }
}

/// Send the dashboard activation once. Returns the command UID.
pub async fn activate_dashboard(sink: &dyn FrameSink) -> Result<Uuid, WriteError> {
    let command = RemoteCommand::enable_dashboard();
    let frame = serde_json::to_string(&command)?;
    sink.send(&frame).await?;
    info!(uid = %command.params.uid, "dashboard mode requested");
    Ok(command.params.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn activation_frame_matches_protocol() {
        let sink = RecordingSink::new();
        let uid = activate_dashboard(&sink).await.expect("activation sent");

        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&frames[0]).expect("json frame");
        assert_eq!(value["method"], "RemoteSetDashboardMode");
        assert_eq!(value["id"], 1);
        assert_eq!(value["params"]["IsOn"], true);
        assert_eq!(value["params"]["UID"], uid.to_string());
        assert_eq!(uid.get_version_num(), 4);
    }

    #[tokio::test]
    async fn every_activation_uses_a_new_uid() {
        let sink = RecordingSink::new();
        let first = activate_dashboard(&sink).await.expect("first");
        let second = activate_dashboard(&sink).await.expect("second");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let sink = RecordingSink::failing();
        assert!(activate_dashboard(&sink).await.is_err());
    }
}
