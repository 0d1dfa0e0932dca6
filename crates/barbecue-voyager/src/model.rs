//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Telemetry data model decoded from Voyager dashboard frames."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};
use strum::Display;
use tracing::debug;

use crate::errors::ParseError;

/// Raw `CCDPOW` value Voyager reports when the cooler is switched off.
pub const CCD_POWER_OFF_SENTINEL: i64 = -123_456_789;

/// Camera sensor state as enumerated by `CCDSTAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(try_from = "i64", into = "i64")]
pub enum CcdState {
    #[default]
    #[strum(to_string = "INIT")]
    Init,
    #[strum(to_string = "UNDEF")]
    Undefined,
    #[strum(to_string = "NO COOLER")]
    NoCooler,
    #[strum(to_string = "OFF")]
    Off,
    #[strum(to_string = "COOLING")]
    Cooling,
    #[strum(to_string = "COOLED")]
    Cooled,
    #[strum(to_string = "TIMEOUT")]
    Timeout,
    #[strum(to_string = "WARMUP RUNNING")]
    WarmupRunning,
    #[strum(to_string = "WARMUP END")]
    WarmupEnd,
    #[strum(to_string = "ERROR")]
    Error,
}

impl TryFrom<i64> for CcdState {
    type Error = ParseError;

    fn try_from(code: i64) -> Result<Self, ParseError> {
        Ok(match code {
            0 => CcdState::Init,
            1 => CcdState::Undefined,
            2 => CcdState::NoCooler,
            3 => CcdState::Off,
            4 => CcdState::Cooling,
            5 => CcdState::Cooled,
            6 => CcdState::Timeout,
            7 => CcdState::WarmupRunning,
            8 => CcdState::WarmupEnd,
            9 => CcdState::Error,
            other => return Err(ParseError::UnknownCcdState(other)),
        })
    }
}

impl From<CcdState> for i64 {
    fn from(state: CcdState) -> Self {
        state as i64
    }
}

/// Cooler power decoded from `CCDPOW`; the sentinel never leaks past decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CcdPower {
    /// Cooler switched off.
    Off,
    /// Cooler power as reported by the camera driver.
    Watts(i64),
}

impl Default for CcdPower {
    fn default() -> Self {
        CcdPower::Watts(0)
    }
}

impl From<i64> for CcdPower {
    fn from(raw: i64) -> Self {
        if raw == CCD_POWER_OFF_SENTINEL {
            CcdPower::Off
        } else {
            CcdPower::Watts(raw)
        }
    }
}

impl From<CcdPower> for i64 {
    fn from(power: CcdPower) -> Self {
        match power {
            CcdPower::Off => CCD_POWER_OFF_SENTINEL,
            CcdPower::Watts(value) => value,
        }
    }
}

impl fmt::Display for CcdPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CcdPower::Off => f.write_str("OFF"),
            CcdPower::Watts(value) => write!(f, "{value}"),
        }
    }
}

/// Full `ControlData` telemetry record.
///
/// Missing keys and `null` values decode to zero values; every frame replaces
/// the previous record wholesale. Keys the client does not model are kept in
/// [`ControlData::extra`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlData {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Event")]
    pub event: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Host")]
    pub host: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Inst")]
    pub inst: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "TI")]
    pub time_info: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "VOYSTAT")]
    pub voyager_status: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SETUPCONN")]
    pub setup_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDCONN")]
    pub ccd_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDTEMP")]
    pub ccd_temperature: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDPOW")]
    pub ccd_power: CcdPower,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDSETP")]
    pub ccd_setpoint: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDCOOL")]
    pub ccd_cooling: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CCDSTAT")]
    pub ccd_state: CcdState,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTCONN")]
    pub mount_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTPARK")]
    pub mount_parked: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTRA")]
    pub mount_ra: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTDEC")]
    pub mount_dec: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTRAJ2000")]
    pub mount_ra_j2000: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTDECJ2000")]
    pub mount_dec_j2000: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTAZ")]
    pub mount_azimuth: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTALT")]
    pub mount_altitude: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTPIER")]
    pub mount_pier: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTTFLIP")]
    pub mount_time_to_flip: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTSFLIP")]
    pub mount_flip_status: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTTRACK")]
    pub mount_tracking: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "MNTSLEW")]
    pub mount_slewing: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "AFCONN")]
    pub focuser_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "AFTEMP")]
    pub focuser_temperature: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "AFPOS")]
    pub focuser_position: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQTOT")]
    pub sequence_total: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQPARZ")]
    pub sequence_partial: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "GUIDECONN")]
    pub guide_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "GUIDESTAT")]
    pub guide_status: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "DITHSTAT")]
    pub dither_status: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "GUIDEX")]
    pub guide_x: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "GUIDEY")]
    pub guide_y: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "PLACONN")]
    pub planetarium_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "PSCONN")]
    pub plate_solve_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQNAME")]
    pub sequence_name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQSTART")]
    pub sequence_start: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQREMAIN")]
    pub sequence_remaining: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQEND")]
    pub sequence_end: String,
    /// Name of the running sequence; empty when none is running.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "RUNSEQ")]
    pub running_sequence: String,
    /// Name of the running automation script; empty when none is running.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "RUNDS")]
    pub running_script: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ROTCONN")]
    pub rotator_connected: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ROTPA")]
    pub rotator_pa: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ROTSKYPA")]
    pub rotator_sky_pa: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ROTISROT")]
    pub rotator_rotating: bool,
    /// Derived from [`ControlData::running_script`].
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "DRAGRUNNING")]
    pub script_running: bool,
    /// Derived from [`ControlData::running_sequence`].
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "SEQRUNNING")]
    pub sequence_running: bool,
    /// Derived from [`ControlData::ccd_state`].
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "CAMSTATUS")]
    pub camera_status: String,
    /// Keys not modelled above, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlData {
    /// Decode a `ControlData` frame and compute the derived fields.
    pub fn from_frame(frame: &str) -> Result<Self, ParseError> {
        let mut data: ControlData = serde_json::from_str(frame)?;
        data.derive();
        Ok(data)
    }

    fn derive(&mut self) {
        self.sequence_running = !self.running_sequence.is_empty();
        if self.sequence_running {
            debug!(sequence = %self.running_sequence, "sequence running");
        }
        self.script_running = !self.running_script.is_empty();
        if self.script_running {
            debug!(script = %self.running_script, "automation script running");
        }
        self.camera_status = self.ccd_state.to_string();
        debug!(parked = self.mount_parked, "mount status");
    }
}

/// Severity carried by Voyager `LogEvent` frames (`Type` 1..=9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(try_from = "i64", into = "i64")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug = 1,
    Info,
    Warning,
    Critical,
    Title,
    Subtitle,
    Event,
    Request,
    Emergency,
}

impl TryFrom<i64> for LogLevel {
    type Error = ParseError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warning,
            4 => LogLevel::Critical,
            5 => LogLevel::Title,
            6 => LogLevel::Subtitle,
            7 => LogLevel::Event,
            8 => LogLevel::Request,
            9 => LogLevel::Emergency,
            other => return Err(ParseError::UnknownLogLevel(other)),
        })
    }
}

impl From<LogLevel> for i64 {
    fn from(level: LogLevel) -> Self {
        level as i64
    }
}

/// Transient log line forwarded by Voyager; observed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "Event", default)]
    pub event: String,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: f64,
    #[serde(rename = "Host", default)]
    pub host: String,
    #[serde(rename = "Inst", default)]
    pub inst: i64,
    #[serde(rename = "TimeInfo", default)]
    pub time_info: f64,
    #[serde(rename = "Type")]
    pub level: LogLevel,
    #[serde(rename = "Text", default)]
    pub text: String,
}

impl LogEvent {
    /// Decode a `LogEvent` frame.
    pub fn from_frame(frame: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccd_state_names_follow_enumeration() {
        let expected = [
            "INIT",
            "UNDEF",
            "NO COOLER",
            "OFF",
            "COOLING",
            "COOLED",
            "TIMEOUT",
            "WARMUP RUNNING",
            "WARMUP END",
            "ERROR",
        ];
        for (code, name) in expected.iter().enumerate() {
            let state = CcdState::try_from(code as i64).expect("known code");
            assert_eq!(state.to_string(), *name);
            assert_eq!(i64::from(state), code as i64);
        }
    }

    #[test]
    fn out_of_range_ccd_state_is_rejected() {
        assert!(matches!(
            CcdState::try_from(10),
            Err(ParseError::UnknownCcdState(10))
        ));
        assert!(CcdState::try_from(-1).is_err());
        let frame = r#"{"Event":"ControlData","CCDSTAT":12}"#;
        assert!(ControlData::from_frame(frame).is_err());
    }

    #[test]
    fn power_sentinel_decodes_to_off() {
        assert_eq!(CcdPower::from(CCD_POWER_OFF_SENTINEL), CcdPower::Off);
        assert_eq!(CcdPower::Off.to_string(), "OFF");
        assert_eq!(CcdPower::from(87).to_string(), "87");
        assert_eq!(CcdPower::from(-3).to_string(), "-3");
    }

    #[test]
    fn control_data_derives_running_flags() {
        let idle = ControlData::from_frame(r#"{"Event":"ControlData","RUNSEQ":"","RUNDS":""}"#)
            .expect("valid frame");
        assert!(!idle.sequence_running);
        assert!(!idle.script_running);

        let busy = ControlData::from_frame(
            r#"{"Event":"ControlData","RUNSEQ":"M31 LRGB","RUNDS":"Night plan"}"#,
        )
        .expect("valid frame");
        assert!(busy.sequence_running);
        assert!(busy.script_running);
    }

    #[test]
    fn control_data_keeps_unknown_keys_and_status_name() {
        let data = ControlData::from_frame(
            r#"{"Event":"ControlData","CCDSTAT":5,"CCDPOW":42,"MNTPARK":true,"WEATHER":"clear"}"#,
        )
        .expect("valid frame");
        assert_eq!(data.ccd_state, CcdState::Cooled);
        assert_eq!(data.camera_status, "COOLED");
        assert_eq!(data.ccd_power, CcdPower::Watts(42));
        assert!(data.mount_parked);
        assert_eq!(data.extra.get("WEATHER"), Some(&Value::from("clear")));
    }

    #[test]
    fn null_fields_decode_to_zero_values() {
        let data = ControlData::from_frame(
            r#"{"Event":"ControlData","CCDTEMP":-5.6,"AFTEMP":12.3,"CCDPOW":-123456789,"CCDSTAT":4,"MNTRA":null,"SEQNAME":null,"AFPOS":null,"RUNSEQ":null}"#,
        )
        .expect("nulls do not reject the frame");
        assert_eq!(data.mount_ra, "");
        assert_eq!(data.sequence_name, "");
        assert_eq!(data.focuser_position, 0);
        assert!(!data.sequence_running);
        assert_eq!(data.ccd_power, CcdPower::Off);
        assert_eq!(data.camera_status, "COOLING");

        let data = ControlData::from_frame(r#"{"Event":"ControlData","CCDSTAT":null,"CCDPOW":null}"#)
            .expect("valid frame");
        assert_eq!(data.ccd_state, CcdState::Init);
        assert_eq!(data.ccd_power, CcdPower::Watts(0));
    }

    #[test]
    fn control_data_survives_reserialisation() {
        let parsed = ControlData::from_frame(
            r#"{"Event":"ControlData","CCDTEMP":-5.6,"AFTEMP":12.3,"CCDPOW":-123456789,"CCDSTAT":4,"WEATHER":"clear"}"#,
        )
        .expect("valid frame");
        let encoded = serde_json::to_string(&parsed).expect("serialise");
        let reparsed = ControlData::from_frame(&encoded).expect("reparse");
        assert_eq!(reparsed, parsed);
        assert_eq!(reparsed.camera_status, "COOLING");
        assert_eq!(reparsed.ccd_power, CcdPower::Off);
        assert_eq!(reparsed.extra.get("WEATHER"), Some(&Value::from("clear")));

        for code in 0..=9 {
            let frame = format!(r#"{{"Event":"ControlData","CCDSTAT":{code}}}"#);
            let first = ControlData::from_frame(&frame).expect("known code");
            let again = ControlData::from_frame(&serde_json::to_string(&first).expect("serialise"))
                .expect("reparse");
            assert_eq!(again.camera_status, first.camera_status);
            assert_eq!(i64::from(again.ccd_state), code);
        }
    }

    #[test]
    fn log_event_maps_levels() {
        let event = LogEvent::from_frame(
            r#"{"Event":"LogEvent","Timestamp":1652231344.1,"Host":"obs","Inst":1,"TimeInfo":1652231344.09,"Type":3,"Text":"Guiding lost"}"#,
        )
        .expect("valid log event");
        assert_eq!(event.level, LogLevel::Warning);
        assert_eq!(event.level.to_string(), "WARNING");
        assert_eq!(event.text, "Guiding lost");

        assert!(LogEvent::from_frame(r#"{"Event":"LogEvent","Type":0}"#).is_err());
    }
}
