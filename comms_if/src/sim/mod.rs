//! # Simulator Interface Module
//!
//! Messages exchanged between the rover executable and the simulator bridge. Every message is a
//! JSON object of the form `{"event": <name>, "data": <payload>}`, mirroring the event names used
//! by the simulator itself:
//!
//! - Inbound `telemetry` carries a [`SimTelemetry`] payload, or an empty payload when the
//!   simulator is being driven manually.
//! - Outbound `data`, `pickup`, `get_samples` and `manual` are produced from [`SimCmd`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod frame;

pub use frame::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry reported by the simulator once per frame.
///
/// Values are kept as the simulator sent them, conversion into rover units happens during
/// ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTelemetry {
    /// Rover speed in meters/second
    pub speed: SimValue,

    /// Position in the world as `"x;y"`
    pub position: String,

    /// Yaw angle in degrees
    pub yaw: SimValue,

    /// Pitch angle in degrees
    pub pitch: SimValue,

    /// Roll angle in degrees
    pub roll: SimValue,

    #[serde(default)]
    pub throttle: Option<SimValue>,

    #[serde(default)]
    pub steering_angle: Option<SimValue>,

    #[serde(default)]
    pub brake: Option<SimValue>,

    /// Non-zero when the rover is close enough to pick up a sample
    #[serde(default)]
    pub near_sample: Option<SimValue>,

    /// Non-zero while a pickup is being performed
    #[serde(default)]
    pub picking_up: Option<SimValue>,

    /// Number of samples remaining in the world
    #[serde(default)]
    pub sample_count: Option<SimValue>,

    /// `;` separated x positions of the samples
    #[serde(default)]
    pub samples_x: Option<String>,

    /// `;` separated y positions of the samples
    #[serde(default)]
    pub samples_y: Option<String>,

    /// Base64 encoded camera frame
    pub image: String,
}

/// Control demands sent back to the simulator.
///
/// All values are sent as text, which is what the simulator expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCmd {
    pub throttle: String,
    pub brake: String,
    pub steering_angle: String,

    /// Base64 encoded image shown in the first inset of the simulator
    pub inset_image1: String,

    /// Base64 encoded image shown in the second inset of the simulator
    pub inset_image2: String,
}

/// Shape of every message on the wire before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct RawSimMsg {
    event: String,

    #[serde(default)]
    data: Option<Value>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A scalar value as sent by the simulator.
///
/// Depending on the simulator build values arrive either as JSON numbers or as text, and text may
/// use a comma as the decimal separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A message recieved from the simulator bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum SimMsg {
    /// Telemetry for the current frame. `None` means the simulator is in manual mode.
    Telemetry(Option<SimTelemetry>),

    /// Any other event, identified by its name.
    Other(String),
}

/// A command sent to the simulator bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SimCmd {
    /// Throttle, brake and steering demands plus the inset images.
    #[serde(rename = "data")]
    Control(ControlCmd),

    /// Pick up the sample the rover is next to.
    Pickup {},

    /// Ask the simulator for the current sample inventory.
    GetSamples {},

    /// Relinquish control to the manual driver.
    Manual {},
}

#[derive(Debug, thiserror::Error)]
pub enum SimMsgError {
    #[error("Message is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Telemetry payload is malformed: {0}")]
    InvalidTelemetry(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimValue {
    /// Interpret the value as a real number.
    ///
    /// Returns `None` if the value is text which cannot be parsed.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            SimValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            SimValue::Number(n) => Some(*n),
            SimValue::Text(s) => parse_real(s),
        }
    }

    /// Interpret the value as a flag, any non-zero value is `true`.
    pub fn as_flag(&self) -> Option<bool> {
        self.as_real().map(|v| v != 0.0)
    }
}

impl SimMsg {
    /// Parse a message recieved from the bridge.
    pub fn from_json(json_str: &str) -> Result<Self, SimMsgError> {
        let raw: RawSimMsg = serde_json::from_str(json_str)
            .map_err(SimMsgError::InvalidJson)?;

        if raw.event != "telemetry" {
            return Ok(SimMsg::Other(raw.event))
        }

        // Both a null and an empty payload mean there is no telemetry
        match raw.data {
            None | Some(Value::Null) => Ok(SimMsg::Telemetry(None)),
            Some(Value::Object(ref m)) if m.is_empty() => Ok(SimMsg::Telemetry(None)),
            Some(v) => serde_json::from_value(v)
                .map(|t| SimMsg::Telemetry(Some(t)))
                .map_err(SimMsgError::InvalidTelemetry),
        }
    }
}

impl ControlCmd {
    /// Build a control command from the actuation values and the two inset images.
    pub fn new(
        throttle: f64,
        brake: f64,
        steering_angle: f64,
        inset_image1: String,
        inset_image2: String
    ) -> Self {
        Self {
            throttle: fmt_real(throttle),
            brake: fmt_real(brake),
            steering_angle: fmt_real(steering_angle),
            inset_image1,
            inset_image2,
        }
    }

    /// A command with zero throttle, brake and steering and no images.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, String::new(), String::new())
    }
}

impl SimCmd {
    /// Serialize the command for sending to the bridge.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a real number sent as text, accepting a comma as the decimal separator.
pub fn parse_real(s: &str) -> Option<f64> {
    let s = s.trim();

    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace(',', ".").parse::<f64>().ok())
}

/// Render a real number as text in the form the simulator accepts, e.g. `1.25` or `0.0`.
fn fmt_real(value: f64) -> String {
    format!("{:?}", value)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_telemetry() -> Result<(), SimMsgError> {
        let msg = SimMsg::from_json(r#"{
            "event": "telemetry",
            "data": {
                "speed": "1,5",
                "position": "99.7;85.6",
                "yaw": 56.8,
                "pitch": "0.2",
                "roll": 359.9,
                "near_sample": 0,
                "picking_up": "1",
                "image": "abcd"
            }
        }"#)?;

        let tm = match msg {
            SimMsg::Telemetry(Some(t)) => t,
            m => panic!("Expected telemetry, got {:?}", m)
        };

        assert_eq!(tm.speed.as_real(), Some(1.5));
        assert_eq!(tm.yaw.as_real(), Some(56.8));
        assert_eq!(tm.near_sample.and_then(|v| v.as_flag()), Some(false));
        assert_eq!(tm.picking_up.and_then(|v| v.as_flag()), Some(true));
        assert_eq!(tm.samples_x, None);

        Ok(())
    }

    #[test]
    fn test_empty_telemetry() -> Result<(), SimMsgError> {
        assert_eq!(
            SimMsg::from_json(r#"{"event": "telemetry", "data": null}"#)?,
            SimMsg::Telemetry(None)
        );
        assert_eq!(
            SimMsg::from_json(r#"{"event": "telemetry", "data": {}}"#)?,
            SimMsg::Telemetry(None)
        );
        assert_eq!(
            SimMsg::from_json(r#"{"event": "telemetry"}"#)?,
            SimMsg::Telemetry(None)
        );
        assert_eq!(
            SimMsg::from_json(r#"{"event": "samples", "data": {"x": 1}}"#)?,
            SimMsg::Other("samples".into())
        );

        Ok(())
    }

    #[test]
    fn test_malformed_telemetry() {
        assert!(matches!(
            SimMsg::from_json(r#"{"event": "telemetry", "data": {"speed": 1.0}}"#),
            Err(SimMsgError::InvalidTelemetry(_))
        ));
        assert!(matches!(
            SimMsg::from_json("not json"),
            Err(SimMsgError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(SimValue::Text("fast".into()).as_real(), None);
        assert_eq!(parse_real(" -0,25 "), Some(-0.25));
    }

    #[test]
    fn test_cmd_json() -> Result<(), serde_json::Error> {
        let control = SimCmd::Control(ControlCmd::new(
            1.25, 0.0, -15.0, "img1".into(), String::new()
        ));

        assert_eq!(serde_json::to_value(&control)?, json!({
            "event": "data",
            "data": {
                "throttle": "1.25",
                "brake": "0.0",
                "steering_angle": "-15.0",
                "inset_image1": "img1",
                "inset_image2": ""
            }
        }));
        assert_eq!(
            serde_json::to_value(&SimCmd::Pickup {})?,
            json!({"event": "pickup", "data": {}})
        );
        assert_eq!(
            serde_json::to_value(&SimCmd::GetSamples {})?,
            json!({"event": "get_samples", "data": {}})
        );
        assert_eq!(
            serde_json::to_value(&SimCmd::Manual {})?,
            json!({"event": "manual", "data": {}})
        );

        Ok(())
    }
}
