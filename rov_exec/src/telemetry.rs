//! # Telemetry ingestion
//!
//! Converts the simulator's telemetry payload into rover units and writes it into the
//! [`RoverState`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::sim::{self, FrameError, SimTelemetry, SimValue};
use image::RgbImage;

use crate::rover_state::{Pose, RoverState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A fully parsed telemetry frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub pose: Pose,

    /// Speed of the rover, NaN if the simulator sent something unreadable.
    pub vel: f64,

    pub near_sample: bool,
    pub picking_up: bool,

    /// Samples remaining in the world
    pub sample_count: Option<usize>,

    /// Positions of the samples remaining in the world
    pub samples_pos: Vec<[f64; 2]>,

    /// Decoded camera frame
    pub image: RgbImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid position {0:?}, expected \"x;y\"")]
    InvalidPosition(String),

    #[error("Invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, SimValue),

    #[error("Sample positions {0:?} and {1:?} don't match")]
    InvalidSamples(String, String),

    #[error("Could not decode the camera frame: {0}")]
    InvalidImage(FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Parse a telemetry payload.
    ///
    /// An unreadable speed is not an error, it becomes NaN so that the control loop treats the
    /// frame as invalid telemetry.
    pub fn from_sim(sim: &SimTelemetry) -> Result<Self, TelemetryError> {
        let pos = parse_list(&sim.position)
            .filter(|p| p.len() == 2)
            .ok_or_else(|| TelemetryError::InvalidPosition(sim.position.clone()))?;

        let pose = Pose {
            pos: [pos[0], pos[1]],
            yaw_deg: real("yaw", &sim.yaw)?,
            pitch_deg: real("pitch", &sim.pitch)?,
            roll_deg: real("roll", &sim.roll)?,
        };

        let vel = sim.speed.as_real().unwrap_or(f64::NAN);

        let sample_count = match sim.sample_count {
            Some(ref v) => Some(
                v.as_real()
                    .filter(|c| c.is_finite() && *c >= 0.0)
                    .map(|c| c as usize)
                    .ok_or_else(|| TelemetryError::InvalidValue("sample_count", v.clone()))?
            ),
            None => None
        };

        let samples_pos = samples(sim)?;

        let image = sim::decode_frame(&sim.image)
            .map_err(TelemetryError::InvalidImage)?;

        Ok(Self {
            pose,
            vel,
            near_sample: flag("near_sample", &sim.near_sample)?,
            picking_up: flag("picking_up", &sim.picking_up)?,
            sample_count,
            samples_pos,
            image
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Update the rover with a telemetry payload.
///
/// The payload is parsed completely before anything is written, so on error the rover is left
/// unchanged.
pub fn update_rover(rover: &mut RoverState, sim: &SimTelemetry) -> Result<(), TelemetryError> {
    update_rover_at(rover, sim, Utc::now())
}

/// As [`update_rover`] with an explicit reception time.
pub fn update_rover_at(
    rover: &mut RoverState,
    sim: &SimTelemetry,
    now: DateTime<Utc>
) -> Result<(), TelemetryError> {
    let telem = Telemetry::from_sim(sim)?;
    rover.ingest(telem, now);

    Ok(())
}

fn real(name: &'static str, value: &SimValue) -> Result<f64, TelemetryError> {
    value.as_real().ok_or_else(|| TelemetryError::InvalidValue(name, value.clone()))
}

/// Missing flags are false.
fn flag(name: &'static str, value: &Option<SimValue>) -> Result<bool, TelemetryError> {
    match value {
        Some(v) => v.as_flag().ok_or_else(|| TelemetryError::InvalidValue(name, v.clone())),
        None => Ok(false)
    }
}

/// Parse a `;` separated list of reals. An empty string is an empty list.
fn parse_list(s: &str) -> Option<Vec<f64>> {
    s.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(sim::parse_real)
        .collect()
}

fn samples(sim: &SimTelemetry) -> Result<Vec<[f64; 2]>, TelemetryError> {
    let xs_str = sim.samples_x.clone().unwrap_or_default();
    let ys_str = sim.samples_y.clone().unwrap_or_default();

    let err = || TelemetryError::InvalidSamples(xs_str.clone(), ys_str.clone());

    let xs = parse_list(&xs_str).ok_or_else(err)?;
    let ys = parse_list(&ys_str).ok_or_else(err)?;

    if xs.len() != ys.len() {
        return Err(err())
    }

    Ok(xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{planner::NavGrid, rover_state::RoverParams};

    /// A valid telemetry payload with a blank camera frame.
    pub(crate) fn sim_telem(speed: SimValue) -> SimTelemetry {
        let image = sim::encode_frame_png(&RgbImage::new(320, 160)).unwrap();

        SimTelemetry {
            speed,
            position: "99.66999;85.58897".into(),
            yaw: SimValue::Text("56,82556".into()),
            pitch: SimValue::Number(0.2),
            roll: SimValue::Number(359.7),
            throttle: Some(SimValue::Number(0.0)),
            steering_angle: Some(SimValue::Number(0.0)),
            brake: Some(SimValue::Number(1.0)),
            near_sample: Some(SimValue::Number(0.0)),
            picking_up: Some(SimValue::Number(0.0)),
            sample_count: Some(SimValue::Number(6.0)),
            samples_x: Some("100.1;62.2".into()),
            samples_y: Some("74.3;12.4".into()),
            image,
        }
    }

    #[test]
    fn test_from_sim() -> Result<(), TelemetryError> {
        let t = Telemetry::from_sim(&sim_telem(SimValue::Text("1,2".into())))?;

        assert_eq!(t.vel, 1.2);
        assert_eq!(t.pose.pos, [99.66999, 85.58897]);
        assert_eq!(t.pose.yaw_deg, 56.82556);
        assert_eq!(t.sample_count, Some(6));
        assert_eq!(t.samples_pos, vec![[100.1, 74.3], [62.2, 12.4]]);
        assert!(!t.near_sample);
        assert_eq!(t.image.dimensions(), (320, 160));

        Ok(())
    }

    #[test]
    fn test_unreadable_speed_is_nan() -> Result<(), TelemetryError> {
        let t = Telemetry::from_sim(&sim_telem(SimValue::Text("nope".into())))?;

        assert!(t.vel.is_nan());

        Ok(())
    }

    #[test]
    fn test_malformed_leaves_rover_unchanged() {
        let mut rover = RoverState::new(RoverParams::default(), NavGrid::open(200, 200)).unwrap();
        let before = rover.clone();

        let mut bad_pos = sim_telem(SimValue::Number(1.0));
        bad_pos.position = "12.0".into();
        assert!(matches!(
            update_rover(&mut rover, &bad_pos),
            Err(TelemetryError::InvalidPosition(_))
        ));

        let mut bad_image = sim_telem(SimValue::Number(1.0));
        bad_image.image = "not an image".into();
        assert!(matches!(
            update_rover(&mut rover, &bad_image),
            Err(TelemetryError::InvalidImage(_))
        ));

        let mut bad_samples = sim_telem(SimValue::Number(1.0));
        bad_samples.samples_y = Some("74.3".into());
        assert!(matches!(
            update_rover(&mut rover, &bad_samples),
            Err(TelemetryError::InvalidSamples(_, _))
        ));

        assert_eq!(rover, before);
    }
}
