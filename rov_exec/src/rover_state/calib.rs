//! Camera calibration data
//!
//! Computed once when the rover state is created and never modified afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Width of the camera images in pixels
pub const IMAGE_WIDTH: u32 = 320;

/// Height of the camera images in pixels
pub const IMAGE_HEIGHT: u32 = 160;

/// Half the side length of the 1 m square in the warped image, in pixels
const DST_SIZE: f64 = 10.0;

/// Offset of the warped image from the bottom of the frame, in pixels
const BOTTOM_OFFSET: f64 = 0.0;

/// Corners of a 1 m grid square as seen in the camera image
const SOURCE_POINTS: [[f64; 2]; 4] = [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Perspective and scale calibration of the rover's camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub image_width: u32,
    pub image_height: u32,

    /// Number of pixels per meter in the warped (top-down) image
    pub scale: f64,

    /// Points in the camera image
    pub source: [[f64; 2]; 4],

    /// Where `source` lands in the warped image
    pub destination: [[f64; 2]; 4],

    /// Size of the world map in cells (1 cell per meter)
    pub world_width: usize,
    pub world_height: usize,

    /// Perspective transform from camera image to warped image
    perspective: Matrix3<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("The calibration points do not define a perspective transform")]
    DegeneratePoints,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Calibration {
    /// Create the calibration for a world of the given size.
    pub fn new(world_width: usize, world_height: usize) -> Result<Self, CalibrationError> {
        let w = IMAGE_WIDTH as f64;
        let h = IMAGE_HEIGHT as f64;

        let destination = [
            [w / 2.0 - DST_SIZE, h - BOTTOM_OFFSET],
            [w / 2.0 + DST_SIZE, h - BOTTOM_OFFSET],
            [w / 2.0 + DST_SIZE, h - 2.0 * DST_SIZE - BOTTOM_OFFSET],
            [w / 2.0 - DST_SIZE, h - 2.0 * DST_SIZE - BOTTOM_OFFSET],
        ];

        let perspective = perspective_transform(&SOURCE_POINTS, &destination)
            .ok_or(CalibrationError::DegeneratePoints)?;

        Ok(Self {
            image_width: IMAGE_WIDTH,
            image_height: IMAGE_HEIGHT,
            scale: 2.0 * DST_SIZE,
            source: SOURCE_POINTS,
            destination,
            world_width,
            world_height,
            perspective
        })
    }

    /// Map a camera image pixel into the warped image.
    ///
    /// Returns `None` for points on or above the horizon, which have no position on the ground.
    pub fn warp_point(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let p = self.perspective * Vector3::new(x, y, 1.0);

        if p[2] < 1e-9 {
            return None
        }

        Some([p[0] / p[2], p[1] / p[2]])
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve for the perspective transform mapping the four `src` points onto the four `dst` points.
fn perspective_transform(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Matrix3<f64>> {
    let mut a = Vec::with_capacity(64);
    let mut b = Vec::with_capacity(8);

    for (s, d) in src.iter().zip(dst.iter()) {
        let (x, y, u, v) = (s[0], s[1], d[0], d[1]);

        a.extend_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]);
        b.push(u);
        a.extend_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]);
        b.push(v);
    }

    let h = DMatrix::from_row_slice(8, 8, &a)
        .lu()
        .solve(&DVector::from_row_slice(&b))?;

    let m = Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0
    );

    // Scale so that points on the ground have a positive homogeneous coordinate
    let w = (m * Vector3::new(src[0][0], src[0][1], 1.0))[2];

    if w < 0.0 {
        Some(-m)
    }
    else {
        Some(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_source_maps_to_destination() -> Result<(), CalibrationError> {
        let calib = Calibration::new(200, 200)?;

        assert_eq!(calib.destination[0], [150.0, 160.0]);
        assert_eq!(calib.destination[2], [170.0, 140.0]);
        assert_eq!(calib.scale, 20.0);

        for (s, d) in calib.source.iter().zip(calib.destination.iter()) {
            let w = calib.warp_point(s[0], s[1]).unwrap();

            assert!((w[0] - d[0]).abs() < 1e-6, "{:?} -> {:?}, expected {:?}", s, w, d);
            assert!((w[1] - d[1]).abs() < 1e-6, "{:?} -> {:?}, expected {:?}", s, w, d);
        }

        Ok(())
    }

    #[test]
    fn test_horizon() -> Result<(), CalibrationError> {
        let calib = Calibration::new(200, 200)?;

        assert!(calib.warp_point(160.0, 0.0).is_none());
        assert!(calib.warp_point(160.0, 70.0).is_none());

        let p = calib.warp_point(160.0, 159.0).unwrap();
        assert!(p[1] > 160.0);

        Ok(())
    }
}
