//! Colour threshold perception

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use log::trace;

use super::{PerceivedFrame, Perception, PerceptionCtx, PerceptionOutput};
use crate::rover_state::{Calibration, MapLayer, Perceived, Pose, WorldMap};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Every channel must be above this for a pixel to be navigable terrain
const NAV_THRESH: u8 = 160;

/// Red and green must be above this for a pixel to be a sample
const SAMPLE_RG_THRESH: u8 = 110;

/// Blue must be below this for a pixel to be a sample
const SAMPLE_B_THRESH: u8 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Perception based on colour thresholds.
///
/// Bright ground is navigable, yellow rocks are samples and everything else the camera can see
/// on the ground is an obstacle. Only every second frame is processed.
#[derive(Debug, Default)]
pub struct ThreshPerception;

/// Pixels of one class in rover coordinates, `x` forward and `y` to the left.
#[derive(Default)]
struct RoverPixels {
    x: Vec<f64>,
    y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terrain {
    Navigable,
    Sample,
    Obstacle,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Perception for ThreshPerception {
    fn perceive(&mut self, ctx: PerceptionCtx) -> PerceptionOutput {
        if ctx.skip_next {
            return PerceptionOutput {
                frame: None,
                skip_next: false
            }
        }

        let calib = ctx.calib;
        let w = calib.image_width as f64;
        let h = calib.image_height as f64;

        let mut vision_image = RgbImage::new(calib.image_width, calib.image_height);
        let mut nav = RoverPixels::default();
        let mut sample = RoverPixels::default();
        let mut obstacle = RoverPixels::default();

        for (px, py, pixel) in ctx.image.enumerate_pixels() {
            let (u, v) = match calib.warp_point(px as f64, py as f64) {
                Some([u, v]) if u >= 0.0 && u < w && v >= 0.0 && v < h => (u, v),
                _ => continue
            };

            let terrain = classify(pixel);

            // Red obstacles, green samples, blue navigable
            let channel = match terrain {
                Terrain::Obstacle => 0,
                Terrain::Sample => 1,
                Terrain::Navigable => 2,
            };
            vision_image.get_pixel_mut(u as u32, v as u32).0[channel] = 255;

            let pixels = match terrain {
                Terrain::Navigable => &mut nav,
                Terrain::Sample => &mut sample,
                Terrain::Obstacle => &mut obstacle,
            };
            pixels.x.push(h - v);
            pixels.y.push(w / 2.0 - u);
        }

        // A tilted camera puts the warped view in the wrong place on the map
        let level = util::maths::deg_deviation_from_zero(ctx.pose.pitch_deg)
            <= ctx.params.pitch_cutoff_deg
            && util::maths::deg_deviation_from_zero(ctx.pose.roll_deg)
            <= ctx.params.pitch_cutoff_deg;

        if level {
            mark(ctx.worldmap, calib, ctx.pose, &obstacle, MapLayer::Obstacle);
            mark(ctx.worldmap, calib, ctx.pose, &sample, MapLayer::Sample);
            mark(ctx.worldmap, calib, ctx.pose, &nav, MapLayer::Navigable);
        }

        let (nav_dists, nav_angles) = nav.to_polar();
        let (sample_dists, sample_angles) = sample.to_polar();
        let sample_detected = sample_angles.len() >= ctx.params.sample_stop_forward;

        trace!(
            "Perceived {} navigable, {} sample and {} obstacle pixels (level: {})",
            nav_angles.len(), sample_angles.len(), obstacle.x.len(), level
        );

        PerceptionOutput {
            frame: Some(PerceivedFrame {
                perceived: Perceived {
                    nav_angles,
                    nav_dists,
                    sample_angles,
                    sample_dists,
                    sample_detected,
                },
                vision_image
            }),
            skip_next: true
        }
    }
}

impl RoverPixels {
    /// Distances and angles of the pixels.
    fn to_polar(&self) -> (Vec<f64>, Vec<f64>) {
        self.x.iter()
            .zip(self.y.iter())
            .map(|(x, y)| (x.hypot(*y), y.atan2(*x)))
            .unzip()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn classify(pixel: &Rgb<u8>) -> Terrain {
    let [r, g, b] = pixel.0;

    if r > NAV_THRESH && g > NAV_THRESH && b > NAV_THRESH {
        Terrain::Navigable
    }
    else if r > SAMPLE_RG_THRESH && g > SAMPLE_RG_THRESH && b < SAMPLE_B_THRESH {
        Terrain::Sample
    }
    else {
        Terrain::Obstacle
    }
}

/// Add rover frame pixels to a layer of the world map.
fn mark(
    map: &mut WorldMap,
    calib: &Calibration,
    pose: &Pose,
    pixels: &RoverPixels,
    layer: MapLayer
) {
    let (sin, cos) = pose.yaw_deg.to_radians().sin_cos();
    let max_x = map.width().saturating_sub(1) as f64;
    let max_y = map.height().saturating_sub(1) as f64;

    for (xr, yr) in pixels.x.iter().zip(pixels.y.iter()) {
        let xw = (xr * cos - yr * sin) / calib.scale + pose.pos[0];
        let yw = (xr * sin + yr * cos) / calib.scale + pose.pos[1];

        if !(xw.is_finite() && yw.is_finite()) {
            continue
        }

        map.add(
            layer,
            xw.max(0.0).min(max_x) as usize,
            yw.max(0.0).min(max_y) as usize,
            1.0
        );
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rover_state::RoverParams;

    /// Camera image with bright ground on the lower half.
    fn open_ground() -> RgbImage {
        RgbImage::from_fn(320, 160, |_, y| {
            if y >= 90 { Rgb([200, 190, 180]) } else { Rgb([40, 30, 20]) }
        })
    }

    fn perceive(
        image: &RgbImage,
        pose: &Pose,
        skip_next: bool,
        map: &mut WorldMap
    ) -> PerceptionOutput {
        let calib = Calibration::new(200, 200).unwrap();
        let params = RoverParams::default();

        ThreshPerception.perceive(PerceptionCtx {
            image,
            pose,
            calib: &calib,
            params: &params,
            skip_next,
            worldmap: map
        })
    }

    #[test]
    fn test_open_ground() {
        let pose = Pose { pos: [100.0, 100.0], yaw_deg: 0.0, pitch_deg: 0.0, roll_deg: 0.0 };
        let mut map = WorldMap::new(200, 200);

        let out = perceive(&open_ground(), &pose, false, &mut map);
        assert!(out.skip_next);

        let frame = out.frame.unwrap();
        let p = &frame.perceived;

        assert!(p.nav_angles.len() > 100);
        assert_eq!(p.nav_angles.len(), p.nav_dists.len());
        assert!(p.sample_angles.is_empty());
        assert!(!p.sample_detected);

        // The ground is symmetric about the camera axis
        let mean = util::maths::mean(&p.nav_angles).unwrap();
        assert!(mean.abs() < 0.1, "mean angle {}", mean);

        // Navigable ground is ahead of the rover (+x at zero yaw)
        assert!(map.get(MapLayer::Navigable, 101, 100) > 0.0);
        assert_eq!(map.get(MapLayer::Navigable, 97, 100), 0.0);
    }

    #[test]
    fn test_samples() {
        let image = RgbImage::from_fn(320, 160, |x, y| {
            if y >= 120 && x >= 150 && x < 170 { Rgb([180, 150, 20]) } else { Rgb([200, 200, 200]) }
        });
        let pose = Pose::default();
        let mut map = WorldMap::new(200, 200);

        let p = perceive(&image, &pose, false, &mut map).frame.unwrap().perceived;

        assert!(p.sample_detected);
        assert!(p.sample_angles.len() >= 5);
    }

    #[test]
    fn test_tilted_not_mapped() {
        let pose = Pose { pos: [100.0, 100.0], yaw_deg: 0.0, pitch_deg: 357.0, roll_deg: 0.0 };
        let mut map = WorldMap::new(200, 200);
        let blank = map.clone();

        let out = perceive(&open_ground(), &pose, false, &mut map);

        assert!(!out.frame.unwrap().perceived.nav_angles.is_empty());
        assert_eq!(map, blank);
    }

    #[test]
    fn test_skip_every_second_frame() {
        let pose = Pose::default();
        let mut map = WorldMap::new(200, 200);
        let blank = map.clone();

        let out = perceive(&open_ground(), &pose, true, &mut map);

        assert!(out.frame.is_none());
        assert!(!out.skip_next);
        assert_eq!(map, blank);
    }
}
