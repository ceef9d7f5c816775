//! JPEG inset images: the vision image and the world map overlaid on the ground truth

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::sim::{self, FrameError};
use image::{Rgb, RgbImage};
use log::debug;

use super::{OutputComposer, OutputImages};
use crate::{
    planner::{GridCell, NavGrid},
    rover_state::{MapLayer, RoverState, WorldMap}
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const JPEG_QUALITY: u8 = 90;

/// Distance from a sample's true position within which a mapped sample counts as located.
///
/// Units: map cells
const SAMPLE_LOCATE_RADIUS: isize = 3;

const GROUND_TRUTH_COLOUR: Rgb<u8> = Rgb([0, 127, 0]);
const NAVIGABLE_COLOUR: Rgb<u8> = Rgb([0, 0, 255]);
const OBSTACLE_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const SAMPLE_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Composes the vision image and a world map overlay as JPEGs.
#[derive(Debug, Clone)]
pub struct JpegComposer {
    ground_truth: NavGrid
}

/// How well the world map matches the ground truth.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapStats {
    /// Percentage of the navigable ground truth which has been mapped as navigable
    pub mapped_pct: f64,

    /// Percentage of the cells mapped as navigable which are navigable in the ground truth
    pub fidelity_pct: f64,

    pub samples_located: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JpegComposer {
    pub fn new(ground_truth: NavGrid) -> Self {
        Self { ground_truth }
    }

    /// Draw the world map over the ground truth.
    ///
    /// The image is flipped vertically so that north is up.
    pub fn render_map(&self, map: &WorldMap, samples_pos: &[[f64; 2]]) -> (RgbImage, MapStats) {
        let width = map.width();
        let height = map.height();
        let mut image = RgbImage::new(width as u32, height as u32);

        let mut truth_nav = 0usize;
        let mut mapped_nav = 0usize;
        let mut good_nav = 0usize;

        for y in 0..height {
            for x in 0..width {
                let truth = self.ground_truth.is_traversable(&GridCell::new(x, y));
                let nav = map.get(MapLayer::Navigable, x, y) > 0.0;
                let obstacle = map.get(MapLayer::Obstacle, x, y) > 0.0;

                let colour = if nav {
                    NAVIGABLE_COLOUR
                }
                else if obstacle {
                    OBSTACLE_COLOUR
                }
                else if truth {
                    GROUND_TRUTH_COLOUR
                }
                else {
                    Rgb([0, 0, 0])
                };

                truth_nav += truth as usize;
                mapped_nav += nav as usize;
                good_nav += (nav && truth) as usize;

                image.put_pixel(x as u32, (height - 1 - y) as u32, colour);
            }
        }

        let mut samples_located = 0;

        for pos in samples_pos {
            let cell = match GridCell::from_position(*pos) {
                Some(c) if c.x < width && c.y < height => c,
                _ => continue
            };

            if !sample_near(map, cell, SAMPLE_LOCATE_RADIUS) {
                continue
            }

            samples_located += 1;

            // Mark the true position with a small square
            for dy in -1..=1isize {
                for dx in -1..=1isize {
                    let x = cell.x as isize + dx;
                    let y = cell.y as isize + dy;

                    if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                        image.put_pixel(x as u32, (height - 1 - y as usize) as u32, SAMPLE_COLOUR);
                    }
                }
            }
        }

        let stats = MapStats {
            mapped_pct: pct(good_nav, truth_nav),
            fidelity_pct: pct(good_nav, mapped_nav),
            samples_located,
        };

        (image, stats)
    }
}

impl OutputComposer for JpegComposer {
    fn compose(&mut self, rover: &RoverState) -> Result<OutputImages, FrameError> {
        let (map_image, stats) = self.render_map(rover.worldmap(), rover.samples_pos());

        debug!(
            "Mapped: {:.1} %, fidelity: {:.1} %, samples located: {}, collected: {}",
            stats.mapped_pct, stats.fidelity_pct, stats.samples_located, rover.samples_collected()
        );

        Ok(OutputImages {
            image1: sim::encode_frame_jpeg(rover.vision_image(), JPEG_QUALITY)?,
            image2: sim::encode_frame_jpeg(&map_image, JPEG_QUALITY)?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn pct(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    }
    else {
        100.0 * num as f64 / den as f64
    }
}

/// True if a sample has been mapped within `radius` cells of the given cell.
fn sample_near(map: &WorldMap, cell: GridCell, radius: isize) -> bool {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let x = cell.x as isize + dx;
            let y = cell.y as isize + dy;

            if x >= 0 && y >= 0 && map.get(MapLayer::Sample, x as usize, y as usize) > 0.0 {
                return true
            }
        }
    }

    false
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rover_state::RoverParams;
    use ndarray::Array2;

    #[test]
    fn test_render_map() {
        // Left half of the world is navigable
        let truth = NavGrid::new(Array2::from_shape_fn((10, 10), |(_, x)| x < 5)).unwrap();
        let composer = JpegComposer::new(truth);

        let mut map = WorldMap::new(10, 10);
        map.add(MapLayer::Navigable, 1, 0, 1.0);
        map.add(MapLayer::Navigable, 7, 0, 1.0);
        map.add(MapLayer::Obstacle, 8, 9, 1.0);
        map.add(MapLayer::Sample, 4, 4, 1.0);

        let (image, stats) = composer.render_map(&map, &[[5.5, 5.5], [9.5, 0.5]]);

        // Flipped, world y = 0 is the bottom row
        assert_eq!(*image.get_pixel(1, 9), NAVIGABLE_COLOUR);
        assert_eq!(*image.get_pixel(8, 0), OBSTACLE_COLOUR);
        assert_eq!(*image.get_pixel(2, 2), GROUND_TRUTH_COLOUR);
        assert_eq!(*image.get_pixel(7, 5), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 4), SAMPLE_COLOUR);

        assert_eq!(stats.samples_located, 1);
        assert!((stats.mapped_pct - 2.0).abs() < 1e-9);
        assert!((stats.fidelity_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_compose() -> Result<(), FrameError> {
        let grid = NavGrid::open(200, 200);
        let rover = RoverState::new(RoverParams::default(), grid.clone()).unwrap();

        let images = JpegComposer::new(grid).compose(&rover)?;

        assert_eq!(sim::decode_frame(&images.image1)?.dimensions(), (320, 160));
        assert_eq!(sim::decode_frame(&images.image2)?.dimensions(), (200, 200));

        Ok(())
    }
}
