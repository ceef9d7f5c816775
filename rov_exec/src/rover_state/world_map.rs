//! Accumulated map of the world as seen by perception

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ndarray::Array3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A map of the world with one cell per meter, indexed `[y, x, layer]`.
///
/// Each layer accumulates how often a cell was seen as that kind of terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMap {
    data: Array3<f32>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLayer {
    Obstacle,
    Sample,
    Navigable,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MapLayer {
    fn index(self) -> usize {
        match self {
            MapLayer::Obstacle => 0,
            MapLayer::Sample => 1,
            MapLayer::Navigable => 2,
        }
    }
}

impl WorldMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array3::zeros((height, width, 3))
        }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Value of a cell, zero outside the map.
    pub fn get(&self, layer: MapLayer, x: usize, y: usize) -> f32 {
        self.data
            .get([y, x, layer.index()])
            .copied()
            .unwrap_or(0.0)
    }

    /// Add to a cell. Points outside the map are ignored.
    pub fn add(&mut self, layer: MapLayer, x: usize, y: usize, amount: f32) {
        if let Some(v) = self.data.get_mut([y, x, layer.index()]) {
            *v += amount;
        }
    }
}
