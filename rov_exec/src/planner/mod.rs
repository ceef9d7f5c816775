//! # Path-planning policy store
//!
//! Holds the data used for goal-directed exploration:
//!
//! - [`NavGrid`] - the traversability of every cell of the world, loaded once at startup and never
//!   modified afterwards.
//! - [`PolicyStore`] - a policy grid of the same shape as the navigation grid, giving the action
//!   to take from each cell to reach the current goal, and the ordered list of goals still to be
//!   visited.
//!
//! The store does not compute policies itself, see [`compute_policy`] for the reference planner
//! used by the decision step.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod search;

pub use search::compute_policy;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::VecDeque, path::Path};

use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A cell in the world grid, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

/// Traversability of the world, indexed `[y, x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NavGrid {
    traversable: Array2<bool>
}

/// The policy grid and goal list.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStore {
    grid: NavGrid,

    /// Action to take from each cell, `None` where no policy is set.
    policy: Array2<Option<Action>>,

    /// Goals still to visit, the front is the active goal.
    goals: VecDeque<GridCell>,

    /// True once a policy has been computed for the active goal.
    grid_set: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An action in the policy grid.
///
/// North is towards increasing `y`, east towards increasing `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    North,
    South,
    East,
    West,

    /// The cell is the goal itself.
    Goal,
}

#[derive(Debug, thiserror::Error)]
pub enum NavGridError {
    #[error("Could not load the map image: {0}")]
    ImageError(image::ImageError),

    #[error("The map has no cells")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Policy shape {0:?} doesn't match the navigation grid shape {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),

    #[error("There is no active goal to set a policy for")]
    NoGoal,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridCell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Get the cell containing the given world position, or `None` if it's negative or not
    /// finite.
    pub fn from_position(pos: [f64; 2]) -> Option<Self> {
        if pos.iter().all(|p| p.is_finite() && *p >= 0.0) {
            Some(Self::new(pos[0].floor() as usize, pos[1].floor() as usize))
        }
        else {
            None
        }
    }

    /// Chebyshev distance between two cells.
    pub fn dist(&self, other: &GridCell) -> usize {
        let dx = (self.x as isize - other.x as isize).abs();
        let dy = (self.y as isize - other.y as isize).abs();

        dx.max(dy) as usize
    }
}

impl Action {
    /// Heading of the action in degrees, measured anticlockwise from east.
    ///
    /// `Goal` has no heading.
    pub fn heading_deg(&self) -> Option<f64> {
        match self {
            Action::East => Some(0.0),
            Action::North => Some(90.0),
            Action::West => Some(180.0),
            Action::South => Some(270.0),
            Action::Goal => None,
        }
    }
}

impl NavGrid {
    /// Create a grid from a traversability array indexed `[y, x]`.
    pub fn new(traversable: Array2<bool>) -> Result<Self, NavGridError> {
        if traversable.is_empty() {
            return Err(NavGridError::Empty)
        }

        Ok(Self { traversable })
    }

    /// A grid where every cell is traversable.
    pub fn open(width: usize, height: usize) -> Self {
        Self {
            traversable: Array2::from_elem((height.max(1), width.max(1)), true)
        }
    }

    /// Load the grid from a black and white map image.
    ///
    /// Any non-zero pixel is traversable. Image row `y` maps to grid row `y`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NavGridError> {
        let map = image::open(path)
            .map_err(NavGridError::ImageError)?
            .to_luma8();

        let (width, height) = map.dimensions();

        let traversable = Array2::from_shape_fn(
            (height as usize, width as usize),
            |(y, x)| map.get_pixel(x as u32, y as u32).0[0] > 0
        );

        Self::new(traversable)
    }

    /// Shape of the grid as `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        self.traversable.dim()
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }

    pub fn contains(&self, cell: &GridCell) -> bool {
        cell.x < self.width() && cell.y < self.height()
    }

    /// True if the cell is inside the grid and traversable.
    pub fn is_traversable(&self, cell: &GridCell) -> bool {
        self.contains(cell) && self.traversable[[cell.y, cell.x]]
    }

    /// Number of traversable cells.
    pub fn num_traversable(&self) -> usize {
        self.traversable.iter().filter(|t| **t).count()
    }
}

impl PolicyStore {
    /// Create a new store with an unset policy over the given grid.
    pub fn new(grid: NavGrid, goals: &[GridCell]) -> Self {
        let policy = Array2::from_elem(grid.dim(), None);

        Self {
            grid,
            policy,
            goals: goals.iter().copied().collect(),
            grid_set: false,
        }
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn policy(&self) -> &Array2<Option<Action>> {
        &self.policy
    }

    /// The active goal, or `None` once every goal has been visited or abandoned.
    pub fn current_goal(&self) -> Option<GridCell> {
        self.goals.front().copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.goals.is_empty()
    }

    /// True if the policy has been computed for the active goal.
    pub fn grid_set(&self) -> bool {
        self.grid_set
    }

    /// Set the policy for the active goal.
    pub fn set_policy(&mut self, policy: Array2<Option<Action>>) -> Result<(), PlanError> {
        if self.is_exhausted() {
            return Err(PlanError::NoGoal)
        }

        if policy.dim() != self.grid.dim() {
            return Err(PlanError::ShapeMismatch(policy.dim(), self.grid.dim()))
        }

        self.policy = policy;
        self.grid_set = true;

        Ok(())
    }

    /// Action for the given cell, `None` if unset or outside the grid.
    pub fn action_at(&self, cell: &GridCell) -> Option<Action> {
        if self.grid.contains(cell) {
            self.policy[[cell.y, cell.x]]
        }
        else {
            None
        }
    }

    /// The active goal has been reached, move on to the next one.
    pub fn goal_reached(&mut self) {
        if let Some(g) = self.advance_goal() {
            info!("Goal ({}, {}) reached", g.x, g.y);
        }
    }

    /// The active goal cannot be reached, abandon it and move on to the next one.
    pub fn goal_unreachable(&mut self) {
        if let Some(g) = self.advance_goal() {
            info!("Goal ({}, {}) is unreachable, skipping it", g.x, g.y);
        }
    }

    fn advance_goal(&mut self) -> Option<GridCell> {
        let prev = self.goals.pop_front();

        self.policy.iter_mut().for_each(|p| *p = None);
        self.grid_set = false;

        match self.current_goal() {
            Some(g) => info!("Next goal is ({}, {})", g.x, g.y),
            None => info!("All goals visited, falling back to vision only navigation"),
        }

        prev
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_policy_store_flag() -> Result<(), PlanError> {
        let goals = [GridCell::new(1, 1), GridCell::new(3, 2)];
        let mut store = PolicyStore::new(NavGrid::open(5, 4), &goals);

        assert!(!store.grid_set());
        assert_eq!(store.current_goal(), Some(goals[0]));
        assert_eq!(store.policy().dim(), store.grid().dim());
        assert!(store.policy().iter().all(|p| p.is_none()));

        let mut policy = Array2::from_elem((4, 5), None);
        policy[[1, 1]] = Some(Action::Goal);
        policy[[1, 2]] = Some(Action::West);
        store.set_policy(policy)?;

        assert!(store.grid_set());
        assert_eq!(store.action_at(&GridCell::new(2, 1)), Some(Action::West));
        assert_eq!(store.action_at(&GridCell::new(9, 1)), None);

        store.goal_reached();

        assert!(!store.grid_set());
        assert_eq!(store.current_goal(), Some(goals[1]));
        assert_eq!(store.action_at(&GridCell::new(2, 1)), None);

        store.goal_unreachable();

        assert!(store.is_exhausted());
        assert_eq!(store.current_goal(), None);

        Ok(())
    }

    #[test]
    fn test_policy_shape_checked() {
        let mut store = PolicyStore::new(NavGrid::open(5, 4), &[GridCell::new(0, 0)]);

        assert!(matches!(
            store.set_policy(Array2::from_elem((5, 4), None)),
            Err(PlanError::ShapeMismatch(_, _))
        ));
        assert!(!store.grid_set());
    }

    #[test]
    fn test_no_policy_without_goal() {
        let mut store = PolicyStore::new(NavGrid::open(2, 2), &[]);

        assert!(matches!(
            store.set_policy(Array2::from_elem((2, 2), None)),
            Err(PlanError::NoGoal)
        ));
    }

    #[test]
    fn test_grid_cell() {
        assert_eq!(GridCell::from_position([10.7, 3.2]), Some(GridCell::new(10, 3)));
        assert_eq!(GridCell::from_position([-1.0, 3.2]), None);
        assert_eq!(GridCell::from_position([f64::NAN, 3.2]), None);
        assert_eq!(GridCell::new(1, 1).dist(&GridCell::new(4, 3)), 3);
    }
}
