//! Reference planner used to fill the policy grid.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use ndarray::Array2;

use super::{Action, GridCell, NavGrid};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute a policy leading every reachable cell to the goal.
///
/// Performs a breadth first flood from the goal over traversable, 4-connected cells. Each reached
/// cell is given the action which moves it one cell closer to the goal, so following the policy
/// from any cell takes a shortest path. Cells which cannot reach the goal are left unset.
///
/// Returns `None` if the goal is outside the grid or not traversable.
pub fn compute_policy(grid: &NavGrid, goal: GridCell) -> Option<Array2<Option<Action>>> {
    if !grid.is_traversable(&goal) {
        return None
    }

    let mut policy = Array2::from_elem(grid.dim(), None);
    let mut frontier = VecDeque::new();

    policy[[goal.y, goal.x]] = Some(Action::Goal);
    frontier.push_back(goal);

    while let Some(cell) = frontier.pop_front() {
        // For each neighbour, the action it must take to step back into this cell
        let neighbours = [
            (cell.x.checked_sub(1).map(|x| GridCell::new(x, cell.y)), Action::East),
            (Some(GridCell::new(cell.x + 1, cell.y)), Action::West),
            (cell.y.checked_sub(1).map(|y| GridCell::new(cell.x, y)), Action::North),
            (Some(GridCell::new(cell.x, cell.y + 1)), Action::South),
        ];

        for (n, action) in neighbours.iter() {
            let n = match n {
                Some(n) if grid.is_traversable(n) => *n,
                _ => continue
            };

            if policy[[n.y, n.x]].is_none() {
                policy[[n.y, n.x]] = Some(*action);
                frontier.push_back(n);
            }
        }
    }

    Some(policy)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Build a grid from rows of text, `#` is blocked. The first row is `y = 0`.
    fn grid(rows: &[&str]) -> NavGrid {
        let height = rows.len();
        let width = rows[0].len();

        NavGrid::new(Array2::from_shape_fn((height, width), |(y, x)| {
            rows[y].as_bytes()[x] != b'#'
        })).unwrap()
    }

    /// Follow the policy from the start and return the number of steps to the goal.
    fn follow(policy: &Array2<Option<Action>>, start: GridCell) -> Option<usize> {
        let mut cell = start;

        for steps in 0..policy.len() {
            cell = match policy[[cell.y, cell.x]]? {
                Action::Goal => return Some(steps),
                Action::East => GridCell::new(cell.x + 1, cell.y),
                Action::West => GridCell::new(cell.x - 1, cell.y),
                Action::North => GridCell::new(cell.x, cell.y + 1),
                Action::South => GridCell::new(cell.x, cell.y - 1),
            };
        }

        None
    }

    #[test]
    fn test_policy_around_wall() {
        let g = grid(&[
            ".....",
            ".###.",
            ".#...",
            "...#.",
        ]);

        let policy = compute_policy(&g, GridCell::new(2, 2)).unwrap();

        assert_eq!(policy[[2, 2]], Some(Action::Goal));
        assert_eq!(policy[[2, 3]], Some(Action::West));

        // Blocked cells never get an action
        assert_eq!(policy[[1, 1]], None);

        // Shortest path from the origin goes down the left side and along the bottom
        assert_eq!(follow(&policy, GridCell::new(0, 0)), Some(6));
        assert_eq!(follow(&policy, GridCell::new(4, 0)), Some(4));
    }

    #[test]
    fn test_unreachable_cells() {
        let g = grid(&[
            "..#..",
            "..#..",
        ]);

        let policy = compute_policy(&g, GridCell::new(0, 0)).unwrap();

        assert_eq!(policy[[0, 1]], Some(Action::West));
        assert_eq!(policy[[0, 3]], None);
        assert_eq!(policy[[1, 4]], None);
    }

    #[test]
    fn test_blocked_goal() {
        let g = grid(&[".#."]);

        assert!(compute_policy(&g, GridCell::new(1, 0)).is_none());
        assert!(compute_policy(&g, GridCell::new(7, 0)).is_none());
    }
}
