use crate::config::{OccupiedCellPolicy, OpenSetPolicy};
use crate::entity::Approach;
use crate::grid::Cell;
use crate::World;
use arrayvec::ArrayVec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Plans routes across the grid with an A* search.
///
/// Plans are made against a snapshot of the world and can go stale: a red signal is
/// treated as passable and other cars only add cost (or are avoided entirely under
/// [OccupiedCellPolicy::Block]). Cars re-validate every move as they make it.
#[derive(Clone, Copy, Debug)]
pub struct PathPlanner<'a> {
    world: &'a World,
    occupied: OccupiedCellPolicy,
    open_set: OpenSetPolicy,
}

/// An entry in the open set.
/// Ordered by `f`, then `g`, then cell, so ties always break the same way.
/// Costs are `u64`, since a single step may cost up to `u32::MAX`.
type OpenEntry = Reverse<(u64, u64, Cell, usize)>;

/// A cell reached during the search, with the node it was reached from.
struct Node {
    cell: Cell,
    parent: Option<usize>,
}

impl<'a> PathPlanner<'a> {
    /// Creates a planner over the given world.
    pub fn new(world: &'a World, occupied: OccupiedCellPolicy, open_set: OpenSetPolicy) -> Self {
        Self {
            world,
            occupied,
            open_set,
        }
    }

    /// Finds a route from `start` to `goal`, excluding `start` itself.
    /// Returns an empty path if there is no route, or if `start == goal`.
    pub fn find_path(&self, start: Cell, goal: Cell) -> Vec<Cell> {
        let grid = self.world.grid();
        if !grid.in_bounds(start) || !grid.in_bounds(goal) || start == goal {
            return vec![];
        }
        let path = match self.open_set {
            OpenSetPolicy::KeepExisting => self.search(start, goal),
            OpenSetPolicy::Exact => pathfinding::directed::astar::astar(
                &start,
                |cell| self.successors(*cell, goal),
                |cell| heuristic(*cell, goal),
                |cell| *cell == goal,
            )
            .map(|(path, _)| path.into_iter().skip(1).collect()),
        };
        path.unwrap_or_else(|| {
            log::debug!("no path from {} to {}", start, goal);
            vec![]
        })
    }

    /// The total cost of following `path` from `start`, or `None` if any step is illegal.
    pub fn path_cost(&self, start: Cell, goal: Cell, path: &[Cell]) -> Option<u64> {
        let mut from = start;
        let mut cost = 0;
        for to in path {
            let approach = Approach { from, to: *to, goal };
            approach.heading()?;
            cost += u64::from(self.world.plan_cost(&approach, self.occupied)?);
            from = *to;
        }
        Some(cost)
    }

    /// The legal moves out of a cell, with their costs.
    fn successors(&self, from: Cell, goal: Cell) -> ArrayVec<(Cell, u64), 4> {
        self.world
            .grid()
            .neighbors4(from)
            .into_iter()
            .filter_map(|to| {
                let approach = Approach { from, to, goal };
                self.world
                    .plan_cost(&approach, self.occupied)
                    .map(|cost| (to, u64::from(cost)))
            })
            .collect()
    }

    /// A* which never replaces or re-opens an open-set entry: a candidate is only
    /// pushed when no open entry for its cell is at least as cheap.
    fn search(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        let mut nodes = vec![Node {
            cell: start,
            parent: None,
        }];
        let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
        // Lowest `g` among the open entries of each cell not yet closed
        let mut open_g: HashMap<Cell, u64> = HashMap::new();
        let mut closed: HashSet<Cell> = HashSet::new();

        open.push(Reverse((heuristic(start, goal), 0, start, 0)));
        open_g.insert(start, 0);

        while let Some(Reverse((_, g, cell, idx))) = open.pop() {
            if cell == goal {
                return Some(unwind(&nodes, idx));
            }
            if !closed.insert(cell) {
                continue;
            }
            for (next, cost) in self.successors(cell, goal) {
                if closed.contains(&next) {
                    continue;
                }
                let tentative = g + cost;
                if open_g.get(&next).map_or(false, |best| *best <= tentative) {
                    continue;
                }
                open_g.insert(next, tentative);
                nodes.push(Node {
                    cell: next,
                    parent: Some(idx),
                });
                open.push(Reverse((tentative + heuristic(next, goal), tentative, next, nodes.len() - 1)));
            }
        }
        None
    }
}

fn heuristic(cell: Cell, goal: Cell) -> u64 {
    u64::from(cell.manhattan(goal))
}

/// Rebuilds the path ending at node `idx`, excluding the start cell.
fn unwind(nodes: &[Node], mut idx: usize) -> Vec<Cell> {
    let mut path = vec![];
    while let Some(parent) = nodes[idx].parent {
        path.push(nodes[idx].cell);
        idx = parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::map::{CityMap, Tile};
    use crate::{CarId, Entity};
    use slotmap::KeyData;

    /// A 5x5 map of right-flowing roads with a destination at (4, 2).
    fn open_world() -> World {
        let tiles = (0..5)
            .flat_map(|y| (0..5).map(move |x| Cell::new(x, y)))
            .map(|cell| {
                if cell == Cell::new(4, 2) {
                    (cell, Tile::Destination)
                } else {
                    (cell, Tile::Road(Direction::Right))
                }
            });
        World::from_map(&CityMap::from_tiles(5, 5, tiles))
    }

    #[test]
    fn finds_shortest_route() {
        let world = open_world();
        let planner = PathPlanner::new(&world, OccupiedCellPolicy::default(), OpenSetPolicy::KeepExisting);
        let path = planner.find_path(Cell::new(0, 0), Cell::new(4, 2));
        // Equal-cost cells break ties by `x` first, so the route climbs the left column
        let expected = [(0, 1), (0, 2), (1, 2), (2, 2), (3, 2), (4, 2)].map(Cell::from);
        assert_eq!(path, expected);
    }

    #[test]
    fn never_drives_against_the_flow() {
        let world = open_world();
        let planner = PathPlanner::new(&world, OccupiedCellPolicy::default(), OpenSetPolicy::KeepExisting);
        // Everything flows right, so (0, 0) is unreachable from (3, 0)
        assert!(planner.find_path(Cell::new(3, 0), Cell::new(0, 0)).is_empty());
    }

    #[test]
    fn start_equal_to_goal_is_empty() {
        let world = open_world();
        let planner = PathPlanner::new(&world, OccupiedCellPolicy::default(), OpenSetPolicy::Exact);
        assert!(planner.find_path(Cell::new(1, 1), Cell::new(1, 1)).is_empty());
    }

    #[test]
    fn huge_penalties_do_not_overflow() {
        let mut world = open_world();
        let car = Entity::Car(CarId::from(KeyData::from_ffi(1)));
        world.grid.place(car, Cell::new(1, 2));
        let (start, goal) = (Cell::new(0, 2), Cell::new(4, 2));
        let direct = [(1, 2), (2, 2), (3, 2), (4, 2)].map(Cell::from);

        for open_set in [OpenSetPolicy::KeepExisting, OpenSetPolicy::Exact] {
            let planner = PathPlanner::new(&world, OccupiedCellPolicy::Penalize(u32::MAX), open_set);
            let path = planner.find_path(start, goal);
            assert_eq!(path.len(), 6, "{:?}", open_set);
            assert!(!path.contains(&Cell::new(1, 2)), "{:?}", open_set);
            assert_eq!(planner.path_cost(start, goal, &path), Some(6));
            assert_eq!(planner.path_cost(start, goal, &direct), Some(u64::from(u32::MAX) + 3));
        }
    }

    #[test]
    fn unwind_skips_the_start() {
        let nodes = [
            Node { cell: Cell::new(0, 0), parent: None },
            Node { cell: Cell::new(1, 0), parent: Some(0) },
            Node { cell: Cell::new(2, 0), parent: Some(1) },
        ];
        assert_eq!(unwind(&nodes, 2), vec![Cell::new(1, 0), Cell::new(2, 0)]);
    }
}
