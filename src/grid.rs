//! The bounded occupancy grid shared by every entity in the simulation.

use crate::Entity;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// A discrete grid coordinate. `y` grows upwards.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Creates a new cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step away in the given direction. May be out of bounds.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The Manhattan distance between two cells.
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The direction of travel along a road.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in the order neighbors are visited.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// The unit offset of one step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Whether the direction runs along the y axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// The direction of a single von Neumann step from `from` to `to`, if they are adjacent.
    pub fn between(from: Cell, to: Cell) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|dir| from.step(*dir) == to)
    }

    /// Parses one of `"Up"`, `"Down"`, `"Left"` or `"Right"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Up" => Some(Self::Up),
            "Down" => Some(Self::Down),
            "Left" => Some(Self::Left),
            "Right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// A bounded 2D grid in which each cell may hold any number of entities.
///
/// The grid only stores entity IDs. Callers must check [SpatialGrid::in_bounds]
/// before placing or moving anything.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    width: usize,
    height: usize,
    /// The occupants of each cell, stored row-major from `y = 0`.
    cells: Vec<SmallVec<[Entity; 2]>>,
    /// The cell each entity currently occupies.
    locations: HashMap<Entity, Cell>,
}

impl SpatialGrid {
    /// Creates an empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![SmallVec::new(); width * height],
            locations: HashMap::new(),
        }
    }

    /// The number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell lies inside the grid.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Places an entity into a cell. An entity already on the grid is moved instead.
    pub fn place(&mut self, entity: Entity, cell: Cell) {
        if self.locations.contains_key(&entity) {
            self.move_to(entity, cell);
            return;
        }
        let idx = self.index(cell);
        self.cells[idx].push(entity);
        self.locations.insert(entity, cell);
    }

    /// Removes an entity from the grid, returning the cell it occupied.
    pub fn remove(&mut self, entity: Entity) -> Option<Cell> {
        let cell = self.locations.remove(&entity)?;
        let idx = self.index(cell);
        self.cells[idx].retain(|e| *e != entity);
        Some(cell)
    }

    /// Moves an entity already on the grid to another cell.
    pub fn move_to(&mut self, entity: Entity, cell: Cell) {
        if self.remove(entity).is_some() {
            self.place(entity, cell);
        }
    }

    /// The cell an entity occupies, if it is on the grid.
    pub fn location_of(&self, entity: Entity) -> Option<Cell> {
        self.locations.get(&entity).copied()
    }

    /// The entities in a cell. Out of bounds cells are empty.
    pub fn occupants_of(&self, cell: Cell) -> &[Entity] {
        if self.in_bounds(cell) {
            &self.cells[self.index(cell)]
        } else {
            &[]
        }
    }

    /// The in-bounds von Neumann neighbors of a cell, in [Direction::ALL] order.
    pub fn neighbors4(&self, cell: Cell) -> ArrayVec<Cell, 4> {
        Direction::ALL
            .into_iter()
            .map(|dir| cell.step(dir))
            .filter(|c| self.in_bounds(*c))
            .collect()
    }

    fn index(&self, cell: Cell) -> usize {
        debug_assert!(self.in_bounds(cell), "cell {} is out of bounds", cell);
        cell.y as usize * self.width + cell.x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CarId;
    use slotmap::KeyData;

    fn car(n: u64) -> Entity {
        Entity::Car(CarId::from(KeyData::from_ffi(n)))
    }

    #[test]
    fn neighbors_are_clipped_at_the_edges() {
        let grid = SpatialGrid::new(3, 3);
        let corner = grid.neighbors4(Cell::new(0, 0));
        assert_eq!(corner.as_slice(), &[Cell::new(0, 1), Cell::new(1, 0)]);
        assert_eq!(grid.neighbors4(Cell::new(1, 1)).len(), 4);
    }

    #[test]
    fn move_updates_both_cells() {
        let mut grid = SpatialGrid::new(4, 2);
        let a = car(1);
        grid.place(a, Cell::new(0, 0));
        grid.move_to(a, Cell::new(3, 1));
        assert!(grid.occupants_of(Cell::new(0, 0)).is_empty());
        assert_eq!(grid.occupants_of(Cell::new(3, 1)), &[a]);
        assert_eq!(grid.location_of(a), Some(Cell::new(3, 1)));
        assert_eq!(grid.remove(a), Some(Cell::new(3, 1)));
        assert_eq!(grid.remove(a), None);
    }

    #[test]
    fn direction_between_adjacent_cells() {
        let c = Cell::new(2, 2);
        assert_eq!(Direction::between(c, Cell::new(2, 3)), Some(Direction::Up));
        assert_eq!(Direction::between(c, Cell::new(1, 2)), Some(Direction::Left));
        assert_eq!(Direction::between(c, Cell::new(3, 3)), None);
    }
}
