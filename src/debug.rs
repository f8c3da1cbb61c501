//! Text rendering of the grid, for logging and tests.

use crate::grid::{Cell, Direction};
use crate::{Entity, World};
use itertools::Itertools;

/// Renders the world as text, top row first.
///
/// Cars are `C`, obstacles `#`, destinations `D`, green and red signals `G` and `R`,
/// roads `^ v < >` and empty cells `.`.
pub fn render(world: &World) -> String {
    let grid = world.grid();
    (0..grid.height() as i32)
        .rev()
        .map(|y| {
            (0..grid.width() as i32)
                .map(|x| symbol(world, Cell::new(x, y)))
                .collect::<String>()
        })
        .join("\n")
}

fn symbol(world: &World, cell: Cell) -> char {
    let occupants = world.grid().occupants_of(cell);
    let has = |pred: fn(&Entity) -> bool| occupants.iter().any(pred);
    if has(Entity::is_car) {
        'C'
    } else if has(|e| matches!(e, Entity::Obstacle(_))) {
        '#'
    } else if has(|e| matches!(e, Entity::Destination(_))) {
        'D'
    } else if let Some(signal) = world.signal_at(cell) {
        if signal.is_green() {
            'G'
        } else {
            'R'
        }
    } else {
        match world.road_direction_at(cell) {
            Some(Direction::Up) => '^',
            Some(Direction::Down) => 'v',
            Some(Direction::Left) => '<',
            Some(Direction::Right) => '>',
            None => '.',
        }
    }
}
