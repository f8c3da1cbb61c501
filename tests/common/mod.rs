//! Maps shared by the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use traffic_grid::{Cell, CityMap, Direction, SimulationConfig, Tile};

/// The path of a file in the `maps` directory.
pub fn map_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("maps").join(name)
}

/// The sample city: a two-lane ring road around four destinations and a block of obstacles.
pub fn city() -> CityMap {
    CityMap::load(map_file("city.txt"), map_file("dictionary.json")).unwrap()
}

/// A 4x4 map of right-flowing roads, with a destination in the bottom right corner.
pub fn straight_road() -> CityMap {
    let mut tiles = vec![(Cell::new(3, 0), Tile::Destination)];
    for x in 0..4 {
        for y in 0..4 {
            tiles.push((Cell::new(x, y), Tile::Road(Direction::Right)));
        }
    }
    CityMap::from_tiles(4, 4, tiles)
}

/// A configuration which never spawns cars by itself, entering at `(0, 0)` only.
pub fn manual_config(stuck_threshold: u32) -> SimulationConfig {
    let mut config = SimulationConfig::new(stuck_threshold);
    config.entry_cells = Some(vec![Cell::new(0, 0)]);
    config
}
