//! Tests that drive whole simulations tick by tick.

mod common;

use common::{city, manual_config, straight_road};
use std::collections::HashSet;
use traffic_grid::{Cell, CityMap, Direction, Metrics, Simulation, SimulationConfig, Tile};

/// Test that a car with a clear road arrives after one tick per cell of its route.
#[test]
fn car_drives_straight_to_its_destination() {
    let mut sim = Simulation::new(&straight_road(), 0, manual_config(5)).unwrap();
    let car = sim.add_car(Cell::new(0, 0), Cell::new(3, 0)).unwrap();

    for x in 1..3 {
        sim.step(1);
        assert_eq!(sim.car_position(car), Some(Cell::new(x, 0)));
    }
    sim.step(1);
    assert_eq!(sim.car_position(car), None);
    assert!(sim.get_car(car).is_none());
    assert_eq!(
        sim.metrics(),
        Metrics {
            active_cars: 0,
            reached_destinations: 1,
        }
    );
}

/// Test that a red signal holds a car back until it turns green.
#[test]
fn car_waits_at_a_red_signal() {
    let map = CityMap::from_tiles(
        4,
        1,
        [
            (Cell::new(0, 0), Tile::Road(Direction::Right)),
            (Cell::new(1, 0), Tile::Signal { green: true, period: 3 }),
            (Cell::new(2, 0), Tile::Road(Direction::Right)),
            (Cell::new(3, 0), Tile::Destination),
        ],
    );
    let mut sim = Simulation::new(&map, 0, manual_config(5)).unwrap();
    let car = sim.add_car(Cell::new(0, 0), Cell::new(3, 0)).unwrap();

    // The signal turns red on the first tick and green again on the fourth
    sim.step(3);
    assert_eq!(sim.car_position(car), Some(Cell::new(0, 0)));
    sim.step(1);
    assert_eq!(sim.car_position(car), Some(Cell::new(1, 0)));
    sim.step(2);
    assert_eq!(sim.car_position(car), None);
    assert_eq!(sim.metrics().reached_destinations, 1);
}

/// Test that a signal toggles every `period` ticks.
#[test]
fn signal_follows_its_period() {
    let mut tiles = vec![(Cell::new(2, 0), Tile::Signal { green: false, period: 5 })];
    for (x, y) in itertools::iproduct!(0..4, 0..4) {
        tiles.push((Cell::new(x, y), Tile::Road(Direction::Right)));
    }
    let map = CityMap::from_tiles(4, 4, tiles);
    let mut sim = Simulation::new(&map, 0, SimulationConfig::new(5)).unwrap();
    let is_green = |sim: &Simulation| sim.world().signal_at(Cell::new(2, 0)).unwrap().is_green();

    assert!(!is_green(&sim));
    sim.step(5);
    assert!(is_green(&sim));
    sim.step(5);
    assert!(!is_green(&sim));
}

/// Test that a batch of cars appears at the free entry cells every spawn interval.
#[test]
fn cars_spawn_at_each_interval() {
    let mut config = SimulationConfig::new(7);
    config.spawn_on_start = false;
    let mut sim = Simulation::new(&city(), 8, config).unwrap();

    sim.step(9);
    assert_eq!(sim.metrics().active_cars, 0);
    sim.step(1);
    assert_eq!(sim.metrics().active_cars, 4);
    assert_eq!(sim.remaining_spawns(), 4);

    let positions = sim.snapshot().cars.iter().map(|car| Cell::new(car.x, car.y)).collect::<HashSet<_>>();
    let entries = sim.entry_cells().iter().copied().collect::<HashSet<_>>();
    assert_eq!(positions, entries);
    let names = sim.snapshot().cars.into_iter().map(|car| car.id).collect::<Vec<_>>();
    assert_eq!(names, vec!["car_1", "car_2", "car_3", "car_4"]);
}

/// Test that the spawn budget is never exceeded.
#[test]
fn spawning_respects_the_budget() {
    let mut sim = Simulation::new(&city(), 5, SimulationConfig::new(7)).unwrap();
    assert_eq!(sim.metrics().active_cars, 4);
    for _ in 0..100 {
        sim.step(1);
        let Metrics {
            active_cars,
            reached_destinations,
        } = sim.metrics();
        assert_eq!(active_cars + reached_destinations + sim.remaining_spawns(), 5);
    }
}

/// Test that cars never share a cell, nor stand on an obstacle or destination.
#[test]
fn cars_keep_to_free_cells() {
    let mut config = SimulationConfig::new(3);
    config.seed = 7;
    let mut sim = Simulation::new(&city(), 30, config).unwrap();
    let obstacles = sim
        .snapshot()
        .obstacles
        .iter()
        .map(|obstacle| Cell::new(obstacle.x, obstacle.y))
        .collect::<HashSet<_>>();

    for _ in 0..300 {
        sim.step(1);
        let mut seen = HashSet::new();
        for car in sim.snapshot().cars {
            let cell = Cell::new(car.x, car.y);
            assert!(seen.insert(cell), "two cars at {} on tick {}", cell, sim.tick_count());
            assert!(!obstacles.contains(&cell));
            assert!(!sim.world().is_destination(cell));
        }
    }
    assert!(sim.metrics().reached_destinations > 0);
}

/// Test that two simulations with the same seed play out identically.
#[test]
fn seeded_runs_are_repeatable() {
    let run = || {
        let mut config = SimulationConfig::new(3);
        config.seed = 99;
        let mut sim = Simulation::new(&city(), 12, config).unwrap();
        sim.step(60);
        (sim.snapshot(), sim.history().copied().collect::<Vec<_>>())
    };
    assert_eq!(run(), run());
}
