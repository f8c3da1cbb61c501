use crate::car::{CarContext, CarStep};
use crate::entity::{Entity, Occupant, Steppable};
use crate::error::SimulationError;
use crate::grid::{Cell, Direction};
use crate::map::CityMap;
use crate::schedule::{Scheduler, SimulationClock};
use crate::{debug, Car, CarId, CarSet, SimulationConfig, World};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// A traffic simulation.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// The grid and the static entities on it.
    world: World,
    /// The cars being simulated.
    cars: CarSet,
    /// The activation order of signals and cars.
    scheduler: Scheduler,
    /// The number of completed ticks.
    clock: SimulationClock,
    /// The simulation parameters.
    config: SimulationConfig,
    /// The cells where new cars appear, in the order they are tried.
    entry_cells: Vec<Cell>,
    /// The cells of all destination zones, in map order.
    destinations: Vec<Cell>,
    /// Picks destinations for new cars.
    rng: StdRng,
    /// The number of cars which may still be spawned.
    remaining_spawns: usize,
    /// The number of cars spawned so far.
    spawned: usize,
    /// The number of cars currently on the grid.
    active_cars: usize,
    /// The number of cars which have reached their destination.
    reached_destinations: usize,
    /// The most recent metrics samples, oldest first.
    history: VecDeque<MetricsSample>,
}

/// Counters describing the current state of a simulation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub active_cars: usize,
    pub reached_destinations: usize,
}

/// The metrics recorded at the end of a tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSample {
    pub tick: u64,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// The position of a car, obstacle or destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub x: i32,
    pub y: i32,
}

/// The position and direction of a road.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadPlacement {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

/// The position and state of a traffic signal. `state` is `true` when green.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPlacement {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub state: bool,
}

/// Everything on the grid at the end of a tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cars: Vec<Placement>,
    pub roads: Vec<RoadPlacement>,
    pub signals: Vec<SignalPlacement>,
    pub obstacles: Vec<Placement>,
    pub destinations: Vec<Placement>,
}

impl Simulation {
    /// Creates a simulation of the given map.
    ///
    /// `car_count` is the total number of cars that will be spawned over the run.
    /// Fails if an entry cell has no road.
    pub fn new(map: &CityMap, car_count: usize, config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let world = World::from_map(map);

        let entry_cells = config.entry_cells_for(map.width(), map.height());
        if let Some(cell) = entry_cells
            .iter()
            .find(|cell| world.road_direction_at(**cell).is_none())
        {
            return Err(SimulationError::InvalidEntryPosition(*cell));
        }

        let mut scheduler = Scheduler::default();
        for signal in world.iter_signals() {
            scheduler.add_signal(signal.id);
        }
        let destinations = world
            .iter_destinations()
            .filter_map(|dst| world.location_of(dst.entity()))
            .collect();

        let mut sim = Self {
            world,
            cars: CarSet::with_key(),
            scheduler,
            clock: SimulationClock::default(),
            rng: StdRng::seed_from_u64(config.seed),
            entry_cells,
            destinations,
            remaining_spawns: car_count,
            spawned: 0,
            active_cars: 0,
            reached_destinations: 0,
            history: VecDeque::new(),
            config,
        };
        if sim.config.spawn_on_start {
            sim.spawn_cars(sim.config.spawn_batch);
        }
        sim.record_sample();
        Ok(sim)
    }

    /// Loads a map layout and dictionary from disk and creates a simulation of it.
    pub fn load(
        layout: impl AsRef<Path>,
        dictionary: impl AsRef<Path>,
        car_count: usize,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        let map = CityMap::load(layout, dictionary)?;
        Self::new(&map, car_count, config)
    }

    /// Adds a car heading for `destination` at `start`.
    /// The car does not count against the spawn budget.
    pub fn add_car(&mut self, start: Cell, destination: Cell) -> Result<CarId, SimulationError> {
        for cell in [start, destination] {
            if !self.world.grid().in_bounds(cell) {
                return Err(SimulationError::OutOfBounds(cell));
            }
        }
        if self.world.has_car(start) {
            return Err(SimulationError::CellOccupied(start));
        }
        Ok(self.insert_car(start, destination))
    }

    /// Advances the simulation by the given number of ticks, returning the new tick count.
    pub fn step(&mut self, ticks: u64) -> u64 {
        for _ in 0..ticks {
            self.tick();
        }
        self.clock.tick()
    }

    /// Advances the simulation by one tick.
    pub fn tick(&mut self) {
        self.update_signals();
        self.update_cars();
        self.clock.advance();
        if self.clock.is_due(self.config.spawn_interval) {
            self.spawn_cars(self.config.spawn_batch);
        }
        self.record_sample();

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("tick {}\n{}", self.clock.tick(), debug::render(&self.world));
        }
    }

    /// Gets the number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.clock.tick()
    }

    /// Gets the world the cars drive in.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Gets the simulation parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Gets the cells where new cars appear.
    pub fn entry_cells(&self) -> &[Cell] {
        &self.entry_cells
    }

    /// Returns an iterator over the cars, in activation order.
    pub fn iter_cars(&self) -> impl Iterator<Item = &Car> {
        self.scheduler.cars().iter().map(|id| &self.cars[*id])
    }

    /// Gets a car, unless it has already arrived.
    pub fn get_car(&self, id: CarId) -> Option<&Car> {
        self.cars.get(id)
    }

    /// Gets the cell a car occupies, unless it has already arrived.
    pub fn car_position(&self, id: CarId) -> Option<Cell> {
        self.world.location_of(Entity::Car(id))
    }

    /// Gets the number of cars which may still be spawned.
    pub fn remaining_spawns(&self) -> usize {
        self.remaining_spawns
    }

    /// Gets the current counters.
    pub fn metrics(&self) -> Metrics {
        Metrics {
            active_cars: self.active_cars,
            reached_destinations: self.reached_destinations,
        }
    }

    /// Gets the metrics sampled at creation and after every tick, oldest first.
    /// Only the last `history_limit` samples are kept.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &MetricsSample> {
        self.history.iter()
    }

    /// Captures the position of everything on the grid.
    pub fn snapshot(&self) -> Snapshot {
        let world = &self.world;
        Snapshot {
            cars: self
                .iter_cars()
                .filter_map(|car| self.placement(car))
                .collect(),
            roads: world
                .iter_roads()
                .filter_map(|road| {
                    let Placement { id, x, y } = self.placement(road)?;
                    Some(RoadPlacement {
                        id,
                        x,
                        y,
                        direction: road.direction(),
                    })
                })
                .collect(),
            signals: world
                .iter_signals()
                .filter_map(|signal| {
                    let Placement { id, x, y } = self.placement(signal)?;
                    Some(SignalPlacement {
                        id,
                        x,
                        y,
                        state: signal.is_green(),
                    })
                })
                .collect(),
            obstacles: world
                .iter_obstacles()
                .filter_map(|obstacle| self.placement(obstacle))
                .collect(),
            destinations: world
                .iter_destinations()
                .filter_map(|dst| self.placement(dst))
                .collect(),
        }
    }

    fn placement(&self, occupant: &impl Occupant) -> Option<Placement> {
        let cell = self.world.location_of(occupant.entity())?;
        Some(Placement {
            id: occupant.name().to_owned(),
            x: cell.x,
            y: cell.y,
        })
    }

    fn record_sample(&mut self) {
        let limit = self.config.history_limit;
        if limit == 0 {
            return;
        }
        let sample = MetricsSample {
            tick: self.clock.tick(),
            metrics: self.metrics(),
        };
        while self.history.len() >= limit {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }

    /// Toggles the signals which are due this tick.
    fn update_signals(&mut self) {
        let now = self.clock.tick();
        for id in self.scheduler.signals() {
            self.world.signals[*id].step(now);
        }
    }

    /// Steps every car once, in activation order, and retires the ones that arrived.
    fn update_cars(&mut self) {
        let order = self.scheduler.cars().to_vec();
        for id in order {
            let Some(car) = self.cars.get_mut(id) else {
                continue;
            };
            let outcome = car.step(CarContext {
                world: &mut self.world,
                config: &self.config,
            });
            if outcome == CarStep::Arrived {
                self.retire_car(id);
            }
        }
    }

    /// Spawns up to `count` cars at free entry cells, limited by the spawn budget.
    /// Returns the number of cars spawned.
    fn spawn_cars(&mut self, count: usize) -> usize {
        let count = count.min(self.remaining_spawns);
        if count == 0 {
            return 0;
        }
        if self.destinations.is_empty() {
            log::warn!("no destinations to assign, skipping spawn");
            return 0;
        }

        let free = self
            .entry_cells
            .iter()
            .copied()
            .filter(|cell| !self.world.has_car(*cell))
            .take(count)
            .collect::<Vec<_>>();
        if free.is_empty() {
            log::warn!("no free entry cell at tick {}, skipping spawn", self.clock.tick());
            return 0;
        }

        for cell in &free {
            if let Some(destination) = self.destinations.choose(&mut self.rng).copied() {
                self.insert_car(*cell, destination);
            }
        }
        self.remaining_spawns -= free.len();
        free.len()
    }

    fn insert_car(&mut self, start: Cell, destination: Cell) -> CarId {
        self.spawned += 1;
        let name = format!("car_{}", self.spawned);
        log::info!("{} spawned at {} heading for {}", name, start, destination);

        let id = self
            .cars
            .insert_with_key(|id| Car::new(id, name, destination));
        self.world.grid.place(Entity::Car(id), start);
        self.scheduler.add_car(id);
        self.active_cars += 1;
        id
    }

    /// Removes a car which reached its destination.
    fn retire_car(&mut self, id: CarId) {
        self.world.grid.remove(Entity::Car(id));
        self.scheduler.remove_car(id);
        if let Some(car) = self.cars.remove(id) {
            log::info!("{} reached {}", car.name(), car.destination());
        }
        self.active_cars -= 1;
        self.reached_destinations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Tile;

    /// A ring road around the edge of a 4x4 map with a destination in the middle.
    fn ring() -> CityMap {
        let mut tiles = vec![];
        for i in 0..3 {
            tiles.push((Cell::new(i, 0), Tile::Road(Direction::Right)));
            tiles.push((Cell::new(3, i), Tile::Road(Direction::Up)));
            tiles.push((Cell::new(3 - i, 3), Tile::Road(Direction::Left)));
            tiles.push((Cell::new(0, 3 - i), Tile::Road(Direction::Down)));
        }
        tiles.push((Cell::new(1, 1), Tile::Destination));
        CityMap::from_tiles(4, 4, tiles)
    }

    #[test]
    fn initial_batch_is_limited_by_the_budget() {
        let sim = Simulation::new(&ring(), 2, SimulationConfig::new(3)).unwrap();
        assert_eq!(sim.metrics().active_cars, 2);
        assert_eq!(sim.remaining_spawns(), 0);
        let positions = sim.iter_cars().map(|car| sim.car_position(car.id())).collect::<Vec<_>>();
        assert_eq!(positions, vec![Some(Cell::new(0, 0)), Some(Cell::new(0, 3))]);
    }

    #[test]
    fn missing_entry_road_is_fatal() {
        let map = CityMap::from_tiles(4, 4, [(Cell::new(0, 0), Tile::Road(Direction::Right))]);
        let err = Simulation::new(&map, 0, SimulationConfig::new(3)).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidEntryPosition(cell) if cell == Cell::new(0, 3)));
    }

    #[test]
    fn zero_spawn_interval_is_rejected() {
        let mut config = SimulationConfig::new(3);
        config.spawn_interval = 0;
        assert!(matches!(
            Simulation::new(&ring(), 0, config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn add_car_checks_the_grid() {
        let mut sim = Simulation::new(&ring(), 0, SimulationConfig::new(3)).unwrap();
        sim.add_car(Cell::new(1, 0), Cell::new(1, 1)).unwrap();
        assert!(matches!(
            sim.add_car(Cell::new(1, 0), Cell::new(1, 1)),
            Err(SimulationError::CellOccupied(_))
        ));
        assert!(matches!(
            sim.add_car(Cell::new(4, 0), Cell::new(1, 1)),
            Err(SimulationError::OutOfBounds(_))
        ));
    }

    #[test]
    fn history_records_every_tick() {
        let mut sim = Simulation::new(&ring(), 0, SimulationConfig::new(3)).unwrap();
        sim.step(3);
        let ticks = sim.history().map(|s| s.tick).collect::<Vec<_>>();
        assert_eq!(ticks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn history_keeps_only_the_latest_samples() {
        let mut config = SimulationConfig::new(3);
        config.history_limit = 3;
        let mut sim = Simulation::new(&ring(), 0, config).unwrap();
        sim.step(10);
        let ticks = sim.history().map(|s| s.tick).collect::<Vec<_>>();
        assert_eq!(ticks, vec![8, 9, 10]);

        let mut config = SimulationConfig::new(3);
        config.history_limit = 0;
        let mut sim = Simulation::new(&ring(), 0, config).unwrap();
        sim.step(10);
        assert_eq!(sim.history().len(), 0);
    }
}
