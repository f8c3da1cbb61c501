use crate::config::SimulationConfig;
use crate::entity::{Approach, Entity, Occupant, Steppable};
use crate::grid::Cell;
use crate::planner::PathPlanner;
use crate::{CarId, World};
use std::collections::VecDeque;

/// A simulated car driving towards its destination.
#[derive(Clone, Debug)]
pub struct Car {
    /// The car's ID.
    pub(crate) id: CarId,
    /// The externally visible name, e.g. `car_3`.
    name: String,
    /// The cell the car is driving to.
    destination: Cell,
    /// The planned route, excluding the car's current cell.
    path: VecDeque<Cell>,
    /// The car's cell at the start of the previous step.
    last_position: Option<Cell>,
    /// The number of consecutive steps the car has not moved.
    stuck_counter: u32,
    /// The state the car was left in by its last step.
    state: CarState,
}

/// The lifecycle of a car.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CarState {
    /// The car has no route.
    NoPath,
    /// The car has a route but has not tried to follow it yet.
    HasPath,
    /// The next cell on the route could not be entered.
    Blocked,
    /// The car moved along its route.
    Moving,
    /// The car reached its destination and has left the simulation.
    Arrived,
}

/// What happened during one step of a car.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CarStep {
    /// The car moved one cell along its route.
    Moved,
    /// The car moved sideways into an adjacent lane, and possibly onwards.
    SwitchedLane,
    /// The car could not move.
    Blocked,
    /// The car has no route and waited.
    Idle,
    /// The car was stuck for too long and planned a new route instead of moving.
    Replanned,
    /// The car reached its destination.
    Arrived,
}

/// Everything a car may look at or change while stepping.
pub struct CarContext<'a> {
    pub world: &'a mut World,
    pub config: &'a SimulationConfig,
}

impl Car {
    /// Creates a new car with no route.
    pub(crate) fn new(id: CarId, name: String, destination: Cell) -> Self {
        Self {
            id,
            name,
            destination,
            path: VecDeque::new(),
            last_position: None,
            stuck_counter: 0,
            state: CarState::NoPath,
        }
    }

    /// Gets the car's ID.
    pub fn id(&self) -> CarId {
        self.id
    }

    /// The cell the car is driving to.
    pub fn destination(&self) -> Cell {
        self.destination
    }

    /// The remaining route, excluding the car's current cell.
    pub fn path(&self) -> impl Iterator<Item = Cell> + '_ {
        self.path.iter().copied()
    }

    /// The number of consecutive steps the car has not moved.
    pub fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }

    /// The state the car was left in by its last step.
    pub fn state(&self) -> CarState {
        self.state
    }

    /// Plans a new route from `from`, discarding the old one.
    fn replan(&mut self, world: &World, config: &SimulationConfig, from: Cell) {
        let planner = PathPlanner::new(world, config.occupied_cells, config.open_set);
        self.path = planner.find_path(from, self.destination).into();
        self.state = if self.path.is_empty() {
            CarState::NoPath
        } else {
            CarState::HasPath
        };
    }

    /// Tries to move sideways into an adjacent lane flowing the same way.
    /// Returns the new cell if the car switched.
    fn switch_lanes(&mut self, world: &mut World, config: &SimulationConfig, from: Cell) -> Option<Cell> {
        let direction = world.road_direction_at(from)?;
        let lane = config
            .lane_order
            .offsets()
            .into_iter()
            .map(|offset| match direction.is_vertical() {
                true => Cell::new(from.x + offset, from.y),
                false => Cell::new(from.x, from.y + offset),
            })
            .find(|lane| {
                let approach = Approach {
                    from,
                    to: *lane,
                    goal: self.destination,
                };
                world.admits_lane_switch(&approach, direction)
            })?;

        log::debug!("{} switching lanes from {} to {}", self.name, from, lane);
        world.grid.move_to(self.entity(), lane);
        // The old route started from the old lane
        self.replan(world, config, lane);
        Some(lane)
    }

    fn arrive(&mut self) -> CarStep {
        self.path.clear();
        self.state = CarState::Arrived;
        CarStep::Arrived
    }
}

impl<'a> Steppable<CarContext<'a>> for Car {
    type Outcome = CarStep;

    fn step(&mut self, ctx: CarContext<'a>) -> CarStep {
        let CarContext { world, config } = ctx;
        let Some(mut pos) = world.location_of(self.entity()) else {
            return CarStep::Idle;
        };

        // Stuck detection
        if self.last_position == Some(pos) {
            self.stuck_counter += 1;
        } else {
            self.stuck_counter = 0;
        }
        self.last_position = Some(pos);
        if self.stuck_counter > config.stuck_threshold {
            log::debug!("{} stuck for {} steps, replanning", self.name, self.stuck_counter);
            self.replan(world, config, pos);
            self.stuck_counter = 0;
            return CarStep::Replanned;
        }

        if self.path.is_empty() {
            if pos == self.destination {
                return self.arrive();
            }
            self.replan(world, config, pos);
            if self.path.is_empty() {
                return CarStep::Idle;
            }
        }

        // Try to get around a car standing in the way
        let mut switched = false;
        if self.path.front().map_or(false, |next| world.has_car(*next)) {
            match self.switch_lanes(world, config, pos) {
                Some(lane) => {
                    pos = lane;
                    switched = true;
                }
                None => {
                    log::trace!("{} waiting behind another car at {}", self.name, pos);
                    self.state = CarState::Blocked;
                    return CarStep::Blocked;
                }
            }
        }

        let mut moved = false;
        if let Some(next) = self.path.front().copied() {
            let approach = Approach {
                from: pos,
                to: next,
                goal: self.destination,
            };
            if approach.heading().is_some() && world.admits_entry(&approach) {
                world.grid.move_to(self.entity(), next);
                self.path.pop_front();
                self.stuck_counter = 0;
                self.state = CarState::Moving;
                pos = next;
                moved = true;
            } else {
                log::trace!("{} blocked entering {}", self.name, next);
                self.state = CarState::Blocked;
            }
        }

        if self.path.is_empty() {
            if pos == self.destination {
                return self.arrive();
            }
            // The route ran out somewhere else, so it was stale
            self.replan(world, config, pos);
        }

        match (switched, moved) {
            (true, _) => CarStep::SwitchedLane,
            (false, true) => CarStep::Moved,
            (false, false) => CarStep::Blocked,
        }
    }
}

impl Occupant for Car {
    fn entity(&self) -> Entity {
        Entity::Car(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
