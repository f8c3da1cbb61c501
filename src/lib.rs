pub use car::{Car, CarContext, CarState, CarStep};
pub use config::{LaneOrder, OccupiedCellPolicy, OpenSetPolicy, SimulationConfig};
pub use engine::{Engine, StepReport};
pub use entity::{
    Approach, DestinationZone, Entity, Obstacle, Occupant, PlanVerdict, Road, Steppable, Traversable,
};
pub use error::{MapError, SimulationError};
pub use grid::{Cell, Direction, SpatialGrid};
pub use map::{CityMap, MapDictionary, Tile};
pub use planner::PathPlanner;
pub use schedule::{Scheduler, SimulationClock};
pub use signal::TrafficSignal;
pub use simulation::{
    Metrics, MetricsSample, Placement, RoadPlacement, SignalPlacement, Simulation, Snapshot,
};
pub use slotmap::{Key, KeyData};
pub use world::World;

mod car;
mod config;
pub mod debug;
mod engine;
mod entity;
mod error;
mod grid;
mod map;
mod planner;
mod schedule;
mod signal;
mod simulation;
mod world;

slotmap::new_key_type! {
    /// Unique ID of a [Road].
    pub struct RoadId;
    /// Unique ID of a [TrafficSignal].
    pub struct SignalId;
    /// Unique ID of an [Obstacle].
    pub struct ObstacleId;
    /// Unique ID of a [DestinationZone].
    pub struct DestinationId;
    /// Unique ID of a [Car].
    pub struct CarId;
}

type CarSet = slotmap::SlotMap<CarId, Car>;
