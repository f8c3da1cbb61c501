use crate::config::OccupiedCellPolicy;
use crate::entity::{Approach, DestinationZone, Entity, Obstacle, PlanVerdict, Road, Traversable};
use crate::grid::{Cell, Direction, SpatialGrid};
use crate::map::{CityMap, Tile};
use crate::signal::TrafficSignal;
use crate::{CarId, DestinationId, ObstacleId, RoadId, SignalId};
use slotmap::SlotMap;

/// The grid together with the static entities loaded from the map.
///
/// Static entities are never removed, so iterating any of the arenas
/// visits entities in map order.
#[derive(Clone, Debug)]
pub struct World {
    pub(crate) grid: SpatialGrid,
    pub(crate) roads: SlotMap<RoadId, Road>,
    pub(crate) signals: SlotMap<SignalId, TrafficSignal>,
    pub(crate) obstacles: SlotMap<ObstacleId, Obstacle>,
    pub(crate) destinations: SlotMap<DestinationId, DestinationZone>,
}

impl World {
    /// Creates the world described by a map.
    pub fn from_map(map: &CityMap) -> Self {
        let mut world = Self {
            grid: SpatialGrid::new(map.width(), map.height()),
            roads: SlotMap::with_key(),
            signals: SlotMap::with_key(),
            obstacles: SlotMap::with_key(),
            destinations: SlotMap::with_key(),
        };
        for (cell, tile, name) in map.named_tiles() {
            let entity = match tile {
                Tile::Road(dir) => Entity::Road(world.roads.insert_with_key(|id| Road::new(id, name, dir))),
                Tile::Signal { green, period } => Entity::Signal(
                    world
                        .signals
                        .insert_with_key(|id| TrafficSignal::new(id, name, green, period)),
                ),
                Tile::Obstacle => {
                    Entity::Obstacle(world.obstacles.insert_with_key(|id| Obstacle::new(id, name)))
                }
                Tile::Destination => Entity::Destination(
                    world
                        .destinations
                        .insert_with_key(|id| DestinationZone::new(id, name)),
                ),
            };
            world.grid.place(entity, cell);
        }
        world
    }

    /// The occupancy grid.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Returns an iterator over all the roads.
    pub fn iter_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    /// Returns an iterator over all the traffic signals.
    pub fn iter_signals(&self) -> impl Iterator<Item = &TrafficSignal> {
        self.signals.values()
    }

    /// Returns an iterator over all the obstacles.
    pub fn iter_obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    /// Returns an iterator over all the destination zones.
    pub fn iter_destinations(&self) -> impl Iterator<Item = &DestinationZone> {
        self.destinations.values()
    }

    /// The cell of an entity, if it is on the grid.
    pub fn location_of(&self, entity: Entity) -> Option<Cell> {
        self.grid.location_of(entity)
    }

    /// The direction of the road at a cell, if there is one.
    pub fn road_direction_at(&self, cell: Cell) -> Option<Direction> {
        self.grid.occupants_of(cell).iter().find_map(|entity| match entity {
            Entity::Road(id) => Some(self.roads[*id].direction()),
            _ => None,
        })
    }

    /// The signal at a cell, if there is one.
    pub fn signal_at(&self, cell: Cell) -> Option<&TrafficSignal> {
        self.grid.occupants_of(cell).iter().find_map(|entity| match entity {
            Entity::Signal(id) => Some(&self.signals[*id]),
            _ => None,
        })
    }

    /// The car at a cell, if there is one.
    pub fn car_at(&self, cell: Cell) -> Option<CarId> {
        self.grid.occupants_of(cell).iter().find_map(|entity| match entity {
            Entity::Car(id) => Some(*id),
            _ => None,
        })
    }

    /// Whether a car occupies the cell.
    pub fn has_car(&self, cell: Cell) -> bool {
        self.car_at(cell).is_some()
    }

    /// Whether a cell holds a destination zone.
    pub fn is_destination(&self, cell: Cell) -> bool {
        self.grid
            .occupants_of(cell)
            .iter()
            .any(|entity| matches!(entity, Entity::Destination(_)))
    }

    /// Resolves a static entity to its movement rules. Cars have none.
    fn traversable(&self, entity: Entity) -> Option<&dyn Traversable> {
        match entity {
            Entity::Road(id) => Some(&self.roads[id]),
            Entity::Signal(id) => Some(&self.signals[id]),
            Entity::Obstacle(id) => Some(&self.obstacles[id]),
            Entity::Destination(id) => Some(&self.destinations[id]),
            Entity::Car(_) => None,
        }
    }

    /// The cost of a planned step, or `None` if the step may not be planned.
    pub(crate) fn plan_cost(&self, approach: &Approach, occupied: OccupiedCellPolicy) -> Option<u32> {
        let mut permitted = false;
        let mut has_car = false;
        for entity in self.grid.occupants_of(approach.to) {
            match self.traversable(*entity).map(|t| t.plan_verdict(approach)) {
                Some(PlanVerdict::Reject) => return None,
                Some(PlanVerdict::Permit) => permitted = true,
                None => has_car = true,
            }
        }
        if !permitted {
            return None;
        }
        match (has_car, occupied) {
            (false, _) => Some(1),
            (true, OccupiedCellPolicy::Penalize(penalty)) => Some(penalty.saturating_add(1)),
            (true, OccupiedCellPolicy::Block) => None,
        }
    }

    /// Whether a car may move into the target cell right now.
    pub(crate) fn admits_entry(&self, approach: &Approach) -> bool {
        self.grid.in_bounds(approach.to)
            && self.grid.occupants_of(approach.to).iter().all(|entity| {
                self.traversable(*entity)
                    .map_or(false, |t| t.admits_entry(approach))
            })
    }

    /// Whether a car on a road heading `direction` may switch sideways into the target cell.
    pub(crate) fn admits_lane_switch(&self, approach: &Approach, direction: Direction) -> bool {
        self.admits_entry(approach) && self.road_direction_at(approach.to) == Some(direction)
    }
}
