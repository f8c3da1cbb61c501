//! The entities which occupy the grid, and the capabilities they share.

use crate::grid::{Cell, Direction};
use crate::{CarId, DestinationId, ObstacleId, RoadId, SignalId};

/// A reference to anything that can occupy a grid cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    Road(RoadId),
    Signal(SignalId),
    Obstacle(ObstacleId),
    Destination(DestinationId),
    Car(CarId),
}

impl Entity {
    /// Whether this entity is a car.
    pub fn is_car(&self) -> bool {
        matches!(self, Entity::Car(_))
    }
}

/// An entity with an identity on the grid.
pub trait Occupant {
    /// The grid handle of this entity.
    fn entity(&self) -> Entity;

    /// The externally visible name of this entity, e.g. `r_12` or `car_3`.
    fn name(&self) -> &str;
}

/// An entity which advances once per tick.
pub trait Steppable<Ctx> {
    /// What one step reports back to the scheduler.
    type Outcome;

    /// Advances the entity by one tick.
    fn step(&mut self, ctx: Ctx) -> Self::Outcome;
}

/// A car's attempted move from one cell into an adjacent one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Approach {
    /// The cell the car moves from.
    pub from: Cell,
    /// The cell the car moves into.
    pub to: Cell,
    /// The car's destination.
    pub goal: Cell,
}

impl Approach {
    /// The heading of the move, if the cells are adjacent.
    pub fn heading(&self) -> Option<Direction> {
        Direction::between(self.from, self.to)
    }

    /// Whether the target cell is the car's own destination.
    pub fn is_own_goal(&self) -> bool {
        self.to == self.goal
    }
}

/// How an entity affects a planned path through its cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlanVerdict {
    /// The cell must not be used.
    Reject,
    /// The entity makes the cell usable.
    Permit,
}

/// An entity which gates movement into its cell.
///
/// Planning is more relaxed than entry: a planned path may cross a red
/// signal, but a car may only enter when the signal is green.
pub trait Traversable {
    /// The verdict for a path planned through this entity's cell.
    fn plan_verdict(&self, approach: &Approach) -> PlanVerdict;

    /// Whether a car may enter this entity's cell right now.
    fn admits_entry(&self, approach: &Approach) -> bool;
}

/// A one-way road segment.
#[derive(Clone, Debug)]
pub struct Road {
    pub(crate) id: RoadId,
    name: String,
    direction: Direction,
}

impl Road {
    pub(crate) fn new(id: RoadId, name: String, direction: Direction) -> Self {
        Self { id, name, direction }
    }

    /// The direction traffic flows along this road.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Occupant for Road {
    fn entity(&self) -> Entity {
        Entity::Road(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Traversable for Road {
    fn plan_verdict(&self, approach: &Approach) -> PlanVerdict {
        // Never drive onto a road flowing straight back at us
        match approach.heading() {
            Some(heading) if heading.opposite() == self.direction => PlanVerdict::Reject,
            _ => PlanVerdict::Permit,
        }
    }

    fn admits_entry(&self, _: &Approach) -> bool {
        true
    }
}

/// An impassable obstacle.
#[derive(Clone, Debug)]
pub struct Obstacle {
    pub(crate) id: ObstacleId,
    name: String,
}

impl Obstacle {
    pub(crate) fn new(id: ObstacleId, name: String) -> Self {
        Self { id, name }
    }
}

impl Occupant for Obstacle {
    fn entity(&self) -> Entity {
        Entity::Obstacle(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Traversable for Obstacle {
    fn plan_verdict(&self, _: &Approach) -> PlanVerdict {
        PlanVerdict::Reject
    }

    fn admits_entry(&self, _: &Approach) -> bool {
        false
    }
}

/// A cell cars may be sent to. Only cars heading here may pass through it.
#[derive(Clone, Debug)]
pub struct DestinationZone {
    pub(crate) id: DestinationId,
    name: String,
}

impl DestinationZone {
    pub(crate) fn new(id: DestinationId, name: String) -> Self {
        Self { id, name }
    }
}

impl Occupant for DestinationZone {
    fn entity(&self) -> Entity {
        Entity::Destination(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Traversable for DestinationZone {
    fn plan_verdict(&self, approach: &Approach) -> PlanVerdict {
        if approach.is_own_goal() {
            PlanVerdict::Permit
        } else {
            PlanVerdict::Reject
        }
    }

    fn admits_entry(&self, approach: &Approach) -> bool {
        approach.is_own_goal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn approach(to: (i32, i32), goal: (i32, i32)) -> Approach {
        Approach {
            from: Cell::new(1, 1),
            to: to.into(),
            goal: goal.into(),
        }
    }

    #[test]
    fn road_rejects_wrong_way_entry() {
        let road = Road::new(RoadId::from(KeyData::from_ffi(1)), "r_0".into(), Direction::Left);
        // Moving right into a road flowing left
        assert_eq!(road.plan_verdict(&approach((2, 1), (5, 5))), PlanVerdict::Reject);
        // Moving up into a road flowing left is a turn, not wrong-way travel
        assert_eq!(road.plan_verdict(&approach((1, 2), (5, 5))), PlanVerdict::Permit);
        assert!(road.admits_entry(&approach((2, 1), (5, 5))));
    }

    #[test]
    fn destination_only_admits_its_own_cars() {
        let dst = DestinationZone::new(DestinationId::from(KeyData::from_ffi(1)), "d_0".into());
        assert_eq!(dst.plan_verdict(&approach((2, 1), (2, 1))), PlanVerdict::Permit);
        assert_eq!(dst.plan_verdict(&approach((2, 1), (0, 0))), PlanVerdict::Reject);
        assert!(!dst.admits_entry(&approach((2, 1), (0, 0))));
    }
}
