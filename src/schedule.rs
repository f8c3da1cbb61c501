//! Fixed-order activation of signals and cars.

use crate::{CarId, SignalId};

/// A monotonically increasing tick counter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationClock {
    tick: u64,
}

impl SimulationClock {
    /// The number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advances the clock by one tick.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Whether the current tick is a positive multiple of `interval`.
    pub fn is_due(&self, interval: u64) -> bool {
        interval > 0 && self.tick > 0 && self.tick % interval == 0
    }
}

/// Keeps the steppable entities in registration order.
///
/// All signals step before any car, and cars step in the order they were added.
/// The order is never shuffled, so conflicts at shared cells always resolve the same way.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    signals: Vec<SignalId>,
    cars: Vec<CarId>,
}

impl Scheduler {
    /// Registers a signal.
    pub fn add_signal(&mut self, id: SignalId) {
        self.signals.push(id);
    }

    /// Registers a car after all existing cars.
    pub fn add_car(&mut self, id: CarId) {
        self.cars.push(id);
    }

    /// Unregisters a car. Cars behind it keep their relative order.
    pub fn remove_car(&mut self, id: CarId) -> bool {
        match self.cars.iter().position(|c| *c == id) {
            Some(idx) => {
                self.cars.remove(idx);
                true
            }
            None => false,
        }
    }

    /// The registered signals, in activation order.
    pub fn signals(&self) -> &[SignalId] {
        &self.signals
    }

    /// The registered cars, in activation order.
    pub fn cars(&self) -> &[CarId] {
        &self.cars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn car(n: u64) -> CarId {
        CarId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn removal_keeps_registration_order() {
        let mut scheduler = Scheduler::default();
        for n in 1..=4 {
            scheduler.add_car(car(n));
        }
        assert!(scheduler.remove_car(car(2)));
        assert!(!scheduler.remove_car(car(2)));
        scheduler.add_car(car(5));
        assert_eq!(scheduler.cars(), &[car(1), car(3), car(4), car(5)]);
    }

    #[test]
    fn clock_is_due_on_multiples() {
        let mut clock = SimulationClock::default();
        assert!(!clock.is_due(10));
        let due = (0..30).filter(|_| {
            clock.advance();
            clock.is_due(10)
        });
        assert_eq!(due.count(), 3);
    }
}
