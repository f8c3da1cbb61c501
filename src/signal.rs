use crate::entity::{Approach, Entity, Occupant, PlanVerdict, Steppable, Traversable};
use crate::SignalId;

/// A traffic signal which toggles between red and green on a fixed period.
///
/// Signals are independent; there is no coordination between intersections.
#[derive(Clone, Debug)]
pub struct TrafficSignal {
    /// The signal's ID.
    pub(crate) id: SignalId,
    /// The externally visible name.
    name: String,
    /// Whether the signal is currently green.
    green: bool,
    /// The toggle period in ticks.
    period: u64,
}

impl TrafficSignal {
    pub(crate) fn new(id: SignalId, name: String, green: bool, period: u64) -> Self {
        Self {
            id,
            name,
            green,
            period: period.max(1),
        }
    }

    /// Whether the signal is green.
    pub fn is_green(&self) -> bool {
        self.green
    }

    /// The number of ticks between toggles.
    pub fn period(&self) -> u64 {
        self.period
    }
}

/// Signals step with the clock value observed at the start of the tick.
impl Steppable<u64> for TrafficSignal {
    /// Whether the signal toggled.
    type Outcome = bool;

    fn step(&mut self, tick: u64) -> bool {
        if tick % self.period == 0 {
            self.green = !self.green;
            log::debug!(
                "signal {} turned {}",
                self.name,
                if self.green { "green" } else { "red" }
            );
            true
        } else {
            false
        }
    }
}

impl Occupant for TrafficSignal {
    fn entity(&self) -> Entity {
        Entity::Signal(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Traversable for TrafficSignal {
    /// Signal colour is only enforced when a car actually moves.
    fn plan_verdict(&self, _: &Approach) -> PlanVerdict {
        PlanVerdict::Permit
    }

    fn admits_entry(&self, _: &Approach) -> bool {
        self.green
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn toggles_on_multiples_of_its_period() {
        let mut signal = TrafficSignal::new(SignalId::from(KeyData::from_ffi(1)), "tl_0".into(), false, 3);
        let toggles = (0..7).filter(|tick| signal.step(*tick)).count();
        // Ticks 0, 3 and 6
        assert_eq!(toggles, 3);
        assert!(signal.is_green());
    }
}
