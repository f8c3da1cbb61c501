use crate::error::SimulationError;
use crate::map::CityMap;
use crate::simulation::{Metrics, Snapshot};
use crate::{Simulation, SimulationConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shareable handle to a simulation for use by serving layers.
///
/// Every operation takes the same lock, so readers never observe a tick in progress,
/// and a multi-tick advance is never interleaved with another advance.
#[derive(Debug)]
pub struct Engine {
    sim: Mutex<Simulation>,
}

/// The result of advancing an [Engine].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// The number of completed ticks after the advance.
    pub tick_number: u64,
}

impl Engine {
    /// Creates an engine simulating `map` with a budget of `car_count` cars.
    pub fn init(map: &CityMap, car_count: usize, config: SimulationConfig) -> Result<Self, SimulationError> {
        Ok(Self::from(Simulation::new(map, car_count, config)?))
    }

    /// Creates an engine from a map layout and dictionary on disk.
    pub fn load(
        layout: impl AsRef<Path>,
        dictionary: impl AsRef<Path>,
        car_count: usize,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        Ok(Self::from(Simulation::load(layout, dictionary, car_count, config)?))
    }

    /// Advances the simulation by `ticks` whole ticks.
    pub fn step(&self, ticks: u64) -> StepReport {
        let mut sim = self.sim.lock();
        StepReport {
            tick_number: sim.step(ticks),
        }
    }

    /// Advances the simulation by up to `ticks` whole ticks, stopping before the next tick
    /// once `cancel` is set.
    pub fn step_cancellable(&self, ticks: u64, cancel: &AtomicBool) -> StepReport {
        let mut sim = self.sim.lock();
        for _ in 0..ticks {
            if cancel.load(Ordering::Relaxed) {
                log::debug!("advance cancelled at tick {}", sim.tick_count());
                break;
            }
            sim.tick();
        }
        StepReport {
            tick_number: sim.tick_count(),
        }
    }

    /// Captures the position of everything on the grid.
    pub fn snapshot(&self) -> Snapshot {
        self.sim.lock().snapshot()
    }

    /// Gets the current counters.
    pub fn metrics(&self) -> Metrics {
        self.sim.lock().metrics()
    }

    /// Runs a closure with exclusive access to the simulation.
    pub fn with<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> R {
        f(&mut self.sim.lock())
    }
}

impl From<Simulation> for Engine {
    fn from(sim: Simulation) -> Self {
        Self { sim: Mutex::new(sim) }
    }
}
