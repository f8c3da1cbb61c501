//! Tunable parameters of a simulation.

use crate::error::SimulationError;
use crate::grid::Cell;
use serde::{Deserialize, Serialize};

/// How the planner treats a cell currently occupied by another car.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupiedCellPolicy {
    /// The cell may be used at an extra cost.
    Penalize(u32),
    /// The cell may not be used at all.
    Block,
}

impl Default for OccupiedCellPolicy {
    fn default() -> Self {
        Self::Penalize(5)
    }
}

/// How the planner handles a cell which already has an entry in the open set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSetPolicy {
    /// Only add a new entry when every open entry for the cell is strictly more expensive.
    /// Entries are never replaced or re-opened.
    #[default]
    KeepExisting,
    /// Use a textbook A* search.
    Exact,
}

/// The order in which the two lateral lanes are tried when switching lanes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneOrder {
    /// Try `+1` on the perpendicular axis first, then `-1`.
    #[default]
    PositiveFirst,
    /// Try `-1` first, then `+1`.
    NegativeFirst,
}

impl LaneOrder {
    /// The perpendicular offsets in evaluation order.
    pub fn offsets(self) -> [i32; 2] {
        match self {
            Self::PositiveFirst => [1, -1],
            Self::NegativeFirst => [-1, 1],
        }
    }
}

/// The parameters of a simulation.
///
/// `stuck_threshold` has no default and must always be given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// A car which has not moved for more than this many ticks replans its route.
    pub stuck_threshold: u32,
    /// New cars are spawned every this many ticks.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: u64,
    /// The maximum number of cars spawned at once.
    #[serde(default = "default_spawn_batch")]
    pub spawn_batch: usize,
    /// Whether a batch is spawned when the simulation is created.
    #[serde(default = "default_true")]
    pub spawn_on_start: bool,
    /// The cells where cars enter the map. Defaults to the four corners.
    #[serde(default)]
    pub entry_cells: Option<Vec<Cell>>,
    #[serde(default)]
    pub occupied_cells: OccupiedCellPolicy,
    #[serde(default)]
    pub open_set: OpenSetPolicy,
    #[serde(default)]
    pub lane_order: LaneOrder,
    /// Seed for destination assignment.
    #[serde(default)]
    pub seed: u64,
    /// The number of most recent metrics samples kept. Zero keeps none.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_spawn_interval() -> u64 {
    10
}

fn default_spawn_batch() -> usize {
    4
}

fn default_history_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl SimulationConfig {
    /// Creates a configuration with the given stuck threshold and defaults for everything else.
    pub fn new(stuck_threshold: u32) -> Self {
        Self {
            stuck_threshold,
            spawn_interval: default_spawn_interval(),
            spawn_batch: default_spawn_batch(),
            spawn_on_start: true,
            entry_cells: None,
            occupied_cells: OccupiedCellPolicy::default(),
            open_set: OpenSetPolicy::default(),
            lane_order: LaneOrder::default(),
            seed: 0,
            history_limit: default_history_limit(),
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The entry cells for a grid of the given size.
    pub fn entry_cells_for(&self, width: usize, height: usize) -> Vec<Cell> {
        match &self.entry_cells {
            Some(cells) => cells.clone(),
            None => {
                let (w, h) = (width as i32, height as i32);
                vec![
                    Cell::new(0, 0),
                    Cell::new(0, h - 1),
                    Cell::new(w - 1, 0),
                    Cell::new(w - 1, h - 1),
                ]
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if self.spawn_interval == 0 {
            return Err(SimulationError::InvalidConfig("spawn_interval must be positive"));
        }
        Ok(())
    }
}
