use crate::grid::Cell;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a map or its dictionary.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed map dictionary: {0}")]
    Dictionary(#[from] serde_json::Error),
    #[error("map contains no rows")]
    Empty,
    #[error("row {row} has length {len}, expected width {width}")]
    RowLength { row: usize, len: usize, width: usize },
    #[error("map symbol '{0}' is missing from the dictionary")]
    MissingSymbol(char),
    #[error("map symbol '{symbol}' has invalid direction {value:?}")]
    InvalidDirection { symbol: char, value: String },
    #[error("map symbol '{symbol}' has invalid signal period {value:?}")]
    InvalidPeriod { symbol: char, value: String },
}

/// Errors raised while constructing or driving a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("entry cell {0} does not contain a road")]
    InvalidEntryPosition(Cell),
    #[error("cell {0} is outside the grid")]
    OutOfBounds(Cell),
    #[error("cell {0} is already occupied by a car")]
    CellOccupied(Cell),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
