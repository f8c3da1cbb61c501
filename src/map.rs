//! Loading of city maps from their text layout and JSON dictionary.

use crate::error::MapError;
use crate::grid::{Cell, Direction};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The static content of a single map cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tile {
    Road(Direction),
    Signal { green: bool, period: u64 },
    Obstacle,
    Destination,
}

impl Tile {
    /// The prefix of the names given to entities created from this tile.
    pub(crate) fn name_prefix(&self) -> &'static str {
        match self {
            Tile::Road(_) => "r",
            Tile::Signal { .. } => "tl",
            Tile::Obstacle => "ob",
            Tile::Destination => "d",
        }
    }
}

/// A value in the map dictionary.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum DictValue {
    Text(String),
    Number(u64),
}

/// Maps the characters of a map layout to road directions and signal periods.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct MapDictionary(HashMap<String, DictValue>);

impl MapDictionary {
    /// Parses a dictionary from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(json)?)
    }

    fn lookup(&self, symbol: char) -> Result<&DictValue, MapError> {
        self.0
            .get(&symbol.to_string())
            .ok_or(MapError::MissingSymbol(symbol))
    }

    fn direction(&self, symbol: char) -> Result<Direction, MapError> {
        match self.lookup(symbol)? {
            DictValue::Text(value) => Direction::parse(value).ok_or_else(|| MapError::InvalidDirection {
                symbol,
                value: value.clone(),
            }),
            DictValue::Number(value) => Err(MapError::InvalidDirection {
                symbol,
                value: value.to_string(),
            }),
        }
    }

    fn period(&self, symbol: char) -> Result<u64, MapError> {
        let (period, text) = match self.lookup(symbol)? {
            DictValue::Number(n) => (Some(*n), n.to_string()),
            DictValue::Text(s) => (s.trim().parse().ok(), s.clone()),
        };
        period
            .filter(|p| *p > 0)
            .ok_or(MapError::InvalidPeriod { symbol, value: text })
    }
}

/// A parsed city map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CityMap {
    width: usize,
    height: usize,
    /// Every non-empty cell, ordered by row of the layout then column.
    tiles: Vec<(Cell, Tile)>,
    /// The index `row * width + column` of each tile in the layout, used for naming.
    indices: Vec<usize>,
}

impl CityMap {
    /// Parses a map layout. The first row fixes the width; row 0 is the top of the map.
    pub fn parse(layout: &str, dictionary: &MapDictionary) -> Result<Self, MapError> {
        let mut rows = layout.lines().map(str::trim_end).collect::<Vec<_>>();
        while rows.last().map_or(false, |row| row.is_empty()) {
            rows.pop();
        }
        let width = rows.first().map(|row| row.chars().count()).ok_or(MapError::Empty)?;
        if width == 0 {
            return Err(MapError::Empty);
        }
        let height = rows.len();

        let mut tiles = vec![];
        let mut indices = vec![];
        for (row, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != width {
                return Err(MapError::RowLength { row, len, width });
            }
            let y = (height - row - 1) as i32;
            for (col, symbol) in line.chars().enumerate() {
                let tile = match symbol {
                    'v' | '^' | '>' | '<' => Tile::Road(dictionary.direction(symbol)?),
                    'S' | 's' => Tile::Signal {
                        green: symbol == 's',
                        period: dictionary.period(symbol)?,
                    },
                    '#' => Tile::Obstacle,
                    'D' => Tile::Destination,
                    _ => {
                        log::trace!("ignoring map symbol {:?} at row {}, column {}", symbol, row, col);
                        continue;
                    }
                };
                tiles.push((Cell::new(col as i32, y), tile));
                indices.push(row * width + col);
            }
        }

        Ok(Self {
            width,
            height,
            tiles,
            indices,
        })
    }

    /// Creates a map from explicit tiles.
    /// Tiles outside the map are dropped, and the first tile given for a cell wins.
    pub fn from_tiles(width: usize, height: usize, tiles: impl IntoIterator<Item = (Cell, Tile)>) -> Self {
        let mut tiles = tiles
            .into_iter()
            .filter(|(cell, _)| {
                (0..width as i32).contains(&cell.x) && (0..height as i32).contains(&cell.y)
            })
            .map(|(cell, tile)| {
                let row = height - cell.y as usize - 1;
                (row * width + cell.x as usize, cell, tile)
            })
            .collect::<Vec<_>>();
        tiles.sort_by_key(|(idx, _, _)| *idx);
        tiles.dedup_by_key(|(idx, _, _)| *idx);

        Self {
            width,
            height,
            indices: tiles.iter().map(|(idx, _, _)| *idx).collect(),
            tiles: tiles.into_iter().map(|(_, cell, tile)| (cell, tile)).collect(),
        }
    }

    /// Reads and parses a map layout file and its dictionary file.
    pub fn load(layout: impl AsRef<Path>, dictionary: impl AsRef<Path>) -> Result<Self, MapError> {
        let dictionary = MapDictionary::from_json(&read(dictionary.as_ref())?)?;
        Self::parse(&read(layout.as_ref())?, &dictionary)
    }

    /// The width of the map in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the map in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The non-empty cells of the map.
    pub fn tiles(&self) -> impl Iterator<Item = (Cell, Tile)> + '_ {
        self.tiles.iter().copied()
    }

    /// The non-empty cells with their entity names, e.g. `r_12`.
    pub(crate) fn named_tiles(&self) -> impl Iterator<Item = (Cell, Tile, String)> + '_ {
        self.tiles
            .iter()
            .zip(&self.indices)
            .map(|((cell, tile), idx)| (*cell, *tile, format!("{}_{}", tile.name_prefix(), idx)))
    }

    /// The tile at a cell, if any.
    pub fn tile_at(&self, cell: Cell) -> Option<Tile> {
        self.tiles.iter().find(|(c, _)| *c == cell).map(|(_, tile)| *tile)
    }
}

fn read(path: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })
}
