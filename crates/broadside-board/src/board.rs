//! Grid, board and shot resolution.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{BoardError, MAX_BOARD_SIZE, Orientation, Ship};

/// One square of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Water,
    Ship,
    Hit,
    Miss,
}

impl Cell {
    /// The character used when rendering.
    pub fn symbol(self) -> char {
        match self {
            Self::Water => '.',
            Self::Ship => 'S',
            Self::Hit => 'X',
            Self::Miss => 'o',
        }
    }

    fn is_revealed(self) -> bool {
        matches!(self, Self::Hit | Self::Miss)
    }
}

/// The result of firing at a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shot {
    /// A ship was there. `sunk` names it if this was its last cell.
    Hit { sunk: Option<String> },
    /// Open water.
    Miss,
    /// The cell was already fired at. Nothing changed.
    AlreadyShot,
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A square grid of cells.
///
/// Used both for a board's true contents and for an attacker's observer
/// view, which only ever holds `Water`, `Hit` and `Miss`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// An all-water grid.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![Cell::Water; size]; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The cell at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Records the outcome of a shot in an observer view.
    ///
    /// `AlreadyShot` and out-of-range coordinates leave the grid unchanged.
    pub fn record(&mut self, row: usize, col: usize, shot: &Shot) {
        let mark = match shot {
            Shot::Hit { .. } => Cell::Hit,
            Shot::Miss => Cell::Miss,
            Shot::AlreadyShot => return,
        };
        if let Some(cell) = self.get_mut(row, col) {
            *cell = mark;
        }
    }

    /// Renders the grid as text: a column-number header, then one line per
    /// row labelled with its letter.
    ///
    /// ```text
    ///    1 2 3
    /// A  . S .
    /// B  X o .
    /// C  . . .
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::from("  ");
        for col in 1..=self.size {
            let _ = write!(out, "{col:>2}");
        }
        out.push('\n');

        for (row, cells) in self.cells.iter().enumerate() {
            let label = char::from(b'A' + (row % 26) as u8);
            let line: Vec<String> =
                cells.iter().map(|c| c.symbol().to_string()).collect();
            let _ = writeln!(out, "{label:<2} {}", line.join(" "));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One player's board: the true contents of every cell plus the ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    grid: Grid,
    ships: Vec<Ship>,
}

impl Board {
    /// An empty board of the given size.
    ///
    /// # Errors
    /// [`BoardError::InvalidSize`] unless `1 <= size <= 26`.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        if size == 0 || size > MAX_BOARD_SIZE {
            return Err(BoardError::InvalidSize(size));
        }
        Ok(Self {
            grid: Grid::new(size),
            ships: Vec::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Number of ships not yet sunk.
    pub fn ships_afloat(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk()).count()
    }

    /// `true` if a ship of `length` fits at `(row, col)`: every cell is on
    /// the board and open water.
    pub fn can_place(
        &self,
        row: usize,
        col: usize,
        length: usize,
        orientation: Orientation,
    ) -> bool {
        length > 0
            && orientation
                .cells(row, col, length)
                .all(|(r, c)| self.grid.get(r, c) == Some(Cell::Water))
    }

    /// Places a ship and returns the cells it covers.
    ///
    /// The caller must have checked [`can_place`](Self::can_place); no
    /// check is made here. Use [`try_place`](Self::try_place) otherwise.
    pub fn place(
        &mut self,
        name: &str,
        row: usize,
        col: usize,
        length: usize,
        orientation: Orientation,
    ) -> BTreeSet<(usize, usize)> {
        let cells: BTreeSet<_> = orientation.cells(row, col, length).collect();
        for &(r, c) in &cells {
            if let Some(cell) = self.grid.get_mut(r, c) {
                *cell = Cell::Ship;
            }
        }
        self.ships.push(Ship {
            name: name.to_string(),
            remaining: cells.clone(),
        });
        cells
    }

    /// Checks the position, then places the ship.
    ///
    /// # Errors
    /// [`BoardError::CannotPlace`] if it would leave the board or overlap.
    pub fn try_place(
        &mut self,
        name: &str,
        row: usize,
        col: usize,
        length: usize,
        orientation: Orientation,
    ) -> Result<BTreeSet<(usize, usize)>, BoardError> {
        if !self.can_place(row, col, length, orientation) {
            return Err(BoardError::CannotPlace {
                name: name.to_string(),
            });
        }
        Ok(self.place(name, row, col, length, orientation))
    }

    /// Fires at `(row, col)`.
    ///
    /// Water becomes `Miss`. A ship cell becomes `Hit` and is removed from
    /// its ship; the result names the ship when that was its last cell.
    /// A cell already hit or missed is reported as `AlreadyShot` and
    /// nothing changes.
    ///
    /// # Errors
    /// [`BoardError::OutOfBounds`] outside the board.
    pub fn fire_at(&mut self, row: usize, col: usize) -> Result<Shot, BoardError> {
        let cell = self
            .grid
            .get_mut(row, col)
            .ok_or(BoardError::OutOfBounds { row, col })?;

        match *cell {
            Cell::Water => {
                *cell = Cell::Miss;
                Ok(Shot::Miss)
            }
            Cell::Ship => {
                *cell = Cell::Hit;
                let mut sunk = None;
                for ship in &mut self.ships {
                    if ship.remaining.remove(&(row, col)) {
                        if ship.is_sunk() {
                            sunk = Some(ship.name.clone());
                        }
                        break;
                    }
                }
                Ok(Shot::Hit { sunk })
            }
            Cell::Hit | Cell::Miss => Ok(Shot::AlreadyShot),
        }
    }

    /// `true` when every ship is sunk.
    ///
    /// A board with no ships counts as sunk; matches never fire at one.
    pub fn all_sunk(&self) -> bool {
        self.ships.iter().all(Ship::is_sunk)
    }

    /// Everything, ships included. What the owner and spectators see.
    pub fn omniscient(&self) -> &Grid {
        &self.grid
    }

    /// Hits and misses only; unhit ships are drawn as water. What the
    /// opponent is allowed to know.
    pub fn redacted(&self) -> Grid {
        let mut view = self.grid.clone();
        for cell in view.cells.iter_mut().flatten() {
            if !cell.is_revealed() {
                *cell = Cell::Water;
            }
        }
        view
    }
}
