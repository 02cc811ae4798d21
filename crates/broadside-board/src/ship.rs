//! Ship classes, the standard fleet, and placed ships.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::InputError;

/// Width and height of the standard board.
pub const BOARD_SIZE: usize = 10;

/// Largest supported board: one letter per row, `A` to `Z`.
pub const MAX_BOARD_SIZE: usize = 26;

/// The standard fleet, placed in this order.
pub const FLEET: [ShipClass; 5] = [
    ShipClass::new("Carrier", 5),
    ShipClass::new("Battleship", 4),
    ShipClass::new("Cruiser", 3),
    ShipClass::new("Submarine", 3),
    ShipClass::new("Destroyer", 2),
];

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Extends to the right (increasing column).
    Horizontal,
    /// Extends downwards (increasing row).
    Vertical,
}

impl Orientation {
    /// The cells covered by a ship of `length` starting at `(row, col)`.
    pub fn cells(
        self,
        row: usize,
        col: usize,
        length: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        (0..length).map(move |i| match self {
            Self::Horizontal => (row, col + i),
            Self::Vertical => (row + i, col),
        })
    }
}

impl FromStr for Orientation {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "HORIZONTAL" => Ok(Self::Horizontal),
            "V" | "VERTICAL" => Ok(Self::Vertical),
            "" => Err(InputError::Empty),
            _ => Err(InputError::InvalidOrientation(s.trim().to_string())),
        }
    }
}

/// Type of ship: name and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipClass {
    name: &'static str,
    length: usize,
}

impl ShipClass {
    /// Create a new ship class.
    pub const fn new(name: &'static str, length: usize) -> Self {
        Self { name, length }
    }

    /// Ship's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ship's length.
    pub fn length(&self) -> usize {
        self.length
    }
}

impl fmt::Display for ShipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (size {})", self.name, self.length)
    }
}

/// A ship on a board and the cells of it not yet hit.
///
/// Sunk exactly when `remaining` is empty. Cells are only ever removed,
/// so a sunk ship stays sunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
    pub remaining: BTreeSet<(usize, usize)>,
}

impl Ship {
    pub fn is_sunk(&self) -> bool {
        self.remaining.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_str_accepts_letters_and_words() {
        assert_eq!("H".parse::<Orientation>(), Ok(Orientation::Horizontal));
        assert_eq!(" v ".parse::<Orientation>(), Ok(Orientation::Vertical));
        assert_eq!(
            "horizontal".parse::<Orientation>(),
            Ok(Orientation::Horizontal)
        );
    }

    #[test]
    fn test_orientation_from_str_rejects_other_input() {
        assert_eq!(
            "diagonal".parse::<Orientation>(),
            Err(InputError::InvalidOrientation("diagonal".into()))
        );
        assert_eq!("  ".parse::<Orientation>(), Err(InputError::Empty));
    }

    #[test]
    fn test_orientation_cells_extend_right_or_down() {
        let h: Vec<_> = Orientation::Horizontal.cells(2, 3, 3).collect();
        let v: Vec<_> = Orientation::Vertical.cells(2, 3, 3).collect();
        assert_eq!(h, vec![(2, 3), (2, 4), (2, 5)]);
        assert_eq!(v, vec![(2, 3), (3, 3), (4, 3)]);
    }

    #[test]
    fn test_fleet_totals_seventeen_cells() {
        let total: usize = FLEET.iter().map(ShipClass::length).sum();
        assert_eq!(total, 17);
        assert_eq!(FLEET[0].to_string(), "Carrier (size 5)");
    }
}
