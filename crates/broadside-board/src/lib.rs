//! Board model for Broadside.
//!
//! Pure, synchronous game data: no I/O, no clocks. A match owns two
//! [`Board`]s (one per player) and two observer [`Grid`]s (what each
//! attacker has learned about the other's board).
//!
//! ```text
//!   A . . S S S . .      omniscient view: ships visible
//!   B . o X . . . .      redacted view:   ships drawn as water
//! ```

mod board;
mod coord;
mod error;
mod ship;

pub use board::{Board, Cell, Grid, Shot};
pub use coord::{format_coordinate, parse_coordinate};
pub use error::{BoardError, InputError};
pub use ship::{BOARD_SIZE, FLEET, MAX_BOARD_SIZE, Orientation, Ship, ShipClass};
