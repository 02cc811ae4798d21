//! Coordinates as players type them: a row letter and a 1-based column.

use crate::InputError;

/// Parses `"B5"` into zero-based `(row, col)`, here `(1, 4)`.
///
/// Case-insensitive, surrounding whitespace ignored. Anything that is not
/// a letter followed by a column number on a `size`×`size` board is an
/// [`InputError::InvalidCoordinate`].
pub fn parse_coordinate(text: &str, size: usize) -> Result<(usize, usize), InputError> {
    let text = text.trim();
    let invalid = || InputError::InvalidCoordinate(text.to_string());

    let mut chars = text.chars();
    let letter = chars.next().ok_or(InputError::Empty)?;
    if !letter.is_ascii_alphabetic() {
        return Err(invalid());
    }
    let row = (letter.to_ascii_uppercase() as u8 - b'A') as usize;

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let col = digits
        .parse::<usize>()
        .ok()
        .and_then(|c| c.checked_sub(1))
        .ok_or_else(invalid)?;

    if row >= size || col >= size {
        return Err(invalid());
    }
    Ok((row, col))
}

/// Formats zero-based `(row, col)` the way players type it.
pub fn format_coordinate(row: usize, col: usize) -> String {
    let letter = char::from(b'A' + (row % 26) as u8);
    format!("{letter}{}", col + 1)
}
