//! Zone codes on the fixed park grid.
//!
//! The park is divided into a fixed grid of 26 columns (letters `A`-`Z`)
//! by 16 rows (indices `0`-`15`), giving exactly 416 zones. Zones are
//! never created or destroyed at runtime; the grid is the same for every
//! park and every process.
//!
//! A [`ZoneCode`] can only be constructed through validation, so holding
//! one is proof the code lies on the grid. Anything else ("AA3", "B16",
//! lowercase, empty) is rejected at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of columns in the park grid (`A` through `Z`).
pub const GRID_COLUMNS: u8 = 26;

/// Number of rows in the park grid (`0` through `15`).
pub const GRID_ROWS: u8 = 16;

/// Total number of zones on the grid.
pub const ZONE_COUNT: usize = (GRID_COLUMNS as usize) * (GRID_ROWS as usize);

/// Highest valid row index.
const MAX_ROW: u8 = 15;

/// Errors produced when parsing a zone code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneCodeError {
    /// The input was empty.
    #[error("zone code is empty")]
    Empty,

    /// The column character was not an uppercase letter `A`-`Z`.
    #[error("invalid zone column {0:?}: expected A-Z")]
    InvalidColumn(char),

    /// The row part was missing or not a number in `0`-`15`.
    #[error("invalid zone row {0:?}: expected 0-15")]
    InvalidRow(String),
}

/// A validated zone code on the park grid.
///
/// Ordered column-first (`A0 < A15 < B0 < Z15`), which is also the order
/// [`ZoneCode::all`] enumerates the grid in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneCode {
    /// Column letter, always `A`-`Z`.
    column: char,
    /// Row index, always `0`-`15`.
    row: u8,
}

impl ZoneCode {
    /// Build a zone code from a column letter and row index.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneCodeError::InvalidColumn`] or
    /// [`ZoneCodeError::InvalidRow`] when either part is off the grid.
    pub fn new(column: char, row: u8) -> Result<Self, ZoneCodeError> {
        if !column.is_ascii_uppercase() {
            return Err(ZoneCodeError::InvalidColumn(column));
        }
        if row > MAX_ROW {
            return Err(ZoneCodeError::InvalidRow(row.to_string()));
        }
        Ok(Self { column, row })
    }

    /// The column letter (`A`-`Z`).
    pub const fn column(self) -> char {
        self.column
    }

    /// The row index (`0`-`15`).
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Enumerate every zone code on the grid, in order.
    ///
    /// Columns are the outer loop, rows the inner one: the sequence starts
    /// at `A0` and ends at `Z15`, and always has [`ZONE_COUNT`] entries.
    pub fn all() -> Vec<Self> {
        let mut codes = Vec::with_capacity(ZONE_COUNT);
        for column in 'A'..='Z' {
            for row in 0..=MAX_ROW {
                codes.push(Self { column, row });
            }
        }
        codes
    }
}

impl fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for ZoneCode {
    type Err = ZoneCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let column = chars.next().ok_or(ZoneCodeError::Empty)?;
        let row_part = chars.as_str();
        if !column.is_ascii_uppercase() {
            return Err(ZoneCodeError::InvalidColumn(column));
        }
        let row: u8 = row_part
            .parse()
            .map_err(|_| ZoneCodeError::InvalidRow(row_part.to_owned()))?;
        if row > MAX_ROW {
            return Err(ZoneCodeError::InvalidRow(row_part.to_owned()));
        }
        Ok(Self { column, row })
    }
}

impl TryFrom<String> for ZoneCode {
    type Error = ZoneCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ZoneCode> for String {
    fn from(code: ZoneCode) -> Self {
        code.to_string()
    }
}
