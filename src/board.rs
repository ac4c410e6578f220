//! Fixed board geometry: the eleven columns, their lengths, and the two
//! small value types every other module passes around ([`ColumnSet`] and
//! [`ColumnCounts`]).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CantStopError, CsResult};

pub const MIN_COLUMN: u8 = 2;
pub const MAX_COLUMN: u8 = 12;

/// All columns in board order.
pub const COLUMNS: [u8; 11] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Maximum number of runners (active columns) in a single turn.
pub const RUNNER_LIMIT: usize = 3;

/// Owned columns needed to win.
pub const COLUMNS_TO_WIN: usize = 3;

/// Steps from the bottom of a column to its top: 3, 5, 7, ... 13, ... 5, 3.
pub const fn column_length(column: u8) -> u8 {
    let near = if column < 14 - column { column } else { 14 - column };
    2 * near - 1
}

pub fn is_column(n: u8) -> bool {
    (MIN_COLUMN..=MAX_COLUMN).contains(&n)
}

pub fn check_column(n: u8) -> CsResult<u8> {
    if is_column(n) {
        Ok(n)
    } else {
        Err(CantStopError::InvalidColumn(n))
    }
}

/// Sum of every column length (83): the number of steps on the whole board.
pub fn board_steps() -> u32 {
    COLUMNS.iter().map(|&c| column_length(c) as u32).sum()
}

// ---------------------------------------------------------------------------
// ColumnSet
// ---------------------------------------------------------------------------

/// A set of columns stored as a bit mask (bit `n` = column `n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct ColumnSet(u16);

impl ColumnSet {
    pub const fn empty() -> Self {
        ColumnSet(0)
    }

    pub fn all() -> Self {
        COLUMNS.iter().copied().collect()
    }

    pub fn contains(&self, column: u8) -> bool {
        is_column(column) && self.0 & (1 << column) != 0
    }

    /// Returns `false` if the column was already present or is off the board.
    pub fn insert(&mut self, column: u8) -> bool {
        if !is_column(column) || self.contains(column) {
            return false;
        }
        self.0 |= 1 << column;
        true
    }

    pub fn remove(&mut self, column: u8) -> bool {
        if !self.contains(column) {
            return false;
        }
        self.0 &= !(1 << column);
        true
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: ColumnSet) -> ColumnSet {
        ColumnSet(self.0 | other.0)
    }

    pub fn intersection(self, other: ColumnSet) -> ColumnSet {
        ColumnSet(self.0 & other.0)
    }

    pub fn difference(self, other: ColumnSet) -> ColumnSet {
        ColumnSet(self.0 & !other.0)
    }

    pub fn is_subset(&self, other: &ColumnSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        COLUMNS.iter().copied().filter(move |&c| self.contains(c))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }

    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl FromIterator<u8> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = ColumnSet::empty();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl From<ColumnSet> for Vec<u8> {
    fn from(set: ColumnSet) -> Self {
        set.to_vec()
    }
}

impl TryFrom<Vec<u8>> for ColumnSet {
    type Error = CantStopError;

    fn try_from(columns: Vec<u8>) -> CsResult<Self> {
        let mut set = ColumnSet::empty();
        for c in columns {
            set.insert(check_column(c)?);
        }
        Ok(set)
    }
}

impl<const N: usize> From<[u8; N]> for ColumnSet {
    fn from(columns: [u8; N]) -> Self {
        columns.into_iter().collect()
    }
}

impl FromStr for ColumnSet {
    type Err = CantStopError;

    /// Parses `"6,7,8"`, `"{6,7,8}"` or `"6 7 8"`. An empty string is the empty set.
    fn from_str(s: &str) -> CsResult<Self> {
        let body = s.trim().trim_start_matches('{').trim_end_matches('}');
        let mut set = ColumnSet::empty();
        for part in body.split(|c: char| c == ',' || c.is_whitespace()) {
            if part.is_empty() {
                continue;
            }
            let n: u8 = part
                .parse()
                .map_err(|_| CantStopError::InvalidColumnList(s.to_string()))?;
            set.insert(check_column(n)?);
        }
        Ok(set)
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

// ---------------------------------------------------------------------------
// ColumnCounts
// ---------------------------------------------------------------------------

/// Steps recorded per column. Indexed directly by column number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "BTreeMap<u8, u8>", try_from = "BTreeMap<u8, u8>")]
pub struct ColumnCounts([u8; 13]);

impl ColumnCounts {
    pub const fn new() -> Self {
        ColumnCounts([0; 13])
    }

    pub fn get(&self, column: u8) -> u8 {
        if is_column(column) {
            self.0[column as usize]
        } else {
            0
        }
    }

    pub fn set(&mut self, column: u8, steps: u8) {
        if is_column(column) {
            self.0[column as usize] = steps;
        }
    }

    pub fn add(&mut self, column: u8, steps: u8) {
        if is_column(column) {
            self.0[column as usize] = self.0[column as usize].saturating_add(steps);
        }
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|&s| s as u32).sum()
    }

    /// Non-zero entries in column order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        COLUMNS
            .iter()
            .map(move |&c| (c, self.0[c as usize]))
            .filter(|&(_, s)| s > 0)
    }

    /// Columns with a non-zero count.
    pub fn keys(&self) -> ColumnSet {
        self.iter().map(|(c, _)| c).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn clear(&mut self) {
        self.0 = [0; 13];
    }

    /// Fraction of the column's length covered by this count.
    pub fn fraction(&self, column: u8) -> f64 {
        if !is_column(column) {
            return 0.0;
        }
        self.get(column) as f64 / column_length(column) as f64
    }
}

impl From<ColumnCounts> for BTreeMap<u8, u8> {
    fn from(counts: ColumnCounts) -> Self {
        counts.iter().collect()
    }
}

impl TryFrom<BTreeMap<u8, u8>> for ColumnCounts {
    type Error = CantStopError;

    fn try_from(map: BTreeMap<u8, u8>) -> CsResult<Self> {
        let mut counts = ColumnCounts::new();
        for (c, s) in map {
            counts.set(check_column(c)?, s);
        }
        Ok(counts)
    }
}

impl FromIterator<(u8, u8)> for ColumnCounts {
    fn from_iter<I: IntoIterator<Item = (u8, u8)>>(iter: I) -> Self {
        let mut counts = ColumnCounts::new();
        for (c, s) in iter {
            counts.set(c, s);
        }
        counts
    }
}
