//! The lock reliability matrix produced by a sweep.

use crate::range::POSITIONS;

/// Lock ratio per (EQ position, strobe position), both `0..=14`.
///
/// Cells that were not swept hold 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct LockGrid {
    cells: [[f64; POSITIONS]; POSITIONS],
}

impl LockGrid {
    pub fn new() -> Self {
        Self {
            cells: [[0.0; POSITIONS]; POSITIONS],
        }
    }

    /// Builds a grid from explicit rows, mainly for evaluation.
    pub fn from_rows(cells: [[f64; POSITIONS]; POSITIONS]) -> Self {
        Self { cells }
    }

    pub fn get(&self, eq: usize, strobe: usize) -> f64 {
        self.cells[eq][strobe]
    }

    pub fn set(&mut self, eq: usize, strobe: usize, ratio: f64) {
        self.cells[eq][strobe] = ratio;
    }

    pub fn row(&self, eq: usize) -> &[f64; POSITIONS] {
        &self.cells[eq]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64; POSITIONS]> {
        self.cells.iter()
    }
}

impl Default for LockGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock ratio as stored in the grid, rounded to two decimals.
pub fn lock_ratio(locked: u32, runs: u32) -> f64 {
    round_to(locked as f64 / runs as f64, 2)
}

/// Value shown for a cell in the lock table.
///
/// Only a perfect lock shows 1.0 and only no lock at all shows 0.0: values
/// above 0.9 are pulled down to at most 0.9 and values below 0.05 pushed up
/// to at least 0.1.
pub fn display_ratio(ratio: f64) -> f64 {
    if ratio == 1.0 {
        1.0
    } else if ratio > 0.9 {
        round_to(ratio - 0.05, 1)
    } else if ratio > 0.0 && ratio < 0.05 {
        round_to(ratio + 0.05, 1)
    } else {
        round_to(ratio, 1)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
