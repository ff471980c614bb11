use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Two-dimensional grid of success counts.
///
/// Stored row-major: rows follow the first sweep axis, columns the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessGrid {
    rows: usize,
    cols: usize,
    data: Vec<u64>,
}

impl SuccessGrid {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Create a grid from row-major data. Returns `None` if the length is wrong.
    #[must_use]
    pub fn from_data(rows: usize, cols: usize, data: Vec<u64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u64> {
        self.flat_index(row, col).map(|i| self.data[i])
    }

    /// Add one to a cell. Returns false when the cell is out of range.
    pub fn increment(&mut self, row: usize, col: usize) -> bool {
        match self.flat_index(row, col) {
            Some(i) => {
                self.data[i] += 1;
                true
            }
            None => false,
        }
    }

    /// Add every cell of `other` into this grid
    pub fn fold(&mut self, other: &SuccessGrid) -> Result<(), SweepError> {
        if self.shape() != other.shape() {
            return Err(SweepError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        for (cell, add) in self.data.iter_mut().zip(&other.data) {
            *cell += add;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }

    #[must_use]
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[u64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    fn flat_index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}
