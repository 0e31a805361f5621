//! Structural sparsity of Jacobian and Hessian matrices.

use nalgebra::{DMatrix, RealField};
use num_traits::Zero;

/// Set of structurally nonzero entries of a matrix.
///
/// The coordinates are stored as two parallel arrays, `rows()[i]` and
/// `cols()[i]` together identify one nonzero entry. The order of entries is
/// not guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparsityPattern {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl SparsityPattern {
    /// Creates an empty pattern, i.e., a matrix that is structurally zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the pattern of a fully dense matrix of given shape.
    pub fn dense(nrows: usize, ncols: usize) -> Self {
        let mut pattern = Self::with_capacity(nrows * ncols);
        for col in 0..ncols {
            for row in 0..nrows {
                pattern.push(row, col);
            }
        }
        pattern
    }

    /// Creates the pattern of a square diagonal matrix.
    pub fn diagonal(dim: usize) -> Self {
        (0..dim).map(|i| (i, i)).collect()
    }

    /// Creates an empty pattern with preallocated space for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
        }
    }

    /// Collects the coordinates of all entries of `matrix` that are not
    /// exactly zero.
    pub fn from_nonzeros<S: RealField + Copy>(matrix: &DMatrix<S>) -> Self {
        let mut pattern = Self::new();
        for ((row, col), value) in (0..matrix.ncols())
            .flat_map(|col| (0..matrix.nrows()).map(move |row| (row, col)))
            .zip(matrix.iter())
        {
            if !value.is_zero() {
                pattern.push(row, col);
            }
        }
        pattern
    }

    /// Adds a nonzero entry.
    pub fn push(&mut self, row: usize, col: usize) {
        self.rows.push(row);
        self.cols.push(col);
    }

    /// Row indices of the nonzero entries.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column indices of the nonzero entries.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Number of nonzero entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Determines whether the pattern has no nonzero entries.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Determines whether the entry at given coordinates is structurally
    /// nonzero.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.iter().any(|entry| entry == (row, col))
    }

    /// Iterates over the `(row, col)` coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// Splits the pattern into the parallel row and column arrays.
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.rows, self.cols)
    }
}

impl FromIterator<(usize, usize)> for SparsityPattern {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        let mut pattern = Self::new();
        for (row, col) in iter {
            pattern.push(row, col);
        }
        pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dmatrix;

    #[test]
    fn nonzeros_of_block_matrix() {
        let m = dmatrix![
            1.0, 0.0, 0.0;
            0.0, 0.0, -2.0
        ];
        let pattern = SparsityPattern::from_nonzeros(&m);

        assert_eq!(pattern.len(), 2);
        assert!(pattern.contains(0, 0));
        assert!(pattern.contains(1, 2));
        assert!(!pattern.contains(1, 1));
    }

    #[test]
    fn dense_enumerates_every_entry() {
        let pattern = SparsityPattern::dense(2, 3);
        assert_eq!(pattern.len(), 6);
        for row in 0..2 {
            for col in 0..3 {
                assert!(pattern.contains(row, col));
            }
        }
    }

    #[test]
    fn parts_are_parallel() {
        let (rows, cols) = SparsityPattern::diagonal(3).into_parts();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(cols, vec![0, 1, 2]);
    }
}
