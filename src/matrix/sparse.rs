//! Compressed sparse matrix with row and column access.
//!
//! Storage is CSR with a CSC twin so both user rows and item columns are
//! contiguous slices. Only nonzero entries are stored; indices within a row
//! (or column) are strictly ascending, which the merge-join dot product
//! relies on.

use serde::{Deserialize, Serialize};

/// Borrowed view of one row or column
#[derive(Debug, Clone, Copy)]
pub struct SparseVec<'a> {
    pub indices: &'a [u32],
    pub values: &'a [f64],
}

impl<'a> SparseVec<'a> {
    pub fn empty() -> Self {
        Self {
            indices: &[],
            values: &[],
        }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| (i as usize, v))
    }

    /// Value at `index`, zero when absent
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&(index as u32)) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean over stored entries only; zero for an empty vector
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum() / self.values.len() as f64
        }
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product by merge-join over the sorted indices
    pub fn dot(&self, other: &SparseVec<'_>) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Dot product against a dense vector of matching dimensionality
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.iter()
            .map(|(i, v)| dense.get(i).copied().unwrap_or(0.0) * v)
            .sum()
    }
}

/// Immutable sparse matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,

    row_ptr: Vec<usize>,
    col_idx: Vec<u32>,
    values: Vec<f64>,

    col_ptr: Vec<usize>,
    row_idx: Vec<u32>,
    col_values: Vec<f64>,
}

/// Sort by (row, col) and sum duplicate cells
fn merge_triplets(
    n_rows: usize,
    n_cols: usize,
    mut triplets: Vec<(usize, usize, f64)>,
) -> Vec<(usize, usize, f64)> {
    triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
    for (r, c, v) in triplets {
        debug_assert!(r < n_rows && c < n_cols, "triplet out of bounds");
        match merged.last_mut() {
            Some(last) if last.0 == r && last.1 == c => last.2 += v,
            _ => merged.push((r, c, v)),
        }
    }
    merged
}

impl SparseMatrix {
    /// Build from `(row, col, value)` triplets; duplicate cells are summed
    /// and cells summing to zero are dropped.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
        let mut merged = merge_triplets(n_rows, n_cols, triplets);
        merged.retain(|&(_, _, v)| v != 0.0);
        Self::from_sorted_cells(n_rows, n_cols, &merged)
    }

    /// Like [`from_triplets`](Self::from_triplets), but every listed cell is
    /// stored, including those whose value sums to zero.
    ///
    /// An explicit zero records that the pair occurred; it reads as 0.0
    /// through `get` but shows up in row and column views and in `nnz`.
    pub fn from_recorded_triplets(
        n_rows: usize,
        n_cols: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> Self {
        let merged = merge_triplets(n_rows, n_cols, triplets);
        Self::from_sorted_cells(n_rows, n_cols, &merged)
    }

    /// Cells must be sorted by (row, col) without duplicates
    fn from_sorted_cells(n_rows: usize, n_cols: usize, cells: &[(usize, usize, f64)]) -> Self {
        let nnz = cells.len();

        let mut row_ptr = vec![0usize; n_rows + 1];
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        let mut col_counts = vec![0usize; n_cols];

        for &(r, c, v) in cells {
            row_ptr[r + 1] += 1;
            col_idx.push(c as u32);
            values.push(v);
            col_counts[c] += 1;
        }
        for r in 0..n_rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        let mut col_ptr = vec![0usize; n_cols + 1];
        for c in 0..n_cols {
            col_ptr[c + 1] = col_ptr[c] + col_counts[c];
        }

        // Rows are visited in ascending order, so each column fills ascending
        let mut cursor = col_ptr.clone();
        let mut row_idx = vec![0u32; nnz];
        let mut col_values = vec![0.0f64; nnz];
        for &(r, c, v) in cells {
            let pos = cursor[c];
            row_idx[pos] = r as u32;
            col_values[pos] = v;
            cursor[c] += 1;
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
            col_ptr,
            row_idx,
            col_values,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Fraction of cells with no stored value
    pub fn sparsity(&self) -> f64 {
        let cells = self.n_rows as f64 * self.n_cols as f64;
        if cells == 0.0 {
            1.0
        } else {
            1.0 - self.nnz() as f64 / cells
        }
    }

    pub fn row(&self, r: usize) -> SparseVec<'_> {
        if r >= self.n_rows {
            return SparseVec::empty();
        }
        let (start, end) = (self.row_ptr[r], self.row_ptr[r + 1]);
        SparseVec {
            indices: &self.col_idx[start..end],
            values: &self.values[start..end],
        }
    }

    pub fn column(&self, c: usize) -> SparseVec<'_> {
        if c >= self.n_cols {
            return SparseVec::empty();
        }
        let (start, end) = (self.col_ptr[c], self.col_ptr[c + 1]);
        SparseVec {
            indices: &self.row_idx[start..end],
            values: &self.col_values[start..end],
        }
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.row(r).get(c)
    }

    pub fn row_mean(&self, r: usize) -> f64 {
        self.row(r).mean()
    }

    pub fn row_sum(&self, r: usize) -> f64 {
        self.row(r).sum()
    }

    /// Copy with each row's mean (over its stored entries) subtracted.
    ///
    /// The sparsity pattern is kept, so a centred cell may hold an explicit
    /// zero; absent cells stay absent.
    pub fn mean_centered(&self) -> SparseMatrix {
        let means: Vec<f64> = (0..self.n_rows).map(|r| self.row_mean(r)).collect();
        let mut centered = self.clone();
        for (r, mean) in means.iter().enumerate() {
            for v in &mut centered.values[self.row_ptr[r]..self.row_ptr[r + 1]] {
                *v -= mean;
            }
        }
        for (pos, v) in centered.col_values.iter_mut().enumerate() {
            *v -= means[self.row_idx[pos] as usize];
        }
        centered
    }
}
