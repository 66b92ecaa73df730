//! Sparse matrix storage in compressed sparse row (CSR) layout.
//!
//! The training engine needs both orientations of the design matrix:
//! sample-major for per-sample prediction passes and feature-major (the
//! transpose) for per-feature coordinate draws. [`SparseMatrix`] stores one
//! orientation; [`SparseMatrix::transpose`] derives the other once at load
//! time. Both are immutable afterwards.

use super::DataError;

/// Immutable CSR sparse matrix.
///
/// Rows are the outer dimension: `row(i)` yields the column indices and
/// values of row `i` as contiguous slices.
///
/// # Example
///
/// ```
/// use bayesfm::data::SparseMatrix;
///
/// // 2 rows, 3 columns: [[1.0, 0, 2.0], [0, 3.0, 0]]
/// let m = SparseMatrix::new(2, 3, vec![0, 2, 3], vec![0, 2, 1], vec![1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(m.nnz(), 3);
/// assert_eq!(m.row(0).values, &[1.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    /// Row start offsets into `indices`/`values`; length `n_rows + 1`.
    indptr: Vec<usize>,
    /// Column indices of stored entries.
    indices: Vec<u32>,
    /// Entry values, parallel to `indices`.
    values: Vec<f64>,
}

/// Borrowed view of a single CSR row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRowRef<'a> {
    /// Column indices of the row's stored entries.
    pub indices: &'a [u32],
    /// Values parallel to `indices`.
    pub values: &'a [f64],
}

impl<'a> SparseRowRef<'a> {
    /// Iterate `(column, value)` pairs of the row.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| (i as usize, v))
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

impl SparseMatrix {
    /// Create a matrix from raw CSR parts, validating the layout.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if `indptr` has the wrong length, is not
    /// monotone, does not end at `indices.len()`, if `indices` and `values`
    /// disagree in length, or if any index is out of column range.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        values: Vec<f64>,
    ) -> Result<Self, DataError> {
        if indptr.len() != n_rows + 1 {
            return Err(DataError::MalformedLayout(format!(
                "indptr length {} does not match n_rows + 1 = {}",
                indptr.len(),
                n_rows + 1
            )));
        }
        if indptr[0] != 0 || *indptr.last().unwrap() != indices.len() {
            return Err(DataError::MalformedLayout(format!(
                "indptr must start at 0 and end at nnz = {}",
                indices.len()
            )));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(DataError::MalformedLayout(
                "indptr must be non-decreasing".to_string(),
            ));
        }
        if indices.len() != values.len() {
            return Err(DataError::MalformedLayout(format!(
                "indices length {} does not match values length {}",
                indices.len(),
                values.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= n_cols) {
            return Err(DataError::IndexOutOfRange {
                index: bad as usize,
                n_cols,
            });
        }
        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        })
    }

    /// Build a matrix from per-row `(column, value)` entry lists.
    pub fn from_rows(n_cols: usize, rows: &[Vec<(usize, f64)>]) -> Result<Self, DataError> {
        let nnz = rows.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        indptr.push(0);
        for row in rows {
            for &(col, value) in row {
                if col >= n_cols {
                    return Err(DataError::IndexOutOfRange {
                        index: col,
                        n_cols,
                    });
                }
                indices.push(col as u32);
                values.push(value);
            }
            indptr.push(indices.len());
        }
        Self::new(rows.len(), n_cols, indptr, indices, values)
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Borrow row `i` as index/value slices.
    #[inline]
    pub fn row(&self, i: usize) -> SparseRowRef<'_> {
        let start = self.indptr[i];
        let end = self.indptr[i + 1];
        SparseRowRef {
            indices: &self.indices[start..end],
            values: &self.values[start..end],
        }
    }

    /// Build the transposed matrix via counting sort.
    ///
    /// Entries of each output row keep the source row order, so the result
    /// has sorted inner indices whenever the input does.
    pub fn transpose(&self) -> SparseMatrix {
        let nnz = self.nnz();
        let mut counts = vec![0usize; self.n_cols + 1];
        for &col in &self.indices {
            counts[col as usize + 1] += 1;
        }
        for c in 1..counts.len() {
            counts[c] += counts[c - 1];
        }

        let indptr = counts.clone();
        let mut indices = vec![0u32; nnz];
        let mut values = vec![0.0f64; nnz];
        let mut cursor = counts;
        for row in 0..self.n_rows {
            let start = self.indptr[row];
            let end = self.indptr[row + 1];
            for k in start..end {
                let col = self.indices[k] as usize;
                let dst = cursor[col];
                indices[dst] = row as u32;
                values[dst] = self.values[k];
                cursor[col] += 1;
            }
        }

        SparseMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            indptr,
            indices,
            values,
        }
    }
}
