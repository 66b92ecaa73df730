//! Dataset container for sparse regression data.
//!
//! [`SparseDataset`] bundles the design matrix in both orientations with the
//! target vector and the observed target range. The engine borrows datasets
//! read-only; all validation happens once at construction.

use super::sparse::SparseMatrix;
use super::DataError;

/// A sparse dataset: samples, their transpose, and targets.
///
/// The sample-major matrix has shape `[n_samples, n_features]`; the
/// feature-major matrix is its transpose, built once at construction so that
/// per-feature coordinate passes stay O(nonzeros of that feature).
///
/// Target bounds (`min_target`/`max_target`) are computed here and used to
/// clip every prediction emitted for the regression task.
#[derive(Debug, Clone)]
pub struct SparseDataset {
    samples: SparseMatrix,
    features: SparseMatrix,
    targets: Vec<f64>,
    min_target: f64,
    max_target: f64,
}

impl SparseDataset {
    /// Create a dataset from a sample-major matrix and targets.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the dataset is empty or the target vector
    /// length disagrees with the sample count.
    pub fn new(samples: SparseMatrix, targets: Vec<f64>) -> Result<Self, DataError> {
        if samples.n_rows() == 0 {
            return Err(DataError::Empty);
        }
        if targets.len() != samples.n_rows() {
            return Err(DataError::TargetLengthMismatch {
                targets: targets.len(),
                samples: samples.n_rows(),
            });
        }

        let mut min_target = f64::INFINITY;
        let mut max_target = f64::NEG_INFINITY;
        for &t in &targets {
            min_target = min_target.min(t);
            max_target = max_target.max(t);
        }

        let features = samples.transpose();
        Ok(Self {
            samples,
            features,
            targets,
            min_target,
            max_target,
        })
    }

    /// Convenience constructor from per-sample `(feature, value)` lists.
    pub fn from_rows(
        n_features: usize,
        rows: &[Vec<(usize, f64)>],
        targets: Vec<f64>,
    ) -> Result<Self, DataError> {
        let samples = SparseMatrix::from_rows(n_features, rows)?;
        Self::new(samples, targets)
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.n_rows()
    }

    /// Size of the feature space.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.samples.n_cols()
    }

    /// Sample-major matrix `[n_samples, n_features]`.
    #[inline]
    pub fn samples(&self) -> &SparseMatrix {
        &self.samples
    }

    /// Feature-major matrix `[n_features, n_samples]`.
    #[inline]
    pub fn features(&self) -> &SparseMatrix {
        &self.features
    }

    /// Target values, one per sample.
    #[inline]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Smallest observed target.
    #[inline]
    pub fn min_target(&self) -> f64 {
        self.min_target
    }

    /// Largest observed target.
    #[inline]
    pub fn max_target(&self) -> f64 {
        self.max_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_transpose_and_bounds() {
        let ds = SparseDataset::from_rows(
            2,
            &[vec![(0, 1.0)], vec![(1, 1.0)], vec![(0, 2.0)]],
            vec![1.5, -0.5, 3.0],
        )
        .unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.min_target(), -0.5);
        assert_eq!(ds.max_target(), 3.0);
        // Feature 0 appears in samples 0 and 2.
        let col = ds.features().row(0);
        assert_eq!(col.indices, &[0, 2]);
    }

    #[test]
    fn rejects_target_mismatch() {
        let err = SparseDataset::from_rows(1, &[vec![(0, 1.0)]], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            DataError::TargetLengthMismatch {
                targets: 2,
                samples: 1
            }
        ));
    }

    #[test]
    fn rejects_empty() {
        let err = SparseDataset::from_rows(1, &[], vec![]).unwrap_err();
        assert!(matches!(err, DataError::Empty));
    }
}
