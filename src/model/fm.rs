//! Factorization machine model state.
//!
//! The model is `ŷ(x) = w0 + Σ_i w_i x_i + Σ_{i<j} <v_i, v_j> x_i x_j`,
//! stored as an optional bias, an optional weight vector, and a factor
//! matrix `[n_factors, n_features]`. The pairwise term is evaluated through
//! the standard decomposition
//! `Σ_f 0.5 ((Σ_i v_fi x_i)^2 − Σ_i v_fi^2 x_i^2)`,
//! which is O(n_factors · nnz) per sample instead of O(n_features²).

use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{SparseMatrix, SparseRowRef};

/// Factorization machine parameters.
///
/// `bias` and `weights` are present iff the corresponding model terms are
/// enabled; the factor matrix may have zero rows (`n_factors == 0`).
///
/// Invariant: stored values are always finite. Training commits degenerate
/// (NaN/infinite) posterior draws as exactly `0.0` before they reach this
/// struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmModel {
    bias: Option<f64>,
    weights: Option<Array1<f64>>,
    /// Factor matrix, shape `[n_factors, n_features]` (dimension-major).
    factors: Array2<f64>,
}

impl FmModel {
    /// Create a zero-initialized model.
    ///
    /// Training replaces the zeros of `weights`/`factors` with Gaussian
    /// draws before the first sweep.
    pub fn zeros(use_bias: bool, use_weights: bool, n_factors: usize, n_features: usize) -> Self {
        Self {
            bias: use_bias.then_some(0.0),
            weights: use_weights.then(|| Array1::zeros(n_features)),
            factors: Array2::zeros((n_factors, n_features)),
        }
    }

    /// Size of the feature space.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.factors.ncols()
    }

    /// Number of pairwise factor dimensions.
    #[inline]
    pub fn n_factors(&self) -> usize {
        self.factors.nrows()
    }

    /// Whether the global bias term is enabled.
    #[inline]
    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    /// Whether the 1-way (linear) term is enabled.
    #[inline]
    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// Global bias, if enabled.
    #[inline]
    pub fn bias(&self) -> Option<f64> {
        self.bias
    }

    /// Linear weights, if enabled.
    #[inline]
    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    /// Factor matrix view `[n_factors, n_features]`.
    #[inline]
    pub fn factors(&self) -> ArrayView2<'_, f64> {
        self.factors.view()
    }

    #[inline]
    pub(crate) fn set_bias(&mut self, value: f64) {
        debug_assert!(self.bias.is_some());
        self.bias = Some(value);
    }

    #[inline]
    pub(crate) fn weight(&self, i: usize) -> f64 {
        self.weights.as_ref().expect("weights enabled")[i]
    }

    #[inline]
    pub(crate) fn set_weight(&mut self, i: usize, value: f64) {
        self.weights.as_mut().expect("weights enabled")[i] = value;
    }

    #[inline]
    pub(crate) fn factor(&self, f: usize, i: usize) -> f64 {
        self.factors[[f, i]]
    }

    #[inline]
    pub(crate) fn set_factor(&mut self, f: usize, i: usize, value: f64) {
        self.factors[[f, i]] = value;
    }

    /// Predict a single sample from its sparse row.
    pub fn predict_row(&self, row: SparseRowRef<'_>) -> f64 {
        let mut result = self.bias.unwrap_or(0.0);

        if let Some(w) = &self.weights {
            for (i, x) in row.iter() {
                result += w[i] * x;
            }
        }

        for f in 0..self.n_factors() {
            let mut sum = 0.0;
            let mut sum_sqr = 0.0;
            for (i, x) in row.iter() {
                let d = self.factors[[f, i]] * x;
                sum += d;
                sum_sqr += d * d;
            }
            result += 0.5 * (sum * sum - sum_sqr);
        }

        result
    }

    /// Predict every row of a sample-major matrix into `out`.
    ///
    /// Slots are written independently, so the parallel pass is
    /// bit-deterministic.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != data.n_rows()`.
    pub fn predict_into(&self, data: &SparseMatrix, out: &mut [f64]) {
        assert_eq!(out.len(), data.n_rows(), "output length must match row count");
        out.par_iter_mut().enumerate().for_each(|(s, slot)| {
            *slot = self.predict_row(data.row(s));
        });
    }

    /// Predict every row of a sample-major matrix.
    pub fn predict(&self, data: &SparseMatrix) -> Vec<f64> {
        let mut out = vec![0.0; data.n_rows()];
        self.predict_into(data, &mut out);
        out
    }
}
