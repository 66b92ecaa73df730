//! Per-sample error and partial-sum caches.
//!
//! [`TermCache`] keeps two buffers per dataset, one slot per sample:
//!
//! - `error`: the current prediction right after [`TermCache::recompute`];
//!   for the training set it is converted in place to the residual
//!   `e(c) = ŷ(c) − y(c)` by [`TermCache::absorb_targets`], once per
//!   iteration. Coordinate draws read it to reconstruct "the prediction
//!   without parameter i" and patch it by the committed delta.
//! - `scratch`: the per-factor partial sums `q_f(c) = Σ_i v_fi x_ci`, alive
//!   only inside a [`ScratchScope`].
//!
//! Invariant: `scratch` is all-zero whenever no scope is active. The scope
//! zeroes it on acquisition and again on release, so a full recompute always
//! starts from clean state.

use ndarray::ArrayView1;

use crate::data::{SparseDataset, SparseMatrix, SparseRowRef};
use crate::model::FmModel;

/// Error and partial-sum buffers for one dataset.
#[derive(Debug, Clone)]
pub struct TermCache {
    error: Vec<f64>,
    scratch: Vec<f64>,
}

impl TermCache {
    /// Create zeroed buffers for `n_samples` samples.
    pub fn new(n_samples: usize) -> Self {
        Self {
            error: vec![0.0; n_samples],
            scratch: vec![0.0; n_samples],
        }
    }

    /// Number of samples covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.error.len()
    }

    /// Whether the cache covers zero samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.error.is_empty()
    }

    /// Current error-term row.
    #[inline]
    pub fn error(&self) -> &[f64] {
        &self.error
    }

    /// Recompute predictions from scratch into the error row.
    ///
    /// Must not run while a [`ScratchScope`] is active; the scratch row is
    /// required (and debug-asserted) to be zero here.
    pub fn recompute(&mut self, model: &FmModel, data: &SparseDataset) {
        self.debug_assert_scratch_zero();
        model.predict_into(data.samples(), &mut self.error);
    }

    /// Convert predictions to residuals: `error[c] -= targets[c]`.
    ///
    /// Called exactly once per iteration on the training cache, immediately
    /// after [`recompute`](Self::recompute).
    pub fn absorb_targets(&mut self, targets: &[f64]) {
        debug_assert_eq!(targets.len(), self.error.len());
        for (e, &t) in self.error.iter_mut().zip(targets) {
            *e -= t;
        }
    }

    /// Patch every sample: `error[c] -= delta` (bias update).
    pub fn shift_error(&mut self, delta: f64) {
        for e in &mut self.error {
            *e -= delta;
        }
    }

    /// Patch the error row over one feature's support:
    /// `error[s] -= delta * x_s`.
    pub fn patch_error(&mut self, column: SparseRowRef<'_>, delta: f64) {
        for (s, x) in column.iter() {
            self.error[s] -= delta * x;
        }
    }

    /// Open a scope for one per-factor pass.
    ///
    /// The scratch row is zeroed here and again when the scope drops.
    pub fn factor_scope(&mut self) -> ScratchScope<'_> {
        self.scratch.fill(0.0);
        ScratchScope { cache: self }
    }

    fn debug_assert_scratch_zero(&self) {
        debug_assert!(
            self.scratch.iter().all(|&q| q == 0.0),
            "scratch row must be zero outside a factor scope"
        );
    }
}

/// Scoped access to the scratch row during a single per-factor pass.
///
/// Holds the cache mutably for the duration of the pass; drop restores the
/// all-zero scratch invariant.
#[derive(Debug)]
pub struct ScratchScope<'a> {
    cache: &'a mut TermCache,
}

impl ScratchScope<'_> {
    /// Accumulate the q-terms of one factor dimension:
    /// `scratch[s] += v_i * x_si` over the feature-major matrix.
    pub fn load_q(&mut self, factor_row: ArrayView1<'_, f64>, features: &SparseMatrix) {
        debug_assert_eq!(factor_row.len(), features.n_rows());
        for (i, &v) in factor_row.iter().enumerate() {
            if v == 0.0 {
                continue;
            }
            for (s, x) in features.row(i).iter() {
                self.cache.scratch[s] += v * x;
            }
        }
    }

    /// Borrow the error and scratch rows.
    #[inline]
    pub fn parts(&self) -> (&[f64], &[f64]) {
        (&self.cache.error, &self.cache.scratch)
    }

    /// Mutably borrow the error and scratch rows.
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.cache.error, &mut self.cache.scratch)
    }
}

impl Drop for ScratchScope<'_> {
    fn drop(&mut self) {
        self.cache.scratch.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dataset() -> SparseDataset {
        SparseDataset::from_rows(
            2,
            &[vec![(0, 1.0)], vec![(1, 2.0)], vec![(0, 0.5), (1, 1.0)]],
            vec![1.0, 0.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn recompute_matches_direct_prediction() {
        let data = dataset();
        let mut model = FmModel::zeros(true, true, 0, 2);
        model.set_bias(0.25);
        model.set_weight(0, 1.0);
        model.set_weight(1, -0.5);

        let mut cache = TermCache::new(data.n_samples());
        cache.recompute(&model, &data);
        let direct = model.predict(data.samples());
        for (c, d) in cache.error().iter().zip(&direct) {
            assert_abs_diff_eq!(c, d, epsilon = 1e-15);
        }
    }

    #[test]
    fn absorb_targets_produces_residuals() {
        let data = dataset();
        let model = FmModel::zeros(true, false, 0, 2);
        let mut cache = TermCache::new(data.n_samples());
        cache.recompute(&model, &data);
        cache.absorb_targets(data.targets());
        assert_eq!(cache.error(), &[-1.0, 0.0, -2.0]);
    }

    #[test]
    fn patch_touches_only_column_support() {
        let data = dataset();
        let mut cache = TermCache::new(data.n_samples());
        // Feature 0 appears in samples 0 and 2 with values 1.0 and 0.5.
        cache.patch_error(data.features().row(0), 2.0);
        assert_eq!(cache.error(), &[-2.0, 0.0, -1.0]);
    }

    #[test]
    fn shift_applies_everywhere() {
        let data = dataset();
        let mut cache = TermCache::new(data.n_samples());
        cache.shift_error(-0.5);
        assert_eq!(cache.error(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn scope_zeroes_scratch_on_drop() {
        let data = dataset();
        let mut model = FmModel::zeros(false, false, 1, 2);
        model.set_factor(0, 0, 2.0);
        model.set_factor(0, 1, 1.0);

        let mut cache = TermCache::new(data.n_samples());
        {
            let mut scope = cache.factor_scope();
            scope.load_q(model.factors().row(0), data.features());
            let (_, scratch) = scope.parts();
            // q = v·x per sample: [2.0, 2.0, 2.0].
            assert_eq!(scratch, &[2.0, 2.0, 2.0]);
        }
        // Scope dropped: invariant restored, recompute is legal again.
        cache.recompute(&model, &data);
    }
}
