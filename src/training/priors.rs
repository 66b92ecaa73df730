//! Hierarchical prior state for the Gibbs sweeps.
//!
//! The regression noise precision `alpha` and the per-group Normal-Gamma
//! priors over weights and factors. In multilevel mode every field below is
//! redrawn each sweep; otherwise `alpha` and the means stay pinned at their
//! defaults and the precisions keep the configured regularization constants.

use ndarray::{Array1, Array2};

/// Lower clamp for drawn precisions.
pub(crate) const PRECISION_MIN: f64 = 1e-10;
/// Upper clamp for drawn precisions.
pub(crate) const PRECISION_MAX: f64 = 1e10;

/// Clamp a drawn precision into the admissible range.
///
/// Degenerate Gamma draws (zero rate, all-zero residuals) come back
/// infinite; NaN collapses to the lower clamp.
#[inline]
pub(crate) fn clamp_precision(value: f64) -> f64 {
    if value.is_nan() {
        PRECISION_MIN
    } else {
        value.clamp(PRECISION_MIN, PRECISION_MAX)
    }
}

/// Hyperprior state: noise precision plus per-group means/precisions.
#[derive(Debug, Clone)]
pub struct HierarchicalPriors {
    /// Regression noise precision.
    pub alpha: f64,

    /// Gamma shape offset shared by the precision posteriors.
    pub alpha_0: f64,
    /// Gamma rate offset shared by the precision posteriors.
    pub gamma_0: f64,
    /// Pseudo-count of the Normal prior on group means.
    pub beta_0: f64,
    /// Prior mean of group means.
    pub mu_0: f64,
    /// Prior mean of the global bias.
    pub bias_mean_0: f64,

    /// Per-group weight means, length = number of groups.
    pub w_mu: Array1<f64>,
    /// Per-group weight precisions.
    pub w_lambda: Array1<f64>,
    /// Per-(dimension, group) factor means, shape `[n_factors, n_groups]`.
    pub v_mu: Array2<f64>,
    /// Per-(dimension, group) factor precisions.
    pub v_lambda: Array2<f64>,
}

impl HierarchicalPriors {
    /// Create the prior state with standard defaults.
    ///
    /// `reg_weight`/`reg_factor` seed the precision arrays; multilevel runs
    /// overwrite them on the first sweep, non-multilevel runs keep them
    /// fixed for the whole run.
    pub fn new(n_groups: usize, n_factors: usize, reg_weight: f64, reg_factor: f64) -> Self {
        Self {
            alpha: 1.0,
            alpha_0: 1.0,
            gamma_0: 1.0,
            beta_0: 1.0,
            mu_0: 0.0,
            bias_mean_0: 0.0,
            w_mu: Array1::zeros(n_groups),
            w_lambda: Array1::from_elem(n_groups, reg_weight),
            v_mu: Array2::zeros((n_factors, n_groups)),
            v_lambda: Array2::from_elem((n_factors, n_groups), reg_factor),
        }
    }

    /// Number of covariate groups.
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.w_mu.len()
    }
}
