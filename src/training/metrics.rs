//! Evaluation metrics for model quality.
//!
//! Metrics are separate from the estimation objective — a model is trained
//! by Gibbs sweeps but scored with plain regression metrics.

/// A metric for evaluating prediction quality.
pub trait Metric: Send + Sync {
    /// Compute the metric over paired predictions and targets.
    fn compute(&self, preds: &[f64], targets: &[f64]) -> f64;

    /// Whether higher values indicate better performance.
    fn higher_is_better(&self) -> bool;

    /// Name of the metric (for logging).
    fn name(&self) -> &'static str;
}

// =============================================================================
// RMSE (Root Mean Squared Error)
// =============================================================================

/// Root Mean Squared Error: `sqrt(mean((pred - target)²))`.
///
/// Lower is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rmse;

impl Metric for Rmse {
    fn compute(&self, preds: &[f64], targets: &[f64]) -> f64 {
        let n = preds.len().min(targets.len());
        if n == 0 {
            return 0.0;
        }
        let sum_sq: f64 = preds[..n]
            .iter()
            .zip(&targets[..n])
            .map(|(&p, &t)| (p - t) * (p - t))
            .sum();
        (sum_sq / n as f64).sqrt()
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "rmse"
    }
}

// =============================================================================
// MAE (Mean Absolute Error)
// =============================================================================

/// Mean Absolute Error: `mean(|pred - target|)`.
///
/// Lower is better. More robust to outliers than RMSE.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mae;

impl Metric for Mae {
    fn compute(&self, preds: &[f64], targets: &[f64]) -> f64 {
        let n = preds.len().min(targets.len());
        if n == 0 {
            return 0.0;
        }
        let sum_abs: f64 = preds[..n]
            .iter()
            .zip(&targets[..n])
            .map(|(&p, &t)| (p - t).abs())
            .sum();
        sum_abs / n as f64
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "mae"
    }
}
