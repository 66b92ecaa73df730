//! Training loop for Bayesian factorization machines.
//!
//! [`FmTrainer`] validates inputs, wires the sampler, caches, and evaluator
//! together, and runs the configured number of sweeps. The result is an
//! [`FmFit`]: the final model, the final clipped test predictions, and the
//! per-iteration metric history.

use crate::data::{FeatureGrouping, SparseDataset};
use crate::model::{ConfigError, FmConfig, FmModel};

use super::cache::TermCache;
use super::eval::{PredictionAccumulator, TargetBounds};
use super::logger::TrainingLogger;
use super::metrics::{Metric, Rmse};
use super::priors::HierarchicalPriors;
use super::sampler::{GibbsSampler, SweepContext};

// ============================================================================
// TrainError
// ============================================================================

/// Errors raised at training entry.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// Train and test datasets disagree on the feature-space size.
    #[error("train and test datasets disagree on feature-space size ({train} vs {test})")]
    FeatureSpaceMismatch { train: usize, test: usize },

    /// The grouping covers a different number of features than the data.
    #[error("feature grouping covers {grouping} features but the dataset has {dataset}")]
    GroupingMismatch { grouping: usize, dataset: usize },

    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// IterationRecord / FmFit
// ============================================================================

/// Metrics of one training iteration.
///
/// `test_rmse`/`test_mae` score the cumulative posterior-mean prediction up
/// to this iteration, not the single draw.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IterationRecord {
    /// Iteration index, starting at 0.
    pub round: usize,
    /// RMSE of the clipped training predictions of this iteration's model.
    pub train_rmse: f64,
    /// RMSE of the cumulative test prediction.
    pub test_rmse: f64,
    /// MAE of the cumulative test prediction.
    pub test_mae: f64,
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct FmFit {
    /// Final model state.
    pub model: FmModel,
    /// Final clipped test predictions, length = number of test samples.
    ///
    /// The posterior mean across iterations for sampling runs; the last
    /// sweep's prediction for point-estimate runs.
    pub predictions: Vec<f64>,
    /// Per-iteration metrics.
    pub history: Vec<IterationRecord>,
}

// ============================================================================
// FmTrainer
// ============================================================================

/// Trainer for Bayesian factorization machines.
///
/// # Example
///
/// ```
/// use bayesfm::data::SparseDataset;
/// use bayesfm::model::{FmConfig, Method};
/// use bayesfm::training::FmTrainer;
///
/// let train = SparseDataset::from_rows(
///     2,
///     &[vec![(0, 1.0)], vec![(1, 1.0)]],
///     vec![1.0, 0.0],
/// )
/// .unwrap();
/// let test = train.clone();
///
/// let config = FmConfig::builder()
///     .method(Method::Als)
///     .linear(false)
///     .n_factors(0)
///     .n_iterations(10)
///     .seed(1)
///     .verbosity(bayesfm::training::Verbosity::Silent)
///     .build()
///     .unwrap();
///
/// let fit = FmTrainer::new(config).train(&train, &test).unwrap();
/// assert_eq!(fit.predictions.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FmTrainer {
    config: FmConfig,
}

impl FmTrainer {
    /// Create a trainer from a configuration.
    pub fn new(config: FmConfig) -> Self {
        Self { config }
    }

    /// Borrow the configuration.
    pub fn config(&self) -> &FmConfig {
        &self.config
    }

    /// Train with a single covariate group over all features.
    pub fn train(
        &self,
        train: &SparseDataset,
        test: &SparseDataset,
    ) -> Result<FmFit, TrainError> {
        let groups = FeatureGrouping::single(train.n_features());
        self.train_with_groups(train, test, &groups)
    }

    /// Train with an explicit feature grouping.
    pub fn train_with_groups(
        &self,
        train: &SparseDataset,
        test: &SparseDataset,
        groups: &FeatureGrouping,
    ) -> Result<FmFit, TrainError> {
        self.config.validate()?;
        if train.n_features() != test.n_features() {
            return Err(TrainError::FeatureSpaceMismatch {
                train: train.n_features(),
                test: test.n_features(),
            });
        }
        if groups.n_features() != train.n_features() {
            return Err(TrainError::GroupingMismatch {
                grouping: groups.n_features(),
                dataset: train.n_features(),
            });
        }

        let cfg = &self.config;
        let averaged = cfg.method.samples();

        let mut model = FmModel::zeros(cfg.bias, cfg.linear, cfg.n_factors, train.n_features());
        let mut sampler = GibbsSampler::new(
            cfg.method.samples(),
            cfg.method.multilevel(),
            cfg.regularization.bias,
            cfg.seed,
        );
        sampler.init_model(&mut model, cfg.init_stddev);

        let mut priors = HierarchicalPriors::new(
            groups.n_groups(),
            cfg.n_factors,
            cfg.regularization.linear,
            cfg.regularization.factor,
        );

        let mut train_cache = TermCache::new(train.n_samples());
        let mut test_cache = TermCache::new(test.n_samples());

        // Clipping follows the observed training-target range, for the test
        // set as well.
        let bounds = TargetBounds::new(train.min_target(), train.max_target());
        let mut accumulator = PredictionAccumulator::new(test.n_samples(), bounds);

        let logger = TrainingLogger::new(cfg.verbosity);
        let mut history = Vec::with_capacity(cfg.n_iterations as usize);

        // Initial predictions, then residuals for the training cache.
        train_cache.recompute(&model, train);
        test_cache.recompute(&model, test);
        train_cache.absorb_targets(train.targets());

        logger.start_training(cfg.n_iterations as usize);
        for round in 0..cfg.n_iterations as usize {
            sampler.sweep(&mut SweepContext {
                model: &mut model,
                priors: &mut priors,
                cache: &mut train_cache,
                data: train,
                groups,
            });

            train_cache.recompute(&model, train);
            test_cache.recompute(&model, test);

            accumulator.record(test_cache.error());

            let clipped = bounds.clipped(train_cache.error());
            let train_rmse = Rmse.compute(&clipped, train.targets());
            train_cache.absorb_targets(train.targets());

            let (test_rmse, test_mae) = accumulator.cumulative_eval(test.targets());
            logger.log_round(round, train_rmse, test_rmse, test_mae);
            history.push(IterationRecord {
                round,
                train_rmse,
                test_rmse,
                test_mae,
            });
        }
        logger.finish_training();

        let predictions = accumulator.into_prediction(averaged);
        Ok(FmFit {
            model,
            predictions,
            history,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Method;
    use crate::training::Verbosity;
    use approx::assert_abs_diff_eq;

    fn two_sample_data() -> SparseDataset {
        SparseDataset::from_rows(
            2,
            &[vec![(0, 1.0)], vec![(1, 1.0)]],
            vec![1.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn bias_only_point_estimate_converges_to_target_mean() {
        let train = two_sample_data();
        let test = train.clone();
        let config = FmConfig::builder()
            .method(Method::Als)
            .linear(false)
            .n_factors(0)
            .n_iterations(50)
            .regularization((0.0, 0.0, 0.0).into())
            .seed(7)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();

        let fit = FmTrainer::new(config).train(&train, &test).unwrap();
        assert_abs_diff_eq!(fit.model.bias().unwrap(), 0.5, epsilon = 1e-12);
        // Both test samples predict the bias, clipped inside [0, 1].
        assert_abs_diff_eq!(fit.predictions[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.predictions[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_feature_space_mismatch() {
        let train = two_sample_data();
        let test = SparseDataset::from_rows(3, &[vec![(2, 1.0)]], vec![1.0]).unwrap();
        let config = FmConfig::builder()
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();
        let err = FmTrainer::new(config).train(&train, &test).unwrap_err();
        assert!(matches!(
            err,
            TrainError::FeatureSpaceMismatch { train: 2, test: 3 }
        ));
    }

    #[test]
    fn rejects_grouping_mismatch() {
        let train = two_sample_data();
        let test = train.clone();
        let groups = FeatureGrouping::single(5);
        let config = FmConfig::builder()
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();
        let err = FmTrainer::new(config)
            .train_with_groups(&train, &test, &groups)
            .unwrap_err();
        assert!(matches!(
            err,
            TrainError::GroupingMismatch {
                grouping: 5,
                dataset: 2
            }
        ));
    }

    #[test]
    fn point_estimate_runs_are_bit_identical() {
        let train = SparseDataset::from_rows(
            3,
            &[
                vec![(0, 1.0), (1, 0.5)],
                vec![(1, 1.0)],
                vec![(2, 1.0), (0, 0.25)],
            ],
            vec![1.0, 0.0, 0.5],
        )
        .unwrap();
        let test = train.clone();
        let config = FmConfig::builder()
            .method(Method::Als)
            .n_factors(2)
            .n_iterations(10)
            .regularization((0.1, 0.5, 0.5).into())
            .seed(42)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();

        let trainer = FmTrainer::new(config);
        let a = trainer.train(&train, &test).unwrap();
        let b = trainer.train(&train, &test).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.predictions, b.predictions);
    }

    #[test]
    fn sampling_runs_replay_with_same_seed() {
        let train = two_sample_data();
        let test = train.clone();
        let config = FmConfig::builder()
            .n_factors(1)
            .n_iterations(20)
            .seed(3)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();

        let trainer = FmTrainer::new(config);
        let a = trainer.train(&train, &test).unwrap();
        let b = trainer.train(&train, &test).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn history_covers_every_iteration() {
        let train = two_sample_data();
        let test = train.clone();
        let config = FmConfig::builder()
            .n_iterations(5)
            .seed(0)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();
        let fit = FmTrainer::new(config).train(&train, &test).unwrap();
        assert_eq!(fit.history.len(), 5);
        assert_eq!(fit.history[4].round, 4);
        assert!(fit.history.iter().all(|r| r.train_rmse.is_finite()));
    }
}
