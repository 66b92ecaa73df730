//! Training infrastructure: Gibbs sweeps, caches, priors, and evaluation.
//!
//! ## Core loop
//!
//! - [`FmTrainer`]: validates inputs and runs the iteration loop
//! - [`GibbsSampler`]: one sweep over all parameters per iteration
//! - [`TermCache`]: per-sample error terms with incremental patching
//! - [`HierarchicalPriors`]: noise precision + per-group Normal-Gamma priors
//!
//! ## Evaluation
//!
//! - [`Metric`], [`Rmse`], [`Mae`]: scalar quality metrics
//! - [`TargetBounds`], [`PredictionAccumulator`]: clipping and posterior-mean
//!   aggregation
//! - [`TrainingLogger`], [`Verbosity`]: per-iteration logging

mod cache;
mod eval;
mod logger;
mod metrics;
mod priors;
mod rng;
mod sampler;
mod trainer;

pub use cache::{ScratchScope, TermCache};
pub use eval::{evaluate, PredictionAccumulator, TargetBounds};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{Mae, Metric, Rmse};
pub use priors::HierarchicalPriors;
pub use rng::SamplerRng;
pub use sampler::{finite_or_zero, GibbsSampler, SweepContext};
pub use trainer::{FmFit, FmTrainer, IterationRecord, TrainError};
