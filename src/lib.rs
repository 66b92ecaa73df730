//! bayesfm: Bayesian Factorization Machines for sparse regression.
//!
//! Native Rust implementation of FM training by Gibbs sampling (MCMC) and
//! alternating least squares, with hierarchical priors and an incrementally
//! patched error cache that keeps every coordinate draw at O(nonzeros).
//!
//! # Key Types
//!
//! - [`FmTrainer`] / [`FmFit`] - Training loop and its result
//! - [`FmConfig`] - Configuration builder
//! - [`SparseDataset`] / [`FeatureGrouping`] - Data handling
//! - [`FmModel`] - Trained parameters with prediction
//!
//! # Training
//!
//! Use `FmConfig::builder()` to configure, then `FmTrainer::new(config)
//! .train(&train, &test)`. See the [`training`] module for details.
//!
//! # Data
//!
//! Datasets are sparse CSR matrices plus targets; [`data::io`] reads the
//! libFM text format (`target feat:val ...` per line).

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod data;
pub mod model;
pub mod training;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level training types
pub use training::{FmFit, FmTrainer, IterationRecord, TrainError, Verbosity};

// Configuration types (most users want these)
pub use model::{ConfigError, DimSpec, FmConfig, FmModel, Method, RegSpec, TaskKind};

// Data types (for preparing training data)
pub use data::{DataError, FeatureGrouping, SparseDataset, SparseMatrix};
