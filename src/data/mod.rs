//! Data input abstractions: sparse matrices, datasets, groupings, and io.
//!
//! The engine consumes immutable [`SparseDataset`]s (sample-major CSR plus
//! its transpose, targets, and target bounds) together with a
//! [`FeatureGrouping`] that partitions features into covariate groups for
//! the hierarchical priors. [`io`] reads the libFM text format and writes
//! prediction files.

mod dataset;
mod groups;
pub mod io;
mod sparse;

pub use dataset::SparseDataset;
pub use groups::FeatureGrouping;
pub use sparse::{SparseMatrix, SparseRowRef};

/// Errors raised while constructing or loading datasets.
///
/// All of these are programmer or input errors surfaced before training
/// starts; nothing here is recoverable mid-run.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Target vector length disagrees with the sample count.
    #[error("targets length {targets} does not match sample count {samples}")]
    TargetLengthMismatch { targets: usize, samples: usize },

    /// Dataset contains no samples.
    #[error("dataset has no samples")]
    Empty,

    /// A sparse entry references a column outside the feature space.
    #[error("sparse index {index} out of range for {n_cols} columns")]
    IndexOutOfRange { index: usize, n_cols: usize },

    /// CSR arrays are structurally inconsistent.
    #[error("malformed sparse layout: {0}")]
    MalformedLayout(String),

    /// A feature was assigned to a group outside the declared range.
    #[error("feature group {group} out of range for {n_groups} groups")]
    GroupOutOfRange { group: usize, n_groups: usize },

    /// A libFM file failed to parse.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// Underlying file io failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
