//! Structured logging for training progress.

use serde::{Deserialize, Serialize};

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Per-iteration metric lines.
    #[default]
    Info,
    /// Additional diagnostics.
    Debug,
}

/// Console logger for the training loop.
///
/// Writes one line per iteration with the training RMSE and the cumulative
/// test RMSE, mirroring the evaluator's bookkeeping.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    /// Create a logger at the given verbosity.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Announce the start of a run.
    pub fn start_training(&self, n_iterations: usize) {
        if self.verbosity >= Verbosity::Info {
            println!("training for {n_iterations} iterations");
        }
    }

    /// Log one iteration's metrics.
    pub fn log_round(&self, round: usize, train_rmse: f64, test_rmse: f64, test_mae: f64) {
        if self.verbosity >= Verbosity::Info {
            println!(
                "[{round:>4}] train-rmse: {train_rmse:.6}  test-rmse: {test_rmse:.6}  test-mae: {test_mae:.6}"
            );
        }
    }

    /// Announce the end of a run.
    pub fn finish_training(&self) {
        if self.verbosity >= Verbosity::Debug {
            println!("training finished");
        }
    }
}
