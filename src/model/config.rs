//! Training configuration with builder pattern.
//!
//! [`FmConfig`] is the single validated configuration for FM training. It
//! uses the `bon` crate for builder generation; `build()` validates every
//! parameter so malformed configurations never reach the trainer.
//!
//! # Example
//!
//! ```
//! use bayesfm::model::{FmConfig, Method};
//!
//! // All defaults: MCMC, bias + linear + 8 factors, 100 iterations.
//! let config = FmConfig::builder().build().unwrap();
//! assert_eq!(config.n_factors, 8);
//!
//! // ALS with fixed regularization and a seed.
//! let config = FmConfig::builder()
//!     .method(Method::Als)
//!     .n_factors(0)
//!     .regularization((0.0, 1.0, 1.0).into())
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! assert!(!config.method.samples());
//! ```

use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::training::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// n_iterations must be at least 1.
    #[error("n_iterations must be at least 1")]
    InvalidIterations,

    /// init_stddev must be positive.
    #[error("init_stddev must be positive, got {0}")]
    InvalidInitStddev(f64),

    /// A regularization component is negative.
    #[error("{field} regularization must be non-negative, got {value}")]
    InvalidRegularization { field: &'static str, value: f64 },

    /// A `k0,k1,k2` / `r0,r1,r2` triple did not contain exactly 3 components.
    #[error("expected 3 comma-separated components in '{input}', got {found}")]
    MalformedTriple { input: String, found: usize },

    /// A triple component failed to parse.
    #[error("invalid component '{component}' in '{input}'")]
    InvalidTripleComponent { input: String, component: String },

    /// Unrecognized estimation method name.
    #[error("unknown method '{0}', expected 'mcmc' or 'als'")]
    UnknownMethod(String),

    /// The requested task has no posterior updates implemented.
    #[error("task {0:?} is not supported")]
    UnsupportedTask(TaskKind),
}

// =============================================================================
// Method / TaskKind
// =============================================================================

/// Parameter estimation method.
///
/// Both methods run the same sweep structure; they differ in the two flags
/// below. The sampler itself also supports the two intermediate flag
/// combinations for experimentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Full MCMC: stochastic draws, hyperpriors re-estimated each sweep.
    #[default]
    Mcmc,
    /// Alternating least squares: posterior means, fixed regularization.
    Als,
}

impl Method {
    /// Whether draws are stochastic (`true`) or posterior means (`false`).
    #[inline]
    pub fn samples(&self) -> bool {
        matches!(self, Method::Mcmc)
    }

    /// Whether hyperpriors are re-estimated each sweep.
    #[inline]
    pub fn multilevel(&self) -> bool {
        matches!(self, Method::Mcmc)
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcmc" => Ok(Method::Mcmc),
            "als" => Ok(Method::Als),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

/// Prediction task.
///
/// Only regression posterior updates exist; classification is anticipated in
/// the type but rejected by validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Real-valued targets, clipped to the observed training range.
    #[default]
    Regression,
    /// Binary targets. Not implemented.
    Classification,
}

// =============================================================================
// DimSpec / RegSpec triples
// =============================================================================

/// Parsed `k0,k1,k2` model-dimension triple.
///
/// `k0` toggles the bias, `k1` the linear term, `k2` is the number of
/// pairwise factor dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimSpec {
    /// Use the global bias term.
    pub bias: bool,
    /// Use per-feature linear weights.
    pub linear: bool,
    /// Number of pairwise factor dimensions.
    pub n_factors: usize,
}

impl FromStr for DimSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_triple(s)?;
        let parse = |component: &str| -> Result<u64, ConfigError> {
            component.parse().map_err(|_| ConfigError::InvalidTripleComponent {
                input: s.to_string(),
                component: component.to_string(),
            })
        };
        Ok(Self {
            bias: parse(parts[0])? != 0,
            linear: parse(parts[1])? != 0,
            n_factors: parse(parts[2])? as usize,
        })
    }
}

/// Regularization triple `r0,r1,r2`: bias, linear, and factor precision.
///
/// Only consulted outside full multilevel mode; MCMC estimates precisions
/// from the hierarchical priors instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegSpec {
    /// Bias regularization (prior precision of the bias).
    pub bias: f64,
    /// Linear-weight regularization.
    pub linear: f64,
    /// Factor regularization.
    pub factor: f64,
}

impl Default for RegSpec {
    fn default() -> Self {
        Self {
            bias: 0.0,
            linear: 0.0,
            factor: 0.1,
        }
    }
}

impl From<(f64, f64, f64)> for RegSpec {
    fn from((bias, linear, factor): (f64, f64, f64)) -> Self {
        Self { bias, linear, factor }
    }
}

impl FromStr for RegSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_triple(s)?;
        let parse = |component: &str| -> Result<f64, ConfigError> {
            component.parse().map_err(|_| ConfigError::InvalidTripleComponent {
                input: s.to_string(),
                component: component.to_string(),
            })
        };
        Ok(Self {
            bias: parse(parts[0])?,
            linear: parse(parts[1])?,
            factor: parse(parts[2])?,
        })
    }
}

fn split_triple(s: &str) -> Result<Vec<&str>, ConfigError> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(ConfigError::MalformedTriple {
            input: s.to_string(),
            found: parts.len(),
        });
    }
    Ok(parts)
}

// =============================================================================
// FmConfig
// =============================================================================

/// Validated configuration for FM training.
///
/// Construct through [`FmConfig::builder`]; `build()` runs validation and
/// rejects malformed configurations with a [`ConfigError`].
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct FmConfig {
    // === Model structure ===
    /// Use the global bias term. Default: true.
    #[builder(default = true)]
    pub bias: bool,

    /// Use per-feature linear weights. Default: true.
    #[builder(default = true)]
    pub linear: bool,

    /// Number of pairwise factor dimensions. Default: 8. May be 0.
    #[builder(default = 8)]
    pub n_factors: usize,

    // === Estimation ===
    /// Estimation method. Default: [`Method::Mcmc`].
    #[builder(default)]
    pub method: Method,

    /// Number of sweeps over all parameters. Default: 100.
    #[builder(default = 100)]
    pub n_iterations: u32,

    /// Regularization constants, used only outside full multilevel mode.
    #[builder(default)]
    pub regularization: RegSpec,

    /// Standard deviation of the Gaussian initialization for weights and
    /// factors. Default: 0.1.
    #[builder(default = 0.1)]
    pub init_stddev: f64,

    /// Seed for the pseudo-random stream. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Prediction task. Default: [`TaskKind::Regression`].
    #[builder(default)]
    pub task: TaskKind,

    // === Logging ===
    /// Verbosity of the per-iteration log. Default: [`Verbosity::Info`].
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: fm_config_builder::IsComplete> FmConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `n_iterations == 0`
    /// - `init_stddev <= 0`
    /// - negative regularization component
    /// - unsupported task kind
    pub fn build(self) -> Result<FmConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl FmConfig {
    /// Validate the configuration.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.n_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        if !(self.init_stddev > 0.0) {
            return Err(ConfigError::InvalidInitStddev(self.init_stddev));
        }
        for (field, value) in [
            ("bias", self.regularization.bias),
            ("linear", self.regularization.linear),
            ("factor", self.regularization.factor),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidRegularization { field, value });
            }
        }
        if self.task != TaskKind::Regression {
            return Err(ConfigError::UnsupportedTask(self.task));
        }
        Ok(())
    }
}

impl Default for FmConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FmConfig::default();
        assert!(config.bias);
        assert!(config.linear);
        assert_eq!(config.n_factors, 8);
        assert_eq!(config.n_iterations, 100);
        assert_eq!(config.method, Method::Mcmc);
    }

    #[test]
    fn rejects_zero_iterations() {
        let result = FmConfig::builder().n_iterations(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidIterations)));
    }

    #[test]
    fn rejects_non_positive_stddev() {
        let result = FmConfig::builder().init_stddev(0.0).build();
        assert!(matches!(result, Err(ConfigError::InvalidInitStddev(_))));
        let result = FmConfig::builder().init_stddev(f64::NAN).build();
        assert!(matches!(result, Err(ConfigError::InvalidInitStddev(_))));
    }

    #[test]
    fn rejects_negative_regularization() {
        let result = FmConfig::builder()
            .regularization((0.0, -1.0, 0.0).into())
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRegularization { field: "linear", .. })
        ));
    }

    #[test]
    fn rejects_classification() {
        let result = FmConfig::builder().task(TaskKind::Classification).build();
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedTask(TaskKind::Classification))
        ));
    }

    #[test]
    fn dim_triple_parses() {
        let dim: DimSpec = "1,0,8".parse().unwrap();
        assert!(dim.bias);
        assert!(!dim.linear);
        assert_eq!(dim.n_factors, 8);
    }

    #[test]
    fn dim_triple_rejects_wrong_arity() {
        let err = "1,1".parse::<DimSpec>().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTriple { found: 2, .. }));
        let err = "1,1,8,3".parse::<DimSpec>().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTriple { found: 4, .. }));
    }

    #[test]
    fn reg_triple_parses() {
        let reg: RegSpec = "0,0.5,1.5".parse().unwrap();
        assert_eq!(reg.bias, 0.0);
        assert_eq!(reg.linear, 0.5);
        assert_eq!(reg.factor, 1.5);
    }

    #[test]
    fn reg_triple_rejects_garbage_component() {
        let err = "0,abc,1".parse::<RegSpec>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTripleComponent { .. }));
    }

    #[test]
    fn method_flags() {
        assert!(Method::Mcmc.samples() && Method::Mcmc.multilevel());
        assert!(!Method::Als.samples() && !Method::Als.multilevel());
    }
}
