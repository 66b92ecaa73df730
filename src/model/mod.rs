//! Model state and configuration.
//!
//! - [`FmModel`]: bias, linear weights, and pairwise factor matrix
//! - [`FmConfig`]: validated training configuration (builder pattern)
//! - [`DimSpec`] / [`RegSpec`]: parsed `k0,k1,k2` / `r0,r1,r2` triples

mod config;
mod fm;

pub use config::{ConfigError, DimSpec, FmConfig, Method, RegSpec, TaskKind};
pub use fm::FmModel;
