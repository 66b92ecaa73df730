//! Gibbs sweeps over all model parameters.
//!
//! One [`GibbsSampler::sweep`] draws, in order: the noise precision, the
//! bias, the weight hyperpriors and weights, then the factor hyperpriors
//! and factors one dimension at a time. The order is load-bearing — every
//! posterior conditions on the freshly updated state of the earlier steps.
//!
//! Per-coordinate draws read the [`TermCache`] to reconstruct the
//! prediction without the coordinate's current contribution, then patch the
//! cache by the committed delta. That keeps each draw at O(nonzeros of the
//! coordinate's feature) instead of O(dataset).
//!
//! Draws are strictly sequential within a sweep: patches are not
//! commutative-safe across coordinates that share samples.
//!
//! # Modes
//!
//! Two orthogonal flags span four estimation variants:
//!
//! - `do_sample`: stochastic draws (MCMC) vs. posterior means (one
//!   Gauss-Seidel sweep of alternating least squares);
//! - `do_multilevel`: hyperpriors re-estimated each sweep vs. pinned to the
//!   configured regularization constants.

use crate::data::{FeatureGrouping, SparseDataset};
use crate::model::FmModel;

use super::cache::TermCache;
use super::priors::{clamp_precision, HierarchicalPriors};
use super::rng::SamplerRng;

/// Commit rule for degenerate posterior draws.
///
/// Ill-conditioned posteriors (for instance a feature appearing in no
/// samples with zero regularization) can produce NaN or infinite draws.
/// Those commit as exactly `0.0`; the corresponding cache patch then uses
/// the committed value. This is deliberate local recovery, not an error.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Aggregate mutable state for one sweep.
///
/// The sampler owns no model state itself; each sweep receives exclusive
/// references to everything it mutates.
pub struct SweepContext<'a> {
    /// Model parameters, updated in place.
    pub model: &'a mut FmModel,
    /// Hyperprior state, updated in place.
    pub priors: &'a mut HierarchicalPriors,
    /// Training-set term cache (residuals), patched after every draw.
    pub cache: &'a mut TermCache,
    /// Training data, borrowed read-only.
    pub data: &'a SparseDataset,
    /// Feature-to-group assignment.
    pub groups: &'a FeatureGrouping,
}

/// Gibbs sampler for FM parameter estimation.
#[derive(Debug)]
pub struct GibbsSampler {
    rng: SamplerRng,
    do_sample: bool,
    do_multilevel: bool,
    /// Bias prior precision; forced to 0 in multilevel mode where all
    /// regularization is estimated.
    bias_reg: f64,
}

impl GibbsSampler {
    /// Create a sampler.
    ///
    /// `bias_reg` is the fixed bias regularization for non-multilevel runs;
    /// multilevel runs ignore it.
    pub fn new(do_sample: bool, do_multilevel: bool, bias_reg: f64, seed: Option<u64>) -> Self {
        Self {
            rng: SamplerRng::new(seed),
            do_sample,
            do_multilevel,
            bias_reg: if do_multilevel { 0.0 } else { bias_reg },
        }
    }

    /// Whether draws are stochastic.
    #[inline]
    pub fn samples(&self) -> bool {
        self.do_sample
    }

    /// Initialize weights and factors with `N(0, stddev²)` draws.
    ///
    /// Consumes the weight draws before the factor draws so a fixed seed
    /// pins the entire initialization.
    pub fn init_model(&mut self, model: &mut FmModel, stddev: f64) {
        if model.has_weights() {
            for i in 0..model.n_features() {
                let w = self.rng.gaussian(0.0, stddev);
                model.set_weight(i, w);
            }
        }
        for f in 0..model.n_factors() {
            for i in 0..model.n_features() {
                let v = self.rng.gaussian(0.0, stddev);
                model.set_factor(f, i, v);
            }
        }
    }

    /// Run one full sweep over all parameters.
    pub fn sweep(&mut self, ctx: &mut SweepContext<'_>) {
        self.draw_noise_precision(ctx);

        if ctx.model.has_bias() {
            self.draw_bias(ctx);
        }

        if ctx.model.has_weights() {
            self.draw_weight_precisions(ctx);
            self.draw_weight_means(ctx);
            self.draw_weights(ctx);
        }

        if ctx.model.n_factors() > 0 {
            self.draw_factor_precisions(ctx);
            self.draw_factor_means(ctx);
            for f in 0..ctx.model.n_factors() {
                self.draw_factor_dim(ctx, f);
            }
        }
    }

    /// Stochastic draw or posterior mean, per mode.
    #[inline]
    fn draw(&mut self, mean: f64, variance: f64) -> f64 {
        if self.do_sample {
            self.rng.gaussian(mean, variance.sqrt())
        } else {
            mean
        }
    }

    // =========================================================================
    // Step 1: noise precision
    // =========================================================================

    fn draw_noise_precision(&mut self, ctx: &mut SweepContext<'_>) {
        if !self.do_multilevel {
            ctx.priors.alpha = ctx.priors.alpha_0;
            return;
        }
        let n = ctx.data.n_samples() as f64;
        let shape = (ctx.priors.alpha_0 + n) / 2.0;
        let rate: f64 = ctx.cache.error().iter().map(|e| e * e).sum::<f64>() / 2.0;
        ctx.priors.alpha = clamp_precision(self.rng.gamma(shape, rate));
    }

    // =========================================================================
    // Step 2: bias
    // =========================================================================

    fn draw_bias(&mut self, ctx: &mut SweepContext<'_>) {
        let n = ctx.data.n_samples() as f64;
        let alpha = ctx.priors.alpha;
        let bias_old = ctx.model.bias().expect("bias enabled");

        // Residual sum with the current bias contribution removed.
        let sum_without: f64 = ctx.cache.error().iter().sum::<f64>() - n * bias_old;

        let variance = 1.0 / (self.bias_reg + alpha * n);
        let mean = -variance * (alpha * sum_without - ctx.priors.bias_mean_0 * self.bias_reg);

        let bias_new = finite_or_zero(self.draw(mean, variance));
        ctx.model.set_bias(bias_new);
        ctx.cache.shift_error(bias_old - bias_new);
    }

    // =========================================================================
    // Step 3: weight hyperpriors
    // =========================================================================

    fn draw_weight_precisions(&mut self, ctx: &mut SweepContext<'_>) {
        if !self.do_multilevel {
            return;
        }
        let priors = &mut *ctx.priors;
        let weights = ctx.model.weights().expect("weights enabled");

        // Per-group squared deviation from the current group mean.
        let mut rate = vec![0.0f64; ctx.groups.n_groups()];
        for (i, &w) in weights.iter().enumerate() {
            let g = ctx.groups.group_of(i);
            let d = w - priors.w_mu[g];
            rate[g] += d * d;
        }

        for g in 0..ctx.groups.n_groups() {
            let mu_dev = priors.w_mu[g] - priors.mu_0;
            let gamma_n = priors.beta_0 * mu_dev * mu_dev + priors.gamma_0 + rate[g];
            let alpha_n = priors.alpha_0 + ctx.groups.counts()[g] as f64 + 1.0;
            let drawn = if self.do_sample {
                self.rng.gamma(alpha_n / 2.0, gamma_n / 2.0)
            } else {
                alpha_n / gamma_n
            };
            priors.w_lambda[g] = clamp_precision(drawn);
        }
    }

    fn draw_weight_means(&mut self, ctx: &mut SweepContext<'_>) {
        let priors = &mut *ctx.priors;
        if !self.do_multilevel {
            priors.w_mu.fill(priors.mu_0);
            return;
        }
        let weights = ctx.model.weights().expect("weights enabled");

        let mut sums = vec![0.0f64; ctx.groups.n_groups()];
        for (i, &w) in weights.iter().enumerate() {
            sums[ctx.groups.group_of(i)] += w;
        }

        for g in 0..ctx.groups.n_groups() {
            let n_g = ctx.groups.counts()[g] as f64;
            let mean = (sums[g] + priors.beta_0 * priors.mu_0) / (n_g + priors.beta_0);
            let variance = 1.0 / ((n_g + priors.beta_0) * priors.w_lambda[g]);
            priors.w_mu[g] = self.draw(mean, variance);
        }
    }

    // =========================================================================
    // Step 4: weights
    // =========================================================================

    fn draw_weights(&mut self, ctx: &mut SweepContext<'_>) {
        let alpha = ctx.priors.alpha;
        for i in 0..ctx.model.n_features() {
            let g = ctx.groups.group_of(i);
            let lambda = ctx.priors.w_lambda[g];
            let mu = ctx.priors.w_mu[g];
            let column = ctx.data.features().row(i);
            let w_old = ctx.model.weight(i);

            let mut sum_xe = 0.0f64;
            let mut sum_xx = 0.0f64;
            for (s, x) in column.iter() {
                sum_xe += x * ctx.cache.error()[s];
                sum_xx += x * x;
            }
            // Remove w_i's own contribution from the residual statistic.
            let mean_without = sum_xe - w_old * sum_xx;

            let variance = 1.0 / (lambda + alpha * sum_xx);
            let mean = -variance * (alpha * mean_without - mu * lambda);

            let w_new = finite_or_zero(self.draw(mean, variance));
            ctx.model.set_weight(i, w_new);
            ctx.cache.patch_error(column, w_old - w_new);
        }
    }

    // =========================================================================
    // Step 5: factor hyperpriors
    // =========================================================================

    fn draw_factor_precisions(&mut self, ctx: &mut SweepContext<'_>) {
        if !self.do_multilevel {
            return;
        }
        let priors = &mut *ctx.priors;
        let factors = ctx.model.factors();

        for f in 0..ctx.model.n_factors() {
            let mut rate = vec![0.0f64; ctx.groups.n_groups()];
            for (i, &v) in factors.row(f).iter().enumerate() {
                let g = ctx.groups.group_of(i);
                let d = v - priors.v_mu[[f, g]];
                rate[g] += d * d;
            }

            for g in 0..ctx.groups.n_groups() {
                let mu_dev = priors.v_mu[[f, g]] - priors.mu_0;
                let gamma_n = priors.beta_0 * mu_dev * mu_dev + priors.gamma_0 + rate[g];
                let alpha_n = priors.alpha_0 + ctx.groups.counts()[g] as f64 + 1.0;
                let drawn = if self.do_sample {
                    self.rng.gamma(alpha_n / 2.0, gamma_n / 2.0)
                } else {
                    alpha_n / gamma_n
                };
                priors.v_lambda[[f, g]] = clamp_precision(drawn);
            }
        }
    }

    fn draw_factor_means(&mut self, ctx: &mut SweepContext<'_>) {
        let priors = &mut *ctx.priors;
        if !self.do_multilevel {
            priors.v_mu.fill(priors.mu_0);
            return;
        }
        let factors = ctx.model.factors();

        for f in 0..ctx.model.n_factors() {
            let mut sums = vec![0.0f64; ctx.groups.n_groups()];
            for (i, &v) in factors.row(f).iter().enumerate() {
                sums[ctx.groups.group_of(i)] += v;
            }

            for g in 0..ctx.groups.n_groups() {
                let n_g = ctx.groups.counts()[g] as f64;
                let mean = (sums[g] + priors.beta_0 * priors.mu_0) / (n_g + priors.beta_0);
                let variance = 1.0 / ((n_g + priors.beta_0) * priors.v_lambda[[f, g]]);
                priors.v_mu[[f, g]] = self.draw(mean, variance);
            }
        }
    }

    // =========================================================================
    // Step 6: factors, one dimension at a time
    // =========================================================================

    fn draw_factor_dim(&mut self, ctx: &mut SweepContext<'_>, f: usize) {
        let alpha = ctx.priors.alpha;

        let mut scope = ctx.cache.factor_scope();
        scope.load_q(ctx.model.factors().row(f), ctx.data.features());

        for i in 0..ctx.model.n_features() {
            let g = ctx.groups.group_of(i);
            let lambda = ctx.priors.v_lambda[[f, g]];
            let mu = ctx.priors.v_mu[[f, g]];
            let column = ctx.data.features().row(i);
            let v_old = ctx.model.factor(f, i);

            // h_li = x_li * (q_l - v_fi x_li): the marginal contribution of
            // v_fi to the pairwise term for sample l.
            let mut sum_he = 0.0f64;
            let mut sum_hh = 0.0f64;
            {
                let (error, scratch) = scope.parts();
                for (s, x) in column.iter() {
                    let h = x * (scratch[s] - v_old * x);
                    sum_he += h * error[s];
                    sum_hh += h * h;
                }
            }
            let mean_without = sum_he - v_old * sum_hh;

            let variance = 1.0 / (lambda + alpha * sum_hh);
            let mean = -variance * (alpha * mean_without - mu * lambda);

            let v_new = finite_or_zero(self.draw(mean, variance));
            ctx.model.set_factor(f, i, v_new);

            // Patch both rows. h is rebuilt from the still-unpatched q-term,
            // then the linear q update follows.
            let delta = v_old - v_new;
            let (error, scratch) = scope.parts_mut();
            for (s, x) in column.iter() {
                let h = x * (scratch[s] - v_old * x);
                error[s] -= delta * h;
                scratch[s] -= delta * x;
            }
        }
        // scope drop restores the all-zero scratch invariant
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn residual_cache(model: &FmModel, data: &SparseDataset) -> TermCache {
        let mut cache = TermCache::new(data.n_samples());
        cache.recompute(model, data);
        cache.absorb_targets(data.targets());
        cache
    }

    #[test]
    fn finite_or_zero_guards_degenerate_values() {
        assert_eq!(finite_or_zero(1.5), 1.5);
        assert_eq!(finite_or_zero(-2.0), -2.0);
        assert_eq!(finite_or_zero(0.0), 0.0);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn point_estimate_weight_sweep_matches_ridge_step() {
        // Hand-computed Gauss-Seidel ridge step, lambda = 1:
        //   x0 = [1, 2, 0], x1 = [0, 1, 1], y = [1, 2, 1], w = [0, 0]
        //   w0 <- (1*1 + 2*2) / (1 + 5)          = 5/6
        //   w1 <- (1*(2 - 2*5/6) + 1*1) / (1+2)  = 4/9
        let data = SparseDataset::from_rows(
            2,
            &[
                vec![(0, 1.0)],
                vec![(0, 2.0), (1, 1.0)],
                vec![(1, 1.0)],
            ],
            vec![1.0, 2.0, 1.0],
        )
        .unwrap();
        let groups = FeatureGrouping::single(2);
        let mut model = FmModel::zeros(false, true, 0, 2);
        let mut priors = HierarchicalPriors::new(1, 0, 1.0, 0.0);
        let mut cache = residual_cache(&model, &data);

        let mut sampler = GibbsSampler::new(false, false, 0.0, Some(0));
        sampler.sweep(&mut SweepContext {
            model: &mut model,
            priors: &mut priors,
            cache: &mut cache,
            data: &data,
            groups: &groups,
        });

        assert_abs_diff_eq!(model.weight(0), 5.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.weight(1), 4.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn bias_only_point_estimate_hits_target_mean() {
        // Targets [1, 0], bias only, reg0 = 0: posterior mean is 0.5.
        let data = SparseDataset::from_rows(
            2,
            &[vec![(0, 1.0)], vec![(1, 1.0)]],
            vec![1.0, 0.0],
        )
        .unwrap();
        let groups = FeatureGrouping::single(2);
        let mut model = FmModel::zeros(true, false, 0, 2);
        let mut priors = HierarchicalPriors::new(1, 0, 0.0, 0.0);
        let mut cache = residual_cache(&model, &data);

        let mut sampler = GibbsSampler::new(false, false, 0.0, Some(0));
        for _ in 0..3 {
            sampler.sweep(&mut SweepContext {
                model: &mut model,
                priors: &mut priors,
                cache: &mut cache,
                data: &data,
                groups: &groups,
            });
        }
        assert_abs_diff_eq!(model.bias().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_draw_commits_exact_zero() {
        // Feature 1 appears in no sample; with zero regularization its
        // posterior variance is infinite and the mean is NaN.
        let data = SparseDataset::from_rows(2, &[vec![(0, 1.0)]], vec![1.0]).unwrap();
        let groups = FeatureGrouping::single(2);
        let mut model = FmModel::zeros(false, true, 0, 2);
        model.set_weight(1, 5.0);
        let mut priors = HierarchicalPriors::new(1, 0, 0.0, 0.0);
        let mut cache = residual_cache(&model, &data);

        let mut sampler = GibbsSampler::new(false, false, 0.0, Some(0));
        sampler.draw_weights(&mut SweepContext {
            model: &mut model,
            priors: &mut priors,
            cache: &mut cache,
            data: &data,
            groups: &groups,
        });

        assert_eq!(model.weight(1), 0.0);
        // The committed zero leaves an empty-column patch as a no-op, so the
        // cache still matches a fresh residual computation.
        let fresh = model.predict(data.samples());
        assert_eq!(cache.error()[0], fresh[0] - data.targets()[0]);
    }

    #[test]
    fn patched_cache_matches_recomputed_residuals() {
        // After a full MCMC sweep the incrementally patched residuals must
        // agree with a from-scratch recompute.
        let data = SparseDataset::from_rows(
            3,
            &[
                vec![(0, 1.0), (2, 0.5)],
                vec![(1, 1.0)],
                vec![(0, 2.0), (1, 1.0), (2, 1.0)],
                vec![(2, 1.5)],
            ],
            vec![1.0, -0.5, 2.0, 0.25],
        )
        .unwrap();
        let groups = FeatureGrouping::single(3);
        let mut model = FmModel::zeros(true, true, 2, 3);
        let mut priors = HierarchicalPriors::new(1, 2, 0.0, 0.0);
        let mut sampler = GibbsSampler::new(true, true, 0.0, Some(11));
        sampler.init_model(&mut model, 0.1);

        let mut cache = residual_cache(&model, &data);
        for _ in 0..3 {
            sampler.sweep(&mut SweepContext {
                model: &mut model,
                priors: &mut priors,
                cache: &mut cache,
                data: &data,
                groups: &groups,
            });
        }

        let fresh = model.predict(data.samples());
        for (s, (&e, &y)) in cache
            .error()
            .iter()
            .zip(data.targets())
            .enumerate()
        {
            assert_abs_diff_eq!(e + y, fresh[s], epsilon = 1e-9);
        }
    }

    #[test]
    fn seeded_sweeps_are_reproducible() {
        let data = SparseDataset::from_rows(
            2,
            &[vec![(0, 1.0)], vec![(1, 1.0)], vec![(0, 1.0), (1, 1.0)]],
            vec![1.0, 0.0, 1.0],
        )
        .unwrap();
        let groups = FeatureGrouping::single(2);

        let run = || {
            let mut model = FmModel::zeros(true, true, 2, 2);
            let mut priors = HierarchicalPriors::new(1, 2, 0.0, 0.0);
            let mut sampler = GibbsSampler::new(true, true, 0.0, Some(99));
            sampler.init_model(&mut model, 0.1);
            let mut cache = residual_cache(&model, &data);
            for _ in 0..5 {
                sampler.sweep(&mut SweepContext {
                    model: &mut model,
                    priors: &mut priors,
                    cache: &mut cache,
                    data: &data,
                    groups: &groups,
                });
            }
            model
        };

        assert_eq!(run(), run());
    }
}
