//! Metropolis–Hastings sampling under uniform box priors, and the matching
//! maximum a-posteriori estimate.

use serde::{Deserialize, Serialize};

use crate::data::synth::SeededRng;
use crate::error::{Error, Result};
use crate::stats::optimize::{FminOptions, fmin};

/// One sampled parameter with a uniform prior on `(lower, upper)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub start: f64,
    /// Initial proposal width; adapted during burn-in.
    pub scale: f64,
}

impl Parameter {
    pub fn new(name: &str, lower: f64, upper: f64, start: f64) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
            start,
            scale: (upper - lower).abs() * 0.01,
        }
    }

    fn in_support(&self, v: f64) -> bool {
        v > self.lower && v < self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub n_iter: usize,
    pub burn: usize,
    /// Proposal widths are retuned every `tune_interval` burn-in steps.
    pub tune_interval: usize,
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            n_iter: 20_000,
            burn: 2_000,
            tune_interval: 100,
            seed: 0,
        }
    }
}

/// Post burn-in samples, one column per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traces {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Fraction of accepted proposals per parameter after burn-in.
    pub acceptance: Vec<f64>,
}

impl Traces {
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parameter vector of the `i`-th kept sample.
    pub fn sample(&self, i: usize) -> Option<Vec<f64>> {
        self.values.iter().map(|col| col.get(i).copied()).collect()
    }

    /// The kept sample with the highest `log_like`.
    pub fn best_by<F: Fn(&[f64]) -> f64>(&self, log_like: F) -> Option<Vec<f64>> {
        (0..self.len())
            .filter_map(|i| self.sample(i))
            .map(|theta| (log_like(&theta), theta))
            .filter(|(lp, _)| !lp.is_nan())
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, theta)| theta)
    }
}

fn log_posterior<F: Fn(&[f64]) -> f64>(log_like: &F, params: &[Parameter], theta: &[f64]) -> f64 {
    if params.iter().zip(theta).all(|(p, &v)| p.in_support(v)) {
        log_like(theta)
    } else {
        f64::NEG_INFINITY
    }
}

/// Acceptance-rate driven rescaling of a proposal width.
fn tuned_scale(scale: f64, rate: f64) -> f64 {
    let factor = match rate {
        r if r < 0.001 => 0.1,
        r if r < 0.05 => 0.5,
        r if r < 0.2 => 0.9,
        r if r > 0.95 => 10.0,
        r if r > 0.75 => 2.0,
        r if r > 0.5 => 1.1,
        _ => 1.0,
    };
    scale * factor
}

/// Component-wise random-walk Metropolis. Each iteration proposes a
/// Gaussian step for every parameter in turn.
pub fn metropolis<F>(log_like: F, params: &[Parameter], config: SamplerConfig) -> Result<Traces>
where
    F: Fn(&[f64]) -> f64,
{
    if config.burn >= config.n_iter {
        return Err(Error::Numerical(format!(
            "burn-in of {} leaves no samples from {} iterations",
            config.burn, config.n_iter
        )));
    }
    let mut theta: Vec<f64> = params.iter().map(|p| p.start).collect();
    let mut current = log_posterior(&log_like, params, &theta);
    if !current.is_finite() {
        return Err(Error::Numerical("sampler start point has zero posterior".into()));
    }

    let mut rng = SeededRng::new(config.seed);
    let mut scales: Vec<f64> = params.iter().map(|p| p.scale).collect();
    let n_keep = config.n_iter - config.burn;
    let mut values = vec![Vec::with_capacity(n_keep); params.len()];
    let mut accepted = vec![0usize; params.len()];
    let mut window = vec![0usize; params.len()];

    for it in 0..config.n_iter {
        for j in 0..params.len() {
            let old = theta[j];
            theta[j] = rng.normal(old, scales[j]);
            let proposed = log_posterior(&log_like, params, &theta);
            if proposed - current >= rng.random().ln() {
                current = proposed;
                window[j] += 1;
                if it >= config.burn {
                    accepted[j] += 1;
                }
            } else {
                theta[j] = old;
            }
        }

        if it < config.burn && config.tune_interval > 0 && (it + 1) % config.tune_interval == 0 {
            for j in 0..params.len() {
                let rate = window[j] as f64 / config.tune_interval as f64;
                scales[j] = tuned_scale(scales[j], rate);
                window[j] = 0;
            }
        }
        if it >= config.burn {
            for (col, &v) in values.iter_mut().zip(&theta) {
                col.push(v);
            }
        }
    }

    let acceptance: Vec<f64> = accepted.iter().map(|&a| a as f64 / n_keep as f64).collect();
    log::debug!("metropolis: {n_keep} samples kept, acceptance {acceptance:?}");
    Ok(Traces {
        names: params.iter().map(|p| p.name.clone()).collect(),
        values,
        acceptance,
    })
}

/// Maximise the posterior with Nelder–Mead from `x0`. Multimodal
/// likelihoods need `x0` near the mode, e.g. the best sampled point.
pub fn map_estimate<F>(log_like: F, params: &[Parameter], x0: &[f64]) -> Result<Vec<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if x0.len() != params.len() {
        return Err(Error::Numerical(format!(
            "MAP start has {} values for {} parameters",
            x0.len(),
            params.len()
        )));
    }
    if !log_posterior(&log_like, params, x0).is_finite() {
        return Err(Error::Numerical("MAP start point has zero posterior".into()));
    }
    let opts = FminOptions {
        xtol: 1e-8,
        ftol: 1e-8,
        max_iter: 20_000,
    };
    Ok(fmin(
        |theta| {
            let lp = log_posterior(&log_like, params, theta);
            if lp.is_finite() { -lp } else { f64::INFINITY }
        },
        x0,
        opts,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_target(theta: &[f64]) -> f64 {
        -0.5 * ((theta[0] - 2.0) / 0.5).powi(2) - 0.5 * ((theta[1] + 1.0) / 2.0).powi(2)
    }

    fn params() -> Vec<Parameter> {
        vec![Parameter::new("a", -10.0, 10.0, 0.0), Parameter::new("b", -10.0, 10.0, 0.0)]
    }

    #[test]
    fn recovers_gaussian_moments() {
        let config = SamplerConfig {
            n_iter: 20_000,
            burn: 2_000,
            tune_interval: 100,
            seed: 3,
        };
        let traces = metropolis(gaussian_target, &params(), config).unwrap();
        assert_eq!(traces.len(), 18_000);
        let a = traces.get("a").unwrap();
        let mean = a.iter().sum::<f64>() / a.len() as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean {mean}");
        let sd = crate::stats::resample::std_dev(traces.get("b").unwrap());
        assert!((sd - 2.0).abs() < 0.3, "sd {sd}");
        assert!(traces.acceptance.iter().all(|&r| r > 0.05 && r < 0.95));
    }

    #[test]
    fn same_seed_same_chain() {
        let config = SamplerConfig {
            n_iter: 500,
            burn: 100,
            tune_interval: 50,
            seed: 9,
        };
        let a = metropolis(gaussian_target, &params(), config).unwrap();
        let b = metropolis(gaussian_target, &params(), config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn map_finds_mode_and_bad_start_is_rejected() {
        let best = map_estimate(gaussian_target, &params(), &[0.0, 0.0]).unwrap();
        assert!((best[0] - 2.0).abs() < 1e-3);
        assert!((best[1] + 1.0).abs() < 1e-3);

        assert!(map_estimate(gaussian_target, &params(), &[0.0]).is_err());
        assert!(map_estimate(gaussian_target, &params(), &[20.0, 0.0]).is_err());
        let outside = vec![Parameter::new("a", 0.0, 1.0, 5.0)];
        assert!(metropolis(|_| 0.0, &outside, SamplerConfig::default()).is_err());
    }

    /// Two modes: a shallow one at -3 next to the start and the global one
    /// at +3.
    fn two_modes(theta: &[f64]) -> f64 {
        let x = theta[0];
        let near = (-0.5 * ((x + 3.0) / 0.5).powi(2)).exp();
        let far = 10.0 * (-0.5 * ((x - 3.0) / 0.5).powi(2)).exp();
        (near + far + 1e-300).ln()
    }

    #[test]
    fn map_from_best_sample_reaches_global_mode() {
        let params = vec![Parameter::new("x", -10.0, 10.0, -3.0)];
        let from_start = map_estimate(two_modes, &params, &[-3.0]).unwrap();
        assert!((from_start[0] + 3.0).abs() < 1e-2, "{from_start:?}");

        let config = SamplerConfig {
            n_iter: 20_000,
            burn: 2_000,
            tune_interval: 0,
            seed: 1,
        };
        let mut wide = params.clone();
        wide[0].scale = 2.0;
        let traces = metropolis(two_modes, &wide, config).unwrap();
        let best = traces.best_by(two_modes).unwrap();
        let map = map_estimate(two_modes, &params, &best).unwrap();
        assert!((map[0] - 3.0).abs() < 1e-2, "{map:?}");
        assert!(two_modes(&map) >= two_modes(&from_start));
    }

    #[test]
    fn sample_rows_follow_parameter_order() {
        let traces = Traces {
            names: vec!["a".into(), "b".into()],
            values: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            acceptance: vec![1.0, 1.0],
        };
        assert_eq!(traces.sample(1), Some(vec![2.0, 4.0]));
        assert_eq!(traces.sample(2), None);
        assert_eq!(traces.best_by(|t| t[0] + t[1]), Some(vec![2.0, 4.0]));
    }
}
