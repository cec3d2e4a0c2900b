//! Extreme deconvolution: a Gaussian mixture fitted to noisy 2-D data with
//! a known error covariance per point (Bovy, Hogg & Roweis 2011).

use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::data::synth::SeededRng;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XdConfig {
    pub n_components: usize,
    pub max_iter: usize,
    /// Stop once the mean log-likelihood improves by less than this.
    pub tol: f64,
    /// Added to each component covariance's diagonal.
    pub regularization: f64,
    pub seed: u64,
}

impl Default for XdConfig {
    fn default() -> Self {
        Self {
            n_components: 10,
            max_iter: 500,
            tol: 1e-5,
            regularization: 1e-6,
            seed: 0,
        }
    }
}

/// A fitted mixture. Plain arrays so the fit can be cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XdMixture {
    pub alpha: Vec<f64>,
    pub mu: Vec<[f64; 2]>,
    /// Row-major `[[vxx, vxy], [vxy, vyy]]`.
    pub v: Vec<[[f64; 2]; 2]>,
    pub log_l: f64,
    pub iterations: usize,
}

fn to_matrix(m: &[[f64; 2]; 2]) -> Matrix2<f64> {
    Matrix2::new(m[0][0], m[0][1], m[1][0], m[1][1])
}

fn from_matrix(m: &Matrix2<f64>) -> [[f64; 2]; 2] {
    [[m[(0, 0)], m[(0, 1)]], [m[(1, 0)], m[(1, 1)]]]
}

/// `ln N(d | 0, t)` for a 2×2 covariance.
fn ln_gauss(d: &Vector2<f64>, t: &Matrix2<f64>) -> Option<(f64, Matrix2<f64>)> {
    let det = t.determinant();
    if !(det > 0.0) {
        return None;
    }
    let inv = t.try_inverse()?;
    let chi2 = (d.transpose() * inv * d)[(0, 0)];
    Some((-0.5 * chi2 - 0.5 * det.ln() - (2.0 * std::f64::consts::PI).ln(), inv))
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Fit `config.n_components` Gaussians to `points` with per-point error
/// covariances `errors` (same layout as [`XdMixture::v`]).
pub fn fit(points: &[[f64; 2]], errors: &[[[f64; 2]; 2]], config: XdConfig) -> Result<XdMixture> {
    let n = points.len();
    let k = config.n_components;
    if n == 0 || errors.len() != n || k == 0 || k > n {
        return Err(Error::Numerical(format!(
            "extreme deconvolution of {n} points ({} error matrices) into {k} components",
            errors.len()
        )));
    }
    let x: Vec<Vector2<f64>> = points.iter().map(|p| Vector2::new(p[0], p[1])).collect();
    let s: Vec<Matrix2<f64>> = errors.iter().map(to_matrix).collect();

    // Initial means: distinct random data points; shared data covariance.
    let mut rng = SeededRng::new(config.seed);
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    while chosen.len() < k {
        let i = rng.randint(n);
        if !chosen.contains(&i) {
            chosen.push(i);
        }
    }
    let mean = x.iter().fold(Vector2::zeros(), |a, b| a + b) / n as f64;
    let cov = x
        .iter()
        .map(|p| (p - mean) * (p - mean).transpose())
        .fold(Matrix2::zeros(), |a, b| a + b)
        / n as f64;
    let mut alpha = vec![1.0 / k as f64; k];
    let mut mu: Vec<Vector2<f64>> = chosen.iter().map(|&i| x[i]).collect();
    let mut v: Vec<Matrix2<f64>> = vec![cov; k];
    let reg = Matrix2::identity() * config.regularization;

    let mut log_l = f64::NEG_INFINITY;
    let mut iterations = 0;
    let mut q = vec![0.0; k];
    let mut b = vec![Vector2::zeros(); k];
    let mut bb = vec![Matrix2::zeros(); k];

    for it in 0..config.max_iter {
        iterations = it + 1;
        let mut sum_q = vec![0.0; k];
        let mut sum_b = vec![Vector2::zeros(); k];
        let mut sum_bb = vec![Matrix2::zeros(); k];
        let mut total = 0.0;

        for (xi, si) in x.iter().zip(&s) {
            for j in 0..k {
                let t = v[j] + si;
                let d = xi - mu[j];
                match ln_gauss(&d, &t) {
                    Some((lg, t_inv)) => {
                        q[j] = alpha[j].ln() + lg;
                        let gain = v[j] * t_inv;
                        b[j] = mu[j] + gain * d;
                        bb[j] = v[j] - gain * v[j];
                    }
                    None => q[j] = f64::NEG_INFINITY,
                }
            }
            let norm = log_sum_exp(&q);
            if !norm.is_finite() {
                return Err(Error::Numerical("mixture lost support for a data point".into()));
            }
            total += norm;
            for j in 0..k {
                let r = (q[j] - norm).exp();
                sum_q[j] += r;
                sum_b[j] += b[j] * r;
                sum_bb[j] += (b[j] * b[j].transpose() + bb[j]) * r;
            }
        }

        for j in 0..k {
            if sum_q[j] <= f64::MIN_POSITIVE {
                continue;
            }
            alpha[j] = sum_q[j] / n as f64;
            mu[j] = sum_b[j] / sum_q[j];
            v[j] = sum_bb[j] / sum_q[j] - mu[j] * mu[j].transpose() + reg;
        }

        let mean_log_l = total / n as f64;
        let improvement = mean_log_l - log_l;
        log_l = mean_log_l;
        if improvement.abs() < config.tol {
            break;
        }
    }
    log::info!("XD fit: {k} components, {iterations} iterations, mean log L {log_l:.4}");

    Ok(XdMixture {
        alpha,
        mu: mu.iter().map(|m| [m[0], m[1]]).collect(),
        v: v.iter().map(from_matrix).collect(),
        log_l,
        iterations,
    })
}

impl XdMixture {
    pub fn n_components(&self) -> usize {
        self.alpha.len()
    }

    /// Draw `n` points from the mixture.
    pub fn sample(&self, n: usize, rng: &mut SeededRng) -> Vec<[f64; 2]> {
        let mut cumulative = Vec::with_capacity(self.alpha.len());
        let mut acc = 0.0;
        for a in &self.alpha {
            acc += a;
            cumulative.push(acc);
        }
        let covs: Vec<DMatrix<f64>> = self
            .v
            .iter()
            .map(|m| DMatrix::from_row_slice(2, 2, &[m[0][0], m[0][1], m[1][0], m[1][1]]))
            .collect();
        (0..n)
            .map(|_| {
                let u = rng.random() * acc;
                let j = cumulative
                    .iter()
                    .position(|&c| u < c)
                    .unwrap_or(self.alpha.len() - 1);
                let draw = rng.multivariate_normal(&self.mu[j], &covs[j]);
                [draw[0], draw[1]]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(seed: u64) -> (Vec<[f64; 2]>, Vec<[[f64; 2]; 2]>) {
        let mut rng = SeededRng::new(seed);
        let mut pts = Vec::new();
        for &(cx, cy) in &[(0.0, 0.0), (10.0, 10.0)] {
            for _ in 0..300 {
                pts.push([rng.normal(cx, 1.0), rng.normal(cy, 1.0)]);
            }
        }
        let errs = vec![[[0.01, 0.0], [0.0, 0.01]]; pts.len()];
        (pts, errs)
    }

    #[test]
    fn separates_two_clusters() {
        let (pts, errs) = blobs(1);
        let config = XdConfig {
            n_components: 2,
            max_iter: 200,
            ..XdConfig::default()
        };
        let fit = fit(&pts, &errs, config).unwrap();
        let mut means = fit.mu.clone();
        means.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert!((means[0][0]).abs() < 0.3 && (means[1][0] - 10.0).abs() < 0.3);
        assert!((fit.alpha.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        for v in &fit.v {
            assert!((v[0][0] - 1.0).abs() < 0.3, "variance {}", v[0][0]);
        }
    }

    #[test]
    fn deconvolves_known_noise() {
        // Intrinsic variance 1, noise variance 1: the fit should recover ~1.
        let mut rng = SeededRng::new(2);
        let pts: Vec<[f64; 2]> = (0..2000)
            .map(|_| [rng.normal(0.0, 2f64.sqrt()), rng.normal(0.0, 2f64.sqrt())])
            .collect();
        let errs = vec![[[1.0, 0.0], [0.0, 1.0]]; pts.len()];
        let config = XdConfig {
            n_components: 1,
            ..XdConfig::default()
        };
        let fit = fit(&pts, &errs, config).unwrap();
        assert!((fit.v[0][0][0] - 1.0).abs() < 0.15, "vxx {}", fit.v[0][0][0]);
    }

    #[test]
    fn sampling_is_seeded() {
        let (pts, errs) = blobs(3);
        let config = XdConfig {
            n_components: 2,
            max_iter: 20,
            ..XdConfig::default()
        };
        let fit = fit(&pts, &errs, config).unwrap();
        let a = fit.sample(100, &mut SeededRng::new(0));
        let b = fit.sample(100, &mut SeededRng::new(0));
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn too_many_components_rejected() {
        assert!(fit(&[[0.0, 0.0]], &[[[1.0, 0.0], [0.0, 1.0]]], XdConfig::default()).is_err());
    }
}
