//! Log-likelihood surfaces and their confidence-region conversion.

use std::f64::consts::PI;

use crate::data::model::{Grid, ShapeError, Surface2};
use crate::stats::resample::percentile;

// ---------------------------------------------------------------------------
// Likelihoods
// ---------------------------------------------------------------------------

/// Gaussian likelihood with Gaussian (heteroscedastic) errors:
/// `-½ Σ [ln(σ² + e_i²) + (x_i - μ)² / (σ² + e_i²)]`.
pub fn gaussgauss_log_l(xi: &[f64], ei: &[f64], mu: f64, sigma: f64) -> f64 {
    -0.5 * xi
        .iter()
        .zip(ei)
        .map(|(x, e)| {
            let s2 = sigma * sigma + e * e;
            s2.ln() + (x - mu).powi(2) / s2
        })
        .sum::<f64>()
}

/// Cauchy likelihood: `(n-1) ln γ - Σ ln(γ² + (x_i - μ)²)`.
pub fn cauchy_log_l(xi: &[f64], mu: f64, gamma: f64) -> f64 {
    let n = xi.len() as f64;
    (n - 1.0) * gamma.ln() - xi.iter().map(|x| (gamma * gamma + (x - mu).powi(2)).ln()).sum::<f64>()
}

/// Median and half interquartile range: point estimates of a Cauchy
/// location and scale.
pub fn estimate_mu_gamma(xi: &[f64]) -> (f64, f64) {
    let mut sorted = xi.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = |p| crate::stats::resample::percentile_sorted(&sorted, p);
    (q(50.0), 0.5 * (q(75.0) - q(25.0)))
}

/// χ² log-likelihood of a line `y = a x + b` for a single point.
pub fn line_point_log_l(a: f64, b: f64, x: f64, y: f64, dy: f64) -> f64 {
    -((a * x + b - y) / dy).powi(2)
}

/// Total-least-squares log-likelihood of the line parameterised by its
/// normal vector `v` (the point of the line closest to the origin) for
/// points with covariances packed as `[σx², σxy, σy²]`.
pub fn tls_log_l(v: (f64, f64), points: &[(f64, f64)], covs: &[[f64; 3]]) -> f64 {
    let norm = (v.0 * v.0 + v.1 * v.1).sqrt();
    let (hx, hy) = (v.0 / norm, v.1 / norm);
    points
        .iter()
        .zip(covs)
        .map(|(&(x, y), &[sxx, sxy, syy])| {
            let delta = x * hx + y * hy - norm;
            let s2 = hx * hx * sxx + 2.0 * hx * hy * sxy + hy * hy * syy;
            -0.5 * (2.0 * PI * s2).ln() - 0.5 * delta * delta / s2
        })
        .sum()
}

/// Line slope and intercept from the TLS normal vector.
pub fn slope_intercept(v: (f64, f64)) -> (f64, f64) {
    let b = (v.0 * v.0 + v.1 * v.1) / v.1;
    let m = -v.0 / v.1;
    (m, b)
}

/// Inverse of [`slope_intercept`].
pub fn normal_vector(m: f64, b: f64) -> (f64, f64) {
    let denom = 1.0 + m * m;
    (-b * m / denom, b / denom)
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// Evaluate a log-likelihood over a parameter grid, shifted so the peak
/// sits at zero.
pub fn log_l_surface(x: &Grid, y: &Grid, log_l: impl Fn(f64, f64) -> f64) -> Surface2 {
    let surface = Surface2::from_fn(x, y, log_l);
    let peak = surface.max();
    if peak.is_finite() {
        surface.map(|v| v - peak)
    } else {
        surface
    }
}

/// Replace each value with the probability mass enclosed by the region of
/// higher likelihood: `0.683`, `0.955` and `0.997` then trace the 1, 2
/// and 3σ regions.
pub fn convert_to_stdev(log_l: &Surface2) -> Result<Surface2, ShapeError> {
    let values = log_l.values();
    let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut cumulative = vec![0.0; values.len()];
    let mut acc = 0.0;
    for &i in &order {
        let l = (values[i] - peak).exp();
        if l.is_finite() {
            acc += l;
        }
        cumulative[i] = acc;
    }
    if acc > 0.0 {
        cumulative.iter_mut().for_each(|c| *c /= acc);
    }
    log_l.with_values(cumulative)
}

/// Normalised marginal distributions of a likelihood surface: along x
/// (summing over y) and along y (summing over x), each integrating to one.
pub fn marginals(likelihood: &Surface2) -> (Vec<f64>, Vec<f64>) {
    let normalise = |mut v: Vec<f64>, step: f64| {
        let total: f64 = v.iter().sum::<f64>() * step;
        if total > 0.0 {
            v.iter_mut().for_each(|p| *p /= total);
        }
        v
    };
    (
        normalise(likelihood.sum_over_y(), likelihood.x().step()),
        normalise(likelihood.sum_over_x(), likelihood.y().step()),
    )
}

/// Running integral of a density sampled with spacing `step`.
pub fn cumulative(density: &[f64], step: f64) -> Vec<f64> {
    density
        .iter()
        .scan(0.0, |acc, p| {
            *acc += p * step;
            Some(*acc)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Covariance geometry
// ---------------------------------------------------------------------------

/// Principal axes of a 2-D covariance: `(σ1, σ2, α)` with `α` the angle of
/// the major axis in radians.
pub fn principal_axes(sigma_x: f64, sigma_y: f64, rho_xy: f64) -> (f64, f64, f64) {
    let sxy = rho_xy * sigma_x * sigma_y;
    let alpha = 0.5 * (2.0 * sxy).atan2(sigma_x * sigma_x - sigma_y * sigma_y);
    let t1 = 0.5 * (sigma_x * sigma_x + sigma_y * sigma_y);
    let t2 = (0.25 * (sigma_x * sigma_x - sigma_y * sigma_y).powi(2) + sxy * sxy).sqrt();
    ((t1 + t2).sqrt(), (t1 - t2).max(0.0).sqrt(), alpha)
}

/// Confidence levels of a sample summarised by percentiles, e.g. the
/// central 68% interval `(16, 84)`.
pub fn interval(values: &[f64], lo: f64, hi: f64) -> (f64, f64) {
    (percentile(values, lo), percentile(values, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussgauss_peaks_near_truth() {
        let xi = [0.9, 1.1, 1.0, 0.95, 1.05];
        let ei = [0.1; 5];
        let g_mu = Grid::linspace(0.0, 2.0, 201).unwrap();
        let g_sigma = Grid::linspace(0.01, 1.0, 100).unwrap();
        let surf = log_l_surface(&g_mu, &g_sigma, |mu, s| gaussgauss_log_l(&xi, &ei, mu, s));
        assert_eq!(surf.shape(), (100, 201));
        assert_eq!(surf.max(), 0.0);
        let (mu, _) = surf.argmax();
        assert_relative_eq!(mu, 1.0, epsilon = 0.011);
    }

    #[test]
    fn stdev_levels_are_monotone_and_bounded() {
        let g = Grid::linspace(-4.0, 4.0, 81).unwrap();
        let surf = log_l_surface(&g, &g, |x, y| -0.5 * (x * x + y * y));
        let s = convert_to_stdev(&surf).unwrap();
        let (ix, iy) = (40, 40);
        assert!(s.at(ix, iy) < 0.01);
        assert!(s.at(0, 0) > 0.999);
        assert_relative_eq!(s.max(), 1.0);
        // For a 2-D Gaussian the 1σ radius encloses 1 - e^{-1/2} of mass.
        let r = s.at(50, 40);
        assert_relative_eq!(r, 1.0 - (-0.5f64).exp(), epsilon = 0.03);
    }

    #[test]
    fn tls_parameterisation_roundtrips() {
        let (m, b) = (2.2, 30.0);
        let (m2, b2) = slope_intercept(normal_vector(m, b));
        assert_relative_eq!(m, m2, epsilon = 1e-12);
        assert_relative_eq!(b, b2, epsilon = 1e-9);
    }

    #[test]
    fn tls_prefers_the_true_line() {
        let pts: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let covs = vec![[1.0, 0.0, 1.0]; pts.len()];
        let good = tls_log_l(normal_vector(2.0, 1.0), &pts, &covs);
        let bad = tls_log_l(normal_vector(2.5, 1.0), &pts, &covs);
        assert!(good > bad);
    }

    #[test]
    fn principal_axes_of_diagonal() {
        let (s1, s2, a) = principal_axes(3.0, 1.0, 0.0);
        assert_relative_eq!(s1, 3.0);
        assert_relative_eq!(s2, 1.0);
        assert_relative_eq!(a, 0.0);
    }

    #[test]
    fn cauchy_estimates_and_marginals() {
        let (mu, gamma) = estimate_mu_gamma(&[-1.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(mu, 1.0);
        assert_eq!(gamma, 1.0);

        let g = Grid::linspace(-3.0, 3.0, 61).unwrap();
        let gg = Grid::linspace(0.1, 5.0, 50).unwrap();
        let like = Surface2::from_fn(&g, &gg, |m, s| cauchy_log_l(&[0.0, 0.5], m, s).exp());
        let (pmu, pgamma) = marginals(&like);
        assert_eq!(pmu.len(), 61);
        assert_eq!(pgamma.len(), 50);
        let c = cumulative(&pmu, g.step());
        assert_relative_eq!(*c.last().unwrap(), 1.0, epsilon = 1e-9);
    }
}
