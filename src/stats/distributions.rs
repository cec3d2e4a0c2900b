//! Probability distributions with a common evaluation interface.

use std::f64::consts::PI;

/// A continuous distribution that can evaluate its density.
pub trait Density {
    fn pdf(&self, x: f64) -> f64;

    fn ln_pdf(&self, x: f64) -> f64 {
        self.pdf(x).ln()
    }

    /// Density over a slice of points.
    fn pdf_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.pdf(x)).collect()
    }
}

/// A discrete distribution over the integers. Non-integer or out-of-support
/// arguments have zero mass.
pub trait Mass {
    fn pmf(&self, k: f64) -> f64;

    fn pmf_all(&self, ks: &[f64]) -> Vec<f64> {
        ks.iter().map(|&k| self.pmf(k)).collect()
    }
}

// ---------------------------------------------------------------------------
// Continuous
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub mu: f64,
    pub sigma: f64,
}

impl Normal {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

impl Density for Normal {
    fn pdf(&self, x: f64) -> f64 {
        self.ln_pdf(x).exp()
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        -0.5 * z * z - self.sigma.ln() - 0.5 * (2.0 * PI).ln()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cauchy {
    pub mu: f64,
    pub gamma: f64,
}

impl Cauchy {
    pub fn new(mu: f64, gamma: f64) -> Self {
        Self { mu, gamma }
    }
}

impl Density for Cauchy {
    fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.gamma;
        1.0 / (PI * self.gamma * (1.0 + z * z))
    }
}

/// Uniform on `[left, left + width]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub left: f64,
    pub width: f64,
}

impl Uniform {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Uniform of width `w` centred on `mu`.
    pub fn centered(mu: f64, width: f64) -> Self {
        Self::new(mu - 0.5 * width, width)
    }
}

impl Density for Uniform {
    fn pdf(&self, x: f64) -> f64 {
        if x >= self.left && x <= self.left + self.width {
            1.0 / self.width
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Discrete
// ---------------------------------------------------------------------------

fn as_count(k: f64) -> Option<u64> {
    if k >= 0.0 && k.fract() == 0.0 && k.is_finite() {
        Some(k as u64)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poisson {
    pub mu: f64,
}

impl Poisson {
    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

impl Mass for Poisson {
    fn pmf(&self, k: f64) -> f64 {
        match as_count(k) {
            Some(k) => {
                let k = k as f64;
                (k * self.mu.ln() - self.mu - ln_gamma(k + 1.0)).exp()
            }
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binomial {
    pub n: u64,
    pub b: f64,
}

impl Binomial {
    pub fn new(n: u64, b: f64) -> Self {
        Self { n, b }
    }
}

impl Mass for Binomial {
    fn pmf(&self, k: f64) -> f64 {
        match as_count(k) {
            Some(k) if k <= self.n => {
                let kf = k as f64;
                let nf = self.n as f64;
                (ln_choose(self.n, k) + kf * self.b.ln() + (nf - kf) * (1.0 - self.b).ln()).exp()
            }
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Special functions
// ---------------------------------------------------------------------------

/// Natural log of Γ(x) for x > 0 (Lanczos, g = 7, n = 9).
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula.
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + G + 0.5;
    for (i, &c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// `ln C(n, k)`.
pub fn ln_choose(n: u64, k: u64) -> f64 {
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

// ---------------------------------------------------------------------------
// χ² goodness of fit
// ---------------------------------------------------------------------------

/// χ² of observations about their mean with a common error, per degree of
/// freedom, and its distance from 1 in units of `sqrt(2/(N-1))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chi2Summary {
    pub mean: f64,
    pub chi2: f64,
    pub chi2_dof: f64,
    pub n_sigma: f64,
}

pub fn chi2_about_mean(values: &[f64], sigma: f64) -> Chi2Summary {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let chi2: f64 = values.iter().map(|v| ((v - mean) / sigma).powi(2)).sum();
    let chi2_dof = chi2 / (n - 1.0);
    let spread = (2.0 / (n - 1.0)).sqrt();
    Chi2Summary {
        mean,
        chi2,
        chi2_dof,
        n_sigma: (chi2_dof - 1.0) / spread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ln_gamma_matches_factorials() {
        for (n, fact) in [(1u32, 1.0f64), (5, 24.0), (11, 3_628_800.0)] {
            assert_relative_eq!(ln_gamma(n as f64), fact.ln(), epsilon = 1e-10);
        }
        assert_relative_eq!(ln_gamma(0.5), PI.sqrt().ln(), epsilon = 1e-10);
    }

    #[test]
    fn densities_integrate_to_one() {
        let dx = 0.001;
        let xs: Vec<f64> = (0..20_000).map(|i| -10.0 + dx * i as f64).collect();
        for d in [&Normal::new(0.0, 1.0) as &dyn Density, &Uniform::centered(0.0, 2.0)] {
            let total: f64 = d.pdf_all(&xs).iter().sum::<f64>() * dx;
            assert_relative_eq!(total, 1.0, epsilon = 1e-2);
        }
        assert_relative_eq!(Cauchy::new(0.0, 1.0).pdf(0.0), 1.0 / PI);
    }

    #[test]
    fn masses_sum_to_one_and_vanish_off_support() {
        let ks: Vec<f64> = (-1..200).map(f64::from).collect();
        let p: f64 = Poisson::new(5.0).pmf_all(&ks).iter().sum();
        assert_relative_eq!(p, 1.0, epsilon = 1e-9);
        let b = Binomial::new(20, 0.6);
        let p: f64 = b.pmf_all(&ks).iter().sum();
        assert_relative_eq!(p, 1.0, epsilon = 1e-9);
        assert_eq!(b.pmf(21.0), 0.0);
        assert_eq!(b.pmf(-1.0), 0.0);
        assert_eq!(Poisson::new(1.0).pmf(1.5), 0.0);
    }

    #[test]
    fn chi2_of_exact_errors() {
        let values = [9.0, 11.0, 9.0, 11.0];
        let s = chi2_about_mean(&values, 1.0);
        assert_relative_eq!(s.mean, 10.0);
        assert_relative_eq!(s.chi2, 4.0);
        assert_relative_eq!(s.chi2_dof, 4.0 / 3.0);
    }
}
