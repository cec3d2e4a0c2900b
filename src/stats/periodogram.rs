//! Generalized (floating-mean, error-weighted) Lomb-Scargle periodogram
//! after Zechmeister & Kürster (2009).

use std::f64::consts::PI;

use crate::data::model::{Grid, Sample, Surface1};
use crate::data::synth::{SeededRng, bootstrap_indices};
use crate::error::{Error, Result};
use crate::stats::resample::percentile;

/// Normalised power at each angular frequency in `omega`. Without
/// uncertainties every point carries unit weight.
pub fn lomb_scargle(t: &[f64], y: &[f64], dy: Option<&[f64]>, omega: &[f64]) -> Result<Vec<f64>> {
    let n = t.len();
    if n < 2 || y.len() != n || dy.is_some_and(|d| d.len() != n) {
        return Err(Error::Numerical(format!(
            "periodogram needs matching t/y/dy with at least two points (t: {n}, y: {})",
            y.len()
        )));
    }

    let mut w: Vec<f64> = match dy {
        Some(dy) => dy.iter().map(|d| 1.0 / (d * d)).collect(),
        None => vec![1.0; n],
    };
    let w_sum: f64 = w.iter().sum();
    w.iter_mut().for_each(|wi| *wi /= w_sum);

    let y_mean: f64 = w.iter().zip(y).map(|(wi, yi)| wi * yi).sum();
    let yy: f64 = w.iter().zip(y).map(|(wi, yi)| wi * (yi - y_mean).powi(2)).sum();
    if yy == 0.0 {
        return Ok(vec![0.0; omega.len()]);
    }

    let power = omega
        .iter()
        .map(|&om| {
            let (mut c, mut s, mut cc, mut cs, mut yc, mut ys) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
            for ((&ti, &yi), &wi) in t.iter().zip(y).zip(&w) {
                let (sin, cos) = (om * ti).sin_cos();
                c += wi * cos;
                s += wi * sin;
                cc += wi * cos * cos;
                cs += wi * cos * sin;
                yc += wi * (yi - y_mean) * cos;
                ys += wi * (yi - y_mean) * sin;
            }
            let ss = 1.0 - cc - s * s;
            let cc = cc - c * c;
            let cs = cs - c * s;
            let d = cc * ss - cs * cs;
            if d.abs() < f64::EPSILON {
                return 0.0;
            }
            (ss * yc * yc + cc * ys * ys - 2.0 * cs * yc * ys) / (yy * d)
        })
        .collect();
    Ok(power)
}

/// Periodogram of `sample` evaluated over a grid of periods.
pub fn periodogram(sample: &Sample, periods: &Grid) -> Result<Surface1> {
    let omega: Vec<f64> = periods.points().iter().map(|p| 2.0 * PI / p).collect();
    let power = lomb_scargle(sample.x(), sample.y(), sample.dy(), &omega)?;
    Ok(Surface1::new(periods.clone(), power)?)
}

/// Peak power of `n_bootstraps` periodograms of resampled (y, dy) pairs
/// at fixed times: the null distribution of the highest peak.
pub fn bootstrap_peak_powers(
    sample: &Sample,
    omega: &[f64],
    n_bootstraps: usize,
    seed: u64,
) -> Result<Vec<f64>> {
    let mut rng = SeededRng::new(seed);
    let n = sample.len();
    let mut peaks = Vec::with_capacity(n_bootstraps);
    for _ in 0..n_bootstraps {
        let idx = bootstrap_indices(&mut rng, n);
        let y: Vec<f64> = idx.iter().map(|&i| sample.y()[i]).collect();
        let dy: Option<Vec<f64>> = sample.dy().map(|d| idx.iter().map(|&i| d[i]).collect());
        let p = lomb_scargle(sample.x(), &y, dy.as_deref(), omega)?;
        peaks.push(p.into_iter().fold(f64::NEG_INFINITY, f64::max));
    }
    Ok(peaks)
}

/// Power levels exceeded by chance with the given probabilities
/// (e.g. `[0.01, 0.05]`), read off the bootstrap peak distribution.
pub fn significance_levels(peaks: &[f64], false_alarm: &[f64]) -> Vec<f64> {
    false_alarm
        .iter()
        .map(|fa| percentile(peaks, 100.0 * (1.0 - fa)))
        .collect()
}

/// ΔBIC of a single-harmonic model against a constant, as a function of
/// normalised power: `χ²₀ P - (1 + 2 n_harmonics) ln N`.
pub fn lomb_scargle_bic(power: &[f64], y: &[f64], dy: &[f64], n_harmonics: usize) -> Vec<f64> {
    let w: Vec<f64> = dy.iter().map(|d| 1.0 / (d * d)).collect();
    let w_sum: f64 = w.iter().sum();
    let mu = w.iter().zip(y).map(|(wi, yi)| wi * yi).sum::<f64>() / w_sum;
    let chi2_0: f64 = y.iter().zip(dy).map(|(yi, di)| ((yi - mu) / di).powi(2)).sum();
    let penalty = (1.0 + 2.0 * n_harmonics as f64) * (y.len() as f64).ln();
    power.iter().map(|p| chi2_0 * p - penalty).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sinusoid(period: f64) -> Sample {
        let t: Vec<f64> = (0..60).map(|i| i as f64 * 0.37).collect();
        let y: Vec<f64> = t.iter().map(|ti| 10.0 + (2.0 * PI * ti / period).sin()).collect();
        let dy = vec![0.5; t.len()];
        Sample::with_errors(t, y, dy).unwrap()
    }

    #[test]
    fn peak_at_true_period() {
        let sample = sinusoid(3.0);
        let periods = Grid::linspace(1.0, 6.0, 2000).unwrap();
        let ps = periodogram(&sample, &periods).unwrap();
        assert_eq!(ps.len(), periods.len());
        let (best, _) = ps
            .points()
            .into_iter()
            .fold((0.0, f64::NEG_INFINITY), |acc, (p, v)| if v > acc.1 { (p, v) } else { acc });
        assert!((best - 3.0).abs() < 0.02, "peak at {best}");
        assert!(ps.max() > 0.99 && ps.max() <= 1.0 + 1e-9);
    }

    #[test]
    fn constant_signal_has_no_power() {
        let t = vec![0.0, 1.0, 2.5, 3.0];
        let p = lomb_scargle(&t, &[2.0; 4], None, &[1.0, 2.0]).unwrap();
        assert_eq!(p, vec![0.0, 0.0]);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(lomb_scargle(&[0.0, 1.0], &[1.0], None, &[1.0]).is_err());
    }

    #[test]
    fn bootstrap_is_reproducible() {
        let sample = sinusoid(2.0);
        let omega: Vec<f64> = (1..50).map(|i| i as f64 * 0.1).collect();
        let a = bootstrap_peak_powers(&sample, &omega, 20, 0).unwrap();
        let b = bootstrap_peak_powers(&sample, &omega, 20, 0).unwrap();
        assert_eq!(a, b);
        let levels = significance_levels(&a, &[0.01, 0.05]);
        assert!(levels[0] >= levels[1]);
    }

    #[test]
    fn bic_is_linear_in_power() {
        let y = [1.0, 2.0, 3.0];
        let dy = [1.0; 3];
        let bic = lomb_scargle_bic(&[0.0, 1.0], &y, &dy, 1);
        assert!((bic[0] + 3.0 * 3f64.ln()).abs() < 1e-12);
        assert!((bic[1] - bic[0] - 2.0).abs() < 1e-12);
    }
}
