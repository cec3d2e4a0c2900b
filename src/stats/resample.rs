//! Order statistics and bootstrap resampling.

use crate::data::synth::{SeededRng, bootstrap_indices};

/// Percentile `q` (0–100) with linear interpolation between order
/// statistics. NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

/// [`percentile`] for data that is already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Interquartile-based width estimate, `0.7413 (q75 - q25)`.
pub fn sigma_g(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    0.7413 * (percentile_sorted(&sorted, 75.0) - percentile_sorted(&sorted, 25.0))
}

/// Evaluate `statistic` on `n_bootstraps` resamplings (with replacement)
/// of `values`.
pub fn bootstrap<T, F>(values: &[f64], n_bootstraps: usize, rng: &mut SeededRng, statistic: F) -> Vec<T>
where
    F: Fn(&[f64]) -> T,
{
    let mut buf = vec![0.0; values.len()];
    (0..n_bootstraps)
        .map(|_| {
            for (b, i) in buf.iter_mut().zip(bootstrap_indices(rng, values.len())) {
                *b = values[i];
            }
            statistic(&buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_interpolate() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
        assert_eq!(median(&v), 2.5);
        assert!((percentile(&v, 25.0) - 1.75).abs() < 1e-12);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn sigma_g_of_uniform_grid() {
        let v: Vec<f64> = (0..=100).map(f64::from).collect();
        assert!((sigma_g(&v) - 0.7413 * 50.0).abs() < 1e-9);
    }

    #[test]
    fn bootstrap_of_constant_is_constant() {
        let mut rng = SeededRng::new(44);
        let out = bootstrap(&[2.0; 10], 50, &mut rng, median);
        assert_eq!(out.len(), 50);
        assert!(out.iter().all(|&m| m == 2.0));
    }
}
