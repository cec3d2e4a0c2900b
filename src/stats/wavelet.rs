//! Gaussian-windowed complex wavelets and the wavelet power spectrum of a
//! regularly sampled signal.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::data::model::{Grid, Surface2};
use crate::error::Result;
use crate::stats::fourier::{ft_continuous, ift_continuous};

/// `w(t; t0, f0, Q) = exp(-[f0 (t - t0) / Q]²) exp(2πi f0 (t - t0))`.
pub fn wavelet(t: f64, t0: f64, f0: f64, q: f64) -> Complex64 {
    let dt = t - t0;
    let envelope = (-(f0 / q * dt).powi(2)).exp();
    Complex64::from_polar(envelope, 2.0 * PI * f0 * dt)
}

/// Analytic Fourier transform of [`wavelet`] under
/// `H(f) = ∫ h(t) exp(-2πift) dt`.
pub fn wavelet_ft(f: f64, t0: f64, f0: f64, q: f64) -> Complex64 {
    let amplitude = PI.sqrt() * q / f0 * (-(PI * (f - f0) * q / f0).powi(2)).exp();
    Complex64::from_polar(amplitude, -2.0 * PI * f * t0)
}

/// `|h ⋆ w|²` for every centre frequency in `f0`: the signal's transform
/// is multiplied by each conjugated wavelet transform and inverted. Rows
/// of the surface follow `f0`, columns follow the output time grid.
pub fn wavelet_psd(t: &[f64], h: &[f64], f0: &Grid, q: f64) -> Result<Surface2> {
    let hc: Vec<Complex64> = h.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let (f, big_h) = ft_continuous(t, &hc)?;

    let mut t_out = Vec::new();
    let mut values = Vec::with_capacity(f0.len() * t.len());
    for &fc in f0.points() {
        let product: Vec<Complex64> = big_h
            .iter()
            .zip(&f)
            .map(|(hk, &fk)| *hk * wavelet_ft(fk, 0.0, fc, q).conj())
            .collect();
        let (tt, hw) = ift_continuous(&f, &product)?;
        values.extend(hw.iter().map(|c| c.norm_sqr()));
        t_out = tt;
    }
    Ok(Surface2::new(Grid::from_points(t_out)?, f0.clone(), values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn numerical_ft_matches_analytic() {
        let n = 10_000;
        let t: Vec<f64> = (0..n).map(|i| -5.0 + 10.0 * i as f64 / n as f64).collect();
        let h: Vec<Complex64> = t.iter().map(|&ti| wavelet(ti, 1.0, 2.0, 3.0)).collect();
        let (f, big_h) = ft_continuous(&t, &h).unwrap();
        for (fk, hk) in f.iter().zip(&big_h).step_by(97) {
            let expected = wavelet_ft(*fk, 1.0, 2.0, 3.0);
            assert_relative_eq!(hk.re, expected.re, epsilon = 1e-6);
            assert_relative_eq!(hk.im, expected.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn psd_shape_and_localisation() {
        let t: Vec<f64> = (0..400).map(|i| -20.0 + 0.1 * i as f64).collect();
        let h: Vec<f64> = t.iter().map(|&ti| (-0.5 * (ti - 5.0).powi(2)).exp()).collect();
        let f0 = Grid::logspace(-1.0, -0.3, 7).unwrap();
        let psd = wavelet_psd(&t, &h, &f0, 0.3).unwrap();
        assert_eq!(psd.shape(), (7, 400));
        let (t_peak, _) = psd.argmax();
        assert!((t_peak - 5.0).abs() < 1.5, "peak at t = {t_peak}");
    }
}
