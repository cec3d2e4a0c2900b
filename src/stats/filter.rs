//! Minimum-component filtering of a spectrum: mask spectral features, fit
//! a continuum, low-pass the residual in Fourier space and add the
//! continuum back.

use rustfft::num_complex::Complex64;

use crate::data::filter::{Mask, any_of, between, invert};
use crate::error::{Error, Result};
use crate::stats::fourier::{fft, ifft, ifftshift};
use crate::stats::optimize::{lstsq, polyval, vandermonde};

/// Every intermediate product of [`min_component_filter`], kept so each
/// step can be plotted.
#[derive(Debug, Clone, PartialEq)]
pub struct MinComponent {
    /// Points inside a masked feature window.
    pub feature_mask: Mask,
    /// Linear continuum in log λ, evaluated at every point.
    pub continuum: Vec<f64>,
    /// Residual about the continuum with features set to zero.
    pub patched: Vec<f64>,
    /// Frequencies in FFT order.
    pub freq: Vec<f64>,
    pub patched_ft: Vec<Complex64>,
    pub filter: Vec<f64>,
    pub filtered_ft: Vec<Complex64>,
    /// Smoothed spectrum: inverse transform of the filtered residual plus
    /// the continuum.
    pub smoothed: Vec<f64>,
}

/// Low-pass response: unity below `cutoff`, Gaussian roll-off above it.
pub fn low_pass(f: f64, cutoff: f64, width: f64) -> f64 {
    if f.abs() < cutoff {
        1.0
    } else {
        (-(width * (f.abs() - cutoff)).powi(2)).exp()
    }
}

/// Mask of points that fall inside any of the open `(lo, hi)` windows.
pub fn feature_mask(lambda: &[f64], windows: &[(f64, f64)]) -> Mask {
    let masks: Vec<Mask> = windows.iter().map(|&(lo, hi)| between(lambda, lo, hi)).collect();
    any_of(&masks)
}

/// Run the filter on a spectrum sampled regularly in `log10 λ`.
pub fn min_component_filter(
    lambda: &[f64],
    flux: &[f64],
    windows: &[(f64, f64)],
    cutoff: f64,
    width: f64,
) -> Result<MinComponent> {
    let n = lambda.len();
    if n < 2 || flux.len() != n {
        return Err(Error::Numerical(format!(
            "spectrum needs matching wavelength/flux arrays (got {n} and {})",
            flux.len()
        )));
    }
    let loglam: Vec<f64> = lambda.iter().map(|l| l.log10()).collect();

    let mask = feature_mask(lambda, windows);
    let keep = invert(&mask);
    let (fit_x, fit_y): (Vec<f64>, Vec<f64>) = loglam
        .iter()
        .zip(flux)
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|((x, y), _)| (*x, *y))
        .unzip();
    if fit_x.len() < 2 {
        return Err(Error::Numerical("feature windows cover the whole spectrum".into()));
    }
    let beta = lstsq(&vandermonde(&fit_x, 1), &fit_y)?;
    let continuum: Vec<f64> = loglam.iter().map(|&x| polyval(&beta, x)).collect();

    let patched: Vec<f64> = flux
        .iter()
        .zip(&continuum)
        .zip(&mask)
        .map(|((s, c), &m)| if m { 0.0 } else { s - c })
        .collect();

    let df = 1.0 / n as f64 / (loglam[1] - loglam[0]);
    let centred: Vec<f64> = (0..n).map(|k| df * (k as f64 - (n / 2) as f64)).collect();
    let freq = ifftshift(&centred);

    let patched_c: Vec<Complex64> = patched.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let patched_ft = fft(&patched_c);
    let filter: Vec<f64> = freq.iter().map(|&f| low_pass(f, cutoff, width)).collect();
    let filtered_ft: Vec<Complex64> = patched_ft.iter().zip(&filter).map(|(c, g)| *c * *g).collect();
    let smoothed = ifft(&filtered_ft)
        .iter()
        .zip(&continuum)
        .map(|(c, fit)| c.re + fit)
        .collect();

    log::debug!(
        "min-component filter: {n} points, {} masked, continuum {beta:?}",
        mask.iter().filter(|m| **m).count()
    );
    Ok(MinComponent {
        feature_mask: mask,
        continuum,
        patched,
        freq,
        patched_ft,
        filter,
        filtered_ft,
        smoothed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_grid(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10f64.powf(3.6 + 0.0001 * i as f64)).collect()
    }

    #[test]
    fn filter_shape() {
        assert_eq!(low_pass(50.0, 100.0, 0.01), 1.0);
        assert_eq!(low_pass(-50.0, 100.0, 0.01), 1.0);
        assert!((low_pass(200.0, 100.0, 0.01) - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn continuum_only_spectrum_is_preserved() {
        let lambda = log_grid(256);
        let flux: Vec<f64> = lambda.iter().map(|l| 5.0 + 2.0 * l.log10()).collect();
        let out = min_component_filter(&lambda, &flux, &[(4100.0, 4130.0)], 100.0, 0.01).unwrap();
        for (s, f) in out.smoothed.iter().zip(&flux) {
            assert!((s - f).abs() < 1e-8);
        }
        assert!(out.patched.iter().all(|v| v.abs() < 1e-8));
        assert_eq!(out.freq.len(), 256);
        assert_eq!(out.freq[0], 0.0);
    }

    #[test]
    fn features_are_zeroed_in_patch() {
        let lambda = log_grid(512);
        let flux: Vec<f64> = lambda
            .iter()
            .map(|&l| if (4100.0..4130.0).contains(&l) { 50.0 } else { 1.0 })
            .collect();
        let out = min_component_filter(&lambda, &flux, &[(4080.0, 4150.0)], 100.0, 0.01).unwrap();
        for (p, m) in out.patched.iter().zip(&out.feature_mask) {
            if *m {
                assert_eq!(*p, 0.0);
            }
        }
        assert!(out.feature_mask.iter().any(|m| *m));
    }
}
