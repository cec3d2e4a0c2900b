//! Discrete and continuous Fourier transforms, power spectra and
//! convolution.
//!
//! The forward FFT is unscaled and the inverse carries the `1/N`. The
//! continuous approximations assume a regular grid with an even number of
//! samples.

use std::f64::consts::PI;

use rustfft::{FftPlanner, num_complex::Complex64};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Discrete transforms
// ---------------------------------------------------------------------------

pub fn fft(input: &[Complex64]) -> Vec<Complex64> {
    let mut buf = input.to_vec();
    if buf.is_empty() {
        return buf;
    }
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(buf.len()).process(&mut buf);
    buf
}

/// Inverse FFT, scaled by `1/N`.
pub fn ifft(input: &[Complex64]) -> Vec<Complex64> {
    let mut buf = input.to_vec();
    let n = buf.len();
    if n == 0 {
        return buf;
    }
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(n).process(&mut buf);
    let scale = 1.0 / n as f64;
    buf.iter_mut().for_each(|c| *c *= scale);
    buf
}

pub fn fft_real(input: &[f64]) -> Vec<Complex64> {
    let buf: Vec<Complex64> = input.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft(&buf)
}

/// Inverse of a one-sided spectrum (`n/2 + 1` bins) to `n` real samples.
pub fn irfft(half: &[Complex64], n: usize) -> Vec<f64> {
    let mut full = vec![Complex64::new(0.0, 0.0); n];
    for k in 0..n {
        let c = if k < half.len() && k <= n / 2 {
            half[k]
        } else {
            let mirror = n - k;
            half.get(mirror).map(|c| c.conj()).unwrap_or_default()
        };
        full[k] = c;
    }
    if n > 0 {
        full[0].im = 0.0;
    }
    if n % 2 == 0 && n > 0 {
        full[n / 2].im = 0.0;
    }
    ifft(&full).into_iter().map(|c| c.re).collect()
}

/// Sample frequencies in FFT output order: `0, 1, ..., -n/2, ..., -1` × `1/(n d)`.
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    (0..n)
        .map(|i| {
            let k = if i < n.div_ceil(2) { i as f64 } else { i as f64 - n as f64 };
            k * scale
        })
        .collect()
}

/// Move the zero-frequency bin to the centre.
pub fn fftshift<T: Clone>(values: &[T]) -> Vec<T> {
    let n = values.len();
    let mut out = values.to_vec();
    out.rotate_right(n / 2);
    out
}

/// Inverse of [`fftshift`].
pub fn ifftshift<T: Clone>(values: &[T]) -> Vec<T> {
    let n = values.len();
    let mut out = values.to_vec();
    out.rotate_left(n / 2);
    out
}

// ---------------------------------------------------------------------------
// Continuous transforms on a regular grid
// ---------------------------------------------------------------------------

fn check_even_grid(n: usize) -> Result<()> {
    if n < 2 || n % 2 != 0 {
        return Err(Error::Numerical(format!(
            "continuous transform needs an even number of samples, got {n}"
        )));
    }
    Ok(())
}

fn alternate(k: usize) -> f64 {
    if k % 2 == 0 { 1.0 } else { -1.0 }
}

/// Approximate `H(f) = ∫ h(t) exp(-2πift) dt` on the frequency grid
/// `f_k = (k - N/2) / (N Δt)`. Returns `(f, H)`.
pub fn ft_continuous(t: &[f64], h: &[Complex64]) -> Result<(Vec<f64>, Vec<Complex64>)> {
    let n = t.len();
    check_even_grid(n)?;
    if h.len() != n {
        return Err(Error::Numerical(format!(
            "signal has {} samples but time grid has {n}",
            h.len()
        )));
    }
    let dt = t[1] - t[0];
    let df = 1.0 / (n as f64 * dt);
    let t0 = t[n / 2];
    let f: Vec<f64> = (0..n).map(|k| df * (k as f64 - (n / 2) as f64)).collect();

    let flipped: Vec<Complex64> = h.iter().enumerate().map(|(j, &v)| v * alternate(j)).collect();
    let spectrum = fft(&flipped);
    let sign = alternate(n / 2);

    let big_h = spectrum
        .iter()
        .zip(&f)
        .enumerate()
        .map(|(k, (&s, &fk))| {
            let phase = Complex64::from_polar(1.0, -2.0 * PI * fk * t0);
            s * phase * (dt * alternate(k) * sign)
        })
        .collect();
    Ok((f, big_h))
}

/// Approximate `h(t) = ∫ H(f) exp(2πift) df`, the inverse of
/// [`ft_continuous`], on `t_j = (j - N/2) / (N Δf)`. Returns `(t, h)`.
pub fn ift_continuous(f: &[f64], big_h: &[Complex64]) -> Result<(Vec<f64>, Vec<Complex64>)> {
    let n = f.len();
    check_even_grid(n)?;
    if big_h.len() != n {
        return Err(Error::Numerical(format!(
            "spectrum has {} samples but frequency grid has {n}",
            big_h.len()
        )));
    }
    let df = f[1] - f[0];
    let dt = 1.0 / (n as f64 * df);
    let f0 = f[n / 2];
    let t: Vec<f64> = (0..n).map(|j| dt * (j as f64 - (n / 2) as f64)).collect();

    let flipped: Vec<Complex64> = big_h
        .iter()
        .enumerate()
        .map(|(k, &v)| v * alternate(k))
        .collect();
    let inv = ifft(&flipped);
    let sign = alternate(n / 2);

    let h = inv
        .iter()
        .zip(&t)
        .enumerate()
        .map(|(j, (&s, &tj))| {
            let phase = Complex64::from_polar(1.0, 2.0 * PI * f0 * tj);
            s * phase * (df * n as f64 * alternate(j) * sign)
        })
        .collect();
    Ok((t, h))
}

/// One-sided power spectral density `|H(f)|²`, `f >= 0`, of a real signal.
pub fn psd_continuous(t: &[f64], h: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let hc: Vec<Complex64> = h.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let (f, big_h) = ft_continuous(t, &hc)?;
    let half = f.len() / 2;
    Ok((
        f[half..].to_vec(),
        big_h[half..].iter().map(|c| c.norm_sqr()).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Windowed (Welch) PSD
// ---------------------------------------------------------------------------

/// Segment taper for [`welch_psd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Top-hat: no taper.
    None,
    /// Symmetric Hann: `0.5 (1 - cos(2πi/(N-1)))`.
    Hanning,
}

impl Window {
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        match (self, n) {
            (_, 0) => Vec::new(),
            (Window::None, _) | (_, 1) => vec![1.0; n],
            (Window::Hanning, _) => {
                let denom = (n - 1) as f64;
                (0..n)
                    .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
                    .collect()
            }
        }
    }
}

/// Averaged periodogram over overlapping segments, one-sided and scaled to
/// a density (per unit frequency) with the window power removed.
/// Returns `(frequencies, psd)` with `nfft/2 + 1` bins.
pub fn welch_psd(
    data: &[f64],
    nfft: usize,
    fs: f64,
    window: Window,
    noverlap: usize,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if nfft == 0 || noverlap >= nfft {
        return Err(Error::Numerical(format!(
            "invalid segment layout: nfft={nfft}, noverlap={noverlap}"
        )));
    }
    if data.len() < nfft {
        return Err(Error::Numerical(format!(
            "signal of {} samples is shorter than one segment ({nfft})",
            data.len()
        )));
    }
    let w = window.coefficients(nfft);
    let w_norm: f64 = w.iter().map(|v| v * v).sum();
    let step = nfft - noverlap;
    let n_segments = (data.len() - noverlap) / step;
    let n_bins = nfft / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let plan = planner.plan_fft_forward(nfft);
    let mut acc = vec![0.0; n_bins];
    let mut buf = vec![Complex64::new(0.0, 0.0); nfft];

    for s in 0..n_segments {
        let seg = &data[s * step..s * step + nfft];
        for ((b, &x), &wi) in buf.iter_mut().zip(seg).zip(&w) {
            *b = Complex64::new(x * wi, 0.0);
        }
        plan.process(&mut buf);
        for (a, c) in acc.iter_mut().zip(&buf) {
            *a += c.norm_sqr();
        }
    }

    let scale = 1.0 / (n_segments as f64 * fs * w_norm);
    let psd = acc
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let one_sided = if k == 0 || (nfft % 2 == 0 && k == nfft / 2) { 1.0 } else { 2.0 };
            p * scale * one_sided
        })
        .collect();
    let freqs = (0..n_bins).map(|k| k as f64 * fs / nfft as f64).collect();
    log::debug!("welch_psd: {n_segments} segments of {nfft}, window {window:?}");
    Ok((freqs, psd))
}

/// Periodogram of the whole series: `|Δt FFT(x)|²` at `k/(NΔt)` for
/// `k < N/2`.
pub fn full_psd(data: &[f64], dt: f64) -> (Vec<f64>, Vec<f64>) {
    let n = data.len();
    let spectrum = fft_real(data);
    let df = 1.0 / (n as f64 * dt);
    let half = n / 2;
    (
        (0..half).map(|k| df * k as f64).collect(),
        spectrum[..half].iter().map(|c| (*c * dt).norm_sqr()).collect(),
    )
}

// ---------------------------------------------------------------------------
// Convolution
// ---------------------------------------------------------------------------

/// Direct linear convolution, `len(a) + len(b) - 1` outputs.
pub fn convolve_full(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &av) in a.iter().enumerate() {
        for (j, &bv) in b.iter().enumerate() {
            out[i + j] += av * bv;
        }
    }
    out
}

/// Circular convolution through the FFT: `IFFT(FFT(a) · FFT(b))`.
pub fn circular_convolve_fft(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    if a.len() != b.len() {
        return Err(Error::Numerical(format!(
            "circular convolution of unequal lengths {} and {}",
            a.len(),
            b.len()
        )));
    }
    let fa = fft_real(a);
    let fb = fft_real(b);
    let prod: Vec<Complex64> = fa.iter().zip(&fb).map(|(x, y)| *x * *y).collect();
    Ok(ifft(&prod).into_iter().map(|c| c.re).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fft_roundtrip() {
        let x: Vec<Complex64> = (0..8).map(|i| Complex64::new(i as f64, -(i as f64))).collect();
        let back = ifft(&fft(&x));
        for (a, b) in x.iter().zip(&back) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn shifts_and_frequency_order() {
        assert_eq!(fftfreq(5, 1.0), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
        assert_eq!(fftfreq(4, 0.5), vec![0.0, 0.5, -1.0, -0.5]);
        assert_eq!(fftshift(&[0, 1, 2, 3, 4]), vec![3, 4, 0, 1, 2]);
        assert_eq!(ifftshift(&fftshift(&[0, 1, 2, 3, 4])), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn gaussian_continuous_ft_is_analytic() {
        // exp(-t²/2) ↔ sqrt(2π) exp(-2π²f²)
        let n = 1000;
        let t: Vec<f64> = (0..n).map(|i| -10.0 + 20.0 * i as f64 / n as f64).collect();
        let h: Vec<Complex64> = t.iter().map(|&t| Complex64::new((-0.5 * t * t).exp(), 0.0)).collect();
        let (f, big_h) = ft_continuous(&t, &h).unwrap();
        for (fk, hk) in f.iter().zip(&big_h).step_by(37) {
            let expected = (2.0 * PI).sqrt() * (-2.0 * (PI * fk).powi(2)).exp();
            assert_relative_eq!(hk.re, expected, epsilon = 1e-8);
            assert!(hk.im.abs() < 1e-8);
        }

        let (t_back, h_back) = ift_continuous(&f, &big_h).unwrap();
        assert_eq!(t_back.len(), n);
        for (a, b) in h.iter().zip(&h_back).step_by(41) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-8);
        }
    }

    #[test]
    fn odd_grids_are_rejected() {
        let t = [0.0, 1.0, 2.0];
        let h = [Complex64::new(0.0, 0.0); 3];
        assert!(ft_continuous(&t, &h).is_err());
    }

    #[test]
    fn welch_white_noise_level() {
        // Unit-variance alternating signal: total power integrates to the variance.
        let data: Vec<f64> = (0..4096).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let (f, p) = welch_psd(&data, 256, 1.0, Window::None, 128).unwrap();
        assert_eq!(f.len(), 129);
        let df = f[1] - f[0];
        let total: f64 = p.iter().sum::<f64>() * df;
        assert_relative_eq!(total, 1.0, epsilon = 1e-2);
    }

    #[test]
    fn convolution_agrees_with_fft_version() {
        assert_eq!(convolve_full(&[1.0, 2.0], &[1.0, 1.0, 1.0]), vec![1.0, 3.0, 3.0, 2.0]);
        let c = circular_convolve_fft(&[1.0, 0.0, 0.0, 0.0], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for (a, b) in c.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn windows() {
        let w = Window::Hanning.coefficients(5);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[2], 1.0);
        assert_eq!(Window::None.coefficients(3), vec![1.0; 3]);
    }
}
