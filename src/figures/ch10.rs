//! Chapter 10: time series. Fourier transforms, periodograms, wavelets,
//! MCMC on a chirp and spectral smoothing.

use std::f64::consts::PI;

use anyhow::{ensure, Result};
use nalgebra::DMatrix;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{map_values, zip_points, Context, FigureInfo, FigurePipeline};
use crate::color::{Colormap, Rgb};
use crate::data::datasets::{DatasetKey, LIGO_SAMPLE_RATE};
use crate::data::filter::{apply, between, selected_indices, within};
use crate::data::model::{arange, linspace, Grid, Sample, Surface2};
use crate::data::synth::SeededRng;
use crate::figure::{
    Arrow, Figure, Fill, HAlign, Layer, LineStyle, Marker, Norm, Panel, Text, VAlign,
};
use crate::stats::contour::contour_levels;
use crate::stats::density::histogram2d;
use crate::stats::filter::min_component_filter;
use crate::stats::fourier::{
    convolve_full, fft_real, fftshift, full_psd, psd_continuous, welch_psd, Window,
};
use crate::stats::likelihood::convert_to_stdev;
use crate::stats::mcmc::{map_estimate, metropolis, Parameter, SamplerConfig, Traces};
use crate::stats::periodogram::{bootstrap_peak_powers, lomb_scargle_bic, periodogram, significance_levels};
use crate::stats::wavelet::{wavelet, wavelet_psd};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![
        Box::new(LineWaveletPsd),
        Box::new(LsExample),
        Box::new(ConvolutionDiagram),
        Box::new(FftAliasing),
        Box::new(MatchedFilterChirp),
        Box::new(PowerLaw),
        Box::new(LigoPowerSpectrum),
        Box::new(MinCompProcedure),
    ]
}

const BLACK: LineStyle = LineStyle::solid(Rgb::BLACK);

fn top_left(text: &str) -> Text {
    Text::axes(text, 0.02, 0.95)
}

fn top_right(text: &str) -> Text {
    Text::axes(text, 0.95, 0.95).align(HAlign::Right, VAlign::Top)
}

// ---------------------------------------------------------------------------
// Wavelet PSD
// ---------------------------------------------------------------------------

struct LineWaveletPsd;

impl FigurePipeline for LineWaveletPsd {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-line-wavelet-psd",
            chapter: "Chapter 10",
            title: "Wavelet PSD of a localized spike",
            description: "A Gaussian spike in noise, an example Gaussian wavelet, and the \
                          wavelet PSD over 100 centre frequencies from 1/8 to 1/2.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let t = &linspace(-40.0, 40.0, 2001)[..2000];
        let mut rng = SeededRng::new(5);
        let noise = rng.normals(0.0, 0.5, t.len());
        let h: Vec<f64> = t
            .iter()
            .zip(&noise)
            .map(|(t, n)| (-0.5 * (t - 20.0).powi(2)).exp() + n)
            .collect();

        let q = 0.3;
        let exponents = linspace(-3.0, -1.0, 100);
        let f0 = Grid::from_points(map_values(&exponents, |e| 2f64.powf(e)))?;
        let psd = wavelet_psd(t, &h, &f0, q)?;
        // Rows drawn against log2 f0.
        let psd = Surface2::new(psd.x().clone(), Grid::from_points(exponents)?, psd.values().to_vec())?;
        let norm = Norm::auto(psd.values(), false);

        let w: Vec<Complex64> = t.iter().map(|&ti| wavelet(ti, 0.0, 0.125, q)).collect();
        let (re, im): (Vec<f64>, Vec<f64>) = w.iter().map(|c| (c.re, c.im)).unzip();

        let fig = Figure::new("ch10-line-wavelet-psd", 5.0, 5.0)
            .grid(3, 1)
            .panel(
                Panel::new(0, 0)
                    .xlim(-40.0, 40.0)
                    .ylim(-1.2, 2.2)
                    .ylabel("h(t)")
                    .hide_xticks()
                    .layer(Layer::line_xy(t, &h, BLACK))
                    .text(top_left("Input Signal: localized spike plus noise")),
            )
            .panel(
                Panel::new(1, 0)
                    .xlim(-40.0, 40.0)
                    .ylim(-1.4, 1.4)
                    .ylabel("w(t; t0, f0, Q)")
                    .hide_xticks()
                    .legend()
                    .layer(Layer::line_xy(t, &re, BLACK).labeled("real part"))
                    .layer(Layer::line_xy(t, &im, LineStyle::dashed(Rgb::BLACK)).labeled("imag part"))
                    .text(top_left("Example Wavelet: t0 = 0, f0 = 1/8, Q = 0.3"))
                    .text(
                        Text::axes("w(t; t0, f0, Q) = exp(-[f0 (t - t0) / Q]²) exp(2πi f0 (t - t0))", 0.98, 0.05)
                            .align(HAlign::Right, VAlign::Bottom),
                    ),
            )
            .panel(
                Panel::new(2, 0)
                    .xlim(-40.0, 40.0)
                    .ylim(-3.0, -1.0)
                    .xlabel("t")
                    .ylabel("log2 f0")
                    .layer(Layer::heatmap(psd, Colormap::Binary, norm))
                    .text(top_left("Wavelet PSD").color(Rgb::WHITE)),
            );
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// Lomb-Scargle
// ---------------------------------------------------------------------------

struct LsExample;

#[derive(Serialize)]
struct BootstrapParams<'a> {
    t: &'a [f64],
    y: &'a [f64],
    dy: &'a [f64],
    n_periods: usize,
    n_bootstraps: usize,
    seed: u64,
}

impl FigurePipeline for LsExample {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-ls-example",
            chapter: "Chapter 10",
            title: "Generalized Lomb-Scargle periodogram",
            description: "30 irregular observations of a P = 0.3 sinusoid, their periodogram with \
                          1% and 5% bootstrap significance levels, and ΔBIC on the right axis.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let (n, period) = (30, 0.3);
        let mut rng = SeededRng::new(0);
        let days = rng.randints(100, n);
        let jitter = rng.uniform(n);
        let t: Vec<f64> = days.iter().zip(&jitter).map(|(&d, j)| d as f64 + 0.3 + 0.4 * j).collect();
        let y: Vec<f64> = t.iter().map(|t| 10.0 + (2.0 * PI * t / period).sin()).collect();
        let dy: Vec<f64> = rng.uniform(n).iter().map(|u| 0.5 + 0.5 * u).collect();
        let y_obs = rng.normal_each(&y, &dy);
        let sample = Sample::with_errors(t.clone(), y_obs.clone(), dy.clone())?;

        let periods = Grid::logspace(-1.0, 0.0, 10_000)?;
        let power = periodogram(&sample, &periods)?;

        let params = BootstrapParams {
            t: &t,
            y: &y_obs,
            dy: &dy,
            n_periods: periods.len(),
            n_bootstraps: 1000,
            seed: 0,
        };
        let peaks: Vec<f64> = ctx.cache.get_or_compute("ls_bootstrap", &params, || -> Result<Vec<f64>> {
            let omega = map_values(periods.points(), |p| 2.0 * PI / p);
            Ok(bootstrap_peak_powers(&sample, &omega, params.n_bootstraps, params.seed)?)
        })?;
        let levels = significance_levels(&peaks, &[0.01, 0.05]);

        let ylim = (-0.05, 0.85);
        let bic = lomb_scargle_bic(&[ylim.0, ylim.1], &y_obs, &dy, 1);
        let (p0, p1) = (periods.first(), periods.last());

        let data = Panel::new(0, 0)
            .xlabel("time (days)")
            .ylabel("flux")
            .xlim(-5.0, 105.0)
            .layer(Layer::ErrorBars {
                points: zip_points(&t, &y_obs),
                lower: dy.clone(),
                upper: dy.clone(),
                color: Rgb::BLACK,
                bar_color: Rgb::GRAY,
                marker: Some(Marker::Dot),
            });
        let mut spectrum = Panel::new(1, 0)
            .xlabel("period (days)")
            .ylabel("power")
            .xlog()
            .xlim(p0, p1)
            .ylim(ylim.0, ylim.1)
            .secondary_y("ΔBIC", (bic[0], bic[1]))
            .layer(Layer::line(power.points(), BLACK))
            .layer(Layer::Arrows {
                arrows: vec![Arrow {
                    from: (0.3, 0.85),
                    to: (0.3, 0.65),
                    double: false,
                }],
                style: BLACK,
            });
        for level in levels {
            spectrum = spectrum.layer(Layer::hline(level, p0, p1, LineStyle::dotted(Rgb::BLACK)));
        }
        Ok(vec![Figure::new("ch10-ls-example", 5.0, 3.75)
            .grid(2, 1)
            .panel(data)
            .panel(spectrum)])
    }
}

// ---------------------------------------------------------------------------
// Convolution diagram
// ---------------------------------------------------------------------------

struct ConvolutionDiagram;

impl FigurePipeline for ConvolutionDiagram {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-convolution-diagram",
            chapter: "Chapter 10",
            title: "The convolution theorem",
            description: "A correlated Gaussian process convolved with a top-hat window, beside \
                          the Fourier transforms of data and window and their pointwise product.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let n = 500;
        let x = linspace(0.0, 1.0, n);
        let h = 0.01;
        let cov = DMatrix::from_fn(n, n, |i, j| (-0.5 * (x[i] - x[j]).powi(2) / (h * h)).exp());
        let y: Vec<f64> = SeededRng::new(1)
            .multivariate_normal(&vec![0.0; n], &cov)
            .iter()
            .map(|v| 0.8 + 0.3 * v)
            .collect();
        let w: Vec<f64> = x.iter().map(|&v| if v > 0.12 && v < 0.28 { 1.0 } else { 0.0 }).collect();

        // Window-normalised running average, dropping empty overlaps.
        let norm = convolve_full(&vec![1.0; n], &w);
        let yw = convolve_full(&y, &w);
        let xw = convolve_full(&x, &w);
        let averaged: Vec<(f64, f64)> = norm
            .iter()
            .zip(xw.iter().zip(&yw))
            .filter(|(d, _)| **d != 0.0)
            .map(|(d, (xv, yv))| (xv / d, yv / d))
            .collect();

        let y_ft = fft_real(&y);
        let w_ft = fft_real(&w);
        let product: Vec<Complex64> = y_ft.iter().zip(&w_ft).map(|(a, b)| a * b).collect();

        let dx = x[1] - x[0];
        let k: Vec<f64> = (0..n).map(|i| -0.5 * n as f64 + i as f64 / n as f64 / dx).collect();
        let shifted_abs = |c: &[Complex64]| fftshift(&c.iter().map(|v| v.norm()).collect::<Vec<_>>());

        let reversed: Vec<f64> = w.iter().rev().copied().collect();
        let zeros = vec![0.0; n];
        let gray = Fill::new(Rgb::GRAY, 0.5);

        let mut convolved = Panel::new(2, 0)
            .span(2, 1)
            .xlabel("x")
            .ylabel("D_W")
            .xlim(0.01, 0.99)
            .ylim(0.0, 1.99)
            .layer(Layer::line(averaged.clone(), BLACK))
            .text(Text::axes("Convolution: [D ∗ W](x)", 0.5, 0.95).align(HAlign::Center, VAlign::Top).boxed())
            .text(Text::axes("[D ∗ W](x) = F⁻¹{F[D] · F[W]}", 0.5, 0.05).align(HAlign::Center, VAlign::Bottom));
        for x_loc in [0.2, 0.8] {
            if let Some(&(_, y_loc)) = averaged.iter().filter(|(xv, _)| *xv <= x_loc).last() {
                convolved = convolved.layer(Layer::Arrows {
                    arrows: vec![Arrow {
                        from: (x_loc, 2.0),
                        to: (x_loc, y_loc),
                        double: false,
                    }],
                    style: LineStyle::solid(Rgb::GRAY).width(2.0),
                });
            }
        }

        let fig = Figure::new("ch10-convolution-diagram", 5.0, 5.0)
            .grid(4, 2)
            .panel(
                Panel::new(0, 0)
                    .span(2, 1)
                    .ylabel("D")
                    .xlim(0.01, 0.99)
                    .ylim(0.0, 2.0)
                    .hide_xticks()
                    .legend()
                    .layer(Layer::line_xy(&x, &y, BLACK).labeled("data D(x)"))
                    .layer(Layer::FillBetween {
                        x: x.clone(),
                        lower: zeros.clone(),
                        upper: w.clone(),
                        fill: gray,
                        label: Some("window W(x)".into()),
                    })
                    .layer(Layer::FillBetween {
                        x: x.clone(),
                        lower: zeros,
                        upper: reversed,
                        fill: gray,
                        label: None,
                    }),
            )
            .panel(convolved)
            .panel(
                Panel::new(0, 1)
                    .xlim(-100.0, 100.0)
                    .ylim(-5.0, 85.0)
                    .hide_xticks()
                    .hide_yticks()
                    .layer(Layer::line_xy(&k, &shifted_abs(&y_ft), BLACK))
                    .text(top_right("F(D)")),
            )
            .panel(
                Panel::new(1, 1)
                    .xlim(-100.0, 100.0)
                    .ylim(-5.0, 85.0)
                    .hide_xticks()
                    .hide_yticks()
                    .layer(Layer::line_xy(&k, &shifted_abs(&w_ft), BLACK))
                    .text(top_right("F(W)")),
            )
            .panel(
                Panel::new(2, 1)
                    .span(2, 1)
                    .xlim(-100.0, 100.0)
                    .ylim(-100.0, 3500.0)
                    .xlabel("k")
                    .hide_yticks()
                    .layer(Layer::line_xy(&k, &shifted_abs(&product), BLACK))
                    .text(top_right("Pointwise product: F(D) · F(W)").boxed()),
            );
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// Aliasing
// ---------------------------------------------------------------------------

struct FftAliasing;

fn gaussian(x: f64, a: f64) -> f64 {
    (-0.5 * (x / a).powi(2)).exp()
}

fn gaussian_ft(f: f64, a: f64) -> f64 {
    (2.0 * PI * a * a).sqrt() * (-2.0 * (PI * a * f).powi(2)).exp()
}

fn up_arrows(xs: &[f64], heights: impl Fn(f64) -> f64) -> Layer {
    Layer::Arrows {
        arrows: xs
            .iter()
            .map(|&x| Arrow {
                from: (x, 0.0),
                to: (x, heights(x)),
                double: false,
            })
            .collect(),
        style: BLACK,
    }
}

impl FftAliasing {
    fn figure(dt: f64) -> Figure {
        let a = 1.0;
        let n = 12;
        let t = linspace(-5.0, 5.0, 1000);
        let h = map_values(&t, |v| gaussian(v, a));
        let f = linspace(-2.0, 2.0, 1000);
        let big_h = map_values(&f, |v| gaussian_ft(v, a));

        let centred: Vec<f64> = (0..n).map(|i| i as f64 - (n / 2) as f64).collect();
        let t_sample = map_values(&centred, |i| dt * i);
        let f_sample = map_values(&centred, |i| i / dt);
        let kept: Vec<f64> = t_sample.iter().copied().filter(|&ts| gaussian(ts, a) >= 0.1).collect();

        let windows: Vec<Vec<f64>> = f_sample
            .iter()
            .map(|&fs| map_values(&f, |v| gaussian_ft(v - fs, a)))
            .collect();
        let summed: Vec<f64> = (0..f.len()).map(|i| windows.iter().map(|w| w[i]).sum()).collect();

        let frame = |row: usize, col: usize| {
            let panel = Panel::new(row, col).hide_xticks().hide_yticks();
            if col == 0 {
                panel.xlim(-5.0, 5.0).ylim(0.0, 1.4).ylabel("h(t)")
            } else {
                panel.xlim(-1.5, 1.5).ylim(0.0, 3.8).ylabel("H(f)")
            }
        };

        let mut convolution = frame(1, 1)
            .xlabel("f")
            .layer(Layer::line_xy(&f, &summed, BLACK))
            .text(top_left("Convolution of signal FT and window FT"));
        if dt > 1.0 {
            convolution = convolution.layers(windows.iter().map(|w| Layer::line_xy(&f, w, LineStyle::dotted(Rgb::BLACK))));
        }

        let (id, title) = if dt > 1.0 {
            ("ch10-fft-aliasing-undersampled", "Undersampled data: Δt > t_c")
        } else {
            ("ch10-fft-aliasing", "Well-sampled data: Δt < t_c")
        };
        Figure::new(id, 10.0, 5.0)
            .title(title)
            .grid(2, 2)
            .panel(
                frame(0, 0)
                    .title("Time Domain: Multiplication")
                    .layer(Layer::line_xy(&t, &h, BLACK))
                    .layer(up_arrows(&t_sample, |_| 0.5))
                    .text(top_left("Signal and Sampling Window: sampling rate Δt")),
            )
            .panel(
                frame(0, 1)
                    .title("Frequency Domain: Convolution")
                    .layer(Layer::line_xy(&f, &big_h, BLACK))
                    .layer(up_arrows(&f_sample, |_| 1.5))
                    .text(top_left("FT of Signal and Sampling Window: Δf = 1 / Δt")),
            )
            .panel(
                frame(1, 0)
                    .xlabel("t")
                    .layer(up_arrows(&kept, |ts| gaussian(ts, a)))
                    .layer(Layer::line_xy(&t, &h, LineStyle::dotted(Rgb::BLACK)))
                    .text(top_left("Sampled signal: pointwise multiplication")),
            )
            .panel(convolution)
    }
}

impl FigurePipeline for FftAliasing {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-fft-aliasing",
            chapter: "Chapter 10",
            title: "Sampling and aliasing",
            description: "A Gaussian sampled at Δt = 0.9 and Δt = 1.5: the sampled transform is \
                          the convolution with a comb, which overlaps when undersampled.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        Ok(vec![Self::figure(0.9), Self::figure(1.5)])
    }
}

// ---------------------------------------------------------------------------
// Matched filter on a chirp
// ---------------------------------------------------------------------------

struct MatchedFilterChirp;

fn chirp(t: f64, b0: f64, beta: f64, a: f64, omega: f64) -> f64 {
    b0 + a * (omega * t + beta * t * t).sin()
}

/// Bumped whenever the cached fit changes meaning, so older entries miss.
const CHIRP_FIT_REVISION: u32 = 2;

#[derive(Serialize)]
struct ChirpParams<'a> {
    revision: u32,
    t: &'a [f64],
    y: &'a [f64],
    sigma: f64,
    params: &'a [Parameter],
    sampler: SamplerConfig,
}

/// Posterior samples and the MAP point, in parameter order.
#[derive(Serialize, Deserialize)]
struct ChirpFit {
    traces: Traces,
    map: Vec<f64>,
}

const CHIRP_TRUTH: (f64, f64, f64, f64) = (10.0, 5.0, 0.01, 0.1);

/// Seeded noisy chirp and the sampler's priors.
struct ChirpData {
    t: Vec<f64>,
    y: Vec<f64>,
    sigma: f64,
    params: Vec<Parameter>,
}

impl ChirpData {
    fn simulate() -> Self {
        let (b0, a, beta, omega) = CHIRP_TRUTH;
        let (n, sigma) = (100, 2.0);
        let mut rng = SeededRng::new(0);
        let t: Vec<f64> = rng.uniform(n).iter().map(|u| 100.0 * u).collect();
        let truth = map_values(&t, |ti| chirp(ti, b0, beta, a, omega));
        let y = rng.normal_each(&truth, &vec![sigma; n]);
        let params = vec![
            Parameter::new("b0", 0.0, 50.0, 50.0 * rng.random()),
            Parameter::new("A", 0.0, 50.0, 50.0 * rng.random()),
            Parameter::new("log_beta", -10.0, 10.0, -4.6),
            Parameter::new("log_omega", -10.0, 10.0, -2.3),
        ];
        Self { t, y, sigma, params }
    }

    /// Gaussian log-likelihood of `[b0, A, log β, log ω]`.
    fn log_like(&self, theta: &[f64]) -> f64 {
        let (b0, a, beta, omega) = (theta[0], theta[1], theta[2].exp(), theta[3].exp());
        self.t
            .iter()
            .zip(&self.y)
            .map(|(&ti, &yi)| -0.5 * ((yi - chirp(ti, b0, beta, a, omega)) / self.sigma).powi(2))
            .sum()
    }

    /// Sample the posterior, then polish the best sample into the MAP.
    fn fit(&self, ctx: &Context, sampler: SamplerConfig) -> Result<ChirpFit> {
        let key = ChirpParams {
            revision: CHIRP_FIT_REVISION,
            t: &self.t,
            y: &self.y,
            sigma: self.sigma,
            params: &self.params,
            sampler,
        };
        let log_like = |theta: &[f64]| self.log_like(theta);
        ctx.cache.get_or_compute("matchedfilt_chirp", &key, || -> Result<ChirpFit> {
            let traces = metropolis(log_like, &self.params, sampler)?;
            let best = traces
                .best_by(log_like)
                .ok_or_else(|| anyhow::anyhow!("chirp sampler kept no samples"))?;
            let map = map_estimate(log_like, &self.params, &best)?;
            Ok(ChirpFit { traces, map })
        })
    }
}

impl FigurePipeline for MatchedFilterChirp {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-matchedfilt-chirp",
            chapter: "Chapter 10",
            title: "Matched filter: chirp",
            description: "A noisy chirp fit by Metropolis sampling of b0, A, ω and β (20000 \
                          iterations, 2000 burned), with the MAP curve and the pairwise \
                          posterior contours.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let (b0, a, beta, omega) = CHIRP_TRUTH;
        let data = ChirpData::simulate();
        let fit = data.fit(ctx, SamplerConfig::default())?;
        ensure!(fit.map.len() == 4, "cached chirp fit has {} parameters", fit.map.len());

        let column = |name: &str| -> Result<Vec<f64>> {
            fit.traces
                .get(name)
                .map(<[f64]>::to_vec)
                .ok_or_else(|| anyhow::anyhow!("trace '{name}' missing from chirp fit"))
        };
        let chains = [
            column("b0")?,
            column("A")?,
            map_values(&column("log_omega")?, f64::exp),
            map_values(&column("log_beta")?, f64::exp),
        ];
        let (m_b0, m_a, m_beta, m_omega) = (fit.map[0], fit.map[1], fit.map[2].exp(), fit.map[3].exp());

        let t_fit = linspace(0.0, 100.0, 1001);
        let y_fit = map_values(&t_fit, |ti| chirp(ti, m_b0, m_beta, m_a, m_omega));

        let mut fig = Figure::new("ch10-matchedfilt-chirp", 5.0, 5.0).grid(3, 3).panel(
            Panel::new(0, 1)
                .span(1, 2)
                .xlim(0.0, 100.0)
                .xlabel("t")
                .ylabel("h_obs")
                .layer(Layer::scatter(zip_points(&data.t, &data.y), Marker::Dot, 3.0, Rgb::BLACK))
                .layer(Layer::line_xy(&t_fit, &y_fit, BLACK)),
        );
        let labels = ["b0", "A", "ω", "β"];
        let limits = [(9.5, 11.3), (3.6, 6.4), (0.065, 0.115), (0.00975, 0.01045)];
        let truth = [b0, a, omega, beta];
        for j in 1..4 {
            for i in 0..j {
                fig = fig.panel(corner_panel(&chains, i, j, &labels, &limits, &truth)?);
            }
        }
        Ok(vec![fig])
    }
}

/// Posterior of parameter `j` against parameter `i`, with 1σ and 2σ
/// contours of a 30×30 histogram of the chains.
fn corner_panel(
    chains: &[Vec<f64>],
    i: usize,
    j: usize,
    labels: &[&str],
    limits: &[(f64, f64)],
    truth: &[f64],
) -> Result<Panel> {
    let counts = histogram2d(&chains[i], &chains[j], (30, 30), (limits[i], limits[j]))?;
    let log_counts = counts.map(|c| if c > 0.0 { c.ln() } else { f64::NEG_INFINITY });
    let stdev = convert_to_stdev(&log_counts)?;
    let segments = contour_levels(&stdev, &[0.683, 0.955])
        .into_iter()
        .flat_map(|(_, s)| s)
        .collect();

    let mut panel = Panel::new(j - 1, i)
        .xlim(limits[i].0, limits[i].1)
        .ylim(limits[j].0, limits[j].1)
        .layer(Layer::Segments { segments, style: BLACK })
        .layer(Layer::hline(truth[j], limits[i].0, limits[i].1, LineStyle::dotted(Rgb::BLACK)))
        .layer(Layer::vline(truth[i], limits[j].0, limits[j].1, LineStyle::dotted(Rgb::BLACK)));
    panel = if j == 3 { panel.xlabel(labels[i]) } else { panel.hide_xticks() };
    panel = if i == 0 { panel.ylabel(labels[j]) } else { panel.hide_yticks() };
    Ok(panel)
}

// ---------------------------------------------------------------------------
// Power-law noise
// ---------------------------------------------------------------------------

struct PowerLaw;

impl FigurePipeline for PowerLaw {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-powerlaw",
            chapter: "Chapter 10",
            title: "Power-law light curves",
            description: "Red-noise series with P(f) ∝ f⁻¹ and f⁻², and their PSDs against the \
                          input power law.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let (n, dt, factor) = (1024, 0.01, 100.0);
        let t = map_values(&arange(0.0, n as f64, 1.0), |i| dt * i);
        let mut rng = SeededRng::new(1);

        let mut fig = Figure::new("ch10-powerlaw", 5.0, 3.75).grid(2, 2);
        for (col, beta) in [1.0, 2.0].into_iter().enumerate() {
            let x = map_values(&rng.power_law_series(n, dt, beta), |v| factor * v);
            let (f, psd) = psd_continuous(&t, &x)?;
            let reference: Vec<(f64, f64)> = f[1..]
                .iter()
                .map(|&fv| (fv, (factor * dt).powi(2) * (2.0 * PI * fv).powf(-beta)))
                .collect();

            let mut series = Panel::new(0, col)
                .xlim(0.0, 10.24)
                .ylim(-1.5, 1.5)
                .xlabel("t")
                .layer(Layer::line_xy(&t, &x, BLACK))
                .text(Text::axes(&format!("P(f) ∝ f^-{beta}"), 0.95, 0.05).align(HAlign::Right, VAlign::Bottom));
            let mut spectrum = Panel::new(1, col)
                .xlog()
                .ylog()
                .xlim(0.1, 60.0)
                .ylim(1e-6, 1e1)
                .xlabel("f")
                .layer(Layer::line_xy(&f, &psd, BLACK))
                .layer(Layer::line(reference, LineStyle::dashed(Rgb::BLACK)));
            if col == 1 {
                series = series.hide_yticks();
                spectrum = spectrum.hide_yticks();
            } else {
                series = series.ylabel("counts");
                spectrum = spectrum.ylabel("PSD(f)");
            }
            fig = fig.panel(series).panel(spectrum);
        }
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// LIGO
// ---------------------------------------------------------------------------

struct LigoPowerSpectrum;

const LIGO_BAND: (f64, f64) = (40.0, 2060.0);

/// Points of `(f, psd)` inside the plotted band, keeping every `stride`-th.
fn in_band(f: &[f64], psd: &[f64], stride: usize) -> Vec<(f64, f64)> {
    selected_indices(&within(f, LIGO_BAND.0, LIGO_BAND.1))
        .into_iter()
        .step_by(stride)
        .map(|i| (f[i], psd[i]))
        .collect()
}

impl FigurePipeline for LigoPowerSpectrum {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-ligo-power-spectrum",
            chapter: "Chapter 10",
            title: "LIGO power spectrum",
            description: "Two seconds of LIGO strain, and its PSD from one FFT of the whole series \
                          against Welch estimates with top-hat and Hann windows.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::LigoLarge)?;
        let h = data.column("h")?;
        let rate = LIGO_SAMPLE_RATE as usize;
        let dt = 1.0 / LIGO_SAMPLE_RATE;
        let window_seconds = 2;
        ensure!(
            h.len() >= rate * window_seconds,
            "LIGO series has {} samples, need at least {}",
            h.len(),
            rate * window_seconds
        );

        // The quiet stretch at 646 s when the series is long enough.
        let t0 = if h.len() >= rate * (646 + window_seconds) { 646 } else { 0 };
        let shown = &h[rate * t0..rate * (t0 + window_seconds)];
        let trace: Vec<(f64, f64)> = shown
            .iter()
            .enumerate()
            .step_by(10)
            .map(|(i, &v)| (dt * i as f64, v))
            .collect();

        let (f, psd) = full_psd(h, dt);
        let full = in_band(&f, &psd, 100);
        let welch = |window| -> Result<Vec<(f64, f64)>> {
            let (fw, pw) = welch_psd(h, 4096, LIGO_SAMPLE_RATE, window, 2048)?;
            Ok(in_band(&fw, &pw, 1))
        };
        let light = LineStyle::solid(Rgb::new(170, 170, 170));

        let spectrum = |row: usize, label: &str, estimate: Vec<(f64, f64)>| {
            Panel::new(row, 0)
                .xlog()
                .ylog()
                .xlim(LIGO_BAND.0, LIGO_BAND.1)
                .ylim(1e-46, 1e-36)
                .xlabel("frequency (Hz)")
                .ylabel("PSD(f)")
                .layer(Layer::line(full.clone(), light))
                .layer(Layer::line(estimate, BLACK))
                .text(Text::axes(label, 0.98, 0.95).align(HAlign::Right, VAlign::Top))
        };

        let fig = Figure::new("ch10-ligo-power-spectrum", 5.0, 5.0)
            .grid(3, 1)
            .panel(
                Panel::new(0, 0)
                    .xlabel("time (s)")
                    .ylabel("h(t)")
                    .ylim(-1.2e-18, 1.2e-18)
                    .layer(Layer::line(trace, BLACK)),
            )
            .panel(spectrum(1, "Top-hat window", welch(Window::None)?))
            .panel(spectrum(2, "Hanning (cosine) window", welch(Window::Hanning)?));
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// Minimum component filter
// ---------------------------------------------------------------------------

struct MinCompProcedure;

impl FigurePipeline for MinCompProcedure {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch10-mincomp-procedure",
            chapter: "Chapter 10",
            title: "Minimum component filtering",
            description: "An SDSS spectrum between 4000 and 5000 Å with three absorption features \
                          masked and patched by a linear continuum, and the Fourier low-pass \
                          applied to the residual.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::MINCOMP_SPECTRUM)?;
        let wavelength = data.column("wavelength")?;
        let keep = between(wavelength, 4000.0, 5000.0);
        let lambda = apply(wavelength, &keep)?;
        let flux = apply(data.column("spectrum")?, &keep)?;
        // An even count keeps the frequency grid symmetric.
        let n = lambda.len().saturating_sub(1);
        ensure!(n >= 2, "spectrum has no samples between 4000 and 5000 Å");
        let (lambda, flux) = (&lambda[..n], &flux[..n]);

        let windows = [(4080.0, 4130.0), (4315.0, 4370.0), (4830.0, 4900.0)];
        let mc = min_component_filter(lambda, flux, &windows, 100.0, 0.01)?;

        let patched: Vec<f64> = mc.patched.iter().zip(&mc.continuum).map(|(p, c)| p + c).collect();
        let factor = 15.0 * (lambda[1].log10() - lambda[0].log10());
        let f = fftshift(&mc.freq);
        let scaled = |c: &[Complex64]| fftshift(&c.iter().map(|v| factor * v.norm()).collect::<Vec<_>>());

        let fig = Figure::new("ch10-mincomp-procedure", 5.0, 3.75)
            .grid(2, 1)
            .panel(
                Panel::new(0, 0)
                    .ylim(25.0, 110.0)
                    .xlabel("λ (Å)")
                    .ylabel("flux")
                    .layer(Layer::line_xy(lambda, flux, LineStyle::solid(Rgb::GRAY)))
                    .layer(Layer::line_xy(lambda, &patched, BLACK)),
            )
            .panel(
                Panel::new(1, 0)
                    .xlim(0.0, 2000.0)
                    .ylim(0.0, 1.1)
                    .xlabel("f")
                    .ylabel("scaled PSD(f)")
                    .legend()
                    .layer(
                        Layer::line_xy(&f, &scaled(&mc.patched_ft), LineStyle::solid(Rgb::GRAY))
                            .labeled("masked/shifted spectrum"),
                    )
                    .layer(Layer::line_xy(&f, &scaled(&mc.filtered_ft), BLACK).labeled("filtered spectrum"))
                    .layer(Layer::line_xy(&f, &fftshift(&mc.filter), LineStyle::dashed(Rgb::BLACK)).labeled("filter")),
            );
        Ok(vec![fig])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliasing_builds_both_samplings() {
        let figs = FftAliasing.build(&Context::new(crate::config::Config::default())).unwrap();
        assert_eq!(figs.len(), 2);
        assert_ne!(figs[0].id, figs[1].id);
        // Only the undersampled convolution panel shows the shifted copies.
        let lines = |fig: &Figure| {
            fig.panels[3]
                .layers
                .iter()
                .filter(|l| matches!(l, Layer::Line { .. }))
                .count()
        };
        assert_eq!(lines(&figs[0]), 1);
        assert_eq!(lines(&figs[1]), 13);
    }

    #[test]
    fn chirp_map_beats_posterior_mean() {
        let ctx = Context::new(crate::config::Config {
            cache_enabled: false,
            ..crate::config::Config::default()
        });
        let data = ChirpData::simulate();
        let fit = data.fit(&ctx, SamplerConfig::default()).unwrap();
        let mean: Vec<f64> = fit
            .traces
            .values
            .iter()
            .map(|col| col.iter().sum::<f64>() / col.len() as f64)
            .collect();
        assert!(
            data.log_like(&fit.map) >= data.log_like(&mean),
            "MAP {:?} scores {} below posterior mean {}",
            fit.map,
            data.log_like(&fit.map),
            data.log_like(&mean)
        );
        let (b0, a, beta, omega) = CHIRP_TRUTH;
        assert!((fit.map[0] - b0).abs() < 1.0, "b0 {}", fit.map[0]);
        assert!((fit.map[1] - a).abs() < 1.0, "A {}", fit.map[1]);
        assert!((fit.map[2].exp() / beta - 1.0).abs() < 0.05, "beta {}", fit.map[2].exp());
        assert!((fit.map[3].exp() / omega - 1.0).abs() < 0.2, "omega {}", fit.map[3].exp());
    }

    #[test]
    fn gaussian_ft_integrates_to_peak() {
        // ∫ exp(-x²/2) dx = √(2π) = H(0).
        let x = linspace(-10.0, 10.0, 20_001);
        let dx = x[1] - x[0];
        let integral: f64 = x.iter().map(|&v| gaussian(v, 1.0) * dx).sum();
        assert!((integral - gaussian_ft(0.0, 1.0)).abs() < 1e-6);
    }

    #[test]
    fn band_filter_keeps_stride() {
        let f = linspace(0.0, 3000.0, 3001);
        let psd = vec![1.0; f.len()];
        let kept = in_band(&f, &psd, 100);
        assert_eq!(kept[0].0, 40.0);
        assert!(kept.iter().all(|(fv, _)| *fv <= LIGO_BAND.1));
        assert_eq!(kept.len(), 21);
    }
}
