//! Chapter 6: density estimation and extreme deconvolution.

use anyhow::Result;
use serde::Serialize;

use super::{covariance_ellipse, Context, FigureInfo, FigurePipeline};
use crate::color::{Colormap, Rgb};
use crate::data::datasets::DatasetKey;
use crate::data::model::Grid;
use crate::data::synth::SeededRng;
use crate::figure::{Figure, Fill, HAlign, Layer, LineStyle, Marker, Norm, Panel, Text, VAlign};
use crate::stats::density::{gaussian_kde, knn_density};
use crate::stats::neighbors::PointSet;
use crate::stats::xd::{self, XdConfig, XdMixture};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(GreatWall), Box::new(XdExample)]
}

// ---------------------------------------------------------------------------
// Great Wall
// ---------------------------------------------------------------------------

struct GreatWall;

const WALL_X: (f64, f64) = (-375.0, -175.0);
const WALL_Y: (f64, f64) = (-300.0, 200.0);

impl FigurePipeline for GreatWall {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch6-great-wall",
            chapter: "Chapter 6",
            title: "Density of the SDSS Great Wall",
            description: "Galaxy positions and three density estimates on a 50×125 grid: a \
                          Gaussian KDE (h = 5) and Bayesian nearest-neighbour densities with \
                          k = 5 and k = 40.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::GreatWall)?;
        let (x, y) = (data.column("x")?, data.column("y")?);

        // The wall runs along y, so y is drawn horizontally.
        let points = PointSet::from_columns(&[y, x])?;
        let horizontal = Grid::linspace(WALL_Y.0, WALL_Y.1, 125)?;
        let vertical = Grid::linspace(WALL_X.0, WALL_X.1, 50)?;

        let estimates = [
            ("KDE: Gaussian (h=5)", gaussian_kde(&points, 5.0, &horizontal, &vertical)?),
            ("k-neighbors (k=5)", knn_density(&points, 5, &horizontal, &vertical)?),
            ("k-neighbors (k=40)", knn_density(&points, 40, &horizontal, &vertical)?),
        ];

        let frame = |row: usize, col: usize, label: &str| {
            let mut panel = Panel::new(row, col)
                .xlim(WALL_Y.0, WALL_Y.1 - 0.01)
                .ylim(WALL_X.0, WALL_X.1)
                .text(Text::axes(label, 0.95, 0.9).align(HAlign::Right, VAlign::Top).boxed());
            panel = if row == 0 { panel.hide_xticks() } else { panel.xlabel("y (Mpc)") };
            if col == 0 { panel.ylabel("x (Mpc)") } else { panel.hide_yticks() }
        };

        let mut fig = Figure::new("ch6-great-wall", 10.0, 4.4)
            .grid(2, 2)
            .panel(frame(0, 0, "input").layer(Layer::scatter_xy(y, x, Marker::Pixel, 1.0, Rgb::BLACK)));
        for (i, (label, density)) in estimates.into_iter().enumerate() {
            let cell = i + 1;
            let norm = Norm::auto(density.values(), true);
            fig = fig.panel(frame(cell / 2, cell % 2, label).layer(Layer::heatmap(density, Colormap::Binary, norm)));
        }
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// Extreme deconvolution
// ---------------------------------------------------------------------------

struct XdExample;

/// Noisy draws from a curved 1-D relation, with per-point errors.
struct NoisySample {
    truth: Vec<[f64; 2]>,
    observed: Vec<[f64; 2]>,
    errors: Vec<[[f64; 2]; 2]>,
}

fn noisy_sample(n: usize, seed: u64) -> NoisySample {
    let mut rng = SeededRng::new(seed);
    let mut x_true: Vec<f64> = rng.uniform(n).iter().map(|u| (1.4 + 2.0 * u).powi(2)).collect();
    let mut y_true: Vec<f64> = x_true.iter().map(|x| 0.1 * x * x).collect();
    let dx: Vec<f64> = x_true.iter().map(|x| 0.1 + 4.0 / (x * x)).collect();
    let dy: Vec<f64> = x_true.iter().map(|x| 0.1 + 10.0 / (x * x)).collect();
    let jitter_x = rng.normal_each(&vec![0.0; n], &dx);
    let jitter_y = rng.normal_each(&vec![0.0; n], &dy);
    x_true.iter_mut().zip(jitter_x).for_each(|(x, j)| *x += j);
    y_true.iter_mut().zip(jitter_y).for_each(|(y, j)| *y += j);

    let dx: Vec<f64> = rng.uniform(n).iter().map(|u| 0.2 + 0.5 * u).collect();
    let dy: Vec<f64> = rng.uniform(n).iter().map(|u| 0.2 + 0.5 * u).collect();
    let x = rng.normal_each(&x_true, &dx);
    let y = rng.normal_each(&y_true, &dy);

    NoisySample {
        truth: x_true.iter().zip(&y_true).map(|(&x, &y)| [x, y]).collect(),
        observed: x.iter().zip(&y).map(|(&x, &y)| [x, y]).collect(),
        errors: dx.iter().zip(&dy).map(|(dx, dy)| [[dx * dx, 0.0], [0.0, dy * dy]]).collect(),
    }
}

#[derive(Serialize)]
struct XdParams {
    n: usize,
    seed: u64,
    config: XdConfig,
}

fn as_points(p: &[[f64; 2]]) -> Vec<(f64, f64)> {
    p.iter().map(|p| (p[0], p[1])).collect()
}

impl FigurePipeline for XdExample {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch6-xd-example",
            chapter: "Chapter 6",
            title: "Extreme deconvolution",
            description: "A 10-component XD fit to 2000 noisy points: true and noisy samples, a \
                          resampling of the fit and its 2σ component ellipses.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let params = XdParams {
            n: 2000,
            seed: 0,
            config: XdConfig::default(),
        };
        let sample = noisy_sample(params.n, params.seed);
        let mixture: XdMixture = ctx.cache.get_or_compute("xd_toy", &params, || -> Result<XdMixture> {
            Ok(xd::fit(&sample.observed, &sample.errors, params.config)?)
        })?;
        log::info!(
            "XD: {} components, log L {:.3} after {} iterations",
            mixture.n_components(),
            mixture.log_l,
            mixture.iterations
        );
        let resampled = mixture.sample(params.n, &mut SeededRng::new(params.seed + 1));

        let ellipses = mixture
            .mu
            .iter()
            .zip(&mixture.v)
            .map(|(mu, v)| covariance_ellipse((mu[0], mu[1]), *v, 2.0))
            .collect();

        let panels = [
            ("True Distribution", Layer::scatter(as_points(&sample.truth), Marker::Dot, 2.0, Rgb::BLACK)),
            ("Noisy Distribution", Layer::scatter(as_points(&sample.observed), Marker::Dot, 2.0, Rgb::BLACK)),
            ("Extreme Deconvolution resampling", Layer::scatter(as_points(&resampled), Marker::Dot, 2.0, Rgb::BLACK)),
            (
                "Extreme Deconvolution cluster locations",
                Layer::Ellipses {
                    ellipses,
                    fill: Some(Fill::new(Rgb::GRAY, 0.2)),
                    stroke: Some(LineStyle::solid(Rgb::BLACK)),
                },
            ),
        ];

        let mut fig = Figure::new("ch6-xd-example", 5.0, 3.75).grid(2, 2);
        for (i, (title, layer)) in panels.into_iter().enumerate() {
            let mut panel = Panel::new(i / 2, i % 2)
                .xlim(-1.0, 13.0)
                .ylim(-6.0, 16.0)
                .layer(layer)
                .text(Text::axes(title, 0.05, 0.95));
            panel = if i < 2 { panel.hide_xticks() } else { panel.xlabel("x") };
            panel = if i % 2 == 1 { panel.hide_yticks() } else { panel.ylabel("y") };
            fig = fig.panel(panel);
        }
        Ok(vec![fig])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_sample_is_seeded() {
        let a = noisy_sample(200, 0);
        let b = noisy_sample(200, 0);
        assert_eq!(a.observed, b.observed);
        assert_eq!(a.truth.len(), 200);
        for e in &a.errors {
            assert!(e[0][0] >= 0.04 && e[0][0] <= 0.49);
            assert_eq!(e[0][1], 0.0);
        }
    }

    #[test]
    fn kde_peaks_on_cluster() {
        let x = [1.0, 1.1, 0.9, 1.0, -3.0];
        let y = [2.0, 2.1, 1.9, 2.0, 4.0];
        let points = PointSet::from_columns(&[&x, &y]).unwrap();
        let g = Grid::linspace(-5.0, 5.0, 101).unwrap();
        let density = gaussian_kde(&points, 0.5, &g, &g).unwrap();
        let (px, py) = density.argmax();
        assert!((px - 1.0).abs() < 0.2 && (py - 2.0).abs() < 0.2);
    }
}
