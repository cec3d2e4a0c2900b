//! Chapter 5: likelihood surfaces and posteriors.

use anyhow::Result;

use super::{sigma_contours, Context, FigureInfo, FigurePipeline};
use crate::color::{Colormap, Rgb};
use crate::data::model::Grid;
use crate::data::synth::SeededRng;
use crate::figure::{Figure, HAlign, Layer, LineStyle, Norm, Panel, Text, VAlign};
use crate::stats::density::Histogram;
use crate::stats::likelihood::{
    cauchy_log_l, cumulative, estimate_mu_gamma, gaussgauss_log_l, log_l_surface, marginals,
};
use crate::stats::resample::bootstrap;

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(LikelihoodGaussGauss), Box::new(PosteriorCauchy)]
}

// ---------------------------------------------------------------------------
// Gaussian with heteroscedastic errors
// ---------------------------------------------------------------------------

struct LikelihoodGaussGauss;

impl FigurePipeline for LikelihoodGaussGauss {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch5-likelihood-gaussgauss",
            chapter: "Chapter 5",
            title: "Likelihood of a Gaussian with Gaussian errors",
            description: "log L(μ, σ) of ten points drawn from N(1, 1) with known errors up to 3, \
                          with 1, 2 and 3σ contours.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let (mu_true, sigma_true, n) = (1.0, 1.0_f64, 10);
        let mut rng = SeededRng::new(5);
        let ei: Vec<f64> = rng.uniform(n).iter().map(|u| 3.0 * u).collect();
        let widths: Vec<f64> = ei.iter().map(|e| (sigma_true.powi(2) + e * e).sqrt()).collect();
        let xi = rng.normal_each(&vec![mu_true; n], &widths);

        let mu = Grid::linspace(-3.0, 5.0, 70)?;
        let sigma = Grid::linspace(0.01, 5.0, 70)?;
        let log_l = log_l_surface(&mu, &sigma, |m, s| gaussgauss_log_l(&xi, &ei, m, s));

        let contours = sigma_contours(&log_l, LineStyle::solid(Rgb::BLACK))?;

        let panel = Panel::new(0, 0)
            .xlabel("μ")
            .ylabel("σ")
            .layer(Layer::Heatmap {
                surface: log_l,
                colormap: Colormap::Binary,
                norm: Norm::Linear { vmin: -5.0, vmax: 0.0 },
                alpha: 1.0,
                colorbar: Some("log(L)".into()),
            })
            .layer(contours)
            .text(
                Text::axes("L(μ,σ) for x̄=1, σ_true=1, n=10", 0.5, 0.93)
                    .align(HAlign::Center, VAlign::Center)
                    .boxed(),
            );
        Ok(vec![Figure::new("ch5-likelihood-gaussgauss", 5.0, 3.75).panel(panel)])
    }
}

// ---------------------------------------------------------------------------
// Cauchy posterior
// ---------------------------------------------------------------------------

struct PosteriorCauchy;

impl FigurePipeline for PosteriorCauchy {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch5-posterior-cauchy",
            chapter: "Chapter 5",
            title: "Posterior of a Cauchy distribution",
            description: "Marginal posteriors of μ and γ for ten Cauchy draws, and their \
                          cumulatives, against bootstrap distributions of the quartile \
                          estimates.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let xi = SeededRng::new(44).cauchy(0.0, 2.0, 10);

        let mu = Grid::linspace(-3.0, 3.0, 70)?;
        let gamma = Grid::linspace(0.01, 5.0, 70)?;
        let likelihood = log_l_surface(&mu, &gamma, |m, g| cauchy_log_l(&xi, m, g)).map(f64::exp);
        let (p_mu, p_gamma) = marginals(&likelihood);
        let c_mu = cumulative(&p_mu, mu.step());
        let c_gamma = cumulative(&p_gamma, gamma.step());

        let estimates = bootstrap(&xi, 20_000, &mut SeededRng::new(0), estimate_mu_gamma);
        let (mu_boot, gamma_boot): (Vec<f64>, Vec<f64>) = estimates.into_iter().unzip();
        let mu_hist = Histogram::new(&mu_boot, 20, (-3.0, 3.0))?;
        let gamma_hist = Histogram::new(&gamma_boot, 16, (0.0, 5.0))?;

        let solid = LineStyle::solid(Rgb::BLACK);
        let step = |h: Histogram| Layer::step_histogram(h.edges, h.counts, LineStyle::dashed(Rgb::BLUE));

        let fig = Figure::new("ch5-posterior-cauchy", 5.0, 5.0)
            .grid(2, 2)
            .panel(
                Panel::new(0, 0)
                    .xlabel("μ")
                    .ylabel("p(μ|x,I)")
                    .xlim(-3.0, 3.0)
                    .ylim(-0.05, 1.1)
                    .layer(Layer::line_xy(mu.points(), &p_mu, solid))
                    .layer(step(mu_hist.density())),
            )
            .panel(
                Panel::new(1, 0)
                    .xlabel("μ")
                    .ylabel("P(<μ|x,I)")
                    .xlim(-3.0, 3.0)
                    .ylim(-0.05, 1.1)
                    .layer(Layer::line_xy(mu.points(), &c_mu, solid))
                    .layer(step(mu_hist.cumulative())),
            )
            .panel(
                Panel::new(0, 1)
                    .xlabel("γ")
                    .ylabel("p(γ|x,I)")
                    .xlim(0.0, 4.0)
                    .ylim(-0.05, 1.1)
                    .layer(Layer::line_xy(gamma.points(), &p_gamma, solid))
                    .layer(step(gamma_hist.density())),
            )
            .panel(
                Panel::new(1, 1)
                    .xlabel("γ")
                    .ylabel("P(<γ|x,I)")
                    .xlim(0.0, 4.0)
                    .ylim(-0.05, 1.1)
                    .layer(Layer::line_xy(gamma.points(), &c_gamma, solid))
                    .layer(step(gamma_hist.cumulative())),
            );
        Ok(vec![fig])
    }
}
