//! Chapter 3: the common distributions, and how a density transforms
//! under a change of variables.

use anyhow::Result;

use super::{map_values, Context, FigureInfo, FigurePipeline};
use crate::color::Rgb;
use crate::data::model::{arange, linspace};
use crate::data::synth::SeededRng;
use crate::figure::{Figure, Fill, HAlign, Layer, LineStyle, Panel, Text, VAlign};
use crate::stats::density::Histogram;
use crate::stats::distributions::{Binomial, Cauchy, Density, Mass, Normal, Poisson, Uniform};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![
        Box::new(binomial()),
        Box::new(cauchy()),
        Box::new(norm()),
        Box::new(poisson()),
        Box::new(uniform()),
        Box::new(TransformDistribution),
    ]
}

// ---------------------------------------------------------------------------
// Curve families
// ---------------------------------------------------------------------------

/// Solid, dashed, dotted: one per family member.
const STYLES: [LineStyle; 3] = [
    LineStyle::solid(Rgb::BLACK),
    LineStyle::dashed(Rgb::BLACK),
    LineStyle::dotted(Rgb::BLACK),
];

/// One distribution drawn for three parameter choices.
struct Family {
    info: FigureInfo,
    heading: &'static str,
    ylabel: &'static str,
    xlim: (f64, f64),
    ylim: (f64, f64),
    /// `(legend label, curve)` per member.
    curves: fn() -> Vec<(String, Vec<(f64, f64)>)>,
}

impl FigurePipeline for Family {
    fn info(&self) -> FigureInfo {
        self.info
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let mut panel = Panel::new(0, 0)
            .title(self.heading)
            .xlabel("x")
            .ylabel(self.ylabel)
            .xlim(self.xlim.0, self.xlim.1)
            .ylim(self.ylim.0, self.ylim.1)
            .legend();
        for ((label, points), style) in (self.curves)().into_iter().zip(STYLES) {
            panel = panel.layer(Layer::line(points, style).labeled(&label));
        }
        Ok(vec![Figure::new(self.info.id, 5.0, 3.75).panel(panel)])
    }
}

fn curve(x: &[f64], y: Vec<f64>) -> Vec<(f64, f64)> {
    x.iter().copied().zip(y).collect()
}

fn binomial() -> Family {
    Family {
        info: FigureInfo {
            id: "ch3-binomial-distribution",
            chapter: "Chapter 3",
            title: "Binomial distribution",
            description: "p(x|b, n) for (b, n) = (0.2, 20), (0.6, 20), (0.6, 40).",
        },
        heading: "Binomial Distribution",
        ylabel: "p(x|b, n)",
        xlim: (-0.5, 35.0),
        ylim: (0.0, 0.25),
        curves: || {
            let x = arange(-1.0, 200.0, 1.0);
            [(20, 0.2), (20, 0.6), (40, 0.6)]
                .into_iter()
                .map(|(n, b)| {
                    let dist = Binomial::new(n, b);
                    (format!("b={b:.1}, n={n}"), curve(&x, dist.pmf_all(&x)))
                })
                .collect()
        },
    }
}

fn cauchy() -> Family {
    Family {
        info: FigureInfo {
            id: "ch3-cauchy-distribution",
            chapter: "Chapter 3",
            title: "Cauchy distribution",
            description: "p(x|μ, γ) for μ = 0 and γ = 0.5, 1, 2.",
        },
        heading: "Cauchy Distribution",
        ylabel: "p(x|μ,γ)",
        xlim: (-4.5, 4.5),
        ylim: (0.0, 0.65),
        curves: || {
            let x = linspace(-10.0, 10.0, 1000);
            [0.5, 1.0, 2.0]
                .into_iter()
                .map(|gamma| {
                    let dist = Cauchy::new(0.0, gamma);
                    (format!("μ=0, γ={gamma:.1}"), curve(&x, dist.pdf_all(&x)))
                })
                .collect()
        },
    }
}

fn norm() -> Family {
    Family {
        info: FigureInfo {
            id: "ch3-norm-distribution",
            chapter: "Chapter 3",
            title: "Gaussian distribution",
            description: "p(x|μ, σ) for μ = 0 and σ = 0.5, 1, 2.",
        },
        heading: "Gaussian Distribution",
        ylabel: "p(x|μ,σ)",
        xlim: (-5.0, 5.0),
        ylim: (0.0, 0.85),
        curves: || {
            let x = linspace(-10.0, 10.0, 1000);
            [0.5, 1.0, 2.0]
                .into_iter()
                .map(|sigma| {
                    let dist = Normal::new(0.0, sigma);
                    (format!("μ=0, σ={sigma:.1}"), curve(&x, dist.pdf_all(&x)))
                })
                .collect()
        },
    }
}

fn poisson() -> Family {
    Family {
        info: FigureInfo {
            id: "ch3-poisson-distribution",
            chapter: "Chapter 3",
            title: "Poisson distribution",
            description: "p(x|μ) for μ = 1, 5, 15.",
        },
        heading: "Poisson Distribution",
        ylabel: "p(x|μ)",
        xlim: (-0.5, 30.0),
        ylim: (0.0, 0.4),
        curves: || {
            let x = arange(-1.0, 200.0, 1.0);
            [1.0, 5.0, 15.0]
                .into_iter()
                .map(|mu| {
                    let dist = Poisson::new(mu);
                    (format!("μ={mu}"), curve(&x, dist.pmf_all(&x)))
                })
                .collect()
        },
    }
}

fn uniform() -> Family {
    Family {
        info: FigureInfo {
            id: "ch3-uniform-distribution",
            chapter: "Chapter 3",
            title: "Uniform distribution",
            description: "p(x|μ, W) for μ = 0 and widths W = 1, 2, 3.",
        },
        heading: "Uniform Distribution",
        ylabel: "p(x|μ, W)",
        xlim: (-1.7, 1.7),
        ylim: (0.0, 1.2),
        curves: || {
            let x = linspace(-2.0, 2.0, 1000);
            [1.0, 2.0, 3.0]
                .into_iter()
                .map(|w| {
                    let dist = Uniform::centered(0.0, w);
                    (format!("μ=0, W={w}"), curve(&x, dist.pdf_all(&x)))
                })
                .collect()
        },
    }
}

// ---------------------------------------------------------------------------
// Change of variables
// ---------------------------------------------------------------------------

struct TransformDistribution;

impl FigurePipeline for TransformDistribution {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch3-transform-distribution",
            chapter: "Chapter 3",
            title: "Transforming a distribution",
            description: "1000 uniform draws and their exponentials, with p_y(y) = p_x(ln y) / y \
                          over the histogram of y.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let mut rng = SeededRng::new(0);
        let x_sample = rng.uniform(1000);
        let y_sample = map_values(&x_sample, f64::exp);

        let dist = Uniform::new(0.0, 1.0);
        let x = linspace(-0.5, 1.5, 1000);
        let px = dist.pdf_all(&x);
        let y = map_values(&x, f64::exp);
        let py: Vec<f64> = px.iter().zip(&y).map(|(p, y)| p / y).collect();

        let gray = Some(Fill::new(Rgb::LIGHT_GRAY, 1.0));
        let hist = |values: &[f64]| -> Result<Layer> {
            let h = Histogram::auto(values, 20)?.density();
            Ok(Layer::Histogram {
                edges: h.edges,
                counts: h.counts,
                fill: gray,
                style: LineStyle::solid(Rgb::BLACK).width(0.5),
                label: None,
            })
        };

        let left = Panel::new(0, 0)
            .xlabel("x")
            .ylabel("p_x(x)")
            .xlim(-0.2, 1.2)
            .ylim(0.0, 1.4001)
            .layer(hist(&x_sample)?)
            .layer(Layer::line_xy(&x, &px, LineStyle::solid(Rgb::BLACK)))
            .text(Text::axes("p_x(x) = Uniform(x)", 0.95, 0.95).align(HAlign::Right, VAlign::Top));
        let right = Panel::new(0, 1)
            .xlabel("y")
            .ylabel("p_y(y)")
            .xlim(0.85, 2.9)
            .layer(hist(&y_sample)?)
            .layer(Layer::line_xy(&y, &py, LineStyle::solid(Rgb::BLACK)))
            .text(Text::axes("y = exp(x)", 0.95, 0.95).align(HAlign::Right, VAlign::Top))
            .text(Text::axes("p_y(y) = p_x(ln y) / y", 0.95, 0.87).align(HAlign::Right, VAlign::Top));

        Ok(vec![Figure::new("ch3-transform-distribution", 5.0, 2.5)
            .grid(1, 2)
            .panel(left)
            .panel(right)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_have_three_members() {
        for family in [binomial(), cauchy(), norm(), poisson(), uniform()] {
            let curves = (family.curves)();
            assert_eq!(curves.len(), 3, "{}", family.info.id);
            for (_, points) in curves {
                assert!(points.iter().all(|(_, y)| y.is_finite() && *y >= 0.0));
            }
        }
    }

    #[test]
    fn poisson_curve_peaks_near_mean() {
        let curves = (poisson().curves)();
        let (_, points) = &curves[2];
        let peak = points
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |acc, p| if p.1 > acc.1 { p } else { acc });
        assert!((peak.0 - 15.0).abs() <= 1.0);
    }
}
