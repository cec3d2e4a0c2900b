//! Chapter 8: regression, built up one point at a time and with errors
//! on both axes.

use anyhow::Result;

use super::{sigma_contours, Context, FigureInfo, FigurePipeline, SIGMA_LEVELS};
use crate::color::{Colormap, Rgb};
use crate::data::datasets::DatasetKey;
use crate::data::model::{linspace, Grid, Surface2};
use crate::data::synth::SeededRng;
use crate::figure::{
    Arrow, Ellipse, Figure, Fill, HAlign, Layer, LineStyle, Marker, Norm, Panel, Text, VAlign,
};
use crate::stats::likelihood::{
    convert_to_stdev, line_point_log_l, log_l_surface, normal_vector, principal_axes, slope_intercept,
    tls_log_l,
};
use crate::stats::optimize::{fmin, FminOptions};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(LinregInline), Box::new(TotalLeastSquares)]
}

// ---------------------------------------------------------------------------
// Likelihood built up point by point
// ---------------------------------------------------------------------------

struct LinregInline;

impl FigurePipeline for LinregInline {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch8-linreg-inline",
            chapter: "Chapter 8",
            title: "Line fit one point at a time",
            description: "Three points with errors fit by a line, then the slope/intercept \
                          likelihood as each point is added, the fourth being an upper limit.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let (a, b) = (1.0, 0.0);
        let x = [-1.0, 0.44, -0.16];
        let dy = [0.25, 0.22, 0.2];
        let truth: Vec<f64> = x.iter().map(|x| a * x + b).collect();
        let y = SeededRng::new(13).normal_each(&truth, &dy);
        let (x4, y4) = (1.0, a * 1.0 + b + 0.2);

        let slopes = Grid::linspace(0.0, 2.0, 80)?;
        let intercepts = Grid::linspace(-1.0, 1.0, 80)?;
        let single: Vec<Surface2> = (0..3)
            .map(|i| Surface2::from_fn(&slopes, &intercepts, |s, c| line_point_log_l(s, c, x[i], y[i], dy[i])))
            .collect();
        // Joint likelihood of the first `k` points, and of all three with
        // the region above the upper limit excluded.
        let joint = |k: usize, limit: bool| {
            log_l_surface(&slopes, &intercepts, |s, c| {
                if limit && y4 < s * x4 + c {
                    return f64::NEG_INFINITY;
                }
                (0..k).map(|i| line_point_log_l(s, c, x[i], y[i], dy[i])).sum()
            })
        };
        let (a_max, b_max) = joint(3, false).argmax();

        // The fit.
        let x_fit = [-1.5, 1.5];
        let mut fit = Panel::new(0, 0)
            .xlabel("x")
            .ylabel("y")
            .xlim(-1.5, 1.5)
            .ylim(-2.0, 2.0)
            .legend()
            .layer(Layer::line(x_fit.iter().map(|&v| (v, a * v + b)).collect(), LineStyle::dotted(Rgb::BLACK)).labeled("True fit"))
            .layer(
                Layer::line(x_fit.iter().map(|&v| (v, a_max * v + b_max)).collect(), LineStyle::dashed(Rgb::BLACK))
                    .labeled("fit to {x1, x2, x3}"),
            )
            .layer(Layer::ErrorBars {
                points: x.iter().copied().zip(y.iter().copied()).collect(),
                lower: dy.to_vec(),
                upper: dy.to_vec(),
                color: Rgb::BLACK,
                bar_color: Rgb::BLACK,
                marker: Some(Marker::Circle),
            })
            .layer(Layer::hline(y4, x4 - 0.04, x4 + 0.04, LineStyle::solid(Rgb::BLACK)))
            .layer(Layer::Arrows {
                arrows: vec![Arrow {
                    from: (x4, y4),
                    to: (x4, y4 - 0.5),
                    double: false,
                }],
                style: LineStyle::solid(Rgb::BLACK),
            })
            .text(Text::data("x4", x4 + 0.05, y4 - 0.5));
        for i in 0..3 {
            fit = fit.text(Text::data(&format!("x{}", i + 1), x[i] + 0.05, y[i] - 0.3));
        }

        // The build-up.
        let mut build_up = Figure::new("ch8-linreg-inline-likelihood", 5.0, 5.0).grid(2, 2);
        let filled_levels = [0.0, SIGMA_LEVELS[0], SIGMA_LEVELS[1], SIGMA_LEVELS[2]];
        for i in 0..4 {
            let mut panel = Panel::new(i / 2, i % 2).xlim(0.001, 2.0).ylim(-0.999, 1.0);
            for surface in single.iter().take((i + 1).min(3)) {
                panel = panel.layer(Layer::Heatmap {
                    surface: convert_to_stdev(surface)?,
                    colormap: Colormap::Binary,
                    norm: Norm::Levels(filled_levels.to_vec()),
                    alpha: 0.5,
                    colorbar: None,
                });
            }
            if i == 3 {
                let s = slopes.points();
                panel = panel.layer(Layer::FillBetween {
                    x: s.to_vec(),
                    lower: s.iter().map(|s| y4 - x4 * s).collect(),
                    upper: vec![2.0; s.len()],
                    fill: Fill::new(Rgb::BLACK, 0.5),
                    label: None,
                });
            }
            if i > 0 {
                let surface = joint((i + 1).min(3), i == 3);
                panel = panel.layer(sigma_contours(&surface, LineStyle::solid(Rgb::BLACK))?);
            }
            panel = panel
                .layer(Layer::hline(0.0, 0.0, 2.0, LineStyle::dotted(Rgb::BLACK)))
                .layer(Layer::vline(1.0, -1.0, 1.0, LineStyle::dotted(Rgb::BLACK)))
                .text(Text::data(&format!("x{}", i + 1), 1.98, -0.98).align(HAlign::Right, VAlign::Bottom));
            panel = if i % 2 == 1 { panel.hide_yticks() } else { panel.ylabel("θ2") };
            panel = if i < 2 { panel.hide_xticks() } else { panel.xlabel("θ1") };
            build_up = build_up.panel(panel);
        }

        Ok(vec![
            Figure::new("ch8-linreg-inline", 5.0, 3.75).panel(fit),
            build_up,
        ])
    }
}

// ---------------------------------------------------------------------------
// Total least squares
// ---------------------------------------------------------------------------

struct TotalLeastSquares;

impl FigurePipeline for TotalLeastSquares {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch8-total-least-squares",
            chapter: "Chapter 8",
            title: "Total least squares",
            description: "A line fit to points with correlated x and y errors (outliers \
                          removed), and the 1, 2 and 3σ contours of its slope and intercept.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::Hogg2010)?;
        // The first five rows are outliers.
        let data = data.slice(5, data.len());
        let (x, y) = (data.column("x")?, data.column("y")?);
        let (sigma_x, sigma_y, rho) = (data.column("sigma_x")?, data.column("sigma_y")?, data.column("rho_xy")?);

        let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        let covs: Vec<[f64; 3]> = (0..points.len())
            .map(|i| {
                let sxy = rho[i] * sigma_x[i] * sigma_y[i];
                [sigma_x[i].powi(2), sxy, sigma_y[i].powi(2)]
            })
            .collect();

        let beta = fmin(|v| -tls_log_l((v[0], v[1]), &points, &covs), &[-1.0, 1.0], FminOptions::default());
        let (m_fit, b_fit) = slope_intercept((beta[0], beta[1]));
        log::info!("TLS fit: slope {m_fit:.3}, intercept {b_fit:.2}");

        let ellipses = (0..points.len())
            .map(|i| {
                let (s1, s2, angle) = principal_axes(sigma_x[i], sigma_y[i], rho[i]);
                Ellipse {
                    center: points[i],
                    width: 2.0 * s1,
                    height: 2.0 * s2,
                    angle,
                }
            })
            .collect();
        let x_fit = linspace(0.0, 300.0, 10);

        let fit = Panel::new(0, 0)
            .xlabel("x")
            .ylabel("y")
            .xlim(40.0, 250.0)
            .ylim(100.0, 600.0)
            .layer(Layer::Ellipses {
                ellipses,
                fill: None,
                stroke: Some(LineStyle::solid(Rgb::BLACK)),
            })
            .layer(Layer::scatter(points.clone(), Marker::Circle, 3.0, Rgb::BLACK))
            .layer(Layer::line(x_fit.iter().map(|&v| (v, m_fit * v + b_fit)).collect(), LineStyle::solid(Rgb::BLACK)));

        let slope = Grid::linspace(1.7, 2.8, 100)?;
        let intercept = Grid::linspace(-60.0, 110.0, 100)?;
        let log_l = log_l_surface(&slope, &intercept, |m, b| tls_log_l(normal_vector(m, b), &points, &covs));
        let contours = Panel::new(0, 1)
            .xlabel("slope")
            .ylabel("intercept")
            .xlim(1.7, 2.8)
            .ylim(-60.0, 110.0)
            .layer(sigma_contours(&log_l, LineStyle::solid(Rgb::BLACK))?);

        Ok(vec![Figure::new("ch8-total-least-squares", 5.0, 2.5)
            .grid(1, 2)
            .panel(fit)
            .panel(contours)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_fit_matches_published_slope() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::Config {
            data_dir: dir.path().to_path_buf(),
            cache_enabled: false,
            ..Default::default()
        };
        let figs = TotalLeastSquares.build(&Context::new(config)).unwrap();
        let fit_line = figs[0].panels[0]
            .layers
            .iter()
            .find_map(|l| match l {
                Layer::Line { points, .. } => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        let slope = (fit_line[1].1 - fit_line[0].1) / (fit_line[1].0 - fit_line[0].0);
        assert!(slope > 1.7 && slope < 2.8, "slope {slope}");
    }

    #[test]
    fn linreg_builds_two_figures() {
        let figs = LinregInline.build(&Context::new(crate::config::Config::default())).unwrap();
        assert_eq!(figs.len(), 2);
        assert_eq!(figs[1].panels.len(), 4);
        assert_eq!(figs[1].id, "ch8-linreg-inline-likelihood");
    }
}
