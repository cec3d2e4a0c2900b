//! Chapter 7: principal components as a rotation, and the shapes of a
//! thin SVD.

use std::f64::consts::PI;

use anyhow::Result;

use super::{Context, FigureInfo, FigurePipeline};
use crate::color::Rgb;
use crate::data::model::linspace;
use crate::data::synth::SeededRng;
use crate::figure::{
    Arrow, Ellipse, Figure, Fill, HAlign, Layer, LineStyle, Marker, Panel, Rect, Text, VAlign,
};
use crate::stats::pca::{project_onto_line, rotate, thin_svd_shapes};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(PcaRotation), Box::new(SvdVisual)]
}

// ---------------------------------------------------------------------------
// PCA rotation
// ---------------------------------------------------------------------------

struct PcaRotation;

impl FigurePipeline for PcaRotation {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch7-pca-rotation",
            chapter: "Chapter 7",
            title: "PCA as a rotation",
            description: "100 points from an elongated Gaussian rotated by 30°, projected onto \
                          the major axis, with 1, 2 and 3σ ellipses and both coordinate frames.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let (r, sigma1, sigma2) = (0.9, 0.25, 0.08);
        let rotation = PI / 6.0;
        let (s, c) = rotation.sin_cos();

        let mut rng = SeededRng::new(42);
        let raw: Vec<[f64; 2]> = (0..100).map(|_| [rng.normal(0.0, sigma1), rng.normal(0.0, sigma2)]).collect();
        let points = rotate(&raw, rotation);

        let normal = [s, -c];
        let projections = points.iter().map(|&p| {
            let q = project_onto_line(p, normal);
            Layer::line(vec![(p[0], p[1]), (q[0], q[1])], LineStyle::solid(Rgb::BLACK))
        });

        let ellipses = (1..=3)
            .map(|k| Ellipse {
                center: (0.0, 0.0),
                width: 2.0 * k as f64 * sigma1,
                height: 2.0 * k as f64 * sigma2,
                angle: rotation,
            })
            .collect();

        let axes = [
            ("x", (-r, 0.0), (r, 0.0)),
            ("y", (0.0, -r), (0.0, r)),
            ("x′", (-r * c, -r * s), (r * c, r * s)),
            ("y′", (r * s, -r * c), (-r * s, r * c)),
        ];
        let arrows = axes
            .iter()
            .map(|&(_, from, to)| Arrow { from, to, double: true })
            .collect();

        let mut panel = Panel::new(0, 0)
            .frameless()
            .xlim(-1.0, 1.0)
            .ylim(-1.0, 1.0)
            .layer(Layer::Ellipses {
                ellipses,
                fill: Some(Fill::new(Rgb::GRAY, 0.2)),
                stroke: Some(LineStyle::solid(Rgb::BLACK)),
            })
            .layers(projections)
            .layer(Layer::Arrows {
                arrows,
                style: LineStyle::solid(Rgb::BLACK),
            })
            .layer(Layer::scatter(
                points.iter().map(|p| (p[0], p[1])).collect(),
                Marker::Circle,
                5.0,
                Rgb::BLACK,
            ));
        for (label, _, to) in axes {
            panel = panel.text(Text::data(label, to.0, to.1).align(HAlign::Center, VAlign::Center).boxed());
        }
        Ok(vec![Figure::new("ch7-pca-rotation", 5.0, 5.0).panel(panel)])
    }
}

// ---------------------------------------------------------------------------
// SVD block diagram
// ---------------------------------------------------------------------------

struct SvdVisual;

#[derive(Clone, Copy)]
enum Stripe {
    Vertical(usize),
    Horizontal(usize),
    Diagonal,
}

/// Side length of one `min(N, D)` block in the diagram.
const BLOCK: f64 = 0.25;

impl FigurePipeline for SvdVisual {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch7-svd-visual",
            chapter: "Chapter 7",
            title: "Singular value decomposition",
            description: "Block shapes of X = U Σ Vᵀ for a wide (N < D) and a tall (N > D) data \
                          matrix.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let mut panel = Panel::new(0, 0).frameless().xlim(0.0, 2.0).ylim(0.0, 1.0);

        // Matrix shapes in units of the smaller dimension.
        let cases = [
            (0.75, (1, 2), [0.3, 0.975, 1.275, 1.7], 7, "1"),
            (0.3, (2, 1), [0.3, 0.975, 1.275, 1.575], 15, "2"),
        ];
        for (y, (n, d), centers, x_lines, suffix) in cases {
            let shapes = thin_svd_shapes(n, d);
            let names = ["X", "U", "Σ", "Vᵀ"];
            let stripes = [
                Stripe::Horizontal(x_lines),
                Stripe::Vertical(7),
                Stripe::Diagonal,
                Stripe::Horizontal(7),
            ];
            for (((&(rows, cols), name), stripe), cx) in shapes.iter().zip(names).zip(stripes).zip(centers) {
                let (w, h) = (cols as f64 * BLOCK, rows as f64 * BLOCK);
                panel = labeled_block(panel, (cx, y), w, h, &format!("{name}{suffix}"), stripe);
            }
            panel = panel.text(Text::data("=", 0.7, y).align(HAlign::Center, VAlign::Center).scaled(1.75));
        }
        Ok(vec![Figure::new("ch7-svd-visual", 5.0, 2.5).panel(panel)])
    }
}

fn labeled_block(panel: Panel, center: (f64, f64), w: f64, h: f64, text: &str, stripe: Stripe) -> Panel {
    let (left, right) = (center.0 - 0.5 * w, center.0 + 0.5 * w);
    let (bottom, top) = (center.1 - 0.5 * h, center.1 + 0.5 * h);
    let black = LineStyle::solid(Rgb::BLACK);

    let lines: Vec<Layer> = match stripe {
        Stripe::Vertical(n) => linspace(left, right, n + 2)[1..=n]
            .iter()
            .map(|&x| Layer::vline(x, bottom, top, black))
            .collect(),
        Stripe::Horizontal(n) => linspace(bottom, top, n + 2)[1..=n]
            .iter()
            .map(|&y| Layer::hline(y, left, right, black))
            .collect(),
        Stripe::Diagonal => vec![Layer::line(vec![(left, top), (right, bottom)], black)],
    };

    panel
        .layer(Layer::Rects {
            rects: vec![Rect {
                min: (left, bottom),
                max: (right, top),
            }],
            fill: Some(Fill::new(Rgb::LIGHT_GRAY, 1.0)),
            stroke: Some(black),
        })
        .layers(lines)
        .text(
            Text::data(text, center.0, center.1)
                .align(HAlign::Center, VAlign::Center)
                .boxed()
                .scaled(1.75),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svd_diagram_has_eight_blocks() {
        let ctx = Context::new(crate::config::Config::default());
        let figs = SvdVisual.build(&ctx).unwrap();
        let rects = figs[0].panels[0]
            .layers
            .iter()
            .filter(|l| matches!(l, Layer::Rects { .. }))
            .count();
        assert_eq!(rects, 8);
    }

    #[test]
    fn projections_land_on_major_axis() {
        let ctx = Context::new(crate::config::Config::default());
        let figs = PcaRotation.build(&ctx).unwrap();
        let (s, c) = (PI / 6.0).sin_cos();
        let mut checked = 0;
        for layer in &figs[0].panels[0].layers {
            if let Layer::Line { points, .. } = layer {
                let (x, y) = points[1];
                assert!((x * s - y * c).abs() < 1e-12);
                checked += 1;
            }
        }
        assert_eq!(checked, 100);
    }
}
