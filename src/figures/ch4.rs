//! Chapter 4: judging a model by χ² per degree of freedom.

use anyhow::Result;

use super::{Context, FigureInfo, FigurePipeline};
use crate::color::Rgb;
use crate::data::model::linspace;
use crate::data::synth::SeededRng;
use crate::figure::{Figure, HAlign, Layer, LineStyle, Marker, Panel, Text, VAlign};
use crate::stats::distributions::chi2_about_mean;

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(Chi2Eval)]
}

struct Chi2Eval;

const N: usize = 50;
const L0: f64 = 10.0;
const DL: f64 = 0.2;

impl FigurePipeline for Chi2Eval {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch4-chi2-eval",
            chapter: "Chapter 4",
            title: "Evaluating χ² per degree of freedom",
            description: "50 constant-luminosity observations fit by their mean, with correct, \
                          over- and underestimated errors, and under a wrong model.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let mut rng = SeededRng::new(1);
        let t = linspace(0.0, 1.0, N);
        let observed = rng.normals(L0, DL, N);
        let drifting: Vec<f64> = observed.iter().zip(&t).map(|(l, t)| l + 0.5 - t * t).collect();

        let cases = [
            ("correct errors", &observed, DL),
            ("overestimated errors", &observed, DL * 2.0),
            ("underestimated errors", &observed, DL / 2.0),
            ("incorrect model", &drifting, DL),
        ];

        let mut fig = Figure::new("ch4-chi2-eval", 5.0, 5.0).grid(2, 2);
        for (i, (title, values, err)) in cases.into_iter().enumerate() {
            let summary = chi2_about_mean(values, err);
            let points: Vec<(f64, f64)> = t.iter().copied().zip(values.iter().copied()).collect();

            let mut panel = Panel::new(i / 2, i % 2)
                .xlim(-0.05, 1.05)
                .ylim(8.6, 11.4)
                .hide_xticks()
                .layer(Layer::ErrorBars {
                    lower: vec![err; points.len()],
                    upper: vec![err; points.len()],
                    points,
                    color: Rgb::BLACK,
                    bar_color: Rgb::GRAY,
                    marker: Some(Marker::Dot),
                })
                .layer(Layer::hline(L0, -0.1, 1.3, LineStyle::dotted(Rgb::BLACK)))
                .text(Text::axes(title, 0.95, 0.95).align(HAlign::Right, VAlign::Top).boxed())
                .text(Text::axes(&format!("μ̂ = {:.2}", summary.mean), 0.02, 0.02).align(HAlign::Left, VAlign::Bottom))
                .text(
                    Text::axes(
                        &format!("χ²_dof = {:.2} ({:.2}σ)", summary.chi2_dof, summary.n_sigma),
                        0.98,
                        0.02,
                    )
                    .align(HAlign::Right, VAlign::Bottom),
                );
            if i > 1 {
                panel = panel.xlabel("observations");
            }
            panel = if i % 2 == 0 { panel.ylabel("Luminosity") } else { panel.hide_yticks() };
            fig = fig.panel(panel);
        }
        Ok(vec![fig])
    }
}
