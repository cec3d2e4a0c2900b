//! Chapter 2: how search and sort times grow with array length.
//!
//! Timings come from the wall clock, so these figures differ between runs
//! and machines. Sizes are two decades below the book's to keep memory
//! modest; the slopes are what matter.

use anyhow::Result;

use super::{Context, FigureInfo, FigurePipeline};
use crate::color::Rgb;
use crate::data::model::linspace;
use crate::figure::{Figure, Layer, LineStyle, Marker, Panel};
use crate::stats::scaling::{log_sizes, search_scaling, sort_scaling, Timings};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(SearchScaling), Box::new(SortScaling)]
}

fn timing_points(t: &Timings) -> Vec<(f64, f64)> {
    t.sizes.iter().copied().zip(t.seconds.iter().copied()).collect()
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

struct SearchScaling;

/// Index of the measurement the reference lines pass through.
const SEARCH_ANCHOR: usize = 7;

impl FigurePipeline for SearchScaling {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch2-search-scaling",
            chapter: "Chapter 2",
            title: "Scaling of search algorithms",
            description: "Time to find an element by linear scan and by binary search, for 17 \
                          array lengths, against O(N) and O(log N). Not reproducible: timings \
                          come from the wall clock.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let sizes = log_sizes(5.0, 6.8, 17);
        let (linear, binary) = search_scaling(&sizes);

        let anchor = SEARCH_ANCHOR.min(sizes.len() - 1);
        let n0 = linear.sizes[anchor];
        let scale: Vec<f64> = linspace(4.0, 7.0, 100).iter().map(|e| 10f64.powf(*e)).collect();
        let o_n: Vec<(f64, f64)> = scale
            .iter()
            .map(|&s| (s, s * linear.seconds[anchor] / n0))
            .collect();
        let o_log_n: Vec<(f64, f64)> = scale
            .iter()
            .map(|&s| (s, s.ln() * binary.seconds[anchor] / n0.ln()))
            .collect();

        let panel = Panel::new(0, 0)
            .title("Scaling of Search Algorithms")
            .xlabel("Length of Array")
            .ylabel("Relative search time")
            .xlog()
            .ylog()
            .grid()
            .legend()
            .layer(Layer::scatter(timing_points(&linear), Marker::Circle, 5.0, Rgb::GRAY).labeled("linear search"))
            .layer(Layer::scatter(timing_points(&binary), Marker::Square, 5.0, Rgb::GRAY).labeled("binary search"))
            .layer(Layer::line(o_n, LineStyle::dashed(Rgb::BLACK)).labeled("O[N]"))
            .layer(Layer::line(o_log_n, LineStyle::dashed(Rgb::BLACK)).labeled("O[log N]"));
        Ok(vec![Figure::new("ch2-search-scaling", 5.0, 3.75).panel(panel)])
    }
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

struct SortScaling;

impl FigurePipeline for SortScaling {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch2-sort-scaling",
            chapter: "Chapter 2",
            title: "Scaling of sort algorithms",
            description: "Unstable sort of a contiguous f64 slice and stable sort of boxed values, \
                          against O(N log N) and O(N). Not reproducible: timings come from the \
                          wall clock.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let flat_sizes = log_sizes(4.0, 6.0, 10);
        let boxed_sizes = &flat_sizes[..7];
        let (flat, boxed) = sort_scaling(&flat_sizes, boxed_sizes, 0);

        let lo = flat.sizes[0] / 2.0;
        let hi = flat.sizes[flat.sizes.len() - 1] * 2.0;
        let scale = linspace(lo, hi, 100);

        let mut panel = Panel::new(0, 0)
            .title("Scaling of Sort Algorithms")
            .xlabel("Length of Array")
            .ylabel("Relative sort time")
            .xlog()
            .ylog()
            .xlim(lo, hi)
            .grid()
            .legend()
            .layer(Layer::scatter(timing_points(&boxed), Marker::Square, 5.0, Rgb::GRAY).labeled("boxed sort"))
            .layer(Layer::scatter(timing_points(&flat), Marker::Circle, 5.0, Rgb::GRAY).labeled("slice sort"));

        // Reference lines through the first measurement of each series;
        // only the first pair carries legend entries.
        for (i, t) in [&flat, &boxed].into_iter().enumerate() {
            let (n0, t0) = (t.sizes[0], t.seconds[0]);
            let n_log_n = scale
                .iter()
                .map(|&s| (s, s * s.log2() * t0 / n0 / n0.log2()))
                .collect();
            let n = scale.iter().map(|&s| (s, s * t0 / n0)).collect();
            let (mut a, mut b) = (
                Layer::line(n_log_n, LineStyle::dashed(Rgb::BLACK)),
                Layer::line(n, LineStyle::dotted(Rgb::BLACK)),
            );
            if i == 0 {
                a = a.labeled("O[N log N]");
                b = b.labeled("O[N]");
            }
            panel = panel.layer(a).layer(b);
        }
        Ok(vec![Figure::new("ch2-sort-scaling", 5.0, 3.75).panel(panel)])
    }
}
