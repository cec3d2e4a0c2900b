use eframe::egui::{self, Align, Align2, Color32, RichText, Stroke, Ui, UiBuilder};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Arrows, Legend, Line, MarkerShape, Plot, PlotPoint, PlotUi, Points, Polygon};

use astrofig::figure::{cell_edges, Anchor, Dash, Figure, HAlign, Layer, LineStyle, Marker, Panel, Text, VAlign};

use crate::state::AppState;

/// Heat maps are decimated to at most this many cells per axis.
const MAX_CELLS: usize = 150;

const NOTES_HEIGHT: f32 = 110.0;

// ---------------------------------------------------------------------------
// Figure view (central panel)
// ---------------------------------------------------------------------------

/// Render the selected figure in the central panel, one plot per panel.
pub fn figure_view(ui: &mut Ui, state: &AppState) {
    let (Some(info), Some(fig)) = (state.selected_info(), state.current_figure()) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Pick a figure from the list on the left");
        });
        return;
    };

    ui.heading(info.title);
    ui.label(RichText::new(info.description).weak());
    if let Some(title) = &fig.title {
        ui.vertical_centered(|ui: &mut Ui| ui.strong(title));
    }
    ui.separator();

    let avail = ui.available_rect_before_wrap();
    let grid_rect = egui::Rect::from_min_max(avail.min, egui::pos2(avail.max.x, avail.max.y - NOTES_HEIGHT));
    let (rows, cols) = fig.grid;
    let cell = egui::vec2(grid_rect.width() / cols as f32, grid_rect.height() / rows as f32);

    for (i, panel) in fig.panels.iter().enumerate() {
        let min = grid_rect.min + egui::vec2(panel.cell.col as f32 * cell.x, panel.cell.row as f32 * cell.y);
        let size = egui::vec2(panel.cell.col_span as f32 * cell.x, panel.cell.row_span as f32 * cell.y);
        let rect = egui::Rect::from_min_size(min, size).shrink(4.0);
        ui.scope_builder(UiBuilder::new().max_rect(rect), |ui: &mut Ui| {
            panel_plot(ui, &fig.id, i, panel, rect.size());
        });
    }

    let notes_rect = egui::Rect::from_min_max(egui::pos2(avail.min.x, avail.max.y - NOTES_HEIGHT), avail.max);
    ui.scope_builder(UiBuilder::new().max_rect(notes_rect), |ui: &mut Ui| {
        notes_table(ui, fig);
    });
}

/// One panel as an interactive plot, in drawing space (log10 on log axes).
fn panel_plot(ui: &mut Ui, fig_id: &str, index: usize, panel: &Panel, size: egui::Vec2) {
    let ((x0, x1), (y0, y1)) = panel.view();
    let x_axis = panel.x.clone();
    let y_axis = panel.y.clone();

    let mut plot = Plot::new(format!("{fig_id}/{index}"))
        .width(size.x)
        .height(size.y)
        .show_axes([panel.frame, panel.frame])
        .show_grid(panel.grid_lines)
        .x_axis_formatter(move |mark, _range| x_axis.tick_label(mark.value))
        .y_axis_formatter(move |mark, _range| y_axis.tick_label(mark.value))
        .include_x(x0)
        .include_x(x1)
        .include_y(y0)
        .include_y(y1)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if !panel.x.label.is_empty() {
        plot = plot.x_axis_label(panel.x.label.clone());
    }
    if !panel.y.label.is_empty() {
        plot = plot.y_axis_label(panel.y.label.clone());
    }
    if panel.legend {
        plot = plot.legend(Legend::default());
    }

    if let Some(title) = &panel.title {
        ui.label(RichText::new(title).small());
    }
    plot.show(ui, |plot_ui| {
        for layer in &panel.layers {
            draw_layer(plot_ui, panel, layer);
        }
        for text in &panel.texts {
            draw_text(plot_ui, panel, text, ((x0, x1), (y0, y1)));
        }
    });
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

fn to_plot(points: Vec<(f64, f64)>) -> Vec<[f64; 2]> {
    points.into_iter().map(|(x, y)| [x, y]).collect()
}

fn styled<'a>(line: Line<'a>, style: &LineStyle) -> Line<'a> {
    let line = line.color(style.color.to_color32()).width(style.width as f32);
    match style.dash {
        Dash::Solid => line,
        Dash::Dashed => line.style(egui_plot::LineStyle::dashed_dense()),
        Dash::Dotted => line.style(egui_plot::LineStyle::dotted_dense()),
    }
}

fn polyline(plot_ui: &mut PlotUi, panel: &Panel, points: &[(f64, f64)], style: &LineStyle, label: Option<&str>) {
    for (i, run) in panel.project_runs(points).into_iter().enumerate() {
        let mut line = styled(Line::new(to_plot(run)), style);
        if let (0, Some(name)) = (i, label) {
            line = line.name(name);
        }
        plot_ui.line(line);
    }
}

fn polygon(plot_ui: &mut PlotUi, panel: &Panel, outline: &[(f64, f64)], fill: Color32, stroke: Stroke) {
    let projected: Option<Vec<(f64, f64)>> = outline.iter().map(|&p| panel.project(p)).collect();
    if let Some(points) = projected {
        plot_ui.polygon(Polygon::new(to_plot(points)).fill_color(fill).stroke(stroke));
    }
}

fn marker_shape(marker: Marker) -> MarkerShape {
    match marker {
        Marker::Square => MarkerShape::Square,
        Marker::Pixel | Marker::Dot | Marker::Circle => MarkerShape::Circle,
    }
}

fn stroke_of(style: Option<&LineStyle>) -> Stroke {
    style.map_or(Stroke::NONE, |s| Stroke::new(s.width as f32, s.color.to_color32()))
}

fn draw_layer(plot_ui: &mut PlotUi, panel: &Panel, layer: &Layer) {
    match layer {
        Layer::Line { points, style, label } => polyline(plot_ui, panel, points, style, label.as_deref()),
        Layer::Scatter {
            points,
            marker,
            size,
            color,
            label,
        } => {
            let projected: Vec<(f64, f64)> = points.iter().filter_map(|&p| panel.project(p)).collect();
            let radius = if *marker == Marker::Pixel { 0.5 } else { (0.5 * size) as f32 };
            let mut series = Points::new(to_plot(projected))
                .shape(marker_shape(*marker))
                .filled(*marker != Marker::Circle)
                .radius(radius)
                .color(color.to_color32());
            if let Some(name) = label {
                series = series.name(name);
            }
            plot_ui.points(series);
        }
        Layer::ErrorBars {
            points,
            lower,
            upper,
            color,
            bar_color,
            marker,
        } => {
            let bar = LineStyle::solid(*bar_color);
            for ((&(x, y), lo), hi) in points.iter().zip(lower).zip(upper) {
                polyline(plot_ui, panel, &[(x, y - lo), (x, y + hi)], &bar, None);
            }
            if let Some(marker) = marker {
                let projected: Vec<(f64, f64)> = points.iter().filter_map(|&p| panel.project(p)).collect();
                plot_ui.points(
                    Points::new(to_plot(projected))
                        .shape(marker_shape(*marker))
                        .radius(2.0)
                        .color(color.to_color32()),
                );
            }
        }
        Layer::Histogram {
            edges,
            counts,
            fill,
            style,
            label,
        } => {
            if let Some(fill) = fill {
                for (e, &c) in edges.windows(2).zip(counts) {
                    let bar = [(e[0], 0.0), (e[1], 0.0), (e[1], c), (e[0], c)];
                    polygon(plot_ui, panel, &bar, fill.color.to_color32_alpha(fill.alpha), Stroke::NONE);
                }
            }
            let mut steps = Vec::with_capacity(2 * counts.len() + 2);
            if let Some(&first) = edges.first() {
                steps.push((first, 0.0));
            }
            for (e, &c) in edges.windows(2).zip(counts) {
                steps.push((e[0], c));
                steps.push((e[1], c));
            }
            if let Some(&last) = edges.last() {
                steps.push((last, 0.0));
            }
            polyline(plot_ui, panel, &steps, style, label.as_deref());
        }
        Layer::Heatmap {
            surface,
            colormap,
            norm,
            alpha,
            ..
        } => {
            let ex = cell_edges(surface.x().points());
            let ey = cell_edges(surface.y().points());
            let (ny, nx) = surface.shape();
            let (sx, sy) = (nx.div_ceil(MAX_CELLS).max(1), ny.div_ceil(MAX_CELLS).max(1));
            for iy in (0..ny).step_by(sy) {
                for ix in (0..nx).step_by(sx) {
                    let Some(t) = norm.position(surface.at(ix, iy)) else {
                        continue;
                    };
                    let (x_hi, y_hi) = (ex[(ix + sx).min(nx)], ey[(iy + sy).min(ny)]);
                    let cell = [(ex[ix], ey[iy]), (x_hi, ey[iy]), (x_hi, y_hi), (ex[ix], y_hi)];
                    polygon(plot_ui, panel, &cell, colormap.at(t).to_color32_alpha(*alpha), Stroke::NONE);
                }
            }
        }
        Layer::Segments { segments, style } => {
            for s in segments {
                polyline(plot_ui, panel, &[s.start, s.end], style, None);
            }
        }
        Layer::Ellipses { ellipses, fill, stroke } => {
            let fill = fill.map_or(Color32::TRANSPARENT, |f| f.color.to_color32_alpha(f.alpha));
            for e in ellipses {
                polygon(plot_ui, panel, &e.outline(64), fill, stroke_of(stroke.as_ref()));
            }
        }
        Layer::Polygons { polygons, fill, stroke } => {
            let fill = fill.map_or(Color32::TRANSPARENT, |f| f.color.to_color32_alpha(f.alpha));
            for p in polygons {
                polygon(plot_ui, panel, p, fill, stroke_of(stroke.as_ref()));
            }
        }
        Layer::Rects { rects, fill, stroke } => {
            let fill = fill.map_or(Color32::TRANSPARENT, |f| f.color.to_color32_alpha(f.alpha));
            for r in rects {
                let corners = [r.min, (r.max.0, r.min.1), r.max, (r.min.0, r.max.1)];
                polygon(plot_ui, panel, &corners, fill, stroke_of(stroke.as_ref()));
            }
        }
        Layer::FillBetween {
            x,
            lower,
            upper,
            fill,
            label,
        } => {
            // Egui fills convex shapes only, so the band is drawn as quads.
            let color = fill.color.to_color32_alpha(fill.alpha);
            for i in 1..x.len().min(lower.len()).min(upper.len()) {
                let quad = [
                    (x[i - 1], lower[i - 1]),
                    (x[i], lower[i]),
                    (x[i], upper[i]),
                    (x[i - 1], upper[i - 1]),
                ];
                polygon(plot_ui, panel, &quad, color, Stroke::NONE);
            }
            if let Some(name) = label {
                // Legend entry only.
                plot_ui.polygon(Polygon::new(Vec::<[f64; 2]>::new()).fill_color(color).name(name));
            }
        }
        Layer::Arrows { arrows, style } => {
            let mut tails = Vec::new();
            let mut tips = Vec::new();
            for a in arrows {
                let (Some(from), Some(to)) = (panel.project(a.from), panel.project(a.to)) else {
                    continue;
                };
                tails.push([from.0, from.1]);
                tips.push([to.0, to.1]);
                if a.double {
                    tails.push([to.0, to.1]);
                    tips.push([from.0, from.1]);
                }
            }
            plot_ui.arrows(Arrows::new(tails, tips).color(style.color.to_color32()));
        }
    }
}

fn draw_text(plot_ui: &mut PlotUi, panel: &Panel, text: &Text, view: ((f64, f64), (f64, f64))) {
    let ((x0, x1), (y0, y1)) = view;
    let pos = match text.anchor {
        Anchor::Axes => Some((x0 + text.pos.0 * (x1 - x0), y0 + text.pos.1 * (y1 - y0))),
        Anchor::Data => panel.project(text.pos),
    };
    let Some((x, y)) = pos else {
        return;
    };
    let h = match text.h_align {
        HAlign::Left => Align::Min,
        HAlign::Center => Align::Center,
        HAlign::Right => Align::Max,
    };
    let v = match text.v_align {
        VAlign::Top => Align::Min,
        VAlign::Center => Align::Center,
        VAlign::Bottom => Align::Max,
    };
    let mut label = RichText::new(&text.text).color(text.color.to_color32()).size(12.0 * text.scale as f32);
    if text.boxed {
        label = label.background_color(Color32::WHITE);
    }
    plot_ui.text(egui_plot::Text::new(PlotPoint::new(x, y), label).anchor(Align2([h, v])));
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Panel details the interactive plot cannot show: secondary axes and
/// colour bars.
fn notes_table(ui: &mut Ui, fig: &Figure) {
    let rows: Vec<(String, String)> = fig
        .panels
        .iter()
        .enumerate()
        .flat_map(|(i, p)| {
            let name = p.title.clone().unwrap_or_else(|| format!("panel {}", i + 1));
            let secondary = p
                .y2
                .as_ref()
                .map(|a| (name.clone(), format!("right axis {}: {:.3} to {:.3}", a.label, a.range.0, a.range.1)));
            let bars = p.layers.iter().filter_map(move |l| match l {
                Layer::Heatmap {
                    colorbar: Some(label), ..
                } => Some(format!("colour bar: {label}")),
                _ => None,
            });
            secondary.into_iter().chain(bars.map(move |b| (name.clone(), b)))
        })
        .collect();

    ui.separator();
    if rows.is_empty() {
        ui.label(RichText::new(format!("{} ({} panels)", fig.id, fig.panels.len())).weak());
        return;
    }
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Panel");
            });
            header.col(|ui| {
                ui.strong("Note");
            });
        })
        .body(|mut body| {
            for (panel, note) in &rows {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(panel);
                    });
                    row.col(|ui| {
                        ui.label(note);
                    });
                });
            }
        });
}
