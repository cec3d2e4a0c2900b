//! Rasterise a [`Figure`] with plotters and write it as PNG.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use plotters::coord::types::RangedCoordf64;
use plotters::chart::SeriesAnno;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{cell_edges, Anchor, Axis, Dash, Figure, HAlign, Layer, LineStyle, Marker, Norm, Panel, Scale, VAlign};
use super::Text as Label;
use crate::color::{Colormap, Rgb};
use crate::config::Config;
use crate::error::{Error, Result};

type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type View = ((f64, f64), (f64, f64));

trait OrRender<T> {
    fn or_render(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> OrRender<T> for std::result::Result<T, E> {
    fn or_render(self) -> Result<T> {
        self.map_err(|e| Error::Render(e.to_string()))
    }
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Where `figure` is written under the configured output directory.
pub fn output_path(config: &Config, figure: &Figure) -> PathBuf {
    config.output_dir.join(format!("{}.png", figure.id))
}

/// Draw `figure` into an RGB image of `size × pixels_per_inch` pixels.
pub fn render_rgb(figure: &Figure, config: &Config) -> Result<RgbImage> {
    let (w, h) = config.pixel_size(figure.size);
    let mut buf = vec![255u8; w as usize * h as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        root.fill(&WHITE).or_render()?;
        let painter = Painter { config };
        let body = match &figure.title {
            Some(title) => root.titled(title, painter.font(1.3)).or_render()?,
            None => root.clone(),
        };

        let (bw, bh) = body.dim_in_pixel();
        let (rows, cols) = (figure.grid.0 as u32, figure.grid.1 as u32);
        for panel in &figure.panels {
            let c = panel.cell;
            let (c0, r0) = ((c.col as u32).min(cols - 1), (c.row as u32).min(rows - 1));
            let c1 = (c0 + c.col_span as u32).min(cols);
            let r1 = (r0 + c.row_span as u32).min(rows);
            let (x0, x1) = (bw * c0 / cols, bw * c1 / cols);
            let (y0, y1) = (bh * r0 / rows, bh * r1 / rows);
            let area = body.clone().shrink((x0, y0), (x1 - x0, y1 - y0));
            painter.panel(&area, panel)?;
        }
        root.present().or_render()?;
    }
    log::debug!("Rasterised {} at {w}×{h}", figure.id);
    RgbImage::from_raw(w, h, buf).ok_or_else(|| Error::Render("pixel buffer size mismatch".to_string()))
}

/// Render and write a PNG, creating the parent directory if needed.
pub fn save_png(figure: &Figure, config: &Config, path: &Path) -> Result<()> {
    let img = render_rgb(figure, config)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| Error::Render(format!("writing {}: {e}", path.display())))?;
    log::info!("Saved {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Panel drawing
// ---------------------------------------------------------------------------

struct Painter<'c> {
    config: &'c Config,
}

impl Painter<'_> {
    fn font_px(&self, scale: f64) -> f64 {
        self.config.font_px(self.config.text.font_size * scale)
    }

    fn font(&self, scale: f64) -> FontDesc<'_> {
        (self.config.text.font_family.as_str(), self.font_px(scale)).into_font()
    }

    /// Line width in points to whole pixels.
    fn width_px(&self, points: f64) -> u32 {
        self.config.font_px(points).round().max(1.0) as u32
    }

    fn stroke(&self, style: &LineStyle) -> ShapeStyle {
        rgb(style.color).stroke_width(self.width_px(style.width))
    }

    fn x_label_area(&self, panel: &Panel) -> u32 {
        if !panel.frame {
            return 0;
        }
        let fs = self.font_px(1.0);
        let ticks = if panel.x.tick_labels { 1.8 } else { 0.6 };
        let desc = if panel.x.label.is_empty() { 0.0 } else { 1.6 };
        (fs * (ticks + desc)).round() as u32
    }

    fn y_label_area(&self, tick_labels: bool, label: &str) -> u32 {
        let fs = self.font_px(1.0);
        let ticks = if tick_labels { 3.4 } else { 0.6 };
        let desc = if label.is_empty() { 0.0 } else { 1.8 };
        (fs * (ticks + desc)).round() as u32
    }

    fn panel(&self, area: &Area<'_>, panel: &Panel) -> Result<()> {
        let colorbar = panel.layers.iter().find_map(|l| match l {
            Layer::Heatmap {
                colorbar: Some(label),
                colormap,
                norm,
                ..
            } => Some((label.as_str(), *colormap, norm)),
            _ => None,
        });
        let (plot_area, bar_area) = match colorbar {
            Some(_) => {
                let w = area.dim_in_pixel().0;
                let (a, b) = area.split_horizontally(w * 82 / 100);
                (a, Some(b))
            }
            None => (area.clone(), None),
        };

        let view = panel.view();
        let ((x0, x1), (y0, y1)) = view;
        let margin = self.font_px(0.8).round() as u32;

        let mut builder = ChartBuilder::on(&plot_area);
        builder.margin(margin);
        if let Some(title) = &panel.title {
            builder.caption(title, self.font(1.1));
        }
        builder.x_label_area_size(self.x_label_area(panel));
        builder.y_label_area_size(if panel.frame {
            self.y_label_area(panel.y.tick_labels, &panel.y.label)
        } else {
            0
        });
        if let Some(y2) = &panel.y2 {
            builder.right_y_label_area_size(self.y_label_area(true, &y2.label));
        }
        let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1).or_render()?;

        if panel.frame {
            let x_ticks = |v: &f64| panel.x.tick_label(*v);
            let y_ticks = |v: &f64| panel.y.tick_label(*v);
            let mut mesh = chart.configure_mesh();
            mesh.x_desc(panel.x.label.as_str())
                .y_desc(panel.y.label.as_str())
                .label_style(self.font(0.9))
                .axis_desc_style(self.font(1.0))
                .x_label_formatter(&x_ticks)
                .y_label_formatter(&y_ticks)
                .x_labels(6)
                .y_labels(6);
            if !panel.grid_lines {
                mesh.disable_mesh();
            }
            mesh.draw().or_render()?;
        }

        for layer in &panel.layers {
            self.layer(&mut chart, panel, view, layer)?;
        }
        for text in &panel.texts {
            self.text(&mut chart, panel, view, text)?;
        }

        if panel.legend && panel.layers.iter().any(|l| l.label().is_some()) {
            chart
                .configure_series_labels()
                .label_font(self.font(0.9))
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .or_render()?;
        }

        if let Some(y2) = &panel.y2 {
            let mut dual = chart.set_secondary_coord(x0..x1, y2.range.0..y2.range.1);
            dual.configure_secondary_axes()
                .y_desc(y2.label.as_str())
                .label_style(self.font(0.9))
                .axis_desc_style(self.font(1.0))
                .draw()
                .or_render()?;
        }

        if let (Some((label, colormap, norm)), Some(bar)) = (colorbar, bar_area) {
            self.colorbar(&bar, panel, label, colormap, norm)?;
        }
        Ok(())
    }

    fn colorbar(&self, area: &Area<'_>, panel: &Panel, label: &str, colormap: Colormap, norm: &Norm) -> Result<()> {
        let (lo, hi, log) = match norm {
            Norm::Linear { vmin, vmax } => (*vmin, *vmax, false),
            Norm::Log { vmin, vmax } => (vmin.max(f64::MIN_POSITIVE).log10(), vmax.max(f64::MIN_POSITIVE).log10(), true),
            Norm::Levels(levels) => match (levels.first(), levels.last()) {
                (Some(a), Some(b)) => (*a, *b, false),
                _ => return Ok(()),
            },
        };
        let hi = if hi > lo { hi } else { lo + 1.0 };
        let margin = self.font_px(0.8).round() as u32;
        let fs = self.font_px(1.0);

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(margin)
            .x_label_area_size(self.x_label_area(panel))
            .right_y_label_area_size((fs * 5.0).round() as u32);
        if panel.title.is_some() {
            builder.caption(" ", self.font(1.1));
        }
        let mut chart = builder.build_cartesian_2d(0.0..1.0, lo..hi).or_render()?;

        let steps = 128;
        let dv = (hi - lo) / steps as f64;
        chart
            .draw_series((0..steps).filter_map(|i| {
                let v = lo + (i as f64 + 0.5) * dv;
                let t = norm.position(if log { 10f64.powf(v) } else { v })?;
                let c = rgb(colormap.at(t));
                let y = lo + i as f64 * dv;
                Some(Rectangle::new([(0.0, y), (1.0, y + dv)], c.filled()))
            }))
            .or_render()?;

        let axis = Axis {
            scale: if log { Scale::Log } else { Scale::Linear },
            ..Axis::default()
        };
        let ticks = |v: &f64| axis.tick_label(*v);
        chart
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc(label)
            .label_style(self.font(0.9))
            .axis_desc_style(self.font(1.0))
            .y_label_formatter(&ticks)
            .y_labels(5)
            .draw()
            .or_render()
    }

    // -----------------------------------------------------------------------
    // Layers
    // -----------------------------------------------------------------------

    fn layer(&self, chart: &mut Chart<'_, '_>, panel: &Panel, view: View, layer: &Layer) -> Result<()> {
        match layer {
            Layer::Line { points, style, label } => {
                let stroke = self.stroke(style);
                for (i, run) in panel.project_runs(points).into_iter().enumerate() {
                    let legend = if i == 0 { label.as_deref() } else { None };
                    draw_path(chart, run, stroke, style.dash, legend)?;
                }
            }
            Layer::Scatter {
                points,
                marker,
                size,
                color,
                label,
            } => {
                let pts: Vec<(f64, f64)> = points.iter().filter_map(|&p| panel.project(p)).collect();
                let r = (0.5 * self.config.font_px(*size)).round().max(1.0) as i32;
                let anno = draw_markers(chart, pts, *marker, r, rgb(*color))?;
                if let Some(l) = label {
                    let c = rgb(*color);
                    anno.label(l.as_str())
                        .legend(move |(x, y)| Circle::new((x + 10, y), r.max(2), c.filled()));
                }
            }
            Layer::ErrorBars {
                points,
                lower,
                upper,
                color,
                bar_color,
                marker,
            } => {
                let bar = rgb(*bar_color).stroke_width(self.width_px(0.8));
                let bars: Vec<Vec<(f64, f64)>> = points
                    .iter()
                    .zip(lower)
                    .zip(upper)
                    .filter_map(|((&(x, y), lo), hi)| Some(vec![panel.project((x, y - lo))?, panel.project((x, y + hi))?]))
                    .collect();
                chart
                    .draw_series(bars.into_iter().map(|b| PathElement::new(b, bar)))
                    .or_render()?;
                if let Some(m) = marker {
                    let pts: Vec<(f64, f64)> = points.iter().filter_map(|&p| panel.project(p)).collect();
                    let r = (0.5 * self.config.font_px(4.0)).round() as i32;
                    draw_markers(chart, pts, *m, r, rgb(*color))?;
                }
            }
            Layer::Histogram {
                edges,
                counts,
                fill,
                style,
                label,
            } => {
                let base = if panel.y.scale == Scale::Log { (view.1).0 } else { 0.0 };
                let height = |c: f64| panel.y.forward(c).unwrap_or(base);
                let xs: Vec<Option<f64>> = edges.iter().map(|&e| panel.x.forward(e)).collect();
                if let Some(fill) = fill {
                    let color = rgb(fill.color).mix(f64::from(fill.alpha));
                    chart
                        .draw_series(xs.windows(2).zip(counts).filter_map(|(w, &c)| {
                            Some(Rectangle::new([(w[0]?, base), (w[1]?, height(c))], color.filled()))
                        }))
                        .or_render()?;
                }
                let mut step = Vec::with_capacity(2 * counts.len() + 2);
                for (w, &c) in xs.windows(2).zip(counts) {
                    if let (Some(a), Some(b)) = (w[0], w[1]) {
                        if step.is_empty() {
                            step.push((a, base));
                        }
                        step.push((a, height(c)));
                        step.push((b, height(c)));
                    }
                }
                if let Some(&(last, _)) = step.last() {
                    step.push((last, base));
                }
                draw_path(chart, step, self.stroke(style), style.dash, label.as_deref())?;
            }
            Layer::Heatmap {
                surface,
                colormap,
                norm,
                alpha,
                ..
            } => {
                let ex: Vec<Option<f64>> = cell_edges(surface.x().points()).iter().map(|&e| panel.x.forward(e)).collect();
                let ey: Vec<Option<f64>> = cell_edges(surface.y().points()).iter().map(|&e| panel.y.forward(e)).collect();
                let (ny, nx) = surface.shape();
                let alpha = f64::from(*alpha);
                let cells = (0..ny).flat_map(|iy| (0..nx).map(move |ix| (ix, iy)));
                chart
                    .draw_series(cells.filter_map(|(ix, iy)| {
                        let t = norm.position(surface.at(ix, iy))?;
                        let c = rgb(colormap.at(t)).mix(alpha);
                        Some(Rectangle::new(
                            [(ex[ix]?, ey[iy]?), (ex[ix + 1]?, ey[iy + 1]?)],
                            c.filled(),
                        ))
                    }))
                    .or_render()?;
            }
            Layer::Segments { segments, style } => {
                let stroke = self.stroke(style);
                for s in segments {
                    if let (Some(a), Some(b)) = (panel.project(s.start), panel.project(s.end)) {
                        draw_path(chart, vec![a, b], stroke, style.dash, None)?;
                    }
                }
            }
            Layer::Ellipses { ellipses, fill, stroke } => {
                for e in ellipses {
                    let outline: Vec<(f64, f64)> = e.outline(72).into_iter().filter_map(|p| panel.project(p)).collect();
                    if let Some(fill) = fill {
                        let c = rgb(fill.color).mix(f64::from(fill.alpha));
                        chart
                            .draw_series(std::iter::once(Polygon::new(outline.clone(), c.filled())))
                            .or_render()?;
                    }
                    if let Some(style) = stroke {
                        draw_path(chart, outline, self.stroke(style), style.dash, None)?;
                    }
                }
            }
            Layer::Polygons { polygons, fill, stroke } => {
                for polygon in polygons {
                    let outline: Vec<(f64, f64)> = polygon.iter().filter_map(|&p| panel.project(p)).collect();
                    if let Some(fill) = fill {
                        let c = rgb(fill.color).mix(f64::from(fill.alpha));
                        chart
                            .draw_series(std::iter::once(Polygon::new(outline.clone(), c.filled())))
                            .or_render()?;
                    }
                    if let Some(style) = stroke {
                        let mut closed = outline;
                        if let Some(&first) = closed.first() {
                            closed.push(first);
                        }
                        draw_path(chart, closed, self.stroke(style), style.dash, None)?;
                    }
                }
            }
            Layer::Rects { rects, fill, stroke } => {
                for r in rects {
                    let (Some(a), Some(b)) = (panel.project(r.min), panel.project(r.max)) else {
                        continue;
                    };
                    if let Some(fill) = fill {
                        let c = rgb(fill.color).mix(f64::from(fill.alpha));
                        chart
                            .draw_series(std::iter::once(Rectangle::new([a, b], c.filled())))
                            .or_render()?;
                    }
                    if let Some(style) = stroke {
                        let outline = vec![a, (b.0, a.1), b, (a.0, b.1), a];
                        draw_path(chart, outline, self.stroke(style), style.dash, None)?;
                    }
                }
            }
            Layer::FillBetween {
                x,
                lower,
                upper,
                fill,
                label,
            } => {
                let top: Vec<(f64, f64)> = x.iter().zip(upper).filter_map(|(&x, &y)| panel.project((x, y))).collect();
                let bottom: Vec<(f64, f64)> = x.iter().zip(lower).filter_map(|(&x, &y)| panel.project((x, y))).collect();
                let polygon: Vec<(f64, f64)> = top.into_iter().chain(bottom.into_iter().rev()).collect();
                let c = rgb(fill.color).mix(f64::from(fill.alpha));
                let anno = chart
                    .draw_series(std::iter::once(Polygon::new(polygon, c.filled())))
                    .or_render()?;
                if let Some(l) = label {
                    anno.label(l.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 20, y + 4)], c.filled()));
                }
            }
            Layer::Arrows { arrows, style } => {
                let stroke = self.stroke(style);
                let (sx, sy) = pixel_scale(chart, view);
                let head = 4.0 * f64::from(self.width_px(style.width)) + 4.0;
                for a in arrows {
                    let (Some(from), Some(to)) = (panel.project(a.from), panel.project(a.to)) else {
                        continue;
                    };
                    draw_path(chart, vec![from, to], stroke, style.dash, None)?;
                    let mut heads = vec![arrow_head(from, to, head, sx, sy)];
                    if a.double {
                        heads.push(arrow_head(to, from, head, sx, sy));
                    }
                    let color = rgb(style.color);
                    chart
                        .draw_series(heads.into_iter().flatten().map(|h| Polygon::new(h, color.filled())))
                        .or_render()?;
                }
            }
        }
        Ok(())
    }

    fn text(&self, chart: &mut Chart<'_, '_>, panel: &Panel, view: View, t: &Label) -> Result<()> {
        let ((x0, x1), (y0, y1)) = view;
        let pos = match t.anchor {
            Anchor::Axes => Some((x0 + t.pos.0 * (x1 - x0), y0 + t.pos.1 * (y1 - y0))),
            Anchor::Data => panel.project(t.pos),
        };
        let Some(pos) = pos else {
            return Ok(());
        };
        let h = match t.h_align {
            HAlign::Left => HPos::Left,
            HAlign::Center => HPos::Center,
            HAlign::Right => HPos::Right,
        };
        let v = match t.v_align {
            VAlign::Top => VPos::Top,
            VAlign::Center => VPos::Center,
            VAlign::Bottom => VPos::Bottom,
        };
        let style = self.font(t.scale).color(&rgb(t.color)).pos(Pos::new(h, v));

        if t.boxed {
            let (tw, th) = chart.plotting_area().estimate_text_size(&t.text, &style).or_render()?;
            let (sx, sy) = pixel_scale(chart, view);
            let pad = 3.0;
            let (w, hgt) = ((f64::from(tw) + 2.0 * pad) / sx, (f64::from(th) + 2.0 * pad) / sy);
            let left = match t.h_align {
                HAlign::Left => pos.0 - pad / sx,
                HAlign::Center => pos.0 - 0.5 * w,
                HAlign::Right => pos.0 - w + pad / sx,
            };
            let bottom = match t.v_align {
                VAlign::Top => pos.1 - hgt + pad / sy,
                VAlign::Center => pos.1 - 0.5 * hgt,
                VAlign::Bottom => pos.1 - pad / sy,
            };
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(left, bottom), (left + w, bottom + hgt)],
                    WHITE.filled(),
                )))
                .or_render()?;
        }

        chart
            .draw_series(std::iter::once(Text::new(t.text.clone(), pos, style)))
            .or_render()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Element helpers
// ---------------------------------------------------------------------------

fn draw_path(
    chart: &mut Chart<'_, '_>,
    points: Vec<(f64, f64)>,
    style: ShapeStyle,
    dash: Dash,
    legend: Option<&str>,
) -> Result<()> {
    if points.len() < 2 {
        return Ok(());
    }
    let anno = match dash {
        Dash::Solid => chart.draw_series(std::iter::once(PathElement::new(points, style))),
        Dash::Dashed => chart.draw_series(DashedLineSeries::new(points, 6, 4, style)),
        Dash::Dotted => chart.draw_series(DashedLineSeries::new(points, 2, 3, style)),
    }
    .or_render()?;
    if let Some(l) = legend {
        anno.label(l)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    Ok(())
}

fn draw_markers<'c, 'a, 'b>(
    chart: &'c mut Chart<'a, 'b>,
    points: Vec<(f64, f64)>,
    marker: Marker,
    radius: i32,
    color: RGBColor,
) -> Result<&'c mut SeriesAnno<'a, BitMapBackend<'b>>> {
    let pts = points.into_iter();
    match marker {
        Marker::Pixel => chart.draw_series(pts.map(|p| Pixel::new(p, color.filled()))),
        Marker::Dot => chart.draw_series(pts.map(|p| Circle::new(p, radius, color.filled()))),
        Marker::Circle => chart.draw_series(pts.map(|p| Circle::new(p, radius, color.stroke_width(1)))),
        Marker::Square => chart.draw_series(
            pts.map(|p| EmptyElement::at(p) + Rectangle::new([(-radius, -radius), (radius, radius)], color.filled())),
        ),
    }
    .or_render()
}

/// Pixels per drawing-space unit along x and y.
fn pixel_scale(chart: &Chart<'_, '_>, ((x0, x1), (y0, y1)): View) -> (f64, f64) {
    let (w, h) = chart.plotting_area().dim_in_pixel();
    (f64::from(w.max(1)) / (x1 - x0), f64::from(h.max(1)) / (y1 - y0))
}

/// Triangle at `to` pointing away from `from`, `len` pixels long.
fn arrow_head(from: (f64, f64), to: (f64, f64), len: f64, sx: f64, sy: f64) -> Option<Vec<(f64, f64)>> {
    let (dx, dy) = ((to.0 - from.0) * sx, (to.1 - from.1) * sy);
    let norm = dx.hypot(dy);
    if norm < 1e-9 {
        return None;
    }
    let (ux, uy) = (dx / norm, dy / norm);
    let (bx, by) = (-ux * len, -uy * len);
    let (px, py) = (-uy * 0.4 * len, ux * 0.4 * len);
    Some(vec![
        to,
        (to.0 + (bx + px) / sx, to.1 + (by + py) / sy),
        (to.0 + (bx - px) / sx, to.1 + (by - py) / sy),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Grid, Surface2};
    use crate::figure::{Fill, Rect};

    fn config() -> Config {
        Config {
            pixels_per_inch: 50,
            ..Config::default()
        }
    }

    #[test]
    fn image_has_configured_size() {
        let fig = Figure::new("blank", 4.0, 2.0).panel(Panel::new(0, 0).frameless().xlim(0.0, 1.0).ylim(0.0, 1.0));
        let img = render_rgb(&fig, &config()).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn filled_rect_covers_panel_centre() {
        let fig = Figure::new("rect", 2.0, 2.0).panel(
            Panel::new(0, 0).frameless().xlim(0.0, 1.0).ylim(0.0, 1.0).layer(Layer::Rects {
                rects: vec![Rect {
                    min: (0.25, 0.25),
                    max: (0.75, 0.75),
                }],
                fill: Some(Fill::new(Rgb::BLACK, 1.0)),
                stroke: None,
            }),
        );
        let img = render_rgb(&fig, &config()).unwrap();
        assert_eq!(img.get_pixel(50, 50).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(3, 3).0, [255, 255, 255]);
    }

    #[test]
    fn heatmap_follows_values() {
        let g = Grid::linspace(0.0, 1.0, 2).unwrap();
        let s = Surface2::from_fn(&g, &g, |x, _| x);
        let fig = Figure::new("heat", 2.0, 2.0).panel(
            Panel::new(0, 0)
                .frameless()
                .xlim(-0.5, 1.5)
                .ylim(-0.5, 1.5)
                .layer(Layer::heatmap(s, Colormap::Binary, Norm::Linear { vmin: 0.0, vmax: 1.0 })),
        );
        let img = render_rgb(&fig, &config()).unwrap();
        assert_eq!(img.get_pixel(25, 50).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(75, 50).0, [0, 0, 0]);
    }

    #[test]
    fn panels_fill_their_cells() {
        let black = Layer::Rects {
            rects: vec![Rect {
                min: (0.0, 0.0),
                max: (1.0, 1.0),
            }],
            fill: Some(Fill::new(Rgb::BLACK, 1.0)),
            stroke: None,
        };
        let fig = Figure::new("grid", 4.0, 2.0)
            .grid(1, 2)
            .panel(Panel::new(0, 1).frameless().xlim(0.0, 1.0).ylim(0.0, 1.0).layer(black));
        let img = render_rgb(&fig, &config()).unwrap();
        assert_eq!(img.get_pixel(50, 50).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(150, 50).0, [0, 0, 0]);
    }

    #[test]
    fn arrow_head_points_back_along_shaft() {
        let h = arrow_head((0.0, 0.0), (1.0, 0.0), 10.0, 100.0, 100.0).unwrap();
        assert_eq!(h[0], (1.0, 0.0));
        assert!((h[1].0 - 0.9).abs() < 1e-12 && h[1].1 > 0.0);
        assert!(arrow_head((1.0, 1.0), (1.0, 1.0), 10.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn png_written_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            output_dir: dir.path().join("plots"),
            ..config()
        };
        let fig = Figure::new("ch0-empty", 1.0, 1.0).panel(Panel::new(0, 0).frameless());
        let path = output_path(&cfg, &fig);
        save_png(&fig, &cfg, &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (50, 50));
    }
}
