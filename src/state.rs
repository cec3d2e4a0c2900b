use std::collections::BTreeMap;
use std::path::Path;

use astrofig::config::Config;
use astrofig::figure::{render, Figure};
use astrofig::figures::{self, Context, FigureInfo};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Shared pipeline inputs.
    pub ctx: Context,

    /// Catalogue of every pipeline, in book order.
    pub catalogue: Vec<FigureInfo>,

    /// Substring typed in the side panel; matches id or title.
    pub search: String,

    /// Chapter toggles of the side panel.
    pub chapters: BTreeMap<&'static str, bool>,

    /// Id of the selected pipeline.
    pub selected: Option<&'static str>,

    /// Figures built for the selected pipeline.
    pub figures: Vec<Figure>,

    /// Index into `figures` when a pipeline yields several.
    pub figure_index: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether the last message is an error.
    pub status_is_error: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let catalogue: Vec<FigureInfo> = figures::all().iter().map(|p| p.info()).collect();
        let chapters = catalogue.iter().map(|i| (i.chapter, true)).collect();
        Self {
            ctx: Context::new(config),
            catalogue,
            search: String::new(),
            chapters,
            selected: None,
            figures: Vec::new(),
            figure_index: 0,
            status_message: None,
            status_is_error: false,
        }
    }

    /// Catalogue entries passing the chapter toggles and the search box.
    pub fn visible(&self) -> Vec<FigureInfo> {
        let needle = self.search.to_lowercase();
        self.catalogue
            .iter()
            .filter(|i| self.chapters.get(i.chapter).copied().unwrap_or(true))
            .filter(|i| {
                needle.is_empty()
                    || i.id.to_lowercase().contains(&needle)
                    || i.title.to_lowercase().contains(&needle)
            })
            .copied()
            .collect()
    }

    pub fn selected_info(&self) -> Option<FigureInfo> {
        let id = self.selected?;
        self.catalogue.iter().find(|i| i.id == id).copied()
    }

    pub fn current_figure(&self) -> Option<&Figure> {
        self.figures.get(self.figure_index)
    }

    /// Build the pipeline `id` and show its first figure.
    pub fn select(&mut self, id: &'static str) {
        self.selected = Some(id);
        self.figures.clear();
        self.figure_index = 0;
        let Some(pipeline) = figures::find(id) else {
            self.error(format!("Unknown figure {id}"));
            return;
        };
        match figures::build(pipeline.as_ref(), &self.ctx) {
            Ok(figs) => {
                self.info(format!("{id}: {} figure(s)", figs.len()));
                self.figures = figs;
            }
            Err(e) => {
                log::error!("{id} failed: {e:#}");
                self.error(format!("Error: {e:#}"));
            }
        }
    }

    /// Write the figure on screen as PNG to `path`.
    pub fn export_current(&mut self, path: &Path) {
        let Some(fig) = self.current_figure() else {
            self.error("Nothing to export".to_string());
            return;
        };
        match render::save_png(fig, &self.ctx.config, path) {
            Ok(()) => self.info(format!("Wrote {}", path.display())),
            Err(e) => self.error(format!("Export failed: {e:#}")),
        }
    }

    /// Render the whole gallery into the configured output directory.
    pub fn render_all(&mut self) {
        let summary = figures::render_all(&self.ctx);
        let dir = self.ctx.config.output_dir.display().to_string();
        if summary.failed.is_empty() {
            self.info(format!("Rendered {} figures into {dir}", summary.written.len()));
        } else {
            let ids: Vec<&str> = summary.failed.iter().map(|(id, _)| id.as_str()).collect();
            self.error(format!(
                "Rendered {} figures into {dir}; failed: {}",
                summary.written.len(),
                ids.join(", ")
            ));
        }
    }

    fn info(&mut self, msg: String) {
        log::info!("{msg}");
        self.status_message = Some(msg);
        self.status_is_error = false;
    }

    fn error(&mut self, msg: String) {
        self.status_message = Some(msg);
        self.status_is_error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_toggle_and_search_filter_the_list() {
        let mut state = AppState::new(Config::default());
        let all = state.visible().len();
        assert_eq!(all, state.catalogue.len());

        state.chapters.insert("Chapter 10", false);
        assert!(state.visible().iter().all(|i| i.chapter != "Chapter 10"));

        state.search = "PCA".to_string();
        let hits = state.visible();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "ch7-pca-rotation");
    }

    #[test]
    fn unknown_id_sets_error() {
        let mut state = AppState::new(Config::default());
        state.select("nope");
        assert!(state.status_is_error);
        assert!(state.figures.is_empty());
    }
}
