use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use astrofig::color::generate_palette;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – catalogue
// ---------------------------------------------------------------------------

/// Render the left panel: search box, chapter toggles and the figure list.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Figures");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Search");
        ui.text_edit_singleline(&mut state.search);
    });

    let chapters: Vec<&'static str> = state.chapters.keys().copied().collect();
    let palette = generate_palette(chapters.len());
    let swatch = |chapter: &str| {
        chapters
            .iter()
            .position(|c| *c == chapter)
            .and_then(|i| palette.get(i))
            .map_or(Color32::GRAY, |c| c.to_color32())
    };

    egui::CollapsingHeader::new(RichText::new("Chapters").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.chapters.values_mut().for_each(|on| *on = true);
                }
                if ui.small_button("None").clicked() {
                    state.chapters.values_mut().for_each(|on| *on = false);
                }
            });
            for chapter in &chapters {
                if let Some(on) = state.chapters.get_mut(chapter) {
                    ui.checkbox(on, RichText::new(*chapter).color(swatch(chapter)));
                }
            }
        });
    ui.separator();

    let visible = state.visible();
    let mut clicked = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            let mut current = "";
            for info in &visible {
                if info.chapter != current {
                    current = info.chapter;
                    ui.add_space(4.0);
                    ui.label(RichText::new(current).strong().color(swatch(current)));
                }
                let selected = state.selected == Some(info.id);
                if ui
                    .selectable_label(selected, info.title)
                    .on_hover_text(info.id)
                    .clicked()
                {
                    clicked = Some(info.id);
                }
            }
            if visible.is_empty() {
                ui.label("No figure matches.");
            }
        });

    if let Some(id) = clicked {
        state.select(id);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui
                .add_enabled(state.current_figure().is_some(), egui::Button::new("Export PNG…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
            if ui.button("Render all").clicked() {
                state.render_all();
                ui.close_menu();
            }
        });

        ui.separator();

        let n = state.figures.len();
        if n > 1 {
            if ui.small_button("◀").clicked() {
                state.figure_index = (state.figure_index + n - 1) % n;
            }
            ui.label(format!("figure {} of {n}", state.figure_index + 1));
            if ui.small_button("▶").clicked() {
                state.figure_index = (state.figure_index + 1) % n;
            }
            ui.separator();
        }

        if let Some(fig) = state.current_figure() {
            ui.label(RichText::new(&fig.id).monospace());
        }
    });
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{} figures", state.catalogue.len()));
        ui.separator();
        ui.label(format!("data: {}", state.ctx.config.data_dir.display()));
        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if state.status_is_error { Color32::RED } else { ui.visuals().text_color() };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn export_dialog(state: &mut AppState) {
    let Some(name) = state.current_figure().map(|f| format!("{}.png", f.id)) else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export figure")
        .set_file_name(name)
        .add_filter("PNG image", &["png"])
        .save_file();

    if let Some(path) = file {
        state.export_current(&path);
    }
}
