mod app;
mod state;
mod ui;

use anyhow::Context as _;
use app::AstrofigApp;
use astrofig::config::Config;
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load().context("loading configuration")?;
    log::info!("Data in {}, cache in {}", config.data_dir.display(), config.cache_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "astrofig – Figure Gallery",
        options,
        Box::new(|_cc| Ok(Box::new(AstrofigApp::new(AppState::new(config))))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
