//! Build every figure pipeline and write its figures as PNG into the
//! configured output directory. Exits non-zero if any pipeline failed.

use std::process::ExitCode;

use astrofig::config::Config;
use astrofig::figures::{self, Context};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "Rendering {} pipelines into {}",
        figures::all().len(),
        config.output_dir.display()
    );

    let ctx = Context::new(config);
    if !ctx.cache.is_enabled() {
        log::info!("Results cache disabled; every cached transform is recomputed");
    }
    let summary = figures::render_all(&ctx);

    for path in &summary.written {
        println!("{}", path.display());
    }
    if summary.failed.is_empty() {
        log::info!("Wrote {} figures", summary.written.len());
        return ExitCode::SUCCESS;
    }
    for (id, error) in &summary.failed {
        eprintln!("{id}: {error}");
    }
    log::error!("{} of {} pipelines failed", summary.failed.len(), figures::all().len());
    ExitCode::FAILURE
}
