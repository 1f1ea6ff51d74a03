mod app;
mod config;
mod data_url;
mod editor;
mod error;
mod generate;
mod library;
mod mask;
mod model;
mod pages;
mod store;
mod thumbnails;

use clap::Parser;
use eframe::egui;
use std::sync::Arc;

use app::RenoApp;
use config::Config;
use generate::{GeminiClient, ImageEditService};
use library::Library;
use store::Store;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    if let Err(msg) = config.validate() {
        eprintln!("renovision: {}", msg);
        std::process::exit(2);
    }
    if let Some(path) = &config.image {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    let data_dir = config.resolved_data_dir();
    let store = match Store::open(&data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("renovision: cannot use data directory: {}", e);
            std::process::exit(1);
        }
    };
    let library = Library::load(store);

    let service: Option<Arc<dyn ImageEditService>> = match GeminiClient::from_config(&config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            log::warn!("generation disabled: {}", e);
            None
        }
    };

    let title = match &config.image {
        Some(path) => format!(
            "RenoVision - {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ),
        None => "RenoVision".to_string(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title(&title),
        ..Default::default()
    };

    log::info!("starting with data in {}", data_dir.display());
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(RenoApp::new(&cc.egui_ctx, &config, library, service)))
        }),
    )
    .expect("Failed to run eframe");
}
