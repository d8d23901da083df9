mod app;
mod chat;
mod config;
mod event;
mod session;
mod theme;
mod ui;

use app::QuantaApp;
use chat::controller::ChatController;
use chat::resolver::{KeywordResolver, Latency, SimulatedNetwork};
use config::AppConfig;
use eframe::egui;
use session::storage::FileStorage;
use session::store::SessionStore;
use std::sync::{mpsc, Arc};
use tracing_subscriber::EnvFilter;

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_or_default();
    init_logging(&config.log_filter);
    tracing::info!(data_dir = %config.data_dir.display(), "starting quanta");

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("quanta-runtime")
        .build()?;

    let store = SessionStore::open(Box::new(FileStorage::open(&config.data_dir)?));
    let preferences = FileStorage::open(&config.data_dir)?;
    let theme_mode = theme::load_mode(&preferences, config.theme);

    let resolver = SimulatedNetwork::new(
        KeywordResolver::new(),
        Latency::from_millis(config.latency_min_ms, config.latency_max_ms),
    )
    .with_failure_rate(config.failure_rate);

    let mut controller = ChatController::new(store, Arc::new(resolver));
    controller.start();

    let app = QuantaApp::new(
        rx,
        tx,
        runtime.handle().clone(),
        controller,
        Box::new(preferences),
        theme_mode,
    );
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Quanta")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Quanta",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
