//! This `hub` crate is the
//! entry point of the Rust logic.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use donate::{
    DonateCommand, DonateManager,
    window::{DartDonatePowerToys, DartDonateWindow, DartUrlOpener},
};
use events::{SystemEvent, SystemEvents};
use mimalloc::MiMalloc;
use models::signals::{download::DownloadCompletedEvent, system::RustPanic};
use prefs::PrefsHandler;
use rinf::{DartSignal, RustSignal};
use tokio::sync::mpsc;
use tracing::{Instrument, Level, error, info, info_span};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::fmt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

rinf::write_interface!();

pub mod discovery;
pub mod donate;
pub mod events;
pub mod models;
pub mod platform;
pub mod prefs;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        let message = format!("{panic_info}\n{backtrace}");
        error!(message, "Rust panic");
        RustPanic { message }.send_signal_to_dart();
        original_hook(panic_info);
    }));

    // Set working directory to the app's data directory
    let data_dir = dirs::data_dir().expect("Failed to get data directory");
    let app_dir = if cfg!(target_os = "macos") {
        data_dir.join("org.participatoryculture.Miro")
    } else {
        data_dir.join("Miro")
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir).expect("Failed to create app directory");
    }
    std::env::set_current_dir(&app_dir).expect("Failed to set current working directory");

    let _guard = setup_logging(&app_dir);
    if let Err(e) = _guard {
        rinf::debug_print!("Failed to setup logging: {:#}", e);
    }

    info!("Starting Miro backend");

    let prefs = PrefsHandler::new(app_dir);
    tokio::spawn(prefs.clone().receive_prefs_requests());

    let events = SystemEvents::new();
    forward_download_events(events.clone());

    let (donate_tx, donate_rx) = mpsc::unbounded_channel();
    let mut donate_manager = DonateManager::new(prefs.clone(), Arc::new(DartUrlOpener));
    donate_manager.attach_windows(Box::new(DartDonateWindow), Box::new(DartDonatePowerToys));
    let donate_task = tokio::spawn(
        donate_manager
            .run(prefs.subscribe(), events.subscribe(), donate_rx)
            .instrument(info_span!("task_donate_manager")),
    );
    donate::start_request_handler(donate_tx.clone());

    let window = platform::main_window_dimensions(&*prefs);
    info!(%window, "Main window dimensions");

    tokio::task::spawn_blocking({
        let prefs = prefs.clone();
        move || discovery::check_discovery(&*prefs)
    });

    // Keep the main function running until Dart shutdown.
    rinf::dart_shutdown().await;

    let _ = donate_tx.send(DonateCommand::Shutdown);
    if let Err(e) = donate_task.await {
        error!(error = %e, "Donation manager task failed");
    }
}

/// Publishes downloads finished on the UI side to the event bus.
fn forward_download_events(events: SystemEvents) {
    tokio::spawn(
        async move {
            let receiver = DownloadCompletedEvent::get_dart_signal_receiver();
            while let Some(pack) = receiver.recv().await {
                events.publish(SystemEvent::DownloadComplete { item_id: pack.message.item_id });
            }
            error!("Download completed channel closed unexpectedly");
        }
        .instrument(info_span!("task_download_event_forwarder")),
    );
}

fn setup_logging(app_dir: &Path) -> Result<WorkerGuard> {
    // Log to file
    let logs_dir = app_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("miro")
        .filename_suffix("log")
        .build(&logs_dir)
        .context("Failed to initialize file appender")?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_ansi(false) // Disable ANSI colors
        .event_format(fmt::format().pretty())
        .with_writer(non_blocking)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global subscriber")?;
    Ok(_guard)
}
