mod camera;
mod cancel;
mod detector;
mod display;
mod scan;
mod snapshot;

use display::{ConsoleDisplay, Display};
use qr_scanner_common::config::Config;
use scan::{ScanLoop, ScanSettings};
use snapshot::SnapshotWriter;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("qr-scanner.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        mode = %config.camera.mode,
        url = config.camera.url.as_deref().unwrap_or("-"),
        downsample = config.scan.downsample,
        target_width = config.scan.target_width,
        target_height = config.scan.target_height,
        "starting qr-scanner"
    );

    let mut display = ConsoleDisplay::stdout();

    // Listen for Ctrl+C and the quit key before the camera connects, so an
    // unreachable camera can still be abandoned.
    let mut cancel = cancel::install(&config.display.quit_key);
    tokio::task::yield_now().await;

    let opened = cancel::until_cancelled(camera::open_camera(&config.camera), &mut cancel).await;
    let camera = match opened {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            error!(error = %e, "could not open camera");
            display.destroy();
            std::process::exit(1);
        }
        None => {
            info!("stopped while opening camera");
            display.destroy();
            std::process::exit(0);
        }
    };

    info!(
        quit_key = config.display.quit_key,
        "scanning, press Ctrl+C or type the quit key and Enter to stop"
    );

    let mut scan_loop = ScanLoop::new(
        camera,
        detector::QrDetector::new(),
        display,
        ScanSettings::from_config(&config),
    );
    if let Some(path) = &config.display.snapshot_path {
        let writer = SnapshotWriter::new(path);
        info!(path = %writer.path().display(), "annotated snapshots enabled");
        scan_loop = scan_loop.with_snapshots(writer);
    }

    let summary = scan_loop.run(cancel).await;
    info!(frames = summary.frames, updates = summary.updates, "qr-scanner stopped");

    // The quit-key reader may still be parked in a blocking stdin read, which
    // would hold up runtime shutdown.
    std::process::exit(0);
}
