//! FreedIO - FreeD camera-tracking daemon
//!
//! Listens for FreeD telemetry on UDP and keeps a smoothed camera state. A
//! headless consumer polls the state at the configured frame rate and logs the
//! camera view, substituting a slow sweep while the tracking source is silent.
//!
//! ## Usage
//!
//! ```bash
//! freed-io                          # ./freed-io.toml if present, else defaults
//! freed-io --config /etc/freed-io.toml
//! RUST_LOG=debug freed-io -c freed-io.toml
//! ```

use freed_io::config::{AppConfig, ConsumerConfig};
use freed_io::error::{Error, Result};
use freed_io::protocol::PacketDecoder;
use freed_io::receiver::TelemetryReceiver;
use freed_io::tracking::{CameraState, CameraTracker, LensConfig};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_CONFIG_PATH: &str = "freed-io.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `freed-io <path>` (positional)
/// - `freed-io --config <path>` / `freed-io -c <path>`
///
/// Returns `None` when no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

/// Explicit paths must exist; the default path is optional
fn load_config(path: Option<&str>) -> Result<(AppConfig, String)> {
    match path {
        Some(path) => Ok((AppConfig::load(path)?, path.to_string())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok((
            AppConfig::load(DEFAULT_CONFIG_PATH)?,
            DEFAULT_CONFIG_PATH.to_string(),
        )),
        None => Ok((AppConfig::default(), "built-in defaults".to_string())),
    }
}

/// What the consumer would hand to a renderer this frame
#[derive(Debug, Clone, Copy)]
struct CameraView {
    pan: f64,
    tilt: f64,
    fov_deg: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl CameraView {
    fn tracked(state: &CameraState, lens: &LensConfig) -> Self {
        Self {
            pan: state.pan,
            tilt: state.tilt,
            fov_deg: state.field_of_view_deg(lens),
            x: state.x,
            y: state.y,
            z: state.z,
        }
    }

    /// "Searching" sweep shown while telemetry is missing
    fn sweep(
        state: &CameraState,
        lens: &LensConfig,
        consumer: &ConsumerConfig,
        phase: Duration,
    ) -> Self {
        let t = phase.as_secs_f64();
        Self {
            pan: consumer.sweep_pan_amplitude_deg * (t * consumer.sweep_pan_rate).sin(),
            tilt: consumer.sweep_tilt_amplitude_deg * (t * consumer.sweep_tilt_rate).cos(),
            ..Self::tracked(state, lens)
        }
    }
}

fn run_consumer(tracker: &CameraTracker, config: &AppConfig, running: &AtomicBool) {
    let frame = config.consumer.frame_period();
    let status_interval = config.consumer.status_interval();
    let lens = tracker.lens();

    let mut was_idle: Option<bool> = None;
    let mut last_status = Instant::now();

    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        let idle = tracker.idle_status(now);
        let state = tracker.snapshot();

        let view = if idle.idle {
            CameraView::sweep(&state, lens, &config.consumer, idle.phase)
        } else {
            CameraView::tracked(&state, lens)
        };

        if was_idle != Some(idle.idle) {
            if idle.idle {
                log::info!("No FreeD telemetry, showing idle sweep");
            } else {
                log::info!("FreeD telemetry active");
            }
            was_idle = Some(idle.idle);
        }

        if now.duration_since(last_status) >= status_interval {
            log::info!(
                "Camera pan {:7.2}° tilt {:6.2}° fov {:5.2}° pos ({:.2}, {:.2}, {:.2}) offset {:.2}° updates {}{}",
                view.pan,
                view.tilt,
                view.fov_deg,
                view.x,
                view.y,
                view.z,
                state.tilt_offset,
                state.updates,
                if idle.idle { " [idle]" } else { "" }
            );
            last_status = now;
        }

        thread::sleep(frame);
    }
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let (config, source) = load_config(config_path.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("FreedIO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", source);
    log::info!(
        "Profile {} | idle timeout {:.1}s | tilt calibration {}",
        config.protocol.profile,
        config.idle.timeout_secs,
        if config.calibration.enabled {
            "auto"
        } else {
            "off"
        }
    );

    let decoder = PacketDecoder::new(config.protocol.layout())?;
    let tracker = CameraTracker::from_config(&config);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let receiver = TelemetryReceiver::bind(
        &config.network,
        decoder,
        tracker.clone(),
        Arc::clone(&running),
    )?;
    let mut handle = receiver.start()?;

    log::info!("FreedIO running. Press Ctrl-C to stop.");
    run_consumer(&tracker, &config, &running);

    log::info!("Shutting down...");
    handle.stop();

    let stats = handle.stats();
    log::info!(
        "FreedIO stopped: {} packets decoded, {} dropped",
        stats.decoded,
        stats.decode_errors
    );
    Ok(())
}
