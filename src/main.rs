//! holorig - Holistic Landmark Tracking Demo
//!
//! Main entry point for the CLI application. Runs the tracking
//! pipeline against the built-in synthetic graph and test pattern
//! source, logging detection state and capture rate.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use holorig::{
    capture::source::TestPatternSource, graph::synthetic::SyntheticGraphFactory,
    rig::solver::CentroidSolver, Config, HolisticTracker,
};

/// holorig - Holistic Landmark Tracking Demo
#[derive(Parser, Debug)]
#[command(name = "holorig", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target capture rate in fps (overrides config)
    #[arg(short, long)]
    fps: Option<u32>,

    /// Disable hand tracking
    #[arg(long)]
    no_hands: bool,

    /// Disable horizontal input mirroring
    #[arg(long)]
    no_flip: bool,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(short, long, default_value_t = 0)]
    duration: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", holorig::NAME, holorig::VERSION);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&args))?;

    info!("holorig stopped");
    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(fps) = args.fps {
        config.capture.target_fps = fps;
    }
    if args.no_hands {
        config.graph.track_hands = false;
    }
    if args.no_flip {
        config.graph.flip_horizontal = false;
    }

    // Validate configuration
    config.validate()?;

    info!("Target capture rate: {} fps", config.capture.target_fps);
    info!("Hand tracking: {}", config.graph.track_hands);
    info!(
        "Input frame: {}x{}",
        config.capture.width, config.capture.height
    );

    let source = TestPatternSource::new(config.capture.width, config.capture.height);
    let mut tracker = HolisticTracker::new(
        &config,
        Box::new(SyntheticGraphFactory::new()),
        Box::new(source),
        Box::new(CentroidSolver),
    );

    tracker.start()?;
    let reporter = tracker.start_rate_reporter();

    // Log detection transitions, emotion changes and the once-per-second
    // capture rate.
    let mut detected_rx = tracker.subscribe_detected();
    let mut rate_rx = tracker.subscribe_rate();
    let mut emotions_rx = tracker.subscribe_emotions();
    let observer = tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;

        let mut last_detected: Option<bool> = None;
        let mut last_emotion: Option<String> = None;
        loop {
            tokio::select! {
                result = detected_rx.recv() => {
                    match result {
                        Ok(detected) => {
                            if last_detected != Some(detected) {
                                if detected {
                                    info!("Face detected");
                                } else {
                                    info!("Face lost");
                                }
                                last_detected = Some(detected);
                            }
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                result = rate_rx.recv() => {
                    match result {
                        Ok(rate) => info!("Capture rate: {} fps", rate),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                result = emotions_rx.recv() => {
                    match result {
                        Ok(set) => {
                            if let Some(top) = set.top() {
                                if last_emotion.as_deref() != Some(top.label.as_str()) {
                                    info!("Dominant emotion: {} ({:.2})", top.label, top.score);
                                    last_emotion = Some(top.label.clone());
                                }
                            }
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }
        }
    });

    // Drive the tracker at 60 Hz until interrupted or the requested
    // duration elapses.
    let tick = Duration::from_secs_f32(1.0 / 60.0);
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let deadline = if args.duration > 0 {
        Some(tokio::time::Instant::now() + Duration::from_secs(args.duration))
    } else {
        None
    };

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracker.tick(tick);
                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        info!("Run duration elapsed");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    if let Err(e) = tracker.shutdown() {
        error!("Shutdown error: {}", e);
    }
    let _ = reporter.await;
    observer.abort();

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
