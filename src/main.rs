// src/main.rs

mod arrows;
mod backend;
mod config;
mod features;
mod overlay;
mod pipeline;
mod scheduler;
mod types;
mod video_processor;

use anyhow::Result;
use features::OpenCvFeatureTracker;
use overlay::HighGuiDisplay;
use pipeline::FlowPipeline;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use types::Config;
use video_processor::VideoSource;

const CONFIG_PATH: &str = "motion_arrow.yaml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        println!("One and only one option must be provided: path to video file");
        std::process::exit(1);
    }

    let (config, config_error) = match Config::load_or_default(CONFIG_PATH) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "motion_arrow={},opencv=warn",
            config.logging.level
        )))
        .init();

    if let Some(e) = config_error {
        warn!("Ignoring {}: {:#}. Using built-in defaults.", CONFIG_PATH, e);
    }

    print_banner();

    info!(
        "Arrow thresholds: shift<{:.1}px, top_n={}, reinit every {} frames, max_features={}",
        config.arrows.shift_acceptance_threshold,
        config.arrows.top_n_arrows,
        config.reinit.frames_between_reinit,
        config.features.max_features
    );

    let source = match VideoSource::open(&args[1]) {
        Ok(source) => source,
        Err(e) => {
            warn!("Could not initialize capturing... ({:#})", e);
            return Ok(());
        }
    };

    let tracker = OpenCvFeatureTracker::new(&config)?;
    let display = HighGuiDisplay::new(&config.display)?;
    let mut pipeline = FlowPipeline::new(source, tracker, display, &config);

    let summary = pipeline.run()?;

    info!("✓ Stream finished");
    info!("  Iterations: {} ({} reinitialisations)", summary.iterations, summary.reset_iterations);
    info!("  Frames read: {}", summary.frames_read);
    info!(
        "  Aggregate arrows drawn: {} of {} tracked frames",
        summary.aggregates_rendered, summary.tracked_frames
    );
    if summary.frames_without_arrows > 0 {
        info!(
            "  Frames with no accepted arrows: {}",
            summary.frames_without_arrows
        );
    }
    info!(
        "  Frames averaging fewer than {} arrows: {}",
        config.arrows.top_n_arrows, summary.short_selections
    );
    info!("  Processing Speed: {:.1} FPS", summary.fps);

    if let Ok(json) = serde_json::to_string(&summary) {
        debug!("summary {}", json);
    }

    Ok(())
}

fn print_banner() {
    let version = opencv::core::get_version_string().unwrap_or_else(|_| "unknown".to_string());
    info!("Lucas-Kanade dominant motion demo (OpenCV {})", version);
    info!("Pass a video file path, or a camera index such as 0");
    info!("Hot keys: ESC - quit the program");
}
