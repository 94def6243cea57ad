//! Renders omnivox scenes without a display, printing statistics about each frame.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser as _;

use omnivox_render::{Compositor, FrameInfo, KernelDevice, SoftwareKernelDevice};

mod config;
use config::HeadlessConfig;
mod logging;

#[derive(Clone, Debug, clap::Parser)]
#[command(author, about, version)]
struct HeadlessArgs {
    /// JSON file giving compositor options and the scenes to show.
    ///
    /// If omitted, the default shadow scene is shown.
    #[arg(value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of frames to render, overriding the configuration file.
    #[arg(long = "frames", short = 'n')]
    frames: Option<usize>,

    /// Seconds of animation per frame, overriding the configuration file.
    #[arg(long = "dt")]
    dt: Option<f64>,

    #[command(flatten)]
    logging: logging::LoggingArgs,
}

fn main() -> Result<(), anyhow::Error> {
    let HeadlessArgs {
        config,
        frames,
        dt,
        logging: logging_args,
    } = HeadlessArgs::parse();
    logging::install(&logging_args)?;

    let mut config = match config {
        Some(path) => HeadlessConfig::read(&path)?,
        None => HeadlessConfig::default(),
    };
    if let Some(frames) = frames {
        config.frames = frames;
    }
    if let Some(dt) = dt {
        config.dt = dt;
    }
    if !(config.dt.is_finite() && config.dt >= 0.0) {
        anyhow::bail!("dt must be a non-negative number of seconds, not {}", config.dt);
    }

    let device: Arc<dyn KernelDevice> = Arc::new(SoftwareKernelDevice::new());
    let mut compositor = Compositor::new(&config.compositor, Arc::clone(&device));
    log::debug!(
        "rendering {} frames of a {}³ grid with {:?}",
        config.frames,
        config.compositor.grid_size.edge(),
        compositor.context().dispatcher(),
    );

    let start_time = Instant::now();
    let mut total = FrameInfo::default();
    for frame in 0..config.frames {
        if let Some(options) = config.scene_starting_at(frame) {
            log::debug!("frame {frame}: showing {} scene", options.kind());
            compositor.apply_options(options.clone());
        }
        let info = pollster::block_on(compositor.render(config.dt));
        let lit = compositor
            .output()
            .as_cpu()
            .map_or(0, |output| output.lit_voxel_count());
        println!(
            "frame {frame:>5}: {info}, {lit} voxels lit{}",
            if compositor.crossfade().is_fading() {
                ", crossfading"
            } else {
                ""
            }
        );
        total += info;
    }

    let elapsed = start_time.elapsed();
    println!(
        "total: {total} in {:.3} s; {} device buffers live",
        elapsed.as_secs_f64(),
        device.live_buffers()
    );
    Ok(())
}
