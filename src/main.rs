use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use gaze_capture::{
    capture::CaptureSource,
    display::DisplaySurface,
    error::ConfigError,
    monitor::{self, MonitorGeometry},
    recorder::SessionRecorder,
    session::Session,
    target::{self, GridScheduler, RandomScheduler, TargetScheduler},
};

const WINDOW_NAME: &str = "data collection";

#[derive(Debug, Parser)]
#[clap(about)]
struct Args {
    /// Directory where captured images and the CSV index are written
    #[clap(short, long, default_value = "./data/p00", parse(from_os_str))]
    base_path: PathBuf,

    /// Camera device index
    #[clap(short, long, default_value = "0")]
    camera_index: i32,

    /// Physical monitor size in millimeters, as "width,height"
    #[clap(long)]
    monitor_mm: Option<String>,

    /// Monitor resolution in pixels, as "width,height"
    #[clap(long)]
    monitor_pixels: Option<String>,

    /// Lay targets on a fixed ROWSxCOLS grid instead of random positions
    #[clap(short, long)]
    grid: Option<String>,
}

fn resolve_geometry(args: &Args) -> Result<MonitorGeometry, ConfigError> {
    if let (Some(mm), Some(px)) = (&args.monitor_mm, &args.monitor_pixels) {
        return Ok(MonitorGeometry::new(
            monitor::parse_dimensions(mm)?,
            monitor::parse_dimensions(px)?,
        ));
    }
    monitor::detect_monitor().ok_or(ConfigError::MonitorDetection)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let geometry = resolve_geometry(&args)?;
    info!(
        "using monitor of size {}x{}mm and {}x{}px",
        geometry.width_mm, geometry.height_mm, geometry.width_px, geometry.height_px
    );

    let scheduler: Box<dyn TargetScheduler> = match &args.grid {
        Some(layout) => {
            let (rows, cols) = target::parse_grid(layout)?;
            Box::new(GridScheduler::new(rows, cols, geometry))
        }
        None => Box::new(RandomScheduler::new(geometry)),
    };

    let recorder =
        SessionRecorder::create(&args.base_path).context("preparing output directory")?;
    let source = CaptureSource::open(args.camera_index).context("opening camera")?;
    let surface =
        DisplaySurface::create(WINDOW_NAME, geometry).context("creating display window")?;

    let summary = Session::new(scheduler, source, surface, recorder).run()?;

    info!(
        "captured {} samples to {}",
        summary.records,
        args.base_path.display()
    );
    Ok(())
}
