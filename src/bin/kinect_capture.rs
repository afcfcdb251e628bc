use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use kinect_context::{
    capture::capture,
    device::SyntheticDevice,
    image::{IntoImageRgb8, IntoLumaImage},
    io::{write_context_ply, write_ply},
    ErrorKind, KinectSession, SessionConfig, TransformMode,
};
use nalgebra::Vector3;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Records depth frames into point clouds and exports the context")]
struct Args {
    /// Session configuration, JSON
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Output grid: depth or color
    #[arg(long, short, default_value = "depth")]
    mode: TransformMode,
    /// Number of record cycles
    #[arg(long, short, default_value_t = 10)]
    frames: usize,
    /// Lower corner of the context, x,y,z in millimeters
    #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
    lower: Option<Vec<f32>>,
    /// Upper corner of the context, x,y,z in millimeters
    #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
    upper: Option<Vec<f32>>,
    /// Directory receiving the PLY files
    #[arg(long, short, default_value = ".")]
    output: PathBuf,
    /// Also saves a depth and a color PNG of one extra capture
    #[arg(long, action)]
    snapshot: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    let session = KinectSession::open(SyntheticDevice::default(), config)?;
    if let (Some(lower), Some(upper)) = (&args.lower, &args.upper) {
        session.set_bounds(Vector3::from_column_slice(lower), Vector3::from_column_slice(upper))?;
    }

    let recording = AtomicBool::new(true);
    std::thread::scope(|scope| -> Result<(), Box<dyn std::error::Error>> {
        scope.spawn(|| {
            while recording.load(Ordering::Relaxed) {
                let clouds = session.clouds();
                info!(
                    full = clouds.full.valid_count(),
                    context = clouds.context.valid_count(),
                    "context snapshot"
                );
                drop(clouds);
                std::thread::sleep(Duration::from_millis(100));
            }
        });

        let mut published = 0;
        for _ in 0..args.frames {
            match session.record(args.mode) {
                Ok(_) => published += 1,
                Err(err) if err.kind() == ErrorKind::Fatal => {
                    recording.store(false, Ordering::Relaxed);
                    error!(%err, "recording stopped");
                    return Err(err.into());
                }
                Err(err) => warn!(%err, "frame skipped"),
            }
        }
        recording.store(false, Ordering::Relaxed);
        info!(published, requested = args.frames, "recording finished");
        Ok(())
    })?;

    std::fs::create_dir_all(&args.output)?;
    let clouds = session.clouds();
    write_ply(args.output.join("full.ply"), &clouds.full)?;
    write_ply(args.output.join("context.ply"), &clouds.context)?;
    write_context_ply(args.output.join("highlight.ply"), &clouds.full, &clouds.context)?;
    drop(clouds);

    if args.snapshot {
        let frame = capture(session.device(), session.config().capture_timeout())?;
        frame.depth()?.to_luma_image().save(args.output.join("depth.png"))?;
        frame.color()?.to_image_rgb8().save(args.output.join("color.png"))?;
    }

    Ok(())
}
