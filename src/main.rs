mod capture;
mod output;
mod pipeline;
mod render;
mod segmentation;

use anyhow::{Context, Result};
use capture::{CaptureSource, WebcamCapture};
use clap::Parser;
use output::{OutputSink, V4L2Output};
use pipeline::{CycleOutcome, Pipeline};
use render::Compositor;
use segmentation::{InternalResolution, PassthroughSegmenter, PersonSegmenter, SegmenterConfig};
use std::time::{Duration, Instant};

/// Which composed view is streamed to the loopback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum View {
    /// Accumulated background with the person removed
    Ghost,
    /// Body-only pixels
    Color,
    /// Body cutout over the alternate backdrop
    Backdrop,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    /// If not provided, runs in passthrough mode: everything is treated as
    /// background and the ghost view converges to the raw feed
    #[arg(long)]
    model: Option<String>,

    /// Which view to stream to the output device
    #[arg(long, value_enum, default_value_t = View::Ghost)]
    view: View,

    /// Scale factor applied to the detected body box, to tolerate false
    /// negatives at the body's edges
    #[arg(long, default_value_t = pipeline::DEFAULT_BOX_SCALE)]
    box_scale: f32,

    /// Draw the padded body box outline on the ghost view
    #[arg(long)]
    show_box: bool,

    /// Alternate backdrop image the body cutout is composited over
    #[arg(long)]
    backdrop: Option<String>,

    /// Fixed cursor coordinate "X,Y" for the mask-value readout
    #[arg(long, value_parser = parse_cursor)]
    probe: Option<(i32, i32)>,

    /// Mirror frames horizontally before inference
    #[arg(long)]
    flip_horizontal: bool,

    /// Internal inference resolution (quality/speed tradeoff)
    #[arg(long, value_enum, default_value_t = InternalResolution::High)]
    internal_resolution: InternalResolution,

    /// Confidence floor in [0,1] above which a pixel is labeled body
    #[arg(long, default_value_t = 0.9)]
    segmentation_threshold: f32,

    /// Per-instance confidence floor in [0,1]
    #[arg(long, default_value_t = 0.2)]
    score_threshold: f32,
}

fn parse_cursor(value: &str) -> Result<(i32, i32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| "expected X,Y".to_string())?;
    Ok((
        x.trim().parse().map_err(|e| format!("bad X: {e}"))?,
        y.trim().parse().map_err(|e| format!("bad Y: {e}"))?,
    ))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Ghostcam starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Target FPS: {}", args.fps);
    tracing::info!("View: {:?}, box scale: {}", args.view, args.box_scale);

    // Initialize capture
    let mut capture = WebcamCapture::new(args.input_device, args.capture_width, args.capture_height)
        .context("Failed to initialize webcam capture")?;

    // Initialize output
    let mut output = V4L2Output::new(&args.output_device, args.capture_width, args.capture_height)
        .context("Failed to initialize v4l2loopback output")?;

    // Initialize the segmentation source
    let mut segmenter: Box<dyn PersonSegmenter> = if let Some(model_path) = &args.model {
        let config = SegmenterConfig {
            flip_horizontal: args.flip_horizontal,
            internal_resolution: args.internal_resolution,
            segmentation_threshold: args.segmentation_threshold,
            score_threshold: args.score_threshold,
        };
        tracing::info!("Loading segmentation model from {}", model_path);
        let model = segmentation::create_segmenter(model_path, config)
            .context("Failed to load segmentation model")?;
        tracing::info!("Segmentation model loaded successfully");
        model
    } else {
        tracing::info!("Running in passthrough mode (no segmentation)");
        Box::new(PassthroughSegmenter)
    };

    let mut pipeline = Pipeline::new(args.box_scale);
    if let Some(path) = &args.backdrop {
        let backdrop = image::open(path)
            .with_context(|| format!("Failed to load backdrop image from {path}"))?
            .to_rgba8();
        tracing::info!(
            "Backdrop loaded from {} ({}x{})",
            path,
            backdrop.width(),
            backdrop.height()
        );
        pipeline.set_backdrop(backdrop);
    }

    let compositor = Compositor::new(args.show_box);

    run_pipeline(
        &mut capture,
        &mut output,
        &mut pipeline,
        segmenter.as_mut(),
        &compositor,
        &args,
    )
}

fn run_pipeline<C, O>(
    capture: &mut C,
    output: &mut O,
    pipeline: &mut Pipeline,
    segmenter: &mut dyn PersonSegmenter,
    compositor: &Compositor,
    args: &Args,
) -> Result<()>
where
    C: CaptureSource,
    O: OutputSink,
{
    let frame_duration = Duration::from_secs_f32(1.0 / args.fps as f32);
    let mut frame_count = 0u64;
    let mut detected_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_cycle_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;

    tracing::info!("Starting main pipeline loop");
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        // Capture frame
        let capture_start = Instant::now();
        let frame = capture.capture_frame().context("Failed to capture frame")?;
        total_capture_time += capture_start.elapsed();

        // Classify, accumulate background, pad the box, compose views
        let cycle_start = Instant::now();
        let views = match pipeline.process_cycle(&frame, segmenter) {
            Ok(CycleOutcome::Completed(result)) => {
                // No detection is a normal outcome: the views render as
                // all-background and no box is drawn.
                if result.detection.is_detected() {
                    detected_count += 1;
                }
                Some(compositor.compose(pipeline.background(), &result, args.probe))
            }
            Ok(CycleOutcome::Skipped) => None,
            Err(err) => {
                // Fatal to this cycle only; the next tick retries.
                tracing::warn!("cycle aborted: {err}");
                None
            }
        };
        total_cycle_time += cycle_start.elapsed();

        // Output the selected view
        if let Some(views) = views {
            let selected = match args.view {
                View::Ghost => &views.ghost,
                View::Color => &views.color,
                View::Backdrop => &views.backdrop,
            };

            let output_start = Instant::now();
            output
                .write_frame(selected)
                .context("Failed to write frame")?;
            total_output_time += output_start.elapsed();
        }

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_cycle_ms = total_cycle_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_cycle_ms + avg_output_ms;
            let actual_fps = 1000.0 / total_ms;

            tracing::info!(
                "Frame {}: capture={:.1}ms, cycle={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}, detected={}",
                frame_count,
                avg_capture_ms,
                avg_cycle_ms,
                avg_output_ms,
                total_ms,
                actual_fps,
                detected_count
            );
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
