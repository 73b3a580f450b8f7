//! Command-line front end: scan one image for the reference pad.
//!
//! Stream capture (camera, video files) is deliberately not wired up here;
//! anything that produces frames can drive `refpad::session::run_session`
//! directly.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use log::{info, LevelFilter};

use refpad::color::NamedRange;
use refpad::config::{hsv_range_around, parse_rgb, AppConfig};
use refpad::detect::{build_orchestrator, load_frame};
use refpad::session::run_session;
use refpad::sink::{FrameMeta, ResultSink, SaveImageSink, SaveMaskSink, SinkSet};
use refpad::source::{FrameSeq, SourceOpenError};
use refpad::{DetectorMode, Frame, GrayImage};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

#[derive(Parser, Debug)]
#[command(name = "refpad", version, about = "Detect a reference pad in an image")]
struct Cli {
    /// Input image to scan.
    #[arg(short, long)]
    source: PathBuf,

    /// Reference image(s) of the pad; required for keypoint and auto modes.
    #[arg(short, long = "reference")]
    reference: Vec<PathBuf>,

    /// Where to save the annotated result.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to save the binary occupancy mask.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Detection strategy.
    #[arg(short = 'd', long, default_value_t = DetectorMode::Auto)]
    detector: DetectorMode,

    /// Minimum good matches to accept a keypoint detection.
    #[arg(long, default_value_t = 18)]
    min_matches: usize,

    /// Lowe ratio-test threshold.
    #[arg(long, default_value_t = 0.75)]
    ratio: f32,

    /// Maximum keypoints to extract per image.
    #[arg(long, default_value_t = 2000)]
    features: usize,

    /// Color-contour area bounds in px^2.
    #[arg(long, default_value_t = 800.0)]
    min_area: f64,
    #[arg(long, default_value_t = 1_000_000.0)]
    max_area: f64,

    /// Color-contour aspect-ratio bounds.
    #[arg(long, default_value_t = 0.5)]
    aspect_min: f32,
    #[arg(long, default_value_t = 2.2)]
    aspect_max: f32,

    /// Minimum contour solidity (area over convex-hull area).
    #[arg(long, default_value_t = 0.85)]
    solidity_min: f64,

    /// Border color as R,G,B.
    #[arg(long, default_value = "0,255,0")]
    border_color: String,

    /// Fill color as R,G,B.
    #[arg(long, default_value = "0,255,0")]
    fill_color: String,

    /// Fill opacity in 0..=1.
    #[arg(long, default_value_t = 0.25)]
    fill_alpha: f32,

    /// Extra detection color as NAME=R,G,B; the HSV band is derived from
    /// the value. Repeatable.
    #[arg(long = "color")]
    extra_colors: Vec<String>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Remembers the last frame's metadata for the end-of-run summary.
#[derive(Default)]
struct Summary {
    last: Option<FrameMeta>,
}

impl ResultSink for Summary {
    fn on_result(&mut self, _: &Frame, _: Option<&GrayImage>, meta: &FrameMeta) {
        self.last = Some(*meta);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = refpad::core::init_with_level(level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    check_source_kind(&cli.source)?;
    let config = config_from(&cli)?;
    let orchestrator = build_orchestrator(&config, &cli.reference)?;
    let frame = load_frame(&cli.source)?;

    let mut sinks = SinkSet::new();
    if let Some(path) = &cli.output {
        sinks.push(Box::new(SaveImageSink::new(path)));
    }
    if let Some(path) = &cli.mask {
        sinks.push(Box::new(SaveMaskSink::new(path)));
    }
    let mut summary = Summary::default();

    let mut source = FrameSeq::still(frame);
    let cancel = AtomicBool::new(false);
    let mut fanout = Fanout {
        sinks: &mut sinks,
        summary: &mut summary,
    };
    run_session(&mut source, &orchestrator, config.mode, &mut fanout, &cancel)?;

    match summary.last {
        Some(meta) if meta.has_detection => {
            info!("pad detected ({} {})", meta.count, count_noun(config.mode));
        }
        Some(meta) => {
            info!("no pad detected ({} {})", meta.count, count_noun(config.mode));
        }
        None => info!("no frame was processed"),
    }
    Ok(())
}

struct Fanout<'a> {
    sinks: &'a mut SinkSet,
    summary: &'a mut Summary,
}

impl ResultSink for Fanout<'_> {
    fn on_result(&mut self, frame: &Frame, mask: Option<&GrayImage>, meta: &FrameMeta) {
        self.sinks.on_result(frame, mask, meta);
        self.summary.on_result(frame, mask, meta);
    }
}

fn count_noun(mode: DetectorMode) -> &'static str {
    match mode {
        DetectorMode::Color => "color detections",
        _ => "matches",
    }
}

fn check_source_kind(path: &Path) -> Result<(), SourceOpenError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(());
    }
    Err(SourceOpenError::Unsupported {
        path: path.display().to_string(),
        reason: "only still images are supported here; drive run_session with your own \
                 frame source for video or camera input"
            .into(),
    })
}

fn config_from(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig {
        mode: cli.detector,
        ..AppConfig::default()
    };

    config.detector.matching.min_matches = cli.min_matches;
    config.detector.matching.ratio_threshold = cli.ratio;
    config.detector.features.feature_count = cli.features;

    config.color.min_area = cli.min_area;
    config.color.max_area = cli.max_area;
    config.color.aspect_min = cli.aspect_min;
    config.color.aspect_max = cli.aspect_max;
    config.color.solidity_min = cli.solidity_min;

    let border = parse_rgb(&cli.border_color)?;
    let fill = parse_rgb(&cli.fill_color)?;
    for style in [&mut config.detector.style, &mut config.color.style] {
        style.border_color = border;
        style.fill_color = fill;
        style.fill_alpha = cli.fill_alpha;
    }

    for entry in &cli.extra_colors {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid --color '{entry}', expected NAME=R,G,B"))?;
        let rgb = parse_rgb(value)?;
        config.color.colors.push(NamedRange {
            name: name.trim().to_string(),
            range: hsv_range_around(rgb, 10, 50, 50),
        });
    }

    config.validate()?;
    Ok(config)
}
