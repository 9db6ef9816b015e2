mod app;
mod commands;
mod settings;
mod terminal_observer;

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;

use face_overlay_core::camera::infrastructure::ffmpeg_camera_source::{
    CameraInput, FfmpegCameraSource,
};
use face_overlay_core::detection::domain::face_detector::FaceDetector;
use face_overlay_core::detection::infrastructure::deferred_detector::{
    DeferredDetector, LoadStatus,
};
use face_overlay_core::detection::infrastructure::model_resolver;
use face_overlay_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use face_overlay_core::overlay::infrastructure::font_locator;
use face_overlay_core::overlay::infrastructure::raster_surface::RasterSurface;
use face_overlay_core::overlay::domain::draw_surface::Color;
use face_overlay_core::overlay::overlay_renderer::{OverlayRenderer, OverlayStyle};
use face_overlay_core::session::loop_controller::DetectionLoopController;
use face_overlay_core::session::session_observer::SharedSessionObserver;
use face_overlay_core::shared::constants::BLAZEFACE_MODEL_NAME;
use face_overlay_core::shared::sync::lock;

use crate::app::App;
use crate::commands::{Command, HELP};
use crate::settings::Settings;
use crate::terminal_observer::TerminalObserver;

/// Live face detection overlay on a camera stream.
#[derive(Parser, Debug)]
#[command(name = "face-overlay")]
struct Cli {
    /// Camera device (e.g. /dev/video0, 0) or a video file/URL.
    #[arg(long)]
    device: Option<String>,

    /// libavdevice input format (v4l2, avfoundation, dshow). Omit for files.
    #[arg(long)]
    input_format: Option<String>,

    /// Requested capture width.
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height.
    #[arg(long)]
    height: Option<u32>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Detection passes per second at most.
    #[arg(long)]
    refresh_rate: Option<u32>,

    /// Use this ONNX model file instead of resolving it.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Download URL for the model when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// TrueType font for labels (defaults to a system font).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Box and label colour as #rrggbb or #rrggbbaa.
    #[arg(long)]
    box_color: Option<String>,

    /// Directory to write screenshots to as PNG.
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Start detecting as soon as the model is loaded.
    #[arg(long)]
    start: bool,
}

/// Flags layered over the settings file.
#[derive(Debug, Clone, PartialEq)]
struct Config {
    camera: CameraInput,
    confidence: f64,
    refresh_rate: u32,
    model: Option<PathBuf>,
    model_url: Option<String>,
    font: Option<PathBuf>,
    box_color: Option<String>,
    screenshot_dir: Option<PathBuf>,
    autostart: bool,
}

impl Config {
    /// Default overlay style, recoloured when a box colour is configured.
    fn overlay_style(&self) -> Result<OverlayStyle, String> {
        let mut style = OverlayStyle::default();
        if let Some(hex) = &self.box_color {
            let color = Color::from_hex(hex)
                .ok_or_else(|| format!("Box color must be #rrggbb or #rrggbbaa, got {hex}"))?;
            style.stroke.color = color;
            style.text.color = color;
        }
        Ok(style)
    }

    fn merge(cli: Cli, settings: Settings) -> Self {
        let device = cli.device.or(settings.device);
        let input_format = cli.input_format.or(settings.input_format);
        let mut camera = match device {
            // An explicit device without a format is treated as a file or URL.
            Some(device) => CameraInput {
                format: input_format,
                ..CameraInput::file(device)
            },
            None => {
                let mut default = CameraInput::platform_default();
                if input_format.is_some() {
                    default.format = input_format;
                }
                default
            }
        };
        camera.width = cli.width.unwrap_or(settings.width);
        camera.height = cli.height.unwrap_or(settings.height);

        Self {
            camera,
            confidence: cli.confidence.unwrap_or(settings.confidence),
            refresh_rate: cli.refresh_rate.unwrap_or(settings.refresh_rate),
            model: cli.model,
            model_url: cli.model_url.or(settings.model_url),
            font: cli.font.or(settings.font),
            box_color: cli.box_color.or(settings.box_color),
            screenshot_dir: cli.screenshot_dir.or(settings.screenshot_dir),
            autostart: cli.start,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::merge(Cli::parse(), Settings::load());
    validate(&config)?;

    let observer: SharedSessionObserver = Arc::new(Mutex::new(TerminalObserver::new(io::stdout())));

    let font = match font_locator::locate_font(config.font.as_deref()) {
        Ok(font) => Some(font),
        Err(e) if config.font.is_some() => return Err(e.into()),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    };
    let surface = Arc::new(Mutex::new(RasterSurface::new(0, 0, font)));

    lock(&observer).status("Loading face detection model...");
    let detector = Arc::new(Mutex::new(spawn_detector(&config, observer.clone())));
    let status_source = detector.clone();
    let model_status = Box::new(move || lock(&status_source).status());

    let camera = Arc::new(Mutex::new(FfmpegCameraSource::new(config.camera.clone())));
    let controller = DetectionLoopController::new(
        OverlayRenderer::new(config.overlay_style()?),
        observer.clone(),
        config.refresh_rate,
    );

    let mut app = App::new(
        camera,
        detector.clone(),
        model_status,
        surface,
        controller,
        observer.clone(),
        config.screenshot_dir.clone(),
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    if config.autostart {
        let loaded = lock(&detector).wait(std::time::Duration::MAX);
        if loaded == LoadStatus::Ready {
            tx.send(Command::Start)?;
        }
    }
    lock(&observer).status(HELP);
    commands::spawn_reader(io::BufReader::new(io::stdin()), tx);

    app.run(&rx);
    Ok(())
}

/// Resolves and loads the model on a background thread, reporting the
/// outcome as a status line.
fn spawn_detector(config: &Config, observer: SharedSessionObserver) -> DeferredDetector {
    let explicit = config.model.clone();
    let url = config.model_url.clone();
    let confidence = config.confidence;

    DeferredDetector::spawn(
        Box::new(move || -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
            let model_path = match explicit {
                Some(path) => path,
                None => resolve_model(url.as_deref())?,
            };
            Ok(Box::new(OnnxBlazefaceDetector::new(&model_path, confidence)?))
        }),
        Some(Box::new(move |status: &LoadStatus| {
            let message = match status {
                LoadStatus::Ready => "Model loaded successfully! Type \"start\" to begin.",
                _ => "Error loading model. Please restart.",
            };
            lock(&observer).status(message);
        })),
    )
}

fn resolve_model(url: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
    let bundled = bundled_models_dir();
    let path = model_resolver::resolve(
        BLAZEFACE_MODEL_NAME,
        url,
        bundled.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

/// `models/` next to the executable, for packaged installs.
fn bundled_models_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("models"))
}

fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&config.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            config.confidence
        )
        .into());
    }
    if config.refresh_rate == 0 || config.refresh_rate > 240 {
        return Err(format!(
            "Refresh rate must be between 1 and 240, got {}",
            config.refresh_rate
        )
        .into());
    }
    if config.camera.width == 0 || config.camera.height == 0 {
        return Err(format!(
            "Capture size must be positive, got {}x{}",
            config.camera.width, config.camera.height
        )
        .into());
    }
    config.overlay_style()?;
    if let Some(model) = &config.model {
        require_file(model, "Model")?;
    }
    if let Some(font) = &config.font {
        require_file(font, "Font")?;
    }
    if let Some(dir) = &config.screenshot_dir {
        if dir.exists() && !dir.is_dir() {
            return Err(format!("Screenshot path is not a directory: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("{what} file not found: {}", path.display()).into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("face-overlay").chain(args.iter().copied()))
    }

    fn config(args: &[&str]) -> Config {
        Config::merge(parse(args), Settings::default())
    }

    #[test]
    fn test_defaults_use_platform_camera() {
        let config = config(&[]);

        assert_eq!(config.camera, CameraInput::platform_default());
        assert_eq!(config.confidence, 0.5);
        assert_eq!(config.refresh_rate, 60);
        assert!(!config.autostart);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            confidence: 0.8,
            refresh_rate: 15,
            screenshot_dir: Some("/from/settings".into()),
            ..Settings::default()
        };

        let config = Config::merge(parse(&["--confidence", "0.3"]), settings);

        assert_eq!(config.confidence, 0.3);
        assert_eq!(config.refresh_rate, 15);
        assert_eq!(config.screenshot_dir, Some(PathBuf::from("/from/settings")));
    }

    #[test]
    fn test_device_without_format_is_file_input() {
        let config = config(&["--device", "clip.mp4", "--width", "320"]);

        assert_eq!(config.camera.device, "clip.mp4");
        assert!(!config.camera.is_live_device());
        assert_eq!(config.camera.width, 320);
    }

    #[test]
    fn test_device_with_format_is_live() {
        let config = config(&["--device", "/dev/video2", "--input-format", "v4l2"]);

        assert!(config.camera.is_live_device());
        assert_eq!(config.camera.format.as_deref(), Some("v4l2"));
    }

    #[test]
    fn test_validate_rejects_confidence_out_of_range() {
        let err = validate(&config(&["--confidence", "1.5"])).unwrap_err();

        assert!(err.to_string().contains("Confidence"));
    }

    #[test]
    fn test_validate_rejects_zero_refresh_rate() {
        let err = validate(&config(&["--refresh-rate", "0"])).unwrap_err();

        assert!(err.to_string().contains("Refresh rate"));
    }

    #[test]
    fn test_box_color_recolours_boxes_and_labels() {
        let config = config(&["--box-color", "#ff8800"]);

        let style = config.overlay_style().unwrap();

        assert_eq!(style.stroke.color, Color::rgba(0xff, 0x88, 0x00, 0xff));
        assert_eq!(style.text.color, style.stroke.color);
        assert_eq!(style.stroke.width, OverlayStyle::default().stroke.width);
    }

    #[test]
    fn test_box_color_from_settings() {
        let settings = Settings {
            box_color: Some("#0000ff80".into()),
            ..Settings::default()
        };

        let config = Config::merge(parse(&[]), settings);

        assert_eq!(
            config.overlay_style().unwrap().stroke.color,
            Color::rgba(0, 0, 0xff, 0x80)
        );
    }

    #[test]
    fn test_validate_rejects_bad_box_color() {
        let err = validate(&config(&["--box-color", "green"])).unwrap_err();

        assert!(err.to_string().contains("Box color"));
    }

    #[test]
    fn test_validate_rejects_missing_model_file() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.onnx");

        let err = validate(&config(&["--model", missing.to_str().unwrap()])).unwrap_err();

        assert!(err.to_string().contains("Model file not found"));
    }

    #[test]
    fn test_validate_rejects_screenshot_dir_that_is_a_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();

        let err = validate(&config(&["--screenshot-dir", tmp.path().to_str().unwrap()]))
            .unwrap_err();

        assert!(err.to_string().contains("not a directory"));
    }
}
