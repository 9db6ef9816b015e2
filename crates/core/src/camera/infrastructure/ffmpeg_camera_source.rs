use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::camera::domain::video_source::VideoSource;
use crate::shared::acquisition_error::AcquisitionError;
use crate::shared::constants::{DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH};
use crate::shared::frame::Frame;

/// Pacing for file inputs whose stream reports no frame rate.
const FALLBACK_FILE_FPS: f64 = 30.0;

/// Where and how to open the capture device.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInput {
    /// Device path, index or name (`/dev/video0`, `0`, `video=...`), or a
    /// file/URL when `format` is `None`.
    pub device: String,
    /// libavdevice input format (`v4l2`, `avfoundation`, `dshow`).
    pub format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub framerate: Option<u32>,
}

impl CameraInput {
    /// The first camera of the current platform at the default resolution.
    pub fn platform_default() -> Self {
        #[cfg(target_os = "linux")]
        let (device, format) = ("/dev/video0", "v4l2");
        #[cfg(target_os = "macos")]
        let (device, format) = ("0", "avfoundation");
        #[cfg(target_os = "windows")]
        let (device, format) = ("video=Integrated Camera", "dshow");
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        let (device, format) = ("/dev/video0", "video4linux2");

        Self {
            device: device.to_string(),
            format: Some(format.to_string()),
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            framerate: None,
        }
    }

    /// A video or image file played as if it were a camera.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            device: path.into(),
            format: None,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            framerate: None,
        }
    }

    pub fn is_live_device(&self) -> bool {
        self.format.is_some()
    }

    fn options(&self) -> ffmpeg_next::Dictionary<'static> {
        let mut options = ffmpeg_next::Dictionary::new();
        if self.is_live_device() {
            options.set("video_size", &format!("{}x{}", self.width, self.height));
            if let Some(fps) = self.framerate {
                options.set("framerate", &fps.to_string());
            }
        }
        options
    }
}

impl Default for CameraInput {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Captures frames from a camera (or file) via ffmpeg-next on a background
/// thread, always exposing the most recent decoded frame as RGB24.
pub struct FfmpegCameraSource {
    input: CameraInput,
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegCameraSource {
    pub fn new(input: CameraInput) -> Self {
        Self {
            input,
            latest: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn input(&self) -> &CameraInput {
        &self.input
    }
}

impl VideoSource for FfmpegCameraSource {
    fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        self.running.store(true, Ordering::Relaxed);

        let input = self.input.clone();
        let latest = self.latest.clone();
        let running = self.running.clone();
        let handle = thread::spawn(move || run_capture(&input, &ready_tx, &latest, &running));

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("capture thread exited before opening the device".into()));

        match opened {
            Ok(()) => {
                log::info!("Camera opened: {}", self.input.device);
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Relaxed);
                let _ = handle.join();
                log::error!("Error accessing camera {}: {e}", self.input.device);
                Err(AcquisitionError::Camera(e))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Camera capture thread panicked");
            }
            log::info!("Camera released: {}", self.input.device);
        }
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let latest = self.latest.lock().ok()?;
        latest.as_ref().map(|f| (f.width(), f.height()))
    }

    fn current_frame(&self) -> Option<Frame> {
        self.latest.lock().ok()?.clone()
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture thread body: open the input, report the outcome, then decode
/// until `running` is cleared or the input ends.
fn run_capture(
    input: &CameraInput,
    ready_tx: &crossbeam_channel::Sender<Result<(), String>>,
    latest: &Mutex<Option<Frame>>,
    running: &AtomicBool,
) {
    let mut ictx = match open_input(input) {
        Ok(ctx) => ctx,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };

    let (stream_index, mut decoder, fps) = match open_decoder(&ictx) {
        Ok(parts) => parts,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    // Live devices pace themselves; files are replayed at their frame rate.
    let frame_interval = (!input.is_live_device()).then(|| {
        let fps = if fps > 0.0 { fps } else { FALLBACK_FILE_FPS };
        Duration::from_secs_f64(1.0 / fps)
    });

    let mut publisher = FramePublisher {
        converter: RgbConverter::default(),
        latest,
        frame_index: 0,
        frame_interval,
    };

    for (stream, packet) in ictx.packets() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            log::debug!("Dropping undecodable packet: {e}");
            continue;
        }
        publisher.drain(&mut decoder);
    }

    if running.load(Ordering::Relaxed) && decoder.send_eof().is_ok() {
        publisher.drain(&mut decoder);
    }

    log::debug!(
        "Capture loop finished after {} frames",
        publisher.frame_index
    );
}

/// Moves decoded frames into the shared latest-frame slot.
struct FramePublisher<'a> {
    converter: RgbConverter,
    latest: &'a Mutex<Option<Frame>>,
    frame_index: usize,
    frame_interval: Option<Duration>,
}

impl FramePublisher<'_> {
    fn drain(&mut self, decoder: &mut ffmpeg_next::decoder::Video) {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let started = Instant::now();
            match self.converter.convert(&decoded, self.frame_index) {
                Ok(frame) => {
                    if let Ok(mut slot) = self.latest.lock() {
                        *slot = Some(frame);
                    }
                    self.frame_index += 1;
                }
                Err(e) => log::warn!("Failed to convert camera frame: {e}"),
            }
            if let Some(interval) = self.frame_interval {
                thread::sleep(interval.saturating_sub(started.elapsed()));
            }
        }
    }
}

fn open_input(
    input: &CameraInput,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;

    let Some(format_name) = input.format.as_deref() else {
        return Ok(ffmpeg_next::format::input_with_dictionary(
            &input.device,
            input.options(),
        )?);
    };

    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == format_name)
        .ok_or_else(|| format!("input device format '{format_name}' is not available"))?;

    match ffmpeg_next::format::open_with(&input.device, &format, input.options())? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("{} opened as an output", input.device).into())
        }
    }
}

fn open_decoder(
    ictx: &ffmpeg_next::format::context::Input,
) -> Result<(usize, ffmpeg_next::decoder::Video, f64), Box<dyn std::error::Error>> {
    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("No video stream found")?;

    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;

    let rate = stream.rate();
    let fps = if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    };

    Ok((stream.index(), decoder, fps))
}

/// Converts decoded frames to packed RGB24, rebuilding the scaler whenever
/// the source format or size changes.
#[derive(Default)]
struct RgbConverter {
    scaler: Option<(ffmpeg_next::software::scaling::Context, ScalerKey)>,
}

#[derive(Clone, Copy, PartialEq)]
struct ScalerKey {
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

impl RgbConverter {
    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        index: usize,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        let key = ScalerKey {
            format: decoded.format(),
            width: decoded.width(),
            height: decoded.height(),
        };

        let stale = self.scaler.as_ref().map_or(true, |(_, k)| *k != key);
        if stale {
            let ctx = ffmpeg_next::software::scaling::Context::get(
                key.format,
                key.width,
                key.height,
                ffmpeg_next::format::Pixel::RGB24,
                key.width,
                key.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((ctx, key));
        }

        let (scaler, _) = self.scaler.as_mut().ok_or("scaler not initialised")?;
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(decoded, &mut rgb)?;

        let pixels = extract_rgb_pixels(&rgb, key.width, key.height);
        Ok(Frame::new(pixels, key.width, key.height, 3, index))
    }
}

/// Copies the RGB24 plane row by row, dropping the stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(path: &std::path::Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]));
        img.save(path).unwrap();
    }

    fn wait_for_video(source: &FfmpegCameraSource) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if source.has_video() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_platform_default_is_live_device_at_default_size() {
        let input = CameraInput::platform_default();
        assert!(input.is_live_device());
        assert_eq!((input.width, input.height), (640, 480));
    }

    #[test]
    fn test_file_input_is_not_live() {
        assert!(!CameraInput::file("clip.mp4").is_live_device());
    }

    #[test]
    fn test_dimensions_unknown_before_start() {
        let source = FfmpegCameraSource::new(CameraInput::file("unused.png"));
        assert_eq!(source.dimensions(), None);
        assert!(source.current_frame().is_none());
        assert!(!source.has_video());
    }

    #[test]
    fn test_missing_file_is_acquisition_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mp4");
        let mut source = FfmpegCameraSource::new(CameraInput::file(path.to_string_lossy()));

        let result = source.start();

        assert!(matches!(result, Err(AcquisitionError::Camera(_))));
        assert!(!source.has_video());
    }

    #[test]
    fn test_image_file_produces_frame_with_source_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_test_image(&path, 64, 48);
        let mut source = FfmpegCameraSource::new(CameraInput::file(path.to_string_lossy()));

        source.start().unwrap();
        assert!(wait_for_video(&source));

        assert_eq!(source.dimensions(), Some((64, 48)));
        let frame = source.current_frame().unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[40, 80, 120]);

        source.stop();
        assert_eq!(source.dimensions(), None);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut source = FfmpegCameraSource::new(CameraInput::file("never-started.png"));
        source.stop();
        source.stop();
        assert!(!source.has_video());
    }
}
