use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};

use crate::camera::domain::video_source::SharedVideoSource;
use crate::overlay::domain::draw_surface::SharedDrawSurface;
use crate::session::session_observer::SharedSessionObserver;
use crate::shared::frame::Frame;
use crate::shared::sync::lock;

#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("frame has an unsupported layout ({channels} channels, {width}x{height})")]
    UnsupportedFrame {
        width: u32,
        height: u32,
        channels: u8,
    },
    #[error("failed to encode screenshot: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write screenshot to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A flattened video frame plus overlay, encoded as PNG.
#[derive(Clone, Debug)]
pub struct Screenshot {
    png: Vec<u8>,
    width: u32,
    height: u32,
    taken_at: DateTime<Local>,
    face_count: usize,
}

impl Screenshot {
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn taken_at(&self) -> DateTime<Local> {
        self.taken_at
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn caption(&self) -> String {
        format!(
            "Screenshot taken at {} - {} face(s) detected",
            self.taken_at.format("%H:%M:%S"),
            self.face_count
        )
    }

    /// e.g. `screenshot-20240501-142233-003.png` for the third capture.
    pub fn file_name(&self, sequence: usize) -> String {
        format!(
            "screenshot-{}-{sequence:03}.png",
            self.taken_at.format("%Y%m%d-%H%M%S")
        )
    }
}

/// Captured screenshots in capture order. Entries are never removed or
/// modified.
#[derive(Debug, Default)]
pub struct ScreenshotGallery {
    shots: Vec<Screenshot>,
}

impl ScreenshotGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn latest(&self) -> Option<&Screenshot> {
        self.shots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Screenshot> {
        self.shots.iter()
    }

    fn push(&mut self, shot: Screenshot) -> &Screenshot {
        self.shots.push(shot);
        &self.shots[self.shots.len() - 1]
    }
}

/// Flattens `overlay` onto `frame` at the origin. The output has the
/// frame's size; overlay pixels outside it are dropped.
pub fn composite(frame: &Frame, overlay: &Frame) -> Result<RgbaImage, ScreenshotError> {
    let mut base = to_rgba(frame)?;
    let top = to_rgba(overlay)?;
    image::imageops::overlay(&mut base, &top, 0, 0);
    Ok(base)
}

fn to_rgba(frame: &Frame) -> Result<RgbaImage, ScreenshotError> {
    frame
        .to_rgba_image()
        .ok_or(ScreenshotError::UnsupportedFrame {
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
        })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ScreenshotError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Captures the current video frame with the overlay on top and appends it
/// to `gallery`, tagged with the local time and the face count.
///
/// `face_count` is read while the overlay is locked, so the count always
/// belongs to the pass whose boxes are in the snapshot.
///
/// Returns `Ok(None)` without side effects when the video has no frame yet.
pub fn capture<'g>(
    video: &SharedVideoSource,
    surface: &SharedDrawSurface,
    face_count: impl FnOnce() -> usize,
    gallery: &'g mut ScreenshotGallery,
    observer: &SharedSessionObserver,
) -> Result<Option<&'g Screenshot>, ScreenshotError> {
    let frame = {
        let video = lock(video);
        match video.dimensions() {
            Some((w, h)) if w > 0 && h > 0 => video.current_frame(),
            _ => None,
        }
    };
    let Some(frame) = frame.filter(|f| f.has_pixels()) else {
        log::debug!("Screenshot skipped: no video frame yet");
        return Ok(None);
    };

    let (overlay, face_count) = {
        let surface = lock(surface);
        (surface.snapshot(), face_count())
    };
    let flattened = composite(&frame, &overlay)?;
    let shot = Screenshot {
        png: encode_png(&flattened)?,
        width: flattened.width(),
        height: flattened.height(),
        taken_at: Local::now(),
        face_count,
    };

    lock(observer).status(&format!(
        "Screenshot captured! {face_count} face(s) detected."
    ));
    log::info!("{}", shot.caption());
    Ok(Some(gallery.push(shot)))
}

/// Writes the PNG bytes into `dir`, creating it if needed.
pub fn save_png(shot: &Screenshot, dir: &Path, sequence: usize) -> Result<PathBuf, ScreenshotError> {
    let path = dir.join(shot.file_name(sequence));
    let write_err = |source| ScreenshotError::Write {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    std::fs::write(&path, shot.png()).map_err(write_err)?;
    Ok(path)
}
