use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::overlay::domain::draw_surface::{DrawSurface, Stroke, TextStyle};
use crate::shared::detection_result::Point;
use crate::shared::frame::Frame;

/// In-memory RGBA overlay drawn with imageproc.
///
/// Without a font, text calls are dropped; the first one logs a warning.
pub struct RasterSurface {
    image: RgbaImage,
    font: Option<FontVec>,
    warned_no_font: bool,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            font,
            warned_no_font: false,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl DrawSurface for RasterSurface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
    }

    fn draw_rect(&mut self, top_left: Point, bottom_right: Point, stroke: &Stroke) {
        let corners = [top_left.x, top_left.y, bottom_right.x, bottom_right.y];
        if stroke.width == 0 || !corners.iter().all(|v| v.is_finite()) {
            return;
        }

        // Past this margin every edge is off-surface; clamping keeps the
        // stroke offsets below in range for any detector output.
        let size = i64::from(self.image.width().max(self.image.height()));
        let stroke_width = i64::from(stroke.width).min(2 * size + 2);
        let margin = (size + stroke_width) as f64;
        let clamp = |v: f64| v.round().clamp(-margin, margin) as i64;
        let (x, y) = (clamp(top_left.x), clamp(top_left.y));
        let w = clamp(bottom_right.x) - x;
        let h = clamp(bottom_right.y) - y;
        if w <= 0 || h <= 0 {
            return;
        }

        // Line centred on the path: width 3 covers offsets -1, 0, 1.
        let color = Rgba(stroke.color.0);
        let half = stroke_width / 2;
        for offset in -half..(stroke_width - half) {
            let rw = w + 2 * offset;
            let rh = h + 2 * offset;
            if rw <= 0 || rh <= 0 {
                continue;
            }
            let rect = Rect::at((x - offset) as i32, (y - offset) as i32)
                .of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(&mut self.image, rect, color);
        }
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle) {
        let Some(font) = self.font.as_ref() else {
            if !self.warned_no_font {
                log::warn!("No font available, overlay labels will not be drawn");
                self.warned_no_font = true;
            }
            return;
        };

        let scale = PxScale::from(style.size);
        let ascent = font.as_scaled(scale).ascent();
        let top = (origin.y as f32 - ascent).round() as i32;
        draw_text_mut(
            &mut self.image,
            Rgba(style.color.0),
            origin.x.round() as i32,
            top,
            scale,
            font,
            text,
        );
    }

    fn snapshot(&self) -> Frame {
        Frame::new(
            self.image.as_raw().clone(),
            self.image.width(),
            self.image.height(),
            4,
            0,
        )
    }
}
