use std::sync::{Arc, Mutex};

use crate::shared::constants::{BOX_COLOR, BOX_LINE_WIDTH, LABEL_FONT_SIZE};
use crate::shared::detection_result::Point;
use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let alpha = if digits.len() == 8 { byte(6)? } else { 0xff };
        Some(Self([byte(0)?, byte(2)?, byte(4)?, alpha]))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self(BOX_COLOR)
    }
}

/// Outline style for rectangles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: u32,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::default(),
            width: BOX_LINE_WIDTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    /// Font size in pixels.
    pub size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::default(),
            size: LABEL_FONT_SIZE,
        }
    }
}

/// A 2D raster the overlay is drawn onto, read back for screenshots.
pub trait DrawSurface: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resizes and clears the surface.
    fn resize(&mut self, width: u32, height: u32);

    /// Erases everything to full transparency.
    fn clear(&mut self);

    /// Outlines the rectangle spanned by two corners.
    fn draw_rect(&mut self, top_left: Point, bottom_right: Point, stroke: &Stroke);

    /// Draws `text` with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle);

    /// Current contents as an RGBA frame.
    fn snapshot(&self) -> Frame;
}

pub type SharedDrawSurface = Arc<Mutex<dyn DrawSurface>>;
