use ndarray::ArrayView3;

/// A single camera frame or overlay snapshot: contiguous bytes in row-major
/// order, 3 channels (RGB) or 4 channels (RGBA).
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True when the frame carries at least one pixel.
    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Converts to an RGBA buffer, treating RGB input as fully opaque.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        match self.channels {
            4 => image::RgbaImage::from_raw(self.width, self.height, self.data.clone()),
            3 => image::RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(|rgb| image::DynamicImage::ImageRgb8(rgb).into_rgba8()),
            _ => None,
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
