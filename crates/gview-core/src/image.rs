//! Flat RGB pixel storage.

use crate::{CoreError, CoreResult};

/// RGB image stored as flat f32 triples, row-major, values nominally [0, 1].
#[derive(Clone)]
pub struct PixelBuffer {
    /// Raw pixel data, `width * height * 3` floats.
    pub(crate) data: Vec<f32>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelBuffer {
    /// Channels per pixel. The pipeline is RGB-only.
    pub const CHANNELS: usize = 3;

    /// Create an image filled with zeros.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * Self::CHANNELS;
        Self {
            data: vec![0.0; size],
            width,
            height,
        }
    }

    /// Create from existing f32 data.
    pub fn from_vec(data: Vec<f32>, width: u32, height: u32) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions(width, height));
        }
        let expected = (width as usize) * (height as usize) * Self::CHANNELS;
        if data.len() != expected {
            return Err(CoreError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Create an image with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * Self::CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self { data, width, height }
    }

    /// Get pixel data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the buffer, returning the raw data.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Image dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * 4
    }

    /// Read one pixel. Caller must keep `x < width`, `y < height`.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write one pixel. Caller must keep `x < width`, `y < height`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [f32; 3]) {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * Self::CHANNELS;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}
