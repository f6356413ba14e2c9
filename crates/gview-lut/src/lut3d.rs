//! 3-dimensional lookup table with flat f32 storage.

use crate::{ParseError, ParseResult};

/// A 3D LUT mapping RGB input to RGB output through a cube of grid points.
///
/// # Structure
///
/// - `size^3` grid points, 3 floats each, `3 * size^3` floats total
/// - Flat index of grid point `(r, g, b)`: `r + g*size + b*size*size`
///   (red varies fastest, matching `.cube` file order)
/// - Trilinear interpolation for lookup
///
/// # Example
///
/// ```rust
/// use gview_lut::Lut3d;
///
/// let lut = Lut3d::identity(33);
/// let out = lut.sample([0.5, 0.3, 0.2]);
/// ```
#[derive(Debug, Clone)]
pub struct Lut3d {
    /// Flat RGB triples in red-fastest order.
    data: Vec<f32>,
    /// Cube edge length (typically 17, 33, or 65).
    size: usize,
}

impl Lut3d {
    /// Creates an identity (pass-through) LUT.
    pub fn identity(size: usize) -> Self {
        let mut data = Vec::with_capacity(size * size * size * 3);
        let n = (size - 1) as f32;
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push(r as f32 / n);
                    data.push(g as f32 / n);
                    data.push(b as f32 / n);
                }
            }
        }
        Self { data, size }
    }

    /// Creates a LUT from raw data in red-fastest order.
    ///
    /// `data` must hold exactly `3 * size^3` floats.
    pub fn from_data(data: Vec<f32>, size: usize) -> ParseResult<Self> {
        let expected = size * size * size * 3;
        if data.len() != expected {
            return Err(ParseError::RowCountMismatch {
                expected: size * size * size,
                found: data.len() / 3,
            });
        }
        Ok(Self { data, size })
    }

    /// Cube edge length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Raw flat data, `3 * size^3` floats in red-fastest order.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Flat index of grid point (r, g, b), red fastest.
    #[inline]
    fn index(&self, r: usize, g: usize, b: usize) -> usize {
        (r + g * self.size + b * self.size * self.size) * 3
    }

    /// Value at grid point (r, g, b).
    #[inline]
    fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let i = self.index(r, g, b);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Samples the LUT with trilinear interpolation.
    ///
    /// Input is clamped to [0, 1] per channel.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let r = rgb[0].clamp(0.0, 1.0);
        let g = rgb[1].clamp(0.0, 1.0);
        let b = rgb[2].clamp(0.0, 1.0);
        let n = (self.size - 1) as f32;

        // Grid coordinates, clamped so the +1 corner stays in range
        let ri = ((r * n).floor() as usize).min(self.size - 2);
        let gi = ((g * n).floor() as usize).min(self.size - 2);
        let bi = ((b * n).floor() as usize).min(self.size - 2);

        // Fractional parts
        let rf = r * n - ri as f32;
        let gf = g * n - gi as f32;
        let bf = b * n - bi as f32;

        // 8 corner values
        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        for ch in 0..3 {
            // Interpolate along R, then G, then B
            let c00 = c000[ch] + (c100[ch] - c000[ch]) * rf;
            let c10 = c010[ch] + (c110[ch] - c010[ch]) * rf;
            let c01 = c001[ch] + (c101[ch] - c001[ch]) * rf;
            let c11 = c011[ch] + (c111[ch] - c011[ch]) * rf;
            let c0 = c00 + (c10 - c00) * gf;
            let c1 = c01 + (c11 - c01) * gf;
            out[ch] = c0 + (c1 - c0) * bf;
        }
        out
    }
}
