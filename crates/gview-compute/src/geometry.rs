//! Geometry primitives: quarter-turn rotation, flips, bilinear resize.

use crate::{ComputeError, ComputeResult};
use gview_core::PixelBuffer;
use rayon::prelude::*;

const C: usize = PixelBuffer::CHANNELS;

/// Rotates clockwise by `n` quarter turns.
pub fn rotate90(src: &PixelBuffer, n: u32) -> ComputeResult<PixelBuffer> {
    let (w, h) = src.dimensions();
    let n = n % 4;

    if n == 0 {
        return Ok(src.clone());
    }

    let (nw, nh) = if n % 2 == 1 { (h, w) } else { (w, h) };
    let mut dst = vec![0.0f32; (nw as usize) * (nh as usize) * C];
    let data = src.data();

    for sy in 0..h {
        for sx in 0..w {
            let (dx, dy) = match n {
                1 => (h - 1 - sy, sx),         // 90 CW
                2 => (w - 1 - sx, h - 1 - sy), // 180
                3 => (sy, w - 1 - sx),         // 270 CW
                _ => unreachable!(),
            };
            let src_idx = ((sy as usize) * (w as usize) + (sx as usize)) * C;
            let dst_idx = ((dy as usize) * (nw as usize) + (dx as usize)) * C;
            dst[dst_idx..dst_idx + C].copy_from_slice(&data[src_idx..src_idx + C]);
        }
    }

    Ok(PixelBuffer::from_vec(dst, nw, nh)?)
}

/// Flips horizontally (mirror around the vertical axis), in place.
pub fn flip_h(img: &mut PixelBuffer) {
    let (w, _h) = img.dimensions();
    let row_size = (w as usize) * C;

    img.data_mut().par_chunks_mut(row_size).for_each(|row| {
        for x in 0..(w / 2) as usize {
            for ch in 0..C {
                let left = x * C + ch;
                let right = (w as usize - 1 - x) * C + ch;
                row.swap(left, right);
            }
        }
    });
}

/// Flips vertically (mirror around the horizontal axis), in place.
pub fn flip_v(img: &mut PixelBuffer) {
    let (w, h) = img.dimensions();
    let row_size = (w as usize) * C;
    let data = img.data_mut();

    for y in 0..(h / 2) as usize {
        let top_start = y * row_size;
        let bot_start = (h as usize - 1 - y) * row_size;
        for i in 0..row_size {
            data.swap(top_start + i, bot_start + i);
        }
    }
}

/// Resizes with bilinear interpolation.
pub fn resize_bilinear(src: &PixelBuffer, dw: u32, dh: u32) -> ComputeResult<PixelBuffer> {
    let (sw, sh) = src.dimensions();
    if dw == 0 || dh == 0 {
        return Err(ComputeError::InvalidDimensions);
    }
    if (dw, dh) == (sw, sh) {
        return Ok(src.clone());
    }

    let sx = sw as f32 / dw as f32;
    let sy = sh as f32 / dh as f32;
    let mut out = vec![0.0f32; (dw as usize) * (dh as usize) * C];
    let data = src.data();

    out.par_chunks_mut((dw as usize) * C)
        .enumerate()
        .for_each(|(dy, row)| {
            for dx in 0..dw as usize {
                let fx = dx as f32 * sx;
                let fy = dy as f32 * sy;

                let x0 = (fx as usize).min(sw as usize - 1);
                let y0 = (fy as usize).min(sh as usize - 1);
                let x1 = (x0 + 1).min(sw as usize - 1);
                let y1 = (y0 + 1).min(sh as usize - 1);

                let fx = fx - x0 as f32;
                let fy = fy - y0 as f32;

                for ch in 0..C {
                    let idx = |x: usize, y: usize| -> f32 { data[(y * sw as usize + x) * C + ch] };

                    let c00 = idx(x0, y0);
                    let c10 = idx(x1, y0);
                    let c01 = idx(x0, y1);
                    let c11 = idx(x1, y1);

                    let top = c00 + fx * (c10 - c00);
                    let bot = c01 + fx * (c11 - c01);
                    row[dx * C + ch] = top + fy * (bot - top);
                }
            }
        });

    Ok(PixelBuffer::from_vec(out, dw, dh)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let mut img = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set_pixel(x, y, [x as f32, y as f32, 0.0]);
            }
        }
        img
    }

    #[test]
    fn test_rotate90_cw_maps_corners() {
        let img = gradient(4, 3);
        let rot = rotate90(&img, 1).unwrap();
        assert_eq!(rot.dimensions(), (3, 4));
        // Top-left of source lands in the top-right corner after 90 CW
        assert_eq!(rot.pixel(2, 0), [0.0, 0.0, 0.0]);
        // Bottom-left of source lands top-left
        assert_eq!(rot.pixel(0, 0), [0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_rotate_four_times_is_identity() {
        let img = gradient(5, 4);
        let a = rotate90(&rotate90(&img, 2).unwrap(), 2).unwrap();
        assert_eq!(a.data(), img.data());
        let mut b = img.clone();
        for _ in 0..4 {
            b = rotate90(&b, 1).unwrap();
        }
        assert_eq!(b.data(), img.data());
    }

    #[test]
    fn test_flip_h_mirrors() {
        let mut img = gradient(4, 2);
        flip_h(&mut img);
        assert_eq!(img.pixel(0, 0)[0], 3.0);
        assert_eq!(img.pixel(3, 0)[0], 0.0);
    }

    #[test]
    fn test_flip_v_mirrors() {
        let mut img = gradient(2, 4);
        flip_v(&mut img);
        assert_eq!(img.pixel(0, 0)[1], 3.0);
        assert_eq!(img.pixel(0, 3)[1], 0.0);
    }

    #[test]
    fn test_double_flip_is_identity() {
        let orig = gradient(5, 3);
        let mut img = orig.clone();
        flip_h(&mut img);
        flip_h(&mut img);
        assert_eq!(img.data(), orig.data());
    }

    #[test]
    fn test_buffer_size_error_carries_counts() {
        let err = PixelBuffer::from_vec(vec![0.0; 5], 2, 2).unwrap_err();
        let mapped = ComputeError::from(err);
        assert!(matches!(
            mapped,
            ComputeError::BufferSizeMismatch {
                expected: 12,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_resize_constant_image() {
        let img = PixelBuffer::filled(8, 8, [0.25, 0.5, 0.75]);
        let small = resize_bilinear(&img, 3, 3).unwrap();
        assert_eq!(small.dimensions(), (3, 3));
        for y in 0..3 {
            for x in 0..3 {
                let p = small.pixel(x, y);
                assert!((p[0] - 0.25).abs() < 1e-6);
                assert!((p[2] - 0.75).abs() < 1e-6);
            }
        }
    }
}
