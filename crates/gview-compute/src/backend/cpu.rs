//! CPU grading backend.
//!
//! Rayon-parallel map of the pure grade function over pixel triples. This
//! is the numerical reference for the GPU path.

use super::GradeBackend;
use crate::grade::{GradeParams, grade_pixel};
use crate::ComputeResult;
use gview_core::{EnhanceSettings, PixelBuffer};
use gview_lut::Lut3d;
use rayon::prelude::*;

/// CPU backend. Always available.
#[derive(Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    /// Creates a new CPU backend.
    pub fn new() -> Self {
        Self
    }
}

impl GradeBackend for CpuBackend {
    fn grade(
        &self,
        img: &PixelBuffer,
        settings: &EnhanceSettings,
        lut: Option<&Lut3d>,
    ) -> ComputeResult<PixelBuffer> {
        let params = GradeParams::from(settings);
        let mut out = img.clone();

        out.data_mut()
            .par_chunks_mut(PixelBuffer::CHANNELS)
            .for_each(|px| {
                let graded = grade_pixel([px[0], px[1], px[2]], &params, lut);
                px.copy_from_slice(&graded);
            });

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_settings_leave_buffer_unchanged() {
        let img = PixelBuffer::filled(16, 16, [0.3, 0.6, 0.9]);
        let out = CpuBackend::new()
            .grade(&img, &EnhanceSettings::default(), None)
            .unwrap();
        assert_eq!(out.data(), img.data());
    }

    #[test]
    fn test_identity_lut_on_mid_gray() {
        let img = PixelBuffer::filled(64, 64, [0.5, 0.5, 0.5]);
        let lut = Lut3d::identity(16);
        let settings = EnhanceSettings::default()
            .with_lut("ident")
            .with_lut_strength(1.0);
        let out = CpuBackend::new().grade(&img, &settings, Some(&lut)).unwrap();
        for &v in out.data() {
            assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_grade_matches_pure_function() {
        let mut img = PixelBuffer::new(3, 1);
        img.set_pixel(0, 0, [0.1, 0.2, 0.3]);
        img.set_pixel(1, 0, [0.4, 0.5, 0.6]);
        img.set_pixel(2, 0, [0.7, 0.8, 0.9]);

        let settings = EnhanceSettings::default()
            .with_contrast(1.5)
            .with_gamma(2.2)
            .with_grayscale(1.0);
        let params = GradeParams::from(&settings);
        let out = CpuBackend::new().grade(&img, &settings, None).unwrap();

        for x in 0..3 {
            let expected = grade_pixel(img.pixel(x, 0), &params, None);
            assert_eq!(out.pixel(x, 0), expected);
        }
    }
}
