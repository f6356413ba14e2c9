//! Backend selection policy and transparent fallback.

use crate::backend::{Backend, CpuBackend, GradeBackend};
use crate::ComputeResult;
use gview_core::{EnhanceSettings, PixelBuffer};
use gview_lut::Lut3d;
use tracing::{debug, warn};

/// Pixel count above which the GPU path is worth the transfer cost
/// (512 x 512).
pub const GPU_PIXEL_THRESHOLD: usize = 262_144;

/// Routes grade requests to a backend.
///
/// - `Backend::Cpu` always runs on the CPU.
/// - `Backend::Wgpu` prefers the GPU regardless of image size.
/// - `Backend::Auto` uses the GPU only when it is available and the image
///   exceeds the pixel threshold.
///
/// Any GPU failure is logged and retried on the CPU; callers always get a
/// result when the CPU path succeeds.
pub struct Dispatcher {
    requested: Backend,
    cpu: CpuBackend,
    gpu_threshold: usize,
}

impl Dispatcher {
    /// Creates a dispatcher with the given backend preference.
    pub fn new(requested: Backend) -> Self {
        Self {
            requested,
            cpu: CpuBackend::new(),
            gpu_threshold: GPU_PIXEL_THRESHOLD,
        }
    }

    /// Overrides the pixel threshold for `Backend::Auto`.
    pub fn with_gpu_threshold(mut self, pixels: usize) -> Self {
        self.gpu_threshold = pixels;
        self
    }

    /// Requested backend preference.
    pub fn requested(&self) -> Backend {
        self.requested
    }

    /// Whether a grade of `pixels` pixels would try the GPU first.
    pub fn wants_gpu(&self, pixels: usize) -> bool {
        match self.requested {
            Backend::Cpu => false,
            Backend::Wgpu => Backend::Wgpu.is_available(),
            Backend::Auto => Backend::Wgpu.is_available() && pixels > self.gpu_threshold,
        }
    }

    /// Grades `img`, routing to GPU or CPU per policy.
    pub fn grade(
        &self,
        img: &PixelBuffer,
        settings: &EnhanceSettings,
        lut: Option<&Lut3d>,
    ) -> ComputeResult<PixelBuffer> {
        #[cfg(feature = "wgpu")]
        if self.wants_gpu(img.pixel_count()) {
            let gpu = crate::backend::WgpuBackend::new();
            match gpu.grade(img, settings, lut) {
                Ok(out) => {
                    debug!(pixels = img.pixel_count(), "graded on wgpu");
                    return Ok(out);
                }
                Err(e) => {
                    warn!(error = %e, "GPU grade failed, falling back to CPU");
                }
            }
        }

        self.cpu.grade(img, settings, lut)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Backend::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cpu_never_wants_gpu() {
        let d = Dispatcher::new(Backend::Cpu);
        assert!(!d.wants_gpu(usize::MAX));
    }

    #[test]
    fn test_auto_respects_threshold() {
        let d = Dispatcher::new(Backend::Auto).with_gpu_threshold(100);
        // Below threshold the CPU handles it regardless of GPU presence
        assert!(!d.wants_gpu(100));
    }

    #[test]
    fn test_grade_delivers_result_on_any_policy() {
        let img = PixelBuffer::filled(32, 32, [0.5, 0.5, 0.5]);
        let settings = EnhanceSettings::default().with_gamma(2.0);
        for backend in [Backend::Auto, Backend::Cpu, Backend::Wgpu] {
            let out = Dispatcher::new(backend).grade(&img, &settings, None).unwrap();
            assert_abs_diff_eq!(out.data()[0], 0.25, epsilon = 1e-6);
        }
    }
}
