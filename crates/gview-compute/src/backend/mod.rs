//! Grading backend abstraction.
//!
//! - [`CpuBackend`] - rayon-parallel reference implementation, always available
//! - [`WgpuBackend`] - GPU via wgpu (feature `wgpu`)
//!
//! Backends are selected by priority through [`select_best_backend`], or per
//! request by the [`Dispatcher`](crate::Dispatcher).

mod cpu;
mod detect;
#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
pub use detect::{BackendInfo, detect_backends, select_best_backend};
#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;

use crate::ComputeResult;
use gview_core::{EnhanceSettings, PixelBuffer};
use gview_lut::Lut3d;

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Auto-select best available backend per request.
    #[default]
    Auto,
    /// CPU with rayon parallelization.
    Cpu,
    /// GPU via wgpu (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Whether this backend can run in the current build and environment.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Auto | Backend::Cpu => true,
            Backend::Wgpu => {
                #[cfg(feature = "wgpu")]
                {
                    WgpuBackend::is_available()
                }
                #[cfg(not(feature = "wgpu"))]
                {
                    false
                }
            }
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "cpu" => Ok(Backend::Cpu),
            "wgpu" | "gpu" => Ok(Backend::Wgpu),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// A backend capable of running the full grade over a pixel buffer.
pub trait GradeBackend: Send + Sync {
    /// Grades `img` with `settings`, sampling `lut` when one is selected.
    fn grade(
        &self,
        img: &PixelBuffer,
        settings: &EnhanceSettings,
        lut: Option<&Lut3d>,
    ) -> ComputeResult<PixelBuffer>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("cpu".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("GPU".parse::<Backend>().unwrap(), Backend::Wgpu);
        assert_eq!("auto".parse::<Backend>().unwrap(), Backend::Auto);
        assert!("metal".parse::<Backend>().is_err());
    }

    #[test]
    fn test_cpu_always_available() {
        assert!(Backend::Cpu.is_available());
        assert!(Backend::Auto.is_available());
    }
}
