//! Per-pixel grade math.
//!
//! Fixed stage order: contrast, gamma, grayscale, LUT blend. Values are
//! clamped to [0, 1] after every stage. This function is the single source
//! of truth; the CPU backend maps it over the buffer and the GPU shader
//! implements the same arithmetic.

use gview_core::EnhanceSettings;
use gview_lut::Lut3d;

/// Rec.709 luma weights.
pub const LUMA_R: f32 = 0.2126;
/// Rec.709 luma weights.
pub const LUMA_G: f32 = 0.7152;
/// Rec.709 luma weights.
pub const LUMA_B: f32 = 0.0722;

/// Tone parameters extracted from [`EnhanceSettings`].
///
/// The LUT itself travels separately so settings stay a plain value type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeParams {
    /// Contrast factor around mid-gray.
    pub contrast: f32,
    /// Gamma exponent.
    pub gamma: f32,
    /// Grayscale blend toward Rec.709 luma in [0, 1].
    pub grayscale: f32,
    /// LUT blend strength in [0, 1].
    pub lut_strength: f32,
}

impl From<&EnhanceSettings> for GradeParams {
    fn from(s: &EnhanceSettings) -> Self {
        Self {
            contrast: s.contrast,
            gamma: s.gamma,
            grayscale: s.grayscale,
            lut_strength: s.lut_strength,
        }
    }
}

/// Grades one RGB pixel.
pub fn grade_pixel(rgb: [f32; 3], params: &GradeParams, lut: Option<&Lut3d>) -> [f32; 3] {
    let mut v = rgb;

    // Contrast around mid-gray
    for ch in &mut v {
        *ch = ((*ch - 0.5) * params.contrast + 0.5).clamp(0.0, 1.0);
    }

    // Gamma
    if params.gamma != 1.0 {
        for ch in &mut v {
            *ch = ch.powf(params.gamma).clamp(0.0, 1.0);
        }
    }

    // Grayscale blend toward Rec.709 luma
    if params.grayscale > 0.0 {
        let luma = (LUMA_R * v[0] + LUMA_G * v[1] + LUMA_B * v[2]).clamp(0.0, 1.0);
        let t = params.grayscale;
        for ch in &mut v {
            *ch = (*ch * (1.0 - t) + luma * t).clamp(0.0, 1.0);
        }
    }

    // LUT blend
    if let Some(lut) = lut {
        if params.lut_strength > 0.0 {
            let sampled = lut.sample(v);
            let t = params.lut_strength;
            for ch in 0..3 {
                v[ch] = (v[ch] * (1.0 - t) + sampled[ch] * t).clamp(0.0, 1.0);
            }
        }
    }

    v
}
