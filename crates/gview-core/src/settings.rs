//! Grading settings and orientation types.

/// Contrast/gamma bounds.
pub(crate) const TONE_MIN: f32 = 0.1;
pub(crate) const TONE_MAX: f32 = 10.0;

/// Quarter-turn clockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise.
    Cw270,
}

impl Rotation {
    /// Number of clockwise quarter turns (0-3).
    pub fn quarter_turns(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Rotation from a quarter-turn count (wraps).
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            3 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    /// Next rotation clockwise.
    pub fn rotated_cw(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }

    /// Whether this rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Tone and LUT grading parameters.
///
/// All constructors clamp to the supported ranges: contrast and gamma to
/// [0.1, 10.0], LUT strength to [0.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceSettings {
    /// Contrast factor around mid-gray (1.0 = neutral).
    pub contrast: f32,
    /// Gamma exponent (1.0 = neutral).
    pub gamma: f32,
    /// Grayscale blend toward Rec.709 luma, 0.0 (color) to 1.0 (full luma).
    pub grayscale: f32,
    /// Selected LUT name, or `None` for no LUT stage.
    pub lut: Option<String>,
    /// LUT blend strength, 0.0 (original) to 1.0 (fully graded).
    pub lut_strength: f32,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            gamma: 1.0,
            grayscale: 0.0,
            lut: None,
            lut_strength: 1.0,
        }
    }
}

impl EnhanceSettings {
    /// Set contrast, clamped to [0.1, 10.0].
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast.clamp(TONE_MIN, TONE_MAX);
        self
    }

    /// Set gamma, clamped to [0.1, 10.0].
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma.clamp(TONE_MIN, TONE_MAX);
        self
    }

    /// Set grayscale blend, clamped to [0.0, 1.0].
    pub fn with_grayscale(mut self, grayscale: f32) -> Self {
        self.grayscale = grayscale.clamp(0.0, 1.0);
        self
    }

    /// Select a LUT by name.
    pub fn with_lut(mut self, name: impl Into<String>) -> Self {
        self.lut = Some(name.into());
        self
    }

    /// Clear the LUT selection.
    pub fn without_lut(mut self) -> Self {
        self.lut = None;
        self
    }

    /// Set LUT strength, clamped to [0.0, 1.0].
    pub fn with_lut_strength(mut self, strength: f32) -> Self {
        self.lut_strength = strength.clamp(0.0, 1.0);
        self
    }

    /// True when the settings leave pixels unchanged.
    pub fn is_identity(&self) -> bool {
        self.contrast == 1.0
            && self.gamma == 1.0
            && self.grayscale == 0.0
            && (self.lut.is_none() || self.lut_strength == 0.0)
    }
}
