//! Canonical-space annotations and the display mapping.
//!
//! Annotation points live in canonical coordinates: the un-rotated,
//! un-flipped image space, as f64. [`ViewTransform::to_display`] applies
//! rotation, then flip, then scale, then offset; [`ViewTransform::to_canonical`]
//! is the exact algebraic inverse applied in reverse order.

use gview_core::Rotation;
use tracing::debug;

/// Default hit-test tolerance in display pixels.
pub const DEFAULT_CLIP_TOLERANCE: f64 = 10.0;

/// Maximum line thickness.
pub const MAX_THICKNESS: u32 = 10;

/// Annotation line kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Free-hand polyline.
    Free,
    /// Full-width horizontal rule.
    Horizontal,
    /// Full-height vertical rule.
    Vertical,
}

/// A single annotation line in canonical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Kind of line.
    pub kind: LineKind,
    /// Polyline points, canonical space.
    pub points: Vec<(f64, f64)>,
    /// Draw color.
    pub color: [u8; 3],
    /// Stroke thickness in display pixels, 1..=10.
    pub thickness: u32,
}

/// The set of annotation lines plus a version stamp.
///
/// The version bumps on every mutation; render-cache keys embed it, so any
/// edit orphans previously cached frames.
#[derive(Debug, Default)]
pub struct AnnotationSet {
    lines: Vec<Line>,
    version: u64,
    clip_tolerance: f64,
}

impl AnnotationSet {
    /// Creates an empty set with the default clip tolerance.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            version: 0,
            clip_tolerance: DEFAULT_CLIP_TOLERANCE,
        }
    }

    /// Current version stamp.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All lines, oldest first.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Whether the set has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Hit-test tolerance in display pixels.
    pub fn clip_tolerance(&self) -> f64 {
        self.clip_tolerance
    }

    /// Overrides the hit-test tolerance.
    pub fn set_clip_tolerance(&mut self, tolerance: f64) {
        self.clip_tolerance = tolerance.max(0.0);
    }

    /// Adds a line. Thickness is clamped to 1..=10.
    pub fn add_line(
        &mut self,
        kind: LineKind,
        points: Vec<(f64, f64)>,
        color: [u8; 3],
        thickness: u32,
    ) {
        self.lines.push(Line {
            kind,
            points,
            color,
            thickness: thickness.clamp(1, MAX_THICKNESS),
        });
        self.version += 1;
    }

    /// Removes one line and returns it.
    ///
    /// When several kinds are present the most recent free-hand line goes
    /// first, then the most recent horizontal, then the most recent vertical.
    pub fn undo(&mut self) -> Option<Line> {
        for kind in [LineKind::Free, LineKind::Horizontal, LineKind::Vertical] {
            if let Some(pos) = self.lines.iter().rposition(|l| l.kind == kind) {
                let line = self.lines.remove(pos);
                self.version += 1;
                debug!(?kind, "undo removed line");
                return Some(line);
            }
        }
        None
    }

    /// Removes all lines.
    pub fn clear(&mut self) {
        if !self.lines.is_empty() {
            self.lines.clear();
            self.version += 1;
        }
    }

    /// Finds the topmost line whose inflated bounding box contains `p`
    /// (canonical space, tolerance in canonical units).
    pub fn hit_test(&self, p: (f64, f64), tolerance: f64) -> Option<usize> {
        for (i, line) in self.lines.iter().enumerate().rev() {
            let mut min_x = f64::INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            for &(x, y) in &line.points {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
            if p.0 >= min_x - tolerance
                && p.0 <= max_x + tolerance
                && p.1 >= min_y - tolerance
                && p.1 <= max_y + tolerance
            {
                return Some(i);
            }
        }
        None
    }
}

/// Mapping between canonical image space and display space.
///
/// Forward order: rotation, flip, scale, offset. Flips act on the rotated
/// dimensions, scale is fit-scale times zoom, offset is the centering
/// offset plus pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Quarter-turn rotation.
    pub rotation: Rotation,
    /// Horizontal flip (after rotation).
    pub flip_h: bool,
    /// Vertical flip (after rotation).
    pub flip_v: bool,
    /// Canonical image width.
    pub image_w: f64,
    /// Canonical image height.
    pub image_h: f64,
    /// Total scale (fit scale times zoom).
    pub scale: f64,
    /// Display-space offset applied last.
    pub offset: (f64, f64),
}

impl ViewTransform {
    /// Image dimensions after rotation.
    pub fn rotated_dims(&self) -> (f64, f64) {
        if self.rotation.swaps_axes() {
            (self.image_h, self.image_w)
        } else {
            (self.image_w, self.image_h)
        }
    }

    /// Maps a canonical point to display space.
    pub fn to_display(&self, p: (f64, f64)) -> (f64, f64) {
        let (x, y) = p;
        let (w, h) = (self.image_w, self.image_h);

        // Rotation (clockwise)
        let (mut rx, mut ry) = match self.rotation {
            Rotation::None => (x, y),
            Rotation::Cw90 => (h - y, x),
            Rotation::Cw180 => (w - x, h - y),
            Rotation::Cw270 => (y, w - x),
        };

        // Flips on the rotated dimensions
        let (rw, rh) = self.rotated_dims();
        if self.flip_h {
            rx = rw - rx;
        }
        if self.flip_v {
            ry = rh - ry;
        }

        (rx * self.scale + self.offset.0, ry * self.scale + self.offset.1)
    }

    /// Maps a display point back to canonical space. Exact inverse of
    /// [`Self::to_display`].
    pub fn to_canonical(&self, p: (f64, f64)) -> (f64, f64) {
        let mut rx = (p.0 - self.offset.0) / self.scale;
        let mut ry = (p.1 - self.offset.1) / self.scale;

        let (rw, rh) = self.rotated_dims();
        if self.flip_h {
            rx = rw - rx;
        }
        if self.flip_v {
            ry = rh - ry;
        }

        let (w, h) = (self.image_w, self.image_h);
        match self.rotation {
            Rotation::None => (rx, ry),
            Rotation::Cw90 => (ry, h - rx),
            Rotation::Cw180 => (w - rx, h - ry),
            Rotation::Cw270 => (w - ry, rx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn transform(rotation: Rotation, flip_h: bool, flip_v: bool, scale: f64) -> ViewTransform {
        ViewTransform {
            rotation,
            flip_h,
            flip_v,
            image_w: 400.0,
            image_h: 300.0,
            scale,
            offset: (0.0, 0.0),
        }
    }

    #[test]
    fn test_rotation_90_maps_vertical_line() {
        // A vertical line at x=100 on a 400x300 image becomes horizontal
        // after 90 CW; round-trip returns exactly x=100.
        let t = transform(Rotation::Cw90, false, false, 1.0);
        let p = (100.0, 50.0);
        let d = t.to_display(p);
        assert_eq!(d, (250.0, 100.0));
        assert_eq!(t.to_canonical(d), p);
    }

    #[test]
    fn test_all_orientations_round_trip_exactly() {
        let p = (123.0, 45.0);
        for rotation in [Rotation::None, Rotation::Cw90, Rotation::Cw180, Rotation::Cw270] {
            for flip_h in [false, true] {
                for flip_v in [false, true] {
                    // Power-of-two scale keeps the division exact
                    let t = transform(rotation, flip_h, flip_v, 2.0);
                    let back = t.to_canonical(t.to_display(p));
                    assert_eq!(back, p, "rotation {rotation:?} h={flip_h} v={flip_v}");
                }
            }
        }
    }

    #[test]
    fn test_round_trip_with_arbitrary_scale_and_pan() {
        let mut t = transform(Rotation::Cw270, true, false, 0.7362);
        t.offset = (13.5, -4.25);
        let p = (311.0, 17.0);
        let back = t.to_canonical(t.to_display(p));
        assert_abs_diff_eq!(back.0, p.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back.1, p.1, epsilon = 1e-9);
    }

    #[test]
    fn test_flip_applies_after_rotation() {
        // 90 CW maps (0,0) to (H,0) = (300,0); flip_h then mirrors across
        // the rotated width, landing at (0,0).
        let t = transform(Rotation::Cw90, true, false, 1.0);
        assert_eq!(t.to_display((0.0, 0.0)), (0.0, 0.0));
        // Without the flip it stays at (300,0)
        let t2 = transform(Rotation::Cw90, false, false, 1.0);
        assert_eq!(t2.to_display((0.0, 0.0)), (300.0, 0.0));
    }

    #[test]
    fn test_undo_priority() {
        let mut set = AnnotationSet::new();
        set.add_line(LineKind::Vertical, vec![(10.0, 0.0), (10.0, 100.0)], [255, 0, 0], 2);
        set.add_line(LineKind::Free, vec![(0.0, 0.0), (5.0, 5.0)], [0, 255, 0], 2);
        set.add_line(LineKind::Horizontal, vec![(0.0, 40.0), (100.0, 40.0)], [0, 0, 255], 2);
        set.add_line(LineKind::Free, vec![(1.0, 1.0), (2.0, 2.0)], [0, 255, 0], 2);

        // Free lines first (most recent free), then horizontal, then vertical
        assert_eq!(set.undo().map(|l| l.kind), Some(LineKind::Free));
        assert_eq!(set.undo().map(|l| l.points[0].0), Some(0.0));
        assert_eq!(set.undo().map(|l| l.kind), Some(LineKind::Horizontal));
        assert_eq!(set.undo().map(|l| l.kind), Some(LineKind::Vertical));
        assert!(set.undo().is_none());
    }

    #[test]
    fn test_version_bumps_on_every_mutation() {
        let mut set = AnnotationSet::new();
        assert_eq!(set.version(), 0);
        set.add_line(LineKind::Free, vec![(0.0, 0.0)], [0, 0, 0], 1);
        assert_eq!(set.version(), 1);
        set.undo();
        assert_eq!(set.version(), 2);
        set.clear(); // already empty, no bump
        assert_eq!(set.version(), 2);
        set.add_line(LineKind::Free, vec![(0.0, 0.0)], [0, 0, 0], 1);
        set.clear();
        assert_eq!(set.version(), 4);
    }

    #[test]
    fn test_thickness_clamped() {
        let mut set = AnnotationSet::new();
        set.add_line(LineKind::Free, vec![(0.0, 0.0)], [0, 0, 0], 99);
        assert_eq!(set.lines()[0].thickness, 10);
        set.add_line(LineKind::Free, vec![(0.0, 0.0)], [0, 0, 0], 0);
        assert_eq!(set.lines()[1].thickness, 1);
    }

    #[test]
    fn test_hit_test_uses_inflated_bbox() {
        let mut set = AnnotationSet::new();
        set.add_line(LineKind::Vertical, vec![(50.0, 0.0), (50.0, 100.0)], [0, 0, 0], 1);
        assert_eq!(set.hit_test((55.0, 50.0), 10.0), Some(0));
        assert_eq!(set.hit_test((65.0, 50.0), 10.0), None);
    }
}
