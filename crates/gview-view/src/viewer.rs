//! Viewer facade: wires the LUT store, cache, annotations, and orchestrator
//! into one interactive pipeline.

use crate::annotations::{AnnotationSet, LineKind, ViewTransform};
use crate::cache::{GeomKey, RenderCache, RenderKey, SettingsKey, Viewport};
use crate::orchestrator::{FinalizedFrame, Orchestrator, PreviewFrame, RenderState};
use crate::viewport;
use crate::{ViewError, ViewResult};
use gview_compute::{geometry, Backend, Dispatcher};
use gview_core::{EnhanceSettings, PixelBuffer, Rotation};
use gview_lut::{Lut3d, LutStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Zoom bounds.
const ZOOM_MIN: f64 = 0.1;
const ZOOM_MAX: f64 = 10.0;
/// Multiplicative zoom step.
const ZOOM_STEP: f64 = 1.1;

/// Interactive grading viewer pipeline.
pub struct Viewer {
    image: Option<Arc<PixelBuffer>>,
    image_id: u64,
    luts: LutStore,
    lut_cache: Option<(String, Arc<Lut3d>)>,
    settings: EnhanceSettings,
    rotation: Rotation,
    flip_h: bool,
    flip_v: bool,
    zoom: f64,
    pan: (f64, f64),
    viewport: Viewport,
    annotations: AnnotationSet,
    stroke: Vec<(f64, f64)>,
    cache: RenderCache,
    backend: Backend,
    orchestrator: Orchestrator,
    // Cache key captured when a render is submitted; finalized frames are
    // stored under this snapshot, not the viewer's current state.
    pending_key: Option<(GeomKey, SettingsKey)>,
}

impl Viewer {
    /// Creates a viewer with the given viewport and auto backend selection.
    pub fn new(viewport_w: u32, viewport_h: u32) -> Self {
        Self::with_backend(viewport_w, viewport_h, Backend::Auto)
    }

    /// Creates a viewer with an explicit backend preference.
    pub fn with_backend(viewport_w: u32, viewport_h: u32, backend: Backend) -> Self {
        Self {
            image: None,
            image_id: 0,
            luts: LutStore::new(),
            lut_cache: None,
            settings: EnhanceSettings::default(),
            rotation: Rotation::None,
            flip_h: false,
            flip_v: false,
            zoom: 1.0,
            pan: (0.0, 0.0),
            viewport: Viewport {
                width: viewport_w,
                height: viewport_h,
            },
            annotations: AnnotationSet::new(),
            stroke: Vec::new(),
            cache: RenderCache::new(),
            backend,
            orchestrator: Orchestrator::new(Dispatcher::new(backend)),
            pending_key: None,
        }
    }

    /// Backend preference this viewer was built with.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Loads an image, resetting orientation, zoom, pan, and annotations.
    pub fn load_image(&mut self, image: PixelBuffer) {
        self.cache.invalidate_image(self.image_id);
        self.image_id += 1;
        self.image = Some(Arc::new(image));
        self.rotation = Rotation::None;
        self.flip_h = false;
        self.flip_v = false;
        self.zoom = 1.0;
        self.pan = (0.0, 0.0);
        self.annotations.clear();
        self.stroke.clear();
        self.pending_key = None;
        debug!(image_id = self.image_id, "image loaded");
    }

    /// Loads every `.cube` LUT in `folder`. Returns the number loaded.
    pub fn load_lut_folder<P: AsRef<Path>>(&mut self, folder: P) -> ViewResult<usize> {
        Ok(self.luts.scan_folder(folder)?)
    }

    /// Sorted LUT names available for selection.
    pub fn list_luts(&self) -> Vec<&str> {
        self.luts.names()
    }

    // =========================================================================
    // View state
    // =========================================================================

    /// Replaces the grade settings.
    ///
    /// Fails when the settings select a LUT the store does not have.
    pub fn set_settings(&mut self, settings: EnhanceSettings) -> ViewResult<()> {
        if let Some(name) = &settings.lut {
            if self.luts.get(name).is_none() {
                return Err(ViewError::UnknownLut(name.clone()));
            }
        }
        self.settings = settings;
        Ok(())
    }

    /// Current grade settings.
    pub fn settings(&self) -> &EnhanceSettings {
        &self.settings
    }

    /// Rotates the view 90 degrees clockwise.
    pub fn rotate_cw(&mut self) {
        self.rotation = self.rotation.rotated_cw();
    }

    /// Sets the rotation directly.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Current rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Toggles the horizontal flip.
    pub fn toggle_flip_h(&mut self) {
        self.flip_h = !self.flip_h;
    }

    /// Toggles the vertical flip.
    pub fn toggle_flip_v(&mut self) {
        self.flip_v = !self.flip_v;
    }

    /// Sets both flips directly.
    pub fn set_flips(&mut self, flip_h: bool, flip_v: bool) {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
    }

    /// Zooms in one step.
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    /// Zooms out one step.
    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Sets zoom directly, clamped to [0.1, 10.0].
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the pan offset in display pixels.
    pub fn set_pan(&mut self, pan: (f64, f64)) {
        self.pan = pan;
    }

    /// Resizes the viewport.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport { width, height };
    }

    /// Current display transform, or `None` before an image is loaded.
    pub fn transform(&self) -> Option<ViewTransform> {
        let image = self.image.as_ref()?;
        let (w, h) = image.dimensions();
        Some(viewport::make_transform(
            self.rotation,
            self.flip_h,
            self.flip_v,
            w,
            h,
            self.viewport,
            self.zoom,
            self.pan,
        ))
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    /// Adds a free-hand line from canonical-space points.
    pub fn add_line(
        &mut self,
        kind: LineKind,
        points: Vec<(f64, f64)>,
        color: [u8; 3],
        thickness: u32,
    ) {
        self.annotations.add_line(kind, points, color, thickness);
    }

    /// Adds a full-width horizontal rule at canonical `y`.
    pub fn add_horizontal_line(&mut self, y: f64, color: [u8; 3], thickness: u32) {
        let w = self
            .image
            .as_ref()
            .map(|i| i.dimensions().0 as f64)
            .unwrap_or(0.0);
        self.annotations
            .add_line(LineKind::Horizontal, vec![(0.0, y), (w, y)], color, thickness);
    }

    /// Adds a full-height vertical rule at canonical `x`.
    pub fn add_vertical_line(&mut self, x: f64, color: [u8; 3], thickness: u32) {
        let h = self
            .image
            .as_ref()
            .map(|i| i.dimensions().1 as f64)
            .unwrap_or(0.0);
        self.annotations
            .add_line(LineKind::Vertical, vec![(x, 0.0), (x, h)], color, thickness);
    }

    /// Appends a display-space click to the in-progress free-hand stroke.
    ///
    /// The point is mapped through the inverse view transform, so the
    /// stroke is stored in canonical image coordinates.
    pub fn add_annotation_point(&mut self, display_point: (f64, f64)) -> ViewResult<()> {
        let t = self.transform().ok_or(ViewError::NoImage)?;
        self.stroke.push(t.to_canonical(display_point));
        Ok(())
    }

    /// Commits the in-progress stroke as a free-hand line.
    pub fn end_stroke(&mut self, color: [u8; 3], thickness: u32) {
        if !self.stroke.is_empty() {
            let points = std::mem::take(&mut self.stroke);
            self.annotations
                .add_line(LineKind::Free, points, color, thickness);
        }
    }

    /// Adds a full-height vertical rule at the clicked display position.
    pub fn add_vertical_line_at(
        &mut self,
        display_point: (f64, f64),
        color: [u8; 3],
        thickness: u32,
    ) -> ViewResult<()> {
        let t = self.transform().ok_or(ViewError::NoImage)?;
        let (x, _) = t.to_canonical(display_point);
        self.add_vertical_line(x, color, thickness);
        Ok(())
    }

    /// Adds a full-width horizontal rule at the clicked display position.
    pub fn add_horizontal_line_at(
        &mut self,
        display_point: (f64, f64),
        color: [u8; 3],
        thickness: u32,
    ) -> ViewResult<()> {
        let t = self.transform().ok_or(ViewError::NoImage)?;
        let (_, y) = t.to_canonical(display_point);
        self.add_horizontal_line(y, color, thickness);
        Ok(())
    }

    /// Undoes the most recent line (free-hand before horizontal before
    /// vertical).
    pub fn undo_line(&mut self) -> bool {
        self.annotations.undo().is_some()
    }

    /// Removes all lines.
    pub fn clear_lines(&mut self) {
        self.annotations.clear();
    }

    /// Annotation set (read only).
    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    /// Hit-tests a display-space point against the lines.
    ///
    /// The clip tolerance is interpreted in display pixels and converted to
    /// canonical units through the current scale.
    pub fn hit_test(&self, display_point: (f64, f64)) -> Option<usize> {
        let t = self.transform()?;
        let canonical = t.to_canonical(display_point);
        let tolerance = self.annotations.clip_tolerance() / t.scale.max(f64::MIN_POSITIVE);
        self.annotations.hit_test(canonical, tolerance)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Requests a render of the current view.
    ///
    /// Geometry (rotation, flips, viewport fit) is composed first, reusing
    /// the geometry cache tier; the composed frame is graded synchronously
    /// for the preview while the full grade runs async. Fully-enhanced
    /// frames land in the enhanced tier via [`Self::poll_frame`].
    pub fn request_render(&mut self) -> ViewResult<PreviewFrame> {
        let base = self.composed_geometry()?;
        let lut = self.selected_lut()?;
        self.pending_key = Some((self.geom_key(), SettingsKey::from(&self.settings)));
        self.orchestrator
            .request_render(base, &self.settings, lut)
    }

    /// Non-blocking check for the finalized frame of the latest request.
    ///
    /// On completion the frame gets its annotations rasterized and is
    /// stored in the enhanced cache tier.
    pub fn poll_frame(&mut self) -> Option<FinalizedFrame> {
        let frame = self.orchestrator.poll()?;
        Some(self.finish_frame(frame))
    }

    /// Blocking variant of [`Self::poll_frame`].
    pub fn wait_frame(&mut self) -> Option<FinalizedFrame> {
        let frame = self.orchestrator.wait()?;
        Some(self.finish_frame(frame))
    }

    /// Rasterizes annotations onto a finalized frame and stores it under the
    /// key snapshotted at submit time. The rasterization transform also comes
    /// from the snapshot, since the frame was composed with that geometry;
    /// the annotation version is taken now, since the lines are drawn now.
    fn finish_frame(&mut self, mut frame: FinalizedFrame) -> FinalizedFrame {
        if let Some((geom, settings)) = self.pending_key.clone() {
            if let Some(t) = self.snapshot_transform(&geom, &frame.image) {
                viewport::rasterize_lines(&mut frame.image, &self.annotations, &t);
            }
            let key = RenderKey {
                geom,
                settings,
                annotations_version: self.annotations.version(),
            };
            self.cache.put_render(key, frame.image.clone());
        }
        frame
    }

    /// Cached enhanced frame for the current view state, if present.
    pub fn cached_frame(&mut self) -> Option<PixelBuffer> {
        let key = self.render_key()?;
        self.cache.get_render(&key).cloned()
    }

    /// Current render state.
    pub fn render_state(&self) -> RenderState {
        self.orchestrator.state()
    }

    /// Latest render generation.
    pub fn generation(&self) -> u64 {
        self.orchestrator.generation()
    }

    /// Renders the full-resolution composite: graded image at scale 1 with
    /// rotation, flips, and annotations applied.
    pub fn export_composite(&mut self) -> ViewResult<PixelBuffer> {
        let image = Arc::clone(self.image.as_ref().ok_or(ViewError::NoImage)?);
        let lut = self.selected_lut()?;

        let dispatcher = Dispatcher::new(self.backend);
        let graded = dispatcher.grade(&image, &self.settings, lut.as_deref())?;

        let mut out = geometry::rotate90(&graded, self.rotation.quarter_turns())?;
        if self.flip_h {
            geometry::flip_h(&mut out);
        }
        if self.flip_v {
            geometry::flip_v(&mut out);
        }

        let (w, h) = image.dimensions();
        let t = ViewTransform {
            rotation: self.rotation,
            flip_h: self.flip_h,
            flip_v: self.flip_v,
            image_w: w as f64,
            image_h: h as f64,
            scale: 1.0,
            offset: (0.0, 0.0),
        };
        viewport::rasterize_lines(&mut out, &self.annotations, &t);
        Ok(out)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn geom_key(&self) -> GeomKey {
        GeomKey {
            image_id: self.image_id,
            rotation: self.rotation,
            flip_h: self.flip_h,
            flip_v: self.flip_v,
            viewport: self.viewport,
            zoom_bits: self.zoom.to_bits(),
        }
    }

    fn render_key(&self) -> Option<RenderKey> {
        self.image.as_ref()?;
        Some(RenderKey {
            geom: self.geom_key(),
            settings: SettingsKey::from(&self.settings),
            annotations_version: self.annotations.version(),
        })
    }

    fn selected_lut(&mut self) -> ViewResult<Option<Arc<Lut3d>>> {
        let Some(name) = self.settings.lut.clone() else {
            self.lut_cache = None;
            return Ok(None);
        };
        if let Some((cached_name, lut)) = &self.lut_cache {
            if *cached_name == name {
                return Ok(Some(Arc::clone(lut)));
            }
        }
        let lut = self
            .luts
            .get(&name)
            .ok_or_else(|| ViewError::UnknownLut(name.clone()))?;
        let lut = Arc::new(lut.clone());
        self.lut_cache = Some((name, Arc::clone(&lut)));
        Ok(Some(lut))
    }

    /// Rotated, flipped, viewport-scaled source pixels, via the geometry
    /// cache tier.
    fn composed_geometry(&mut self) -> ViewResult<Arc<PixelBuffer>> {
        let image = self.image.as_ref().ok_or(ViewError::NoImage)?;
        let key = self.geom_key();
        if let Some(frame) = self.cache.get_geom(&key) {
            return Ok(Arc::new(frame.clone()));
        }

        let mut composed = geometry::rotate90(image, self.rotation.quarter_turns())?;
        if self.flip_h {
            geometry::flip_h(&mut composed);
        }
        if self.flip_v {
            geometry::flip_v(&mut composed);
        }

        let (rw, rh) = composed.dimensions();
        let scale = viewport::fit_scale(rw as f64, rh as f64, self.viewport) * self.zoom;
        let dw = ((rw as f64 * scale).round() as u32).max(1);
        let dh = ((rh as f64 * scale).round() as u32).max(1);
        let composed = geometry::resize_bilinear(&composed, dw, dh)?;

        self.cache.put_geom(key, composed.clone());
        Ok(Arc::new(composed))
    }

    /// Transform mapping canonical points onto a composed frame (no
    /// centering offset; the frame is exactly the scaled image). Geometry
    /// comes from the submit-time key, not the viewer's current state.
    fn snapshot_transform(&self, geom: &GeomKey, frame: &PixelBuffer) -> Option<ViewTransform> {
        if geom.image_id != self.image_id {
            return None;
        }
        let image = self.image.as_ref()?;
        let (w, h) = image.dimensions();
        let rw = if geom.rotation.swaps_axes() { h } else { w };
        let scale = frame.dimensions().0 as f64 / rw.max(1) as f64;
        Some(ViewTransform {
            rotation: geom.rotation,
            flip_h: geom.flip_h,
            flip_v: geom.flip_v,
            image_w: w as f64,
            image_h: h as f64,
            scale,
            offset: (0.0, 0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    fn viewer_with_image(w: u32, h: u32) -> Viewer {
        let mut v = Viewer::with_backend(w, h, Backend::Cpu);
        v.load_image(PixelBuffer::filled(w, h, [0.5, 0.5, 0.5]));
        v
    }

    #[test]
    fn test_render_without_image_fails() {
        let mut v = Viewer::new(100, 100);
        assert!(matches!(v.request_render(), Err(ViewError::NoImage)));
    }

    #[test]
    fn test_preview_then_finalize() {
        let mut v = viewer_with_image(64, 64);
        v.set_settings(EnhanceSettings::default().with_gamma(2.0))
            .unwrap();
        let preview = v.request_render().unwrap();
        assert_eq!(preview.generation, 1);
        assert_abs_diff_eq!(preview.image.data()[0], 0.25, epsilon = 1e-6);

        let frame = v.wait_frame().expect("finalized frame");
        assert_eq!(frame.generation, 1);
        assert_eq!(frame.image.dimensions(), (64, 64));
    }

    #[test]
    fn test_finalized_frame_lands_in_cache() {
        let mut v = viewer_with_image(32, 32);
        v.request_render().unwrap();
        v.wait_frame().unwrap();
        assert!(v.cached_frame().is_some());

        // Any settings change misses the cache
        v.set_settings(EnhanceSettings::default().with_contrast(2.0))
            .unwrap();
        assert!(v.cached_frame().is_none());
    }

    #[test]
    fn test_finalized_frame_keyed_by_submit_settings() {
        let mut v = viewer_with_image(32, 32);
        v.request_render().unwrap();
        // Settings change while the finalize is in flight
        v.set_settings(EnhanceSettings::default().with_gamma(2.0))
            .unwrap();
        let frame = v.wait_frame().expect("finalize");
        // The frame was graded with the submit-time settings (gamma 1.0)
        assert_abs_diff_eq!(frame.image.data()[0], 0.5, epsilon = 1e-6);
        // So the current (gamma 2.0) key must not hit it
        assert!(v.cached_frame().is_none());
        // Restoring the submit-time settings does
        v.set_settings(EnhanceSettings::default()).unwrap();
        let cached = v.cached_frame().expect("cache hit");
        assert_abs_diff_eq!(cached.data()[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_annotation_edit_invalidates_cached_frame() {
        let mut v = viewer_with_image(32, 32);
        v.request_render().unwrap();
        v.wait_frame().unwrap();
        assert!(v.cached_frame().is_some());
        v.add_vertical_line(10.0, [255, 0, 0], 1);
        assert!(v.cached_frame().is_none());
    }

    #[test]
    fn test_unknown_lut_rejected() {
        let mut v = viewer_with_image(8, 8);
        let r = v.set_settings(EnhanceSettings::default().with_lut("missing"));
        assert!(matches!(r, Err(ViewError::UnknownLut(_))));
    }

    #[test]
    fn test_lut_folder_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("ident.cube")).unwrap();
        writeln!(f, "LUT_3D_SIZE 2").unwrap();
        for b in 0..2 {
            for g in 0..2 {
                for r in 0..2 {
                    writeln!(f, "{r}.0 {g}.0 {b}.0").unwrap();
                }
            }
        }
        drop(f);

        let mut v = viewer_with_image(16, 16);
        assert_eq!(v.load_lut_folder(dir.path()).unwrap(), 1);
        assert_eq!(v.list_luts(), vec!["ident"]);
        v.set_settings(EnhanceSettings::default().with_lut("ident"))
            .unwrap();
        let preview = v.request_render().unwrap();
        // Identity LUT leaves mid-gray unchanged
        assert_abs_diff_eq!(preview.image.data()[0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut v = viewer_with_image(8, 8);
        v.set_zoom(100.0);
        assert_eq!(v.zoom(), 10.0);
        v.set_zoom(0.0);
        assert_eq!(v.zoom(), 0.1);
        v.set_zoom(1.0);
        v.zoom_in();
        assert_abs_diff_eq!(v.zoom(), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_newer_generation_supersedes() {
        let mut v = viewer_with_image(32, 32);
        v.request_render().unwrap();
        v.set_settings(EnhanceSettings::default().with_gamma(0.5))
            .unwrap();
        v.request_render().unwrap();
        assert_eq!(v.generation(), 2);
        let frame = v.wait_frame().expect("finalize");
        assert_eq!(frame.generation, 2);
    }

    #[test]
    fn test_export_composite_draws_annotations() {
        let mut v = viewer_with_image(20, 20);
        v.add_vertical_line(5.0, [255, 0, 0], 1);
        let out = v.export_composite().unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.pixel(5, 10), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_export_composite_respects_rotation() {
        let mut v = Viewer::with_backend(100, 100, Backend::Cpu);
        v.load_image(PixelBuffer::filled(40, 30, [0.5, 0.5, 0.5]));
        v.rotate_cw();
        let out = v.export_composite().unwrap();
        assert_eq!(out.dimensions(), (30, 40));
    }

    #[test]
    fn test_display_clicks_map_to_canonical_points() {
        let mut v = Viewer::with_backend(300, 400, Backend::Cpu);
        v.load_image(PixelBuffer::filled(400, 300, [0.5, 0.5, 0.5]));
        // 400x300 rotated 90 fits the 300x400 viewport at scale 1
        v.rotate_cw();

        v.add_annotation_point((250.0, 100.0)).unwrap();
        v.add_annotation_point((250.0, 200.0)).unwrap();
        v.end_stroke([255, 255, 0], 2);
        let line = &v.annotations().lines()[0];
        assert_eq!(line.kind, LineKind::Free);
        assert_eq!(line.points[0], (100.0, 50.0));
        assert_eq!(line.points[1], (200.0, 50.0));

        v.add_vertical_line_at((250.0, 10.0), [255, 0, 0], 1).unwrap();
        let rule = &v.annotations().lines()[1];
        assert_eq!(rule.kind, LineKind::Vertical);
        assert_eq!(rule.points[0].0, 10.0);
    }

    #[test]
    fn test_annotation_point_without_image_fails() {
        let mut v = Viewer::new(100, 100);
        assert!(matches!(
            v.add_annotation_point((10.0, 10.0)),
            Err(ViewError::NoImage)
        ));
    }

    #[test]
    fn test_export_composite_with_lut_uses_configured_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("ident.cube")).unwrap();
        writeln!(f, "LUT_3D_SIZE 2").unwrap();
        for b in 0..2 {
            for g in 0..2 {
                for r in 0..2 {
                    writeln!(f, "{r}.0 {g}.0 {b}.0").unwrap();
                }
            }
        }
        drop(f);

        let mut v = viewer_with_image(16, 16);
        assert_eq!(v.backend(), Backend::Cpu);
        v.load_lut_folder(dir.path()).unwrap();
        v.set_settings(EnhanceSettings::default().with_lut("ident"))
            .unwrap();
        let out = v.export_composite().unwrap();
        assert_abs_diff_eq!(out.data()[0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_hit_test_in_display_space() {
        let mut v = Viewer::with_backend(400, 300, Backend::Cpu);
        v.load_image(PixelBuffer::filled(400, 300, [0.5, 0.5, 0.5]));
        v.add_vertical_line(100.0, [255, 0, 0], 1);
        // Image fills the viewport at scale 1, so display == canonical
        assert_eq!(v.hit_test((105.0, 150.0)), Some(0));
        assert_eq!(v.hit_test((150.0, 150.0)), None);
    }
}
