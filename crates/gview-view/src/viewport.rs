//! Viewport composition and annotation rasterization.
//!
//! The display transform composes fit-to-viewport scaling with the user's
//! zoom, centers the result, and adds pan. Lines are drawn with Bresenham
//! segments and a square brush.

use crate::annotations::{AnnotationSet, Line, ViewTransform};
use crate::cache::Viewport;
use gview_core::{PixelBuffer, Rotation};

/// Scale that fits a `w x h` image inside the viewport, preserving aspect.
pub fn fit_scale(w: f64, h: f64, viewport: Viewport) -> f64 {
    if w <= 0.0 || h <= 0.0 {
        return 1.0;
    }
    (viewport.width as f64 / w).min(viewport.height as f64 / h)
}

/// Builds the display transform for the current view state.
///
/// `zoom` multiplies the fit scale; `pan` shifts the centered image in
/// display pixels.
pub fn make_transform(
    rotation: Rotation,
    flip_h: bool,
    flip_v: bool,
    image_w: u32,
    image_h: u32,
    viewport: Viewport,
    zoom: f64,
    pan: (f64, f64),
) -> ViewTransform {
    let (w, h) = (image_w as f64, image_h as f64);
    let (rw, rh) = if rotation.swaps_axes() { (h, w) } else { (w, h) };
    let scale = fit_scale(rw, rh, viewport) * zoom;

    // Center the scaled image, then apply pan
    let offset = (
        (viewport.width as f64 - rw * scale) / 2.0 + pan.0,
        (viewport.height as f64 - rh * scale) / 2.0 + pan.1,
    );

    ViewTransform {
        rotation,
        flip_h,
        flip_v,
        image_w: w,
        image_h: h,
        scale,
        offset,
    }
}

/// Draws the annotation lines into `img` using `transform` to map canonical
/// points to pixels. Lines whose display bounding box, inflated by the
/// set's clip tolerance, falls outside the image are skipped entirely.
pub fn rasterize_lines(img: &mut PixelBuffer, set: &AnnotationSet, transform: &ViewTransform) {
    let (w, h) = img.dimensions();
    let tolerance = set.clip_tolerance();
    for line in set.lines() {
        if !line_in_view(line, transform, w, h, tolerance) {
            continue;
        }
        let color = [
            line.color[0] as f32 / 255.0,
            line.color[1] as f32 / 255.0,
            line.color[2] as f32 / 255.0,
        ];
        let radius = (line.thickness / 2) as i64;
        for pair in line.points.windows(2) {
            let a = transform.to_display(pair[0]);
            let b = transform.to_display(pair[1]);
            draw_segment(img, a, b, color, radius);
        }
        // Single-point lines still leave a dot
        if line.points.len() == 1 {
            let p = transform.to_display(line.points[0]);
            stamp(img, p.0.round() as i64, p.1.round() as i64, color, radius);
        }
    }
}

/// Tests the line's display-space bounding box, inflated by `tolerance`,
/// against the image bounds.
fn line_in_view(line: &Line, t: &ViewTransform, w: u32, h: u32, tolerance: f64) -> bool {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &p in &line.points {
        let (x, y) = t.to_display(p);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if !min_x.is_finite() {
        return false;
    }
    max_x + tolerance >= 0.0
        && max_y + tolerance >= 0.0
        && min_x - tolerance <= w as f64
        && min_y - tolerance <= h as f64
}

/// Bresenham segment between two display points.
fn draw_segment(img: &mut PixelBuffer, a: (f64, f64), b: (f64, f64), color: [f32; 3], radius: i64) {
    let (mut x0, mut y0) = (a.0.round() as i64, a.1.round() as i64);
    let (x1, y1) = (b.0.round() as i64, b.1.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(img, x0, y0, color, radius);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Square brush stamp, clipped to the image.
fn stamp(img: &mut PixelBuffer, cx: i64, cy: i64, color: [f32; 3], radius: i64) {
    let (w, h) = img.dimensions();
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                img.set_pixel(x as u32, y as u32, color);
            }
        }
    }
}
