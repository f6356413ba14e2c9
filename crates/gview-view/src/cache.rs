//! Two-tier LRU render cache.
//!
//! - geometry tier: rotated/flipped/viewport-fitted source pixels, keyed by
//!   orientation and viewport only
//! - enhanced tier: fully graded and annotated frames, keyed by orientation,
//!   every grade setting, viewport, and the annotation version stamp
//!
//! Keys embed everything that affects the output, so a stale entry can never
//! be served; it simply ages out under LRU pressure.

use gview_core::{EnhanceSettings, PixelBuffer, Rotation};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use tracing::trace;

/// Default byte budget per tier (256 MiB).
pub const DEFAULT_TIER_BUDGET: u64 = 256 * 1024 * 1024;

/// Display viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Key for the geometry tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeomKey {
    /// Identity of the loaded image.
    pub image_id: u64,
    /// Quarter-turn rotation.
    pub rotation: Rotation,
    /// Horizontal flip.
    pub flip_h: bool,
    /// Vertical flip.
    pub flip_v: bool,
    /// Target viewport.
    pub viewport: Viewport,
    /// Zoom factor bits (f64, hashed exactly).
    pub zoom_bits: u64,
}

/// Grade settings reduced to a hashable key. Float fields are compared by
/// bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingsKey {
    contrast_bits: u32,
    gamma_bits: u32,
    grayscale_bits: u32,
    lut: Option<String>,
    strength_bits: u32,
}

impl From<&EnhanceSettings> for SettingsKey {
    fn from(s: &EnhanceSettings) -> Self {
        Self {
            contrast_bits: s.contrast.to_bits(),
            gamma_bits: s.gamma.to_bits(),
            grayscale_bits: s.grayscale.to_bits(),
            lut: s.lut.clone(),
            strength_bits: s.lut_strength.to_bits(),
        }
    }
}

/// Key for the enhanced tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    /// Geometry portion.
    pub geom: GeomKey,
    /// Grade settings portion.
    pub settings: SettingsKey,
    /// Annotation version stamp at render time.
    pub annotations_version: u64,
}

struct Entry {
    frame: PixelBuffer,
    size_bytes: u64,
}

/// One LRU tier: map plus access order, evicted by byte budget.
struct LruTier<K: Eq + Hash + Clone> {
    entries: HashMap<K, Entry>,
    access_order: VecDeque<K>,
    total_bytes: u64,
    max_bytes: u64,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Clone> LruTier<K> {
    fn with_budget(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: VecDeque::new(),
            total_bytes: 0,
            max_bytes,
            hits: 0,
            misses: 0,
        }
    }

    fn get(&mut self, key: &K) -> Option<&PixelBuffer> {
        if self.entries.contains_key(key) {
            self.hits += 1;
            self.touch(key);
            self.entries.get(key).map(|e| &e.frame)
        } else {
            self.misses += 1;
            None
        }
    }

    fn insert(&mut self, key: K, frame: PixelBuffer) {
        let size_bytes = frame.size_bytes() as u64;
        while self.total_bytes + size_bytes > self.max_bytes && !self.entries.is_empty() {
            self.evict_lru();
        }
        if let Some(old) = self.entries.remove(&key) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
            self.access_order.retain(|k| k != &key);
        }
        self.entries.insert(key.clone(), Entry { frame, size_bytes });
        self.access_order.push_back(key);
        self.total_bytes += size_bytes;
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            if let Some(entry) = self.entries.remove(&key) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
                trace!(bytes = entry.size_bytes, "evicted LRU cache entry");
            }
        }
    }

    fn retain<F: Fn(&K) -> bool>(&mut self, keep: F) {
        let mut removed_bytes = 0;
        self.entries.retain(|k, e| {
            let keep = keep(k);
            if !keep {
                removed_bytes += e.size_bytes;
            }
            keep
        });
        self.access_order.retain(|k| self.entries.contains_key(k));
        self.total_bytes = self.total_bytes.saturating_sub(removed_bytes);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
        self.total_bytes = 0;
    }

    fn touch(&mut self, key: &K) {
        self.access_order.retain(|k| k != key);
        self.access_order.push_back(key.clone());
    }
}

/// Two-tier render cache.
pub struct RenderCache {
    geom: LruTier<GeomKey>,
    full: LruTier<RenderKey>,
}

impl RenderCache {
    /// Creates a cache with the default per-tier budget.
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_TIER_BUDGET)
    }

    /// Creates a cache with a specific per-tier byte budget.
    pub fn with_budget(max_bytes: u64) -> Self {
        Self {
            geom: LruTier::with_budget(max_bytes),
            full: LruTier::with_budget(max_bytes),
        }
    }

    /// Looks up a geometry-tier frame.
    pub fn get_geom(&mut self, key: &GeomKey) -> Option<&PixelBuffer> {
        self.geom.get(key)
    }

    /// Stores a geometry-tier frame.
    pub fn put_geom(&mut self, key: GeomKey, frame: PixelBuffer) {
        self.geom.insert(key, frame);
    }

    /// Looks up a fully-enhanced frame.
    pub fn get_render(&mut self, key: &RenderKey) -> Option<&PixelBuffer> {
        self.full.get(key)
    }

    /// Stores a fully-enhanced frame.
    pub fn put_render(&mut self, key: RenderKey, frame: PixelBuffer) {
        self.full.insert(key, frame);
    }

    /// Drops all entries for one image in both tiers.
    pub fn invalidate_image(&mut self, image_id: u64) {
        self.geom.retain(|k| k.image_id != image_id);
        self.full.retain(|k| k.geom.image_id != image_id);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.geom.clear();
        self.full.clear();
    }

    /// Hits across both tiers.
    pub fn hits(&self) -> u64 {
        self.geom.hits + self.full.hits
    }

    /// Misses across both tiers.
    pub fn misses(&self) -> u64 {
        self.geom.misses + self.full.misses
    }

    /// Hit ratio across both tiers (0.0 - 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom_key(image_id: u64) -> GeomKey {
        GeomKey {
            image_id,
            rotation: Rotation::None,
            flip_h: false,
            flip_v: false,
            viewport: Viewport { width: 100, height: 100 },
            zoom_bits: 1.0f64.to_bits(),
        }
    }

    fn render_key(image_id: u64, version: u64, settings: &EnhanceSettings) -> RenderKey {
        RenderKey {
            geom: geom_key(image_id),
            settings: SettingsKey::from(settings),
            annotations_version: version,
        }
    }

    #[test]
    fn test_insert_get_and_stats() {
        let mut cache = RenderCache::new();
        let key = geom_key(1);
        cache.put_geom(key.clone(), PixelBuffer::new(4, 4));
        assert!(cache.get_geom(&key).is_some());
        assert!(cache.get_geom(&geom_key(2)).is_none());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert!((cache.hit_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_settings_change_misses() {
        let mut cache = RenderCache::new();
        let a = EnhanceSettings::default();
        let b = EnhanceSettings::default().with_contrast(1.2);
        cache.put_render(render_key(1, 0, &a), PixelBuffer::new(4, 4));
        assert!(cache.get_render(&render_key(1, 0, &a)).is_some());
        assert!(cache.get_render(&render_key(1, 0, &b)).is_none());
    }

    #[test]
    fn test_annotation_version_orphans_entries() {
        let mut cache = RenderCache::new();
        let s = EnhanceSettings::default();
        cache.put_render(render_key(1, 0, &s), PixelBuffer::new(4, 4));
        // Bumped version yields a different key, old entry is unreachable
        assert!(cache.get_render(&render_key(1, 1, &s)).is_none());
    }

    #[test]
    fn test_lru_eviction_under_budget() {
        // Each 4x4 RGB frame is 192 bytes; budget fits two
        let mut cache = RenderCache::with_budget(400);
        cache.put_geom(geom_key(1), PixelBuffer::new(4, 4));
        cache.put_geom(geom_key(2), PixelBuffer::new(4, 4));
        // Touch 1 so 2 becomes oldest
        let _ = cache.get_geom(&geom_key(1));
        cache.put_geom(geom_key(3), PixelBuffer::new(4, 4));
        assert!(cache.get_geom(&geom_key(1)).is_some());
        assert!(cache.get_geom(&geom_key(2)).is_none());
        assert!(cache.get_geom(&geom_key(3)).is_some());
    }

    #[test]
    fn test_invalidate_image() {
        let mut cache = RenderCache::new();
        cache.put_geom(geom_key(1), PixelBuffer::new(4, 4));
        cache.put_geom(geom_key(2), PixelBuffer::new(4, 4));
        cache.invalidate_image(1);
        assert!(cache.get_geom(&geom_key(1)).is_none());
        assert!(cache.get_geom(&geom_key(2)).is_some());
    }
}
