//! Folder-scoped collection of named LUTs.

use crate::{cube, Lut3d, ParseResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Named LUTs loaded from a folder.
///
/// Keys are file stems (`grade_a.cube` -> `grade_a`). "No LUT" is not an
/// entry here; it is the `None` case in the grading settings.
#[derive(Debug, Default)]
pub struct LutStore {
    luts: HashMap<String, Lut3d>,
}

impl LutStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.cube` file in `folder`, keyed by file stem.
    ///
    /// Files that fail to parse are logged and skipped. Returns the number
    /// of LUTs loaded. Only I/O errors on the folder itself are fatal.
    pub fn scan_folder<P: AsRef<Path>>(&mut self, folder: P) -> ParseResult<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(folder.as_ref())? {
            let entry = entry?;
            let path = entry.path();
            let is_cube = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("cube"));
            if !is_cube {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match cube::read(&path) {
                Ok(lut) => {
                    debug!(name = stem, size = lut.size(), "loaded LUT");
                    self.luts.insert(stem.to_string(), lut);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable LUT");
                }
            }
        }
        Ok(loaded)
    }

    /// Inserts a LUT under `name`, replacing any existing entry.
    pub fn insert(&mut self, name: impl Into<String>, lut: Lut3d) {
        self.luts.insert(name.into(), lut);
    }

    /// Looks up a LUT by name.
    pub fn get(&self, name: &str) -> Option<&Lut3d> {
        self.luts.get(name)
    }

    /// Sorted list of available LUT names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.luts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of loaded LUTs.
    pub fn len(&self) -> usize {
        self.luts.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }
}
