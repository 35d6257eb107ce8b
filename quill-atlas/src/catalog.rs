//! Font catalog — the startup configuration table of loaded atlases.
//!
//! Fonts are external data, not a compiled-in enumeration: the
//! application hands the catalog a list of [`FontSource`] entries
//! (typically deserialized from a config file) and gets back an
//! ordered, name-indexed set of loaded [`FontAtlas`]es. Loading is
//! all-or-nothing — the first failure aborts startup with its
//! [`LoadError`] and everything loaded so far is released on drop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use wgpu::{Device, Queue};

use crate::atlas::{FontAtlas, LoadError};

// ── Config entries ──────────────────────────────────────────────────

/// One catalog entry: a name plus the description/image pair to load.
#[derive(Clone, Debug, Deserialize)]
pub struct FontSource {
    pub name: String,
    /// Path to the structured atlas description (JSON).
    pub description: PathBuf,
    /// Path to the atlas raster image.
    pub image: PathBuf,
}

#[derive(Deserialize)]
struct CatalogConfig {
    fonts: Vec<FontSource>,
}

// ── Catalog ─────────────────────────────────────────────────────────

/// Ordered, name-indexed set of loaded font atlases.
///
/// Built once at startup, immutable during rendering. Atlases are
/// shared out as `Arc<FontAtlas>`; drop the catalog (after fencing the
/// device to idle) to release their textures.
#[derive(Default)]
pub struct FontCatalog {
    atlases: Vec<Arc<FontAtlas>>,
    names: HashMap<String, usize>,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog config of the form
    /// `{ "fonts": [ { "name": …, "description": …, "image": … } ] }`.
    pub fn sources_from_json(json: &str) -> Result<Vec<FontSource>, LoadError> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        Ok(config.fonts)
    }

    /// Load every source in order. All-or-nothing: the first failing
    /// entry aborts with its error.
    pub fn load(
        sources: &[FontSource],
        device: &Device,
        queue: &Queue,
    ) -> Result<Self, LoadError> {
        let mut catalog = Self::new();
        for source in sources {
            let atlas = FontAtlas::load(&source.description, &source.image, device, queue)?;
            catalog.insert(source.name.clone(), atlas);
        }
        log::info!("FontCatalog: loaded {} font(s)", catalog.len());
        Ok(catalog)
    }

    /// Insert an already-loaded atlas under `name`, returning the
    /// shared handle. A duplicate name shadows the earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, atlas: FontAtlas) -> Arc<FontAtlas> {
        let name = name.into();
        let atlas = Arc::new(atlas);
        let index = self.atlases.len();
        self.atlases.push(Arc::clone(&atlas));
        if let Some(previous) = self.names.insert(name.clone(), index) {
            log::warn!(
                "FontCatalog: \"{name}\" already pointed at atlas #{previous}, now #{index}"
            );
        }
        atlas
    }

    /// Look up an atlas by catalog name.
    pub fn get(&self, name: &str) -> Option<&Arc<FontAtlas>> {
        self.names.get(name).and_then(|&index| self.atlases.get(index))
    }

    /// Look up an atlas by load order.
    pub fn atlas(&self, index: usize) -> Option<&Arc<FontAtlas>> {
        self.atlases.get(index)
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    /// Atlases in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FontAtlas>> {
        self.atlases.iter()
    }
}

// ===================================================================
// Tests
// ===================================================================
