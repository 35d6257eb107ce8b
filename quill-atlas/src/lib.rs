//! # quill-atlas
//!
//! Font atlas data model for the Quill MSDF text renderer: parsed
//! glyph/kerning/metric tables per font variant, the GPU-resident
//! atlas texture, string measurement, and the startup font catalog.
//!
//! ## Architecture
//!
//! ```text
//!  FontSource list (config)
//!       │
//!       ▼
//!  FontCatalog::load()              ◀─── description JSON + image
//!       │
//!       ▼
//!  Arc<FontAtlas>                   ◀─── variants + texture (load once)
//!       │
//!       ▼
//!  FontAtlas::font(variant_index)   ◀─── TextFont handle for batching
//! ```
//!
//! ## Crate modules
//!
//! - [`atlas`] — glyph/variant/atlas model, loaders, measurement
//! - [`catalog`] — name-indexed startup font table
//! - `schema` — serde wire format of the atlas description

pub mod atlas;
pub mod catalog;
mod schema;

// Re-exports for ergonomic use.
pub use atlas::{FontAtlas, FontVariant, Glyph, GlyphBounds, LoadError, TextFont};
pub use catalog::{FontCatalog, FontSource};
