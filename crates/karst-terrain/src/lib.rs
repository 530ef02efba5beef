//! Surface terrain collaborators for the karst cave biome map.
//!
//! The cave map consults the surface through a deliberately small interface:
//! a seeded height field, cached surface tiles carrying per-column height
//! and surface biome, and a 2D fractal noise used to soften cave cell edges.
//! The biome palette itself also lives here, shared by the surface and the
//! cave layers.

mod biome;
mod fractal;
mod heightmap;
mod surface;

pub use biome::{Biome, BiomeField, BiomeFieldParseError, BiomeId, BiomePalette, PaletteError};
pub use fractal::FractalNoise;
pub use heightmap::HeightField;
pub use surface::{MAP_TILE_SIZE, SurfaceMap, SurfaceTile};
