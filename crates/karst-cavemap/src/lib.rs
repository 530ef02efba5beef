//! Rotated-lattice cave biome map.
//!
//! Assigns a biome to every integer world coordinate, deterministically from
//! the world seed. Biome cells live on a fixed-point-rotated lattice so
//! their boundaries cut across the world axes, and two interleaved
//! sub-lattices overlap so transitions look organic rather than gridded.
//! Cells are precomputed in 2048³ fragments of rotated space, generated by
//! pluggable generators and shared through a bounded set-associative cache;
//! chunk-scale [`CaveBiomeMapView`]s pin the fragments they need and answer
//! point, column and interpolation queries.
//!
//! The map is total and immutable: queries never fail for in-range
//! coordinates, and a fragment never changes after generation.

mod cache;
mod fragment;
mod generator;
mod seed;
mod service;
mod view;

pub use cache::{CACHE_SETS, CACHE_WAYS, FragmentCache};
pub use fragment::{BiomeFragment, CELLS_PER_FRAGMENT, FragmentPosition};
pub use generator::{
    CaveBiomeGenerator, GenerationProfile, GeneratorError, GeneratorRegistry,
    RandomBiomeGenerator,
};
pub use seed::{derive_cell_seed, derive_column_seed};
pub use service::CaveBiomeService;
pub use view::{BulkMode, CaveBiomeMapView};
