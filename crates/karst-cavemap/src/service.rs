//! The cave biome service: one value owning profile, palette, surface and
//! cache.
//!
//! Constructed at world start, dropped at world stop. Every view borrows the
//! service, so no query can outlive the world it belongs to and nothing
//! lives in process-wide globals.

use std::sync::Arc;

use glam::IVec3;
use karst_terrain::{BiomeId, BiomePalette, SurfaceMap};

use crate::cache::FragmentCache;
use crate::fragment::{BiomeFragment, FragmentPosition};
use crate::generator::{GenerationProfile, GeneratorError};
use crate::view::CaveBiomeMapView;

pub struct CaveBiomeService {
    profile: GenerationProfile,
    palette: Arc<BiomePalette>,
    surface: Arc<SurfaceMap>,
    cache: FragmentCache,
}

impl CaveBiomeService {
    /// Brings the cave biome map up with an empty cache.
    pub fn new(
        profile: GenerationProfile,
        palette: Arc<BiomePalette>,
        surface: Arc<SurfaceMap>,
    ) -> Self {
        assert!(!palette.is_empty(), "cave biome map needs a palette");
        tracing::info!(world_seed = profile.seed(), "cave biome map initialized");
        Self {
            profile,
            palette,
            surface,
            cache: FragmentCache::new(),
        }
    }

    #[inline]
    pub fn world_seed(&self) -> u64 {
        self.profile.seed()
    }

    #[inline]
    pub fn palette(&self) -> &BiomePalette {
        &self.palette
    }

    #[inline]
    pub fn surface(&self) -> &SurfaceMap {
        &self.surface
    }

    /// Builds a view covering `[origin, origin + width)` plus `margin` on
    /// every side, with all fragments and surface tiles pinned.
    pub fn view(
        &self,
        origin: IVec3,
        width: i32,
        voxel_size: i32,
        margin: i32,
    ) -> Result<CaveBiomeMapView<'_>, GeneratorError> {
        CaveBiomeMapView::new(self, origin, width, voxel_size, margin)
    }

    /// Empties the fragment cache. Fragments pinned by live views survive
    /// until those views drop.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Fragments currently held by the cache.
    pub fn cached_fragments(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a fragment through the cache, generating on miss.
    pub(crate) fn fragment(
        &self,
        pos: FragmentPosition,
    ) -> Result<Arc<BiomeFragment>, GeneratorError> {
        self.cache.find_or_create(pos, |pos| {
            let mut fragment = BiomeFragment::new(pos, BiomeId(0));
            for generator in self.profile.generators() {
                let seed = self.profile.seed() ^ generator.generator_seed();
                generator.generate(&mut fragment, seed)?;
            }
            tracing::debug!(coords = ?pos.coords, voxel_size = pos.voxel_size, "generated fragment");
            Ok(Arc::new(fragment))
        })
    }
}

impl Drop for CaveBiomeService {
    fn drop(&mut self) {
        self.cache.clear();
        self.profile.shutdown();
        tracing::info!("cave biome map shut down");
    }
}
