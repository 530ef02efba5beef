//! Pluggable cave biome generators and their registry.
//!
//! Generators fill fragments in ascending priority order, each seeded with
//! `world_seed ^ generator_seed` so reordering unrelated generators never
//! changes another generator's output. Registration is explicit: the engine
//! enumerates its plugins at startup and hands the registry a config whose
//! per-id subtrees parametrize each generator.

use std::sync::Arc;

use karst_config::{GeneratorConfig, WorldGenConfig};
use karst_terrain::{BiomeId, BiomePalette};
use rand::RngCore;

use crate::fragment::{BiomeFragment, CELLS_PER_FRAGMENT};
use crate::seed::cell_rng;
use karst_math::LatticeParity;

/// Errors raised while configuring or running generators.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A generator rejected its config subtree.
    #[error("generator {id}: invalid config: {reason}")]
    InvalidConfig { id: String, reason: String },

    /// A generator failed while filling a fragment. The fragment is
    /// discarded; nothing partial reaches the cache.
    #[error("generator {id}: generation failed: {reason}")]
    Failed { id: String, reason: String },
}

/// One cave biome generator plugin.
///
/// `generate` must be deterministic in `(fragment position, seed)` and must
/// leave every cell it claims responsibility for in its final state; the
/// fragment is frozen as soon as the chain finishes.
pub trait CaveBiomeGenerator: Send + Sync {
    /// Stable identifier, also the config subtree key.
    fn id(&self) -> &str;

    /// Ascending execution order; lower runs first.
    fn priority(&self) -> i32;

    /// Per-generator seed salt, XORed with the world seed.
    fn generator_seed(&self) -> u64;

    /// Consume the config subtree for this generator's id. Missing subtrees
    /// arrive empty; the generator decides its own defaults.
    fn init(&mut self, config: &GeneratorConfig) -> Result<(), GeneratorError>;

    /// Release whatever `init` acquired.
    fn deinit(&mut self) {}

    /// Fill (part of) a fragment.
    fn generate(&self, fragment: &mut BiomeFragment, seed: u64) -> Result<(), GeneratorError>;
}

/// Collects generator plugins before the world starts.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn CaveBiomeGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin. Call order does not matter; priority decides.
    pub fn register(&mut self, generator: Box<dyn CaveBiomeGenerator>) {
        tracing::debug!(id = generator.id(), "registered cave biome generator");
        self.generators.push(generator);
    }

    /// Initializes every generator with its config subtree and fixes the
    /// execution order.
    pub fn into_profile(
        mut self,
        config: &WorldGenConfig,
        world_seed: u64,
    ) -> Result<GenerationProfile, GeneratorError> {
        for generator in &mut self.generators {
            let subtree = config.generator(generator.id());
            generator.init(&subtree)?;
        }
        self.generators.sort_by_key(|g| g.priority());
        tracing::info!(
            world_seed,
            count = self.generators.len(),
            "cave biome generation profile ready"
        );
        Ok(GenerationProfile {
            seed: world_seed,
            generators: self.generators,
        })
    }
}

/// The initialized, priority-ordered generator chain plus the world seed.
pub struct GenerationProfile {
    seed: u64,
    generators: Vec<Box<dyn CaveBiomeGenerator>>,
}

impl GenerationProfile {
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn generators(&self) -> &[Box<dyn CaveBiomeGenerator>] {
        &self.generators
    }

    /// Runs every generator's `deinit`. Idempotent: the chain is drained.
    pub(crate) fn shutdown(&mut self) {
        for generator in &mut self.generators {
            generator.deinit();
        }
        self.generators.clear();
    }
}

/// Built-in generator: every cell of every sub-lattice draws one biome
/// uniformly from a candidate list, seeded per cell.
///
/// The config subtree may carry `biomes: ["name", ...]` to restrict the
/// candidates; by default every palette entry handed to `new` is eligible.
pub struct RandomBiomeGenerator {
    palette: Arc<BiomePalette>,
    candidates: Vec<BiomeId>,
}

impl RandomBiomeGenerator {
    pub const ID: &'static str = "karst:random_biome";

    pub fn new(palette: Arc<BiomePalette>, candidates: Vec<BiomeId>) -> Self {
        Self {
            palette,
            candidates,
        }
    }
}

impl CaveBiomeGenerator for RandomBiomeGenerator {
    fn id(&self) -> &str {
        Self::ID
    }

    fn priority(&self) -> i32 {
        0
    }

    fn generator_seed(&self) -> u64 {
        0x7A3D_9C51_E2B8_406F
    }

    fn init(&mut self, config: &GeneratorConfig) -> Result<(), GeneratorError> {
        if let Some(names) = config.get_str_list("biomes") {
            let mut candidates = Vec::with_capacity(names.len());
            for name in &names {
                let id = self.palette.lookup_by_name(name).ok_or_else(|| {
                    GeneratorError::InvalidConfig {
                        id: Self::ID.to_string(),
                        reason: format!("unknown biome {name:?}"),
                    }
                })?;
                candidates.push(id);
            }
            self.candidates = candidates;
        }
        if self.candidates.is_empty() {
            return Err(GeneratorError::InvalidConfig {
                id: Self::ID.to_string(),
                reason: "no candidate biomes".to_string(),
            });
        }
        Ok(())
    }

    fn generate(&self, fragment: &mut BiomeFragment, seed: u64) -> Result<(), GeneratorError> {
        let count = self.candidates.len() as u64;
        for index in 0..CELLS_PER_FRAGMENT {
            let origin = fragment.cell_origin(index);
            for parity in [LatticeParity::Even, LatticeParity::Odd] {
                let pick = cell_rng(seed, origin, parity).next_u64() % count;
                fragment.set_cell(index, parity, self.candidates[pick as usize]);
            }
        }
        Ok(())
    }
}
