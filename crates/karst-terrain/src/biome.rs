//! Biome palette: descriptors with named scalar fields, id-indexed.

use std::str::FromStr;

use hashbrown::HashMap;

/// Unique identifier for a biome within its palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u16);

/// Descriptor for a single biome.
///
/// The scalar fields feed terrain shaping; they are interpolated between
/// neighboring cave cells, so they must stay plain numbers rather than
/// behavior.
#[derive(Clone, Debug)]
pub struct Biome {
    /// Palette-unique biome name (e.g. "limestone_cavern").
    pub name: String,
    /// Small-scale terrain noise amplitude.
    pub roughness: f32,
    /// Medium-scale bump amplitude.
    pub hills: f32,
    /// Large-scale relief amplitude.
    pub mountains: f32,
    /// Cave carving aggressiveness.
    pub caves: f32,
}

impl Biome {
    /// Read a scalar field by its typed name.
    #[inline]
    pub fn field(&self, field: BiomeField) -> f32 {
        match field {
            BiomeField::Roughness => self.roughness,
            BiomeField::Hills => self.hills,
            BiomeField::Mountains => self.mountains,
            BiomeField::Caves => self.caves,
        }
    }
}

/// The interpolable scalar fields every biome carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BiomeField {
    Roughness,
    Hills,
    Mountains,
    Caves,
}

/// Error produced when a field name does not match any biome field.
#[derive(Debug, thiserror::Error)]
#[error("unknown biome field: {0}")]
pub struct BiomeFieldParseError(String);

impl FromStr for BiomeField {
    type Err = BiomeFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roughness" => Ok(BiomeField::Roughness),
            "hills" => Ok(BiomeField::Hills),
            "mountains" => Ok(BiomeField::Mountains),
            "caves" => Ok(BiomeField::Caves),
            other => Err(BiomeFieldParseError(other.to_string())),
        }
    }
}

/// Errors that can occur when building a palette.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    /// A biome with this name is already registered.
    #[error("duplicate biome name: {0}")]
    DuplicateName(String),
}

/// Stores all biome descriptors with O(1) lookup by id.
///
/// Immutable once loaded: registration happens during world setup, after
/// which the palette is shared behind an `Arc` and only read.
pub struct BiomePalette {
    biomes: Vec<Biome>,
    name_to_id: HashMap<String, BiomeId>,
}

impl BiomePalette {
    /// Creates an empty palette.
    pub fn new() -> Self {
        Self {
            biomes: Vec::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Registers a biome, returning its assigned [`BiomeId`].
    ///
    /// # Errors
    ///
    /// [`PaletteError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, biome: Biome) -> Result<BiomeId, PaletteError> {
        if self.name_to_id.contains_key(&biome.name) {
            return Err(PaletteError::DuplicateName(biome.name.clone()));
        }
        let id = BiomeId(self.biomes.len() as u16);
        self.name_to_id.insert(biome.name.clone(), id);
        self.biomes.push(biome);
        Ok(id)
    }

    /// The descriptor for an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this palette.
    #[inline]
    pub fn get(&self, id: BiomeId) -> &Biome {
        &self.biomes[id.0 as usize]
    }

    /// Looks up a biome id by name.
    pub fn lookup_by_name(&self, name: &str) -> Option<BiomeId> {
        self.name_to_id.get(name).copied()
    }

    /// All ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = BiomeId> + '_ {
        (0..self.biomes.len() as u16).map(BiomeId)
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

impl Default for BiomePalette {
    fn default() -> Self {
        Self::new()
    }
}
