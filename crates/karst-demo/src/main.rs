//! Renders a horizontal slice of the cave biome map as ASCII.
//!
//! Builds the full generation stack from `karst.ron` (created on first run)
//! and prints either the biome id per column or an interpolated biome field
//! as shaded characters.
//!
//! Run with `cargo run -p karst-demo -- --seed 12345 --depth -200`.
//! Add `--field roughness` to see the interpolated field instead.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use glam::IVec3;
use tracing::info;

use karst_cavemap::{CaveBiomeService, GeneratorRegistry, RandomBiomeGenerator};
use karst_config::Config;
use karst_terrain::{Biome, BiomeField, BiomePalette, SurfaceMap};

/// Karst cave biome map demo.
#[derive(Parser, Debug)]
#[command(name = "karst-demo", about = "ASCII slice of the karst cave biome map")]
struct CliArgs {
    /// World seed (overrides the config file).
    #[arg(long)]
    seed: Option<u64>,

    /// Depth of the slice below the surface base height.
    #[arg(long, default_value_t = -200)]
    depth: i32,

    /// Side length of the rendered slice in voxels.
    #[arg(long, default_value_t = 96)]
    size: i32,

    /// Biome field to interpolate instead of drawing biome glyphs.
    #[arg(long)]
    field: Option<String>,

    /// Path to the config directory.
    #[arg(long, default_value = ".")]
    config: PathBuf,

    /// Log level override (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

const GLYPHS: &[u8] = b"#%@*+=~-.:";
const SHADES: &[u8] = b" .:-=+*#%@";

fn default_palette() -> (Arc<BiomePalette>, Vec<karst_terrain::BiomeId>, Vec<karst_terrain::BiomeId>) {
    let mut palette = BiomePalette::new();
    let cave = vec![
        Biome {
            name: "limestone_cavern".into(),
            roughness: 0.2,
            hills: 0.1,
            mountains: 0.0,
            caves: 0.9,
        },
        Biome {
            name: "gravel_gallery".into(),
            roughness: 0.8,
            hills: 0.3,
            mountains: 0.1,
            caves: 0.6,
        },
        Biome {
            name: "crystal_hollow".into(),
            roughness: 0.4,
            hills: 0.6,
            mountains: 0.3,
            caves: 0.4,
        },
        Biome {
            name: "mud_warren".into(),
            roughness: 0.6,
            hills: 0.2,
            mountains: 0.0,
            caves: 0.8,
        },
    ]
    .into_iter()
    .map(|b| palette.register(b).unwrap())
    .collect();
    let surface = vec![
        palette
            .register(Biome {
                name: "meadow".into(),
                roughness: 0.3,
                hills: 0.4,
                mountains: 0.2,
                caves: 0.1,
            })
            .unwrap(),
    ];
    (Arc::new(palette), cave, surface)
}

fn main() {
    let args = CliArgs::parse();

    let mut config = Config::load_or_create(&args.config).unwrap_or_else(|err| {
        eprintln!("config error: {err}");
        std::process::exit(1);
    });
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }
    if let Some(ref level) = args.log_level {
        config.debug.log_level = level.clone();
    }
    karst_log::init_logging(Some(&config.debug.log_level), None);

    let (palette, cave_biomes, surface_biomes) = default_palette();
    let surface = Arc::new(SurfaceMap::new(
        &palette,
        surface_biomes,
        config.world.seed,
        &config.surface,
    ));

    let mut registry = GeneratorRegistry::new();
    registry.register(Box::new(RandomBiomeGenerator::new(
        Arc::clone(&palette),
        cave_biomes,
    )));
    let profile = registry
        .into_profile(&config.cavegen, config.world.seed)
        .unwrap_or_else(|err| {
            eprintln!("generator error: {err}");
            std::process::exit(1);
        });
    let service = CaveBiomeService::new(profile, palette, surface);

    let size = args.size.clamp(16, 192);
    let z = config.surface.base_height + args.depth;
    let origin = IVec3::new(-size / 2, -size / 2, z - 16);
    let started = std::time::Instant::now();
    let view = service
        .view(origin, size, 1, 32)
        .unwrap_or_else(|err| {
            eprintln!("generation error: {err}");
            std::process::exit(1);
        });
    info!(
        seed = config.world.seed,
        size,
        z,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "view ready"
    );

    let field = args.field.as_deref().map(|name| {
        name.parse::<BiomeField>().unwrap_or_else(|err| {
            eprintln!("{err}");
            std::process::exit(1);
        })
    });

    let mut legend: Vec<(char, String)> = Vec::new();
    for y in (0..size).rev() {
        let mut line = String::with_capacity(size as usize);
        for x in 0..size {
            let ch = match field {
                Some(field) => {
                    let v = view
                        .interpolate_value(IVec3::new(origin.x + x, origin.y + y, z), field)
                        .clamp(0.0, 1.0);
                    let idx = ((v * (SHADES.len() - 1) as f32).round()) as usize;
                    SHADES[idx] as char
                }
                None => {
                    let rel = IVec3::new(x, y, z - origin.z);
                    let (biome, _) = view.get_biome_and_seed(rel);
                    let idx = legend.iter().position(|(_, name)| *name == biome.name);
                    let idx = idx.unwrap_or_else(|| {
                        legend.push((
                            GLYPHS[legend.len() % GLYPHS.len()] as char,
                            biome.name.clone(),
                        ));
                        legend.len() - 1
                    });
                    legend[idx].0
                }
            };
            line.push(ch);
        }
        println!("{line}");
    }

    if field.is_none() {
        println!();
        for (glyph, name) in &legend {
            println!("  {glyph}  {name}");
        }
    }
    info!(cached_fragments = service.cached_fragments(), "done");
}
