use crate::config::PlotWorldConfig;
use std::fmt;

pub const KEY_PLOT_SIZE: &str = "plot-size";
pub const KEY_ROAD_SIZE: &str = "road-size";
pub const KEY_GROUND_Y: &str = "ground-y";
pub const KEY_PLOT_BLOCK: &str = "plot-block";
pub const KEY_ROAD_BLOCK: &str = "road-block";
pub const KEY_ROAD_EDGE_BLOCK: &str = "road-edge-block";
pub const KEY_ROAD_CORNER_BLOCK: &str = "road-corner-block";
pub const KEY_FILL_BLOCK: &str = "fill-block";
pub const KEY_BEDROCK_BLOCK: &str = "bedrock-block";

pub const AIR: &str = "minecraft:air";

/// Generator settings, stored by the host as a `key=value;...` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorPreset {
    pub plot_size: i32,
    pub road_size: i32,
    pub ground_y: i32,
    pub plot_block: String,
    pub road_block: String,
    pub road_edge_block: String,
    pub road_corner_block: String,
    pub fill_block: String,
    pub bedrock_block: String,
}

impl Default for GeneratorPreset {
    fn default() -> GeneratorPreset {
        GeneratorPreset {
            plot_size: 35,
            road_size: 7,
            ground_y: 64,
            plot_block: "minecraft:grass_block".to_owned(),
            road_block: "minecraft:oak_planks".to_owned(),
            road_edge_block: "minecraft:smooth_stone_slab".to_owned(),
            road_corner_block: "minecraft:smooth_stone_slab".to_owned(),
            fill_block: "minecraft:dirt".to_owned(),
            bedrock_block: "minecraft:bedrock".to_owned(),
        }
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}

impl GeneratorPreset {
    pub fn from_config(config: &PlotWorldConfig) -> GeneratorPreset {
        let defaults = GeneratorPreset::default();
        GeneratorPreset {
            plot_size: config.plot_size,
            road_size: config.road_size,
            ground_y: config.ground_y,
            road_edge_block: non_blank_or(&config.road_edge_block, &defaults.road_edge_block),
            road_corner_block: non_blank_or(&config.road_corner_block, &defaults.road_corner_block),
            ..defaults
        }
    }

    /// Unknown keys and malformed numbers are ignored. Sizes are clamped to
    /// a usable grid.
    pub fn parse(preset: &str) -> GeneratorPreset {
        let mut parsed = GeneratorPreset::default();
        for part in preset.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            let int = |fallback: i32| value.parse().unwrap_or(fallback);
            match key.as_str() {
                KEY_PLOT_SIZE => parsed.plot_size = int(parsed.plot_size),
                KEY_ROAD_SIZE => parsed.road_size = int(parsed.road_size),
                KEY_GROUND_Y => parsed.ground_y = int(parsed.ground_y),
                KEY_PLOT_BLOCK => parsed.plot_block = value.to_owned(),
                KEY_ROAD_BLOCK => parsed.road_block = value.to_owned(),
                KEY_ROAD_EDGE_BLOCK => parsed.road_edge_block = value.to_owned(),
                KEY_ROAD_CORNER_BLOCK => parsed.road_corner_block = value.to_owned(),
                KEY_FILL_BLOCK => parsed.fill_block = value.to_owned(),
                KEY_BEDROCK_BLOCK => parsed.bedrock_block = value.to_owned(),
                _ => {}
            }
        }
        parsed.plot_size = parsed.plot_size.max(1);
        parsed.road_size = parsed.road_size.max(0);
        parsed
    }

    /// Block ids with blank entries replaced by the default blocks.
    pub fn palette(&self) -> Palette {
        let defaults = GeneratorPreset::default();
        Palette {
            plot: non_blank_or(&self.plot_block, &defaults.plot_block),
            road: non_blank_or(&self.road_block, &defaults.road_block),
            road_edge: non_blank_or(&self.road_edge_block, &defaults.road_edge_block),
            road_corner: non_blank_or(&self.road_corner_block, &defaults.road_corner_block),
            fill: non_blank_or(&self.fill_block, &defaults.fill_block),
            bedrock: non_blank_or(&self.bedrock_block, &defaults.bedrock_block),
        }
    }
}

impl fmt::Display for GeneratorPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={};{}={};{}={};{}={};{}={};{}={};{}={};{}={};{}={}",
            KEY_PLOT_SIZE,
            self.plot_size,
            KEY_ROAD_SIZE,
            self.road_size,
            KEY_GROUND_Y,
            self.ground_y,
            KEY_PLOT_BLOCK,
            self.plot_block,
            KEY_ROAD_BLOCK,
            self.road_block,
            KEY_ROAD_EDGE_BLOCK,
            self.road_edge_block,
            KEY_ROAD_CORNER_BLOCK,
            self.road_corner_block,
            KEY_FILL_BLOCK,
            self.fill_block,
            KEY_BEDROCK_BLOCK,
            self.bedrock_block
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub plot: String,
    pub road: String,
    pub road_edge: String,
    pub road_corner: String,
    pub fill: String,
    pub bedrock: String,
}

/// The Y of the top terrain block, kept inside the world's height range.
pub fn surface_y(min_y: i32, max_y: i32, ground_y: i32) -> i32 {
    let surface = max_y.min(ground_y);
    if surface <= min_y {
        max_y.min(min_y + 1)
    } else {
        surface
    }
}
