//! Flat plot world terrain.

mod grid;
mod preset;

pub use grid::PlotGrid;
pub use preset::{AIR, GeneratorPreset, Palette, surface_y};

use crate::config::PlotWorldConfig;

pub const GENERATOR_NAME: &str = "PLOT";

/// A chunk being generated by the host.
pub trait ChunkWriter {
    /// Chunk coordinates, in chunks.
    fn chunk_pos(&self) -> (i32, i32);

    /// Inclusive `(min_y, max_y)` of the dimension.
    fn height_range(&self) -> (i32, i32);

    fn set_block(&mut self, local_x: i32, y: i32, local_z: i32, block: &str);
}

pub struct PlotChunkGenerator {
    preset: GeneratorPreset,
    grid: PlotGrid,
    palette: Palette,
}

impl PlotChunkGenerator {
    pub fn new(preset: &str) -> PlotChunkGenerator {
        PlotChunkGenerator::from_preset(GeneratorPreset::parse(preset))
    }

    pub fn from_config(config: &PlotWorldConfig) -> PlotChunkGenerator {
        PlotChunkGenerator::from_preset(GeneratorPreset::from_config(config))
    }

    fn from_preset(preset: GeneratorPreset) -> PlotChunkGenerator {
        PlotChunkGenerator {
            grid: PlotGrid::new(preset.plot_size, preset.road_size),
            palette: preset.palette(),
            preset,
        }
    }

    pub fn name(&self) -> &'static str {
        GENERATOR_NAME
    }

    pub fn preset(&self) -> &GeneratorPreset {
        &self.preset
    }

    pub fn generate(&self, chunk: &mut dyn ChunkWriter) {
        let (min_y, max_y) = chunk.height_range();
        let surface = surface_y(min_y, max_y, self.preset.ground_y);
        let (chunk_x, chunk_z) = chunk.chunk_pos();

        for local_x in 0..16 {
            let x = (chunk_x << 4) + local_x;
            for local_z in 0..16 {
                let z = (chunk_z << 4) + local_z;
                let road = self.grid.is_road(x, z);

                chunk.set_block(local_x, min_y, local_z, &self.palette.bedrock);
                for y in min_y + 1..surface {
                    chunk.set_block(local_x, y, local_z, &self.palette.fill);
                }
                if surface >= min_y && surface <= max_y {
                    let block = if road { &self.palette.road } else { &self.palette.plot };
                    chunk.set_block(local_x, surface, local_z, block);
                }
                if road && surface < max_y {
                    if self.grid.is_road_corner(x, z) {
                        chunk.set_block(local_x, surface + 1, local_z, &self.palette.road_corner);
                    } else if self.grid.is_road_edge(x, z) {
                        chunk.set_block(local_x, surface + 1, local_z, &self.palette.road_edge);
                    }
                }
            }
        }
    }
}
