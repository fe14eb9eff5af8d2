//! Repaints the road strip between two plots after a merge or unmerge.

use super::{MergeDirection, PlotBounds, PlotId, PlotWorld};
use crate::generator::{AIR, GeneratorPreset, Palette, surface_y};
use tracing::{debug, warn};

/// Block access to the host's worlds.
pub trait WorldEditor: Send + Sync {
    /// Inclusive `(min_y, max_y)` of the world's overworld, or `None` when
    /// the world is not loaded.
    fn height_range(&self, world: &str) -> Option<(i32, i32)>;

    /// The preset string of the world's generator, if it has one.
    fn generator_preset(&self, world: &str) -> Option<String>;

    fn set_block(&self, world: &str, x: i32, y: i32, z: i32, block: &str);
}

/// The columns touched by a repaint and the strip that becomes plot area
/// when the plots are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateArea {
    pub area: PlotBounds,
    pub strip: PlotBounds,
}

impl UpdateArea {
    pub fn for_merge(base: PlotBounds, road_size: i32, dir: MergeDirection) -> UpdateArea {
        let bounds = |min_x, max_x, min_z, max_z| PlotBounds {
            min_x,
            max_x,
            min_z,
            max_z,
        };
        match dir {
            MergeDirection::East => {
                let (min_x, max_x) = (base.max_x + 1, base.max_x + road_size);
                UpdateArea {
                    area: bounds(min_x, max_x, base.min_z - road_size, base.max_z + road_size),
                    strip: bounds(min_x, max_x, base.min_z, base.max_z),
                }
            }
            MergeDirection::West => {
                let (min_x, max_x) = (base.min_x - road_size, base.min_x - 1);
                UpdateArea {
                    area: bounds(min_x, max_x, base.min_z - road_size, base.max_z + road_size),
                    strip: bounds(min_x, max_x, base.min_z, base.max_z),
                }
            }
            MergeDirection::South => {
                let (min_z, max_z) = (base.max_z + 1, base.max_z + road_size);
                UpdateArea {
                    area: bounds(base.min_x - road_size, base.max_x + road_size, min_z, max_z),
                    strip: bounds(base.min_x, base.max_x, min_z, max_z),
                }
            }
            MergeDirection::North => {
                let (min_z, max_z) = (base.min_z - road_size, base.min_z - 1);
                UpdateArea {
                    area: bounds(base.min_x - road_size, base.max_x + road_size, min_z, max_z),
                    strip: bounds(base.min_x, base.max_x, min_z, max_z),
                }
            }
        }
    }
}

/// Which columns around an update area count as plot. Padded by one column
/// on every side so neighbours of the area can be looked up.
pub struct PlotMask {
    min_x: i32,
    min_z: i32,
    width: i32,
    depth: i32,
    mask: Vec<bool>,
}

impl PlotMask {
    pub fn build(world: &PlotWorld, update: &UpdateArea, merged: bool) -> PlotMask {
        let min_x = update.area.min_x - 1;
        let min_z = update.area.min_z - 1;
        let width = update.area.max_x - update.area.min_x + 3;
        let depth = update.area.max_z - update.area.min_z + 3;
        let mut mask = Vec::with_capacity((width * depth) as usize);
        for x in min_x..min_x + width {
            for z in min_z..min_z + depth {
                let in_strip = merged && update.strip.contains(x, z);
                mask.push(in_strip || world.plot_id_at(x, z).is_some());
            }
        }
        PlotMask {
            min_x,
            min_z,
            width,
            depth,
            mask,
        }
    }

    pub fn is_plot(&self, x: i32, z: i32) -> bool {
        let dx = x - self.min_x;
        let dz = z - self.min_z;
        if dx < 0 || dz < 0 || dx >= self.width || dz >= self.depth {
            return false;
        }
        self.mask[(dx * self.depth + dz) as usize]
    }

    /// The block placed above a road column.
    pub fn road_top<'a>(&self, x: i32, z: i32, palette: &'a Palette) -> &'a str {
        let edge_x = self.is_plot(x - 1, z) || self.is_plot(x + 1, z);
        let edge_z = self.is_plot(x, z - 1) || self.is_plot(x, z + 1);
        if edge_x && edge_z {
            return palette.road_corner.as_str();
        }
        if edge_x || edge_z {
            return palette.road_edge.as_str();
        }
        let diagonal = self.is_plot(x - 1, z - 1)
            || self.is_plot(x + 1, z - 1)
            || self.is_plot(x - 1, z + 1)
            || self.is_plot(x + 1, z + 1);
        if diagonal { palette.road_corner.as_str() } else { AIR }
    }
}

/// Repaints the road between `id` and its neighbour in `dir` to match the
/// current merge state.
pub fn repaint_merge_road(world: &PlotWorld, editor: &dyn WorldEditor, id: PlotId, dir: MergeDirection) {
    let config = world.config();
    if config.road_size <= 0 {
        return;
    }
    let world_name = world.name();
    let Some((min_y, max_y)) = editor.height_range(world_name) else {
        warn!("Plot world {} is not loaded; skipping road update.", world_name);
        return;
    };

    let surface = surface_y(min_y, max_y, config.ground_y);
    let top = surface + 1;
    let has_top = top <= max_y;

    let update = UpdateArea::for_merge(world.plot_bounds(id), config.road_size, dir);
    let merged = world.is_merged(id, dir);
    let preset = match editor.generator_preset(world_name) {
        Some(preset) if !preset.trim().is_empty() => GeneratorPreset::parse(&preset),
        _ => GeneratorPreset::from_config(config),
    };
    let palette = preset.palette();
    let mask = PlotMask::build(world, &update, merged);
    debug!(
        "Repainting {} road of plot {} in {} (merged: {})",
        dir, id, world_name, merged
    );

    let area = update.area;
    for x in area.min_x..=area.max_x {
        for z in area.min_z..=area.max_z {
            let plot_area = mask.is_plot(x, z);
            let surface_block = if plot_area { &palette.plot } else { &palette.road };
            editor.set_block(world_name, x, surface, z, surface_block);
            if !has_top {
                continue;
            }
            let top_block = if plot_area { AIR } else { mask.road_top(x, z, &palette) };
            editor.set_block(world_name, x, top, z, top_block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotWorldConfig;
    use rustc_hash::FxHashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        preset: Option<String>,
        blocks: Mutex<FxHashMap<(i32, i32, i32), String>>,
    }

    impl Recorder {
        fn get(&self, x: i32, y: i32, z: i32) -> Option<String> {
            self.blocks.lock().unwrap().get(&(x, y, z)).cloned()
        }
    }

    impl WorldEditor for Recorder {
        fn height_range(&self, world: &str) -> Option<(i32, i32)> {
            (world == "testworld").then_some((-64, 319))
        }

        fn generator_preset(&self, _world: &str) -> Option<String> {
            self.preset.clone()
        }

        fn set_block(&self, _world: &str, x: i32, y: i32, z: i32, block: &str) {
            self.blocks.lock().unwrap().insert((x, y, z), block.to_owned());
        }
    }

    fn merged_pair() -> PlotWorld {
        let mut world = PlotWorld::new(PlotWorldConfig::named("testworld"));
        world.claim_plot(PlotId::new(0, 0), 1, None);
        world.claim_plot(PlotId::new(1, 0), 1, None);
        world.set_merged(PlotId::new(0, 0), MergeDirection::East, true);
        world
    }

    #[test]
    fn update_area_east() {
        let base = PlotBounds {
            min_x: 0,
            max_x: 34,
            min_z: 0,
            max_z: 34,
        };
        let update = UpdateArea::for_merge(base, 7, MergeDirection::East);
        assert_eq!(
            update.area,
            PlotBounds {
                min_x: 35,
                max_x: 41,
                min_z: -7,
                max_z: 41
            }
        );
        assert_eq!(
            update.strip,
            PlotBounds {
                min_x: 35,
                max_x: 41,
                min_z: 0,
                max_z: 34
            }
        );
        let north = UpdateArea::for_merge(base, 7, MergeDirection::North);
        assert_eq!(north.area.min_z, -7);
        assert_eq!(north.area.max_z, -1);
        assert_eq!(north.strip.min_x, 0);
        assert_eq!(north.area.min_x, -7);
    }

    #[test]
    fn merge_paints_strip_as_plot() {
        let world = merged_pair();
        let editor = Recorder::default();
        repaint_merge_road(&world, &editor, PlotId::new(0, 0), MergeDirection::East);

        assert_eq!(editor.get(38, 64, 17).as_deref(), Some("minecraft:grass_block"));
        assert_eq!(editor.get(38, 65, 17).as_deref(), Some(AIR));
        // Road between the merged pair and the plots to the south.
        assert_eq!(editor.get(38, 64, 38).as_deref(), Some("minecraft:oak_planks"));
        assert_eq!(editor.get(38, 65, 35).as_deref(), Some("minecraft:smooth_stone_slab"));
        assert_eq!(editor.get(38, 65, 38).as_deref(), Some(AIR));
        // Road column north of the strip.
        assert_eq!(editor.get(35, 65, -1).as_deref(), Some("minecraft:smooth_stone_slab"));
    }

    #[test]
    fn unmerge_restores_road() {
        let mut world = merged_pair();
        world.set_merged(PlotId::new(0, 0), MergeDirection::East, false);
        let editor = Recorder {
            preset: Some("road-block=minecraft:stone;road-edge-block=minecraft:stone_slab".to_owned()),
            ..Default::default()
        };
        repaint_merge_road(&world, &editor, PlotId::new(0, 0), MergeDirection::East);

        assert_eq!(editor.get(38, 64, 17).as_deref(), Some("minecraft:stone"));
        assert_eq!(editor.get(38, 65, 17).as_deref(), Some(AIR));
        assert_eq!(editor.get(35, 65, 17).as_deref(), Some("minecraft:stone_slab"));
        assert_eq!(editor.get(41, 65, 17).as_deref(), Some("minecraft:stone_slab"));
    }

    #[test]
    fn unloaded_world_is_skipped() {
        let mut world = PlotWorld::new(PlotWorldConfig::named("elsewhere"));
        world.claim_plot(PlotId::new(0, 0), 1, None);
        let editor = Recorder::default();
        repaint_merge_road(&world, &editor, PlotId::new(0, 0), MergeDirection::East);
        assert!(editor.blocks.lock().unwrap().is_empty());
    }
}
