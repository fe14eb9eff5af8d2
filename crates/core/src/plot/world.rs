use super::{MergeDirection, Plot, PlotBounds, PlotId};
use crate::config::PlotWorldConfig;
use allayplots_save_data::{PlotRecords, WorldChanges};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};

/// Cell index of a block coordinate. Negative coordinates stay aligned with
/// the positive side of the grid.
fn cell_index(coord: i32, total: i32) -> i32 {
    if coord >= 0 {
        coord / total
    } else {
        (coord + 1) / total - 1
    }
}

/// Position of a block coordinate within its cell. Plot area is
/// `1..=plot_size`; everything else is road.
fn cell_offset(coord: i32, total: i32) -> i32 {
    let raw = (coord + 1) % total;
    if coord >= 0 { raw } else { total + raw }
}

/// All plots of one world together with the set of ids changed since the
/// last save.
pub struct PlotWorld {
    config: PlotWorldConfig,
    plots: FxHashMap<PlotId, Plot>,
    dirty: FxHashSet<PlotId>,
    deleted: FxHashSet<PlotId>,
}

impl PlotWorld {
    pub fn new(config: PlotWorldConfig) -> PlotWorld {
        PlotWorld {
            config,
            plots: FxHashMap::default(),
            dirty: FxHashSet::default(),
            deleted: FxHashSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.world_name
    }

    pub fn config(&self) -> &PlotWorldConfig {
        &self.config
    }

    pub fn plots(&self) -> &FxHashMap<PlotId, Plot> {
        &self.plots
    }

    pub fn plot(&self, id: PlotId) -> Option<&Plot> {
        self.plots.get(&id)
    }

    /// Returns the plot owning the block column at `x`, `z`.
    ///
    /// Road strips between merged plots and the intersection of a fully
    /// merged 2x2 block resolve to the cell they belong to. Any other road
    /// column gives `None`.
    pub fn plot_id_at(&self, x: i32, z: i32) -> Option<PlotId> {
        let plot_size = self.config.plot_size;
        let total = self.config.total_size();

        let current = PlotId::new(cell_index(x, total), cell_index(z, total));
        let dif_x = cell_offset(x, total);
        let dif_z = cell_offset(z, total);
        let in_plot_x = dif_x > 0 && dif_x <= plot_size;
        let in_plot_z = dif_z > 0 && dif_z <= plot_size;

        if in_plot_x && in_plot_z {
            return Some(current);
        }
        if in_plot_x && self.is_merged(current, MergeDirection::South) {
            return Some(current);
        }
        if in_plot_z && self.is_merged(current, MergeDirection::East) {
            return Some(current);
        }

        let east = current.offset(1, 0);
        let south = current.offset(0, 1);
        let full = self.is_merged(current, MergeDirection::East)
            && self.is_merged(south, MergeDirection::East)
            && self.is_merged(current, MergeDirection::South)
            && self.is_merged(east, MergeDirection::South);
        full.then_some(current)
    }

    pub fn plot_bounds(&self, id: PlotId) -> PlotBounds {
        let total = self.config.total_size();
        let min_x = id.x * total;
        let min_z = id.z * total;
        PlotBounds {
            min_x,
            max_x: min_x + self.config.plot_size - 1,
            min_z,
            max_z: min_z + self.config.plot_size - 1,
        }
    }

    /// Bounding rectangle of the whole merge group of `id`.
    pub fn merged_plot_bounds(&self, id: PlotId) -> PlotBounds {
        let group = self.merge_group(id);
        if group.is_empty() {
            return self.plot_bounds(id);
        }
        let min_x = group.iter().map(|id| id.x).min().unwrap_or(id.x);
        let max_x = group.iter().map(|id| id.x).max().unwrap_or(id.x);
        let min_z = group.iter().map(|id| id.z).min().unwrap_or(id.z);
        let max_z = group.iter().map(|id| id.z).max().unwrap_or(id.z);
        let low = self.plot_bounds(PlotId::new(min_x, min_z));
        let high = self.plot_bounds(PlotId::new(max_x, max_z));
        PlotBounds {
            min_x: low.min_x,
            max_x: high.max_x,
            min_z: low.min_z,
            max_z: high.max_z,
        }
    }

    fn mark_dirty(&mut self, id: PlotId) {
        self.deleted.remove(&id);
        self.dirty.insert(id);
    }

    /// Inserts plots read from storage without marking them as changed.
    pub fn load_plots(&mut self, plots: impl IntoIterator<Item = Plot>) {
        for plot in plots {
            self.plots.insert(plot.id(), plot);
        }
    }

    pub fn put_plot(&mut self, plot: Plot) {
        let id = plot.id();
        self.plots.insert(id, plot);
        self.mark_dirty(id);
    }

    /// Returns the removed plot. Removing a missing id is not a change.
    pub fn remove_plot(&mut self, id: PlotId) -> Option<Plot> {
        let removed = self.plots.remove(&id)?;
        self.dirty.remove(&id);
        self.deleted.insert(id);
        Some(removed)
    }

    /// Applies `f` to an existing plot. Returns `None` when there is no plot
    /// with that id, otherwise whatever `f` reported.
    pub fn update_plot(&mut self, id: PlotId, f: impl FnOnce(&mut Plot) -> bool) -> Option<bool> {
        let plot = self.plots.get_mut(&id)?;
        let changed = f(plot);
        if changed {
            self.mark_dirty(id);
        }
        Some(changed)
    }

    pub fn claim_plot(&mut self, id: PlotId, owner: u128, owner_name: Option<String>) -> &Plot {
        let world_name = self.config.world_name.clone();
        let plot = self
            .plots
            .entry(id)
            .or_insert_with(|| Plot::new(&world_name, id));
        plot.set_owner(Some(owner), owner_name);
        self.mark_dirty(id);
        &self.plots[&id]
    }

    pub fn count_owned_plots(&self, owner: u128) -> usize {
        self.plots.values().filter(|plot| plot.is_owner(owner)).count()
    }

    /// Searches square rings around the origin for the first unclaimed cell.
    pub fn find_next_free_plot_id(&self) -> PlotId {
        let mut radius: i32 = 0;
        loop {
            for x in -radius..=radius {
                for z in -radius..=radius {
                    let on_border = x.abs() == radius || z.abs() == radius;
                    if !on_border {
                        continue;
                    }
                    let id = PlotId::new(x, z);
                    if !self.plots.get(&id).is_some_and(Plot::is_claimed) {
                        return id;
                    }
                }
            }
            radius += 1;
        }
    }

    pub fn adjacent(id: PlotId, dir: MergeDirection) -> PlotId {
        let (dx, dz) = dir.offset();
        id.offset(dx, dz)
    }

    /// Whether `id` is effectively merged with its neighbour: both plots
    /// claimed by the same owner and both sides of the link set.
    pub fn is_merged(&self, id: PlotId, dir: MergeDirection) -> bool {
        let Some(plot) = self.plots.get(&id) else {
            return false;
        };
        if !plot.is_claimed() || !plot.has_merge(dir) {
            return false;
        }
        let Some(neighbor) = self.plots.get(&Self::adjacent(id, dir)) else {
            return false;
        };
        neighbor.is_claimed() && neighbor.has_merge(dir.opposite()) && neighbor.owner() == plot.owner()
    }

    /// Sets or clears both sides of a link. Fails when either plot record is
    /// missing.
    pub fn set_merged(&mut self, id: PlotId, dir: MergeDirection, merged: bool) -> bool {
        let neighbor_id = Self::adjacent(id, dir);
        if !self.plots.contains_key(&id) || !self.plots.contains_key(&neighbor_id) {
            return false;
        }
        let apply = |plot: &mut Plot, dir| {
            if merged {
                plot.add_merge(dir)
            } else {
                plot.remove_merge(dir)
            }
        };
        self.update_plot(id, |plot| apply(plot, dir));
        self.update_plot(neighbor_id, |plot| apply(plot, dir.opposite()));
        true
    }

    /// Removes every link of `id`, including the neighbours' halves.
    /// Returns the directions that were linked.
    pub fn clear_merged_connections(&mut self, id: PlotId) -> Vec<MergeDirection> {
        let Some(plot) = self.plots.get(&id) else {
            return Vec::new();
        };
        let dirs: Vec<_> = plot.merged_directions().iter().copied().collect();
        for &dir in &dirs {
            self.update_plot(Self::adjacent(id, dir), |neighbor| {
                neighbor.remove_merge(dir.opposite())
            });
            self.update_plot(id, |plot| plot.remove_merge(dir));
        }
        dirs
    }

    /// Every plot reachable from `id` over effective merges, including `id`.
    /// Empty when `id` has no plot record.
    pub fn merge_group(&self, id: PlotId) -> BTreeSet<PlotId> {
        let mut visited = BTreeSet::new();
        if !self.plots.contains_key(&id) {
            return visited;
        }
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(plot) = self.plots.get(&current) else {
                continue;
            };
            for &dir in plot.merged_directions() {
                let neighbor = Self::adjacent(current, dir);
                if self.is_merged(current, dir) && !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        visited
    }

    /// The group member with the smallest x, then the smallest z.
    pub fn merge_root(&self, id: PlotId) -> PlotId {
        self.merge_group(id).first().copied().unwrap_or(id)
    }

    /// Drops links whose neighbour is missing, unclaimed or owned by someone
    /// else, and links only one side knows about.
    pub fn normalize_merges(&mut self) -> bool {
        let mut broken = Vec::new();
        let mut one_sided = Vec::new();
        for (&id, plot) in &self.plots {
            for &dir in plot.merged_directions() {
                let neighbor = self.plots.get(&Self::adjacent(id, dir));
                match neighbor {
                    Some(neighbor)
                        if plot.is_claimed()
                            && neighbor.is_claimed()
                            && neighbor.owner() == plot.owner() =>
                    {
                        if !neighbor.has_merge(dir.opposite()) {
                            one_sided.push((id, dir));
                        }
                    }
                    _ => broken.push((id, dir)),
                }
            }
        }

        let mut changed = false;
        for (id, dir) in broken {
            changed |= self.update_plot(id, |plot| plot.remove_merge(dir)) == Some(true);
            changed |= self.update_plot(Self::adjacent(id, dir), |neighbor| {
                neighbor.remove_merge(dir.opposite())
            }) == Some(true);
        }
        for (id, dir) in one_sided {
            changed |= self.update_plot(id, |plot| plot.remove_merge(dir)) == Some(true);
        }
        changed
    }

    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty() || !self.deleted.is_empty()
    }

    pub fn dirty_plots(&self) -> &FxHashSet<PlotId> {
        &self.dirty
    }

    pub fn deleted_plots(&self) -> &FxHashSet<PlotId> {
        &self.deleted
    }

    pub fn clear_changes(&mut self) {
        self.dirty.clear();
        self.deleted.clear();
    }

    /// Every plot worth storing.
    pub fn records(&self) -> PlotRecords {
        self.plots
            .iter()
            .filter(|(_, plot)| !plot.is_default())
            .map(|(&id, plot)| (id.into(), plot.to_record()))
            .collect()
    }

    /// Builds the change set since the last save and resets tracking. Dirty
    /// plots that became default are written as deletes.
    pub fn take_changes(&mut self) -> WorldChanges {
        let mut changes = WorldChanges::default();
        for id in self.deleted.drain() {
            changes.delete(id.into());
        }
        for id in self.dirty.drain() {
            match self.plots.get(&id) {
                Some(plot) if !plot.is_default() => changes.upsert(id.into(), plot.to_record()),
                _ => changes.delete(id.into()),
            }
        }
        changes
    }
}
