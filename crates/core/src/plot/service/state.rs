use super::save::{SaveJob, SaveQueue, SharedStorage};
use super::{ClaimResult, MergeResult, OwnerActionResult, UnmergeResult};
use crate::config::PluginConfig;
use crate::plot::roads::{WorldEditor, repaint_merge_road};
use crate::plot::{MergeDirection, Plot, PlotId, PlotWorld};
use crate::utils::lock;
use allayplots_save_data::{ChangeSet, StorageError, WorldRecords};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A plot in a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlotLocation {
    pub world: String,
    pub id: PlotId,
}

impl PlotLocation {
    pub fn new(world: &str, id: PlotId) -> PlotLocation {
        PlotLocation {
            world: world.to_owned(),
            id,
        }
    }
}

fn sorted_ids(world: &PlotWorld) -> Vec<PlotId> {
    let mut ids: Vec<_> = world.plots().keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// All plot state. Lives on the `plot-service` thread.
pub struct ServiceState {
    config: Arc<PluginConfig>,
    worlds: IndexMap<String, PlotWorld>,
    homes: FxHashMap<u128, PlotLocation>,
    /// Stored plots of worlds that are not configured. Kept so full saves
    /// do not drop them.
    orphaned: WorldRecords,
    storage: SharedStorage,
    incremental: bool,
    saves: SaveQueue,
    editor: Option<Arc<dyn WorldEditor>>,
}

impl ServiceState {
    pub(super) fn new(
        config: Arc<PluginConfig>,
        storage: SharedStorage,
        saves: SaveQueue,
        editor: Option<Arc<dyn WorldEditor>>,
    ) -> ServiceState {
        let incremental = lock(&storage).supports_incremental();
        let worlds = config
            .worlds
            .iter()
            .map(|(name, world)| (name.clone(), PlotWorld::new(world.clone())))
            .collect();
        ServiceState {
            config,
            worlds,
            homes: FxHashMap::default(),
            orphaned: WorldRecords::new(),
            storage,
            incremental,
            saves,
            editor,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn world(&self, name: &str) -> Option<&PlotWorld> {
        self.worlds.get(name)
    }

    pub fn worlds(&self) -> impl Iterator<Item = &PlotWorld> {
        self.worlds.values()
    }

    pub fn plot(&self, world: &str, id: PlotId) -> Option<&Plot> {
        self.worlds.get(world)?.plot(id)
    }

    /// Replaces all state with what storage holds.
    pub fn load(&mut self) -> Result<(), StorageError> {
        let mut stored = {
            let mut storage = lock(&self.storage);
            info!("Loading plots from {} storage", storage.name());
            storage.load()?
        };
        let had_data = !stored.is_empty();

        self.worlds.clear();
        self.homes.clear();
        for (name, config) in &self.config.worlds {
            let mut world = PlotWorld::new(config.clone());
            if let Some(records) = stored.remove(name) {
                world.load_plots(records.into_iter().map(|((x, z), record)| {
                    Plot::from_record(name, PlotId::new(x, z), record)
                }));
                if world.normalize_merges() {
                    info!("Repaired broken plot merges in {}", name);
                }
            }
            self.worlds.insert(name.clone(), world);
        }

        for (name, records) in &stored {
            warn!(
                "Keeping {} stored plots of unconfigured world {}",
                records.len(),
                name
            );
        }
        self.orphaned = stored;
        self.rebuild_owner_indexes();

        if had_data && self.worlds.is_empty() {
            warn!("Plot data exists but no plot worlds are configured.");
        }
        let count: usize = self.worlds.values().map(|world| world.plots().len()).sum();
        info!("Loaded {} plots in {} worlds", count, self.worlds.len());
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.worlds.values().any(PlotWorld::has_changes)
    }

    /// Collects the changes since the last save. Incremental backends get
    /// only the touched plots.
    pub fn take_save_job(&mut self) -> Option<SaveJob> {
        if !self.has_changes() {
            return None;
        }
        if self.incremental {
            let mut changes = ChangeSet::default();
            for (name, world) in &mut self.worlds {
                if world.has_changes() {
                    changes.worlds.insert(name.clone(), world.take_changes());
                }
            }
            return Some(SaveJob::Incremental(changes));
        }
        let mut records = self.orphaned.clone();
        for (name, world) in &mut self.worlds {
            world.clear_changes();
            let plots = world.records();
            if !plots.is_empty() {
                records.insert(name.clone(), plots);
            }
        }
        Some(SaveJob::Full(records))
    }

    /// Queues the current changes on the save thread.
    pub fn submit_save(&mut self) -> Option<u64> {
        let job = self.take_save_job();
        self.saves.submit(job)
    }

    /// Every stored plot, including those of unconfigured worlds.
    pub fn snapshot(&self) -> WorldRecords {
        let mut records = self.orphaned.clone();
        for (name, world) in &self.worlds {
            let plots = world.records();
            if !plots.is_empty() {
                records.insert(name.clone(), plots);
            }
        }
        records
    }

    pub fn resolve_plot(&self, world: &str, x: i32, z: i32) -> Option<PlotLocation> {
        let id = self.worlds.get(world)?.plot_id_at(x, z)?;
        Some(PlotLocation::new(world, id))
    }

    pub fn count_owned_plots(&self, world: &str, owner: u128) -> usize {
        self.worlds
            .get(world)
            .map_or(0, |world| world.count_owned_plots(owner))
    }

    pub fn find_next_free_plot_id(&self, world: &str) -> Option<PlotId> {
        Some(self.worlds.get(world)?.find_next_free_plot_id())
    }

    pub fn find_home_plot(&self, owner: u128) -> Option<PlotLocation> {
        self.homes.get(&owner).cloned()
    }

    /// The last known name of a plot owner.
    pub fn resolve_player_name(&self, player: u128) -> Option<String> {
        self.worlds
            .values()
            .flat_map(|world| world.plots().values())
            .filter(|plot| plot.is_owner(player))
            .find_map(|plot| plot.owner_name().map(str::to_owned))
    }

    pub fn claim_plot(
        &mut self,
        world_name: &str,
        id: PlotId,
        owner: u128,
        owner_name: Option<String>,
        max_plots: u32,
    ) -> ClaimResult {
        let Some(world) = self.worlds.get_mut(world_name) else {
            return ClaimResult::Failed;
        };
        if world.plot(id).is_some_and(Plot::is_claimed) {
            return ClaimResult::AlreadyClaimed;
        }
        if max_plots > 0 && world.count_owned_plots(owner) >= max_plots as usize {
            return ClaimResult::TooMany;
        }
        world.claim_plot(id, owner, owner_name);
        if !self.homes.contains_key(&owner) {
            world.update_plot(id, |plot| plot.set_home(true));
            self.homes.insert(owner, PlotLocation::new(world_name, id));
        }
        debug!("Plot {} in {} claimed", id, world_name);
        ClaimResult::Success
    }

    fn check_owned(
        &self,
        world: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
    ) -> OwnerActionResult {
        let Some(plot) = self.plot(world, id).filter(|plot| plot.is_claimed()) else {
            return OwnerActionResult::Unclaimed;
        };
        if !bypass && !plot.is_owner(requester) {
            return OwnerActionResult::NotOwner;
        }
        OwnerActionResult::Success
    }

    fn repaint(&self, world_name: &str, id: PlotId, dir: MergeDirection) {
        let (Some(editor), Some(world)) = (&self.editor, self.worlds.get(world_name)) else {
            return;
        };
        repaint_merge_road(world, editor.as_ref(), id, dir);
    }

    pub fn delete_plot(
        &mut self,
        world_name: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
    ) -> OwnerActionResult {
        let check = self.check_owned(world_name, id, requester, bypass);
        if check != OwnerActionResult::Success {
            return check;
        }
        let Some(world) = self.worlds.get_mut(world_name) else {
            return OwnerActionResult::Unclaimed;
        };
        let dirs = world.clear_merged_connections(id);
        let removed = world.remove_plot(id);
        for dir in dirs {
            self.repaint(world_name, id, dir);
        }

        if let Some(owner) = removed.as_ref().and_then(Plot::owner) {
            let location = PlotLocation::new(world_name, id);
            let was_home = removed.as_ref().is_some_and(Plot::is_home)
                || self.homes.get(&owner) == Some(&location);
            if was_home {
                self.recompute_owner_home(owner);
            }
        }
        debug!("Plot {} in {} deleted", id, world_name);
        OwnerActionResult::Success
    }

    pub fn set_home_plot(&mut self, owner: u128, world_name: &str, id: PlotId) -> OwnerActionResult {
        let check = self.check_owned(world_name, id, owner, false);
        if check != OwnerActionResult::Success {
            return check;
        }
        let location = PlotLocation::new(world_name, id);
        if let Some(old) = self.homes.get(&owner).filter(|old| **old != location).cloned() {
            if let Some(world) = self.worlds.get_mut(&old.world) {
                world.update_plot(old.id, |plot| plot.is_owner(owner) && plot.set_home(false));
            }
        }
        if let Some(world) = self.worlds.get_mut(world_name) {
            world.update_plot(id, |plot| plot.set_home(true));
        }
        self.homes.insert(owner, location);
        OwnerActionResult::Success
    }

    pub fn set_plot_owner(
        &mut self,
        world_name: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
        new_owner: u128,
        new_owner_name: Option<String>,
    ) -> OwnerActionResult {
        let check = self.check_owned(world_name, id, requester, bypass);
        if check != OwnerActionResult::Success {
            return check;
        }
        let Some(world) = self.worlds.get_mut(world_name) else {
            return OwnerActionResult::Unclaimed;
        };
        let Some(old_owner) = world.plot(id).and_then(Plot::owner) else {
            return OwnerActionResult::Unclaimed;
        };
        if old_owner == new_owner {
            world.update_plot(id, |plot| plot.set_owner(Some(new_owner), new_owner_name));
            return OwnerActionResult::Success;
        }

        let dirs = world.clear_merged_connections(id);
        world.update_plot(id, |plot| plot.set_owner(Some(new_owner), new_owner_name));
        for dir in dirs {
            self.repaint(world_name, id, dir);
        }
        self.recompute_owner_home(old_owner);
        if !self.homes.contains_key(&new_owner) {
            if let Some(world) = self.worlds.get_mut(world_name) {
                world.update_plot(id, |plot| plot.set_home(true));
            }
            self.homes.insert(new_owner, PlotLocation::new(world_name, id));
        }
        OwnerActionResult::Success
    }

    pub fn merge_plots(
        &mut self,
        world_name: &str,
        id: PlotId,
        dir: MergeDirection,
        requester: u128,
        bypass: bool,
    ) -> MergeResult {
        match self.check_owned(world_name, id, requester, bypass) {
            OwnerActionResult::Success => {}
            OwnerActionResult::Unclaimed => return MergeResult::Unclaimed,
            OwnerActionResult::NotOwner => return MergeResult::NotOwner,
        }
        let Some(world) = self.worlds.get_mut(world_name) else {
            return MergeResult::Failed;
        };
        let Some(source) = world.plot(id).cloned() else {
            return MergeResult::Failed;
        };
        let target_id = PlotWorld::adjacent(id, dir);
        let Some(target) = world.plot(target_id).filter(|plot| plot.is_claimed()) else {
            return MergeResult::TargetUnclaimed;
        };
        if target.owner() != source.owner() {
            return MergeResult::NotSameOwner;
        }
        if world.is_merged(id, dir) {
            return MergeResult::AlreadyMerged;
        }
        if !world.set_merged(id, dir, true) {
            return MergeResult::Failed;
        }

        for member in world.merge_group(id) {
            if member != id {
                world.update_plot(member, |plot| plot.copy_settings_from(&source));
            }
        }
        self.repaint(world_name, id, dir);
        debug!("Plot {} in {} merged {}", id, world_name, dir);
        MergeResult::Success
    }

    pub fn unmerge_plots(
        &mut self,
        world_name: &str,
        id: PlotId,
        dir: MergeDirection,
        requester: u128,
        bypass: bool,
    ) -> UnmergeResult {
        match self.check_owned(world_name, id, requester, bypass) {
            OwnerActionResult::Success => {}
            OwnerActionResult::Unclaimed => return UnmergeResult::Unclaimed,
            OwnerActionResult::NotOwner => return UnmergeResult::NotOwner,
        }
        let Some(world) = self.worlds.get_mut(world_name) else {
            return UnmergeResult::Failed;
        };
        if !world.is_merged(id, dir) {
            return UnmergeResult::NotMerged;
        }
        if !world.set_merged(id, dir, false) {
            return UnmergeResult::Failed;
        }
        self.repaint(world_name, id, dir);
        debug!("Plot {} in {} unmerged {}", id, world_name, dir);
        UnmergeResult::Success
    }

    /// Applies `updater` to every plot of the merge group that shares the
    /// owner of `id`.
    pub fn update_merge_group_owned(
        &mut self,
        world_name: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
        updater: &mut dyn FnMut(&mut Plot) -> bool,
    ) -> OwnerActionResult {
        let check = self.check_owned(world_name, id, requester, bypass);
        if check != OwnerActionResult::Success {
            return check;
        }
        let Some(world) = self.worlds.get_mut(world_name) else {
            return OwnerActionResult::Unclaimed;
        };
        let owner = world.plot(id).and_then(Plot::owner);
        for member in world.merge_group(id) {
            world.update_plot(member, |plot| plot.owner() == owner && updater(plot));
        }
        OwnerActionResult::Success
    }

    /// Points every owner at a home plot. A plot flagged as home wins,
    /// otherwise the owner's first plot is flagged.
    fn rebuild_owner_indexes(&mut self) {
        self.homes.clear();
        let mut fallback: FxHashMap<u128, PlotLocation> = FxHashMap::default();
        for (name, world) in &self.worlds {
            for id in sorted_ids(world) {
                let Some(plot) = world.plot(id) else { continue };
                let Some(owner) = plot.owner() else { continue };
                let location = PlotLocation::new(name, id);
                if plot.is_home() {
                    self.homes.entry(owner).or_insert(location);
                } else {
                    fallback.entry(owner).or_insert(location);
                }
            }
        }
        for (owner, location) in fallback {
            if self.homes.contains_key(&owner) {
                continue;
            }
            if let Some(world) = self.worlds.get_mut(&location.world) {
                world.update_plot(location.id, |plot| plot.set_home(true));
            }
            self.homes.insert(owner, location);
        }
    }

    fn recompute_owner_home(&mut self, owner: u128) {
        self.homes.remove(&owner);
        let mut fallback = None;
        for (name, world) in &self.worlds {
            for id in sorted_ids(world) {
                let Some(plot) = world.plot(id).filter(|plot| plot.is_owner(owner)) else {
                    continue;
                };
                if plot.is_home() {
                    self.homes.insert(owner, PlotLocation::new(name, id));
                    return;
                }
                if fallback.is_none() {
                    fallback = Some(PlotLocation::new(name, id));
                }
            }
        }
        if let Some(location) = fallback {
            if let Some(world) = self.worlds.get_mut(&location.world) {
                world.update_plot(location.id, |plot| plot.set_home(true));
            }
            self.homes.insert(owner, location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allayplots_save_data::{PlotRecord, PlotStorage, SqliteStorage, YamlStorage};
    use std::sync::Mutex;

    const ALICE: u128 = 0xa;
    const BOB: u128 = 0xb;

    fn state_with(storage: Box<dyn PlotStorage>) -> ServiceState {
        let mut config = PluginConfig::default();
        config.apply_world_names();
        ServiceState::new(
            Arc::new(config),
            Arc::new(Mutex::new(storage)),
            SaveQueue::default(),
            None,
        )
    }

    fn state() -> ServiceState {
        state_with(Box::new(SqliteStorage::in_memory().unwrap()))
    }

    fn claim(state: &mut ServiceState, x: i32, z: i32, owner: u128) -> PlotId {
        let id = PlotId::new(x, z);
        assert_eq!(
            state.claim_plot("plotworld", id, owner, Some(format!("{:x}", owner)), 0),
            ClaimResult::Success
        );
        id
    }

    #[test]
    fn claim_rules() {
        let mut state = state();
        let id = PlotId::new(0, 0);
        assert_eq!(state.claim_plot("nowhere", id, ALICE, None, 2), ClaimResult::Failed);
        assert_eq!(state.claim_plot("plotworld", id, ALICE, None, 1), ClaimResult::Success);
        assert_eq!(state.claim_plot("plotworld", id, BOB, None, 1), ClaimResult::AlreadyClaimed);
        assert_eq!(
            state.claim_plot("plotworld", PlotId::new(1, 0), ALICE, None, 1),
            ClaimResult::TooMany
        );
        assert!(state.plot("plotworld", id).unwrap().is_home());
        assert_eq!(state.find_home_plot(ALICE), Some(PlotLocation::new("plotworld", id)));
    }

    #[test]
    fn second_claim_is_not_home() {
        let mut state = state();
        claim(&mut state, 0, 0, ALICE);
        let second = claim(&mut state, 1, 0, ALICE);
        assert!(!state.plot("plotworld", second).unwrap().is_home());
    }

    #[test]
    fn delete_moves_home() {
        let mut state = state();
        let first = claim(&mut state, 0, 0, ALICE);
        let second = claim(&mut state, 3, 3, ALICE);
        assert_eq!(state.delete_plot("plotworld", first, BOB, false), OwnerActionResult::NotOwner);
        assert_eq!(state.delete_plot("plotworld", first, ALICE, false), OwnerActionResult::Success);
        assert!(state.plot("plotworld", first).is_none());
        assert_eq!(state.find_home_plot(ALICE), Some(PlotLocation::new("plotworld", second)));
        assert!(state.plot("plotworld", second).unwrap().is_home());

        assert_eq!(state.delete_plot("plotworld", second, BOB, true), OwnerActionResult::Success);
        assert_eq!(state.find_home_plot(ALICE), None);
        assert_eq!(
            state.delete_plot("plotworld", second, ALICE, false),
            OwnerActionResult::Unclaimed
        );
    }

    #[test]
    fn set_home_moves_flag() {
        let mut state = state();
        let first = claim(&mut state, 0, 0, ALICE);
        let second = claim(&mut state, 1, 0, ALICE);
        let foreign = claim(&mut state, 2, 0, BOB);
        assert_eq!(state.set_home_plot(ALICE, "plotworld", foreign), OwnerActionResult::NotOwner);
        assert_eq!(state.set_home_plot(ALICE, "plotworld", second), OwnerActionResult::Success);
        assert!(!state.plot("plotworld", first).unwrap().is_home());
        assert!(state.plot("plotworld", second).unwrap().is_home());
        assert_eq!(state.find_home_plot(ALICE).unwrap().id, second);
    }

    #[test]
    fn set_owner_transfers_plot() {
        let mut state = state();
        let home = claim(&mut state, 0, 0, ALICE);
        let other = claim(&mut state, 1, 0, ALICE);
        state.merge_plots("plotworld", home, MergeDirection::East, ALICE, false);

        assert_eq!(
            state.set_plot_owner("plotworld", home, ALICE, false, BOB, Some("b".to_owned())),
            OwnerActionResult::Success
        );
        let plot = state.plot("plotworld", home).unwrap();
        assert!(plot.is_owner(BOB));
        assert!(plot.is_home());
        assert!(plot.merged_directions().is_empty());
        assert!(!state.plot("plotworld", other).unwrap().has_merge(MergeDirection::West));
        assert_eq!(state.find_home_plot(ALICE).unwrap().id, other);
        assert_eq!(state.find_home_plot(BOB).unwrap().id, home);

        // Same owner only renames.
        assert_eq!(
            state.set_plot_owner("plotworld", home, BOB, false, BOB, Some("bobby".to_owned())),
            OwnerActionResult::Success
        );
        assert_eq!(state.plot("plotworld", home).unwrap().owner_name(), Some("bobby"));
        assert!(state.plot("plotworld", home).unwrap().is_home());
    }

    #[test]
    fn merge_results() {
        let mut state = state();
        let a = claim(&mut state, 0, 0, ALICE);
        claim(&mut state, 1, 0, ALICE);
        claim(&mut state, 0, 1, BOB);
        let merge = |state: &mut ServiceState, dir, requester| {
            state.merge_plots("plotworld", a, dir, requester, false)
        };
        assert_eq!(
            state.merge_plots("plotworld", PlotId::new(5, 5), MergeDirection::East, ALICE, false),
            MergeResult::Unclaimed
        );
        assert_eq!(merge(&mut state, MergeDirection::East, BOB), MergeResult::NotOwner);
        assert_eq!(merge(&mut state, MergeDirection::West, ALICE), MergeResult::TargetUnclaimed);
        assert_eq!(merge(&mut state, MergeDirection::South, ALICE), MergeResult::NotSameOwner);
        assert_eq!(merge(&mut state, MergeDirection::East, ALICE), MergeResult::Success);
        assert_eq!(merge(&mut state, MergeDirection::East, ALICE), MergeResult::AlreadyMerged);
        assert_eq!(
            state.merge_plots("nowhere", a, MergeDirection::East, ALICE, false),
            MergeResult::Unclaimed
        );
    }

    #[test]
    fn merge_syncs_group_settings() {
        let mut state = state();
        let a = claim(&mut state, 0, 0, ALICE);
        let b = claim(&mut state, 1, 0, ALICE);
        state
            .worlds
            .get_mut("plotworld")
            .unwrap()
            .update_plot(a, |plot| plot.add_trusted(BOB));
        state
            .worlds
            .get_mut("plotworld")
            .unwrap()
            .update_plot(b, |plot| plot.add_denied(BOB));

        state.merge_plots("plotworld", a, MergeDirection::East, ALICE, false);
        let b_plot = state.plot("plotworld", b).unwrap();
        assert!(b_plot.trusted().contains(&BOB));
        assert!(b_plot.denied().is_empty());
    }

    #[test]
    fn unmerge_results() {
        let mut state = state();
        let a = claim(&mut state, 0, 0, ALICE);
        claim(&mut state, 1, 0, ALICE);
        assert_eq!(
            state.unmerge_plots("plotworld", a, MergeDirection::East, ALICE, false),
            UnmergeResult::NotMerged
        );
        state.merge_plots("plotworld", a, MergeDirection::East, ALICE, false);
        assert_eq!(
            state.unmerge_plots("plotworld", a, MergeDirection::East, BOB, false),
            UnmergeResult::NotOwner
        );
        assert_eq!(
            state.unmerge_plots("plotworld", a, MergeDirection::East, BOB, true),
            UnmergeResult::Success
        );
        assert!(!state.world("plotworld").unwrap().is_merged(a, MergeDirection::East));
    }

    #[test]
    fn group_update_applies_to_owned_members() {
        let mut state = state();
        let a = claim(&mut state, 0, 0, ALICE);
        let b = claim(&mut state, 1, 0, ALICE);
        let lone = claim(&mut state, 2, 0, ALICE);
        state.merge_plots("plotworld", a, MergeDirection::East, ALICE, false);

        let result = state.update_merge_group_owned("plotworld", b, ALICE, false, &mut |plot| {
            plot.add_trusted(BOB)
        });
        assert_eq!(result, OwnerActionResult::Success);
        assert!(state.plot("plotworld", a).unwrap().trusted().contains(&BOB));
        assert!(state.plot("plotworld", b).unwrap().trusted().contains(&BOB));
        assert!(!state.plot("plotworld", lone).unwrap().trusted().contains(&BOB));
    }

    #[test]
    fn load_rebuilds_homes_and_repairs_merges() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = YamlStorage::new(dir.path());
        let mut records = WorldRecords::new();
        let plots = records.entry("plotworld".to_owned()).or_default();
        plots.insert(
            (0, 0),
            PlotRecord {
                owner: Some(ALICE),
                merged: ["east".to_owned()].into_iter().collect(),
                ..Default::default()
            },
        );
        plots.insert(
            (1, 0),
            PlotRecord {
                owner: Some(BOB),
                home: true,
                merged: ["west".to_owned()].into_iter().collect(),
                ..Default::default()
            },
        );
        records.entry("oldworld".to_owned()).or_default().insert(
            (4, 4),
            PlotRecord {
                owner: Some(ALICE),
                ..Default::default()
            },
        );
        storage.save(&records).unwrap();

        let mut state = state_with(Box::new(storage));
        state.load().unwrap();
        let a = state.plot("plotworld", PlotId::new(0, 0)).unwrap();
        assert!(a.merged_directions().is_empty());
        assert!(a.is_home());
        assert_eq!(state.find_home_plot(ALICE).unwrap().id, PlotId::new(0, 0));
        assert_eq!(state.find_home_plot(BOB).unwrap().id, PlotId::new(1, 0));
        assert!(state.has_changes());

        let Some(SaveJob::Full(saved)) = state.take_save_job() else {
            panic!("expected a full save for yaml storage");
        };
        assert!(saved.contains_key("oldworld"));
        assert!(saved["plotworld"][&(0, 0)].merged.is_empty());
        assert!(state.take_save_job().is_none());
    }

    #[test]
    fn incremental_job_for_database() {
        let mut state = state();
        let a = claim(&mut state, 0, 0, ALICE);
        state.take_save_job();
        state.delete_plot("plotworld", a, ALICE, false);
        let Some(SaveJob::Incremental(changes)) = state.take_save_job() else {
            panic!("expected an incremental save for sqlite storage");
        };
        assert!(changes.worlds["plotworld"].deletes.contains(&(0, 0)));
    }

    #[test]
    fn player_names() {
        let mut state = state();
        claim(&mut state, 0, 0, ALICE);
        assert_eq!(state.resolve_player_name(ALICE).as_deref(), Some("a"));
        assert_eq!(state.resolve_player_name(BOB), None);
        assert_eq!(
            state.resolve_plot("plotworld", 10, 10),
            Some(PlotLocation::new("plotworld", PlotId::new(0, 0)))
        );
        assert_eq!(state.resolve_plot("plotworld", 38, 10), None);
        assert_eq!(state.count_owned_plots("plotworld", ALICE), 1);
        assert_eq!(state.find_next_free_plot_id("plotworld"), Some(PlotId::new(-1, -1)));
    }
}
