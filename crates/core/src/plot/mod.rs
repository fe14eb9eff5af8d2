mod bounds;
pub mod commands;
mod direction;
mod flag;
mod id;
pub mod listeners;
pub mod roads;
pub mod service;
mod world;

pub use bounds::PlotBounds;
pub use direction::MergeDirection;
pub use flag::{PlotFlag, format_bool, is_reset, parse_bool};
pub use id::{PlotId, PlotIdParseError};
pub use world::PlotWorld;

use allayplots_save_data::{HyphenatedUUID, PlotRecord};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::warn;

/// A single plot cell and everything attached to it.
///
/// Mutators return whether the plot actually changed so callers can track
/// what needs saving.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    world_name: String,
    id: PlotId,
    owner: Option<u128>,
    owner_name: Option<String>,
    home: bool,
    trusted: FxHashSet<u128>,
    denied: FxHashSet<u128>,
    flags: FxHashMap<String, String>,
    merged: BTreeSet<MergeDirection>,
}

impl Plot {
    pub fn new(world_name: &str, id: PlotId) -> Plot {
        Plot {
            world_name: world_name.to_owned(),
            id,
            owner: None,
            owner_name: None,
            home: false,
            trusted: Default::default(),
            denied: Default::default(),
            flags: Default::default(),
            merged: Default::default(),
        }
    }

    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn owner(&self) -> Option<u128> {
        self.owner
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    /// The owner's name, or their uuid when the name is unknown.
    pub fn owner_display(&self) -> Option<String> {
        match (&self.owner_name, self.owner) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(owner)) => Some(HyphenatedUUID(owner).to_string()),
            (None, None) => None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owner(&self, player: u128) -> bool {
        self.owner == Some(player)
    }

    /// Changing the owner resets every setting of the plot. Giving the same
    /// owner only updates the stored name.
    pub fn set_owner(&mut self, owner: Option<u128>, owner_name: Option<String>) -> bool {
        if self.owner != owner {
            let mut reset = Plot::new(&self.world_name, self.id);
            if owner.is_some() {
                reset.owner = owner;
                reset.owner_name = owner_name;
            }
            *self = reset;
            return true;
        }
        if owner.is_none() || self.owner_name == owner_name {
            return false;
        }
        self.owner_name = owner_name;
        true
    }

    pub fn set_owner_name(&mut self, owner_name: Option<String>) -> bool {
        if self.owner.is_none() || self.owner_name == owner_name {
            return false;
        }
        self.owner_name = owner_name;
        true
    }

    pub fn is_home(&self) -> bool {
        self.home
    }

    pub fn set_home(&mut self, home: bool) -> bool {
        if self.home == home {
            return false;
        }
        self.home = home;
        true
    }

    pub fn trusted(&self) -> &FxHashSet<u128> {
        &self.trusted
    }

    pub fn denied(&self) -> &FxHashSet<u128> {
        &self.denied
    }

    pub fn add_trusted(&mut self, player: u128) -> bool {
        self.trusted.insert(player)
    }

    pub fn remove_trusted(&mut self, player: u128) -> bool {
        self.trusted.remove(&player)
    }

    pub fn add_denied(&mut self, player: u128) -> bool {
        self.denied.insert(player)
    }

    pub fn remove_denied(&mut self, player: u128) -> bool {
        self.denied.remove(&player)
    }

    pub fn flags(&self) -> &FxHashMap<String, String> {
        &self.flags
    }

    pub fn flag(&self, flag: PlotFlag) -> bool {
        self.flags
            .get(flag.name())
            .and_then(|raw| parse_bool(raw))
            .unwrap_or_else(|| flag.default_value())
    }

    pub fn flag_raw(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    /// Stores the default value by removing the key.
    pub fn set_flag(&mut self, flag: PlotFlag, value: bool) -> bool {
        if value == flag.default_value() {
            return self.remove_flag(flag.name());
        }
        self.set_flag_raw(flag.name(), format_bool(value))
    }

    /// A blank value removes the flag. Blank keys are ignored.
    pub fn set_flag_raw(&mut self, key: &str, value: &str) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        if value.trim().is_empty() {
            return self.remove_flag(key);
        }
        if self.flags.get(key).map(String::as_str) == Some(value) {
            return false;
        }
        self.flags.insert(key.to_owned(), value.to_owned());
        true
    }

    pub fn remove_flag(&mut self, key: &str) -> bool {
        self.flags.remove(key).is_some()
    }

    pub fn merged_directions(&self) -> &BTreeSet<MergeDirection> {
        &self.merged
    }

    /// Whether this side of the link is set. See [`PlotWorld::is_merged`]
    /// for the effective state.
    pub fn has_merge(&self, dir: MergeDirection) -> bool {
        self.merged.contains(&dir)
    }

    pub fn add_merge(&mut self, dir: MergeDirection) -> bool {
        self.merged.insert(dir)
    }

    pub fn remove_merge(&mut self, dir: MergeDirection) -> bool {
        self.merged.remove(&dir)
    }

    pub fn clear_merges(&mut self) -> bool {
        let changed = !self.merged.is_empty();
        self.merged.clear();
        changed
    }

    /// Copies access lists and flags. Merges and the home marker stay.
    pub fn copy_settings_from(&mut self, source: &Plot) -> bool {
        if self.trusted == source.trusted
            && self.denied == source.denied
            && self.flags == source.flags
        {
            return false;
        }
        self.trusted = source.trusted.clone();
        self.denied = source.denied.clone();
        self.flags = source.flags.clone();
        true
    }

    pub fn can_enter(&self, player: u128) -> bool {
        if self.denied.contains(&player) {
            return false;
        }
        match self.owner {
            None => true,
            Some(owner) => {
                owner == player || self.trusted.contains(&player) || self.flag(PlotFlag::Entry)
            }
        }
    }

    pub fn can_build(&self, player: u128) -> bool {
        // Deny always wins.
        if self.denied.contains(&player) {
            return false;
        }
        match self.owner {
            None => false,
            Some(owner) => {
                owner == player || self.trusted.contains(&player) || self.flag(PlotFlag::Build)
            }
        }
    }

    /// Default plots carry no information and are never persisted.
    pub fn is_default(&self) -> bool {
        self.owner.is_none()
            && !self.home
            && self.trusted.is_empty()
            && self.denied.is_empty()
            && self.flags.is_empty()
            && self.merged.is_empty()
    }

    pub fn from_record(world_name: &str, id: PlotId, record: PlotRecord) -> Plot {
        let mut merged = BTreeSet::new();
        for name in &record.merged {
            match MergeDirection::parse(name) {
                Some(dir) => {
                    merged.insert(dir);
                }
                None => warn!(
                    "Ignoring unknown merge direction {:?} on plot {} in {}",
                    name, id, world_name
                ),
            }
        }
        Plot {
            world_name: world_name.to_owned(),
            id,
            owner: record.owner,
            owner_name: record.owner_name.filter(|_| record.owner.is_some()),
            home: record.home && record.owner.is_some(),
            trusted: record.trusted.into_iter().collect(),
            denied: record.denied.into_iter().collect(),
            flags: record.flags.into_iter().collect(),
            merged,
        }
    }

    pub fn to_record(&self) -> PlotRecord {
        PlotRecord {
            owner: self.owner,
            owner_name: self.owner_name.clone(),
            home: self.home,
            trusted: self.trusted.iter().copied().collect(),
            denied: self.denied.iter().copied().collect(),
            flags: self
                .flags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            merged: self.merged.iter().map(|dir| dir.name().to_owned()).collect(),
        }
    }
}
