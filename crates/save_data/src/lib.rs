//! Persistent plot data.
//!
//! Plots are stored as plain [`PlotRecord`]s keyed by world name and grid
//! position. Three backends exist: a YAML file, an SQLite file and a MySQL
//! server. The database backends can write only what changed since the last
//! save (see [`ChangeSet`]).

mod database;
mod mysql;
mod sqlite;
mod yaml;

pub use self::mysql::{MySqlSettings, MySqlStorage};
pub use self::sqlite::SqliteStorage;
pub use self::yaml::YamlStorage;

use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Plot grid position, `(x, z)`.
pub type GridPos = (i32, i32);

pub type PlotRecords = BTreeMap<GridPos, PlotRecord>;
pub type WorldRecords = BTreeMap<String, PlotRecords>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite storage error")]
    Sqlite(#[from] rusqlite::Error),

    #[error("mysql storage error")]
    MySql(#[from] ::mysql::Error),

    #[error("yaml storage error")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("plot data version {0} too new to be loaded")]
    TooNew(u32),

    #[error("{0} storage does not support incremental saves")]
    IncrementalUnsupported(&'static str),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid uuid {0:?}")]
pub struct InvalidUuid(pub String);

/// A player uuid rendered in the usual `8-4-4-4-12` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HyphenatedUUID(pub u128);

impl fmt::Display for HyphenatedUUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hex = format!("{:032x}", self.0);
        hex.insert(8, '-');
        hex.insert(13, '-');
        hex.insert(18, '-');
        hex.insert(23, '-');
        f.write_str(&hex)
    }
}

impl FromStr for HyphenatedUUID {
    type Err = InvalidUuid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().replace('-', "");
        if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidUuid(s.to_owned()));
        }
        u128::from_str_radix(&hex, 16)
            .map(HyphenatedUUID)
            .map_err(|_| InvalidUuid(s.to_owned()))
    }
}

impl Serialize for HyphenatedUUID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct HyphenatedUUIDVisitor;

impl Visitor<'_> for HyphenatedUUIDVisitor {
    type Value = HyphenatedUUID;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a hyphenated uuid string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for HyphenatedUUID {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(HyphenatedUUIDVisitor)
    }
}

/// Everything stored about a single plot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotRecord {
    pub owner: Option<u128>,
    pub owner_name: Option<String>,
    pub home: bool,
    pub trusted: BTreeSet<u128>,
    pub denied: BTreeSet<u128>,
    /// Raw flag values keyed by lowercase flag name.
    pub flags: BTreeMap<String, String>,
    /// Lowercase merge direction names.
    pub merged: BTreeSet<String>,
}

impl PlotRecord {
    pub fn is_default(&self) -> bool {
        self.owner.is_none()
            && !self.home
            && self.trusted.is_empty()
            && self.denied.is_empty()
            && self.flags.is_empty()
            && self.merged.is_empty()
    }
}

/// Changes to a single world since the last save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldChanges {
    pub upserts: PlotRecords,
    pub deletes: BTreeSet<GridPos>,
}

impl WorldChanges {
    pub fn upsert(&mut self, pos: GridPos, record: PlotRecord) {
        self.deletes.remove(&pos);
        self.upserts.insert(pos, record);
    }

    pub fn delete(&mut self, pos: GridPos) {
        self.upserts.remove(&pos);
        self.deletes.insert(pos);
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Changes across all worlds. A position is either upserted or deleted, never
/// both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub worlds: BTreeMap<String, WorldChanges>,
}

impl ChangeSet {
    pub fn world_mut(&mut self, world: &str) -> &mut WorldChanges {
        self.worlds.entry(world.to_owned()).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.values().all(WorldChanges::is_empty)
    }

    /// Folds a newer change set into this one. The newer state of a position
    /// always wins.
    pub fn merge(&mut self, newer: ChangeSet) {
        for (world, changes) in newer.worlds {
            let target = self.world_mut(&world);
            for pos in changes.deletes {
                target.delete(pos);
            }
            for (pos, record) in changes.upserts {
                target.upsert(pos, record);
            }
        }
    }

    /// Applies the changes to a full record set.
    pub fn apply_to(&self, worlds: &mut WorldRecords) {
        for (world, changes) in &self.worlds {
            let plots = worlds.entry(world.clone()).or_default();
            for pos in &changes.deletes {
                plots.remove(pos);
            }
            for (pos, record) in &changes.upserts {
                plots.insert(*pos, record.clone());
            }
            if plots.is_empty() {
                worlds.remove(world);
            }
        }
    }
}

pub trait PlotStorage: Send {
    /// A human readable backend name used in log messages.
    fn name(&self) -> &'static str;

    fn load(&mut self) -> Result<WorldRecords, StorageError>;

    /// Replaces everything stored with `worlds`.
    fn save(&mut self, worlds: &WorldRecords) -> Result<(), StorageError>;

    fn supports_incremental(&self) -> bool {
        false
    }

    fn save_incremental(&mut self, changes: &ChangeSet) -> Result<(), StorageError> {
        let _ = changes;
        Err(StorageError::IncrementalUnsupported(self.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Yaml,
    Sqlite,
    MySql,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown storage type {0:?}")]
pub struct UnknownStorageKind(pub String);

impl FromStr for StorageKind {
    type Err = UnknownStorageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "yaml" | "yml" => Ok(StorageKind::Yaml),
            "sqlite" => Ok(StorageKind::Sqlite),
            "mysql" => Ok(StorageKind::MySql),
            _ => Err(UnknownStorageKind(s.to_owned())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Yaml => "yaml",
            StorageKind::Sqlite => "sqlite",
            StorageKind::MySql => "mysql",
        })
    }
}

/// Opens the backend of the given kind rooted at `data_folder`.
pub fn open_storage(
    kind: StorageKind,
    data_folder: impl AsRef<Path>,
    mysql: &MySqlSettings,
) -> Result<Box<dyn PlotStorage>, StorageError> {
    let data_folder = data_folder.as_ref();
    std::fs::create_dir_all(data_folder)?;
    Ok(match kind {
        StorageKind::Yaml => Box::new(YamlStorage::new(data_folder)),
        StorageKind::Sqlite => Box::new(SqliteStorage::open(data_folder)?),
        StorageKind::MySql => Box::new(MySqlStorage::connect(mysql)?),
    })
}

/// Parses the `x;z` key used for plots in text formats.
pub(crate) fn parse_grid_key(raw: &str) -> Option<GridPos> {
    let (x, z) = raw.split_once(';')?;
    Some((x.trim().parse().ok()?, z.trim().parse().ok()?))
}

pub(crate) fn grid_key((x, z): GridPos) -> String {
    format!("{};{}", x, z)
}
