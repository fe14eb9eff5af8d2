use crate::{
    HyphenatedUUID, PlotRecord, PlotRecords, PlotStorage, StorageError, WorldRecords, grid_key,
    parse_grid_key,
};
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Version History:
/// 1: Initial plots.yml layout
pub const VERSION: u32 = 1;

pub const FILE_NAME: &str = "plots.yml";

fn current_version() -> u32 {
    VERSION
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Serialize, Debug)]
struct YamlDocument {
    version: u32,
    worlds: BTreeMap<String, YamlWorld>,
}

#[derive(Serialize, Debug)]
struct YamlWorld {
    plots: BTreeMap<String, YamlPlot>,
}

/// The loose shape of a plot file on disk. Worlds and plots stay untyped so a
/// bad entry only costs that entry.
#[derive(Deserialize, Debug, Default)]
struct StoredDocument {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    worlds: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct YamlPlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    trusted: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    denied: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    home: bool,
    // Hand edited files may hold unquoted booleans or numbers here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    flags: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    merged: Vec<String>,
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_uuid_list(raw: &[String], kind: &str, key: &str, world: &str) -> Vec<u128> {
    raw.iter()
        .filter_map(|s| match s.parse::<HyphenatedUUID>() {
            Ok(uuid) => Some(uuid.0),
            Err(_) => {
                warn!("Invalid {} uuid {} for plot {} in {}", kind, s, key, world);
                None
            }
        })
        .collect()
}

impl YamlPlot {
    fn into_record(self, key: &str, world: &str) -> PlotRecord {
        let mut record = PlotRecord::default();

        if let Some(owner) = self.owner.as_deref().filter(|s| !s.trim().is_empty()) {
            match owner.parse::<HyphenatedUUID>() {
                Ok(uuid) => {
                    record.owner = Some(uuid.0);
                    record.owner_name = self.owner_name.filter(|n| !n.trim().is_empty());
                }
                Err(_) => warn!("Invalid owner uuid {} for plot {} in {}", owner, key, world),
            }
        }

        record.trusted = parse_uuid_list(&self.trusted, "trusted", key, world)
            .into_iter()
            .collect();
        record.denied = parse_uuid_list(&self.denied, "denied", key, world)
            .into_iter()
            .collect();
        record.home = self.home && record.owner.is_some();

        for (flag, value) in &self.flags {
            match scalar_to_string(value) {
                Some(value) if !value.trim().is_empty() => {
                    record.flags.insert(flag.to_ascii_lowercase(), value);
                }
                Some(_) => {}
                None => warn!("Invalid value for flag {} of plot {} in {}", flag, key, world),
            }
        }

        record.merged = self
            .merged
            .iter()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        record
    }

    fn from_record(record: &PlotRecord) -> YamlPlot {
        YamlPlot {
            owner: record.owner.map(|o| HyphenatedUUID(o).to_string()),
            owner_name: record
                .owner
                .and(record.owner_name.clone())
                .filter(|n| !n.trim().is_empty()),
            trusted: record
                .trusted
                .iter()
                .map(|u| HyphenatedUUID(*u).to_string())
                .collect(),
            denied: record
                .denied
                .iter()
                .map(|u| HyphenatedUUID(*u).to_string())
                .collect(),
            home: record.home,
            flags: record
                .flags
                .iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            merged: record.merged.iter().cloned().collect(),
        }
    }
}

fn make_backup(path: &Path) -> Result<PathBuf, StorageError> {
    let mut backup_path = path.with_extension("yml.bak");
    let mut num = 1;
    while backup_path.exists() {
        backup_path = path.with_extension(format!("yml.bak.{}", num));
        num += 1;
    }
    fs::rename(path, &backup_path)?;
    Ok(backup_path)
}

/// Stores every world in a single `plots.yml` file.
pub struct YamlStorage {
    path: PathBuf,
}

impl YamlStorage {
    pub fn new(data_folder: impl AsRef<Path>) -> YamlStorage {
        YamlStorage {
            path: data_folder.as_ref().join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<StoredDocument, StorageError> {
        if !self.path.exists() {
            return Ok(StoredDocument::default());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(StoredDocument::default());
        }
        match serde_yaml_ng::from_str::<StoredDocument>(&text) {
            Ok(doc) => Ok(doc),
            Err(err) => {
                error!("Failed to parse {}: {}", self.path.display(), err);
                let backup = make_backup(&self.path)?;
                warn!(
                    "The unreadable plot file was moved to {}, starting with no plots",
                    backup.display()
                );
                Ok(StoredDocument::default())
            }
        }
    }
}

impl PlotStorage for YamlStorage {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn load(&mut self) -> Result<WorldRecords, StorageError> {
        let doc = self.read_document()?;
        if doc.version > VERSION {
            return Err(StorageError::TooNew(doc.version));
        }

        let mut result = WorldRecords::new();
        for (world, section) in doc.worlds {
            let entries = match section.get("plots") {
                Some(Value::Mapping(entries)) => entries.clone(),
                None | Some(Value::Null) => continue,
                Some(_) => {
                    warn!("Skipping world {}: plots is not a section", world);
                    continue;
                }
            };
            let mut plots = PlotRecords::new();
            for (key, value) in entries {
                let Some(key) = scalar_to_string(&key) else {
                    warn!("Skipping invalid plot id {:?} in {}", key, world);
                    continue;
                };
                let Some(pos) = parse_grid_key(&key) else {
                    warn!("Skipping invalid plot id {} in {}", key, world);
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                let plot = match serde_yaml_ng::from_value::<YamlPlot>(value) {
                    Ok(plot) => plot,
                    Err(err) => {
                        warn!("Skipping plot {} in {}: {}", key, world, err);
                        continue;
                    }
                };
                let record = plot.into_record(&key, &world);
                if !record.is_default() {
                    plots.insert(pos, record);
                }
            }
            if !plots.is_empty() {
                result.insert(world, plots);
            }
        }
        debug!("Loaded {} plot worlds from {}", result.len(), self.path.display());
        Ok(result)
    }

    fn save(&mut self, worlds: &WorldRecords) -> Result<(), StorageError> {
        let doc = YamlDocument {
            version: VERSION,
            worlds: worlds
                .iter()
                .map(|(name, plots)| {
                    let plots = plots
                        .iter()
                        .filter(|(_, record)| !record.is_default())
                        .map(|(pos, record)| (grid_key(*pos), YamlPlot::from_record(record)))
                        .collect();
                    (name.clone(), YamlWorld { plots })
                })
                .collect(),
        };
        let text = serde_yaml_ng::to_string(&doc)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("yml.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_data()?;
        drop(file);
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
