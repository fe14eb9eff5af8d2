use allayplots_save_data::{MySqlSettings, StorageKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not access config file")]
    Io(#[from] io::Error),

    #[error("config file is not valid yaml")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct EconomyConfig {
    pub enabled: bool,
    /// Currency id. Empty means the economy's default currency.
    pub currency: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct SettingsConfig {
    pub protect_roads: bool,
    /// Zero disables auto saving.
    pub auto_save_interval_ticks: u32,
    pub use_action_bar: bool,
}

impl Default for SettingsConfig {
    fn default() -> SettingsConfig {
        SettingsConfig {
            protect_roads: true,
            auto_save_interval_ticks: 6000,
            use_action_bar: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub mysql: MySqlSettings,
}

impl Default for StorageConfig {
    fn default() -> StorageConfig {
        StorageConfig {
            kind: "yaml".to_owned(),
            mysql: MySqlSettings::default(),
        }
    }
}

impl StorageConfig {
    /// The configured backend. Unknown names fall back to yaml.
    pub fn storage_kind(&self) -> StorageKind {
        match self.kind.parse() {
            Ok(kind) => kind,
            Err(err) => {
                warn!("{}, falling back to yaml", err);
                StorageKind::Yaml
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlotWorldConfig {
    #[serde(skip)]
    pub world_name: String,
    pub plot_size: i32,
    pub road_size: i32,
    pub ground_y: i32,
    /// Zero means unlimited.
    pub max_plots_per_player: u32,
    pub claim_price: f64,
    pub sell_refund: f64,
    pub teleport_on_claim: bool,
    pub road_edge_block: String,
    pub road_corner_block: String,
}

impl Default for PlotWorldConfig {
    fn default() -> PlotWorldConfig {
        PlotWorldConfig {
            world_name: "plotworld".to_owned(),
            plot_size: 35,
            road_size: 7,
            ground_y: 64,
            max_plots_per_player: 2,
            claim_price: 100.0,
            sell_refund: 50.0,
            teleport_on_claim: true,
            road_edge_block: "minecraft:smooth_stone_slab".to_owned(),
            road_corner_block: "minecraft:smooth_stone_slab".to_owned(),
        }
    }
}

impl PlotWorldConfig {
    pub fn named(world_name: &str) -> PlotWorldConfig {
        PlotWorldConfig {
            world_name: world_name.to_owned(),
            ..Default::default()
        }
    }

    pub fn total_size(&self) -> i32 {
        self.plot_size + self.road_size
    }

    fn clamp_sizes(&mut self) {
        if self.plot_size < 1 {
            warn!(
                "World {} has plot-size {}, using 1",
                self.world_name, self.plot_size
            );
            self.plot_size = 1;
        }
        if self.road_size < 0 {
            warn!(
                "World {} has road-size {}, using 0",
                self.world_name, self.road_size
            );
            self.road_size = 0;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PluginConfig {
    pub economy: EconomyConfig,
    pub settings: SettingsConfig,
    pub storage: StorageConfig,
    pub worlds: IndexMap<String, PlotWorldConfig>,
}

impl Default for PluginConfig {
    fn default() -> PluginConfig {
        let mut worlds = IndexMap::new();
        worlds.insert("plotworld".to_owned(), PlotWorldConfig::default());
        PluginConfig {
            economy: EconomyConfig::default(),
            settings: SettingsConfig::default(),
            storage: StorageConfig::default(),
            worlds,
        }
    }
}

impl PluginConfig {
    fn read_raw(path: &Path) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(str) => Ok(Some(str)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn parse(existing: Option<&str>) -> Result<(serde_yaml_ng::Value, PluginConfig), ConfigError> {
        let original: serde_yaml_ng::Value = match existing {
            Some(str) if !str.trim().is_empty() => serde_yaml_ng::from_str(str)?,
            _ => serde_yaml_ng::Value::Null,
        };
        let config = if original.is_null() {
            PluginConfig::default()
        } else {
            serde_yaml_ng::from_value(original.clone())?
        };
        Ok((original, config))
    }

    fn finish(mut self) -> PluginConfig {
        self.apply_world_names();
        if self.worlds.is_empty() {
            warn!("No plot worlds configured. Add entries under worlds in config.yml.");
        }
        self
    }

    /// Loads `config.yml` from the data folder, writing missing keys back to
    /// the file. Unknown keys are dropped from the rewritten file.
    pub fn load(data_folder: &Path) -> Result<PluginConfig, ConfigError> {
        let path = data_folder.join(CONFIG_FILE);
        let existing = Self::read_raw(&path)?;
        let (original, config) = Self::parse(existing.as_deref())?;

        let patched = serde_yaml_ng::to_value(&config)?;
        if patched != original {
            if existing.is_none() {
                info!("Writing default config to {}", path.display());
            } else {
                info!("Filling in missing keys of {}", path.display());
            }
            fs::create_dir_all(data_folder)?;
            fs::write(&path, serde_yaml_ng::to_string(&patched)?)?;
        }
        Ok(config.finish())
    }

    /// Like [`PluginConfig::load`] but never touches the data folder.
    pub fn read(data_folder: &Path) -> Result<PluginConfig, ConfigError> {
        let existing = Self::read_raw(&data_folder.join(CONFIG_FILE))?;
        let (_, config) = Self::parse(existing.as_deref())?;
        Ok(config.finish())
    }

    pub fn world(&self, world_name: &str) -> Option<&PlotWorldConfig> {
        self.worlds.get(world_name)
    }

    pub fn apply_world_names(&mut self) {
        for (name, world) in &mut self.worlds {
            if !name.trim().is_empty() {
                world.world_name = name.clone();
            }
            world.clamp_sizes();
        }
    }
}
