use crate::config::PluginConfig;
use crate::economy::{Economy, Placeholders};
use crate::events::EventBus;
use crate::generator::{GENERATOR_NAME, PlotChunkGenerator};
use crate::messages::Messages;
use crate::player::PlayerLookup;
use crate::plot::commands::PlotCommand;
use crate::plot::listeners::{DamageListener, MovementListener, ProtectionListener};
use crate::plot::roads::WorldEditor;
use crate::plot::service::PlotService;
use allayplots_save_data::open_storage;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Length of one server tick.
pub const TICK_DURATION: Duration = Duration::from_millis(50);

/// World management of the host.
pub trait WorldHost: Send + Sync {
    /// The generator name of a loaded world, or `None` if it isn't loaded.
    fn loaded_generator(&self, world: &str) -> Option<String>;

    fn load_world(&self, world: &str, generator: PlotChunkGenerator) -> anyhow::Result<()>;
}

/// Everything the host provides. Only player lookup is mandatory.
pub struct HostServices {
    pub players: Arc<dyn PlayerLookup>,
    pub worlds: Option<Arc<dyn WorldHost>>,
    pub editor: Option<Arc<dyn WorldEditor>>,
    pub economy: Option<Arc<dyn Economy>>,
    pub placeholders: Option<Arc<dyn Placeholders>>,
}

impl HostServices {
    pub fn new(players: Arc<dyn PlayerLookup>) -> HostServices {
        HostServices {
            players,
            worlds: None,
            editor: None,
            economy: None,
            placeholders: None,
        }
    }
}

/// Requests a save every interval until dropped.
struct AutoSave {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AutoSave {
    fn spawn(service: Arc<PlotService>, interval: Duration) -> anyhow::Result<AutoSave> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("plot-autosave".to_owned())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                    debug!("Requesting plot auto-save");
                    if let Err(err) = service.request_save() {
                        warn!("Stopping plot auto-save: {}", err);
                        break;
                    }
                }
            })
            .context("failed to spawn auto-save thread")?;
        Ok(AutoSave {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Plot auto-save thread panicked");
            }
        }
    }
}

pub struct AllayPlotsPlugin {
    data_folder: PathBuf,
    config: Arc<PluginConfig>,
    service: Arc<PlotService>,
    events: Arc<EventBus>,
    command: PlotCommand,
    protection: ProtectionListener,
    movement: MovementListener,
    damage: DamageListener,
    autosave: Option<AutoSave>,
}

impl AllayPlotsPlugin {
    /// Builds the chunk generator registered under [`GENERATOR_NAME`].
    pub fn create_generator(preset: &str) -> PlotChunkGenerator {
        PlotChunkGenerator::new(preset)
    }

    pub fn enable(data_folder: &Path, host: HostServices) -> anyhow::Result<AllayPlotsPlugin> {
        fs::create_dir_all(data_folder).context("failed to create plugin data folder")?;

        let config = Arc::new(PluginConfig::load(data_folder).context("failed to load config.yml")?);
        let kind = config.storage.storage_kind();
        let storage = open_storage(kind, data_folder, &config.storage.mysql)
            .with_context(|| format!("failed to open {} plot storage", kind))?;

        let service = Arc::new(PlotService::new(config.clone(), storage, host.editor.clone()));
        service.start().context("failed to start plot service")?;
        service.load().context("failed to load plots")?;

        if let Some(worlds) = &host.worlds {
            ensure_plot_worlds_loaded(&config, worlds.as_ref());
        }

        let mut messages = Messages::load(data_folder).context("failed to load lang.yml")?;
        if let Some(placeholders) = host.placeholders {
            messages = messages.with_placeholders(placeholders);
        }
        let messages = Arc::new(messages);
        let events = Arc::new(EventBus::default());

        let command = PlotCommand::new(
            service.clone(),
            messages.clone(),
            events.clone(),
            host.players,
            host.economy,
        );
        let protection = ProtectionListener::new(service.clone(), messages.clone());
        let movement = MovementListener::new(service.clone(), messages.clone(), events.clone());
        let damage = DamageListener::new(service.clone());

        let ticks = config.settings.auto_save_interval_ticks;
        let autosave = if ticks > 0 {
            Some(AutoSave::spawn(service.clone(), TICK_DURATION * ticks)?)
        } else {
            None
        };

        info!("AllayPlots enabled for {} plot worlds.", config.worlds.len());
        Ok(AllayPlotsPlugin {
            data_folder: data_folder.to_owned(),
            config,
            service,
            events,
            command,
            protection,
            movement,
            damage,
            autosave,
        })
    }

    /// Saves everything and stops the plot threads.
    pub fn disable(mut self) -> anyhow::Result<()> {
        drop(self.autosave.take());
        let saved = self.service.save().context("failed to save plots");
        self.service.shutdown();
        saved
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    pub fn config(&self) -> &Arc<PluginConfig> {
        &self.config
    }

    pub fn service(&self) -> &Arc<PlotService> {
        &self.service
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn command(&self) -> &PlotCommand {
        &self.command
    }

    pub fn protection(&self) -> &ProtectionListener {
        &self.protection
    }

    pub fn movement(&self) -> &MovementListener {
        &self.movement
    }

    pub fn damage(&self) -> &DamageListener {
        &self.damage
    }
}

/// Loads every configured plot world that the host doesn't have yet.
fn ensure_plot_worlds_loaded(config: &PluginConfig, host: &dyn WorldHost) {
    for (name, world_config) in &config.worlds {
        if let Some(generator) = host.loaded_generator(name) {
            if !generator.eq_ignore_ascii_case(GENERATOR_NAME) {
                warn!(
                    "World {} is loaded with generator {}, expected {} for plot worlds.",
                    name, generator, GENERATOR_NAME
                );
            }
            continue;
        }
        let generator = PlotChunkGenerator::from_config(world_config);
        match host.load_world(name, generator) {
            Ok(()) => info!("Loaded plot world {}", name),
            Err(err) => error!("Failed to load plot world {}: {:?}", name, err),
        }
    }
}
