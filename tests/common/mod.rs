#![allow(dead_code)]

use allayplots_core::config::PluginConfig;
use allayplots_core::economy::{Economy, MemoryEconomy};
use allayplots_core::events::EventBus;
use allayplots_core::messages::Messages;
use allayplots_core::permissions::PermissionSet;
use allayplots_core::player::{Location, Player, PlayerLookup, PlayerProfile};
use allayplots_core::plot::commands::{CommandOutput, PlotCommand};
use allayplots_core::plot::listeners::{DamageListener, MovementListener, ProtectionListener};
use allayplots_core::plot::roads::WorldEditor;
use allayplots_core::plot::service::PlotService;
use allayplots_save_data::SqliteStorage;
use std::sync::{Arc, Mutex};

pub const WORLD: &str = "plotworld";

pub struct TestPlayer {
    uuid: u128,
    name: String,
    location: Mutex<Location>,
    permissions: PermissionSet,
    messages: Mutex<Vec<String>>,
    action_bar: Mutex<Vec<String>>,
}

impl TestPlayer {
    pub fn new(uuid: u128, name: &str) -> TestPlayer {
        TestPlayer {
            uuid,
            name: name.to_owned(),
            location: Mutex::new(Location::new(WORLD, 0.5, 65.0, 0.5)),
            permissions: PermissionSet::default(),
            messages: Mutex::new(Vec::new()),
            action_bar: Mutex::new(Vec::new()),
        }
    }

    pub fn with_permission(mut self, node: &str) -> TestPlayer {
        self.permissions = self.permissions.grant(node);
        self
    }

    pub fn without_permission(mut self, node: &str) -> TestPlayer {
        self.permissions.insert(node, false);
        self
    }

    /// Moves the player to block column `x`, `z` of the plot world.
    pub fn at(self, x: i32, z: i32) -> TestPlayer {
        self.move_to(x, z);
        self
    }

    pub fn move_to(&self, x: i32, z: i32) {
        *self.location.lock().unwrap() = Location::new(WORLD, x as f64 + 0.5, 65.0, z as f64 + 0.5);
    }

    pub fn face(&self, yaw: f64) {
        let mut location = self.location.lock().unwrap();
        location.yaw = yaw;
    }

    /// Chat messages with colour codes removed.
    pub fn messages(&self) -> Vec<String> {
        strip(&self.messages.lock().unwrap())
    }

    pub fn action_bar(&self) -> Vec<String> {
        strip(&self.action_bar.lock().unwrap())
    }
}

fn strip(lines: &[String]) -> Vec<String> {
    lines.iter().map(|line| allayplots_text::strip_codes(line)).collect()
}

impl Player for TestPlayer {
    fn uuid(&self) -> u128 {
        self.uuid
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn location(&self) -> Location {
        self.location.lock().unwrap().clone()
    }

    fn has_permission(&self, node: &str) -> bool {
        self.permissions.has(node)
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }

    fn send_action_bar(&self, message: &str) {
        self.action_bar.lock().unwrap().push(message.to_owned());
    }

    fn teleport(&self, location: Location) {
        *self.location.lock().unwrap() = location;
    }
}

#[derive(Default)]
pub struct TestLookup {
    profiles: Mutex<Vec<PlayerProfile>>,
}

impl TestLookup {
    pub fn add(&self, uuid: u128, name: &str) {
        self.profiles.lock().unwrap().push(PlayerProfile::new(uuid, name));
    }
}

impl PlayerLookup for TestLookup {
    fn find_players(&self, selector: &str) -> Vec<PlayerProfile> {
        if selector == "@a" {
            return self.profiles.lock().unwrap().clone();
        }
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|profile| profile.name.eq_ignore_ascii_case(selector))
            .cloned()
            .collect()
    }
}

/// Remembers every block placed through it.
#[derive(Default)]
pub struct RecordingEditor {
    pub blocks: Mutex<Vec<(i32, i32, i32, String)>>,
}

impl RecordingEditor {
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<String> {
        self.blocks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(bx, by, bz, _)| (*bx, *by, *bz) == (x, y, z))
            .map(|(_, _, _, block)| block.clone())
    }
}

impl WorldEditor for RecordingEditor {
    fn height_range(&self, world: &str) -> Option<(i32, i32)> {
        (world == WORLD).then_some((-64, 319))
    }

    fn generator_preset(&self, _world: &str) -> Option<String> {
        None
    }

    fn set_block(&self, _world: &str, x: i32, y: i32, z: i32, block: &str) {
        self.blocks.lock().unwrap().push((x, y, z, block.to_owned()));
    }
}

/// A running plot service with every handler wired up.
pub struct Harness {
    pub service: Arc<PlotService>,
    pub command: PlotCommand,
    pub protection: ProtectionListener,
    pub movement: MovementListener,
    pub damage: DamageListener,
    pub events: Arc<EventBus>,
    pub lookup: Arc<TestLookup>,
    pub economy: Arc<MemoryEconomy>,
    pub editor: Arc<RecordingEditor>,
}

impl Harness {
    pub fn new() -> Harness {
        Harness::with_config(PluginConfig::default())
    }

    pub fn with_config(mut config: PluginConfig) -> Harness {
        config.apply_world_names();
        let config = Arc::new(config);
        let editor = Arc::new(RecordingEditor::default());
        let storage = SqliteStorage::in_memory().unwrap();
        let service = Arc::new(PlotService::new(
            config,
            Box::new(storage),
            Some(editor.clone() as Arc<dyn WorldEditor>),
        ));
        service.start().unwrap();
        service.load().unwrap();

        let messages = Arc::new(Messages::new());
        let events = Arc::new(EventBus::default());
        let lookup = Arc::new(TestLookup::default());
        let economy = Arc::new(MemoryEconomy::default());
        let command = PlotCommand::new(
            service.clone(),
            messages.clone(),
            events.clone(),
            lookup.clone(),
            Some(economy.clone() as Arc<dyn Economy>),
        );
        Harness {
            protection: ProtectionListener::new(service.clone(), messages.clone()),
            movement: MovementListener::new(service.clone(), messages, events.clone()),
            damage: DamageListener::new(service.clone()),
            service,
            command,
            events,
            lookup,
            economy,
            editor,
        }
    }

    /// Runs `/plot` with space separated arguments.
    pub fn run(&self, player: &TestPlayer, args: &str) -> CommandOutput {
        let args: Vec<&str> = args.split_whitespace().collect();
        self.command.execute(player, &args)
    }

    pub fn balance(&self, player: &TestPlayer) -> f64 {
        self.economy.balance(player.uuid(), "coin")
    }
}

/// Command output with colour codes removed, joined by newlines.
pub fn text(output: &CommandOutput) -> String {
    strip(&output.lines).join("\n")
}
