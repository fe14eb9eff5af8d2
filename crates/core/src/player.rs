use allayplots_save_data::HyphenatedUUID;
use std::fmt;

/// A position in a named world.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl Location {
    pub fn new(world: &str, x: f64, y: f64, z: f64) -> Location {
        Location {
            world: world.to_owned(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_rotation(mut self, yaw: f64, pitch: f64) -> Location {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn block_x(&self) -> i32 {
        self.x.floor() as i32
    }

    pub fn block_z(&self) -> i32 {
        self.z.floor() as i32
    }

    /// Whether both locations are in the same block column.
    pub fn same_column(&self, other: &Location) -> bool {
        self.world == other.world
            && self.block_x() == other.block_x()
            && self.block_z() == other.block_z()
    }
}

/// An online player, implemented by the host.
pub trait Player: Send + Sync {
    fn uuid(&self) -> u128;

    /// The name shown to other players.
    fn display_name(&self) -> String;

    /// The account name, stored as the plot owner name. Defaults to the
    /// display name.
    fn origin_name(&self) -> String {
        self.display_name()
    }

    fn location(&self) -> Location;

    fn has_permission(&self, node: &str) -> bool;

    fn send_message(&self, message: &str);

    /// Hosts without an action bar show the message in chat.
    fn send_action_bar(&self, message: &str) {
        self.send_message(message);
    }

    fn teleport(&self, location: Location);
}

/// The uuid and name of a player, online or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub uuid: u128,
    pub name: String,
}

impl PlayerProfile {
    pub fn new(uuid: u128, name: &str) -> PlayerProfile {
        PlayerProfile {
            uuid,
            name: name.to_owned(),
        }
    }

    pub fn of(player: &dyn Player) -> PlayerProfile {
        PlayerProfile {
            uuid: player.uuid(),
            name: player.display_name(),
        }
    }
}

impl fmt::Display for PlayerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, HyphenatedUUID(self.uuid))
    }
}

/// Resolves command player arguments.
pub trait PlayerLookup: Send + Sync {
    /// Every online player matching `selector`, usually a name.
    fn find_players(&self, selector: &str) -> Vec<PlayerProfile>;
}
