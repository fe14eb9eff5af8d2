use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MergeDirection {
    North,
    East,
    South,
    West,
}

impl MergeDirection {
    pub const ALL: [MergeDirection; 4] = [
        MergeDirection::North,
        MergeDirection::East,
        MergeDirection::South,
        MergeDirection::West,
    ];

    /// Grid offset `(dx, dz)` towards the neighbour.
    pub fn offset(self) -> (i32, i32) {
        match self {
            MergeDirection::North => (0, -1),
            MergeDirection::East => (1, 0),
            MergeDirection::South => (0, 1),
            MergeDirection::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> MergeDirection {
        match self {
            MergeDirection::North => MergeDirection::South,
            MergeDirection::East => MergeDirection::West,
            MergeDirection::South => MergeDirection::North,
            MergeDirection::West => MergeDirection::East,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MergeDirection::North => "north",
            MergeDirection::East => "east",
            MergeDirection::South => "south",
            MergeDirection::West => "west",
        }
    }

    /// Case insensitive. Blank or unknown names give `None`.
    pub fn parse(raw: &str) -> Option<MergeDirection> {
        let raw = raw.trim();
        MergeDirection::ALL
            .into_iter()
            .find(|dir| dir.name().eq_ignore_ascii_case(raw))
    }

    /// The direction a player with the given yaw is looking towards.
    pub fn from_yaw(yaw: f64) -> MergeDirection {
        let yaw = yaw.rem_euclid(360.0);
        if (45.0..135.0).contains(&yaw) {
            MergeDirection::West
        } else if (135.0..225.0).contains(&yaw) {
            MergeDirection::North
        } else if (225.0..315.0).contains(&yaw) {
            MergeDirection::East
        } else {
            MergeDirection::South
        }
    }
}

impl fmt::Display for MergeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
