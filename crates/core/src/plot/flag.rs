use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotFlag {
    Entry,
    Build,
    Pvp,
    Pve,
    Damage,
}

impl PlotFlag {
    pub const ALL: [PlotFlag; 5] = [
        PlotFlag::Entry,
        PlotFlag::Build,
        PlotFlag::Pvp,
        PlotFlag::Pve,
        PlotFlag::Damage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlotFlag::Entry => "entry",
            PlotFlag::Build => "build",
            PlotFlag::Pvp => "pvp",
            PlotFlag::Pve => "pve",
            PlotFlag::Damage => "damage",
        }
    }

    pub fn default_value(self) -> bool {
        !matches!(self, PlotFlag::Build)
    }

    pub fn parse(raw: &str) -> Option<PlotFlag> {
        let raw = raw.trim();
        PlotFlag::ALL
            .into_iter()
            .find(|flag| flag.name().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for PlotFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a user supplied flag value. Anything unrecognised is `None`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "allow" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "deny" | "0" => Some(false),
        _ => None,
    }
}

pub fn is_reset(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "default" | "reset" | "unset" | "remove" | "clear"
    )
}

pub fn format_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
