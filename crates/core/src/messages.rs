//! Player facing text. Every message has an English default which can be
//! overridden per key in `lang.yml`. Templates use `&` colour codes and
//! positional `{0}`, `{1}`, ... arguments.

use crate::config::ConfigError;
use crate::economy::Placeholders;
use crate::player::Player;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const LANG_FILE: &str = "lang.yml";
const KEY_NAMESPACE: &str = "allayplots:";

macro_rules! lang_keys {
    ($($name:ident => $key:literal: $default:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum LangKey {
            $($name,)*
        }

        impl LangKey {
            pub const ALL: &'static [LangKey] = &[$(LangKey::$name,)*];

            pub fn key(self) -> &'static str {
                match self {
                    $(LangKey::$name => $key,)*
                }
            }

            pub fn default_text(self) -> &'static str {
                match self {
                    $(LangKey::$name => $default,)*
                }
            }
        }
    };
}

lang_keys! {
    Prefix => "message.prefix": "&8[&aPlots&8] &r",
    Enter => "message.enter": "&aEntered plot &e{0};{1} &7in {3} &8- {2}",
    Leave => "message.leave": "&7Left plot &e{0};{1}",
    EnterDenied => "message.enterDenied": "&cYou are not allowed to enter this plot.",
    BuildDenied => "message.buildDenied": "&cYou cannot build here.",
    NotInPlot => "message.notInPlot": "&cYou are not standing in a plot.",
    NotPlotWorld => "message.notPlotWorld": "&cThis world is not a plot world.",
    AlreadyClaimed => "message.alreadyClaimed": "&cThis plot is already claimed.",
    ClaimSuccess => "message.claimSuccess": "&aYou claimed this plot.",
    DeleteSuccess => "message.deleteSuccess": "&aThe plot has been deleted.",
    PlotUnclaimed => "message.plotUnclaimed": "&cThis plot is not claimed.",
    NotOwner => "message.notOwner": "&cYou do not own this plot.",
    NoPermission => "message.noPermission": "&cYou do not have permission to do that.",
    TooManyPlots => "message.tooManyPlots": "&cYou cannot own more than {0} plots in this world.",
    NotEnoughMoney => "message.notEnoughMoney": "&cYou need {0} to claim a plot.",
    TrustAdded => "message.trustAdded": "&a{0} is now trusted on this plot.",
    TrustRemoved => "message.trustRemoved": "&a{0} is no longer trusted on this plot.",
    DenyAdded => "message.denyAdded": "&a{0} is now denied from this plot.",
    DenyRemoved => "message.denyRemoved": "&a{0} is no longer denied from this plot.",
    UnclaimedInfo => "message.unclaimedInfo": "&7Unclaimed",
    ClaimedInfo => "message.claimedInfo": "&7Owner: &f{0}",
    MergeSuccess => "message.mergeSuccess": "&aMerged with plot &e{0};{1}&a.",
    MergeTargetUnclaimed => "message.mergeTargetUnclaimed": "&cThe plot in that direction is not claimed.",
    MergeNotSameOwner => "message.mergeNotSameOwner": "&cYou can only merge plots with the same owner.",
    MergeAlready => "message.mergeAlready": "&cThese plots are already merged.",
    MergeFailed => "message.mergeFailed": "&cThe plots could not be merged.",
    UnmergeSuccess => "message.unmergeSuccess": "&aUnmerged from plot &e{0};{1}&a.",
    UnmergeNotMerged => "message.unmergeNotMerged": "&cThis plot is not merged in that direction.",
    InvalidDirection => "message.invalidDirection": "&cUnknown direction {0}. Use north, east, south or west.",
    HomeSet => "message.homeSet": "&aYour home plot is now &e{0};{1} &ain {2}.",
    HomeNotFound => "message.homeNotFound": "&c{0} has no home plot.",
    HomeTeleport => "message.homeTeleport": "&aTeleported to plot &e{0};{1} &ain {2}.",
    OwnerSet => "message.ownerSet": "&a{0} now owns plot &e{1};{2} &ain {3}.",
    FlagList => "message.flagList": "&7Flags: &f{0}",
    FlagValue => "message.flagValue": "&7Flag &e{0} &7is &f{1}",
    FlagSet => "message.flagSet": "&aFlag &e{0} &aset to &f{1}&a.",
    FlagReset => "message.flagReset": "&aFlag &e{0} &areset to &f{1}&a.",
    FlagUnknown => "message.flagUnknown": "&cUnknown flag {0}. Flags: {1}",
    FlagInvalidValue => "message.flagInvalidValue": "&cFlag values must be true or false.",
    NoTarget => "message.noTarget": "&cNo player matches {0}.",
    TooManyTargets => "message.tooManyTargets": "&c{0} matches more than one player.",
    UnknownSubcommand => "message.unknownSubcommand": "&cUnknown subcommand. Use /plot help.",
    InternalError => "message.internalError": "&cSomething went wrong. Please try again later.",
    CommandDescription => "command.plot.description": "Manage plots.",
    CommandHelp => "command.plot.help": "&a/plot claim&7, &a/plot auto&7, &a/plot delete&7, &a/plot info\n&a/plot home [player]&7, &a/plot sethome&7, &a/plot setowner <player>\n&a/plot merge [direction]&7, &a/plot unmerge [direction]\n&a/plot trust|untrust|deny|undeny <player>\n&a/plot flag [flag] [value]",
    InfoHeader => "command.plot.info.header": "&ePlot {0};{1} &7in {2}",
    InfoAccess => "command.plot.info.access": "&7Trusted: &f{0} &7Denied: &f{1}",
}

impl LangKey {
    /// Looks up a key by its name, with or without the `allayplots:` prefix.
    pub fn from_key(raw: &str) -> Option<LangKey> {
        let raw = raw.trim();
        let raw = raw.strip_prefix(KEY_NAMESPACE).unwrap_or(raw);
        LangKey::ALL.iter().copied().find(|key| key.key() == raw)
    }
}

/// Replaces `{0}`, `{1}`, ... with the given arguments. Argument text is
/// copied as is and never expanded again.
pub fn format_template(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let arg = tail
            .find('}')
            .and_then(|end| Some((tail[..end].parse::<usize>().ok()?, end)))
            .and_then(|(index, end)| Some((args.get(index)?, end)));
        match arg {
            Some((arg, end)) => {
                out.push_str(&arg.to_string());
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub struct Messages {
    overrides: FxHashMap<LangKey, String>,
    placeholders: Option<Arc<dyn Placeholders>>,
}

impl Default for Messages {
    fn default() -> Messages {
        Messages::new()
    }
}

impl Messages {
    pub fn new() -> Messages {
        Messages {
            overrides: FxHashMap::default(),
            placeholders: None,
        }
    }

    /// Reads overrides from `lang.yml` if the data folder has one.
    pub fn load(data_folder: &Path) -> Result<Messages, ConfigError> {
        let path = data_folder.join(LANG_FILE);
        let str = match fs::read_to_string(&path) {
            Ok(str) => str,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Messages::new()),
            Err(err) => return Err(err.into()),
        };
        let mut messages = Messages::new();
        if str.trim().is_empty() {
            return Ok(messages);
        }
        let raw: BTreeMap<String, String> = serde_yaml_ng::from_str(&str)?;
        for (key, text) in raw {
            match LangKey::from_key(&key) {
                Some(lang_key) => messages.set(lang_key, text),
                None => warn!("Ignoring unknown message key {} in {}", key, LANG_FILE),
            }
        }
        debug!("Loaded {} message overrides", messages.overrides.len());
        Ok(messages)
    }

    pub fn with_placeholders(mut self, placeholders: Arc<dyn Placeholders>) -> Messages {
        self.placeholders = Some(placeholders);
        self
    }

    pub fn set(&mut self, key: LangKey, text: String) {
        self.overrides.insert(key, text);
    }

    pub fn template(&self, key: LangKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    pub fn translate(&self, key: LangKey, args: &[&dyn Display]) -> String {
        format_template(self.template(key), args)
    }

    /// The prefixed, coloured message for `player`.
    pub fn render(&self, player: Option<&dyn Player>, key: LangKey, args: &[&dyn Display]) -> String {
        let text = self.template(LangKey::Prefix).to_owned() + &self.translate(key, args);
        self.finish(player, text)
    }

    /// Like [`Messages::render`] without the prefix.
    pub fn render_inline(&self, player: Option<&dyn Player>, key: LangKey, args: &[&dyn Display]) -> String {
        let text = self.translate(key, args);
        self.finish(player, text)
    }

    fn finish(&self, player: Option<&dyn Player>, text: String) -> String {
        let text = match (player, &self.placeholders) {
            (Some(player), Some(placeholders)) => placeholders.apply(player, &text),
            _ => text,
        };
        allayplots_text::colorize(&text)
    }
}
