//! The `/plot` command.

use super::service::{ClaimResult, MergeResult, OwnerActionResult, PlotService, ServiceError, UnmergeResult};
use super::{MergeDirection, Plot, PlotFlag, PlotId, PlotWorld, format_bool, is_reset, parse_bool};
use crate::config::{PlotWorldConfig, PluginConfig};
use crate::economy::{Economy, resolve_currency, try_withdraw};
use crate::events::{EventBus, PlotClaimEvent};
use crate::messages::{LangKey, Messages};
use crate::permissions;
use crate::player::{Location, Player, PlayerLookup, PlayerProfile};
use itertools::Itertools;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const COMMAND_NAME: &str = "plot";
pub const COMMAND_ALIASES: [&str; 2] = ["plots", "p"];

const SUBCOMMANDS: [&str; 16] = [
    "help", "claim", "auto", "delete", "merge", "unmerge", "info", "home", "sethome", "setowner",
    "trust", "untrust", "deny", "undeny", "flag", "flags",
];

/// The lines a command sends back to its sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// The lines as JSON chat components, for hosts that send raw JSON.
    pub fn json_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| allayplots_text::legacy_to_json(line))
            .collect()
    }
}

struct Reply<'a> {
    player: &'a dyn Player,
    messages: &'a Messages,
    lines: Vec<String>,
}

impl<'a> Reply<'a> {
    fn send(&mut self, key: LangKey, args: &[&dyn Display]) {
        let line = self.messages.render(Some(self.player), key, args);
        self.lines.push(line);
    }

    fn send_inline(&mut self, key: LangKey, args: &[&dyn Display]) {
        let line = self.messages.render_inline(Some(self.player), key, args);
        self.lines.push(line);
    }

    fn finish(self, success: bool) -> CommandOutput {
        CommandOutput {
            success,
            lines: self.lines,
        }
    }
}

/// The plot the sender is standing in.
struct PlotContext {
    world: String,
    id: PlotId,
    plot: Option<Plot>,
}

impl PlotContext {
    fn claimed(&self) -> Option<&Plot> {
        self.plot.as_ref().filter(|plot| plot.is_claimed())
    }
}

struct EconomyHook {
    economy: Arc<dyn Economy>,
    currency: String,
}

type CommandResult = Result<bool, ServiceError>;

pub struct PlotCommand {
    service: Arc<PlotService>,
    config: Arc<PluginConfig>,
    messages: Arc<Messages>,
    events: Arc<EventBus>,
    players: Arc<dyn PlayerLookup>,
    economy: Option<EconomyHook>,
}

impl PlotCommand {
    pub fn new(
        service: Arc<PlotService>,
        messages: Arc<Messages>,
        events: Arc<EventBus>,
        players: Arc<dyn PlayerLookup>,
        economy: Option<Arc<dyn Economy>>,
    ) -> PlotCommand {
        let config = service.config().clone();
        let economy = match economy {
            Some(economy) if config.economy.enabled => {
                let currency = resolve_currency(economy.as_ref(), &config.economy.currency);
                Some(EconomyHook { economy, currency })
            }
            None if config.economy.enabled => {
                warn!("Economy is enabled in config.yml but no economy service is available.");
                None
            }
            _ => None,
        };
        PlotCommand {
            service,
            config,
            messages,
            events,
            players,
            economy,
        }
    }

    pub fn description(&self) -> String {
        self.messages.translate(LangKey::CommandDescription, &[])
    }

    /// Help text for senders that are not players.
    pub fn help(&self) -> String {
        allayplots_text::colorize(self.messages.template(LangKey::CommandHelp))
    }

    /// Runs `/plot <args>` for `player`.
    pub fn execute(&self, player: &dyn Player, args: &[&str]) -> CommandOutput {
        info!(
            "{} issued command: /{} {}",
            player.display_name(),
            COMMAND_NAME,
            args.join(" ")
        );
        let mut reply = Reply {
            player,
            messages: &self.messages,
            lines: Vec::new(),
        };
        if !player.has_permission(permissions::COMMAND_PLOT) {
            reply.send(LangKey::NoPermission, &[]);
            return reply.finish(false);
        }

        let (sub, rest) = match args.split_first() {
            Some((sub, rest)) => (sub.to_ascii_lowercase(), rest),
            None => ("help".to_owned(), &[][..]),
        };
        let result = match (sub.as_str(), rest) {
            ("help", []) => {
                reply.send_inline(LangKey::CommandHelp, &[]);
                Ok(true)
            }
            ("claim", []) => self.handle_claim(&mut reply),
            ("auto", []) => self.handle_auto(&mut reply),
            ("delete", []) => self.handle_delete(&mut reply),
            ("merge", []) => self.handle_merge(&mut reply, None),
            ("merge", [dir]) => self.handle_merge(&mut reply, Some(*dir)),
            ("unmerge", []) => self.handle_unmerge(&mut reply, None),
            ("unmerge", [dir]) => self.handle_unmerge(&mut reply, Some(*dir)),
            ("info", []) => self.handle_info(&mut reply),
            ("home", []) => self.handle_home(&mut reply, None),
            ("home", [target]) => self.handle_home(&mut reply, Some(*target)),
            ("sethome", []) => self.handle_set_home(&mut reply),
            ("setowner", [target]) => self.handle_set_owner(&mut reply, target),
            ("trust", [target]) => self.handle_access(&mut reply, target, Access::Trust),
            ("untrust", [target]) => self.handle_access(&mut reply, target, Access::Untrust),
            ("deny", [target]) => self.handle_access(&mut reply, target, Access::Deny),
            ("undeny", [target]) => self.handle_access(&mut reply, target, Access::Undeny),
            ("flag" | "flags", []) => self.handle_flag_list(&mut reply),
            ("flag" | "flags", [flag]) => self.handle_flag_show(&mut reply, flag),
            ("flag" | "flags", [flag, value @ ..]) => {
                self.handle_flag_set(&mut reply, flag, &value.join(" "))
            }
            _ => {
                reply.send(LangKey::UnknownSubcommand, &[]);
                Ok(false)
            }
        };

        match result {
            Ok(success) => reply.finish(success),
            Err(err) => {
                error!("/{} {} failed: {}", COMMAND_NAME, args.join(" "), err);
                reply.send(LangKey::InternalError, &[]);
                reply.finish(false)
            }
        }
    }

    /// Suggestions for the argument being typed.
    pub fn complete(&self, args: &[&str]) -> Vec<String> {
        fn matching(options: &[&str], typed: &str) -> Vec<String> {
            let typed = typed.to_ascii_lowercase();
            options
                .iter()
                .filter(|option| option.starts_with(&typed))
                .map(|option| option.to_string())
                .collect()
        }
        match args {
            [] => matching(&SUBCOMMANDS, ""),
            [sub] => matching(&SUBCOMMANDS, sub),
            [sub, dir] if matches!(sub.to_ascii_lowercase().as_str(), "merge" | "unmerge") => {
                let names: Vec<_> = MergeDirection::ALL.iter().map(|dir| dir.name()).collect();
                matching(&names, dir)
            }
            [sub, flag] if matches!(sub.to_ascii_lowercase().as_str(), "flag" | "flags") => {
                let names: Vec<_> = PlotFlag::ALL.iter().map(|flag| flag.name()).collect();
                matching(&names, flag)
            }
            [sub, _, value] if matches!(sub.to_ascii_lowercase().as_str(), "flag" | "flags") => {
                matching(&["true", "false", "default"], value)
            }
            _ => Vec::new(),
        }
    }

    fn world_config(&self, world: &str) -> Option<&PlotWorldConfig> {
        self.config.world(world)
    }

    fn bypass(player: &dyn Player) -> bool {
        player.has_permission(permissions::ADMIN_BYPASS)
    }

    fn resolve_plot_context(&self, reply: &mut Reply<'_>) -> Result<Option<PlotContext>, ServiceError> {
        let location = reply.player.location();
        let (x, z) = (location.block_x(), location.block_z());
        let found = self.service.with_world(&location.world, move |world| {
            world
                .plot_id_at(x, z)
                .map(|id| (id, world.plot(id).cloned()))
        })?;
        match found {
            None => {
                reply.send(LangKey::NotPlotWorld, &[]);
                Ok(None)
            }
            Some(None) => {
                reply.send(LangKey::NotInPlot, &[]);
                Ok(None)
            }
            Some(Some((id, plot))) => Ok(Some(PlotContext {
                world: location.world,
                id,
                plot,
            })),
        }
    }

    fn resolve_claimed_context(&self, reply: &mut Reply<'_>) -> Result<Option<PlotContext>, ServiceError> {
        let Some(context) = self.resolve_plot_context(reply)? else {
            return Ok(None);
        };
        if context.claimed().is_none() {
            reply.send(LangKey::PlotUnclaimed, &[]);
            return Ok(None);
        }
        Ok(Some(context))
    }

    /// The sender's plot if they own it or may bypass ownership.
    fn resolve_owned_context(&self, reply: &mut Reply<'_>) -> Result<Option<PlotContext>, ServiceError> {
        let Some(context) = self.resolve_claimed_context(reply)? else {
            return Ok(None);
        };
        let owner = context.claimed().is_some_and(|plot| plot.is_owner(reply.player.uuid()));
        if !owner && !Self::bypass(reply.player) {
            reply.send(LangKey::NotOwner, &[]);
            return Ok(None);
        }
        Ok(Some(context))
    }

    fn resolve_single_target(&self, reply: &mut Reply<'_>, selector: &str) -> Option<PlayerProfile> {
        let mut targets = self.players.find_players(selector);
        match targets.len() {
            0 => {
                reply.send(LangKey::NoTarget, &[&selector]);
                None
            }
            1 => targets.pop(),
            _ => {
                reply.send(LangKey::TooManyTargets, &[&selector]);
                None
            }
        }
    }

    fn resolve_direction(reply: &mut Reply<'_>, raw: Option<&str>) -> Option<MergeDirection> {
        match raw {
            None => Some(MergeDirection::from_yaw(reply.player.location().yaw)),
            Some(raw) => {
                let dir = MergeDirection::parse(raw);
                if dir.is_none() {
                    reply.send(LangKey::InvalidDirection, &[&raw]);
                }
                dir
            }
        }
    }

    fn handle_claim(&self, reply: &mut Reply<'_>) -> CommandResult {
        match self.resolve_plot_context(reply)? {
            Some(context) => self.claim(reply, context),
            None => Ok(false),
        }
    }

    fn handle_auto(&self, reply: &mut Reply<'_>) -> CommandResult {
        let world = reply.player.location().world;
        let Some(id) = self.service.find_next_free_plot_id(&world)? else {
            reply.send(LangKey::NotPlotWorld, &[]);
            return Ok(false);
        };
        let context = PlotContext {
            plot: self.service.plot(&world, id)?,
            world,
            id,
        };
        self.claim(reply, context)
    }

    fn claim(&self, reply: &mut Reply<'_>, context: PlotContext) -> CommandResult {
        let player = reply.player;
        if context.claimed().is_some() {
            reply.send(LangKey::AlreadyClaimed, &[]);
            return Ok(false);
        }
        let Some(world_config) = self.world_config(&context.world) else {
            reply.send(LangKey::NotPlotWorld, &[]);
            return Ok(false);
        };

        let max_plots = world_config.max_plots_per_player;
        if max_plots > 0 {
            let owned = self.service.count_owned_plots(&context.world, player.uuid())?;
            if owned >= max_plots as usize {
                reply.send(LangKey::TooManyPlots, &[&max_plots]);
                return Ok(false);
            }
        }

        let price = world_config.claim_price;
        let charged = match self.charge_hook(player, price) {
            Some(hook) => {
                if !try_withdraw(hook.economy.as_ref(), player.uuid(), &hook.currency, price) {
                    reply.send(LangKey::NotEnoughMoney, &[&price]);
                    return Ok(false);
                }
                Some(hook)
            }
            None => None,
        };

        let result = self.service.claim_plot(
            &context.world,
            context.id,
            player.uuid(),
            Some(player.origin_name()),
            max_plots,
        );
        let claimed = matches!(result, Ok(ClaimResult::Success));
        if !claimed {
            if let Some(hook) = charged {
                hook.economy.deposit(player.uuid(), &hook.currency, price);
            }
        }
        match result? {
            ClaimResult::Success => {}
            ClaimResult::AlreadyClaimed => {
                reply.send(LangKey::AlreadyClaimed, &[]);
                return Ok(false);
            }
            ClaimResult::TooMany => {
                reply.send(LangKey::TooManyPlots, &[&max_plots]);
                return Ok(false);
            }
            ClaimResult::Failed => {
                reply.send(LangKey::NotPlotWorld, &[]);
                return Ok(false);
            }
        }
        debug!("{} claimed plot {} in {}", player.display_name(), context.id, context.world);

        if let Some(plot) = self.service.plot(&context.world, context.id)? {
            self.events.fire_claim(&PlotClaimEvent {
                player,
                world: &context.world,
                plot: &plot,
            });
        }
        if world_config.teleport_on_claim {
            self.teleport_to_plot(player, &context.world, context.id)?;
        }
        reply.send(LangKey::ClaimSuccess, &[]);
        Ok(true)
    }

    /// The economy to charge or refund through, unless the player is exempt
    /// or the amount is zero.
    fn charge_hook(&self, player: &dyn Player, amount: f64) -> Option<&EconomyHook> {
        let hook = self.economy.as_ref()?;
        if amount <= 0.0 || player.has_permission(permissions::ECONOMY_BYPASS) {
            return None;
        }
        Some(hook)
    }

    fn handle_delete(&self, reply: &mut Reply<'_>) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_claimed_context(reply)? else {
            return Ok(false);
        };
        let owner = context.claimed().and_then(Plot::owner);
        let is_owner = owner == Some(player.uuid());
        if !is_owner && !player.has_permission(permissions::ADMIN_DELETE) {
            reply.send(LangKey::NotOwner, &[]);
            return Ok(false);
        }

        match self.service.delete_plot(&context.world, context.id, player.uuid(), true)? {
            OwnerActionResult::Success => {}
            OwnerActionResult::Unclaimed => {
                reply.send(LangKey::PlotUnclaimed, &[]);
                return Ok(false);
            }
            OwnerActionResult::NotOwner => {
                reply.send(LangKey::NotOwner, &[]);
                return Ok(false);
            }
        }

        let refund = self
            .world_config(&context.world)
            .map_or(0.0, |config| config.sell_refund);
        if let Some(hook) = self.charge_hook(player, refund) {
            let receiver = owner.unwrap_or(player.uuid());
            hook.economy.deposit(receiver, &hook.currency, refund);
        }
        reply.send(LangKey::DeleteSuccess, &[]);
        Ok(true)
    }

    fn handle_merge(&self, reply: &mut Reply<'_>, raw_dir: Option<&str>) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };
        let Some(dir) = Self::resolve_direction(reply, raw_dir) else {
            return Ok(false);
        };
        let target = PlotWorld::adjacent(context.id, dir);
        let result = self.service.merge_plots(
            &context.world,
            context.id,
            dir,
            player.uuid(),
            Self::bypass(player),
        )?;
        let key = match result {
            MergeResult::Success => {
                reply.send(LangKey::MergeSuccess, &[&target.x, &target.z]);
                return Ok(true);
            }
            MergeResult::Unclaimed => LangKey::PlotUnclaimed,
            MergeResult::NotOwner => LangKey::NotOwner,
            MergeResult::TargetUnclaimed => LangKey::MergeTargetUnclaimed,
            MergeResult::NotSameOwner => LangKey::MergeNotSameOwner,
            MergeResult::AlreadyMerged => LangKey::MergeAlready,
            MergeResult::Failed => LangKey::MergeFailed,
        };
        reply.send(key, &[]);
        Ok(false)
    }

    fn handle_unmerge(&self, reply: &mut Reply<'_>, raw_dir: Option<&str>) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };
        let Some(dir) = Self::resolve_direction(reply, raw_dir) else {
            return Ok(false);
        };
        let target = PlotWorld::adjacent(context.id, dir);
        let result = self.service.unmerge_plots(
            &context.world,
            context.id,
            dir,
            player.uuid(),
            Self::bypass(player),
        )?;
        let key = match result {
            UnmergeResult::Success => {
                reply.send(LangKey::UnmergeSuccess, &[&target.x, &target.z]);
                return Ok(true);
            }
            UnmergeResult::NotMerged => LangKey::UnmergeNotMerged,
            UnmergeResult::Unclaimed => LangKey::PlotUnclaimed,
            UnmergeResult::NotOwner => LangKey::NotOwner,
            UnmergeResult::Failed => LangKey::MergeFailed,
        };
        reply.send(key, &[]);
        Ok(false)
    }

    fn handle_info(&self, reply: &mut Reply<'_>) -> CommandResult {
        let Some(context) = self.resolve_plot_context(reply)? else {
            return Ok(false);
        };
        reply.send_inline(LangKey::InfoHeader, &[&context.id.x, &context.id.z, &context.world]);
        match context.claimed() {
            Some(plot) => {
                let owner = plot.owner_display().unwrap_or_default();
                reply.send_inline(LangKey::ClaimedInfo, &[&owner]);
                reply.send_inline(LangKey::InfoAccess, &[&plot.trusted().len(), &plot.denied().len()]);
            }
            None => reply.send_inline(LangKey::UnclaimedInfo, &[]),
        }
        Ok(true)
    }

    fn handle_home(&self, reply: &mut Reply<'_>, selector: Option<&str>) -> CommandResult {
        let player = reply.player;
        let target = match selector {
            None => PlayerProfile::of(player),
            Some(selector) => {
                let Some(target) = self.resolve_single_target(reply, selector) else {
                    return Ok(false);
                };
                if target.uuid != player.uuid() && !Self::bypass(player) {
                    reply.send(LangKey::NoPermission, &[]);
                    return Ok(false);
                }
                target
            }
        };

        let Some(home) = self.service.find_home_plot(target.uuid)? else {
            reply.send(LangKey::HomeNotFound, &[&target.name]);
            return Ok(false);
        };
        let plot = self.service.plot(&home.world, home.id)?;
        let denied = plot.is_some_and(|plot| plot.is_claimed() && !plot.can_enter(player.uuid()));
        if denied && !Self::bypass(player) {
            reply.send(LangKey::EnterDenied, &[]);
            return Ok(false);
        }
        self.teleport_to_plot(player, &home.world, home.id)?;
        reply.send(LangKey::HomeTeleport, &[&home.id.x, &home.id.z, &home.world]);
        Ok(true)
    }

    fn handle_set_home(&self, reply: &mut Reply<'_>) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };
        match self.service.set_home_plot(player.uuid(), &context.world, context.id)? {
            OwnerActionResult::Success => {
                reply.send(LangKey::HomeSet, &[&context.id.x, &context.id.z, &context.world]);
                Ok(true)
            }
            OwnerActionResult::Unclaimed => {
                reply.send(LangKey::PlotUnclaimed, &[]);
                Ok(false)
            }
            OwnerActionResult::NotOwner => {
                reply.send(LangKey::NotOwner, &[]);
                Ok(false)
            }
        }
    }

    fn handle_set_owner(&self, reply: &mut Reply<'_>, selector: &str) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };
        let Some(target) = self.resolve_single_target(reply, selector) else {
            return Ok(false);
        };
        let result = self.service.set_plot_owner(
            &context.world,
            context.id,
            player.uuid(),
            Self::bypass(player),
            target.uuid,
            Some(target.name.clone()),
        )?;
        match result {
            OwnerActionResult::Success => {
                reply.send(
                    LangKey::OwnerSet,
                    &[&target.name, &context.id.x, &context.id.z, &context.world],
                );
                Ok(true)
            }
            OwnerActionResult::Unclaimed => {
                reply.send(LangKey::PlotUnclaimed, &[]);
                Ok(false)
            }
            OwnerActionResult::NotOwner => {
                reply.send(LangKey::NotOwner, &[]);
                Ok(false)
            }
        }
    }

    fn handle_access(&self, reply: &mut Reply<'_>, selector: &str, access: Access) -> CommandResult {
        let player = reply.player;
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };
        let Some(target) = self.resolve_single_target(reply, selector) else {
            return Ok(false);
        };
        let uuid = target.uuid;
        let result = self.service.update_merge_group_owned(
            &context.world,
            context.id,
            player.uuid(),
            Self::bypass(player),
            move |plot| access.apply(plot, uuid),
        )?;
        if result != OwnerActionResult::Success {
            reply.send(LangKey::NotOwner, &[]);
            return Ok(false);
        }
        reply.send(access.message(), &[&target.name]);
        Ok(true)
    }

    fn handle_flag_list(&self, reply: &mut Reply<'_>) -> CommandResult {
        let Some(context) = self.resolve_claimed_context(reply)? else {
            return Ok(false);
        };
        let Some(plot) = context.claimed() else {
            return Ok(false);
        };
        let flags = PlotFlag::ALL
            .iter()
            .map(|&flag| format!("{}={}", flag, format_bool(plot.flag(flag))))
            .join(", ");
        reply.send(LangKey::FlagList, &[&flags]);
        Ok(true)
    }

    fn parse_flag(reply: &mut Reply<'_>, raw: &str) -> Option<PlotFlag> {
        let flag = PlotFlag::parse(raw);
        if flag.is_none() {
            let names = PlotFlag::ALL.iter().map(|flag| flag.name()).join(", ");
            reply.send(LangKey::FlagUnknown, &[&raw, &names]);
        }
        flag
    }

    fn handle_flag_show(&self, reply: &mut Reply<'_>, raw_flag: &str) -> CommandResult {
        let Some(flag) = Self::parse_flag(reply, raw_flag) else {
            return Ok(false);
        };
        let Some(context) = self.resolve_claimed_context(reply)? else {
            return Ok(false);
        };
        let value = context.claimed().is_some_and(|plot| plot.flag(flag));
        reply.send(LangKey::FlagValue, &[&flag, &format_bool(value)]);
        Ok(true)
    }

    fn handle_flag_set(&self, reply: &mut Reply<'_>, raw_flag: &str, raw_value: &str) -> CommandResult {
        let player = reply.player;
        let Some(flag) = Self::parse_flag(reply, raw_flag) else {
            return Ok(false);
        };
        if raw_value.trim().is_empty() {
            return self.handle_flag_show(reply, raw_flag);
        }
        let Some(context) = self.resolve_owned_context(reply)? else {
            return Ok(false);
        };

        let (key, value) = if is_reset(raw_value) {
            self.service.update_merge_group_owned(
                &context.world,
                context.id,
                player.uuid(),
                Self::bypass(player),
                move |plot| plot.remove_flag(flag.name()),
            )?;
            (LangKey::FlagReset, flag.default_value())
        } else {
            let Some(value) = parse_bool(raw_value) else {
                reply.send(LangKey::FlagInvalidValue, &[]);
                return Ok(false);
            };
            self.service.update_merge_group_owned(
                &context.world,
                context.id,
                player.uuid(),
                Self::bypass(player),
                move |plot| plot.set_flag(flag, value),
            )?;
            (LangKey::FlagSet, value)
        };
        reply.send(key, &[&flag, &format_bool(value)]);
        Ok(true)
    }

    /// Moves the player to the centre of the plot's merge group.
    fn teleport_to_plot(&self, player: &dyn Player, world: &str, id: PlotId) -> Result<(), ServiceError> {
        let Some(bounds) = self.service.merged_plot_bounds(world, id)? else {
            return Ok(());
        };
        let ground_y = self.world_config(world).map_or(64, |config| config.ground_y);
        let (x, z) = bounds.center();
        let current = player.location();
        player.teleport(
            Location::new(world, x, ground_y as f64 + 1.0, z).with_rotation(current.yaw, current.pitch),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Trust,
    Untrust,
    Deny,
    Undeny,
}

impl Access {
    /// Trusting someone lifts their denial and the other way round.
    fn apply(self, plot: &mut Plot, player: u128) -> bool {
        match self {
            Access::Trust => {
                let added = plot.add_trusted(player);
                plot.remove_denied(player) | added
            }
            Access::Untrust => plot.remove_trusted(player),
            Access::Deny => {
                let added = plot.add_denied(player);
                plot.remove_trusted(player) | added
            }
            Access::Undeny => plot.remove_denied(player),
        }
    }

    fn message(self) -> LangKey {
        match self {
            Access::Trust => LangKey::TrustAdded,
            Access::Untrust => LangKey::TrustRemoved,
            Access::Deny => LangKey::DenyAdded,
            Access::Undeny => LangKey::DenyRemoved,
        }
    }
}
