//! Host event handlers. Each handler returns whether the host should cancel
//! the event.

use super::service::{PlotService, ServiceError, ServiceState};
use super::{Plot, PlotFlag, PlotId};
use crate::config::PluginConfig;
use crate::events::{EventBus, PlotEnterEvent, PlotLeaveEvent};
use crate::messages::{LangKey, Messages};
use crate::permissions;
use crate::player::{Location, Player};
use allayplots_save_data::HyphenatedUUID;
use std::sync::Arc;
use tracing::{error, warn};

fn bypass(player: &dyn Player) -> bool {
    player.has_permission(permissions::ADMIN_BYPASS)
}

/// The claimed plot at a column, if any.
fn claimed_plot_at(service: &PlotService, location: &Location) -> Result<Option<Plot>, ServiceError> {
    let (x, z) = (location.block_x(), location.block_z());
    let plot = service.with_world(&location.world, move |world| {
        let id = world.plot_id_at(x, z)?;
        world.plot(id).filter(|plot| plot.is_claimed()).cloned()
    })?;
    Ok(plot.flatten())
}

enum BuildCheck {
    Road,
    Plot { allowed: bool },
}

/// Guards block breaking, placing, interaction and bucket use.
pub struct ProtectionListener {
    service: Arc<PlotService>,
    config: Arc<PluginConfig>,
    messages: Arc<Messages>,
}

impl ProtectionListener {
    pub fn new(service: Arc<PlotService>, messages: Arc<Messages>) -> ProtectionListener {
        ProtectionListener {
            config: service.config().clone(),
            service,
            messages,
        }
    }

    /// Checks whether `player` may change the block column `x`, `z` of
    /// `world`.
    pub fn on_block_action(&self, player: &dyn Player, world: &str, x: i32, z: i32) -> bool {
        let uuid = player.uuid();
        let check = self.service.with_world(world, move |world| match world.plot_id_at(x, z) {
            None => BuildCheck::Road,
            Some(id) => BuildCheck::Plot {
                allowed: world.plot(id).is_some_and(|plot| plot.can_build(uuid)),
            },
        });
        let check = match check {
            Ok(Some(check)) => check,
            Ok(None) => return false,
            Err(err) => {
                error!("Could not check build access in {}: {}", world, err);
                return true;
            }
        };
        if bypass(player) {
            return false;
        }
        let denied = match check {
            BuildCheck::Road => self.config.settings.protect_roads,
            BuildCheck::Plot { allowed } => !allowed,
        };
        if denied {
            player.send_message(&self.messages.render(Some(player), LangKey::BuildDenied, &[]));
        }
        denied
    }
}

/// A plot as seen by the movement listener.
struct Visited {
    world: String,
    id: PlotId,
    root: PlotId,
    plot: Option<Plot>,
    owner_name: Option<String>,
}

impl Visited {
    fn resolve(state: &ServiceState, location: &Location) -> Option<Visited> {
        let world = state.world(&location.world)?;
        let id = world.plot_id_at(location.block_x(), location.block_z())?;
        let plot = world.plot(id).cloned();
        let owner_name = plot.as_ref().and_then(Plot::owner).map(|owner| {
            state
                .resolve_player_name(owner)
                .unwrap_or_else(|| HyphenatedUUID(owner).to_string())
        });
        Some(Visited {
            world: location.world.clone(),
            id,
            root: world.merge_root(id),
            plot,
            owner_name,
        })
    }

    fn key(&self) -> (&str, PlotId) {
        (&self.world, self.root)
    }

    fn claimed(&self) -> Option<&Plot> {
        self.plot.as_ref().filter(|plot| plot.is_claimed())
    }
}

/// Enter and leave handling. Moving inside one merge group counts as staying
/// in the same plot.
pub struct MovementListener {
    service: Arc<PlotService>,
    config: Arc<PluginConfig>,
    messages: Arc<Messages>,
    events: Arc<EventBus>,
}

impl MovementListener {
    pub fn new(service: Arc<PlotService>, messages: Arc<Messages>, events: Arc<EventBus>) -> MovementListener {
        MovementListener {
            config: service.config().clone(),
            service,
            messages,
            events,
        }
    }

    pub fn on_move(&self, player: &dyn Player, from: &Location, to: &Location) -> bool {
        if from.same_column(to) {
            return false;
        }
        let (from_owned, to_owned) = (from.clone(), to.clone());
        let visited = self.service.run(move |state| {
            (
                Visited::resolve(state, &from_owned),
                Visited::resolve(state, &to_owned),
            )
        });
        let (from_plot, to_plot) = match visited {
            Ok(visited) => visited,
            Err(err) => {
                warn!("Could not resolve plots for {}: {}", player.display_name(), err);
                return false;
            }
        };
        if from_plot.as_ref().map(Visited::key) == to_plot.as_ref().map(Visited::key) {
            return false;
        }

        if let Some(to_plot) = &to_plot {
            let denied = to_plot
                .claimed()
                .is_some_and(|plot| !plot.can_enter(player.uuid()));
            if denied && !bypass(player) {
                self.notify(player, LangKey::EnterDenied, &[]);
                return true;
            }
        }

        if let Some(from_plot) = &from_plot {
            self.events.fire_leave(&PlotLeaveEvent {
                player,
                world: &from_plot.world,
                id: from_plot.id,
                plot: from_plot.claimed(),
            });
            self.notify(player, LangKey::Leave, &[&from_plot.id.x, &from_plot.id.z]);
        }

        if let Some(to_plot) = &to_plot {
            let mut event = PlotEnterEvent::new(player, &to_plot.world, to_plot.id, to_plot.claimed());
            if !self.events.fire_enter(&mut event) {
                return true;
            }
            let owner_info = match (&to_plot.owner_name, to_plot.claimed()) {
                (Some(name), Some(_)) => {
                    self.messages
                        .render_inline(Some(player), LangKey::ClaimedInfo, &[name])
                }
                _ => self
                    .messages
                    .render_inline(Some(player), LangKey::UnclaimedInfo, &[]),
            };
            self.notify(
                player,
                LangKey::Enter,
                &[&to_plot.id.x, &to_plot.id.z, &owner_info, &to_plot.world],
            );
        }
        false
    }

    fn notify(&self, player: &dyn Player, key: LangKey, args: &[&dyn std::fmt::Display]) {
        let message = self.messages.render(Some(player), key, args);
        if self.config.settings.use_action_bar {
            player.send_action_bar(&message);
        } else {
            player.send_message(&message);
        }
    }
}

pub enum DamageTarget<'a> {
    Player(&'a dyn Player),
    Entity,
}

pub enum DamageSource<'a> {
    Player(&'a dyn Player),
    Projectile { shooter: Option<&'a dyn Player> },
    Other,
}

impl<'a> DamageSource<'a> {
    fn attacking_player(&self) -> Option<&'a dyn Player> {
        match *self {
            DamageSource::Player(player) => Some(player),
            DamageSource::Projectile { shooter } => shooter,
            DamageSource::Other => None,
        }
    }
}

pub struct DamageEvent<'a> {
    /// Where the damaged entity stands.
    pub location: &'a Location,
    pub target: DamageTarget<'a>,
    pub source: DamageSource<'a>,
}

/// Applies the `damage`, `pvp` and `pve` flags of claimed plots.
pub struct DamageListener {
    service: Arc<PlotService>,
}

impl DamageListener {
    pub fn new(service: Arc<PlotService>) -> DamageListener {
        DamageListener { service }
    }

    pub fn on_damage(&self, event: &DamageEvent<'_>) -> bool {
        let plot = match claimed_plot_at(&self.service, event.location) {
            Ok(Some(plot)) => plot,
            Ok(None) => return false,
            Err(err) => {
                warn!("Could not resolve plot for damage event: {}", err);
                return false;
            }
        };

        if let DamageTarget::Player(victim) = event.target {
            if !plot.flag(PlotFlag::Damage) && !bypass(victim) {
                return true;
            }
        }

        let Some(attacker) = event.source.attacking_player() else {
            return false;
        };
        if bypass(attacker) {
            return false;
        }
        match event.target {
            DamageTarget::Player(victim) => {
                attacker.uuid() != victim.uuid() && !plot.flag(PlotFlag::Pvp)
            }
            DamageTarget::Entity => !plot.flag(PlotFlag::Pve),
        }
    }
}
