//! Plot events other plugins can listen to.

use crate::plot::{Plot, PlotId};
use crate::player::Player;
use std::sync::{Arc, RwLock};
use std::sync::PoisonError;

pub struct PlotClaimEvent<'a> {
    pub player: &'a dyn Player,
    pub world: &'a str,
    pub plot: &'a Plot,
}

/// Fired when a player walks into a plot. Cancelling it stops the move.
pub struct PlotEnterEvent<'a> {
    pub player: &'a dyn Player,
    pub world: &'a str,
    pub id: PlotId,
    /// `None` for unclaimed plots.
    pub plot: Option<&'a Plot>,
    cancelled: bool,
}

impl<'a> PlotEnterEvent<'a> {
    pub fn new(player: &'a dyn Player, world: &'a str, id: PlotId, plot: Option<&'a Plot>) -> Self {
        PlotEnterEvent {
            player,
            world,
            id,
            plot,
            cancelled: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

pub struct PlotLeaveEvent<'a> {
    pub player: &'a dyn Player,
    pub world: &'a str,
    pub id: PlotId,
    pub plot: Option<&'a Plot>,
}

pub trait PlotEventListener: Send + Sync {
    fn on_claim(&self, _event: &PlotClaimEvent<'_>) {}

    fn on_enter(&self, _event: &mut PlotEnterEvent<'_>) {}

    fn on_leave(&self, _event: &PlotLeaveEvent<'_>) {}
}

/// Calls registered listeners in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn PlotEventListener>>>,
}

impl EventBus {
    pub fn register(&self, listener: Arc<dyn PlotEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn PlotEventListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fire_claim(&self, event: &PlotClaimEvent<'_>) {
        for listener in self.listeners() {
            listener.on_claim(event);
        }
    }

    /// Returns false when a listener cancelled the event.
    pub fn fire_enter(&self, event: &mut PlotEnterEvent<'_>) -> bool {
        for listener in self.listeners() {
            listener.on_enter(event);
        }
        !event.is_cancelled()
    }

    pub fn fire_leave(&self, event: &PlotLeaveEvent<'_>) {
        for listener in self.listeners() {
            listener.on_leave(event);
        }
    }
}
