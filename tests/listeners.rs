mod common;

use allayplots_core::config::PluginConfig;
use allayplots_core::events::{PlotClaimEvent, PlotEnterEvent, PlotEventListener, PlotLeaveEvent};
use allayplots_core::permissions;
use allayplots_core::player::{Location, Player};
use allayplots_core::plot::PlotId;
use allayplots_core::plot::listeners::{DamageEvent, DamageSource, DamageTarget};
use common::*;
use std::sync::{Arc, Mutex};

const ALICE: u128 = 1;
const BOB: u128 = 2;

fn loc(x: i32, z: i32) -> Location {
    Location::new(WORLD, x as f64 + 0.5, 65.0, z as f64 + 0.5)
}

/// Alice owns plot 0;0.
fn claimed() -> (Harness, TestPlayer) {
    let harness = Harness::new();
    let alice = TestPlayer::new(ALICE, "Alice").at(10, 10);
    assert!(harness.run(&alice, "claim").success);
    (harness, alice)
}

#[test]
fn only_members_build_on_claimed_plots() {
    let (harness, alice) = claimed();
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(!harness.protection.on_block_action(&alice, WORLD, 10, 10));
    assert!(harness.protection.on_block_action(&bob, WORLD, 10, 10));
    assert_eq!(bob.messages(), vec!["[Plots] You cannot build here."]);

    harness.lookup.add(BOB, "Bob");
    assert!(harness.run(&alice, "trust bob").success);
    assert!(!harness.protection.on_block_action(&bob, WORLD, 10, 10));
}

#[test]
fn unclaimed_plots_and_roads_are_protected() {
    let harness = Harness::new();
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(harness.protection.on_block_action(&bob, WORLD, 10, 10));
    assert!(harness.protection.on_block_action(&bob, WORLD, 38, 10));
    assert!(!harness.protection.on_block_action(&bob, "lobby", 10, 10));

    let admin = TestPlayer::new(3, "Admin").with_permission(permissions::ADMIN_BYPASS);
    assert!(!harness.protection.on_block_action(&admin, WORLD, 38, 10));
}

#[test]
fn open_roads_when_configured() {
    let mut config = PluginConfig::default();
    config.settings.protect_roads = false;
    let harness = Harness::with_config(config);
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(!harness.protection.on_block_action(&bob, WORLD, 38, 10));
    assert!(harness.protection.on_block_action(&bob, WORLD, 10, 10));
}

#[test]
fn build_flag_opens_plot() {
    let (harness, alice) = claimed();
    assert!(harness.run(&alice, "flag build true").success);
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(!harness.protection.on_block_action(&bob, WORLD, 10, 10));
}

#[test]
fn entering_and_leaving_plots_notifies() {
    let (harness, _alice) = claimed();
    let bob = TestPlayer::new(BOB, "Bob");

    assert!(!harness.movement.on_move(&bob, &loc(38, 10), &loc(34, 10)));
    assert_eq!(
        bob.action_bar(),
        vec!["[Plots] Entered plot 0;0 in plotworld - Owner: Alice"]
    );

    // Moving inside a plot says nothing.
    assert!(!harness.movement.on_move(&bob, &loc(34, 10), &loc(33, 10)));
    assert_eq!(bob.action_bar().len(), 1);

    assert!(!harness.movement.on_move(&bob, &loc(33, 10), &loc(38, 10)));
    assert_eq!(bob.action_bar()[1], "[Plots] Left plot 0;0");

    assert!(!harness.movement.on_move(&bob, &loc(38, 10), &loc(45, 10)));
    assert_eq!(
        bob.action_bar()[2],
        "[Plots] Entered plot 1;0 in plotworld - Unclaimed"
    );
}

#[test]
fn chat_notifications_without_action_bar() {
    let mut config = PluginConfig::default();
    config.settings.use_action_bar = false;
    let harness = Harness::with_config(config);
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(!harness.movement.on_move(&bob, &loc(38, 10), &loc(10, 10)));
    assert!(bob.action_bar().is_empty());
    assert_eq!(bob.messages().len(), 1);
}

#[test]
fn denied_players_cannot_enter() {
    let (harness, alice) = claimed();
    harness.lookup.add(BOB, "Bob");
    assert!(harness.run(&alice, "deny bob").success);

    let bob = TestPlayer::new(BOB, "Bob");
    assert!(harness.movement.on_move(&bob, &loc(38, 10), &loc(34, 10)));
    assert_eq!(
        bob.action_bar(),
        vec!["[Plots] You are not allowed to enter this plot."]
    );

    let admin = TestPlayer::new(BOB, "Bob").with_permission(permissions::ADMIN_BYPASS);
    assert!(!harness.movement.on_move(&admin, &loc(38, 10), &loc(34, 10)));
}

#[test]
fn entry_flag_closes_plot() {
    let (harness, alice) = claimed();
    assert!(harness.run(&alice, "flag entry false").success);
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(harness.movement.on_move(&bob, &loc(38, 10), &loc(34, 10)));
    assert!(!harness.movement.on_move(&alice, &loc(38, 10), &loc(34, 10)));
}

#[test]
fn merged_plots_count_as_one() {
    let (harness, alice) = claimed();
    alice.move_to(52, 10);
    assert!(harness.run(&alice, "claim").success);
    alice.move_to(10, 10);
    assert!(harness.run(&alice, "merge east").success);

    let bob = TestPlayer::new(BOB, "Bob");
    assert!(!harness.movement.on_move(&bob, &loc(30, 10), &loc(38, 10)));
    assert!(!harness.movement.on_move(&bob, &loc(38, 10), &loc(50, 10)));
    assert!(bob.action_bar().is_empty());
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
    cancel_enter: bool,
}

impl PlotEventListener for Recorder {
    fn on_claim(&self, event: &PlotClaimEvent<'_>) {
        self.seen.lock().unwrap().push(format!(
            "claim {} {} {}",
            event.player.display_name(),
            event.world,
            event.plot.id()
        ));
    }

    fn on_enter(&self, event: &mut PlotEnterEvent<'_>) {
        self.seen.lock().unwrap().push(format!(
            "enter {} claimed={}",
            event.id,
            event.plot.is_some()
        ));
        if self.cancel_enter {
            event.set_cancelled(true);
        }
    }

    fn on_leave(&self, event: &PlotLeaveEvent<'_>) {
        self.seen.lock().unwrap().push(format!("leave {}", event.id));
    }
}

#[test]
fn events_reach_listeners() {
    let harness = Harness::new();
    let recorder = Arc::new(Recorder::default());
    harness.events.register(recorder.clone());

    let alice = TestPlayer::new(ALICE, "Alice").at(10, 10);
    assert!(harness.run(&alice, "claim").success);
    assert!(!harness.movement.on_move(&alice, &loc(10, 10), &loc(45, 10)));

    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![
            "claim Alice plotworld 0;0".to_owned(),
            "leave 0;0".to_owned(),
            "enter 1;0 claimed=false".to_owned(),
        ]
    );
}

#[test]
fn cancelled_enter_stops_move() {
    let harness = Harness::new();
    harness.events.register(Arc::new(Recorder {
        cancel_enter: true,
        ..Default::default()
    }));
    let bob = TestPlayer::new(BOB, "Bob");
    assert!(harness.movement.on_move(&bob, &loc(38, 10), &loc(10, 10)));
    assert!(bob.action_bar().is_empty());
}

fn damage<'a>(location: &'a Location, target: DamageTarget<'a>, source: DamageSource<'a>) -> DamageEvent<'a> {
    DamageEvent {
        location,
        target,
        source,
    }
}

#[test]
fn pvp_flag_controls_player_combat() {
    let (harness, alice) = claimed();
    let bob = TestPlayer::new(BOB, "Bob");
    let inside = loc(10, 10);
    let hit = damage(&inside, DamageTarget::Player(&alice), DamageSource::Player(&bob));
    assert!(!harness.damage.on_damage(&hit));

    assert!(harness.run(&alice, "flag pvp false").success);
    assert!(harness.damage.on_damage(&hit));

    let arrow = damage(
        &inside,
        DamageTarget::Player(&alice),
        DamageSource::Projectile { shooter: Some(&bob) },
    );
    assert!(harness.damage.on_damage(&arrow));

    let own = damage(&inside, DamageTarget::Player(&alice), DamageSource::Player(&alice));
    assert!(!harness.damage.on_damage(&own));

    // Roads are not plots.
    let road = loc(38, 10);
    let on_road = damage(&road, DamageTarget::Player(&alice), DamageSource::Player(&bob));
    assert!(!harness.damage.on_damage(&on_road));
}

#[test]
fn damage_and_pve_flags() {
    let (harness, alice) = claimed();
    let inside = loc(10, 10);

    assert!(harness.run(&alice, "flag pve false").success);
    let attack = damage(&inside, DamageTarget::Entity, DamageSource::Player(&alice));
    assert!(harness.damage.on_damage(&attack));
    let environment = damage(&inside, DamageTarget::Entity, DamageSource::Other);
    assert!(!harness.damage.on_damage(&environment));

    assert!(harness.run(&alice, "flag damage false").success);
    let fall = damage(&inside, DamageTarget::Player(&alice), DamageSource::Other);
    assert!(harness.damage.on_damage(&fall));

    let admin = TestPlayer::new(3, "Admin").with_permission(permissions::ADMIN_BYPASS);
    let fall = damage(&inside, DamageTarget::Player(&admin), DamageSource::Other);
    assert!(!harness.damage.on_damage(&fall));
}

#[test]
fn plots_on_unclaimed_land_are_unprotected_from_damage() {
    let harness = Harness::new();
    let alice = TestPlayer::new(ALICE, "Alice");
    let bob = TestPlayer::new(BOB, "Bob");
    let inside = loc(10, 10);
    let hit = damage(&inside, DamageTarget::Player(&alice), DamageSource::Player(&bob));
    assert!(!harness.damage.on_damage(&hit));
    assert!(harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().is_none());
}
