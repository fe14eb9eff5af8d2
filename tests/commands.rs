mod common;

use allayplots_core::config::PluginConfig;
use allayplots_core::permissions;
use allayplots_core::player::{Location, Player};
use allayplots_core::plot::{PlotFlag, PlotId};
use common::*;

const ALICE: u128 = 1;
const BOB: u128 = 2;

fn alice() -> TestPlayer {
    TestPlayer::new(ALICE, "Alice").at(10, 10)
}

fn economy_config() -> PluginConfig {
    let mut config = PluginConfig::default();
    config.economy.enabled = true;
    config
}

#[test]
fn claim_teleports_to_plot_centre() {
    let harness = Harness::new();
    let alice = alice();
    let output = harness.run(&alice, "claim");
    assert!(output.success, "{}", text(&output));
    assert!(text(&output).contains("You claimed this plot."));

    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert_eq!(plot.owner(), Some(ALICE));
    assert_eq!(plot.owner_name(), Some("Alice"));
    let location = alice.location();
    assert_eq!((location.x, location.y, location.z), (17.5, 65.0, 17.5));
}

#[test]
fn claim_taken_plot_fails() {
    let harness = Harness::new();
    assert!(harness.run(&alice(), "claim").success);

    let bob = TestPlayer::new(BOB, "Bob").at(10, 10);
    let output = harness.run(&bob, "claim");
    assert!(!output.success);
    assert!(text(&output).contains("already claimed"));
}

#[test]
fn claim_on_road_or_outside_plot_world() {
    let harness = Harness::new();
    let alice = alice().at(38, 10);
    let output = harness.run(&alice, "claim");
    assert!(!output.success);
    assert!(text(&output).contains("not standing in a plot"));

    alice.teleport(Location::new("lobby", 0.0, 64.0, 0.0));
    let output = harness.run(&alice, "claim");
    assert!(text(&output).contains("not a plot world"));
}

#[test]
fn auto_respects_plot_limit() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "auto").success);
    assert!(harness.run(&alice, "auto").success);
    let output = harness.run(&alice, "auto");
    assert!(!output.success);
    assert!(text(&output).contains("more than 2 plots"));
    assert_eq!(harness.service.count_owned_plots(WORLD, ALICE).unwrap(), 2);
    assert!(harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().is_some());
}

#[test]
fn claim_charges_and_delete_refunds() {
    let harness = Harness::with_config(economy_config());
    let alice = alice();
    harness.economy.set_balance(ALICE, "coin", 150.0);

    assert!(harness.run(&alice, "claim").success);
    assert_eq!(harness.balance(&alice), 50.0);

    alice.move_to(52, 10);
    let output = harness.run(&alice, "claim");
    assert!(!output.success);
    assert!(text(&output).contains("You need 100 to claim a plot."));
    assert_eq!(harness.balance(&alice), 50.0);
    assert!(harness.service.plot(WORLD, PlotId::new(1, 0)).unwrap().is_none());

    alice.move_to(10, 10);
    assert!(harness.run(&alice, "delete").success);
    assert_eq!(harness.balance(&alice), 100.0);
}

#[test]
fn economy_bypass_claims_for_free() {
    let harness = Harness::with_config(economy_config());
    let alice = alice().with_permission(permissions::ECONOMY_BYPASS);
    assert!(harness.run(&alice, "claim").success);
    assert_eq!(harness.balance(&alice), 0.0);
}

#[test]
fn delete_needs_ownership_or_admin() {
    let harness = Harness::new();
    assert!(harness.run(&alice(), "claim").success);

    let bob = TestPlayer::new(BOB, "Bob").at(10, 10);
    let output = harness.run(&bob, "delete");
    assert!(!output.success);
    assert!(text(&output).contains("do not own"));

    let admin = TestPlayer::new(BOB, "Bob")
        .with_permission(permissions::ADMIN_DELETE)
        .at(10, 10);
    assert!(harness.run(&admin, "delete").success);
    assert!(harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().is_none());
}

#[test]
fn trust_and_deny_change_access() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);

    let output = harness.run(&alice, "trust bob");
    assert!(!output.success);
    assert!(text(&output).contains("No player matches bob."));

    harness.lookup.add(BOB, "Bob");
    assert!(harness.run(&alice, "trust bob").success);
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert!(plot.can_build(BOB));

    let output = harness.run(&alice, "deny Bob");
    assert!(text(&output).contains("Bob is now denied from this plot."));
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert!(!plot.can_enter(BOB));
    assert!(!plot.trusted().contains(&BOB));

    assert!(harness.run(&alice, "undeny bob").success);
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert!(plot.can_enter(BOB));
}

#[test]
fn ambiguous_target_is_rejected() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);
    harness.lookup.add(BOB, "Bob");
    harness.lookup.add(3, "Carol");
    let output = harness.run(&alice, "trust @a");
    assert!(!output.success);
    assert!(text(&output).contains("matches more than one player"));
}

#[test]
fn merge_opens_road_between_plots() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);
    alice.move_to(52, 10);
    assert!(harness.run(&alice, "claim").success);

    alice.move_to(10, 10);
    let output = harness.run(&alice, "merge east");
    assert!(output.success, "{}", text(&output));
    assert!(text(&output).contains("Merged with plot 1;0."));

    let resolved = harness.service.resolve_plot(WORLD, 38, 10).unwrap().unwrap();
    assert_eq!(resolved.id, PlotId::new(0, 0));
    assert_eq!(
        harness.editor.block_at(38, 64, 10).as_deref(),
        Some("minecraft:grass_block")
    );

    let output = harness.run(&alice, "merge east");
    assert!(text(&output).contains("already merged"));

    assert!(harness.run(&alice, "unmerge east").success);
    assert_eq!(harness.service.resolve_plot(WORLD, 38, 10).unwrap(), None);
    assert_eq!(
        harness.editor.block_at(38, 64, 10).as_deref(),
        Some("minecraft:oak_planks")
    );
}

#[test]
fn merge_direction_follows_facing() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);
    alice.move_to(10, 52);
    assert!(harness.run(&alice, "claim").success);

    alice.move_to(10, 10);
    alice.face(0.0);
    assert!(harness.run(&alice, "merge").success);
    assert_eq!(
        harness.service.resolve_plot(WORLD, 10, 38).unwrap().map(|loc| loc.id),
        Some(PlotId::new(0, 0))
    );
}

#[test]
fn merge_rejects_other_owners_and_bad_directions() {
    let harness = Harness::new();
    assert!(harness.run(&alice(), "claim").success);
    let bob = TestPlayer::new(BOB, "Bob").at(52, 10);
    assert!(harness.run(&bob, "claim").success);

    let alice = alice();
    let output = harness.run(&alice, "merge east");
    assert!(text(&output).contains("same owner"));
    let output = harness.run(&alice, "merge west");
    assert!(text(&output).contains("not claimed"));
    let output = harness.run(&alice, "merge up");
    assert!(text(&output).contains("Unknown direction up"));
}

#[test]
fn flags_can_be_set_and_reset() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);

    assert!(harness.run(&alice, "flag pvp off").success);
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert!(!plot.flag(PlotFlag::Pvp));

    let output = harness.run(&alice, "flag pvp");
    assert!(text(&output).contains("Flag pvp is false"));

    let output = harness.run(&alice, "flag pvp default");
    assert!(text(&output).contains("Flag pvp reset to true."));
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert_eq!(plot.flag_raw("pvp"), None);

    let output = harness.run(&alice, "flag pvp maybe");
    assert!(!output.success);
    assert!(text(&output).contains("true or false"));

    let output = harness.run(&alice, "flag fly true");
    assert!(text(&output).contains("Unknown flag fly"));

    let output = harness.run(&alice, "flags");
    assert!(text(&output).contains("entry=true, build=false, pvp=true, pve=true, damage=true"));
}

#[test]
fn flags_need_ownership() {
    let harness = Harness::new();
    assert!(harness.run(&alice(), "claim").success);
    let bob = TestPlayer::new(BOB, "Bob").at(10, 10);
    let output = harness.run(&bob, "flag build true");
    assert!(!output.success);
    assert!(text(&output).contains("do not own"));
}

#[test]
fn home_teleports_to_home_plot() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);
    alice.move_to(52, 10);
    assert!(harness.run(&alice, "claim").success);
    let output = harness.run(&alice, "sethome");
    assert!(output.success);
    assert!(text(&output).contains("Your home plot is now 1;0 in plotworld."));

    alice.move_to(-100, -100);
    assert!(harness.run(&alice, "home").success);
    let location = alice.location();
    assert_eq!((location.x, location.z), (59.5, 17.5));
}

#[test]
fn home_of_other_players_needs_bypass() {
    let harness = Harness::new();
    assert!(harness.run(&alice(), "claim").success);
    harness.lookup.add(ALICE, "Alice");

    let bob = TestPlayer::new(BOB, "Bob");
    let output = harness.run(&bob, "home alice");
    assert!(text(&output).contains("do not have permission"));

    let admin = TestPlayer::new(BOB, "Bob").with_permission(permissions::ADMIN_BYPASS);
    assert!(harness.run(&admin, "home alice").success);

    let output = harness.run(&bob, "home");
    assert!(text(&output).contains("Bob has no home plot."));
}

#[test]
fn setowner_transfers_plot() {
    let harness = Harness::new();
    let alice = alice();
    assert!(harness.run(&alice, "claim").success);
    harness.lookup.add(BOB, "Bob");
    let output = harness.run(&alice, "setowner bob");
    assert!(output.success);
    assert!(text(&output).contains("Bob now owns plot 0;0 in plotworld."));
    let plot = harness.service.plot(WORLD, PlotId::new(0, 0)).unwrap().unwrap();
    assert_eq!(plot.owner(), Some(BOB));
    assert_eq!(harness.service.find_home_plot(BOB).unwrap().map(|home| home.id), Some(PlotId::new(0, 0)));
}

#[test]
fn info_describes_plot() {
    let harness = Harness::new();
    let alice = alice();
    let output = harness.run(&alice, "info");
    assert!(text(&output).contains("Plot 0;0 in plotworld"));
    assert!(text(&output).contains("Unclaimed"));

    assert!(harness.run(&alice, "claim").success);
    let output = harness.run(&alice, "info");
    assert!(text(&output).contains("Owner: Alice"));
    assert!(text(&output).contains("Trusted: 0 Denied: 0"));
}

#[test]
fn revoked_command_permission_blocks_everything() {
    let harness = Harness::new();
    let alice = alice().without_permission(permissions::COMMAND_PLOT);
    let output = harness.run(&alice, "claim");
    assert!(!output.success);
    assert!(text(&output).contains("do not have permission"));
}

#[test]
fn unknown_subcommand_and_help() {
    let harness = Harness::new();
    let alice = alice();
    let output = harness.run(&alice, "fly");
    assert!(!output.success);
    assert!(text(&output).contains("Unknown subcommand"));

    let output = harness.run(&alice, "");
    assert!(output.success);
    assert!(text(&output).contains("/plot claim"));
}

#[test]
fn output_converts_to_json_components() {
    let harness = Harness::new();
    let output = harness.run(&alice(), "claim");
    let json = output.json_lines();
    assert_eq!(json.len(), 1);
    assert!(json[0].starts_with(r#"{"text":"","extra":[{"text":"[","color":"dark_gray"}"#));
    assert!(json[0].contains(r#"{"text":"You claimed this plot.","color":"green"}"#));
}

#[test]
fn completion() {
    let harness = Harness::new();
    assert_eq!(harness.command.complete(&["un"]), vec!["unmerge", "untrust", "undeny"]);
    assert_eq!(harness.command.complete(&["merge", "s"]), vec!["south"]);
    assert_eq!(harness.command.complete(&["flag", "p"]), vec!["pvp", "pve"]);
    assert_eq!(harness.command.complete(&["flag", "pvp", "f"]), vec!["false"]);
    assert!(harness.command.complete(&["claim", "x"]).is_empty());
}
