mod common;

use std::sync::Arc;

use arsenal_server::net::events::WeaponEvent;
use arsenal_server::weapons::catalog::{LoadoutWeapon, WeaponCatalog, PISTOL, RIFLE, SNIPER};
use arsenal_server::weapons::gun::{FireMode, Gun, GunSettings};
use arsenal_server::weapons::{Role, WeaponRef};

use common::*;

const TEST_GUN: i32 = 100;

fn catalog_with(settings: GunSettings) -> WeaponCatalog {
    let mut catalog = WeaponCatalog::builtin();
    catalog.insert(TEST_GUN, Arc::new(Gun::new(settings)));
    catalog
}

#[test]
fn semi_pulls_inside_the_fire_interval_are_refused() {
    // 600 rpm: one shot per 0.1s
    let catalog = catalog_with(GunSettings {
        fire_modes: vec![FireMode::Semi],
        rpm: 600.0,
        ..GunSettings::default()
    });
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(TEST_GUN)]], Role::Owner);
    let mut sim = Sim::new(1);

    sim.tick(&mut manager, &fire());
    sim.tick(&mut manager, &idle());
    // 0.033s after the first shot
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 1);

    sim.ticks(&mut manager, &idle(), 4);
    // tick 8, 0.117s after the first shot
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 2);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (28, 90));
}

#[test]
fn holding_a_semi_trigger_fires_once() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(PISTOL)]], Role::Owner);
    let mut sim = Sim::new(2);

    sim.ticks(&mut manager, &fire(), 60);
    assert_eq!(sim.fire_events(), 1);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)).0, 11);
}

#[test]
fn empty_gun_without_reserve_dry_fires_with_a_penalty() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(
        &catalog,
        vec![vec![LoadoutWeapon::new(PISTOL).with_ammo(0, 0)]],
        Role::Owner,
    );
    let mut sim = Sim::new(3);
    let dry = |e: &WeaponEvent| matches!(e, WeaponEvent::DryFire);

    sim.tick(&mut manager, &fire());
    assert_eq!(sim.count(dry), 1);

    // inside the 0.3s penalty
    sim.tick(&mut manager, &idle());
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.count(dry), 1);

    sim.ticks(&mut manager, &idle(), 20);
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.count(dry), 2);
    assert_eq!(sim.fire_events(), 0);
    assert!(!manager.weapon_state().reloading);
}

#[test]
fn auto_fire_follows_the_rate_without_announcing_shots() {
    let catalog = catalog_with(GunSettings {
        fire_modes: vec![FireMode::Auto],
        rpm: 600.0,
        ..GunSettings::default()
    });
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(TEST_GUN)]], Role::Owner);
    let mut sim = Sim::new(4);

    // one second of held trigger: shots on ticks 1, 7, ... 55
    sim.ticks(&mut manager, &fire(), 60);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)).0, 20);
    assert_eq!(sim.fire_events(), 0);

    let periodic = manager.periodic_state(sim.actor, sim.clock.tick(), &fire());
    assert!(periodic.weapons[0].firing);

    sim.tick(&mut manager, &idle());
    let periodic = manager.periodic_state(sim.actor, sim.clock.tick(), &idle());
    assert!(!periodic.weapons[0].firing);
}

#[test]
fn running_blocks_the_trigger_until_the_delay_passes() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(PISTOL)]], Role::Owner);
    let mut sim = Sim::new(5);

    sim.motion.running = true;
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 0);

    sim.motion.running = false;
    sim.motion.last_run_time = sim.now();
    sim.tick(&mut manager, &idle());
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 0);

    sim.ticks(&mut manager, &idle(), 6);
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 1);
}

#[test]
fn burst_mode_fires_the_whole_burst_from_one_pull() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(RIFLE)]], Role::Owner);
    let mut sim = Sim::new(6);

    let toggle = arsenal_server::weapons::WeaponInput {
        toggle_fire_mode: true,
        ..idle()
    };
    sim.tick(&mut manager, &toggle);
    assert_eq!(
        sim.count(|e| matches!(e, WeaponEvent::FireModeChanged { mode_index: 1 })),
        1
    );

    sim.tick(&mut manager, &fire());
    sim.ticks(&mut manager, &idle(), 20);
    assert_eq!(sim.count(|e| matches!(e, WeaponEvent::BurstBegin { count: 3 })), 1);
    assert_eq!(sim.fire_events(), 3);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)).0, 27);
}

#[test]
fn bolt_action_waits_for_the_bolt_cycle() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(SNIPER)]], Role::Owner);
    let mut sim = Sim::new(7);
    let cycled = |e: &WeaponEvent| matches!(e, WeaponEvent::BoltCycled { last_round: false });

    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 1);

    // bolt still cycling at 0.5s
    sim.ticks(&mut manager, &idle(), 28);
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 1);

    sim.ticks(&mut manager, &idle(), 10);
    assert_eq!(sim.count(cycled), 1);

    sim.ticks(&mut manager, &idle(), 40);
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 2);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)).0, 3);
}
