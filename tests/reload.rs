mod common;

use std::sync::Arc;

use arsenal_server::net::events::WeaponEvent;
use arsenal_server::weapons::catalog::{LoadoutWeapon, WeaponCatalog, PISTOL, RIFLE, SHOTGUN};
use arsenal_server::weapons::gun::{Gun, GunSettings, ReloadMode};
use arsenal_server::weapons::{Role, WeaponInput, WeaponRef};

use common::*;

fn reload_phases(sim: &Sim) -> Vec<u8> {
    sim.out
        .events
        .iter()
        .filter_map(|(_, e)| match e {
            WeaponEvent::ReloadPhase { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect()
}

fn is_reloading(manager: &arsenal_server::weapons::WeaponManager, r: WeaponRef) -> bool {
    manager
        .weapon(r)
        .and_then(|w| w.runtime.as_gun())
        .is_some_and(|g| g.is_reloading())
}

#[test]
fn chambered_reload_tops_up_one_past_the_magazine() {
    let mut catalog = WeaponCatalog::new();
    catalog.insert(
        1,
        Arc::new(Gun::new(GunSettings {
            reload_mode: ReloadMode::Chambered,
            ..GunSettings::default()
        })),
    );
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(1)]], Role::Owner);
    let mut sim = Sim::new(1);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (30, 90));

    sim.tick(&mut manager, &reload());
    assert!(is_reloading(&manager, WeaponRef::new(0, 0)));
    sim.ticks(&mut manager, &idle(), 140);

    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (31, 89));
    assert_eq!(reload_phases(&sim), vec![1, 2, 0]);
    assert!(!is_reloading(&manager, WeaponRef::new(0, 0)));
}

#[test]
fn empty_magazine_reloads_on_the_empty_timing() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(
        &catalog,
        vec![vec![LoadoutWeapon::new(RIFLE).with_ammo(0, 120)]],
        Role::Owner,
    );
    let mut sim = Sim::new(2);

    // trigger on an empty magazine starts the reload
    sim.tick(&mut manager, &fire());
    assert_eq!(
        sim.count(|e| matches!(e, WeaponEvent::ReloadPhase { phase: 1, empty: true })),
        1
    );

    // transfer is due 1.6s in, not the 1.3s of a partial reload
    sim.ticks(&mut manager, &idle(), 88);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (0, 120));
    sim.ticks(&mut manager, &idle(), 20);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (30, 90));
}

#[test]
fn full_magazine_refuses_to_reload() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(PISTOL)]], Role::Owner);
    let mut sim = Sim::new(3);

    sim.tick(&mut manager, &reload());
    sim.ticks(&mut manager, &idle(), 10);
    assert!(reload_phases(&sim).is_empty());
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (12, 48));
}

#[test]
fn firing_cancels_a_procedural_reload_with_rounds_loaded() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(
        &catalog,
        vec![vec![LoadoutWeapon::new(SHOTGUN).with_ammo(2, 24)]],
        Role::Owner,
    );
    let mut sim = Sim::new(4);

    sim.tick(&mut manager, &reload());
    assert_eq!(sim.count(|e| matches!(e, WeaponEvent::ProceduralStage { stage: 0 })), 1);
    // start 0.4s, then the first insert lands half a second later
    sim.ticks(&mut manager, &idle(), 60);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (3, 23));
    assert!(is_reloading(&manager, WeaponRef::new(0, 0)));

    sim.tick(&mut manager, &fire());
    assert_eq!(reload_phases(&sim), vec![0]);
    assert_eq!(sim.fire_events(), 1);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (2, 23));
    assert!(!is_reloading(&manager, WeaponRef::new(0, 0)));
}

#[test]
fn blocked_trigger_leaves_a_procedural_reload_running() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(
        &catalog,
        vec![vec![LoadoutWeapon::new(SHOTGUN).with_ammo(2, 24)]],
        Role::Owner,
    );
    let mut sim = Sim::new(6);

    sim.tick(&mut manager, &reload());
    sim.ticks(&mut manager, &idle(), 10);

    sim.motion.running = true;
    sim.tick(&mut manager, &fire());
    sim.tick(&mut manager, &idle());
    sim.motion.running = false;
    sim.motion.can_fire = false;
    sim.tick(&mut manager, &fire());

    assert!(is_reloading(&manager, WeaponRef::new(0, 0)));
    assert!(reload_phases(&sim).is_empty());
    assert_eq!(sim.fire_events(), 0);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (2, 24));
}

#[test]
fn chambered_reload_from_empty_conserves_reserve() {
    let mut catalog = WeaponCatalog::new();
    catalog.insert(
        1,
        Arc::new(Gun::new(GunSettings {
            reload_mode: ReloadMode::Chambered,
            ..GunSettings::default()
        })),
    );
    let mut manager = manager_with(&catalog, vec![vec![LoadoutWeapon::new(1).with_ammo(0, 90)]], Role::Owner);
    let mut sim = Sim::new(7);

    sim.tick(&mut manager, &reload());
    sim.ticks(&mut manager, &idle(), 200);

    // 31 rounds leave the reserve, so it drops to 59 rather than staying at 90
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (31, 59));
    assert_eq!(reload_phases(&sim), vec![1, 2, 0]);
}

#[test]
fn switching_away_cancels_the_reload_before_the_transfer() {
    let catalog = WeaponCatalog::builtin();
    let mut manager = manager_with(
        &catalog,
        vec![
            vec![LoadoutWeapon::new(RIFLE).with_ammo(10, 20)],
            vec![LoadoutWeapon::new(PISTOL)],
        ],
        Role::Owner,
    );
    let mut sim = Sim::new(5);

    sim.tick(&mut manager, &reload());
    let select = WeaponInput {
        select_slot: vec![false, true],
        ..idle()
    };
    sim.tick(&mut manager, &select);
    sim.ticks(&mut manager, &idle(), 60);

    assert_eq!(manager.current_weapon(), WeaponRef::new(1, 0));
    assert_eq!(reload_phases(&sim), vec![1, 0]);
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (10, 20));
    assert!(!is_reloading(&manager, WeaponRef::new(0, 0)));
}
