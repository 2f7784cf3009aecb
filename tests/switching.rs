mod common;

use arsenal_server::net::events::WeaponEvent;
use arsenal_server::weapons::catalog::{LoadoutWeapon, WeaponCatalog, FRAG, PISTOL, RIFLE};
use arsenal_server::weapons::{Role, WeaponInput, WeaponManager, WeaponRef};

use common::*;

fn loadout_manager() -> WeaponManager {
    manager_with(
        &WeaponCatalog::builtin(),
        vec![
            vec![LoadoutWeapon::new(RIFLE)],
            vec![LoadoutWeapon::new(PISTOL)],
            vec![LoadoutWeapon::new(FRAG)],
        ],
        Role::Owner,
    )
}

fn select(slot: usize) -> WeaponInput {
    let mut select_slot = vec![false; slot + 1];
    select_slot[slot] = true;
    WeaponInput {
        select_slot,
        ..WeaponInput::default()
    }
}

#[test]
fn slot_switch_holds_fire_until_the_draw_completes() {
    let mut manager = loadout_manager();
    let mut sim = Sim::new(1);

    sim.tick(&mut manager, &select(1));
    assert_eq!(manager.desired_weapon(), WeaponRef::new(1, 0));
    assert!(manager.is_switching());

    // rifle putaway 0.4s plus pistol draw 0.3s
    for _ in 0..30 {
        sim.tick(&mut manager, &fire());
        sim.tick(&mut manager, &idle());
        if !manager.is_switching() {
            break;
        }
    }
    assert!(!manager.is_switching());
    assert_eq!(manager.current_weapon(), WeaponRef::new(1, 0));
    assert_eq!(sim.fire_events(), 0);

    // a trigger held through the draw needs a fresh pull
    sim.tick(&mut manager, &idle());
    sim.tick(&mut manager, &fire());
    assert_eq!(sim.fire_events(), 1);
    assert!(sim
        .out
        .events
        .iter()
        .any(|(r, e)| *r == WeaponRef::new(1, 0) && matches!(e, WeaponEvent::Fire { .. })));
    assert_eq!(ammo(&manager, WeaponRef::new(0, 0)), (30, 120));
}

#[test]
fn grenade_quick_use_runs_before_a_queued_switch() {
    let mut manager = loadout_manager();
    let mut sim = Sim::new(2);
    let hold_quick = WeaponInput {
        quick_use: vec![false, false, true],
        ..WeaponInput::default()
    };

    for tick in 1..=240 {
        let input = match tick {
            1..=10 => hold_quick.clone(),
            15 => select(1),
            _ => idle(),
        };
        sim.tick(&mut manager, &input);
        assert!(
            !(manager.is_switching() && manager.is_quick_using()),
            "switch and quick use overlap on tick {tick}"
        );
        if tick == 20 {
            assert!(manager.is_quick_using());
            assert_eq!(manager.desired_weapon(), WeaponRef::new(1, 0));
            assert!(!manager.is_switching());
        }
    }

    assert_eq!(sim.count(|e| matches!(e, WeaponEvent::GrenadePinPulled)), 1);
    assert_eq!(sim.count(|e| matches!(e, WeaponEvent::GrenadeThrown { .. })), 1);
    let grenade = manager
        .weapon(WeaponRef::new(2, 0))
        .and_then(|w| w.runtime.as_grenade())
        .map(|g| g.count);
    assert_eq!(grenade, Some(1));
    assert_eq!(sim.projectiles.len(), 1);

    assert!(!manager.is_quick_using());
    assert!(!manager.is_switching());
    assert_eq!(manager.current_weapon(), WeaponRef::new(1, 0));
}
