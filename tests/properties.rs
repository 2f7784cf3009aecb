mod common;

use glam::Vec3;
use proptest::prelude::*;
use uuid::Uuid;

use arsenal_server::hit::{
    resolve_hitscan, BulletSimulationSettings, ColliderInfo, CollisionWorld, Shape, MAX_PENETRATION_ITERATIONS,
};
use arsenal_server::net::events::WeaponEvent;
use arsenal_server::weapons::catalog::{LoadoutWeapon, WeaponCatalog, FRAG, KNIFE, PISTOL, RIFLE, SHOTGUN};
use arsenal_server::weapons::{Role, WeaponInput, WeaponRef};

use common::*;

#[derive(Debug, Clone, Copy)]
enum Action {
    Fire,
    Reload,
    Idle,
    Select(usize),
    QuickUse(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => Just(Action::Fire),
        2 => Just(Action::Reload),
        4 => Just(Action::Idle),
        1 => (0usize..4).prop_map(Action::Select),
        1 => (0usize..4).prop_map(Action::QuickUse),
    ]
}

fn input_for(action: Action) -> WeaponInput {
    match action {
        Action::Fire => fire(),
        Action::Reload => reload(),
        Action::Idle => idle(),
        Action::Select(slot) => {
            let mut select_slot = vec![false; 4];
            select_slot[slot] = true;
            WeaponInput {
                select_slot,
                ..WeaponInput::default()
            }
        }
        Action::QuickUse(slot) => {
            let mut quick_use = vec![false; 4];
            quick_use[slot] = true;
            WeaponInput {
                quick_use,
                ..WeaponInput::default()
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Rounds are only ever moved from reserve to magazine or fired
    #[test]
    fn ammo_is_conserved(
        actions in prop::collection::vec((action(), 1usize..12), 1..40),
        magazine in 0u32..=12,
        reserve in 0u32..=48,
    ) {
        let catalog = WeaponCatalog::builtin();
        let mut manager = manager_with(
            &catalog,
            vec![vec![LoadoutWeapon::new(PISTOL).with_ammo(magazine, reserve)]],
            Role::Owner,
        );
        let mut sim = Sim::new(5);
        let pistol = WeaponRef::new(0, 0);

        for (action, repeat) in actions {
            let input = input_for(action);
            for _ in 0..repeat {
                sim.tick(&mut manager, &input);
                let (m, r) = ammo(&manager, pistol);
                prop_assert!(m <= 12);
                prop_assert_eq!(m + r + sim.fire_events() as u32, magazine + reserve);
            }
        }
    }

    /// Shells loaded one at a time still conserve ammo
    #[test]
    fn procedural_reload_conserves_ammo(
        actions in prop::collection::vec((action(), 1usize..30), 1..30),
        magazine in 0u32..=6,
        reserve in 0u32..=24,
    ) {
        let catalog = WeaponCatalog::builtin();
        let mut manager = manager_with(
            &catalog,
            vec![vec![LoadoutWeapon::new(SHOTGUN).with_ammo(magazine, reserve)]],
            Role::Owner,
        );
        let mut sim = Sim::new(6);
        let shotgun = WeaponRef::new(0, 0);

        for (action, repeat) in actions {
            let input = input_for(action);
            for _ in 0..repeat {
                sim.tick(&mut manager, &input);
                let (m, r) = ammo(&manager, shotgun);
                // chambered: one more than the tube holds
                prop_assert!(m <= 7);
                prop_assert_eq!(m + r + sim.fire_events() as u32, magazine + reserve);
            }
        }
    }

    /// A switch and a quick use are never in progress together
    #[test]
    fn switch_and_quick_use_are_exclusive(
        actions in prop::collection::vec((action(), 1usize..20), 1..60),
    ) {
        let catalog = WeaponCatalog::builtin();
        let mut manager = manager_with(
            &catalog,
            vec![
                vec![LoadoutWeapon::new(RIFLE)],
                vec![LoadoutWeapon::new(PISTOL)],
                vec![LoadoutWeapon::new(KNIFE)],
                vec![LoadoutWeapon::new(FRAG)],
            ],
            Role::Owner,
        );
        let mut sim = Sim::new(7);

        for (action, repeat) in actions {
            let input = input_for(action);
            for _ in 0..repeat {
                sim.tick(&mut manager, &input);
                prop_assert!(!(manager.is_switching() && manager.is_quick_using()));
                // no shots while the current weapon is not drawn
                if manager.is_switching() {
                    let before = sim.fire_events();
                    sim.tick(&mut manager, &fire());
                    let fired_mid_switch = manager.is_switching() && sim.fire_events() > before;
                    prop_assert!(!fired_mid_switch);
                }
            }
        }
        let thrown = sim.count(|e| matches!(e, WeaponEvent::GrenadeThrown { .. }));
        prop_assert!(thrown <= 2);
    }

    /// Penetration never exceeds its budget or the iteration bound
    #[test]
    fn penetration_is_bounded(
        costs in prop::collection::vec(prop::option::of(0u32..5), 0..16),
        budget in 0u32..10,
    ) {
        let mut world = CollisionWorld::new();
        for (i, cost) in costs.iter().enumerate() {
            let info = match cost {
                Some(cost) => ColliderInfo::solid(0).penetrable(*cost),
                None => ColliderInfo::solid(0),
            };
            world.insert(
                Shape::cuboid(Vec3::new(2.0 + 2.0 * i as f32, 0.0, 0.0), Vec3::new(0.1, 1.0, 1.0)),
                info,
            );
        }
        let settings = BulletSimulationSettings {
            penetration_enabled: true,
            penetration_budget: budget,
            ..BulletSimulationSettings::default()
        };

        let trace = resolve_hitscan(&world, &settings, Uuid::new_v4(), Vec3::ZERO, Vec3::X, 500.0);
        prop_assert!(trace.advances <= MAX_PENETRATION_ITERATIONS);
        prop_assert!(trace.impacts.len() <= MAX_PENETRATION_ITERATIONS);
        prop_assert!(trace.remaining_budget <= budget);

        let spent: u32 = trace
            .impacts
            .iter()
            .filter(|impact| impact.penetrated)
            .filter_map(|impact| world.get(impact.collider).and_then(|c| c.penetration_cost))
            .sum();
        prop_assert_eq!(spent, budget - trace.remaining_budget);
        prop_assert!(trace.impacts.windows(2).all(|w| w[0].distance < w[1].distance));
        // only the last impact may stop the bullet
        if let Some((_, rest)) = trace.impacts.split_last() {
            prop_assert!(rest.iter().all(|impact| impact.penetrated));
        }
    }
}
