mod common;

use bytes::Bytes;
use glam::Vec3;
use uuid::Uuid;

use arsenal_server::hit::{ColliderInfo, HitMask, Shape};
use arsenal_server::net::{decode_frame, encode_event, encode_periodic, DiscreteEvent, Frame, Replica, WeaponEvent};
use arsenal_server::weapons::catalog::{Loadout, LoadoutWeapon, WeaponCatalog, PISTOL, RIFLE};
use arsenal_server::weapons::{Role, WeaponInput, WeaponManager, WeaponRef};

use common::*;

/// An owner simulation wired to a replica through the binary codec
struct Link {
    owner: Sim,
    manager: WeaponManager,
    mirror: Sim,
    replica: Replica,
    frames: usize,
}

impl Link {
    fn new(slots: Vec<Vec<LoadoutWeapon>>) -> Self {
        let catalog = WeaponCatalog::builtin();
        let owner = Sim::new(11);
        let mirror = Sim::replica_of(&owner, 12);
        let manager = manager_with(&catalog, slots.clone(), Role::Owner);
        let replica = Replica::from_loadout(owner.actor, &Loadout::from_slots(slots), &catalog).expect("loadout");
        Self {
            owner,
            manager,
            mirror,
            replica,
            frames: 0,
        }
    }

    /// One tick on both ends; periodic state goes out every third tick
    fn step(&mut self, input: &WeaponInput, force_periodic: bool) {
        self.owner.tick(&mut self.manager, input);
        let tick = self.owner.clock.tick();

        let mut wire: Vec<Bytes> = self
            .owner
            .take_events()
            .iter()
            .map(|event| encode_event(event).expect("encode event"))
            .collect();
        if force_periodic || tick % 3 == 0 {
            let periodic = self.manager.periodic_state(self.owner.actor, tick, input);
            wire.push(encode_periodic(&periodic).expect("encode periodic"));
        }

        self.mirror.clock.advance();
        for bytes in wire {
            self.frames += 1;
            let applied = match decode_frame(&bytes).expect("decode") {
                Frame::Event(event) => {
                    let mut ctx = self.mirror.context(&idle());
                    self.replica.apply_event(&event, &mut ctx)
                }
                Frame::Periodic(state) => self.replica.apply_periodic(&state),
            };
            assert!(applied, "frame dropped on tick {tick}");
        }
        let input = self.replica.input().clone();
        let mut ctx = self.mirror.context(&input);
        self.replica.update(&mut ctx);
    }

    fn steps(&mut self, input: &WeaponInput, count: usize) {
        for _ in 0..count {
            self.step(input, false);
        }
    }

    fn assert_converged(&self) {
        let mirrored = self.replica.manager();
        assert_eq!(mirrored.current_weapon(), self.manager.current_weapon());
        assert_eq!(mirrored.is_switching(), self.manager.is_switching());
        for r in [WeaponRef::new(0, 0), WeaponRef::new(1, 0)] {
            assert_eq!(ammo(mirrored, r), ammo(&self.manager, r), "ammo of {r}");
            let phase = |m: &WeaponManager| m.weapon(r).and_then(|w| w.runtime.as_gun()).map(|g| g.reload_phase());
            assert_eq!(phase(mirrored), phase(&self.manager), "reload phase of {r}");
        }
        assert_eq!(self.replica.last_seq(), Some(self.owner.next_seq));
    }
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
fn replayed_frames_reproduce_the_owner_state() {
    let mut link = Link::new(vec![
        vec![LoadoutWeapon::new(PISTOL).with_ammo(12, 48)],
        vec![LoadoutWeapon::new(RIFLE).with_ammo(30, 120)],
    ]);

    for _ in 0..3 {
        link.step(&fire(), false);
        link.steps(&idle(), 9);
    }
    assert_eq!(ammo(link.replica.manager(), WeaponRef::new(0, 0)), (9, 48));

    link.step(&reload(), false);
    link.steps(&idle(), 100);
    assert_eq!(ammo(&link.manager, WeaponRef::new(0, 0)), (12, 45));
    assert_eq!(ammo(link.replica.manager(), WeaponRef::new(0, 0)), (12, 45));

    link.step(&select(1), false);
    link.steps(&idle(), 60);
    assert_eq!(link.replica.manager().current_weapon(), WeaponRef::new(1, 0));

    // automatic fire replicates through the periodic firing flag
    link.steps(&fire(), 30);
    let (owner_magazine, _) = ammo(&link.manager, WeaponRef::new(1, 0));
    assert!(owner_magazine < 30);
    let (mirrored_magazine, _) = ammo(link.replica.manager(), WeaponRef::new(1, 0));
    assert!(mirrored_magazine < 30);

    link.steps(&idle(), 90);
    link.step(&idle(), true);
    link.assert_converged();
    assert!(link.frames > 0);
}

#[test]
fn duplicate_and_stale_frames_are_dropped() {
    let mut link = Link::new(vec![vec![LoadoutWeapon::new(PISTOL).with_ammo(12, 48)]]);
    link.owner.tick(&mut link.manager, &fire());
    let events = link.owner.take_events();
    assert_eq!(events.len(), 1);
    let bytes = encode_event(&events[0]).expect("encode");

    link.mirror.clock.advance();
    let Frame::Event(event) = decode_frame(&bytes).expect("decode") else {
        panic!("expected an event frame");
    };
    let mut ctx = link.mirror.context(&idle());
    assert!(link.replica.apply_event(&event, &mut ctx));
    assert!(!link.replica.apply_event(&event, &mut ctx));
    assert_eq!(ammo(link.replica.manager(), WeaponRef::new(0, 0)), (11, 48));

    let newer = link.manager.periodic_state(link.owner.actor, 10, &idle());
    let older = link.manager.periodic_state(link.owner.actor, 9, &idle());
    assert!(link.replica.apply_periodic(&newer));
    assert!(!link.replica.apply_periodic(&older));

    let stranger = link.manager.periodic_state(Uuid::new_v4(), 11, &idle());
    assert!(!link.replica.apply_periodic(&stranger));
}

#[test]
fn mirror_with_hit_authority_resolves_announced_shots() {
    let mut link = Link::new(vec![vec![LoadoutWeapon::new(PISTOL)]]);
    link.mirror.resolve_hits = true;
    let target = Uuid::new_v4();
    link.mirror.world.insert(
        Shape::cuboid(Vec3::new(0.0, 0.0, -8.0), Vec3::splat(0.5)),
        ColliderInfo::solid(0).on_layer(HitMask::ACTORS).with_target(target),
    );

    link.step(&fire(), true);

    assert!(link.owner.out.damage.is_empty());
    assert_eq!(link.mirror.out.damage.len(), 1);
    assert_eq!(link.mirror.out.damage[0].target, target);
    assert_eq!(link.mirror.out.damage[0].attacker, link.owner.actor);
}

/// A shot as a client-owned simulation would announce it
fn client_shot(link: &Link, seq: u32, directions: Vec<Vec3>) -> DiscreteEvent {
    DiscreteEvent {
        actor: link.owner.actor,
        seq,
        tick: 1,
        weapon: WeaponRef::new(0, 0),
        event: WeaponEvent::Fire {
            last_round: false,
            origin: Vec3::ZERO,
            directions,
        },
    }
}

fn authoritative_link(magazine: u32) -> (Link, Uuid) {
    let mut link = Link::new(vec![vec![LoadoutWeapon::new(RIFLE).with_ammo(magazine, 0)]]);
    link.mirror.resolve_hits = true;
    let target = Uuid::new_v4();
    link.mirror.world.insert(
        Shape::cuboid(Vec3::new(0.0, 0.0, -8.0), Vec3::splat(0.5)),
        ColliderInfo::solid(0).on_layer(HitMask::ACTORS).with_target(target),
    );
    link.mirror.clock.advance();
    (link, target)
}

#[test]
fn hit_authority_ignores_shots_from_an_empty_magazine() {
    let (mut link, _) = authoritative_link(0);
    let shot = client_shot(&link, 1, vec![Vec3::NEG_Z; 64]);

    let mut ctx = link.mirror.context(&idle());
    assert!(link.replica.apply_event(&shot, &mut ctx));

    assert!(link.mirror.out.damage.is_empty());
    assert_eq!(ammo(link.replica.manager(), WeaponRef::new(0, 0)), (0, 0));
}

#[test]
fn hit_authority_resolves_no_more_samples_than_the_weapon_fires() {
    let (mut link, target) = authoritative_link(30);
    let shot = client_shot(&link, 1, vec![Vec3::NEG_Z; 64]);

    let mut ctx = link.mirror.context(&idle());
    assert!(link.replica.apply_event(&shot, &mut ctx));

    // a rifle shot is a single sample
    assert_eq!(link.mirror.out.damage.len(), 1);
    assert_eq!(link.mirror.out.damage[0].target, target);
    assert_eq!(ammo(link.replica.manager(), WeaponRef::new(0, 0)), (29, 0));
}
