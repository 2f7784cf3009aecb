//! Per-player gun runtime state

use super::recoil::RecoilState;
use super::settings::{GunSettings, ReloadMode};
use crate::weapons::behavior::AmmoGrant;

/// Reload episode kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// `Simple`, `FullEmpty` and `Chambered`: phase 1 waits for the ammo
    /// transfer, phase 2 for the end of the animation
    Magazine,
    /// Round-by-round: stages 0 start, 1 decision, 2 insert-begin,
    /// 3 insert-end / loop, 4 end
    Procedural,
}

/// One running reload. Absent when idle (phase 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReloadEpisode {
    pub kind: ReloadKind,
    pub phase: u8,
    pub deadline: f64,
    /// Magazine was empty when the episode started
    pub empty: bool,
    /// Simulation time the episode started
    pub started_at: f64,
}

pub const BOLT_IDLE: u8 = 0;
pub const BOLT_EJECT_PENDING: u8 = 1;
pub const BOLT_LAST_EJECT_PENDING: u8 = 2;

/// Bolt-action sub-state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoltState {
    pub stage: u8,
    pub deadline: f64,
}

impl Default for BoltState {
    fn default() -> Self {
        Self {
            stage: BOLT_IDLE,
            deadline: 0.0,
        }
    }
}

/// Shots left in a running burst
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BurstState {
    pub remaining: u32,
    pub next_shot: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GunState {
    pub magazine: u32,
    pub reserve: u32,
    pub fire_mode_index: u8,
    /// Time of the last shot. Bolt-action stores the time the bolt is ready.
    pub last_fire: f64,
    pub dry_fire_until: f64,
    /// Trigger held with an automatic mode and ammo; replicas replay fire from it
    pub is_firing: bool,
    pub aiming: bool,
    pub aim_progress: f32,
    pub reload: Option<ReloadEpisode>,
    pub bolt: BoltState,
    pub burst: BurstState,
    pub spray: f32,
    pub recoil: RecoilState,
    pub shell_eject_at: Option<f64>,
    pub trigger_held: bool,
    pub reload_held: bool,
    pub toggle_held: bool,
}

impl GunState {
    pub fn new(settings: &GunSettings, grant: AmmoGrant) -> Self {
        let cap = settings.reload_cap();
        Self {
            magazine: grant.magazine.unwrap_or(settings.magazine_size).min(cap),
            reserve: grant.reserve.unwrap_or(settings.max_reserve),
            fire_mode_index: 0,
            last_fire: f64::NEG_INFINITY,
            dry_fire_until: f64::NEG_INFINITY,
            is_firing: false,
            aiming: false,
            aim_progress: 0.0,
            reload: None,
            bolt: BoltState::default(),
            burst: BurstState::default(),
            spray: 0.0,
            recoil: RecoilState::default(),
            shell_eject_at: None,
            trigger_held: false,
            reload_held: false,
            toggle_held: false,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload.is_some()
    }

    /// Current reload phase, 0 when idle
    pub fn reload_phase(&self) -> u8 {
        self.reload.map(|episode| episode.phase).unwrap_or(0)
    }

    /// Reload entry guard: reserve left and room in the magazine
    pub fn can_reload(&self, settings: &GunSettings) -> bool {
        self.reserve > 0 && self.magazine < settings.reload_cap()
    }

    /// Rounds a full magazine transfer moves from reserve
    pub fn transfer_amount(&self, settings: &GunSettings) -> u32 {
        let cap = settings.reload_cap();
        cap.min(self.magazine.saturating_add(self.reserve))
            .saturating_sub(self.magazine)
    }

    /// Move rounds from reserve into the magazine
    pub fn transfer(&mut self, amount: u32, unlimited_reloads: bool) {
        self.magazine += amount;
        if !unlimited_reloads {
            self.reserve -= amount.min(self.reserve);
        }
    }

    /// Whether a procedural reload may insert another round
    pub fn can_insert(&self, settings: &GunSettings) -> bool {
        self.reserve > 0 && self.magazine < settings.reload_cap()
    }

    pub fn clear_transient(&mut self) {
        self.reload = None;
        self.burst = BurstState::default();
        self.is_firing = false;
        self.aiming = false;
        self.aim_progress = 0.0;
        self.trigger_held = false;
    }
}

/// Reload kind used by a mode
pub fn kind_for(mode: ReloadMode) -> ReloadKind {
    if mode.is_procedural() {
        ReloadKind::Procedural
    } else {
        ReloadKind::Magazine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chambered() -> GunSettings {
        GunSettings {
            magazine_size: 30,
            reload_mode: ReloadMode::Chambered,
            ..GunSettings::default()
        }
    }

    #[test]
    fn chambered_transfer_tops_up_to_thirty_one() {
        let settings = chambered();
        let mut state = GunState::new(&settings, AmmoGrant { magazine: Some(30), reserve: Some(90) });
        let amount = state.transfer_amount(&settings);
        assert_eq!(amount, 1);
        state.transfer(amount, false);
        assert_eq!((state.magazine, state.reserve), (31, 89));
    }

    #[test]
    fn transfer_is_bounded_by_reserve() {
        let settings = chambered();
        let state = GunState::new(&settings, AmmoGrant { magazine: Some(10), reserve: Some(5) });
        assert_eq!(state.transfer_amount(&settings), 5);
    }

    #[test]
    fn unlimited_reloads_keep_reserve() {
        let settings = GunSettings::default();
        let mut state = GunState::new(&settings, AmmoGrant { magazine: Some(0), reserve: Some(90) });
        let amount = state.transfer_amount(&settings);
        state.transfer(amount, true);
        assert_eq!((state.magazine, state.reserve), (30, 90));
    }

    #[test]
    fn guard_refuses_full_magazine_or_empty_reserve() {
        let settings = GunSettings::default();
        let full = GunState::new(&settings, AmmoGrant { magazine: Some(30), reserve: Some(90) });
        assert!(!full.can_reload(&settings));
        let dry = GunState::new(&settings, AmmoGrant { magazine: Some(3), reserve: Some(0) });
        assert!(!dry.can_reload(&settings));
    }
}
