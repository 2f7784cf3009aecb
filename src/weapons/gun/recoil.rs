//! Recoil impulse ramp and return

use glam::Vec2;
use rand::Rng;

use super::settings::RecoilSettings;

/// Accumulated recoil offset in radians (x yaw, y pitch)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecoilState {
    pub offset: Vec2,
    impulse: Vec2,
    ramp_left: f32,
}

impl RecoilState {
    /// Start a new impulse sampled between `min` and `max` per axis.
    /// The unapplied part of a running impulse carries over.
    pub fn kick<R: Rng>(&mut self, settings: &RecoilSettings, rng: &mut R) {
        let sample = Vec2::new(
            sample_between(rng, settings.min.x, settings.max.x),
            sample_between(rng, settings.min.y, settings.max.y),
        );
        let leftover = if settings.ramp_time > 0.0 {
            self.impulse * (self.ramp_left / settings.ramp_time).clamp(0.0, 1.0)
        } else {
            Vec2::ZERO
        };
        if settings.ramp_time > 0.0 {
            self.impulse = sample + leftover;
            self.ramp_left = settings.ramp_time;
        } else {
            self.offset += sample;
            self.impulse = Vec2::ZERO;
            self.ramp_left = 0.0;
        }
    }

    pub fn update(&mut self, settings: &RecoilSettings, dt: f32) {
        if self.ramp_left > 0.0 && settings.ramp_time > 0.0 {
            let step = dt.min(self.ramp_left);
            self.offset += self.impulse * (step / settings.ramp_time);
            self.ramp_left -= step;
            return;
        }
        let length = self.offset.length();
        let back = settings.return_speed * dt;
        self.offset = if length <= back || length == 0.0 {
            Vec2::ZERO
        } else {
            self.offset * ((length - back) / length)
        };
    }

    pub fn is_settled(&self) -> bool {
        self.ramp_left <= 0.0 && self.offset == Vec2::ZERO
    }
}

fn sample_between<R: Rng>(rng: &mut R, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}
