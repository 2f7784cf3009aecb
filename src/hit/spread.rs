//! Shot spread sampling

use glam::{Quat, Vec2, Vec3};
use rand::Rng;

use super::ballistics::SpreadSettings;

/// `uniform(-half, +half)`, zero for a non-positive half width
fn symmetric<R: Rng>(rng: &mut R, half: f32) -> f32 {
    if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

fn sample_axis<R: Rng>(rng: &mut R, base: f32, add: f32, velocity_ratio: f32) -> f32 {
    symmetric(rng, base) + symmetric(rng, add) * velocity_ratio
}

/// Sample a spread offset in aim space.
///
/// The hip and aim samples are drawn independently and blended by
/// `aim_progress`; the spray offset, if any, is added after the blend.
pub fn sample_spread<R: Rng>(
    settings: &SpreadSettings,
    aim_progress: f32,
    speed: f32,
    spray_accumulator: f32,
    rng: &mut R,
) -> Vec2 {
    let velocity_ratio = if settings.reference_velocity > 0.0 {
        speed / settings.reference_velocity
    } else {
        0.0
    };

    let hip = Vec2::new(
        sample_axis(rng, settings.hip_base, settings.hip_velocity_add, velocity_ratio),
        sample_axis(rng, settings.hip_base, settings.hip_velocity_add, velocity_ratio),
    );
    let aim = Vec2::new(
        sample_axis(rng, settings.aim_base, settings.aim_velocity_add, velocity_ratio),
        sample_axis(rng, settings.aim_base, settings.aim_velocity_add, velocity_ratio),
    );

    let mut spread = hip.lerp(aim, aim_progress.clamp(0.0, 1.0));
    if settings.spray_active() {
        spread += spray_offset(&settings.spray_pattern, spray_accumulator);
    }
    spread
}

/// Spray table lookup, index clamped to the table bounds
pub fn spray_offset(pattern: &[Vec2], accumulator: f32) -> Vec2 {
    if pattern.is_empty() {
        return Vec2::ZERO;
    }
    let index = (accumulator.max(0.0) as usize).min(pattern.len() - 1);
    pattern[index]
}

/// Forward vector of an aim rotation (-Z forward, +Y up)
pub fn forward(aim: Quat) -> Vec3 {
    aim * Vec3::NEG_Z
}

/// Turn an aim-space spread offset into a world direction
pub fn apply_spread(aim: Quat, spread: Vec2) -> Vec3 {
    let forward = aim * Vec3::NEG_Z;
    let right = aim * Vec3::X;
    let up = aim * Vec3::Y;
    (forward + right * spread.x + up * spread.y).normalize_or(forward)
}
