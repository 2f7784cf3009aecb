//! Hit resolution: physics queries, spread, penetration, projectiles and damage

pub mod ballistics;
pub mod damage;
pub mod physics;
pub mod pool;
pub mod projectile;
pub mod resolve;
pub mod spread;

pub use ballistics::{BulletSimulationSettings, DropoffCurve, SpreadSettings};
pub use damage::{DamageRequest, DamageTarget, ShotSource};
pub use physics::{ActorId, ColliderInfo, CollisionWorld, HitMask, PhysicsWorld, Ray, Shape, TargetId};
pub use pool::{HandlePool, ObjectPool, PoolHandle, PrefabId};
pub use projectile::{Explosion, Projectile, ProjectileReport, ProjectileSystem};
pub use resolve::{resolve_hitscan, Impact, ShotTrace, MAX_PENETRATION_ITERATIONS};
