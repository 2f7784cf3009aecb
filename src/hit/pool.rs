//! Object pool seam for projectiles and impact cosmetics

use std::collections::HashMap;

use glam::{Quat, Vec3};

/// Prefab identifier understood by the pool owner
pub type PrefabId = u32;

/// Handle to a pooled object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(pub u64);

/// Pooled instantiation, owned outside the weapon core
pub trait ObjectPool {
    fn acquire(&mut self, prefab: PrefabId, position: Vec3, rotation: Quat) -> PoolHandle;
    fn release(&mut self, handle: PoolHandle);
}

/// Bookkeeping pool used by the session host: hands out handles and tracks
/// which are live.
#[derive(Debug, Default)]
pub struct HandlePool {
    next: u64,
    live: HashMap<PoolHandle, PrefabId>,
    released: u64,
}

impl HandlePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn released_count(&self) -> u64 {
        self.released
    }

    pub fn is_live(&self, handle: PoolHandle) -> bool {
        self.live.contains_key(&handle)
    }
}

impl ObjectPool for HandlePool {
    fn acquire(&mut self, prefab: PrefabId, _position: Vec3, _rotation: Quat) -> PoolHandle {
        self.next += 1;
        let handle = PoolHandle(self.next);
        self.live.insert(handle, prefab);
        handle
    }

    fn release(&mut self, handle: PoolHandle) {
        if self.live.remove(&handle).is_some() {
            self.released += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_idempotent() {
        let mut pool = HandlePool::new();
        let h = pool.acquire(3, Vec3::ZERO, Quat::IDENTITY);
        assert!(pool.is_live(h));
        pool.release(h);
        pool.release(h);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.released_count(), 1);
    }
}
