//! Which simulation computes damage for a shot

use crate::config::SimFlags;
use crate::weapons::behavior::Role;

/// Who owns hit computation in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitAuthority {
    /// The firing player's own simulation computes damage and reports impacts
    FiringClient,
    /// The session host computes damage and impacts once
    Server,
}

impl HitAuthority {
    pub fn from_flags(flags: SimFlags) -> Self {
        if flags.fire_shots_locally {
            Self::FiringClient
        } else {
            Self::Server
        }
    }
}

/// Where a simulation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Server,
    Client,
}

/// Whether a simulation resolves hits for an actor it drives in `role`
pub fn resolves_hits(authority: HitAuthority, role: Role, host: Host) -> bool {
    match authority {
        HitAuthority::FiringClient => role == Role::Owner,
        HitAuthority::Server => host == Host::Server,
    }
}
