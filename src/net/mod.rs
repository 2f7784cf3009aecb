//! Replication: events, periodic state, wire codec and replica mirrors

pub mod authority;
pub mod cadence;
pub mod codec;
pub mod events;
pub mod replica;

pub use authority::{resolves_hits, HitAuthority, Host};
pub use cadence::{PeriodicCadence, ReplicationStats};
pub use codec::{decode_frame, encode_event, encode_periodic, CodecError, Frame};
pub use events::{Cosmetic, DiscreteEvent, Outbox, PeriodicState, WeaponEvent, WeaponPeriodic};
pub use replica::Replica;
