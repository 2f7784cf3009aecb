//! Binary wire format for replication frames
//!
//! Little-endian, one frame per message: a frame tag byte, a version byte,
//! then the fields in a fixed order. Lists carry a `u16` length and are
//! capped on both encode and decode.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use glam::{Quat, Vec3};
use thiserror::Error;
use uuid::Uuid;

use crate::weapons::slot::WeaponRef;

use super::events::{DiscreteEvent, PeriodicState, WeaponEvent, WeaponPeriodic};

pub const WIRE_VERSION: u8 = 1;

pub const FRAME_EVENT: u8 = 1;
pub const FRAME_PERIODIC: u8 = 2;

/// Most directions a single fire event may carry
pub const MAX_DIRECTIONS: usize = 64;
/// Most weapons a periodic block may carry
pub const MAX_WEAPONS: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Frame truncated: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("Unknown frame tag: {0}")]
    UnknownFrame(u8),

    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown event tag: {0}")]
    UnknownEvent(u8),

    #[error("List of {len} entries exceeds limit {max}")]
    ListTooLong { len: usize, max: usize },

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

/// A decoded replication frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(DiscreteEvent),
    Periodic(PeriodicState),
}

pub fn encode_event(event: &DiscreteEvent) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(FRAME_EVENT);
    buf.put_u8(WIRE_VERSION);
    put_uuid(&mut buf, event.actor);
    buf.put_u32_le(event.seq);
    buf.put_u64_le(event.tick);
    put_ref(&mut buf, event.weapon);
    buf.put_u8(event.event.tag());
    match &event.event {
        WeaponEvent::Fire {
            last_round,
            origin,
            directions,
        } => {
            buf.put_u8(*last_round as u8);
            put_vec3(&mut buf, *origin);
            put_len(&mut buf, directions.len(), MAX_DIRECTIONS)?;
            for d in directions {
                put_vec3(&mut buf, *d);
            }
        }
        WeaponEvent::DryFire | WeaponEvent::GrenadePinPulled => {}
        WeaponEvent::BurstBegin { count } => buf.put_u8(*count),
        WeaponEvent::BoltCycled { last_round } => buf.put_u8(*last_round as u8),
        WeaponEvent::ReloadPhase { phase, empty } => {
            buf.put_u8(*phase);
            buf.put_u8(*empty as u8);
        }
        WeaponEvent::ProceduralStage { stage } => buf.put_u8(*stage),
        WeaponEvent::FireModeChanged { mode_index } => buf.put_u8(*mode_index),
        WeaponEvent::Impact {
            point,
            normal,
            surface,
            target,
            damage,
        } => {
            put_vec3(&mut buf, *point);
            put_vec3(&mut buf, *normal);
            buf.put_u16_le(*surface);
            match target {
                Some(id) => {
                    buf.put_u8(1);
                    put_uuid(&mut buf, *id);
                }
                None => buf.put_u8(0),
            }
            buf.put_f32_le(*damage);
        }
        WeaponEvent::MeleeStrike { quick } => buf.put_u8(*quick as u8),
        WeaponEvent::GrenadeThrown { origin, velocity } => {
            put_vec3(&mut buf, *origin);
            put_vec3(&mut buf, *velocity);
        }
    }
    Ok(buf.freeze())
}

pub fn encode_periodic(state: &PeriodicState) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(64 + state.weapons.len() * 10);
    buf.put_u8(FRAME_PERIODIC);
    buf.put_u8(WIRE_VERSION);
    put_uuid(&mut buf, state.actor);
    buf.put_u64_le(state.tick);
    put_ref(&mut buf, state.desired);
    put_ref(&mut buf, state.quick_use_desired);
    buf.put_u8(state.quick_use_in_progress as u8);
    buf.put_u8(state.release_observed as u8);
    put_vec3(&mut buf, state.aim_origin);
    let q = state.aim_rotation;
    for c in [q.x, q.y, q.z, q.w] {
        buf.put_f32_le(c);
    }
    put_len(&mut buf, state.weapons.len(), MAX_WEAPONS)?;
    for w in &state.weapons {
        buf.put_u8(w.firing as u8);
        buf.put_u8(w.aiming as u8);
        buf.put_u32_le(w.magazine);
        buf.put_u32_le(w.reserve);
    }
    Ok(buf.freeze())
}

pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let mut r = Reader { buf: bytes };
    let tag = r.u8()?;
    let version = r.u8()?;
    if version != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let frame = match tag {
        FRAME_EVENT => Frame::Event(r.event()?),
        FRAME_PERIODIC => Frame::Periodic(r.periodic()?),
        other => return Err(CodecError::UnknownFrame(other)),
    };
    if r.buf.has_remaining() {
        return Err(CodecError::TrailingBytes(r.buf.remaining()));
    }
    Ok(frame)
}

fn put_uuid(buf: &mut BytesMut, id: Uuid) {
    buf.put_slice(id.as_bytes());
}

fn put_ref(buf: &mut BytesMut, r: WeaponRef) {
    buf.put_u8(r.slot);
    buf.put_u8(r.index);
}

fn put_vec3(buf: &mut BytesMut, v: Vec3) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
    buf.put_f32_le(v.z);
}

fn put_len(buf: &mut BytesMut, len: usize, max: usize) -> Result<(), CodecError> {
    if len > max {
        return Err(CodecError::ListTooLong { len, max });
    }
    buf.put_u16_le(len as u16);
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl Reader<'_> {
    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    fn f32(&mut self) -> Result<f32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    fn uuid(&mut self) -> Result<Uuid, CodecError> {
        self.need(16)?;
        let mut raw = [0u8; 16];
        self.buf.copy_to_slice(&mut raw);
        Ok(Uuid::from_bytes(raw))
    }

    fn weapon_ref(&mut self) -> Result<WeaponRef, CodecError> {
        Ok(WeaponRef::new(self.u8()?, self.u8()?))
    }

    fn vec3(&mut self) -> Result<Vec3, CodecError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    fn len(&mut self, max: usize) -> Result<usize, CodecError> {
        let len = self.u16()? as usize;
        if len > max {
            return Err(CodecError::ListTooLong { len, max });
        }
        Ok(len)
    }

    fn event(&mut self) -> Result<DiscreteEvent, CodecError> {
        let actor = self.uuid()?;
        let seq = self.u32()?;
        let tick = self.u64()?;
        let weapon = self.weapon_ref()?;
        let event = match self.u8()? {
            1 => {
                let last_round = self.bool()?;
                let origin = self.vec3()?;
                let count = self.len(MAX_DIRECTIONS)?;
                let directions = (0..count).map(|_| self.vec3()).collect::<Result<Vec<_>, _>>()?;
                WeaponEvent::Fire {
                    last_round,
                    origin,
                    directions,
                }
            }
            2 => WeaponEvent::DryFire,
            3 => WeaponEvent::BurstBegin { count: self.u8()? },
            4 => WeaponEvent::BoltCycled {
                last_round: self.bool()?,
            },
            5 => WeaponEvent::ReloadPhase {
                phase: self.u8()?,
                empty: self.bool()?,
            },
            6 => WeaponEvent::ProceduralStage { stage: self.u8()? },
            7 => WeaponEvent::FireModeChanged { mode_index: self.u8()? },
            8 => {
                let point = self.vec3()?;
                let normal = self.vec3()?;
                let surface = self.u16()?;
                let target = if self.bool()? { Some(self.uuid()?) } else { None };
                WeaponEvent::Impact {
                    point,
                    normal,
                    surface,
                    target,
                    damage: self.f32()?,
                }
            }
            9 => WeaponEvent::MeleeStrike { quick: self.bool()? },
            10 => WeaponEvent::GrenadePinPulled,
            11 => WeaponEvent::GrenadeThrown {
                origin: self.vec3()?,
                velocity: self.vec3()?,
            },
            other => return Err(CodecError::UnknownEvent(other)),
        };
        Ok(DiscreteEvent {
            actor,
            seq,
            tick,
            weapon,
            event,
        })
    }

    fn periodic(&mut self) -> Result<PeriodicState, CodecError> {
        let actor = self.uuid()?;
        let tick = self.u64()?;
        let desired = self.weapon_ref()?;
        let quick_use_desired = self.weapon_ref()?;
        let quick_use_in_progress = self.bool()?;
        let release_observed = self.bool()?;
        let aim_origin = self.vec3()?;
        let aim_rotation = Quat::from_xyzw(self.f32()?, self.f32()?, self.f32()?, self.f32()?);
        let count = self.len(MAX_WEAPONS)?;
        let mut weapons = Vec::with_capacity(count);
        for _ in 0..count {
            weapons.push(WeaponPeriodic {
                firing: self.bool()?,
                aiming: self.bool()?,
                magazine: self.u32()?,
                reserve: self.u32()?,
            });
        }
        Ok(PeriodicState {
            actor,
            tick,
            desired,
            quick_use_desired,
            quick_use_in_progress,
            release_observed,
            aim_origin,
            aim_rotation,
            weapons,
        })
    }
}
