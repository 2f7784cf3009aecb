//! Arsenal - per-player weapon simulation and replication
//!
//! The weapon core (`weapons`, `hit`) is host-agnostic and driven by a
//! fixed-step clock. `net` carries its replication payloads and wire codec;
//! `game`, `ws` and `http` host it as an authoritative WebSocket server.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod hit;
pub mod http;
pub mod net;
pub mod util;
pub mod weapons;
pub mod ws;
