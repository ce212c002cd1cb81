//! Duel Game Server - two-fighter versus game: core simulation and room relay
//!
//! Two halves share this crate:
//! - `game/` is the peer-side engine: fighter state machines, combat
//!   resolution, the adaptive AI opponent, match orchestration, and the
//!   netplay session that keeps two peers consistent under host authority.
//!   A client embeds [`game::NetplaySession`] (networked) or
//!   [`game::MatchSim`] directly (single player vs the AI).
//! - The remaining modules are the relay server binary: WebSocket room
//!   lifecycle, verbatim message relay between the two occupants, and
//!   best-effort room persistence.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod rooms;
pub mod store;
pub mod util;
pub mod ws;
