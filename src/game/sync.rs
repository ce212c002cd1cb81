//! Host-authority state sync: snapshot building and threshold-gated correction

use super::fighter::Fighter;
use super::r#match::MatchSim;
use crate::ws::protocol::{FighterSnapshot, NetworkSnapshot};

/// Host broadcasts every Nth tick (15Hz at the nominal 60 TPS)
pub const SYNC_INTERVAL_TICKS: u32 = 4;

/// Position axes snap only past this drift, so routine float divergence does
/// not make fighters visibly jitter on every packet
pub const POSITION_SNAP_THRESHOLD: f32 = 20.0;
/// Health snaps on any disagreement
pub const HEALTH_SNAP_THRESHOLD: i32 = 0;
/// Round timer snaps past this drift (seconds)
pub const TIMER_SNAP_THRESHOLD: f32 = 1.0;

/// Decides when the host sends a snapshot: fixed cadence, plus immediately
/// after damage was applied.
#[derive(Debug, Default)]
pub struct SyncGate {
    ticks_since_sync: u32,
    force: bool,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per tick; true when a snapshot should go out now
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_sync += 1;
        if self.force || self.ticks_since_sync >= SYNC_INTERVAL_TICKS {
            self.ticks_since_sync = 0;
            self.force = false;
            true
        } else {
            false
        }
    }

    /// Damage just landed: bound perceived desync by syncing immediately
    pub fn force_next(&mut self) {
        self.force = true;
    }
}

/// Serialize the authoritative view of the match
pub fn build_snapshot(sim: &MatchSim) -> NetworkSnapshot {
    NetworkSnapshot {
        p1: snapshot_fighter(&sim.p1),
        p2: snapshot_fighter(&sim.p2),
        timer: sim.round_timer,
    }
}

fn snapshot_fighter(fighter: &Fighter) -> FighterSnapshot {
    FighterSnapshot {
        x: fighter.body.x,
        y: fighter.body.y,
        health: fighter.health,
        state: fighter.state,
        facing: fighter.facing,
    }
}

/// Correct the local simulation toward the host's snapshot. Each position
/// axis and health snap only past their thresholds; stun states are always
/// force-applied because they are consequence-bearing and must not silently
/// diverge.
pub fn apply_snapshot(sim: &mut MatchSim, snapshot: &NetworkSnapshot) {
    correct_fighter(&mut sim.p1, &snapshot.p1);
    correct_fighter(&mut sim.p2, &snapshot.p2);

    if (sim.round_timer - snapshot.timer).abs() > TIMER_SNAP_THRESHOLD {
        sim.round_timer = snapshot.timer;
    }
}

fn correct_fighter(fighter: &mut Fighter, remote: &FighterSnapshot) {
    if (fighter.body.x - remote.x).abs() > POSITION_SNAP_THRESHOLD {
        fighter.body.x = remote.x;
    }
    if (fighter.body.y - remote.y).abs() > POSITION_SNAP_THRESHOLD {
        fighter.body.y = remote.y;
    }
    if (fighter.health - remote.health).abs() > HEALTH_SNAP_THRESHOLD {
        fighter.health = remote.health;
        if fighter.health == 0 {
            fighter.dead = true;
        }
    }
    if remote.state.is_stun() {
        fighter.state = remote.state;
    }
}
