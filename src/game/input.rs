//! Per-tick action inputs and the remote-input view

use crate::ws::protocol::{ActionKeySet, InputState};

/// Resolved actions a fighter receives for one simulation tick. Movement is a
/// held axis; everything else is edge-triggered upstream (locally via
/// just-pressed detection, remotely via the pending-press queue).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionInputs {
    /// Horizontal movement axis (-1.0 = left, 1.0 = right)
    pub dx: f32,
    pub jump: bool,
    pub dash: bool,
    pub light: bool,
    pub heavy: bool,
    pub special: bool,
    /// Held, not edge-triggered: releasing the key drops the guard
    pub block: bool,
}

impl ActionInputs {
    /// Build tick actions from a sampled input frame
    pub fn from_state(state: &InputState) -> Self {
        Self {
            dx: movement_axis(&state.keys),
            jump: state.just_pressed.jump,
            dash: state.just_pressed.dash,
            light: state.just_pressed.light,
            heavy: state.just_pressed.heavy,
            special: state.just_pressed.special,
            block: state.keys.block,
        }
    }
}

fn movement_axis(keys: &ActionKeySet) -> f32 {
    let mut dx = 0.0;
    if keys.left {
        dx -= 1.0;
    }
    if keys.right {
        dx += 1.0;
    }
    dx
}

/// View of the remote fighter's input, fed by relayed `InputState` messages.
///
/// Held keys mirror the latest received snapshot. Just-pressed events are
/// queued until consumed so an attack press is not lost when the packet
/// arrives between two local ticks.
#[derive(Debug, Default)]
pub struct NetworkInput {
    keys: ActionKeySet,
    pending: ActionKeySet,
}

impl NetworkInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an incoming relayed input snapshot
    pub fn apply(&mut self, state: &InputState) {
        self.keys = state.keys;
        self.pending.merge(&state.just_pressed);
    }

    /// Drain buffered input into actions for the next tick
    pub fn take_actions(&mut self) -> ActionInputs {
        let pressed = std::mem::take(&mut self.pending);
        ActionInputs {
            dx: movement_axis(&self.keys),
            jump: pressed.jump,
            dash: pressed.dash,
            light: pressed.light,
            heavy: pressed.heavy,
            special: pressed.special,
            block: self.keys.block,
        }
    }
}
