//! Time utilities for game simulation

use std::time::Instant;

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Nominal simulation rate a peer runs at
pub const SIMULATION_TPS: u32 = 60;

/// Longest physics step a single frame may produce. A stalled frame would
/// otherwise integrate one giant step and launch fighters through walls.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Nominal delta time for one tick (in seconds)
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Clamp a measured frame delta to the maximum allowed physics step
pub fn clamp_frame_delta(dt: f32) -> f32 {
    dt.min(MAX_FRAME_DELTA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_delta_is_clamped() {
        assert_eq!(clamp_frame_delta(5.0), MAX_FRAME_DELTA);
        assert_eq!(clamp_frame_delta(0.016), 0.016);
    }

    #[test]
    fn tick_delta_matches_simulation_rate() {
        assert!((tick_delta() * SIMULATION_TPS as f32 - 1.0).abs() < 1e-5);
    }
}
