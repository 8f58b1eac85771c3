//! Coin Guard - an idle coin-spinning game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (assignment, behavior, combat, scheduling)
//! - `persistence`: Throttled save/load against a key-value store
//! - `present`: Animation/velocity intents handed to a renderer
//! - `audio`: Sound cues (Web Audio on wasm32)
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod persistence;
pub mod present;
pub mod sim;
pub mod tuning;

pub use tuning::{CoinKindTuning, LevelTuning, Tuning};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (~60 Hz)
    pub const SIM_DT_MS: u64 = 16;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Board dimensions (play area only, shop column excluded)
    pub const BOARD_WIDTH: f32 = 300.0;
    pub const BOARD_HEIGHT: f32 = 800.0;
    /// Entities are kept this far inside the board edges
    pub const SAFE_MARGIN: f32 = 20.0;

    /// Distance below which an actor stops moving and attacks
    pub const ENGAGE_RADIUS: f32 = 20.0;
    /// Movement speeds (units per second)
    pub const HELPER_SPEED: f32 = 100.0;
    pub const SLIME_SPEED: f32 = 80.0;

    /// Helper cooldown after an attack (ms)
    pub const HELPER_FATIGUE_MS: u64 = 5000;
    /// Delay between helper attack start and the hit landing (ms)
    pub const STRIKE_DELAY_MS: u64 = 100;

    /// Duration of each of the two spin phases (ms)
    pub const SPIN_PHASE_MS: u64 = 500;
    /// Reward flash duration (ms)
    pub const FLASH_MS: u64 = 2000;
    /// Chance a finished spin pays out
    pub const REWARD_PROBABILITY: f64 = 0.7;

    /// Minimum interval between persisted writes (ms)
    pub const SAVE_INTERVAL_MS: u64 = 500;
}

/// Clamp a position into the board's safe interior
#[inline]
pub fn clamp_to_board(pos: Vec2, width: f32, height: f32, margin: f32) -> Vec2 {
    pos.clamp(Vec2::splat(margin), board_max(width, height, margin))
}

/// Velocity with any component pushing out through an edge removed
///
/// Call with an already clamped position. Zeroing only the outward part
/// stops jitter against the wall without pinning actors walking away from it.
#[inline]
pub fn wall_blocked_velocity(pos: Vec2, vel: Vec2, width: f32, height: f32, margin: f32) -> Vec2 {
    let max = board_max(width, height, margin);
    let mut out = vel;
    if (pos.x <= margin && vel.x < 0.0) || (pos.x >= max.x && vel.x > 0.0) {
        out.x = 0.0;
    }
    if (pos.y <= margin && vel.y < 0.0) || (pos.y >= max.y && vel.y > 0.0) {
        out.y = 0.0;
    }
    out
}

#[inline]
fn board_max(width: f32, height: f32, margin: f32) -> Vec2 {
    Vec2::new((width - margin).max(margin), (height - margin).max(margin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_untouched() {
        let p = clamp_to_board(Vec2::new(150.0, 400.0), 300.0, 800.0, 20.0);
        assert_eq!(p, Vec2::new(150.0, 400.0));
    }

    #[test]
    fn test_clamp_outside() {
        assert_eq!(
            clamp_to_board(Vec2::new(-5.0, 400.0), 300.0, 800.0, 20.0),
            Vec2::new(20.0, 400.0)
        );
        assert_eq!(
            clamp_to_board(Vec2::new(150.0, 900.0), 300.0, 800.0, 20.0),
            Vec2::new(150.0, 780.0)
        );
    }

    #[test]
    fn test_wall_blocks_only_outward() {
        let at_left = Vec2::new(20.0, 400.0);
        assert_eq!(
            wall_blocked_velocity(at_left, Vec2::new(-50.0, 10.0), 300.0, 800.0, 20.0),
            Vec2::new(0.0, 10.0)
        );
        // Walking away from the wall is untouched
        assert_eq!(
            wall_blocked_velocity(at_left, Vec2::new(50.0, 10.0), 300.0, 800.0, 20.0),
            Vec2::new(50.0, 10.0)
        );
        let at_bottom = Vec2::new(150.0, 780.0);
        assert_eq!(
            wall_blocked_velocity(at_bottom, Vec2::new(5.0, 30.0), 300.0, 800.0, 20.0),
            Vec2::new(5.0, 0.0)
        );
    }
}
