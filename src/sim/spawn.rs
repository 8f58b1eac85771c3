//! Slime arrivals
//!
//! Slimes enter from a random board edge on a fixed period. The spawner is
//! owned by the host loop, not the simulation, so tests and alternative
//! front-ends can drive arrivals however they like.

use glam::Vec2;
use rand::Rng;

use super::state::{EntityId, SimulationContext};
use crate::tuning::Tuning;

/// Board edge a slime enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl SpawnSide {
    pub const ALL: [SpawnSide; 4] = [
        SpawnSide::Top,
        SpawnSide::Bottom,
        SpawnSide::Left,
        SpawnSide::Right,
    ];

    /// Side for a rolled index; anything outside 0..4 is a caller bug
    pub fn from_index(index: u8) -> Option<Self> {
        let side = Self::ALL.get(index as usize).copied();
        if side.is_none() {
            log::error!("Invalid spawn side index {}", index);
        }
        side
    }
}

/// Point on `side` of the safe interior, `along` in [0, 1] from its start
pub fn edge_position(tuning: &Tuning, side: SpawnSide, along: f32) -> Vec2 {
    let m = tuning.safe_margin;
    let (max_x, max_y) = (tuning.board_width - m, tuning.board_height - m);
    let along = along.clamp(0.0, 1.0);
    let x = m + (max_x - m) * along;
    let y = m + (max_y - m) * along;
    match side {
        SpawnSide::Top => Vec2::new(x, m),
        SpawnSide::Bottom => Vec2::new(x, max_y),
        SpawnSide::Left => Vec2::new(m, y),
        SpawnSide::Right => Vec2::new(max_x, y),
    }
}

/// Periodic slime spawner
#[derive(Debug, Clone)]
pub struct SlimeSpawner {
    /// Period in ms (0 disables)
    pub interval_ms: u64,
    /// Simulation time of the next arrival
    pub next_at: u64,
}

impl SlimeSpawner {
    /// First arrival one full interval after `now`
    pub fn new(interval_ms: u64, now: u64) -> Self {
        Self {
            interval_ms,
            next_at: now + interval_ms,
        }
    }

    pub fn from_tuning(tuning: &Tuning, now: u64) -> Self {
        Self::new(tuning.slime_spawn_interval_ms, now)
    }

    /// Spawn a slime if one is due; also sweeps finished slimes
    pub fn poll(&mut self, ctx: &mut SimulationContext) -> Option<EntityId> {
        if self.interval_ms == 0 || ctx.time_ms < self.next_at {
            return None;
        }
        self.next_at = ctx.time_ms + self.interval_ms;
        ctx.sweep_dead_slimes();

        let index: u8 = ctx.rng().random_range(0..4);
        let along: f32 = ctx.rng().random();
        let side = SpawnSide::from_index(index)?;
        let pos = edge_position(&ctx.tuning, side, along);
        let id = ctx.add_slime(pos);
        log::info!("Slime #{} arrived from {:?}", id, side);
        Some(id)
    }
}
