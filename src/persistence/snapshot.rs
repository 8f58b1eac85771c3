//! Persisted records and conversion to/from the live context
//!
//! Only durable facts are stored. Animation, velocity, pending events and
//! fatigue are transient and rebuilt on load.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::behavior::{CoinState, Direction, HelperState, SlimeState};
use crate::sim::state::{Coin, CoinKind, EntityId, GameProgress, Helper, SimulationContext, Slime};
use crate::tuning::Tuning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub id: EntityId,
    pub kind: CoinKind,
    pub value: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperRecord {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimeRecord {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
}

/// Level state; the score lives under its own key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub current_level: u32,
    pub level_target_score: u64,
    pub level_time_left_ms: u64,
}

/// Everything one save writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub score: u64,
    pub coins: Vec<CoinRecord>,
    pub helpers: Vec<HelperRecord>,
    pub slimes: Vec<SlimeRecord>,
    /// None when never saved or unreadable; a fresh level 1 is used instead
    pub progress: Option<ProgressRecord>,
}

impl Snapshot {
    /// Capture the durable part of `ctx`
    ///
    /// Destroyed coins and slimes already hit are left out.
    pub fn capture(ctx: &SimulationContext) -> Self {
        Self {
            score: ctx.progress.score,
            coins: ctx
                .coins
                .iter()
                .filter(|c| c.active)
                .map(|c| CoinRecord {
                    id: c.id,
                    kind: c.kind,
                    value: c.value,
                    x: c.pos.x,
                    y: c.pos.y,
                })
                .collect(),
            helpers: ctx
                .helpers
                .iter()
                .map(|h| HelperRecord {
                    id: h.id,
                    x: h.pos.x,
                    y: h.pos.y,
                    direction: h.direction,
                })
                .collect(),
            slimes: ctx
                .slimes
                .iter()
                .filter(|s| s.active)
                .map(|s| SlimeRecord {
                    id: s.id,
                    x: s.pos.x,
                    y: s.pos.y,
                })
                .collect(),
            progress: Some(ProgressRecord {
                current_level: ctx.progress.current_level,
                level_target_score: ctx.progress.level_target_score,
                level_time_left_ms: ctx.progress.level_time_left_ms,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.score == 0
            && self.coins.is_empty()
            && self.helpers.is_empty()
            && self.slimes.is_empty()
            && self.progress.is_none()
    }

    fn progress_for(&self, tuning: &Tuning) -> GameProgress {
        let mut progress = GameProgress::new(tuning);
        if let Some(p) = self.progress {
            progress.current_level = p.current_level.max(1);
            progress.level_target_score = p.level_target_score;
            progress.level_time_left_ms = p.level_time_left_ms.min(tuning.level.level_time_ms);
        }
        progress.score = self.score;
        progress
    }

    /// Replace the board in `ctx` with this snapshot
    ///
    /// Everything comes back idle and clamped inside the board; duplicate
    /// ids keep their first record.
    pub fn apply(&self, ctx: &mut SimulationContext) {
        let t = &ctx.tuning;
        let clamp = |x: f32, y: f32| {
            let pos = Vec2::new(x, y);
            let pos = if pos.is_finite() { pos } else { t.board_center() };
            crate::clamp_to_board(pos, t.board_width, t.board_height, t.safe_margin)
        };
        let mut seen = std::collections::BTreeSet::new();

        let coins: Vec<Coin> = self
            .coins
            .iter()
            .filter(|r| seen.insert(r.id))
            .map(|r| Coin {
                id: r.id,
                kind: r.kind,
                value: r.value,
                pos: clamp(r.x, r.y),
                vel: Vec2::ZERO,
                active: true,
                state: CoinState::Idle,
                anim: None,
            })
            .collect();
        let helpers: Vec<Helper> = self
            .helpers
            .iter()
            .filter(|r| seen.insert(r.id))
            .map(|r| Helper {
                id: r.id,
                pos: clamp(r.x, r.y),
                vel: Vec2::ZERO,
                direction: r.direction,
                state: HelperState::Idle,
                fatigue_until: None,
                anim: None,
            })
            .collect();
        let slimes: Vec<Slime> = self
            .slimes
            .iter()
            .filter(|r| seen.insert(r.id))
            .map(|r| Slime {
                id: r.id,
                pos: clamp(r.x, r.y),
                vel: Vec2::ZERO,
                direction: Direction::default(),
                active: true,
                state: SlimeState::Idle,
                anim: None,
            })
            .collect();
        let progress = self.progress_for(t);

        ctx.install(coins, helpers, slimes, progress);
    }
}
