//! Timed level mode

use super::state::{SimEvent, SimulationContext};
use crate::tuning::Tuning;

/// Score target for `level` (1-based): first * multiplier^(level-1)
pub fn level_target(tuning: &Tuning, level: u32) -> u64 {
    let exp = level.saturating_sub(1);
    let mut target = tuning.level.first_level_target;
    for _ in 0..exp {
        target = target.saturating_mul(tuning.level.target_multiplier);
    }
    target
}

/// Advance the level clock by `dt_ms` and handle target/time-up transitions
pub fn update_level(ctx: &mut SimulationContext, dt_ms: u64) {
    let level = ctx.tuning.level;
    if !level.enabled {
        return;
    }

    if ctx.progress.score >= ctx.progress.level_target_score
        && ctx.progress.current_level < level.max_level
    {
        let finished = ctx.progress.current_level;
        ctx.progress.current_level += 1;
        ctx.progress.level_target_score = level_target(&ctx.tuning, ctx.progress.current_level);
        ctx.progress.level_time_left_ms = level.level_time_ms;
        log::info!(
            "Level {} cleared, next target {}",
            finished,
            ctx.progress.level_target_score
        );
        ctx.emit(SimEvent::LevelCompleted { level: finished });
        ctx.mark_dirty();
        return;
    }

    ctx.progress.level_time_left_ms = ctx.progress.level_time_left_ms.saturating_sub(dt_ms);
    if ctx.progress.level_time_left_ms == 0 {
        let current = ctx.progress.current_level;
        log::info!("Level {} timed out, restarting clock", current);
        ctx.progress.level_time_left_ms = level.level_time_ms;
        ctx.emit(SimEvent::LevelTimeUp { level: current });
        ctx.mark_dirty();
    }
}
