//! Presentation boundary
//!
//! The simulation records what changed as `SimEvent`s; this module hands
//! them to a renderer-side `Animator` and an `AudioCue` sink. Sprite sheets,
//! tweening and frame playback live entirely on the other side.

use glam::Vec2;

use crate::audio::{AudioCue, SoundEffect};
use crate::sim::behavior::AnimationIntent;
use crate::sim::state::{EntityId, EntityRef, SimEvent, SimulationContext, SpinOutcome};

/// Renderer-side view of the board
pub trait Animator {
    /// A new entity appeared; an animation intent follows
    fn spawn(&mut self, entity: EntityRef);
    /// Switch to a different animation
    fn play(&mut self, entity: EntityRef, intent: AnimationIntent);
    fn set_velocity(&mut self, entity: EntityRef, vel: Vec2);
    fn set_position(&mut self, entity: EntityRef, pos: Vec2);
    fn remove(&mut self, entity: EntityRef);

    fn score_changed(&mut self, _score: u64) {}
    fn spin_resolved(&mut self, _coin: EntityId, _outcome: SpinOutcome, _value: u64) {}
    fn level_completed(&mut self, _level: u32) {}
    fn level_time_up(&mut self, _level: u32) {}
}

/// Forward recorded events, in order
pub fn dispatch<A, S>(events: impl IntoIterator<Item = SimEvent>, animator: &mut A, audio: &mut S)
where
    A: Animator + ?Sized,
    S: AudioCue + ?Sized,
{
    for event in events {
        match event {
            SimEvent::Spawned { entity } => animator.spawn(entity),
            SimEvent::Animation { entity, intent } => animator.play(entity, intent),
            SimEvent::Velocity { entity, vel } => animator.set_velocity(entity, vel),
            SimEvent::Removed { entity } => animator.remove(entity),
            SimEvent::Sound(cue) => audio.play(cue),
            SimEvent::ScoreChanged { score } => animator.score_changed(score),
            SimEvent::SpinResolved {
                coin,
                outcome,
                value,
            } => animator.spin_resolved(coin, outcome, value),
            SimEvent::LevelCompleted { level } => {
                audio.play(SoundEffect::LevelUp);
                animator.level_completed(level);
            }
            SimEvent::LevelTimeUp { level } => animator.level_time_up(level),
        }
    }
}

/// Drain the context's events into the collaborators
pub fn present<A, S>(ctx: &mut SimulationContext, animator: &mut A, audio: &mut S)
where
    A: Animator + ?Sized,
    S: AudioCue + ?Sized,
{
    dispatch(ctx.drain_events(), animator, audio);
}

/// Push every entity's current position (once per rendered frame)
pub fn sync_positions<A: Animator + ?Sized>(ctx: &SimulationContext, animator: &mut A) {
    for coin in &ctx.coins {
        animator.set_position(EntityRef::Coin(coin.id), coin.pos);
    }
    for helper in &ctx.helpers {
        animator.set_position(EntityRef::Helper(helper.id), helper.pos);
    }
    for slime in &ctx.slimes {
        animator.set_position(EntityRef::Slime(slime.id), slime.pos);
    }
}

/// Animator that only logs; used by the headless runner
#[derive(Debug, Default)]
pub struct LogAnimator {
    pub rewards: u64,
    pub misses: u64,
    pub removed: u64,
}

impl Animator for LogAnimator {
    fn spawn(&mut self, entity: EntityRef) {
        log::debug!("spawn {:?}", entity);
    }

    fn play(&mut self, entity: EntityRef, intent: AnimationIntent) {
        log::trace!("{:?} plays {}", entity, intent.key());
    }

    fn set_velocity(&mut self, _entity: EntityRef, _vel: Vec2) {}

    fn set_position(&mut self, _entity: EntityRef, _pos: Vec2) {}

    fn remove(&mut self, entity: EntityRef) {
        self.removed += 1;
        log::debug!("remove {:?}", entity);
    }

    fn spin_resolved(&mut self, coin: EntityId, outcome: SpinOutcome, value: u64) {
        match outcome {
            SpinOutcome::Reward => self.rewards += 1,
            SpinOutcome::Miss => self.misses += 1,
        }
        log::debug!("coin {} spin: {:?} (+{})", coin, outcome, value);
    }

    fn level_completed(&mut self, level: u32) {
        log::info!("Level {} complete", level);
    }
}

/// One call received by a `RecordingAnimator`
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorCall {
    Spawn(EntityRef),
    Play(EntityRef, String),
    Velocity(EntityRef, Vec2),
    Position(EntityRef, Vec2),
    Remove(EntityRef),
    Score(u64),
    Spin(EntityId, SpinOutcome),
    LevelCompleted(u32),
    LevelTimeUp(u32),
}

/// Remembers every call (tests)
#[derive(Debug, Default)]
pub struct RecordingAnimator {
    pub calls: Vec<AnimatorCall>,
}

impl RecordingAnimator {
    /// Animation keys played for `entity`, in order
    pub fn clips_for(&self, entity: EntityRef) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                AnimatorCall::Play(e, key) if *e == entity => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Animator for RecordingAnimator {
    fn spawn(&mut self, entity: EntityRef) {
        self.calls.push(AnimatorCall::Spawn(entity));
    }

    fn play(&mut self, entity: EntityRef, intent: AnimationIntent) {
        self.calls.push(AnimatorCall::Play(entity, intent.key()));
    }

    fn set_velocity(&mut self, entity: EntityRef, vel: Vec2) {
        self.calls.push(AnimatorCall::Velocity(entity, vel));
    }

    fn set_position(&mut self, entity: EntityRef, pos: Vec2) {
        self.calls.push(AnimatorCall::Position(entity, pos));
    }

    fn remove(&mut self, entity: EntityRef) {
        self.calls.push(AnimatorCall::Remove(entity));
    }

    fn score_changed(&mut self, score: u64) {
        self.calls.push(AnimatorCall::Score(score));
    }

    fn spin_resolved(&mut self, coin: EntityId, outcome: SpinOutcome, _value: u64) {
        self.calls.push(AnimatorCall::Spin(coin, outcome));
    }

    fn level_completed(&mut self, level: u32) {
        self.calls.push(AnimatorCall::LevelCompleted(level));
    }

    fn level_time_up(&mut self, level: u32) {
        self.calls.push(AnimatorCall::LevelTimeUp(level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::consts::SIM_DT_MS;
    use crate::sim::behavior::Direction;
    use crate::sim::state::CoinKind;
    use crate::sim::tick::{TickInput, tick};
    use crate::tuning::Tuning;

    #[test]
    fn test_dispatch_routes_events() {
        let mut animator = RecordingAnimator::default();
        let mut audio = RecordingAudio::default();
        let events = vec![
            SimEvent::Spawned {
                entity: EntityRef::Coin(1),
            },
            SimEvent::Sound(SoundEffect::CoinSpin),
            SimEvent::ScoreChanged { score: 5 },
            SimEvent::LevelCompleted { level: 1 },
            SimEvent::Removed {
                entity: EntityRef::Coin(1),
            },
        ];
        dispatch(events, &mut animator, &mut audio);

        assert_eq!(
            animator.calls,
            vec![
                AnimatorCall::Spawn(EntityRef::Coin(1)),
                AnimatorCall::Score(5),
                AnimatorCall::LevelCompleted(1),
                AnimatorCall::Remove(EntityRef::Coin(1)),
            ]
        );
        assert_eq!(audio.played, vec![SoundEffect::CoinSpin, SoundEffect::LevelUp]);
    }

    #[test]
    fn test_walking_helper_plays_clip_once() {
        let mut ctx = SimulationContext::empty(4, Tuning::default());
        ctx.add_coin(CoinKind::Copper, 1, Vec2::new(250.0, 100.0));
        let helper = ctx.add_helper(Vec2::new(30.0, 100.0), Direction::Down);
        let mut animator = RecordingAnimator::default();
        let mut audio = RecordingAudio::default();

        for _ in 0..30 {
            tick(&mut ctx, &TickInput::default(), SIM_DT_MS);
            present(&mut ctx, &mut animator, &mut audio);
        }
        let clips = animator.clips_for(EntityRef::Helper(helper));
        assert_eq!(clips, vec!["helper-idle-down", "helper-move-right"]);
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_sync_positions_covers_all() {
        let mut ctx = SimulationContext::new(4, Tuning::default());
        ctx.add_slime(Vec2::new(20.0, 20.0));
        let mut animator = RecordingAnimator::default();
        sync_positions(&ctx, &mut animator);
        assert_eq!(animator.calls.len(), 2);
    }
}
