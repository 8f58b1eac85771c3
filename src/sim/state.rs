//! Entity records and the simulation context
//!
//! `SimulationContext` owns every collection the tick touches; nothing in the
//! simulation reaches for globals.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::behavior::{
    AnimationIntent, BehaviorState, CoinState, Direction, HelperState, SlimeState,
    animation_intent,
};
use super::level::level_target;
use super::schedule::{EventQueue, Scheduled};
use crate::audio::SoundEffect;
use crate::tuning::Tuning;

/// Entity identifier, unique across all kinds within one context
pub type EntityId = u32;

/// Restored boards with ids past this are renumbered so allocation can't overflow
const RESTORED_ID_CEILING: EntityId = EntityId::MAX / 2;

/// Coin denominations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinKind {
    Copper,
    Silver,
    Gold,
}

impl CoinKind {
    pub const ALL: [CoinKind; 3] = [CoinKind::Copper, CoinKind::Silver, CoinKind::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinKind::Copper => "copper",
            CoinKind::Silver => "silver",
            CoinKind::Gold => "gold",
        }
    }
}

/// Reference to an entity of any kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Coin(EntityId),
    Helper(EntityId),
    Slime(EntityId),
}

/// A coin on the board
#[derive(Debug, Clone)]
pub struct Coin {
    pub id: EntityId,
    pub kind: CoinKind,
    /// Score paid by a winning spin
    pub value: u64,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Cleared when destroyed; inactive coins are never targeted again
    pub active: bool,
    pub state: CoinState,
    /// Last animation handed to the renderer
    pub anim: Option<AnimationIntent>,
}

impl Coin {
    pub fn is_spinning(&self) -> bool {
        self.state.is_spinning()
    }

    /// Can be claimed by a helper or slime this tick
    pub fn is_available(&self) -> bool {
        self.active && !self.is_spinning()
    }
}

/// An automated helper
#[derive(Debug, Clone)]
pub struct Helper {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub direction: Direction,
    pub state: HelperState,
    /// End of the post-attack cooldown (simulation ms)
    pub fatigue_until: Option<u64>,
    pub anim: Option<AnimationIntent>,
}

impl Helper {
    pub fn is_fatigued(&self, now: u64) -> bool {
        self.fatigue_until.is_some_and(|until| now < until)
    }
}

/// An invading slime
#[derive(Debug, Clone)]
pub struct Slime {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub direction: Direction,
    /// Cleared on the first hit
    pub active: bool,
    pub state: SlimeState,
    pub anim: Option<AnimationIntent>,
}

impl Slime {
    pub fn is_attacking(&self) -> bool {
        matches!(self.state, SlimeState::Attacking { .. })
    }

    /// Alive and free to walk toward a coin
    pub fn is_movable(&self) -> bool {
        self.active && !self.is_attacking()
    }
}

/// Score and level progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProgress {
    pub score: u64,
    pub current_level: u32,
    pub level_target_score: u64,
    pub level_time_left_ms: u64,
}

impl GameProgress {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            score: 0,
            current_level: 1,
            level_target_score: level_target(tuning, 1),
            level_time_left_ms: tuning.level.level_time_ms,
        }
    }
}

/// Why a spin ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOutcome {
    Reward,
    Miss,
}

/// Things that happened this tick, for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Entity should start playing a different animation
    Animation { entity: EntityRef, intent: AnimationIntent },
    /// Entity velocity changed
    Velocity { entity: EntityRef, vel: Vec2 },
    /// Fire-and-forget sound cue
    Sound(SoundEffect),
    ScoreChanged { score: u64 },
    SpinResolved { coin: EntityId, outcome: SpinOutcome, value: u64 },
    Spawned { entity: EntityRef },
    Removed { entity: EntityRef },
    LevelCompleted { level: u32 },
    LevelTimeUp { level: u32 },
}

/// Everything the simulation owns
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub tuning: Tuning,
    /// Simulation clock (ms)
    pub time_ms: u64,
    pub progress: GameProgress,
    /// Coins (sorted by id for determinism)
    pub coins: Vec<Coin>,
    /// Helpers (sorted by id for determinism)
    pub helpers: Vec<Helper>,
    /// Slimes (sorted by id for determinism)
    pub slimes: Vec<Slime>,
    /// Pending delayed outcomes
    pub queue: EventQueue,
    rng: Pcg32,
    events: Vec<SimEvent>,
    next_id: EntityId,
    /// Something worth persisting changed since the last `take_dirty`
    dirty: bool,
}

impl SimulationContext {
    /// Fresh game with the default starter coin
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let mut ctx = Self::empty(seed, tuning);
        ctx.ensure_starter_coin();
        ctx
    }

    /// Context with no entities at all
    pub fn empty(seed: u64, tuning: Tuning) -> Self {
        let progress = GameProgress::new(&tuning);
        Self {
            tuning,
            time_ms: 0,
            progress,
            coins: Vec::new(),
            helpers: Vec::new(),
            slimes: Vec::new(),
            queue: EventQueue::new(),
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            next_id: 1,
            dirty: false,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Seed a copper coin at the board centre if the board has none
    pub fn ensure_starter_coin(&mut self) {
        if self.coins.is_empty() {
            let value = self.tuning.copper.value;
            let center = self.tuning.board_center();
            self.add_coin(CoinKind::Copper, value, center);
        }
    }

    // === Mutation surface ===

    pub fn add_coin(&mut self, kind: CoinKind, value: u64, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let mut coin = Coin {
            id,
            kind,
            value,
            pos,
            vel: Vec2::ZERO,
            active: true,
            state: CoinState::Idle,
            anim: None,
        };
        let intent = coin_intent(&coin);
        coin.anim = Some(intent);
        self.coins.push(coin);
        self.emit(SimEvent::Spawned {
            entity: EntityRef::Coin(id),
        });
        self.emit(SimEvent::Animation {
            entity: EntityRef::Coin(id),
            intent,
        });
        self.mark_dirty();
        id
    }

    pub fn add_helper(&mut self, pos: Vec2, direction: Direction) -> EntityId {
        let id = self.next_entity_id();
        let intent = animation_intent(BehaviorState::Helper(HelperState::Idle), direction);
        self.helpers.push(Helper {
            id,
            pos,
            vel: Vec2::ZERO,
            direction,
            state: HelperState::Idle,
            fatigue_until: None,
            anim: Some(intent),
        });
        self.emit(SimEvent::Spawned {
            entity: EntityRef::Helper(id),
        });
        self.emit(SimEvent::Animation {
            entity: EntityRef::Helper(id),
            intent,
        });
        self.mark_dirty();
        id
    }

    pub fn add_slime(&mut self, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let direction = Direction::default();
        let intent = animation_intent(BehaviorState::Slime(SlimeState::Idle), direction);
        self.slimes.push(Slime {
            id,
            pos,
            vel: Vec2::ZERO,
            direction,
            active: true,
            state: SlimeState::Idle,
            anim: Some(intent),
        });
        self.emit(SimEvent::Spawned {
            entity: EntityRef::Slime(id),
        });
        self.emit(SimEvent::Animation {
            entity: EntityRef::Slime(id),
            intent,
        });
        self.mark_dirty();
        id
    }

    /// Remove a coin; returns false if it was not on the board
    pub fn remove_coin(&mut self, id: EntityId) -> bool {
        let before = self.coins.len();
        self.coins.retain(|c| c.id != id);
        if self.coins.len() == before {
            return false;
        }
        self.emit(SimEvent::Removed {
            entity: EntityRef::Coin(id),
        });
        self.mark_dirty();
        true
    }

    /// Remove a slime; returns false if it was not on the board
    pub fn remove_slime(&mut self, id: EntityId) -> bool {
        let before = self.slimes.len();
        self.slimes.retain(|s| s.id != id);
        if self.slimes.len() == before {
            return false;
        }
        self.emit(SimEvent::Removed {
            entity: EntityRef::Slime(id),
        });
        self.mark_dirty();
        true
    }

    /// Drop slimes whose death sequence has finished
    pub fn sweep_dead_slimes(&mut self) -> usize {
        let dead: Vec<EntityId> = self
            .slimes
            .iter()
            .filter(|s| s.state == SlimeState::Dead)
            .map(|s| s.id)
            .collect();
        for id in &dead {
            self.remove_slime(*id);
        }
        dead.len()
    }

    // === Lookup ===

    pub fn coin(&self, id: EntityId) -> Option<&Coin> {
        self.coins.iter().find(|c| c.id == id)
    }

    pub fn coin_mut(&mut self, id: EntityId) -> Option<&mut Coin> {
        self.coins.iter_mut().find(|c| c.id == id)
    }

    pub fn helper(&self, id: EntityId) -> Option<&Helper> {
        self.helpers.iter().find(|h| h.id == id)
    }

    pub fn helper_mut(&mut self, id: EntityId) -> Option<&mut Helper> {
        self.helpers.iter_mut().find(|h| h.id == id)
    }

    pub fn slime(&self, id: EntityId) -> Option<&Slime> {
        self.slimes.iter().find(|s| s.id == id)
    }

    pub fn slime_mut(&mut self, id: EntityId) -> Option<&mut Slime> {
        self.slimes.iter_mut().find(|s| s.id == id)
    }

    /// Slimes that have not been hit yet
    pub fn alive_slime_count(&self) -> usize {
        self.slimes.iter().filter(|s| s.active).count()
    }

    // === Score ===

    pub fn score(&self) -> u64 {
        self.progress.score
    }

    pub fn award(&mut self, amount: u64) {
        self.progress.score = self.progress.score.saturating_add(amount);
        self.emit(SimEvent::ScoreChanged {
            score: self.progress.score,
        });
        self.mark_dirty();
    }

    /// Deduct `amount` if affordable
    pub fn spend(&mut self, amount: u64) -> bool {
        if self.progress.score < amount {
            return false;
        }
        self.progress.score -= amount;
        self.emit(SimEvent::ScoreChanged {
            score: self.progress.score,
        });
        self.mark_dirty();
        true
    }

    // === Scheduling & events ===

    /// Queue `payload` to fire `delay_ms` from now
    pub fn schedule_in(&mut self, delay_ms: u64, payload: Scheduled) {
        self.queue.schedule(self.time_ms + delay_ms, payload);
    }

    /// Queue `payload` to fire `delay_ms` after `at`
    ///
    /// Follow-ups of a delayed outcome count from its `fires_at`, so a
    /// chain keeps its nominal length however late the clock reaches it.
    pub fn schedule_after(&mut self, at: u64, delay_ms: u64, payload: Scheduled) {
        self.queue.schedule(at.saturating_add(delay_ms), payload);
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns and clears the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Reassign ids from 1 in coin, helper, slime order
    fn renumber(&mut self) {
        let mut next = 1;
        for coin in &mut self.coins {
            coin.id = next;
            next += 1;
        }
        for helper in &mut self.helpers {
            helper.id = next;
            next += 1;
        }
        for slime in &mut self.slimes {
            slime.id = next;
            next += 1;
        }
        self.next_id = next;
    }

    /// Replace the board with restored entities
    ///
    /// Pending events are dropped, ids continue after the highest restored
    /// one (or are reassigned when that one is near the top of the range)
    /// and every entity is announced to the presentation layer.
    pub fn install(
        &mut self,
        coins: Vec<Coin>,
        helpers: Vec<Helper>,
        slimes: Vec<Slime>,
        progress: GameProgress,
    ) {
        self.queue.clear();
        self.coins = coins;
        self.helpers = helpers;
        self.slimes = slimes;
        self.progress = progress;
        self.normalize_order();

        let max_id = self
            .coins
            .iter()
            .map(|c| c.id)
            .chain(self.helpers.iter().map(|h| h.id))
            .chain(self.slimes.iter().map(|s| s.id))
            .max()
            .unwrap_or(0);
        match max_id.checked_add(1).filter(|next| *next <= RESTORED_ID_CEILING) {
            Some(next) => self.next_id = self.next_id.max(next),
            None => {
                log::warn!("Restored ids leave no room for new entities, renumbering");
                self.renumber();
            }
        }

        let mut announced = Vec::new();
        for coin in &mut self.coins {
            let intent = coin_intent(coin);
            coin.anim = Some(intent);
            announced.push((EntityRef::Coin(coin.id), intent));
        }
        for helper in &mut self.helpers {
            let intent = animation_intent(BehaviorState::Helper(helper.state), helper.direction);
            helper.anim = Some(intent);
            announced.push((EntityRef::Helper(helper.id), intent));
        }
        for slime in &mut self.slimes {
            let intent = animation_intent(BehaviorState::Slime(slime.state), slime.direction);
            slime.anim = Some(intent);
            announced.push((EntityRef::Slime(slime.id), intent));
        }
        for (entity, intent) in announced {
            self.emit(SimEvent::Spawned { entity });
            self.emit(SimEvent::Animation { entity, intent });
        }
        self.emit(SimEvent::ScoreChanged {
            score: self.progress.score,
        });
        self.ensure_starter_coin();
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.coins.sort_by_key(|c| c.id);
        self.helpers.sort_by_key(|h| h.id);
        self.slimes.sort_by_key(|s| s.id);
    }
}

/// Current animation intent of a coin, including its kind's sheet
pub fn coin_intent(coin: &Coin) -> AnimationIntent {
    AnimationIntent {
        sheet: Some(coin.kind.as_str()),
        ..animation_intent(BehaviorState::Coin(coin.state), Direction::Down)
    }
}
