//! Throttled, fail-soft persistence gateway
//!
//! `save` only marks the state as pending. The write happens at the first
//! `save`/`poll` once `interval_ms` has passed since the earliest pending
//! request, and always captures the latest state. `flush` writes immediately.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::snapshot::Snapshot;
use super::store::PersistenceStore;
use super::{PersistenceError, keys};
use crate::sim::state::SimulationContext;

pub struct PersistenceGateway<S: PersistenceStore> {
    store: S,
    interval_ms: u64,
    /// Time of the earliest unsaved request
    pending_since: Option<u64>,
    writes: u64,
}

impl<S: PersistenceStore> PersistenceGateway<S> {
    pub fn new(store: S, interval_ms: u64) -> Self {
        Self {
            store,
            interval_ms,
            pending_since: None,
            writes: 0,
        }
    }

    /// Gateway throttled by the context's configured save interval
    pub fn for_context(store: S, ctx: &SimulationContext) -> Self {
        Self::new(store, ctx.tuning.save_interval_ms)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Completed snapshot writes (throttled and flushed)
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Request a save at time `now`; returns true if a write happened
    pub fn save(&mut self, ctx: &SimulationContext, now: u64) -> bool {
        if self.pending_since.is_none() {
            self.pending_since = Some(now);
        }
        self.poll(ctx, now)
    }

    /// Write a pending save if its window has elapsed
    pub fn poll(&mut self, ctx: &SimulationContext, now: u64) -> bool {
        match self.pending_since {
            Some(since) if now >= since.saturating_add(self.interval_ms) => self.flush(ctx),
            _ => false,
        }
    }

    /// Host hook for the end of a tick: save if the context changed,
    /// otherwise let a pending save catch up
    pub fn after_tick(&mut self, ctx: &mut SimulationContext) -> bool {
        let now = ctx.time_ms;
        if ctx.take_dirty() {
            self.save(ctx, now)
        } else {
            self.poll(ctx, now)
        }
    }

    /// Write immediately, bypassing the throttle
    ///
    /// A failed write is logged and leaves the save pending.
    pub fn flush(&mut self, ctx: &SimulationContext) -> bool {
        match self.write(&Snapshot::capture(ctx)) {
            Ok(()) => {
                self.pending_since = None;
                self.writes += 1;
                true
            }
            Err(e) => {
                log::warn!("Save failed: {}", e);
                false
            }
        }
    }

    fn write(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.put(keys::SCORE, &snapshot.score)?;
        self.put(keys::COINS, &snapshot.coins)?;
        self.put(keys::HELPERS, &snapshot.helpers)?;
        self.put(keys::SLIMES, &snapshot.slimes)?;
        if let Some(progress) = &snapshot.progress {
            self.put(keys::PROGRESS, progress)?;
        }
        Ok(())
    }

    fn put<T: Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(value)
            .map_err(|source| PersistenceError::Encode { key, source })?;
        self.store.set(key, &json)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, PersistenceError> {
        match self.store.get(key) {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| PersistenceError::Decode { key, source }),
            None => Ok(None),
        }
    }

    /// Read one key, falling back to None (with a warning) when corrupt
    fn read_or_warn<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        self.read(key).unwrap_or_else(|e| {
            log::warn!("Ignoring saved {}: {}", key, e);
            None
        })
    }

    /// Last persisted snapshot; missing or corrupt keys load as empty
    pub fn load(&self) -> Snapshot {
        let snapshot = Snapshot {
            score: self.read_or_warn(keys::SCORE).unwrap_or(0),
            coins: self.read_or_warn(keys::COINS).unwrap_or_default(),
            helpers: self.read_or_warn(keys::HELPERS).unwrap_or_default(),
            slimes: self.read_or_warn(keys::SLIMES).unwrap_or_default(),
            progress: self.read_or_warn(keys::PROGRESS),
        };
        if snapshot.is_empty() {
            log::info!("No saved game, starting fresh");
        } else {
            log::info!(
                "Loaded save: score {}, {} coins, {} helpers, {} slimes",
                snapshot.score,
                snapshot.coins.len(),
                snapshot.helpers.len(),
                snapshot.slimes.len()
            );
        }
        snapshot
    }

    /// Load the saved game into `ctx`
    pub fn restore(&self, ctx: &mut SimulationContext) {
        self.load().apply(ctx);
        // Restoring is not a change worth writing back
        ctx.take_dirty();
    }

    /// Whether any key has ever been written
    pub fn has_save_data(&self) -> bool {
        keys::ALL.iter().any(|key| self.store.get(key).is_some())
    }

    /// Start over: empty board (plus starter coin), level 1, written now
    pub fn reset(&mut self, ctx: &mut SimulationContext) -> bool {
        Snapshot::default().apply(ctx);
        ctx.take_dirty();
        log::info!("Game reset");
        self.flush(ctx)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::persistence::store::MemoryStore;
    use crate::sim::behavior::Direction;
    use crate::sim::state::CoinKind;
    use crate::tuning::Tuning;

    fn gateway() -> PersistenceGateway<MemoryStore> {
        PersistenceGateway::new(MemoryStore::new(), 500)
    }

    #[test]
    fn test_burst_of_saves_writes_once() {
        let mut ctx = SimulationContext::new(1, Tuning::default());
        let mut gw = gateway();

        for i in 0..10 {
            ctx.award(1);
            gw.save(&ctx, i * 10);
        }
        assert_eq!(gw.write_count(), 0);
        assert!(gw.is_pending());

        assert!(gw.poll(&ctx, 500));
        assert_eq!(gw.write_count(), 1);
        assert!(!gw.poll(&ctx, 2000));
        assert_eq!(gw.write_count(), 1);
        // The write captured the latest score
        assert_eq!(gw.store().get(keys::SCORE).as_deref(), Some("10"));
    }

    #[test]
    fn test_flush_always_writes() {
        let ctx = SimulationContext::new(1, Tuning::default());
        let mut gw = gateway();
        assert!(gw.flush(&ctx));
        assert!(gw.flush(&ctx));
        assert_eq!(gw.write_count(), 2);
        assert!(!gw.is_pending());
    }

    #[test]
    fn test_writes_spaced_by_interval() {
        let ctx = SimulationContext::new(1, Tuning::default());
        let mut gw = gateway();
        let mut write_times = Vec::new();
        for now in (0..3000).step_by(16) {
            if gw.save(&ctx, now) {
                write_times.push(now);
            }
        }
        assert!(write_times.len() >= 5);
        assert!(write_times.windows(2).all(|w| w[1] - w[0] >= 500));
    }

    #[test]
    fn test_failed_write_stays_pending() {
        let ctx = SimulationContext::new(1, Tuning::default());
        let mut gw = PersistenceGateway::new(MemoryStore::failing(), 500);
        gw.save(&ctx, 0);
        assert!(!gw.poll(&ctx, 600));
        assert!(gw.is_pending());
        assert_eq!(gw.write_count(), 0);

        gw.store_mut().fail_writes = false;
        assert!(gw.poll(&ctx, 700));
    }

    #[test]
    fn test_save_then_restore() {
        let mut ctx = SimulationContext::empty(1, Tuning::default());
        ctx.add_coin(CoinKind::Gold, 100, Vec2::new(40.0, 50.0));
        let helper = ctx.add_helper(Vec2::new(70.0, 80.0), Direction::Right);
        ctx.add_slime(Vec2::new(20.0, 700.0));
        ctx.award(321);
        ctx.progress.current_level = 3;
        let mut gw = gateway();
        gw.flush(&ctx);

        let mut restored = SimulationContext::empty(99, Tuning::default());
        gw.restore(&mut restored);
        assert_eq!(restored.score(), 321);
        assert_eq!(restored.progress.current_level, 3);
        assert_eq!(restored.coins.len(), 1);
        assert_eq!(restored.coins[0].kind, CoinKind::Gold);
        assert_eq!(restored.slimes.len(), 1);
        assert_eq!(restored.helper(helper).map(|h| h.pos), Some(Vec2::new(70.0, 80.0)));
        assert!(!restored.take_dirty());
    }

    #[test]
    fn test_corrupt_key_falls_back() {
        let store = MemoryStore::with_entries([
            (keys::SCORE, "42"),
            (keys::COINS, "{not json"),
            (keys::HELPERS, r#"[{"id":7,"x":100.0,"y":100.0,"direction":"up"}]"#),
        ]);
        let gw = PersistenceGateway::new(store, 500);
        let snap = gw.load();
        assert_eq!(snap.score, 42);
        assert!(snap.coins.is_empty());
        assert_eq!(snap.helpers.len(), 1);
        assert_eq!(snap.helpers[0].direction, Direction::Up);
        assert!(snap.progress.is_none());

        let mut ctx = SimulationContext::empty(1, Tuning::default());
        gw.restore(&mut ctx);
        // Corrupt coin list: starter coin instead
        assert_eq!(ctx.coins.len(), 1);
        assert_eq!(ctx.score(), 42);
    }

    #[test]
    fn test_restore_with_max_id_does_not_panic() {
        let store = MemoryStore::with_entries([(
            keys::HELPERS,
            r#"[{"id":4294967295,"x":100.0,"y":100.0}]"#,
        )]);
        let gw = PersistenceGateway::new(store, 500);
        let mut ctx = SimulationContext::empty(1, Tuning::default());
        gw.restore(&mut ctx);

        assert_eq!(ctx.helpers.len(), 1);
        let fresh = ctx.add_slime(Vec2::new(50.0, 50.0));
        assert!(ctx.helper(fresh).is_none());
        assert!(ctx.coins.iter().all(|c| c.id != ctx.helpers[0].id));
    }

    #[test]
    fn test_everything_corrupt_loads_defaults() {
        let store = MemoryStore::with_entries(keys::ALL.iter().map(|k| (*k, "\u{0}garbage")));
        let gw = PersistenceGateway::new(store, 500);
        assert!(gw.has_save_data());
        assert!(gw.load().is_empty());
    }

    #[test]
    fn test_has_save_data_and_reset() {
        let mut ctx = SimulationContext::new(1, Tuning::default());
        let mut gw = gateway();
        assert!(!gw.has_save_data());

        ctx.award(50);
        ctx.add_helper(Vec2::new(50.0, 50.0), Direction::Down);
        gw.flush(&ctx);
        assert!(gw.has_save_data());

        assert!(gw.reset(&mut ctx));
        assert_eq!(ctx.score(), 0);
        assert!(ctx.helpers.is_empty());
        assert_eq!(ctx.coins.len(), 1);
        assert_eq!(gw.store().get(keys::HELPERS).as_deref(), Some("[]"));
    }

    #[test]
    fn test_after_tick_uses_dirty_flag() {
        let mut ctx = SimulationContext::new(1, Tuning::default());
        ctx.take_dirty();
        let mut gw = gateway();

        ctx.time_ms = 100;
        assert!(!gw.after_tick(&mut ctx));
        assert!(!gw.is_pending());

        ctx.award(1);
        assert!(!gw.after_tick(&mut ctx));
        assert!(gw.is_pending());

        ctx.time_ms = 600;
        assert!(gw.after_tick(&mut ctx));
        assert_eq!(gw.write_count(), 1);
    }
}
