//! Delayed outcomes as data
//!
//! Anything that happens "a little later" (spin phases, hits landing, slime
//! death, fatigue ending) is queued here with the simulation time it fires at
//! and drained by the tick. Handlers must re-check their target, since it may
//! have been removed or changed while the event waited.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::state::EntityId;

/// What a helper's strike lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrikeTarget {
    Coin(EntityId),
    Slime(EntityId),
}

/// Payload of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scheduled {
    /// Coin finished the first half of its spin
    SpinPhaseEnd { coin: EntityId },
    /// Coin finished spinning; roll the payout
    SpinResolve { coin: EntityId },
    /// Reward flash / miss pose is over
    CoinRest { coin: EntityId },
    /// Helper's attack connects
    HelperStrike { helper: EntityId, target: StrikeTarget },
    /// Helper switches to the exhausted cue mid-fatigue
    HelperSlump { helper: EntityId },
    /// Helper's fatigue window ends
    HelperRecovered { helper: EntityId },
    /// Slime's attack connects with its coin
    SlimeStrike { slime: EntityId, coin: EntityId },
    /// Slime hit reaction finished, start dying
    SlimeHitEnd { slime: EntityId },
    /// Slime death sequence finished
    SlimeDeathEnd { slime: EntityId },
}

impl Scheduled {
    /// Entity the event mutates
    pub fn target_id(&self) -> EntityId {
        match *self {
            Scheduled::SpinPhaseEnd { coin }
            | Scheduled::SpinResolve { coin }
            | Scheduled::CoinRest { coin } => coin,
            Scheduled::HelperStrike { target, .. } => match target {
                StrikeTarget::Coin(id) | StrikeTarget::Slime(id) => id,
            },
            Scheduled::HelperSlump { helper } | Scheduled::HelperRecovered { helper } => helper,
            Scheduled::SlimeStrike { coin, .. } => coin,
            Scheduled::SlimeHitEnd { slime } | Scheduled::SlimeDeathEnd { slime } => slime,
        }
    }
}

/// A queued event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduledEvent {
    /// Simulation time (ms) the event becomes due
    pub fires_at: u64,
    /// Insertion order, keeps same-time events FIFO
    pub seq: u64,
    pub payload: Scheduled,
}

/// Min-heap of scheduled events ordered by (fires_at, seq)
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `payload` to fire at `fires_at`
    pub fn schedule(&mut self, fires_at: u64, payload: Scheduled) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent {
            fires_at,
            seq,
            payload,
        }));
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(e)| e.fires_at)
    }

    /// Pop the earliest event if it is due at `now`
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledEvent> {
        if self.peek_time()? <= now {
            self.heap.pop().map(|Reverse(e)| e)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending events that touch `id`
    pub fn pending_for(&self, id: EntityId) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(e)| e.payload.target_id() == id)
            .count()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule(300, Scheduled::CoinRest { coin: 1 });
        q.schedule(100, Scheduled::SpinResolve { coin: 2 });
        q.schedule(200, Scheduled::SlimeHitEnd { slime: 3 });

        assert!(q.pop_due(50).is_none());
        assert_eq!(q.pop_due(1000).map(|e| e.fires_at), Some(100));
        assert_eq!(q.pop_due(1000).map(|e| e.fires_at), Some(200));
        assert_eq!(q.pop_due(1000).map(|e| e.fires_at), Some(300));
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut q = EventQueue::new();
        q.schedule(100, Scheduled::SlimeDeathEnd { slime: 9 });
        q.schedule(100, Scheduled::CoinRest { coin: 1 });

        assert_eq!(
            q.pop_due(100).map(|e| e.payload),
            Some(Scheduled::SlimeDeathEnd { slime: 9 })
        );
        assert_eq!(
            q.pop_due(100).map(|e| e.payload),
            Some(Scheduled::CoinRest { coin: 1 })
        );
    }

    #[test]
    fn test_target_id() {
        let strike = Scheduled::HelperStrike {
            helper: 1,
            target: StrikeTarget::Slime(7),
        };
        assert_eq!(strike.target_id(), 7);

        let mut q = EventQueue::new();
        q.schedule(10, strike);
        q.schedule(20, Scheduled::SlimeHitEnd { slime: 7 });
        q.schedule(30, Scheduled::HelperRecovered { helper: 1 });
        assert_eq!(q.pending_for(7), 2);
    }
}
