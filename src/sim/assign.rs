//! Per-tick actor → target matching
//!
//! Three tiers, each a greedy nearest-first one-to-one matching:
//! 1. slime → coin (always, first claim on coins)
//! 2. helper → slime (any slime still alive)
//! 3. helper → coin, only when no slime is alive
//!
//! Equal distances are broken by actor id, then target id.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::state::{EntityId, SimulationContext};

/// An entity id and where it stands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    pub id: EntityId,
    pub pos: Vec2,
}

/// Entities sorted by availability for this tick
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    /// Helpers outside their fatigue window
    pub helpers: Vec<Located>,
    /// Active coins that are not spinning
    pub coins: Vec<Located>,
    /// Active slimes that are not mid-attack
    pub movable_slimes: Vec<Located>,
    /// Every active slime
    pub alive_slimes: Vec<Located>,
}

impl Candidates {
    /// Classify the context's entities at its current time
    pub fn classify(ctx: &SimulationContext) -> Self {
        let now = ctx.time_ms;
        let locate = |id, pos| Located { id, pos };
        Self {
            helpers: ctx
                .helpers
                .iter()
                .filter(|h| !h.is_fatigued(now))
                .map(|h| locate(h.id, h.pos))
                .collect(),
            coins: ctx
                .coins
                .iter()
                .filter(|c| c.is_available())
                .map(|c| locate(c.id, c.pos))
                .collect(),
            movable_slimes: ctx
                .slimes
                .iter()
                .filter(|s| s.is_movable())
                .map(|s| locate(s.id, s.pos))
                .collect(),
            alive_slimes: ctx
                .slimes
                .iter()
                .filter(|s| s.active)
                .map(|s| locate(s.id, s.pos))
                .collect(),
        }
    }
}

/// What a helper is going after
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKind {
    Slime,
    Coin,
}

/// A helper's target for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelperAssignment {
    pub target_id: EntityId,
    pub target_kind: TargetKind,
    /// Target position minus helper position
    pub delta: Vec2,
    pub distance: f32,
}

/// A slime's target coin for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlimeAssignment {
    pub coin_id: EntityId,
    pub delta: Vec2,
    pub distance: f32,
}

/// Full matching for one tick; entities without an entry stay idle
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    pub helpers: BTreeMap<EntityId, HelperAssignment>,
    pub slimes: BTreeMap<EntityId, SlimeAssignment>,
}

/// One committed actor/target pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pairing {
    pub actor: EntityId,
    pub target: EntityId,
    pub delta: Vec2,
    pub distance: f32,
}

/// Nearest-first greedy one-to-one matching
///
/// Every actor is paired with every target not in `excluded`; pairs are taken
/// in ascending distance and committed only when neither side is taken yet.
pub fn greedy_match(
    actors: &[Located],
    targets: &[Located],
    excluded: &BTreeSet<EntityId>,
) -> Vec<Pairing> {
    let mut pairs: Vec<Pairing> = Vec::with_capacity(actors.len() * targets.len());
    for actor in actors {
        for target in targets.iter().filter(|t| !excluded.contains(&t.id)) {
            let delta = target.pos - actor.pos;
            pairs.push(Pairing {
                actor: actor.id,
                target: target.id,
                delta,
                distance: delta.length(),
            });
        }
    }

    pairs.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.actor.cmp(&b.actor))
            .then(a.target.cmp(&b.target))
    });

    let mut taken_actors = BTreeSet::new();
    let mut taken_targets = BTreeSet::new();
    let mut committed = Vec::new();
    for pair in pairs {
        if taken_actors.contains(&pair.actor) || taken_targets.contains(&pair.target) {
            continue;
        }
        taken_actors.insert(pair.actor);
        taken_targets.insert(pair.target);
        committed.push(pair);
    }
    committed
}

/// Tier 1: movable slimes claim the nearest free coins
pub fn assign_slimes(candidates: &Candidates) -> BTreeMap<EntityId, SlimeAssignment> {
    greedy_match(&candidates.movable_slimes, &candidates.coins, &BTreeSet::new())
        .into_iter()
        .map(|p| {
            (
                p.actor,
                SlimeAssignment {
                    coin_id: p.target,
                    delta: p.delta,
                    distance: p.distance,
                },
            )
        })
        .collect()
}

/// Tiers 2 and 3: helpers hunt slimes, or spin coins when no slime is alive
///
/// `claimed_coins` are coins already taken by slimes in tier 1.
pub fn assign_helpers(
    candidates: &Candidates,
    claimed_coins: &BTreeSet<EntityId>,
) -> BTreeMap<EntityId, HelperAssignment> {
    let mut out = BTreeMap::new();

    for p in greedy_match(&candidates.helpers, &candidates.alive_slimes, &BTreeSet::new()) {
        out.insert(
            p.actor,
            HelperAssignment {
                target_id: p.target,
                target_kind: TargetKind::Slime,
                delta: p.delta,
                distance: p.distance,
            },
        );
    }

    if candidates.alive_slimes.is_empty() {
        let remaining: Vec<Located> = candidates
            .helpers
            .iter()
            .filter(|h| !out.contains_key(&h.id))
            .copied()
            .collect();
        for p in greedy_match(&remaining, &candidates.coins, claimed_coins) {
            out.insert(
                p.actor,
                HelperAssignment {
                    target_id: p.target,
                    target_kind: TargetKind::Coin,
                    delta: p.delta,
                    distance: p.distance,
                },
            );
        }
    }

    out
}

/// Run all three tiers over one classification
pub fn assign(candidates: &Candidates) -> Assignments {
    let slimes = assign_slimes(candidates);
    let claimed: BTreeSet<EntityId> = slimes.values().map(|a| a.coin_id).collect();
    let helpers = assign_helpers(candidates, &claimed);
    log::debug!(
        "assigned {} helpers, {} slimes",
        helpers.len(),
        slimes.len()
    );
    Assignments { helpers, slimes }
}
