//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or storage dependencies

pub mod assign;
pub mod behavior;
pub mod combat;
pub mod level;
pub mod schedule;
pub mod shop;
pub mod spawn;
pub mod state;
pub mod tick;

pub use assign::{Assignments, Candidates, HelperAssignment, SlimeAssignment, TargetKind, assign};
pub use behavior::{
    AnimationIntent, BehaviorState, Clip, CoinState, Direction, HelperState, SlimeState,
    SpinPhase, animation_intent,
};
pub use combat::{damage_slime, move_slime_by, spin_coin};
pub use schedule::{EventQueue, Scheduled, StrikeTarget};
pub use shop::{Purchase, can_afford, coin_price, helper_price, purchase};
pub use spawn::{SlimeSpawner, SpawnSide};
pub use state::{
    Coin, CoinKind, EntityId, EntityRef, GameProgress, Helper, SimEvent, SimulationContext, Slime,
    SpinOutcome,
};
pub use tick::{TickInput, tick};
