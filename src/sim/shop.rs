//! Buying coins and helpers
//!
//! Prices scale with how many of the thing you already own; owning none
//! counts as half of one. Unaffordable purchases do nothing.

use glam::Vec2;
use rand::Rng;

use super::behavior::Direction;
use super::state::{CoinKind, EntityId, SimulationContext};

/// Shop order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Coin(CoinKind),
    Helper,
}

/// base * owned, with zero owned counting as 0.5 (rounded up)
fn scaled_price(base: u64, owned: usize) -> u64 {
    if owned == 0 {
        base.div_ceil(2)
    } else {
        base.saturating_mul(owned as u64)
    }
}

pub fn coin_price(ctx: &SimulationContext, kind: CoinKind) -> u64 {
    let owned = ctx.coins.iter().filter(|c| c.kind == kind).count();
    scaled_price(ctx.tuning.coin(kind).base_price, owned)
}

pub fn helper_price(ctx: &SimulationContext) -> u64 {
    scaled_price(ctx.tuning.helper_base_price, ctx.helpers.len())
}

/// Whether the player can currently afford `purchase`
pub fn can_afford(ctx: &SimulationContext, purchase: Purchase) -> bool {
    let price = match purchase {
        Purchase::Coin(kind) => coin_price(ctx, kind),
        Purchase::Helper => helper_price(ctx),
    };
    ctx.score() >= price
}

/// Random spot inside the safe interior
fn random_board_position(ctx: &mut SimulationContext) -> Vec2 {
    let t = &ctx.tuning;
    let (min_x, max_x) = (t.safe_margin, (t.board_width - t.safe_margin).max(t.safe_margin));
    let (min_y, max_y) = (t.safe_margin, (t.board_height - t.safe_margin).max(t.safe_margin));
    let rng = ctx.rng();
    Vec2::new(
        rng.random_range(min_x..=max_x),
        rng.random_range(min_y..=max_y),
    )
}

pub fn buy_coin(ctx: &mut SimulationContext, kind: CoinKind) -> Option<EntityId> {
    let price = coin_price(ctx, kind);
    if !ctx.spend(price) {
        log::debug!("Cannot afford {} coin ({} > {})", kind.as_str(), price, ctx.score());
        return None;
    }
    let pos = random_board_position(ctx);
    let value = ctx.tuning.coin(kind).value;
    let id = ctx.add_coin(kind, value, pos);
    log::info!("Bought {} coin #{} for {}", kind.as_str(), id, price);
    Some(id)
}

pub fn buy_helper(ctx: &mut SimulationContext) -> Option<EntityId> {
    let price = helper_price(ctx);
    if !ctx.spend(price) {
        log::debug!("Cannot afford helper ({} > {})", price, ctx.score());
        return None;
    }
    let pos = random_board_position(ctx);
    let id = ctx.add_helper(pos, Direction::Down);
    log::info!("Hired helper #{} for {}", id, price);
    Some(id)
}

pub fn purchase(ctx: &mut SimulationContext, order: Purchase) -> Option<EntityId> {
    match order {
        Purchase::Coin(kind) => buy_coin(ctx, kind),
        Purchase::Helper => buy_helper(ctx),
    }
}
