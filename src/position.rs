//! Keyed position store, replacing the original whole-column masked-update
//! dataframe (`pools/cl_cpmm/cl_cpmm.py`'s `self.positions`) with a mapping
//! from `tokenId` to a `Position` record plus a `tickLower`-ordered index for
//! overlap queries during swap traversal, as the redesign note in
//! `DESIGN.md` calls for.
//!
//! Structured the way the reference crate keeps per-entity state behind a
//! struct with narrow mutating methods (`amms::amms::uniswap_v3::UniswapV3Pool::modify_position`)
//! rather than exposing the map directly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::BURN_NEGATIVE_LIQUIDITY_TOLERANCE;
use crate::error::{ReplayError, Result};
use crate::event::{EventCoords, Identifier, TokenId};
use crate::math;

/// Which side of a swap (token0 vs token1) a fee was charged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSide {
    Token0,
    Token1,
}

/// One liquidity-provider position, identified by its NFT `tokenId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub token_id: TokenId,
    pub owner: Identifier,
    pub tick_lower: i32,
    pub tick_upper: i32,

    pub start_l: f64,
    pub increase_l: f64,
    pub last_l: f64,

    pub start_token0_holdings: f64,
    pub start_token1_holdings: f64,
    pub increase_token0_holdings: f64,
    pub increase_token1_holdings: f64,
    pub last_token0_holdings: f64,
    pub last_token1_holdings: f64,

    pub token0_fees_accrued: f64,
    pub token1_fees_accrued: f64,
    pub token0_collected: f64,
    pub token1_collected: f64,

    pub start_coords: EventCoords,
    pub last_coords: EventCoords,
}

impl Position {
    /// A position is active iff it still carries liquidity.
    pub fn is_active(&self) -> bool {
        self.last_l > 0.0
    }

    /// Whether `tick` falls within `[tick_lower, tick_upper)`, the definition
    /// pool-wide `liquidity` and `in_range_liquidity` use (invariant P2/P3).
    pub fn covers_half_open(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick < self.tick_upper
    }
}

/// Keyed collection of positions plus the auxiliary `tickLower` index used by
/// the swap engine to find the lowest/highest active boundary without a full
/// linear scan every step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionStore {
    positions: HashMap<TokenId, Position>,
    by_tick_lower: BTreeMap<i32, Vec<TokenId>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token_id: TokenId) -> Option<&Position> {
        self.positions.get(&token_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.positions.values_mut()
    }

    /// Positions with `last_L > 0`.
    pub fn active_lp(&self) -> Vec<&Position> {
        self.iter().filter(|p| p.is_active()).collect()
    }

    /// `Σ last_L` over positions whose half-open range `[tickLower, tickUpper)` contains `tick`.
    pub fn in_range_liquidity(&self, tick: i32) -> f64 {
        self.iter()
            .filter(|p| p.covers_half_open(tick))
            .map(|p| p.last_l)
            .sum()
    }

    /// `Σ last_L` over positions covering `tick` under the swap-direction
    /// covering predicate (§4.5), used when the swap engine commits its final
    /// liquidity figure rather than the pool-wide half-open predicate.
    pub fn in_range_liquidity_directional(&self, tick: i32, zero_for_one: bool) -> f64 {
        self.active_positions_in_range(tick, zero_for_one)
            .iter()
            .filter_map(|id| self.get(*id))
            .map(|p| p.last_l)
            .sum()
    }

    /// Lowest `tickLower` among active positions.
    pub fn min_active_tick_lower(&self) -> Option<i32> {
        self.by_tick_lower
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| self.positions[id].is_active()))
            .map(|(tick, _)| *tick)
    }

    /// Highest `tickUpper` among active positions.
    pub fn max_active_tick_upper(&self) -> Option<i32> {
        self.iter()
            .filter(|p| p.is_active())
            .map(|p| p.tick_upper)
            .max()
    }

    /// Every `tickLower`/`tickUpper` value in the book, the "initialized
    /// ticks" set the swap engine stops at or skips over.
    pub fn active_boundaries(&self) -> BTreeSet<i32> {
        self.iter()
            .flat_map(|p| [p.tick_lower, p.tick_upper])
            .collect()
    }

    /// Active positions exactly pinned at `tick_lower == tick`, used when the
    /// traversal snaps onto the lowest active boundary.
    pub fn active_pinned_at_tick_lower(&self, tick: i32) -> Vec<TokenId> {
        self.by_tick_lower
            .get(&tick)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.positions[id].is_active())
            .collect()
    }

    /// Active positions exactly pinned at `tick_upper == tick`.
    pub fn active_pinned_at_tick_upper(&self, tick: i32) -> Vec<TokenId> {
        self.iter()
            .filter(|p| p.is_active() && p.tick_upper == tick)
            .map(|p| p.token_id)
            .collect()
    }

    /// Active positions covering `current_tick`, with the inclusive/exclusive
    /// rule from §4.5 depending on sweep direction.
    pub fn active_positions_in_range(&self, current_tick: i32, zero_for_one: bool) -> Vec<TokenId> {
        self.iter()
            .filter(|p| {
                p.is_active()
                    && if zero_for_one {
                        p.tick_lower < current_tick && p.tick_upper >= current_tick
                    } else {
                        p.tick_lower <= current_tick && p.tick_upper > current_tick
                    }
            })
            .map(|p| p.token_id)
            .collect()
    }

    /// `Mint`: create the position on first sight, capturing `start_*`; on a
    /// repeat `tokenId`, accumulate into `last_*`/`increase_*` only — `start_*`
    /// is frozen per the resolved open question in `DESIGN.md`.
    pub fn upsert_mint(
        &mut self,
        token_id: TokenId,
        tick_lower: i32,
        tick_upper: i32,
        amount: f64,
        amount0: f64,
        amount1: f64,
        sender: Identifier,
        coords: EventCoords,
    ) {
        if let Some(pos) = self.positions.get_mut(&token_id) {
            pos.last_l += amount;
            pos.increase_l += amount;
            pos.last_token0_holdings += amount0;
            pos.last_token1_holdings += amount1;
            pos.increase_token0_holdings += amount0;
            pos.increase_token1_holdings += amount1;
            pos.last_coords = coords;
        } else {
            let position = Position {
                token_id,
                owner: sender,
                tick_lower,
                tick_upper,
                start_l: amount,
                increase_l: 0.0,
                last_l: amount,
                start_token0_holdings: amount0,
                start_token1_holdings: amount1,
                increase_token0_holdings: 0.0,
                increase_token1_holdings: 0.0,
                last_token0_holdings: amount0,
                last_token1_holdings: amount1,
                token0_fees_accrued: 0.0,
                token1_fees_accrued: 0.0,
                token0_collected: 0.0,
                token1_collected: 0.0,
                start_coords: coords.clone(),
                last_coords: coords,
            };
            self.by_tick_lower.entry(tick_lower).or_default().push(token_id);
            self.positions.insert(token_id, position);
        }
    }

    /// `Burn`: subtract `amount` from `last_L`, overwrite the reserve estimate
    /// with the reported remaining amounts, and clamp a small negative
    /// residue to zero with a warning (the frozen `≤ 8184` tolerance).
    pub fn apply_burn(
        &mut self,
        token_id: TokenId,
        amount: f64,
        amount0: f64,
        amount1: f64,
        coords: EventCoords,
    ) -> Result<()> {
        let pos = self.positions.get_mut(&token_id).ok_or(ReplayError::BurnMintMismatch {
            token_id,
            matches: 0,
        })?;

        pos.last_l -= amount;
        pos.last_token0_holdings = amount0;
        pos.last_token1_holdings = amount1;
        pos.last_coords = coords;

        if pos.last_l < 0.0 {
            if pos.last_l.abs() <= BURN_NEGATIVE_LIQUIDITY_TOLERANCE {
                warn!(
                    token_id,
                    residual = pos.last_l,
                    "Burn drove position liquidity slightly negative; clamped to 0"
                );
            } else {
                warn!(
                    token_id,
                    residual = pos.last_l,
                    "Burn drove position liquidity negative beyond the rounding tolerance; clamped to 0"
                );
            }
            pos.last_l = 0.0;
        }

        Ok(())
    }

    /// `Collect`: accumulate into `token{0,1}_collected`, then refresh the
    /// reserve estimate from `sqrt_price`. A `tokenId` that cannot be matched
    /// is logged and otherwise ignored — `CollectMismatch` is a non-fatal
    /// warning per the resolved open question in `DESIGN.md`.
    pub fn apply_collect(
        &mut self,
        token_id: TokenId,
        amount0: f64,
        amount1: f64,
        sqrt_price: f64,
        coords: EventCoords,
    ) {
        let Some(pos) = self.positions.get_mut(&token_id) else {
            warn!(
                "{}",
                ReplayError::CollectMismatch { token_id, matches: 0 }
            );
            return;
        };

        pos.token0_collected += amount0;
        pos.token1_collected += amount1;

        let (a0, a1) = math::amounts(
            sqrt_price,
            math::sqrt_price_of(pos.tick_lower),
            math::sqrt_price_of(pos.tick_upper),
            pos.last_l,
        );
        pos.last_token0_holdings = a0;
        pos.last_token1_holdings = a1;
        pos.last_coords = coords;
    }

    /// Adds `last_L · feePerL` to the fee-accrual counter of every position in
    /// `active_ids` on the given side, per §4.4.
    pub fn distribute_fees(&mut self, active_ids: &[TokenId], fee_per_l: f64, side: FeeSide) {
        for id in active_ids {
            if let Some(pos) = self.positions.get_mut(id) {
                let share = pos.last_l * fee_per_l;
                match side {
                    FeeSide::Token0 => pos.token0_fees_accrued += share,
                    FeeSide::Token1 => pos.token1_fees_accrued += share,
                }
            }
        }
    }

    /// Recomputes every position's reserve estimate from the current `sqrt_price`.
    pub fn refresh_holdings(&mut self, sqrt_price: f64) {
        for pos in self.iter_mut() {
            let (a0, a1) = math::amounts(
                sqrt_price,
                math::sqrt_price_of(pos.tick_lower),
                math::sqrt_price_of(pos.tick_upper),
                pos.last_l,
            );
            pos.last_token0_holdings = a0;
            pos.last_token1_holdings = a1;
        }
    }

    /// Touches the `last_*` event coordinates on every position without
    /// otherwise mutating state — used after a `Swap` so every position
    /// records it was observed at this event, matching `position_last_update_state`
    /// in the original implementation.
    pub fn touch_all(&mut self, coords: EventCoords) {
        for pos in self.iter_mut() {
            pos.last_coords = coords.clone();
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
