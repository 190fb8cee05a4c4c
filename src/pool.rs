//! Pool state and the `Initialize`/`Mint`/`Burn`/`Collect` event handlers.
//!
//! `Swap` is big enough to earn its own module (`crate::swap`); everything
//! else lives here, mirroring how the reference crate keeps a pool's static
//! `Info` and its mutable `CurrentState` side by side on one struct
//! (`amms::amms::uniswap_v3::UniswapV3Pool`).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::F64_FEE_ONE;
use crate::error::{ReplayError, Result};
use crate::event::{BurnEvent, CollectEvent, EventCoords, Identifier, InitializeEvent, MintEvent, PoolEvent};
use crate::math;
use crate::position::PositionStore;

/// Immutable pool configuration, fixed at construction and never touched by
/// replay — tokens, fee tier and tick spacing the log's events were emitted
/// under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    pub token0: Identifier,
    pub token1: Identifier,
    pub pool_address: Identifier,
    pub tick_spacing: i32,
    /// Swap fee tier in parts-per-million, e.g. `3000` for 0.3%.
    pub fee_ppm: u32,
    /// Protocol fee tier in parts-per-million, default 0.
    pub protocol_fee_ppm: u32,
}

impl PoolParams {
    pub fn fee_rate(&self) -> f64 {
        self.fee_ppm as f64 / F64_FEE_ONE
    }

    pub fn protocol_fee_rate(&self) -> f64 {
        self.protocol_fee_ppm as f64 / F64_FEE_ONE
    }
}

/// Mutable pool state: current price/tick, pool-wide in-range liquidity, and
/// running totals of swap fees taken from inputs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolState {
    pub sqrt_price: f64,
    pub tick: i32,
    pub liquidity: f64,
    pub total_fee0: f64,
    pub total_fee1: f64,
    pub initialized: bool,
}

impl PoolState {
    /// Adds `amount` to whichever of `total_fee0`/`total_fee1` matches `side`.
    pub fn totalfee_mut(&mut self, side: crate::position::FeeSide, amount: f64) {
        match side {
            crate::position::FeeSide::Token0 => self.total_fee0 += amount,
            crate::position::FeeSide::Token1 => self.total_fee1 += amount,
        }
    }

    /// `sqrtPrice²`.
    pub fn price(&self) -> f64 {
        self.sqrt_price * self.sqrt_price
    }
}

/// A single pool's full replay state: its configuration, current state, the
/// position book, and the append-only log of events applied so far.
#[derive(Debug, Clone)]
pub struct Pool {
    pub params: PoolParams,
    pub state: PoolState,
    pub positions: PositionStore,
    pub log: Vec<PoolEvent>,
}

impl Pool {
    pub fn new(params: PoolParams) -> Self {
        Self {
            params,
            state: PoolState::default(),
            positions: PositionStore::new(),
            log: Vec::new(),
        }
    }

    /// `Initialize`: sets the starting price from whichever of `sqrtPrice`,
    /// `sqrtPriceX96` or `price` was supplied, and checks the supplied `tick`
    /// (if any) against the tick the price derives — a mismatch is logged,
    /// never fatal, matching `TickPriceMisalignment`'s place in the error
    /// taxonomy as a warning-only condition for this event.
    pub fn initialize(&mut self, event: InitializeEvent) -> Result<()> {
        let sqrt_price = if let Some(sp) = event.sqrt_price {
            sp
        } else if let Some(spx96) = event.sqrt_price_x96 {
            math::sqrt_price_x96_to_sqrt_price(spx96)
        } else if let Some(price) = event.price {
            price.sqrt()
        } else {
            return Err(ReplayError::IncorrectInput);
        };

        let derived_tick = math::tick_of(sqrt_price);
        if let Some(supplied) = event.tick {
            if supplied != derived_tick {
                warn!(
                    supplied,
                    derived_tick, "Initialize: supplied tick does not match derived tick"
                );
            }
        }

        self.state = PoolState {
            sqrt_price,
            tick: derived_tick,
            liquidity: 0.0,
            total_fee0: 0.0,
            total_fee1: 0.0,
            initialized: true,
        };

        debug!(tick = derived_tick, sqrt_price, "pool initialized");
        self.log.push(PoolEvent::Initialize(event));
        Ok(())
    }

    /// `Mint`: upserts the position, and if the minted range covers the
    /// current tick, folds the new liquidity into pool-wide `liquidity`.
    pub fn mint(&mut self, event: MintEvent) -> Result<()> {
        let MintEvent {
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
            ref sender,
            token_id,
            ref coords,
        } = event;

        self.positions.upsert_mint(
            token_id,
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
            sender.clone(),
            coords.clone(),
        );

        if tick_lower <= self.state.tick && self.state.tick < tick_upper {
            self.state.liquidity += amount;
        }

        debug!(token_id, tick_lower, tick_upper, amount, "mint applied");
        self.log.push(PoolEvent::Mint(event));
        Ok(())
    }

    /// `Burn`: subtracts liquidity from the position (fatal `BurnMintMismatch`
    /// if the `tokenId` is unknown). Pool-wide `liquidity` is left untouched —
    /// it is only recomputed by `mint()`'s in-range fold and by the swap
    /// engine's `commit_state`, never by `burn()`.
    pub fn burn(&mut self, event: BurnEvent) -> Result<()> {
        let BurnEvent {
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
            token_id,
            ref coords,
            ..
        } = event;

        self.positions
            .apply_burn(token_id, amount, amount0, amount1, coords.clone())?;

        debug!(token_id, tick_lower, tick_upper, amount, "burn applied");
        self.log.push(PoolEvent::Burn(event));
        Ok(())
    }

    /// `Collect`: non-fatal on an unmatched `tokenId`; delegates entirely to
    /// the position store since pool-wide `liquidity` is unaffected by fee
    /// withdrawal.
    pub fn collect(&mut self, event: CollectEvent) -> Result<()> {
        let CollectEvent {
            amount0,
            amount1,
            token_id,
            ref coords,
            ..
        } = event;

        self.positions
            .apply_collect(token_id, amount0, amount1, self.state.sqrt_price, coords.clone());

        debug!(token_id, amount0, amount1, "collect applied");
        self.log.push(PoolEvent::Collect(event));
        Ok(())
    }

    pub fn last_coords(&self) -> Option<&EventCoords> {
        self.log.iter().rev().find_map(PoolEvent::coords)
    }

    /// Positions with `last_L > 0`.
    pub fn active_lp_positions(&self) -> Vec<&crate::position::Position> {
        self.positions.active_lp()
    }

    /// The full event log, ordered by `(blockNumber, logIndex)`; `Initialize`
    /// carries no coordinates and sorts first.
    pub fn view_all_pool_events(&self) -> Vec<&PoolEvent> {
        let mut events: Vec<&PoolEvent> = self.log.iter().collect();
        events.sort_by_key(|e| e.coords().map(|c| (c.block_number, c.log_index)).unwrap_or((0, 0)));
        events
    }

    /// Current price, `sqrtPrice²`.
    pub fn price(&self) -> f64 {
        self.state.price()
    }

    /// Deferred: the source's liquidity-distribution plot has no analogue
    /// here, so this always reports no data rather than reconstructing a
    /// tick-bucketed histogram.
    pub fn liquidity_distribution(&self) -> Vec<(i32, f64)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn coords(i: u64) -> EventCoords {
        EventCoords {
            log_index: i,
            block_number: 1,
            transaction_index: 0,
            transaction_hash: "0xabc".into(),
        }
    }

    fn new_pool() -> Pool {
        Pool::new(PoolParams {
            token0: "token0".into(),
            token1: "token1".into(),
            pool_address: "pool".into(),
            tick_spacing: 60,
            fee_ppm: 3000,
            protocol_fee_ppm: 0,
        })
    }

    #[test]
    fn initialize_from_price_sets_tick() {
        let mut pool = new_pool();
        pool.initialize(InitializeEvent {
            sqrt_price: None,
            sqrt_price_x96: None,
            price: Some(1.0),
            tick: None,
        })
        .unwrap();
        assert_eq!(pool.state.tick, 0);
        assert_relative_eq!(pool.state.sqrt_price, 1.0);
    }

    #[test]
    fn initialize_with_no_price_field_is_incorrect_input() {
        let mut pool = new_pool();
        let err = pool
            .initialize(InitializeEvent {
                sqrt_price: None,
                sqrt_price_x96: None,
                price: None,
                tick: None,
            })
            .unwrap_err();
        assert_eq!(err, ReplayError::IncorrectInput);
    }

    #[test]
    fn mint_in_range_increases_pool_liquidity() {
        let mut pool = new_pool();
        pool.initialize(InitializeEvent {
            sqrt_price: None,
            sqrt_price_x96: None,
            price: Some(1.0),
            tick: None,
        })
        .unwrap();

        pool.mint(MintEvent {
            tick_lower: -60,
            tick_upper: 60,
            amount: 1_000_000.0,
            amount0: 10.0,
            amount1: 10.0,
            sender: "alice".into(),
            token_id: 1,
            coords: coords(0),
        })
        .unwrap();

        assert_eq!(pool.state.liquidity, 1_000_000.0);
    }

    #[test]
    fn mint_out_of_range_does_not_change_pool_liquidity() {
        let mut pool = new_pool();
        pool.initialize(InitializeEvent {
            sqrt_price: None,
            sqrt_price_x96: None,
            price: Some(1.0),
            tick: None,
        })
        .unwrap();

        pool.mint(MintEvent {
            tick_lower: 120,
            tick_upper: 180,
            amount: 1_000_000.0,
            amount0: 10.0,
            amount1: 10.0,
            sender: "alice".into(),
            token_id: 1,
            coords: coords(0),
        })
        .unwrap();

        assert_eq!(pool.state.liquidity, 0.0);
    }

    #[test]
    fn burn_unknown_token_id_is_fatal() {
        let mut pool = new_pool();
        let err = pool
            .burn(BurnEvent {
                tick_lower: -60,
                tick_upper: 60,
                amount: 1.0,
                amount0: 0.0,
                amount1: 0.0,
                owner: "alice".into(),
                token_id: 7,
                coords: coords(0),
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::BurnMintMismatch { token_id: 7, .. }));
    }
}
