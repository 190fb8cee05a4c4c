//! The swap engine: walks a `Swap` event across however many tick boundaries
//! it crosses, charging and attributing fees per sub-range as it goes.
//!
//! Structured as the four-phase loop named in `DESIGN.md`
//! (`FindActive -> CheckReserves -> CrossBoundary -> CommitState`), the
//! idiomatic-Rust reshaping of `pools/cl_cpmm/cl_cpmm.py`'s `zeroForOne`/
//! `oneForZero` while-loops into a named state machine, the way the reference
//! crate's swap simulation keeps an explicit `CurrentState`/`StepComputations`
//! pair per iteration (`amms::amms::uniswap_v3::UniswapV3Pool::simulate_swap`)
//! instead of a bag of loop-local variables.

use tracing::{debug, trace, warn};

use crate::consts::MAX_SWAP_ITERATIONS;
use crate::error::{ReplayError, Result};
use crate::event::{PoolEvent, SwapEvent};
use crate::math;
use crate::pool::Pool;
use crate::position::FeeSide;

/// Tunables for reconciling a swap's reported fields against what the engine
/// computes. Defaults match the original implementation's tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapOptions {
    /// Fraction used two ways: as a tick-count window (`tolerance * 100` ticks)
    /// when reconciling the reported tick, and as a multiplicative band
    /// `[1 - tolerance, 1 + tolerance]` when reconciling reported liquidity.
    pub tolerance: f64,
    /// Downgrade every mismatch to a logged warning instead of only the ones
    /// already inside the tolerance window.
    pub warn_all: bool,
    /// Trust the event's reported `sqrtPriceX96`/`tick` outright instead of
    /// reconciling them against the engine's own computation.
    pub pass_error: bool,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            tolerance: crate::consts::DEFAULT_SWAP_TOLERANCE,
            warn_all: false,
            pass_error: false,
        }
    }
}

const REMAINING_EPSILON: f64 = 1e-9;

/// Applies one `Swap` event to `pool`, mutating its price/tick/liquidity and
/// every affected position's fee accrual, then reconciles the traversal's own
/// computation against whatever the event itself reported.
pub fn apply_swap(pool: &mut Pool, event: SwapEvent, options: &SwapOptions) -> Result<()> {
    let zero_for_one = classify_direction(event.amount0, event.amount1)?;
    let mut remaining = if zero_for_one { event.amount0 } else { event.amount1 };
    let fee_rate = pool.params.fee_rate();
    let fee_side = if zero_for_one { FeeSide::Token0 } else { FeeSide::Token1 };
    let boundaries = pool.positions.active_boundaries();

    let mut p = pool.state.sqrt_price;
    let mut tick = pool.state.tick;
    let mut total_fee = 0.0_f64;

    // Pre-step: tick realignment, for when the pool's current tick starts
    // entirely outside every active position's range.
    if pool.positions.active_positions_in_range(tick, zero_for_one).is_empty() {
        if let Some(min_lower) = pool.positions.min_active_tick_lower() {
            if tick < min_lower {
                tick = min_lower;
                p = math::sqrt_price_of(tick);
            }
        }
        if let Some(max_upper) = pool.positions.max_active_tick_upper() {
            if tick > max_upper {
                tick = max_upper;
                p = math::sqrt_price_of(tick);
            }
        }
    }

    let mut iterations: u64 = 0;
    loop {
        if remaining <= REMAINING_EPSILON {
            break;
        }
        iterations += 1;
        if iterations > MAX_SWAP_ITERATIONS {
            return Err(ReplayError::SwapNonTermination {
                ceiling: MAX_SWAP_ITERATIONS,
            });
        }

        // FindActive.
        let mut active_ids = pool.positions.active_positions_in_range(tick, zero_for_one);

        if active_ids.is_empty() {
            let pinned = if zero_for_one {
                pool.positions.active_pinned_at_tick_lower(tick)
            } else {
                pool.positions.active_pinned_at_tick_upper(tick)
            };

            if !pinned.is_empty() {
                active_ids = pinned;
            } else {
                let Some(next) = find_next_boundary(&boundaries, tick, zero_for_one) else {
                    return Err(ReplayError::SwapNonTermination {
                        ceiling: MAX_SWAP_ITERATIONS,
                    });
                };
                trace!(tick, next, "no active coverage, skipping to next boundary");
                let delta = cross_boundary_delta(pool, next, zero_for_one);
                pool.state.liquidity += delta;
                tick = next;
                p = math::sqrt_price_of(tick);
                continue;
            }
        }

        // CheckReserves.
        let l: f64 = active_ids
            .iter()
            .filter_map(|id| pool.positions.get(*id))
            .map(|pos| pos.last_l)
            .sum();

        if l <= 0.0 {
            warn!(remaining, "out of active liquidity, stopping with leftover input");
            break;
        }

        let next_boundary = find_next_boundary(&boundaries, tick, zero_for_one);
        let reserves_to_boundary = next_boundary.map(|b| {
            let boundary_price = math::sqrt_price_of(b);
            if zero_for_one {
                math::amount0(boundary_price, p, l)
            } else {
                math::amount1(p, boundary_price, l)
            }
        });

        match (next_boundary, reserves_to_boundary) {
            (Some(boundary), Some(needed)) if needed <= remaining => {
                // CrossBoundary.
                let fee_in_range = math::round_half_even(needed / (1.0 - fee_rate) - needed, 0);
                distribute(pool, &active_ids, fee_in_range, l, fee_side);
                total_fee += fee_in_range;
                remaining -= needed;

                let delta = cross_boundary_delta(pool, boundary, zero_for_one);
                pool.state.liquidity += delta;
                tick = boundary;
                p = math::sqrt_price_of(boundary);

                trace!(tick, needed, fee_in_range, "crossed tick boundary");
            }
            _ => {
                // CommitState (terminal step): remaining input is absorbed
                // within the current range without reaching the next boundary.
                let p_next = math::next_sqrt_price(p, l, remaining, zero_for_one);
                let fee_in_range = math::round_half_even(remaining / (1.0 - fee_rate) - remaining, 0);
                distribute(pool, &active_ids, fee_in_range, l, fee_side);
                total_fee += fee_in_range;

                trace!(p_next, remaining, fee_in_range, "swap terminated within range");

                p = p_next;
                tick = math::tick_of(p_next);
                remaining = 0.0;
            }
        }
    }

    pool.state.totalfee_mut(fee_side, total_fee);

    commit_state(pool, &event, p, tick, zero_for_one, options)?;
    pool.positions.refresh_holdings(pool.state.sqrt_price);
    pool.positions.touch_all(event.coords.clone());

    debug!(
        kind = "Swap",
        tick = pool.state.tick,
        sqrt_price = pool.state.sqrt_price,
        total_fee,
        "swap applied"
    );

    pool.log.push(PoolEvent::Swap(event));
    Ok(())
}

fn distribute(pool: &mut Pool, active_ids: &[crate::event::TokenId], fee_in_range: f64, l: f64, side: FeeSide) {
    if l <= 0.0 {
        return;
    }
    let fee_per_l = fee_in_range / l;
    pool.positions.distribute_fees(active_ids, fee_per_l, side);
}

fn classify_direction(amount0: f64, amount1: f64) -> Result<bool> {
    let zero_in = amount0 > 0.0;
    let one_in = amount1 > 0.0;
    match (zero_in, one_in) {
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        _ => Err(ReplayError::SwapAmountError { amount0, amount1 }),
    }
}

fn find_next_boundary(boundaries: &std::collections::BTreeSet<i32>, tick: i32, zero_for_one: bool) -> Option<i32> {
    if zero_for_one {
        boundaries.range(..tick).next_back().copied()
    } else {
        boundaries.range(tick + 1..).next().copied()
    }
}

fn cross_boundary_delta(pool: &Pool, boundary: i32, zero_for_one: bool) -> f64 {
    let lower_l: f64 = pool
        .positions
        .active_pinned_at_tick_lower(boundary)
        .iter()
        .filter_map(|id| pool.positions.get(*id))
        .map(|p| p.last_l)
        .sum();
    let upper_l: f64 = pool
        .positions
        .active_pinned_at_tick_upper(boundary)
        .iter()
        .filter_map(|id| pool.positions.get(*id))
        .map(|p| p.last_l)
        .sum();

    if zero_for_one {
        // Price decreasing: leaving the range below tick_lower, entering from above tick_upper.
        upper_l - lower_l
    } else {
        // Price increasing: entering from below tick_lower, leaving above tick_upper.
        lower_l - upper_l
    }
}

/// Commits `sqrtPrice`/`tick`/`liquidity` to `pool.state`, reconciling against
/// whatever the event reported per §4.5's post-step rules.
fn commit_state(
    pool: &mut Pool,
    event: &SwapEvent,
    computed_sqrt_price: f64,
    computed_tick: i32,
    zero_for_one: bool,
    options: &SwapOptions,
) -> Result<()> {
    let reported_tick = event.tick;
    let reported_sqrt_price = event.sqrt_price_x96.map(math::sqrt_price_x96_to_sqrt_price);
    let reported_liquidity = event.liquidity;

    if reported_tick.is_none() && reported_sqrt_price.is_none() && reported_liquidity.is_none() {
        pool.state.sqrt_price = computed_sqrt_price;
        pool.state.tick = computed_tick;
        pool.state.liquidity = pool.positions.in_range_liquidity_directional(computed_tick, zero_for_one);
        return Ok(());
    }

    if options.pass_error {
        let tick = reported_tick.unwrap_or(computed_tick);
        pool.state.sqrt_price = reported_sqrt_price.unwrap_or(computed_sqrt_price);
        pool.state.tick = tick;
        pool.state.liquidity = pool.positions.in_range_liquidity_directional(tick, zero_for_one);
        return Ok(());
    }

    let computed_liquidity = pool.positions.in_range_liquidity_directional(computed_tick, zero_for_one);

    let mut mismatch: Option<ReplayError> = None;

    if let Some(rt) = reported_tick {
        if rt != computed_tick {
            let window = options.tolerance * 100.0;
            let diff = (rt - computed_tick).abs() as f64;
            if diff <= window {
                warn!(reported = rt, computed = computed_tick, "swap tick within tolerance window");
            } else {
                mismatch = Some(ReplayError::SwapMisalignment {
                    field: "tick",
                    reported: rt as f64,
                    computed: computed_tick as f64,
                });
            }
        } else if let Some(rl) = reported_liquidity {
            if rl != computed_liquidity {
                let ratio = if computed_liquidity.abs() < REMAINING_EPSILON {
                    1.0
                } else {
                    rl / computed_liquidity
                };
                if (1.0 - options.tolerance..=1.0 + options.tolerance).contains(&ratio) {
                    warn!(reported = rl, computed = computed_liquidity, "swap liquidity within tolerance window");
                } else {
                    mismatch = Some(ReplayError::SwapMisalignment {
                        field: "liquidity",
                        reported: rl,
                        computed: computed_liquidity,
                    });
                }
            }
        }
    }

    if let Some(err) = mismatch {
        if options.warn_all {
            warn!("{err}");
        } else {
            return Err(err);
        }
    }

    pool.state.sqrt_price = reported_sqrt_price.unwrap_or(computed_sqrt_price);
    pool.state.tick = reported_tick.unwrap_or(computed_tick);
    pool.state.liquidity = computed_liquidity;
    Ok(())
}
