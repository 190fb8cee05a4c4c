//! Price/tick math: pure functions between `sqrtPrice`, `tick`, `sqrtPriceX96`
//! and token amounts over a liquidity range.
//!
//! Grounded in `pools/cl_cpmm/cl_cpmm.py` (`sqrtPrice_to_tick`, `tick_to_sqrtPrice`,
//! `get_amount0`/`get_amount1`/`get_amounts`, `get_next_sqrtPrice_from_inputs`),
//! reshaped into free functions the way the reference crate's
//! `amms::amms::uniswap_v3` keeps its tick/price conversions as standalone
//! helpers rather than methods tangled into pool state. Floating point
//! throughout: bit-for-bit parity with the on-chain fixed-point math is a
//! non-goal.

use crate::consts::F64_2P96;

/// Converts a `sqrtPrice` to the tick it falls in, rounding to 6 decimals first
/// to absorb floating-point error near tick boundaries, then flooring.
pub fn tick_of(sqrt_price: f64) -> i32 {
    let raw = sqrt_price.ln() / 1.0001_f64.sqrt().ln();
    let rounded = round_to(raw, 6);
    rounded.floor() as i32
}

/// Same conversion, but truncates toward zero instead of flooring — matches the
/// on-chain rounding convention for signed ticks. Used only by comparison helpers,
/// never by the swap engine itself.
pub fn tick_of_toward_zero(sqrt_price: f64) -> i32 {
    let raw = sqrt_price.ln() / 1.0001_f64.sqrt().ln();
    let rounded = round_to(raw, 6);
    rounded.trunc() as i32
}

/// Converts a tick to its `sqrtPrice`.
pub fn sqrt_price_of(tick: i32) -> f64 {
    1.0001_f64.powf(tick as f64 / 2.0)
}

/// `sqrtPriceX96 -> sqrtPrice`.
pub fn sqrt_price_x96_to_sqrt_price(sqrt_price_x96: f64) -> f64 {
    sqrt_price_x96 / F64_2P96
}

/// `sqrtPrice -> sqrtPriceX96`.
pub fn sqrt_price_to_sqrt_price_x96(sqrt_price: f64) -> f64 {
    sqrt_price * F64_2P96
}

/// `(current_tick, tickLower, tickUpper)` for the tick-spacing-aligned range
/// containing `tick`.
pub fn tick_range(tick: i32, tick_spacing: i32) -> (i32, i32, i32) {
    let lower = tick.div_euclid(tick_spacing) * tick_spacing;
    (tick, lower, lower + tick_spacing)
}

fn order(a: f64, b: f64) -> (f64, f64) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 reserves for liquidity `l` over `[a, b]` (prices reordered internally).
pub fn amount0(a: f64, b: f64, l: f64) -> f64 {
    let (a, b) = order(a, b);
    l * ((1.0 / a) - (1.0 / b))
}

/// Token1 reserves for liquidity `l` over `[a, b]` (prices reordered internally).
pub fn amount1(a: f64, b: f64, l: f64) -> f64 {
    let (a, b) = order(a, b);
    l * (b - a)
}

/// Token0/token1 reserves for liquidity `l` over `[a, b]` at current price `p`.
pub fn amounts(p: f64, a: f64, b: f64, l: f64) -> (f64, f64) {
    let (a, b) = order(a, b);
    if p <= a {
        (amount0(a, b, l), 0.0)
    } else if p < b {
        (amount0(p, b, l), amount1(a, p, l))
    } else {
        (0.0, amount1(a, b, l))
    }
}

/// Next `sqrtPrice` after trading `delta_in` of the input token against liquidity `l`.
pub fn next_sqrt_price(sqrt_price: f64, l: f64, delta_in: f64, zero_for_one: bool) -> f64 {
    if zero_for_one {
        1.0 / ((delta_in / l) + (1.0 / sqrt_price))
    } else {
        sqrt_price + (delta_in / l)
    }
}

/// Liquidity implied by a token0 amount over `[a, b]`.
pub fn l_from_amount0(delta: f64, a: f64, b: f64) -> f64 {
    let (a, b) = order(a, b);
    delta / ((1.0 / a) - (1.0 / b))
}

/// Liquidity implied by a token1 amount over `[a, b]`.
pub fn l_from_amount1(delta: f64, a: f64, b: f64) -> f64 {
    let (a, b) = order(a, b);
    delta / (b - a)
}

/// Liquidity implied by both token amounts given the current price, taking the
/// binding (minimum) side and flooring to an integer amount of liquidity.
pub fn l_from_amounts(delta0: f64, delta1: f64, p: f64, a: f64, b: f64) -> f64 {
    let l0 = l_from_amount0(delta0, p, b);
    let l1 = l_from_amount1(delta1, a, p);
    l0.min(l1).floor()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Rounds to `decimals` places with ties resolved to the nearest even digit,
/// matching Python's builtin `round()` rather than `f64::round()`'s
/// round-half-away-from-zero. Used where the source computes a fee with a
/// literal `round(...)` call whose tie-breaking behavior is part of the
/// algorithm, not incidental floating-point noise.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let scaled = value * scale;
    let floor = scaled.floor();
    let fraction = scaled - floor;

    let rounded = if fraction < 0.5 {
        floor
    } else if fraction > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };

    rounded / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tick_of_round_trips_sqrt_price_of() {
        for t in [-120_000, -887, -60, -1, 0, 1, 60, 887, 120_000] {
            assert_eq!(tick_of(sqrt_price_of(t)), t, "tick {t} did not round-trip");
        }
    }

    #[test]
    fn sqrt_price_x96_round_trip() {
        for t in [-60_000, -60, 0, 60, 60_000] {
            let p = sqrt_price_of(t);
            let x96 = sqrt_price_to_sqrt_price_x96(p);
            assert_relative_eq!(sqrt_price_x96_to_sqrt_price(x96), p, max_relative = 1e-12);
        }
    }

    #[test]
    fn amount0_round_trips_l_from_amount0() {
        let a = sqrt_price_of(-600);
        let b = sqrt_price_of(600);
        let delta = 12_345.678;
        let l = l_from_amount0(delta, a, b);
        assert_relative_eq!(amount0(a, b, l), delta, max_relative = 1e-9);
    }

    #[test]
    fn amount1_round_trips_l_from_amount1() {
        let a = sqrt_price_of(-600);
        let b = sqrt_price_of(600);
        let delta = 987.654;
        let l = l_from_amount1(delta, a, b);
        assert_relative_eq!(amount1(a, b, l), delta, max_relative = 1e-9);
    }

    #[test]
    fn amounts_below_range_is_all_token0() {
        let a = sqrt_price_of(0);
        let b = sqrt_price_of(600);
        let p = sqrt_price_of(-600);
        let (a0, a1) = amounts(p, a, b, 1_000_000.0);
        assert!(a0 > 0.0);
        assert_eq!(a1, 0.0);
    }

    #[test]
    fn amounts_above_range_is_all_token1() {
        let a = sqrt_price_of(-600);
        let b = sqrt_price_of(0);
        let p = sqrt_price_of(600);
        let (a0, a1) = amounts(p, a, b, 1_000_000.0);
        assert_eq!(a0, 0.0);
        assert!(a1 > 0.0);
    }

    #[test]
    fn amounts_in_range_is_both_tokens() {
        let a = sqrt_price_of(-600);
        let b = sqrt_price_of(600);
        let p = sqrt_price_of(0);
        let (a0, a1) = amounts(p, a, b, 1_000_000.0);
        assert!(a0 > 0.0);
        assert!(a1 > 0.0);
    }

    #[test]
    fn next_sqrt_price_zero_for_one_decreases_price() {
        let p = sqrt_price_of(0);
        let next = next_sqrt_price(p, 1_000_000.0, 1000.0, true);
        assert!(next < p);
    }

    #[test]
    fn next_sqrt_price_one_for_zero_increases_price() {
        let p = sqrt_price_of(0);
        let next = next_sqrt_price(p, 1_000_000.0, 1000.0, false);
        assert!(next > p);
    }

    #[test]
    fn tick_range_aligns_to_spacing() {
        assert_eq!(tick_range(125, 60), (125, 120, 180));
        assert_eq!(tick_range(-125, 60), (-125, -180, -120));
        assert_eq!(tick_range(0, 60), (0, 0, 60));
    }

    #[test]
    fn round_half_even_breaks_ties_to_even_digit() {
        assert_eq!(round_half_even(0.5, 0), 0.0);
        assert_eq!(round_half_even(1.5, 0), 2.0);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(-0.5, 0), 0.0);
        assert_eq!(round_half_even(-1.5, 0), -2.0);
    }

    #[test]
    fn round_half_even_rounds_clear_cases_normally() {
        assert_eq!(round_half_even(1.2, 0), 1.0);
        assert_eq!(round_half_even(1.8, 0), 2.0);
    }
}
