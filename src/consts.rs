//! Shared scaling constants, grounded in the reference crate's `amms::consts`
//! (`F64_2P96`, `F64_FEE_ONE`) but trimmed to the handful this engine needs —
//! there is no U256 math here, so the rest of that file's constant table
//! doesn't apply.

/// `2^96`, the Q96 fixed-point scale on-chain `sqrtPriceX96` values use.
pub const F64_2P96: f64 = 79228162514264337593543950336.0;

/// Fee inputs arrive as integer parts-per-million; this converts to a rational in `[0, 1)`.
pub const F64_FEE_ONE: f64 = 1e6;

/// Default tolerance (as a fraction) for reconciling a swap's reported tick/liquidity
/// against the engine's own computation.
pub const DEFAULT_SWAP_TOLERANCE: f64 = 0.025;

/// Rounding residue the original implementation tolerated when a `Burn` drives a
/// position's liquidity slightly negative; see the frozen open question in `DESIGN.md`.
pub const BURN_NEGATIVE_LIQUIDITY_TOLERANCE: f64 = 8184.0;

/// Hard ceiling on tick-boundary crossings within a single swap, guarding against
/// a malformed event stream (e.g. a reported liquidity of zero) spinning forever.
pub const MAX_SWAP_ITERATIONS: u64 = 1_000_000;
