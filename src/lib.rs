//! Deterministic off-chain replay engine for a concentrated-liquidity AMM
//! pool: given an ordered stream of `Initialize`/`Mint`/`Burn`/`Collect`/`Swap`
//! events, reconstructs pool price, in-range liquidity, and per-position
//! reserves and accrued swap fees.
//!
//! Floating-point throughout; bit-for-bit parity with on-chain fixed-point
//! math is a non-goal. Replay is single-threaded and assumes its input is
//! already ordered by `(blockNumber, transactionIndex, logIndex)`.

pub mod consts;
pub mod error;
pub mod event;
pub mod math;
pub mod pool;
pub mod position;
pub mod replay;
pub mod swap;

pub use error::{ReplayError, Result};
pub use event::{
    BurnEvent, CollectEvent, EventCoords, Identifier, InitializeEvent, MintEvent, PoolEvent, SwapEvent, TokenId,
};
pub use pool::{Pool, PoolParams, PoolState};
pub use position::{Position, PositionStore};
pub use replay::{replay, EventFailure, FailurePolicy, PositionSnapshot, ReplayReport};
pub use swap::{apply_swap, SwapOptions};
