//! Event inputs and the append-only event log.
//!
//! The original implementation keeps four heterogeneous per-kind tables
//! (`mints`, `burns`, `collects`, `swaps`). The redesign note in `DESIGN.md`
//! replaces that with a single tagged-variant sequence, the way the reference
//! crate models on-chain events as one `IUniswapV3PoolEvents` sum type
//! (`amms::amms::uniswap_v3::mod.rs`) rather than per-kind collections.

use serde::{Deserialize, Serialize};

/// Opaque identifier for tokens, pool addresses, senders, owners and recipients.
/// The core never interprets these beyond equality — no EVM `Address` type is
/// needed since the replay engine has no on-chain collaborator.
pub type Identifier = String;

/// NFT position-manager token id.
pub type TokenId = u64;

/// Coordinates identifying where an event was emitted, carried through so
/// positions can record the first/most-recent touch per the data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCoords {
    pub log_index: u64,
    pub block_number: u64,
    pub transaction_index: u64,
    pub transaction_hash: Identifier,
}

/// One entry in the pool's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PoolEvent {
    Initialize(InitializeEvent),
    Mint(MintEvent),
    Burn(BurnEvent),
    Collect(CollectEvent),
    Swap(SwapEvent),
}

impl PoolEvent {
    pub fn coords(&self) -> Option<&EventCoords> {
        match self {
            PoolEvent::Initialize(_) => None,
            PoolEvent::Mint(e) => Some(&e.coords),
            PoolEvent::Burn(e) => Some(&e.coords),
            PoolEvent::Collect(e) => Some(&e.coords),
            PoolEvent::Swap(e) => Some(&e.coords),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PoolEvent::Initialize(_) => "Initialize",
            PoolEvent::Mint(_) => "Mint",
            PoolEvent::Burn(_) => "Burn",
            PoolEvent::Collect(_) => "Collect",
            PoolEvent::Swap(_) => "Swap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitializeEvent {
    pub sqrt_price: Option<f64>,
    pub sqrt_price_x96: Option<f64>,
    pub price: Option<f64>,
    pub tick: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintEvent {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: f64,
    pub amount0: f64,
    pub amount1: f64,
    pub sender: Identifier,
    pub token_id: TokenId,
    pub coords: EventCoords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnEvent {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: f64,
    pub amount0: f64,
    pub amount1: f64,
    pub owner: Identifier,
    pub token_id: TokenId,
    pub coords: EventCoords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectEvent {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: f64,
    pub amount1: f64,
    pub recipient: Identifier,
    pub token_id: TokenId,
    pub coords: EventCoords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub amount0: f64,
    pub amount1: f64,
    pub sender: Identifier,
    pub recipient: Identifier,
    pub sqrt_price_x96: Option<f64>,
    pub tick: Option<i32>,
    pub liquidity: Option<f64>,
    pub coords: EventCoords,
}
