use thiserror::Error;

/// Errors raised while replaying pool events.
///
/// The engine is a single subsystem (unlike the on-chain-facing tooling this
/// crate is modeled on, which aggregates a `*Error` enum per AMM variant), so
/// one flat enum covers every fatal condition named by the event handlers and
/// the swap engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("Initialize: need to supply one of sqrtPrice, sqrtPriceX96 or price")]
    IncorrectInput,

    #[error("Initialize: tick {supplied} does not match derived tick {derived} for the supplied price")]
    TickPriceMisalignment { supplied: i32, derived: i32 },

    #[error("Burn: tokenId {token_id} does not match exactly one active position ({matches} matches)")]
    BurnMintMismatch { token_id: u64, matches: usize },

    #[error("Swap: amounts are incorrect, exactly one of amount0/amount1 must be positive (got {amount0}, {amount1})")]
    SwapAmountError { amount0: f64, amount1: f64 },

    #[error("Swap: {field} provided does not match calculations: reported {reported}, computed {computed}")]
    SwapMisalignment {
        field: &'static str,
        reported: f64,
        computed: f64,
    },

    #[error("Collect: tokenId {token_id} does not match exactly one active position ({matches} matches)")]
    CollectMismatch { token_id: u64, matches: usize },

    #[error("Swap: fee distributed ({distributed}) does not reconcile with fee charged ({charged})")]
    FeeMismatch { charged: f64, distributed: f64 },

    #[error("Swap: traversal exceeded {ceiling} tick-boundary crossings without terminating")]
    SwapNonTermination { ceiling: u64 },
}

pub type Result<T> = std::result::Result<T, ReplayError>;
