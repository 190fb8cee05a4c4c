//! The replay driver: dispatches an ordered event stream to a `Pool`,
//! snapshotting every position after each event and compacting the result
//! down to the rows where something actually changed.
//!
//! Grounded in `replay_from_logs_for_LP_profit` in
//! `pools/cl_cpmm/cl_cpmm.py`, which re-reads its whole position table after
//! every event and then calls `drop_duplicates` on it; here that becomes an
//! explicit compaction step over a `Vec<PositionSnapshot>` instead of a
//! pandas frame, in the same "plain data, narrow methods" style the
//! reference crate favors over heavier abstractions.

use tracing::{error, warn};

use crate::error::ReplayError;
use crate::event::{EventCoords, PoolEvent};
use crate::pool::Pool;
use crate::position::Position;
use crate::swap::{apply_swap, SwapOptions};

/// A single event's outcome when it failed and replay was configured to
/// continue past it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFailure {
    pub event_index: usize,
    pub kind: &'static str,
    pub coords: Option<EventCoords>,
    pub error: ReplayError,
}

/// A position's full state immediately after the event at `event_index` was
/// applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub event_index: usize,
    pub position: Position,
}

/// Outcome of replaying an entire event stream.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub failures: Vec<EventFailure>,
    pub snapshots: Vec<PositionSnapshot>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Whether a failed event aborts the whole replay or is recorded and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    ContinuePastFailure,
}

/// Replays `events`, in the order given, against `pool`.
///
/// `FailurePolicy::Abort` returns the first error encountered, matching a
/// fatal condition in the original error taxonomy. `ContinuePastFailure`
/// records the failure and moves to the next event instead, useful for
/// auditing a log known to contain a handful of malformed entries.
pub fn replay(
    pool: &mut Pool,
    events: Vec<PoolEvent>,
    swap_options: &SwapOptions,
    policy: FailurePolicy,
) -> Result<ReplayReport, ReplayError> {
    let mut report = ReplayReport::default();

    for (index, event) in events.into_iter().enumerate() {
        let kind = event.kind();
        let coords = event.coords().cloned();

        let outcome = match event {
            PoolEvent::Initialize(e) => pool.initialize(e),
            PoolEvent::Mint(e) => pool.mint(e),
            PoolEvent::Burn(e) => pool.burn(e),
            PoolEvent::Collect(e) => pool.collect(e),
            PoolEvent::Swap(e) => apply_swap(pool, e, swap_options),
        };

        if let Err(err) = outcome {
            match policy {
                FailurePolicy::Abort => {
                    error!(event_index = index, kind, %err, "replay aborted");
                    return Err(err);
                }
                FailurePolicy::ContinuePastFailure => {
                    warn!(event_index = index, kind, %err, "event failed, continuing replay");
                    report.failures.push(EventFailure {
                        event_index: index,
                        kind,
                        coords,
                        error: err,
                    });
                    continue;
                }
            }
        }

        for position in pool.positions.iter() {
            report.snapshots.push(PositionSnapshot {
                event_index: index,
                position: position.clone(),
            });
        }
    }

    report.snapshots = compact(report.snapshots);
    Ok(report)
}

/// Fields that define a position's observable state, `start_coords`/`last_coords`
/// excluded since those change on every touch regardless of economic effect.
type EconomicFingerprint = (i32, i32, u64, u64, u64, u64, u64, u64, u64, u64, u64, u64, u64, u64, u64);

fn economic_fingerprint(p: &Position) -> EconomicFingerprint {
    (
        p.tick_lower,
        p.tick_upper,
        p.start_l.to_bits(),
        p.increase_l.to_bits(),
        p.last_l.to_bits(),
        p.start_token0_holdings.to_bits(),
        p.start_token1_holdings.to_bits(),
        p.increase_token0_holdings.to_bits(),
        p.increase_token1_holdings.to_bits(),
        p.last_token0_holdings.to_bits(),
        p.last_token1_holdings.to_bits(),
        p.token0_fees_accrued.to_bits(),
        p.token1_fees_accrued.to_bits(),
        p.token0_collected.to_bits(),
        p.token1_collected.to_bits(),
    )
}

/// Drops snapshots of a `tokenId` whose economic fields duplicate a
/// fingerprint already seen earlier for that `tokenId`, keeping the
/// earliest snapshot of every distinct state — the same subset-based
/// `keep='first'` semantics as the source's `drop_duplicates` call, not
/// just a consecutive-run dedup.
fn compact(snapshots: Vec<PositionSnapshot>) -> Vec<PositionSnapshot> {
    use std::collections::HashSet;

    let mut seen: HashSet<(u64, EconomicFingerprint)> = HashSet::new();
    let mut out = Vec::with_capacity(snapshots.len());

    for snap in snapshots {
        let fp = economic_fingerprint(&snap.position);
        let key = (snap.position.token_id, fp);
        if seen.insert(key) {
            out.push(snap);
        }
    }

    out
}
