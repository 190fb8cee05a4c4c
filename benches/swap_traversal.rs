//! Benchmarks the swap engine's per-tick-crossing cost, mirroring the
//! reference crate's `benches/uniswap_v3.rs` (a `criterion_group!`/
//! `criterion_main!` harness over a synthetically built pool).

use clamm_replay::{
    apply_swap, EventCoords, InitializeEvent, MintEvent, Pool, PoolParams, SwapEvent, SwapOptions,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn coords(i: u64) -> EventCoords {
    EventCoords {
        log_index: i,
        block_number: 1,
        transaction_index: 0,
        transaction_hash: "0xbench".into(),
    }
}

/// A pool with `n` adjacent, non-overlapping liquidity ranges straddling
/// price 1.0, so a large swap is forced to cross every boundary between them.
fn laddered_pool(n: i32) -> Pool {
    let mut pool = Pool::new(PoolParams {
        token0: "token0".into(),
        token1: "token1".into(),
        pool_address: "pool".into(),
        tick_spacing: 60,
        fee_ppm: 3000,
        protocol_fee_ppm: 0,
    });
    pool.initialize(InitializeEvent {
        sqrt_price: None,
        sqrt_price_x96: None,
        price: Some(1.0),
        tick: None,
    })
    .unwrap();

    for i in 0..n {
        let lower = (i - n / 2) * 60;
        let upper = lower + 60;
        pool.mint(MintEvent {
            tick_lower: lower,
            tick_upper: upper,
            amount: 1_000_000.0,
            amount0: 1.0,
            amount1: 1.0,
            sender: "lp".into(),
            token_id: i as u64 + 1,
            coords: coords(i as u64),
        })
        .unwrap();
    }

    pool
}

fn bench_swap_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("swap_traversal");
    for &n in &[4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut pool = laddered_pool(n as i32);
                let event = SwapEvent {
                    amount0: 10_000.0,
                    amount1: -9_000.0,
                    sender: "trader".into(),
                    recipient: "trader".into(),
                    sqrt_price_x96: None,
                    tick: None,
                    liquidity: None,
                    coords: coords(1_000),
                };
                apply_swap(&mut pool, event, &SwapOptions::default()).ok();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_swap_traversal);
criterion_main!(benches);
