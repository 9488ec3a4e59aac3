//! Benchmark for hot economy paths.
//!
//! Rotation selection runs every time the lobby renders; level completion
//! runs once per level and includes the save record write.
//!
//! Run with: cargo bench --package cascade_economy --bench economy_benchmark

use std::sync::Arc;

use cascade_economy::{select_rotation, Economy, FixedClock, MemoryStorage, MS_PER_DAY};
use cascade_shared::{Currency, EconomyConfig, LevelResult};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn benchmark_rotation_selection(c: &mut Criterion) {
    let config = EconomyConfig::default();

    let mut group = c.benchmark_group("rotation");
    group.throughput(Throughput::Elements(1));
    group.bench_function("select_rotation", |b| {
        let mut now = 0_i64;
        b.iter(|| {
            now += MS_PER_DAY / 3;
            black_box(select_rotation(
                black_box(&config.mini_games),
                config.rotation.window_days,
                now,
            ))
        });
    });
    group.finish();
}

fn benchmark_level_complete(c: &mut Criterion) {
    let economy = Economy::open(
        EconomyConfig::default(),
        MemoryStorage::new(),
        Arc::new(FixedClock::new(0)),
    )
    .expect("default config is valid");

    let result = LevelResult::new(10, 3, true).with_powerups(1).with_combo(6);
    c.bench_function("on_level_complete", |b| {
        b.iter(|| {
            let paid = economy.on_level_complete(black_box(&result));
            economy.drain_events();
            black_box(paid)
        });
    });
}

fn benchmark_credit_debit(c: &mut Criterion) {
    let economy = Economy::open(
        EconomyConfig::default(),
        MemoryStorage::new(),
        Arc::new(FixedClock::new(0)),
    )
    .expect("default config is valid");
    let ledger = economy.ledger();

    c.bench_function("credit_then_debit", |b| {
        b.iter(|| {
            ledger.credit(Currency::Coins, black_box(25), "bench");
            black_box(ledger.debit(Currency::Coins, black_box(25), "bench"));
            economy.drain_events();
        });
    });
}

criterion_group!(
    benches,
    benchmark_rotation_selection,
    benchmark_level_complete,
    benchmark_credit_debit
);
criterion_main!(benches);
