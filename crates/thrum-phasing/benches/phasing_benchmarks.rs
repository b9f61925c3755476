//! Phasing Benchmarks
//!
//! Rebalance and query cost for both policies across population sizes

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use thrum_core::time::SimTime;
use thrum_phasing::state::{PhaseStates, Phased};
use thrum_phasing::{BucketPhaser, BudgetPhaser, Phaser};

struct BenchEntity {
    states: PhaseStates,
}

impl BenchEntity {
    fn new() -> Self {
        Self {
            states: PhaseStates::new(),
        }
    }
}

impl Phased for BenchEntity {
    fn phase_states(&self) -> &PhaseStates {
        &self.states
    }

    fn phase_states_mut(&mut self) -> &mut PhaseStates {
        &mut self.states
    }
}

fn bucket_population(phaser: &BucketPhaser, count: usize) -> Vec<BenchEntity> {
    let mut entities: Vec<BenchEntity> = (0..count).map(|_| BenchEntity::new()).collect();
    for entity in entities.iter_mut() {
        phaser.register(entity);
    }
    entities
}

fn budget_population(phaser: &BudgetPhaser, count: usize) -> Vec<BenchEntity> {
    let mut entities: Vec<BenchEntity> = (0..count).map(|_| BenchEntity::new()).collect();
    for entity in entities.iter_mut() {
        phaser.register(entity);
    }
    entities
}

fn bench_bucket_rebalance(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_rebalance");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut phaser = BucketPhaser::new(8).unwrap();
            let mut entities = bucket_population(&phaser, count);
            b.iter(|| {
                phaser.rebalance(black_box(&mut entities), SimTime::ZERO);
            });
        });
    }

    group.finish();
}

fn bench_budget_rebalance(c: &mut Criterion) {
    let mut group = c.benchmark_group("budget_rebalance");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut phaser = BudgetPhaser::new(60).unwrap();
            let mut entities = budget_population(&phaser, count);
            let mut now_ms = 0u64;
            b.iter(|| {
                now_ms += 50;
                phaser.rebalance(black_box(&mut entities), SimTime::from_millis(now_ms));
            });
        });
    }

    group.finish();
}

fn bench_phase_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_query");

    group.bench_function("bucket", |b| {
        let phaser = BucketPhaser::new(8).unwrap();
        let mut entities = bucket_population(&phaser, 1);
        b.iter(|| black_box(phaser.phase(&mut entities[0], SimTime::ZERO)));
    });

    group.bench_function("budget", |b| {
        let phaser = BudgetPhaser::new(60).unwrap();
        let mut entities = budget_population(&phaser, 1);
        b.iter(|| black_box(phaser.phase(&mut entities[0], SimTime::from_millis(16))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bucket_rebalance,
    bench_budget_rebalance,
    bench_phase_query
);
criterion_main!(benches);
