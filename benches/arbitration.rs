//! Benchmark harness using Criterion for arbitration throughput.
//!
//! Measures:
//! - Batch arbitration with no contention (everything accepted)
//! - Batch arbitration under heavy contention (most rejected)
//! - Accept/release round trips against a deep hierarchy

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plan_arbiter::{Arena, Command, LinkedQueue, ResourceArbiter, ResourceRequest};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const HIERARCHY: &str = "\
Bus 100.0 1.0 Sensor\n\
Sensor 100.0 0.5 Power\n\
Power 1000.0\n";

/// Generate a batch of commands contending for a handful of resources.
fn random_batch(rng: &mut ChaCha8Rng, count: usize, max_weight: f64) -> Vec<Command> {
    (0..count)
        .map(|i| {
            let name = ["Bus", "Sensor", "Power", "Arm"][rng.gen_range(0..4)];
            Command::with_resources(
                i as u64,
                format!("cmd-{i}"),
                vec![ResourceRequest::new(
                    name,
                    rng.gen_range(0..10),
                    rng.gen_range(0.0..max_weight),
                )],
            )
        })
        .collect()
}

fn run_batch(arbiter: &mut ResourceArbiter, batch: &[Command]) -> (u32, u32) {
    let mut arena: Arena<Command> = Arena::new(batch.len() as u32);
    let mut pending = LinkedQueue::new();
    let mut accepted = LinkedQueue::new();
    let mut rejected = LinkedQueue::new();

    for cmd in batch {
        let index = arena.alloc(cmd.clone()).expect("arena sized to batch");
        pending.push(&mut arena, index);
    }
    arbiter.arbitrate(&mut arena, &mut pending, &mut accepted, &mut rejected);
    let counts = (accepted.len(), rejected.len());

    // Release everything so the ledger does not grow across iterations
    while let Some(index) = accepted.pop(&mut arena) {
        let cmd = arena.get(index).clone();
        arbiter.release(&cmd);
    }
    counts
}

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbitrate_uncontended");
    for size in [16usize, 128, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let batch = random_batch(&mut rng, size, 0.002);
            let mut arbiter = ResourceArbiter::new();
            arbiter.load_hierarchy(HIERARCHY).unwrap();

            b.iter(|| black_box(run_batch(&mut arbiter, &batch)));
        });
    }
    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbitrate_contended");
    for size in [16usize, 128, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            // Weights large enough that most of the batch is rejected,
            // exercising the tally snapshot/rollback path.
            let batch = random_batch(&mut rng, size, 40.0);
            let mut arbiter = ResourceArbiter::new();
            arbiter.load_hierarchy(HIERARCHY).unwrap();

            b.iter(|| black_box(run_batch(&mut arbiter, &batch)));
        });
    }
    group.finish();
}

fn bench_release_round_trip(c: &mut Criterion) {
    c.bench_function("accept_release_round_trip", |b| {
        let mut arbiter = ResourceArbiter::new();
        arbiter.load_hierarchy(HIERARCHY).unwrap();
        let batch = vec![Command::with_resources(
            1,
            "sample",
            vec![ResourceRequest::new("Bus", 1, 1.0)],
        )];

        b.iter(|| black_box(run_batch(&mut arbiter, &batch)));
    });
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_contended,
    bench_release_round_trip
);
criterion_main!(benches);
