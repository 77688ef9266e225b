use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::DieLibrary;

fn bench_yield(c: &mut Criterion) {
    let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let lib = DieLibrary::with_default_dies(now).unwrap();
    let die = lib.all()[0].clone();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    c.bench_function("monte_carlo_1000", |b| {
        b.iter(|| sim_yield::simulate_defects(&die, 0.6, 1000, &mut rng).unwrap())
    });
    let wafer = sim_yield::WaferConfig::default();
    c.bench_function("wafer_300mm_10x10", |b| {
        b.iter(|| sim_yield::place_dies(&wafer, &mut rng).unwrap())
    });
}

criterion_group!(benches, bench_yield);
criterion_main!(benches);
