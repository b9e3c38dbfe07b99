use cooprings_core::config::ProtocolConfig;
use cooprings_core::cooperation::derive_ring;
use cooprings_core::fractal::derive_plan;
use cooprings_core::hashing::{digest, sample};
use cooprings_core::ledger::CoinLedger;
use cooprings_data::Coin;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn ids(prefix: &str, n: usize) -> Vec<String> {
    let mut v: Vec<String> = (0..n).map(|i| format!("{prefix}-{i:06}")).collect();
    v.sort();
    v
}

fn bench_sample(c: &mut Criterion) {
    let pool = ids("ring", 2000);
    let seed = digest(&pool);

    c.bench_function("sample_500_of_2000", |b| {
        b.iter(|| black_box(sample(&pool, 500, seed)))
    });
}

fn bench_cooperation_ring(c: &mut Criterion) {
    let mut ledger = CoinLedger::new(3);
    for i in 0..3000u32 {
        ledger
            .insert_run(Coin {
                id: format!("coin-{i:06}"),
                amount: 1.0 + f64::from(i % 10),
                coin_type: i % 3,
                owner: "o".into(),
                bound_to: "o".into(),
                ..Coin::default()
            })
            .ok();
    }

    c.bench_function("derive_ring_1000_per_type", |b| {
        b.iter(|| black_box(derive_ring(&ledger).ok()))
    });
}

fn bench_fractal_plan(c: &mut Criterion) {
    let config = ProtocolConfig::default();
    let pool = ids("ring", 2500);
    let traders = ids("trader", 100);

    c.bench_function("derive_plan_default_bounds", |b| {
        b.iter(|| black_box(derive_plan(&pool, &traders, &config)))
    });
}

criterion_group!(
    benches,
    bench_sample,
    bench_cooperation_ring,
    bench_fractal_plan
);
criterion_main!(benches);
