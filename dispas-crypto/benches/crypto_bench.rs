//! Criterion benchmarks for Dispas crypto: keygen, stealth derivation, recovery check, view tag.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dispas_core::{Address, SpendingKeyPair};
use dispas_crypto::{
    check_stealth_address, compute_view_tag, derive_stealth_address, derive_stealth_private_key,
    generate_identity_keys, generate_keypair, generate_stealth_address, EphemeralSecret,
};

fn bench_keygen(c: &mut Criterion) {
    let mut g = c.benchmark_group("keygen");
    g.throughput(Throughput::Elements(1));
    g.bench_function("generate_keypair", |b| {
        b.iter(|| black_box(generate_keypair::<dispas_core::Spending>().unwrap()));
    });
    g.finish();
}

fn bench_stealth_derivation(c: &mut Criterion) {
    let keys = generate_identity_keys().unwrap();
    let meta = keys.meta_address();
    let ephemeral = EphemeralSecret::random().unwrap();

    let mut g = c.benchmark_group("stealth_derivation");
    g.throughput(Throughput::Elements(1));
    g.bench_function("derive_stealth_address", |b| {
        b.iter(|| black_box(derive_stealth_address(&meta, &ephemeral)).unwrap());
    });
    g.bench_function("generate_stealth_address", |b| {
        b.iter(|| black_box(generate_stealth_address(&meta)).unwrap());
    });
    g.finish();
}

fn bench_recovery(c: &mut Criterion) {
    let keys = generate_identity_keys().unwrap();
    let stealth = generate_stealth_address(&keys.meta_address()).unwrap();

    let mut g = c.benchmark_group("recovery");
    g.throughput(Throughput::Elements(1));
    g.bench_function("check_match", |b| {
        b.iter(|| {
            black_box(check_stealth_address(
                &stealth.ephemeral_public_key,
                &keys.viewing.secret,
                &keys.spending.public,
                stealth.view_tag,
                &stealth.address,
            ))
            .unwrap()
        });
    });
    g.bench_function("check_view_tag_miss", |b| {
        b.iter(|| {
            black_box(check_stealth_address(
                &stealth.ephemeral_public_key,
                &keys.viewing.secret,
                &keys.spending.public,
                stealth.view_tag.wrapping_add(1),
                &Address::ZERO,
            ))
            .unwrap()
        });
    });
    g.bench_function("derive_stealth_private_key", |b| {
        b.iter(|| {
            black_box(derive_stealth_private_key(
                &keys.spending.secret,
                &keys.viewing.secret,
                &stealth.ephemeral_public_key,
            ))
            .unwrap()
        });
    });
    g.finish();
}

fn bench_view_tag(c: &mut Criterion) {
    let spending: SpendingKeyPair = generate_keypair().unwrap();
    let shared = spending.public.to_compressed();
    let mut g = c.benchmark_group("view_tag");
    g.throughput(Throughput::Elements(1));
    g.bench_function("compute_view_tag", |b| {
        b.iter(|| black_box(compute_view_tag(&shared)));
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_keygen,
    bench_stealth_derivation,
    bench_recovery,
    bench_view_tag
);
criterion_main!(benches);
