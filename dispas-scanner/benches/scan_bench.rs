//! Criterion benchmarks for scanning: sequential slice scan vs. the parallel scanner.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dispas_core::types::Announcement;
use dispas_crypto::generate_identity_keys_with_rng;
use dispas_registry::{AnnouncementLog, MemoryAnnouncer};
use dispas_scanner::{scan, Scanner, ScannerConfig};
use dispas_stealth::{StealthPaymentBuilder, StealthWallet};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn announcements(count: usize, rng: &mut ChaCha20Rng) -> (StealthWallet, Vec<Announcement>) {
    let wallet = StealthWallet::from_keys(generate_identity_keys_with_rng(rng).unwrap());
    let other = generate_identity_keys_with_rng(rng).unwrap().meta_address();

    let anns = (0..count)
        .map(|i| {
            let meta = if i % 100 == 0 { wallet.meta_address() } else { other.clone() };
            StealthPaymentBuilder::new()
                .recipient(meta)
                .build_with_rng(rng)
                .unwrap()
                .announcement
        })
        .collect();
    (wallet, anns)
}

fn bench_sequential(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let (wallet, anns) = announcements(1_000, &mut rng);
    let keys = wallet.view_only();

    let mut g = c.benchmark_group("scan_sequential");
    g.throughput(Throughput::Elements(anns.len() as u64));
    g.bench_function("1000_announcements", |b| {
        b.iter(|| black_box(scan(&keys.viewing_secret, &keys.spending_public, &anns)));
    });
    g.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let (wallet, anns) = announcements(4_000, &mut rng);

    let log = Arc::new(MemoryAnnouncer::new());
    rt.block_on(async {
        for ann in anns {
            log.append(ann).await.unwrap();
        }
    });

    let mut g = c.benchmark_group("scan_parallel");
    g.throughput(Throughput::Elements(4_000));
    g.sample_size(20);
    for workers in [1usize, 2, 4, 8] {
        g.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let scanner = Scanner::with_config(
                    wallet.view_only(),
                    ScannerConfig::new().parallelism(workers),
                );
                rt.block_on(scanner.scan_window(log.clone(), 1, 4_000)).unwrap()
            });
        });
    }
    g.finish();
}

criterion_group!(benches, bench_sequential, bench_parallel);
criterion_main!(benches);
