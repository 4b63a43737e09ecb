use cfg_vault::core::cipher::{decrypt, encrypt, DerivedKey};
use cfg_vault::core::store::generate_address;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

const SIZES: [usize; 5] = [32, 256, 1024, 4096, 102_400];

/// Generate a payload of given size.
fn generate_payload(size: usize) -> Vec<u8> {
    vec![b'x'; size]
}

fn bench_key() -> DerivedKey {
    DerivedKey::from_signature(b"ssh-ed25519 signature bytes")
}

/// Benchmark encrypt/decrypt roundtrip with varying payload sizes.
fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_decrypt");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let key = bench_key();

    for size in SIZES {
        let payload = generate_payload(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(
            BenchmarkId::new("roundtrip", format!("{}B", size)),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let blob = encrypt(black_box(payload), black_box(&key)).unwrap();
                    let plain = decrypt(black_box(&blob), black_box(&key)).unwrap();
                    black_box(plain);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark decryption only with pre-encrypted data.
fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let key = bench_key();

    for size in SIZES {
        let blob = encrypt(&generate_payload(size), &key).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(
            BenchmarkId::new("aes256cbc", format!("{}B", size)),
            &blob,
            |b, blob| {
                b.iter(|| black_box(decrypt(black_box(blob), black_box(&key)).unwrap()));
            },
        );
    }

    group.finish();
}

/// Content addressing cost, paid on every template write.
fn bench_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("address");
    group.sample_size(50);

    for size in SIZES {
        let payload = generate_payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("sha256", format!("{}B", size)),
            &payload,
            |b, payload| b.iter(|| black_box(generate_address(black_box(payload)))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encrypt_decrypt, bench_decrypt, bench_address);
criterion_main!(benches);
