// Key codec and rate arithmetic benchmarks.
//
// Covers password hashing, lookup-key derivation for short and long party
// ids, and native-to-currency conversion on both the narrow and 256-bit
// paths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use remit_protocol::math::mul_div_floor;
use remit_protocol::{derive_key, hash_password, ExchangeRate, PartyId};

fn bench_hash_password(c: &mut Criterion) {
    c.bench_function("codec/hash_password", |b| {
        b.iter(|| hash_password("correct horse battery staple"));
    });
}

fn bench_derive_key(c: &mut Criterion) {
    let sender_commitment = hash_password("sender-secret");
    let receiver_commitment = hash_password("receiver-secret");
    let mut group = c.benchmark_group("codec/derive_key");

    for len in [8usize, 64, 512] {
        let sender = PartyId::new("s".repeat(len)).unwrap();
        let receiver = PartyId::new("r".repeat(len)).unwrap();

        group.throughput(Throughput::Bytes((64 + 2 * len) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| derive_key(&sender_commitment, &receiver_commitment, &sender, &receiver));
        });
    }

    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("math/convert");

    let small: ExchangeRate = "2.5".parse().unwrap();
    group.bench_function("narrow", |b| {
        b.iter(|| small.convert(10_000).unwrap());
    });

    // Large enough that native * rate needs the wide product.
    let large = ExchangeRate::from_units(1_000_000).unwrap();
    group.bench_function("wide", |b| {
        b.iter(|| large.convert(u64::MAX as u128 * 1_000).unwrap());
    });

    group.bench_function("mul_div_floor", |b| {
        b.iter(|| mul_div_floor(u128::MAX / 3, u128::MAX / 5, u128::MAX / 7));
    });

    group.finish();
}

criterion_group!(benches, bench_hash_password, bench_derive_key, bench_convert);
criterion_main!(benches);
