//! Benchmarks for the inline request encoder and the reply decoder.
//!
//! Run benchmarks:
//! ```bash
//! cargo bench --bench codec_benchmark
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pipedis::command::{GET, MGET, SET};
use pipedis::proto::codec::{decode, encode, Encoder};
use tokio::runtime::Runtime;

/// Benchmark: encoding SET with different value sizes.
fn bench_encode_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_set");

    for size in [64, 1024, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let value = vec![b'x'; size];
            b.iter(|| encode(&SET, &[&b"bench:key"[..], black_box(value.as_slice())]).unwrap());
        });
    }

    group.finish();
}

/// Benchmark: batching many requests into one buffer.
fn bench_encode_batch(c: &mut Criterion) {
    c.bench_function("encode_batch_100_get", |b| {
        let mut encoder = Encoder::new();
        b.iter(|| {
            for _ in 0..100 {
                encoder.encode(&GET, &[black_box("bench:key")]).unwrap();
            }
            encoder.take()
        });
    });
}

/// Benchmark: decoding bulk replies of different sizes.
fn bench_decode_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_bulk");
    let rt = Runtime::new().unwrap();

    for size in [64, 1024, 16384].iter() {
        let mut reply = format!("${}\r\n", size).into_bytes();
        reply.extend(std::iter::repeat(b'x').take(*size));
        reply.extend_from_slice(b"\r\n");

        group.throughput(Throughput::Bytes(reply.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &reply, |b, reply| {
            b.to_async(&rt).iter(|| async move {
                let mut reader: &[u8] = black_box(reply);
                decode(&mut reader, &GET).await.unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark: decoding a multi-bulk reply.
fn bench_decode_multi_bulk(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut reply = b"*100\r\n".to_vec();
    for i in 0..100 {
        if i % 10 == 0 {
            reply.extend_from_slice(b"$-1\r\n");
        } else {
            reply.extend_from_slice(b"$8\r\nvalue:00\r\n");
        }
    }

    let reply = reply.as_slice();
    c.bench_function("decode_multi_bulk_100", |b| {
        b.to_async(&rt).iter(|| async move {
            let mut reader: &[u8] = black_box(reply);
            decode(&mut reader, &MGET).await.unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_encode_set,
    bench_encode_batch,
    bench_decode_bulk,
    bench_decode_multi_bulk
);
criterion_main!(benches);
