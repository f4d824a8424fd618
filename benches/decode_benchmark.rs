use bzip2::write::BzEncoder;
use bzip2::Compression;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pbzip2::reader::Bz2Decoder;
use std::io::{Read, Write};
use std::sync::Arc;

fn compress(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::best());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let payload: Vec<u8> = (0..10_000_000u32).map(|i| (i % 251) as u8).collect();
    let compressed = Arc::new(compress(&payload));

    let mut group = c.benchmark_group("bzip2_decode");
    group.throughput(Throughput::Bytes(compressed.len() as u64));

    group.bench_function("pbzip2_pipeline", |b| {
        b.iter(|| {
            let mut decoder = Bz2Decoder::new(compressed.clone());
            let mut buffer = [0u8; 8192];
            while decoder.read(&mut buffer).unwrap() > 0 {}
        })
    });

    group.bench_function("bzip2_crate_single_threaded", |b| {
        b.iter(|| {
            let mut decoder = bzip2::read::BzDecoder::new(&compressed[..]);
            let mut buffer = [0u8; 8192];
            while decoder.read(&mut buffer).unwrap() > 0 {}
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
