use bzip2::write::BzEncoder;
use bzip2::Compression;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pbzip2::scanner::MagicScanner;
use std::io::Write;

fn compress(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::best());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn bench_scanner(c: &mut Criterion) {
    let scanner = MagicScanner::new();
    let mut group = c.benchmark_group("scanner");

    for size_mb in [1usize, 5, 10] {
        let payload: Vec<u8> = (0..(size_mb * 1_000_000)).map(|i| (i % 251) as u8).collect();
        let data = compress(&payload);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size_mb}MB")),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut pos = 0u64;
                    let mut count = 0;
                    while let Some((bit, _)) = scanner.find_from(data, pos) {
                        count += 1;
                        pos = bit + 1;
                    }
                    count
                })
            },
        );
    }

    group.finish();
}

fn bench_scanner_multistream(c: &mut Criterion) {
    let payload: Vec<u8> = (0..2_000_000u32).map(|i| (i % 97) as u8).collect();
    let mut data = Vec::new();
    for _ in 0..5 {
        data.extend_from_slice(&compress(&payload));
    }

    let scanner = MagicScanner::new();
    let mut group = c.benchmark_group("scanner_multistream");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("scan_multistream", |b| {
        b.iter(|| {
            let mut pos = 0u64;
            let mut count = 0;
            while let Some((bit, _)) = scanner.find_from(&data, pos) {
                count += 1;
                pos = bit + 1;
            }
            count
        })
    });

    group.finish();
}

criterion_group!(benches, bench_scanner, bench_scanner_multistream);
criterion_main!(benches);
