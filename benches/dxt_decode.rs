use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kotor_encoding::codec::Codec;
use kotor_encoding::dxt::{DxtBlockCodec, DxtFormat};

fn benchmark_dxt1_block(c: &mut Criterion) {
    let pixels: Vec<u8> = (0..64u32).map(|i| (i * 4) as u8).collect();
    let encoded = DxtBlockCodec::encode(&pixels, &DxtFormat::Dxt1);

    let mut group = c.benchmark_group("dxt_decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("decode_dxt1_block", |b| {
        b.iter(|| black_box(DxtBlockCodec::decode(black_box(&encoded), &DxtFormat::Dxt1)))
    });
    group.bench_function("encode_dxt1_block", |b| {
        b.iter(|| black_box(DxtBlockCodec::encode(black_box(&pixels), &DxtFormat::Dxt1)))
    });
}

criterion_group!(benches, benchmark_dxt1_block);
criterion_main!(benches);
