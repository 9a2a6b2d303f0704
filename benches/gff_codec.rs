use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kotor_core::gff::{read, write, GffFieldValue, GffStruct};

fn build_struct(width: usize) -> GffStruct {
    let mut root = GffStruct::new(0xffff_ffff);
    for i in 0..width {
        root.set(&format!("Field{i}"), GffFieldValue::Int32(i as i32));
    }
    root
}

fn benchmark_gff_round_trip(c: &mut Criterion) {
    let root = build_struct(64);
    let bytes = write(&root, "UTC ").unwrap();

    let mut group = c.benchmark_group("gff_codec");
    group.bench_function("write", |b| {
        b.iter(|| black_box(write(black_box(&root), "UTC ").unwrap()))
    });
    group.bench_function("read", |b| {
        b.iter(|| black_box(read(black_box(&bytes), Some("UTC ")).unwrap()))
    });
}

criterion_group!(benches, benchmark_gff_round_trip);
criterion_main!(benches);
