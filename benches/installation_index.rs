use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kotor_core::installation::{Installation, DEFAULT_SEARCH_ORDER};
use kotor_core::resource_type::ResourceType;
use std::fs;

fn build_install(root: &std::path::Path, entry_count: usize) {
    let override_dir = root.join("override");
    fs::create_dir_all(&override_dir).unwrap();
    for i in 0..entry_count {
        fs::write(override_dir.join(format!("item{i}.uti")), b"item-bytes").unwrap();
    }
}

fn benchmark_installation_index(c: &mut Criterion) {
    let root = std::env::temp_dir().join(format!("kotor-core-bench-install-{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    build_install(&root, 2_000);

    c.bench_function("installation_load", |b| {
        b.iter(|| black_box(Installation::load(black_box(&root)).unwrap()))
    });

    let installation = Installation::load(&root).unwrap();
    c.bench_function("installation_resource_lookup", |b| {
        b.iter(|| {
            black_box(
                installation
                    .resource(black_box("item1000"), ResourceType::Uti, DEFAULT_SEARCH_ORDER)
                    .unwrap(),
            )
        })
    });

    fs::remove_dir_all(&root).unwrap();
}

criterion_group!(benches, benchmark_installation_index);
criterion_main!(benches);
