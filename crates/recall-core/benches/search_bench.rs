//! Vector-search benchmarks.
//!
//! Run with: cargo bench -p recall-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recall_core::embeddings::cosine_similarity;
use recall_core::search::{VectorIndex, VectorIndexConfig};

fn deterministic_vector(seed: usize, dims: usize) -> Vec<f32> {
    (0..dims).map(|j| ((seed * dims + j) as f32).sin()).collect()
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..1536).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..1536).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_1536d", |bencher| {
        bencher.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn bench_vector_index_add(c: &mut Criterion) {
    c.bench_function("vector_index_add_1000", |bencher| {
        bencher.iter(|| {
            let mut index = VectorIndex::with_config(VectorIndexConfig {
                dimensions: 1536,
                ..VectorIndexConfig::default()
            })
            .unwrap();
            for i in 0..1000 {
                index
                    .add(&format!("chunk-{i}"), &deterministic_vector(i, 1536))
                    .unwrap();
            }
            black_box(index.len());
        })
    });
}

fn bench_vector_index_search(c: &mut Criterion) {
    let mut index = VectorIndex::with_config(VectorIndexConfig {
        dimensions: 1536,
        ..VectorIndexConfig::default()
    })
    .unwrap();
    for i in 0..5000 {
        index
            .add(&format!("chunk-{i}"), &deterministic_vector(i, 1536))
            .unwrap();
    }
    let query = deterministic_vector(42, 1536);

    c.bench_function("vector_index_search_top5_of_5000", |bencher| {
        bencher.iter(|| {
            black_box(index.search(&query, 5).unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_vector_index_add,
    bench_vector_index_search,
);
criterion_main!(benches);
