use criterion::{Criterion, black_box, criterion_group, criterion_main};
use voxmesh_world::LruCache;

fn bench_lru(c: &mut Criterion) {
    c.bench_function("lru_get_hot", |b| {
        let mut cache = LruCache::new(1024);
        for k in 0..1024u32 {
            cache.insert(k, k);
        }
        let mut i = 0u32;
        b.iter(|| {
            i = (i + 7) % 1024;
            black_box(cache.get(&i).copied())
        })
    });

    c.bench_function("lru_insert_evict", |b| {
        let mut cache = LruCache::new(256);
        let mut k = 0u32;
        b.iter(|| {
            k = k.wrapping_add(1);
            black_box(cache.insert(k, k))
        })
    });
}

criterion_group!(benches, bench_lru);
criterion_main!(benches);
