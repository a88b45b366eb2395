use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use voxmesh_blocks::BlockStateTable;
use voxmesh_mesh_cpu::{CubeMesher, Mesher};
use voxmesh_world::{BlockPos, Column, ColumnCoord, SectionCoord, World};

fn bench_cube_mesher(c: &mut Criterion) {
    let mut group = c.benchmark_group("cube_mesher");
    let table = Arc::new(BlockStateTable::builtin());
    let mut world = World::new(table.clone(), 64);
    world.insert_column(ColumnCoord::new(0, 0), Column::new(0, 1));
    for x in 0..16 {
        for z in 0..16 {
            let h = 4 + ((x * 7 + z * 3) % 8);
            for y in 0..h {
                world.set_block_state_id(BlockPos::new(x, y, z), if y + 1 == h { 3 } else { 1 });
            }
        }
    }
    group.bench_function("hills_16", |b| {
        b.iter(|| {
            let out = CubeMesher.mesh(SectionCoord::new(0, 0, 0), &world, &table);
            black_box(out)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_cube_mesher);
criterion_main!(benches);
