use std::sync::Arc;

use proptest::prelude::*;
use voxmesh_blocks::BlockStateTable;
use voxmesh_mesh_cpu::{CubeMesher, Mesher, MesherError};
use voxmesh_world::{BlockPos, Column, ColumnCoord, SectionCoord, World};

fn setup() -> (World, Arc<BlockStateTable>) {
    let table = Arc::new(BlockStateTable::builtin());
    let mut w = World::new(table.clone(), 16);
    w.insert_column(ColumnCoord::new(0, 0), Column::new(0, 2));
    (w, table)
}

fn id(t: &BlockStateTable, name: &str) -> u16 {
    t.id_by_name(name).unwrap()
}

fn quads(w: &World, t: &BlockStateTable, c: SectionCoord) -> usize {
    CubeMesher.mesh(c, w, t).unwrap().triangle_count() / 2
}

#[test]
fn lone_cube_has_six_faces() {
    let (mut w, t) = setup();
    w.set_block_state_id(BlockPos::new(5, 5, 5), id(&t, "stone"));
    let g = CubeMesher.mesh(SectionCoord::new(0, 0, 0), &w, &t).unwrap();
    assert_eq!(g.triangle_count(), 12);
    assert_eq!(g.vertex_count(), 24);
    assert_eq!(g.origin, [0, 0, 0]);
    assert_eq!(g.uvs.len(), 48);
}

#[test]
fn touching_cubes_share_no_face() {
    let (mut w, t) = setup();
    let stone = id(&t, "stone");
    w.set_block_state_id(BlockPos::new(5, 5, 5), stone);
    w.set_block_state_id(BlockPos::new(6, 5, 5), stone);
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 10);
}

#[test]
fn glass_hides_glass_but_not_stone() {
    let (mut w, t) = setup();
    let glass = id(&t, "glass");
    w.set_block_state_id(BlockPos::new(1, 1, 1), glass);
    w.set_block_state_id(BlockPos::new(1, 2, 1), glass);
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 10);
}

#[test]
fn slab_on_stone() {
    let (mut w, t) = setup();
    w.set_block_state_id(BlockPos::new(3, 3, 3), id(&t, "stone"));
    w.set_block_state_id(BlockPos::new(3, 4, 3), id(&t, "stone_slab"));
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 11);
}

#[test]
fn flower_is_two_double_sided_quads() {
    let (mut w, t) = setup();
    w.set_block_state_id(BlockPos::new(8, 0, 8), id(&t, "flower"));
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 4);
}

#[test]
fn neighbour_section_culls_boundary_face() {
    let (mut w, t) = setup();
    let stone = id(&t, "stone");
    w.insert_column(ColumnCoord::new(1, 0), Column::new(0, 1));
    w.set_block_state_id(BlockPos::new(15, 0, 0), stone);
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 6);
    w.set_block_state_id(BlockPos::new(16, 0, 0), stone);
    assert_eq!(quads(&w, &t, SectionCoord::new(0, 0, 0)), 5);
}

#[test]
fn air_section_is_empty_and_missing_section_errors() {
    let (mut w, t) = setup();
    w.set_block_state_id(BlockPos::new(0, 20, 0), id(&t, "stone"));
    w.set_block_state_id(BlockPos::new(0, 20, 0), 0);
    let g = CubeMesher.mesh(SectionCoord::new(0, 1, 0), &w, &t).unwrap();
    assert!(g.is_empty());
    assert!(matches!(
        CubeMesher.mesh(SectionCoord::new(0, 0, 0), &w, &t),
        Err(MesherError::MissingSection(_))
    ));
}

proptest! {
    // every emitted quad is complete and inside the section's cell range
    #[test]
    fn geometry_is_well_formed(blocks in prop::collection::vec((0i32..16, 0i32..16, 0i32..16, 0u16..7), 0..64)) {
        let (mut w, t) = setup();
        for (x, y, z, s) in blocks {
            w.set_block_state_id(BlockPos::new(x, y, z), s);
        }
        w.set_block_state_id(BlockPos::new(0, 0, 0), 1);
        let g = CubeMesher.mesh(SectionCoord::new(0, 0, 0), &w, &t).unwrap();
        prop_assert_eq!(g.positions.len(), g.normals.len());
        prop_assert_eq!(g.positions.len(), g.colors.len());
        prop_assert_eq!(g.uvs.len() / 2, g.vertex_count());
        prop_assert_eq!(g.indices.len() % 6, 0);
        prop_assert!(g.indices.iter().all(|&i| (i as usize) < g.vertex_count()));
        prop_assert!(g.positions.iter().all(|&p| (0.0..=16.0).contains(&p)));
    }
}
