use thiserror::Error;
use voxmesh_blocks::{AIR, BlockStateInfo, BlockStateTable, Face, Shape};
use voxmesh_geom::Vec3;
use voxmesh_world::{BlockPos, SectionCoord, WorldView};

use crate::geometry::SectionGeometry;

#[derive(Debug, Error)]
pub enum MesherError {
    #[error("section {0:?} is not loaded")]
    MissingSection(SectionCoord),
    #[error("{0}")]
    Other(String),
}

/// Builds geometry for one section. Implementations must not mutate the world.
pub trait Mesher: Send {
    fn mesh(
        &self,
        coord: SectionCoord,
        world: &dyn WorldView,
        table: &BlockStateTable,
    ) -> Result<SectionGeometry, MesherError>;
}

impl<F> Mesher for F
where
    F: Fn(SectionCoord, &dyn WorldView, &BlockStateTable) -> Result<SectionGeometry, MesherError>
        + Send,
{
    fn mesh(
        &self,
        coord: SectionCoord,
        world: &dyn WorldView,
        table: &BlockStateTable,
    ) -> Result<SectionGeometry, MesherError> {
        self(coord, world, table)
    }
}

/// Face-culling block mesher: one quad per exposed face, cross quads for plants.
#[derive(Clone, Copy, Debug, Default)]
pub struct CubeMesher;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

impl Mesher for CubeMesher {
    fn mesh(
        &self,
        coord: SectionCoord,
        world: &dyn WorldView,
        table: &BlockStateTable,
    ) -> Result<SectionGeometry, MesherError> {
        if !world.has_section(coord) {
            log::debug!(target: "mesher", "section {:?} not loaded; nothing to mesh", coord);
            return Err(MesherError::MissingSection(coord));
        }
        let origin = coord.origin();
        let base = BlockPos::new(origin[0], origin[1], origin[2]);
        let mut out = SectionGeometry::new(origin);
        for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    let pos = base.offset(x, y, z);
                    let state = world.state_at(pos).unwrap_or(AIR);
                    let info = table.lookup(state);
                    let rgb = tint_for(info, world, table, pos);
                    let local = Vec3::new(x as f32, y as f32, z as f32);
                    match info.shape {
                        Shape::Empty => {}
                        Shape::Cube => emit_box(&mut out, info, world, table, pos, local, 1.0, rgb),
                        Shape::Slab => emit_box(&mut out, info, world, table, pos, local, 0.5, rgb),
                        Shape::Cross => emit_cross(&mut out, info, table, local, rgb),
                    }
                }
            }
        }
        log::trace!(
            target: "mesher",
            "section {:?}: {} triangles",
            coord,
            out.triangle_count()
        );
        Ok(out)
    }
}

fn tint_for(
    info: &BlockStateInfo,
    world: &dyn WorldView,
    table: &BlockStateTable,
    pos: BlockPos,
) -> [f32; 3] {
    match info.tint {
        None => WHITE,
        Some(fallback) => match world.biome_at(pos) {
            Some(b) => table.biome(Some(b)).grass_tint,
            None => fallback,
        },
    }
}

fn face_hidden(
    info: &BlockStateInfo,
    world: &dyn WorldView,
    table: &BlockStateTable,
    pos: BlockPos,
    face: Face,
) -> bool {
    let (dx, dy, dz) = face.delta();
    let Some(nstate) = world.state_at(pos.offset(dx, dy, dz)) else {
        return false;
    };
    let neighbor = table.lookup(nstate);
    neighbor.is_cube() || (info.transparent && neighbor.id == info.id && neighbor.shape == info.shape)
}

#[allow(clippy::too_many_arguments)]
fn emit_box(
    out: &mut SectionGeometry,
    info: &BlockStateInfo,
    world: &dyn WorldView,
    table: &BlockStateTable,
    pos: BlockPos,
    p: Vec3,
    height: f32,
    rgb: [f32; 3],
) {
    let (x0, y0, z0) = (p.x, p.y, p.z);
    let (x1, y1, z1) = (p.x + 1.0, p.y + height, p.z + 1.0);
    for face in Face::ALL {
        // a slab's top face is inside its own cell and always visible
        let skip_check = height < 1.0 && face == Face::PosY;
        if !skip_check && face_hidden(info, world, table, pos, face) {
            continue;
        }
        let v = |x, y, z| Vec3::new(x, y, z);
        let corners = match face {
            Face::PosY => [v(x0, y1, z0), v(x1, y1, z0), v(x1, y1, z1), v(x0, y1, z1)],
            Face::NegY => [v(x0, y0, z0), v(x1, y0, z0), v(x1, y0, z1), v(x0, y0, z1)],
            Face::PosX => [v(x1, y0, z0), v(x1, y1, z0), v(x1, y1, z1), v(x1, y0, z1)],
            Face::NegX => [v(x0, y0, z0), v(x0, y1, z0), v(x0, y1, z1), v(x0, y0, z1)],
            Face::PosZ => [v(x0, y0, z1), v(x1, y0, z1), v(x1, y1, z1), v(x0, y1, z1)],
            Face::NegZ => [v(x0, y0, z0), v(x1, y0, z0), v(x1, y1, z0), v(x0, y1, z0)],
        };
        let [nx, ny, nz] = face.normal();
        let uv = table.tile_uv(info.texture(face));
        out.add_quad(corners, Vec3::new(nx, ny, nz), uv, rgb);
    }
}

fn emit_cross(
    out: &mut SectionGeometry,
    info: &BlockStateInfo,
    table: &BlockStateTable,
    p: Vec3,
    rgb: [f32; 3],
) {
    let uv = table.tile_uv(info.texture(Face::PosX));
    let v = |dx: f32, dy: f32, dz: f32| Vec3::new(p.x + dx, p.y + dy, p.z + dz);
    let diagonals = [
        (
            [v(0.0, 0.0, 0.0), v(1.0, 0.0, 1.0), v(1.0, 1.0, 1.0), v(0.0, 1.0, 0.0)],
            Vec3::new(1.0, 0.0, -1.0),
        ),
        (
            [v(1.0, 0.0, 0.0), v(0.0, 0.0, 1.0), v(0.0, 1.0, 1.0), v(1.0, 1.0, 0.0)],
            Vec3::new(1.0, 0.0, 1.0),
        ),
    ];
    for (corners, n) in diagonals {
        let n = n.normalized();
        out.add_quad(corners, n, uv, rgb);
        out.add_quad(corners, -n, uv, rgb);
    }
}
