//! CPU meshing: section geometry payload and the face-culling cube mesher.
#![forbid(unsafe_code)]

mod geometry;
mod mesher;

pub use geometry::SectionGeometry;
pub use mesher::{CubeMesher, Mesher, MesherError};
