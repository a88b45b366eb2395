use proptest::prelude::*;
use voxmesh_geom::{Aabb, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn vec3_arithmetic() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(-4.0, 5.0, -6.0);
    assert!(vec3_approx_eq(a + b, Vec3::new(-3.0, 7.0, -3.0), 1e-6));
    assert!(vec3_approx_eq((a + b) - a, b, 1e-6));
    assert!(vec3_approx_eq(-a, Vec3::new(-1.0, -2.0, -3.0), 1e-6));
    assert!(vec3_approx_eq((a * 2.0) / 2.0, a, 1e-6));
}

#[test]
fn vec3_cross_is_right_handed() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::UP;
    assert!(vec3_approx_eq(x.cross(y), Vec3::new(0.0, 0.0, 1.0), 1e-6));
}

#[test]
fn zero_vector_normalizes_to_itself() {
    assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
}

#[test]
fn aabb_from_points_empty_is_none() {
    assert!(Aabb::from_points(&[]).is_none());
}

#[test]
fn aabb_center_and_translate() {
    let bb = Aabb::new(Vec3::ZERO, Vec3::splat(16.0));
    assert_eq!(bb.center(), Vec3::splat(8.0));
    assert_eq!(bb.half_extents(), Vec3::splat(8.0));
    let moved = bb.translated(Vec3::new(16.0, -32.0, 0.0));
    assert_eq!(moved.min, Vec3::new(16.0, -32.0, 0.0));
    assert_eq!(moved.max, Vec3::new(32.0, -16.0, 16.0));
}

fn coord() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0
}

proptest! {
    // every input point lies within the computed bounds
    #[test]
    fn from_points_contains_all(points in prop::collection::vec((coord(), coord(), coord()), 1..64)) {
        let flat: Vec<f32> = points.iter().flat_map(|&(x, y, z)| [x, y, z]).collect();
        let bb = Aabb::from_points(&flat).unwrap();
        for &(x, y, z) in &points {
            prop_assert!(bb.contains_point(Vec3::new(x, y, z)));
        }
        prop_assert!(bb.min.x <= bb.max.x && bb.min.y <= bb.max.y && bb.min.z <= bb.max.z);
    }
}
