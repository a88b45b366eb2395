use proptest::prelude::*;
use voxmesh_blocks::{BlockStateTable, Face, Shape};

#[test]
fn builtin_has_air_and_stone() {
    let t = BlockStateTable::builtin();
    assert!(t.lookup(0).is_air());
    let stone = t.id_by_name("stone").unwrap();
    assert!(t.lookup(stone).is_cube());
    assert_eq!(t.lookup(t.id_by_name("flower").unwrap()).shape, Shape::Cross);
    assert!(!t.lookup(t.id_by_name("glass").unwrap()).is_cube());
}

#[test]
fn grass_top_differs_from_side() {
    let t = BlockStateTable::builtin();
    let grass = t.lookup(t.id_by_name("grass").unwrap());
    assert_ne!(grass.texture(Face::PosY), grass.texture(Face::PosX));
    assert!(grass.tint.is_some());
}

#[test]
fn bad_shape_is_an_error() {
    let s = r#"
[[states]]
name = "odd"
shape = "pyramid"
"#;
    assert!(BlockStateTable::from_toml_str(s).is_err());
}

#[test]
fn missing_unknown_state_is_an_error() {
    let s = r#"
unknown_state = "nope"
[[states]]
name = "stone"
"#;
    assert!(BlockStateTable::from_toml_str(s).is_err());
}

#[test]
fn non_air_at_zero_is_rejected() {
    let s = r#"
[[states]]
name = "stone"
id = 0
"#;
    assert!(BlockStateTable::from_toml_str(s).is_err());
}

proptest! {
    #[test]
    fn lookup_is_total(id in any::<u16>()) {
        let t = BlockStateTable::builtin();
        let info = t.lookup(id);
        match t.get(id) {
            Some(s) => prop_assert_eq!(s, info),
            None => prop_assert!(info.is_air()),
        }
    }

    #[test]
    fn tile_uv_stays_in_unit_square(tile in 0u16..256) {
        let t = BlockStateTable::builtin();
        let [u0, v0, u1, v1] = t.tile_uv(tile);
        prop_assert!(u0 >= 0.0 && v0 >= 0.0 && u1 <= 1.0 + 1e-6 && v1 <= 1.0 + 1e-6);
        prop_assert!(u0 < u1 && v0 < v1);
    }
}
