//! Flattened scenes and grids written through the codecs

use glam::{DMat4, DVec3, IVec3, Mat4, Vec3};
use partio_data::AttributeType;
use partio_io::interchange::{
    GeometryScope, LeafAttribute, LeafValues, PointGrid, PointLeaf, PointSample, Property,
    PropertyValues, SceneNode, flatten_grids, flatten_scene,
};

use crate::common::{cache_path, temp_dir};

#[test]
fn test_scene_to_bgeo() {
    let crowd = PointSample {
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        ids: Some(vec![10, 11, 12]),
        properties: vec![Property {
            name: "team".into(),
            scope: GeometryScope::Vertex,
            extent: 1,
            interpretation: None,
            values: PropertyValues::Str {
                values: vec!["red".into(), "blue".into(), "red".into()],
                indices: None,
            },
        }],
        ..PointSample::default()
    };
    let root = SceneNode::transform(
        "offset",
        Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)),
        true,
        vec![SceneNode::points("crowd", crowd)],
    );
    let particles = flatten_scene(&root, false).expect("flatten");

    let dir = temp_dir();
    let path = cache_path(dir.path(), "crowd.bgeo");
    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");

    let position = read.attribute_info("position").unwrap();
    assert_eq!(read.data::<f32>(&position, 1), &[1.0, 0.0, 4.0]);
    let team = read.attribute_info("team").unwrap();
    assert_eq!(team.attr_type, AttributeType::IndexedStr);
    assert_eq!(read.indexed_strs(&team), ["red", "blue"]);
    assert_eq!(read.column::<i32>(&team).unwrap(), &[0, 1, 0]);
    let id = read.attribute_info("id").unwrap();
    assert_eq!(read.column::<i32>(&id).unwrap(), &[10, 11, 12]);
}

#[test]
fn test_grids_to_prt() {
    let leaf = |base: i32, n: usize| PointLeaf {
        voxels: (0..n).map(|i| IVec3::new(base + i as i32, 0, 0)).collect(),
        attributes: vec![
            LeafAttribute {
                name: "P".into(),
                tuple_size: 3,
                position_range: true,
                values: LeafValues::Vec3Double(vec![[0.25, 0.0, 0.0]; n]),
            },
            LeafAttribute {
                name: "pscale".into(),
                tuple_size: 1,
                position_range: false,
                values: LeafValues::Double(vec![0.5; n]),
            },
        ],
    };
    let grid = PointGrid {
        name: "sand".into(),
        transform: DMat4::from_translation(DVec3::new(0.0, 1.0, 0.0)),
        leaves: (0..8).map(|i| leaf(i * 100, 50)).collect(),
    };
    let particles = flatten_grids(&[grid], false).expect("flatten");
    assert_eq!(particles.num_particles(), 400);

    let dir = temp_dir();
    let path = cache_path(dir.path(), "sand.prt");
    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");

    let position = read.attribute_info("position").unwrap();
    assert_eq!(read.data::<f32>(&position, 51), &[101.25, 1.0, 0.0]);
    let width = read.attribute_info("width").unwrap();
    assert!(read.column::<f32>(&width).unwrap().iter().all(|&w| w == 0.5));
}
