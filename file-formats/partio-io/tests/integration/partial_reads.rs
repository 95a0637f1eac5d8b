//! Partial success: skipped channels and recovered trailing sections

use std::fs;

use crate::common::{cache_path, init_logging, sample_particles, temp_dir};
use partio_data::AttributeType;

#[test]
fn test_unwritable_attributes_are_skipped() {
    init_logging();
    let dir = temp_dir();
    let mut particles = sample_particles(8, 6);
    particles.add_attribute("label", AttributeType::IndexedStr, 1);
    particles.add_attribute("weights", AttributeType::Float, 7);

    for name in ["s.rpc", "s.pdb", "s.pda", "s.icecache", "s.ptc"] {
        let path = cache_path(dir.path(), name);
        partio_io::write(&path, &particles, false).expect(name);
        let read = partio_io::read(&path).expect(name);
        assert_eq!(read.num_particles(), 6, "{name}");
        assert!(read.attribute_info("label").is_none(), "{name}");
        assert!(read.attribute_info("weights").is_none(), "{name}");
        assert!(read.attribute_info("mass").is_some(), "{name}");
    }

    // PRT stores any float arity but has no string channels
    let path = cache_path(dir.path(), "s.prt");
    partio_io::write(&path, &particles, false).expect("prt");
    let read = partio_io::read(&path).expect("prt");
    assert!(read.attribute_info("label").is_none());
    assert_eq!(read.attribute_info("weights").map(|a| a.count), Some(7));
}

#[test]
fn test_pda_unknown_type_letter() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "odd.pda");
    fs::write(
        &path,
        "ATTRIBUTES\n position name mass\nTYPES\n V S R\nNUMBER_OF_PARTICLES: 1\n\
         BEGIN DATA\n1 2 3 bob 0.5\n",
    )
    .unwrap();

    let read = partio_io::read(&path).expect("read");
    assert!(read.attribute_info("name").is_none());
    let mass = read.attribute_info("mass").unwrap();
    assert_eq!(read.data::<f32>(&mass, 0), &[0.5]);
}

#[test]
fn test_bgeo_truncated_detail_section_keeps_points() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "cut.bgeo");
    let mut particles = sample_particles(8, 10);
    let frame = particles
        .try_add_fixed_attribute("frame", AttributeType::Float, 1)
        .unwrap();
    particles.fixed_data_write::<f32>(&frame).unwrap()[0] = 12.0;
    partio_io::write(&path, &particles, false).expect("write");

    // trailer (2 bytes) plus the detail value
    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 6);
    fs::write(&path, &bytes).unwrap();

    let read = partio_io::read(&path).expect("points survive");
    assert_eq!(read.num_particles(), 10);
    assert_eq!(read.num_fixed_attributes(), 0);
    crate::common::assert_same_attribute(&particles, &read, "velocity");
}
