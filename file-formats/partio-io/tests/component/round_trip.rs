//! File round trips for every format, plain and gzip-wrapped

use crate::common::{assert_same_attribute, cache_path, init_logging, sample_particles, temp_dir};
use test_case::test_case;

#[test_case("cache.bgeo" ; "bgeo")]
#[test_case("cache.bgeo.gz" ; "bgeo gz")]
#[test_case("cache.geo" ; "geo")]
#[test_case("cache.geo.gz" ; "geo gz")]
#[test_case("cache.prt" ; "prt")]
#[test_case("cache.rpc" ; "rpc")]
#[test_case("cache.pdb" ; "pdb")]
#[test_case("cache.pdb.gz" ; "pdb gz")]
#[test_case("cache.pda" ; "pda")]
#[test_case("cache.icecache" ; "icecache")]
#[test_case("cache.icecache.gz" ; "icecache gz")]
fn test_round_trip_preserves_values(name: &str) {
    init_logging();
    let dir = temp_dir();
    let path = cache_path(dir.path(), name);
    let particles = sample_particles(7, 250);

    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");

    assert_eq!(read.num_particles(), 250);
    for attr in ["position", "velocity", "mass", "id"] {
        assert_same_attribute(&particles, &read, attr);
    }
}

#[test]
fn test_ptc_round_trip_adds_implicit_attributes() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "cloud.ptc.gz");
    let particles = sample_particles(11, 40);

    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");

    assert_eq!(read.num_particles(), 40);
    for attr in ["position", "velocity", "mass"] {
        assert_same_attribute(&particles, &read, attr);
    }
    assert!(read.attribute_info("id").is_none());
    assert!(read.attribute_info("normal").is_some());
    let radius = read.attribute_info("radius").expect("radius");
    assert!(read.column::<f32>(&radius).unwrap().iter().all(|&r| r == 1.0));
}

#[test_case("empty.bgeo" ; "bgeo")]
#[test_case("empty.geo" ; "geo")]
#[test_case("empty.prt" ; "prt")]
#[test_case("empty.rpc" ; "rpc")]
#[test_case("empty.ptc" ; "ptc")]
#[test_case("empty.pdb" ; "pdb")]
#[test_case("empty.pda" ; "pda")]
#[test_case("empty.icecache" ; "icecache")]
fn test_empty_container_round_trip(name: &str) {
    let dir = temp_dir();
    let path = cache_path(dir.path(), name);
    let particles = sample_particles(1, 0);

    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");
    assert_eq!(read.num_particles(), 0);
    assert!(read.attribute_info("position").is_some());
}

#[test]
fn test_bgeo_indexed_strings_and_fixed_attributes() {
    use partio_data::AttributeType;

    let dir = temp_dir();
    let path = cache_path(dir.path(), "tagged.bgeo");
    let mut particles = sample_particles(3, 5);
    let state = particles.add_attribute("state", AttributeType::IndexedStr, 1);
    let alive = particles.register_indexed_str(&state, "alive").unwrap();
    let dead = particles.register_indexed_str(&state, "dead").unwrap();
    for index in 0..5 {
        particles.data_write::<i32>(&state, index)[0] = if index % 2 == 0 { alive } else { dead };
    }
    let frame = particles
        .try_add_fixed_attribute("frame", AttributeType::Int, 1)
        .unwrap();
    particles.fixed_data_write::<i32>(&frame).unwrap()[0] = 24;

    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");

    let state = read.attribute_info("state").expect("state");
    assert_eq!(state.attr_type, AttributeType::IndexedStr);
    assert_eq!(read.indexed_strs(&state), ["alive", "dead"]);
    assert_eq!(read.data::<i32>(&state, 3), &[dead]);
    let frame = read.fixed_attribute_info("frame").expect("frame");
    assert_eq!(read.fixed_data::<i32>(&frame).unwrap(), &[24]);
}
