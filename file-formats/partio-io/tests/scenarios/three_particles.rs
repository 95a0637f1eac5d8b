//! A tiny hand-checked cache written, read back and queried

use crate::common::{cache_path, temp_dir};
use partio_data::{AttributeType, Particles};
use test_case::test_case;

fn three_particles() -> Particles {
    let mut particles = Particles::new();
    let position = particles.add_attribute("position", AttributeType::Vector, 3);
    let mass = particles.add_attribute("mass", AttributeType::Float, 1);
    let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
    for (i, p) in points.iter().enumerate() {
        let index = particles.add_particle();
        particles.data_write::<f32>(&position, index).copy_from_slice(p);
        particles.data_write::<f32>(&mass, index)[0] = (i + 1) as f32;
    }
    particles
}

#[test_case("three.prt" ; "prt")]
#[test_case("three.rpc" ; "rpc")]
#[test_case("three.bgeo.gz" ; "bgeo gz")]
fn test_three_particle_cache(name: &str) {
    let dir = temp_dir();
    let path = cache_path(dir.path(), name);
    partio_io::write(&path, &three_particles(), false).expect("write");

    let read = partio_io::read(&path).expect("read");
    assert_eq!(read.num_particles(), 3);
    let position = read.attribute_info("position").expect("position");
    assert_eq!(position.attr_type, AttributeType::Vector);
    assert_eq!(read.data::<f32>(&position, 2), &[0.0, 2.0, 0.0]);
    let mass = read.attribute_info("mass").expect("mass");
    assert_eq!(read.column::<f32>(&mass).unwrap(), &[1.0, 2.0, 3.0]);

    read.sort();
    let mut ids = Vec::new();
    let mut distances = Vec::new();
    read.find_n_points([0.9, 0.0, 0.0], 1, 10.0, &mut ids, &mut distances);
    assert_eq!(ids.len(), 1);
    assert_eq!(read.data::<f32>(&mass, ids[0]), &[2.0]);

    let mut boxed = Vec::new();
    read.find_points([-0.5, -0.5, -0.5], [1.5, 0.5, 0.5], &mut boxed);
    boxed.sort_unstable();
    let masses: Vec<f32> = boxed.iter().map(|&i| read.data::<f32>(&mass, i)[0]).collect();
    assert_eq!(masses, [1.0, 2.0]);
}
