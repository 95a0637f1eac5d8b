//! Caches large enough to cross chunk and stream boundaries

use partio_data::Particles;
use partio_io::ParticleFormat;
use proptest::prelude::*;

use crate::common::{assert_same_attribute, cache_path, sample_particles, temp_dir};

#[test]
fn test_icecache_spans_several_chunks() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "big.icecache");
    let particles = sample_particles(99, 9_001);
    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");
    for attr in ["position", "velocity", "mass", "id"] {
        assert_same_attribute(&particles, &read, attr);
    }
}

#[test]
fn test_prt_body_spans_many_inflate_chunks() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "big.prt.gz");
    let particles = sample_particles(100, 20_000);
    partio_io::write(&path, &particles, false).expect("write");
    let read = partio_io::read(&path).expect("read");
    assert_same_attribute(&particles, &read, "position");
    assert_same_attribute(&particles, &read, "id");
}

fn text_round_trip(format: ParticleFormat, particles: &Particles) -> Particles {
    let mut bytes = Vec::new();
    format.write_to(&mut bytes, particles).unwrap();
    format.read_from(bytes.as_slice(), false).unwrap()
}

proptest! {
    #[test]
    fn prop_ascii_formats_keep_exact_floats(
        values in prop::collection::vec(
            (prop::num::f32::NORMAL | prop::num::f32::ZERO, prop::num::f32::NORMAL, any::<i32>()),
            1..40,
        )
    ) {
        let mut particles = Particles::new();
        let position = particles.add_attribute("position", partio_data::AttributeType::Vector, 3);
        let mass = particles.add_attribute("mass", partio_data::AttributeType::Float, 1);
        let id = particles.add_attribute("id", partio_data::AttributeType::Int, 1);
        for (x, m, i) in &values {
            let index = particles.add_particle();
            particles.data_write::<f32>(&position, index).copy_from_slice(&[*x, -*x, 0.5]);
            particles.data_write::<f32>(&mass, index)[0] = *m;
            particles.data_write::<i32>(&id, index)[0] = *i;
        }

        for format in [ParticleFormat::Geo, ParticleFormat::Pda] {
            let read = text_round_trip(format, &particles);
            for name in ["position", "mass", "id"] {
                let a = particles.attribute_info(name).unwrap();
                let b = read.attribute_info(name).unwrap();
                prop_assert_eq!(
                    particles.column::<u32>(&a).unwrap(),
                    read.column::<u32>(&b).unwrap()
                );
            }
        }
    }
}
