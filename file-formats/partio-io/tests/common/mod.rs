//! Common test utilities and fixtures

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use partio_data::{AttributeType, Particles};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// Create a temporary directory for tests
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Path of `name` inside `dir`
pub fn cache_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// Route codec diagnostics to the test output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Container with `position`, `velocity`, `mass` and `id` attributes
///
/// These four survive every format except PTC, which drops `id`.
pub fn sample_particles(seed: u64, count: usize) -> Particles {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut particles = Particles::new();
    let position = particles.add_attribute("position", AttributeType::Vector, 3);
    let velocity = particles.add_attribute("velocity", AttributeType::Vector, 3);
    let mass = particles.add_attribute("mass", AttributeType::Float, 1);
    let id = particles.add_attribute("id", AttributeType::Int, 1);
    for i in 0..count {
        let index = particles.add_particle();
        particles
            .data_write::<f32>(&position, index)
            .copy_from_slice(&[rng.random_range(-10.0..10.0), rng.random(), rng.random()]);
        particles
            .data_write::<f32>(&velocity, index)
            .copy_from_slice(&[rng.random(), -rng.random::<f32>(), 0.5]);
        particles.data_write::<f32>(&mass, index)[0] = rng.random_range(0.1..5.0);
        particles.data_write::<i32>(&id, index)[0] = i as i32 * 3 - 7;
    }
    particles
}

/// Assert that attribute `name` holds identical words in both containers
pub fn assert_same_attribute(expected: &Particles, actual: &Particles, name: &str) {
    let a = expected
        .attribute_info(name)
        .unwrap_or_else(|| panic!("expected container lacks '{name}'"));
    let b = actual
        .attribute_info(name)
        .unwrap_or_else(|| panic!("read container lacks '{name}'"));
    assert_eq!(a.count, b.count, "count of '{name}'");
    assert_eq!(
        expected.column::<u32>(&a).expect("expected column"),
        actual.column::<u32>(&b).expect("read column"),
        "values of '{name}'"
    );
}
