//! Common test utilities and fixtures

#![allow(dead_code)]

use partio_data::{AttributeType, ParticleAttribute, Particles};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Route container diagnostics to the test output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Uniformly random points in the unit cube
pub fn random_cloud(seed: u64, count: usize) -> Vec<[f32; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| [rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>()])
        .collect()
}

/// Container with a `position` attribute holding `points`
pub fn particles_from_points(points: &[[f32; 3]]) -> (Particles, ParticleAttribute) {
    let mut particles = Particles::new();
    let position = particles.add_attribute("position", AttributeType::Vector, 3);
    drop(particles.add_particles(points.len()));
    particles
        .column_mut::<f32>(&position)
        .expect("position column")
        .copy_from_slice(points.as_flattened());
    (particles, position)
}

/// Indices of points inside `[min, max]`, by exhaustive scan
pub fn brute_force_box(points: &[[f32; 3]], min: [f32; 3], max: [f32; 3]) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| (0..3).all(|a| p[a] >= min[a] && p[a] <= max[a]))
        .map(|(i, _)| i)
        .collect()
}

/// Squared distances to `center` strictly within `max_radius`, ascending
pub fn brute_force_distances(points: &[[f32; 3]], center: [f32; 3], max_radius: f32) -> Vec<f32> {
    let mut distances: Vec<f32> = points
        .iter()
        .map(|p| distance_squared(*p, center))
        .filter(|&d| d < max_radius * max_radius)
        .collect();
    distances.sort_by(f32::total_cmp);
    distances
}

/// Squared Euclidean distance
pub fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}
