//! Concurrent index builds and read-only queries

use crate::common::{init_logging, particles_from_points, random_cloud};
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_sort_and_query() {
    init_logging();
    let points = random_cloud(7, 2000);
    let (particles, _) = particles_from_points(&points);
    let particles = Arc::new(particles);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let particles = Arc::clone(&particles);
            thread::spawn(move || {
                particles.sort();
                let mut found = Vec::new();
                particles.find_points([0.0; 3], [1.0; 3], &mut found);
                found.len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked"), 2000);
    }
    assert!(particles.has_spatial_index());
}

#[test]
fn test_release_consumes_container() {
    let (particles, _) = particles_from_points(&random_cloud(1, 10));
    particles.sort();
    particles.release();
}
