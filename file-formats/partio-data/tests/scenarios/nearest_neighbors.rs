//! k-nearest queries over a random unit-cube cloud

use crate::common::{distance_squared, init_logging, particles_from_points, random_cloud};

#[test]
fn test_five_nearest_of_thousand_random_points() {
    init_logging();
    let points = random_cloud(0x5eed, 1000);
    let (particles, _) = particles_from_points(&points);
    particles.sort();

    let center = [0.5, 0.5, 0.5];
    let mut ids = Vec::new();
    let mut distances = Vec::new();
    particles.find_n_points(center, 5, 2.0, &mut ids, &mut distances);
    assert_eq!(ids.len(), 5);

    let mut all: Vec<f32> = points.iter().map(|p| distance_squared(*p, center)).collect();
    all.sort_by(f32::total_cmp);
    let fifth = all[4];
    for id in &ids {
        assert!(distance_squared(points[*id], center) <= fifth);
    }
}

#[test]
fn test_grid_neighbors_around_center() {
    let n = 9;
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let step = 1.0 / (n - 1) as f32;
                points.push([i as f32 * step, j as f32 * step, k as f32 * step]);
            }
        }
    }
    let (particles, position) = particles_from_points(&points);
    particles.sort();

    let neighbors = particles
        .find_n_points_within([0.51, 0.52, 0.53], 5, 0.15)
        .expect("index built");
    let mut found: Vec<Vec<f32>> = neighbors
        .indices
        .iter()
        .map(|&i| particles.data::<f32>(&position, i).to_vec())
        .collect();
    found.sort_by(|a, b| a.partial_cmp(b).expect("finite"));

    assert_eq!(
        found,
        vec![
            vec![0.375, 0.5, 0.5],
            vec![0.5, 0.5, 0.5],
            vec![0.5, 0.5, 0.625],
            vec![0.5, 0.625, 0.5],
            vec![0.625, 0.5, 0.5],
        ]
    );
    assert_eq!(neighbors.max_radius_squared, *neighbors.distances_squared.last().expect("five"));
}
