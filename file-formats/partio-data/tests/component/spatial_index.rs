//! Spatial index agreement with exhaustive scans

use crate::common::{
    brute_force_box, brute_force_distances, distance_squared, particles_from_points,
};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = [f32; 3]> {
    [0.0f32..1.0, 0.0f32..1.0, 0.0f32..1.0]
}

proptest! {
    #[test]
    fn box_query_matches_scan(
        points in prop::collection::vec(point(), 0..400),
        a in point(),
        b in point(),
    ) {
        let (particles, _) = particles_from_points(&points);
        particles.sort();

        let min = [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])];
        let max = [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])];
        let mut found = Vec::new();
        particles.find_points(min, max, &mut found);
        found.sort_unstable();

        let mut deduped = found.clone();
        deduped.dedup();
        prop_assert_eq!(&deduped, &found);
        prop_assert_eq!(found, brute_force_box(&points, min, max));
    }

    #[test]
    fn nearest_query_matches_scan(
        points in prop::collection::vec(point(), 1..400),
        center in point(),
        k in 1usize..20,
        radius in 0.01f32..1.5,
    ) {
        let (particles, _) = particles_from_points(&points);
        particles.sort();

        let mut ids = Vec::new();
        let mut distances = Vec::new();
        let spanned = particles.find_n_points(center, k, radius, &mut ids, &mut distances);

        let expected: Vec<f32> = brute_force_distances(&points, center, radius)
            .into_iter()
            .take(k)
            .collect();
        prop_assert_eq!(&distances, &expected);
        prop_assert!(ids.len() <= k);
        for (id, d) in ids.iter().zip(&distances) {
            prop_assert_eq!(distance_squared(points[*id], center), *d);
        }
        if ids.len() == k {
            prop_assert_eq!(spanned, *distances.last().unwrap_or(&0.0));
        } else {
            prop_assert_eq!(spanned, radius * radius);
        }
    }
}

#[test]
fn test_stale_index_until_resorted() {
    let points = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
    let (mut particles, position) = particles_from_points(&points);
    particles.sort();

    particles.data_write::<f32>(&position, 0).copy_from_slice(&[5.0, 5.0, 5.0]);
    let mut found = Vec::new();
    particles.find_points([-0.5; 3], [0.5; 3], &mut found);
    assert_eq!(found, vec![0]);

    particles.sort();
    found.clear();
    particles.find_points([-0.5; 3], [0.5; 3], &mut found);
    assert!(found.is_empty());
}
