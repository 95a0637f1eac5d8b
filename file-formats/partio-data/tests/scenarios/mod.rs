//! End-to-end usage scenarios

mod concurrent_sort;
mod nearest_neighbors;
