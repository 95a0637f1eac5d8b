//! Component-level property tests

mod container;
mod spatial_index;
