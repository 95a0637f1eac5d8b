//! Level 4: End-to-End Scenario Tests
//!
//! These tests verify realistic pipelines across codecs and the spatial index.

pub mod interchange;
pub mod large_caches;
pub mod three_particles;
