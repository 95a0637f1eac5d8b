//! # partio_data - Particle Container Library
//!
//! An in-memory, column-oriented particle container with dynamically
//! registered attributes and a k-d tree spatial index. This crate is the
//! model every particle file codec reads into and writes from.
//!
//! ## Features
//!
//! - Per-particle and fixed (per-container) attributes of type VECTOR, FLOAT,
//!   INT and INDEXEDSTR
//! - Amortized single-particle growth and exact-fit bulk growth
//! - Fast unchecked views plus bounds-checked and iterator-based access
//! - Headers-only containers for cheap file probing
//! - k-d tree box queries and k-nearest/radius queries
//! - Clone, schema clone and id-based merge of containers
//!
//! ## Examples
//!
//! ```
//! use partio_data::{AttributeType, Particles};
//!
//! let mut particles = Particles::new();
//! let position = particles.add_attribute("position", AttributeType::Vector, 3);
//!
//! for i in 0..10 {
//!     let index = particles.add_particle();
//!     particles
//!         .data_write::<f32>(&position, index)
//!         .copy_from_slice(&[i as f32, 0.0, 0.0]);
//! }
//!
//! particles.sort();
//! let mut found = Vec::new();
//! particles.find_points([2.5, -1.0, -1.0], [5.5, 1.0, 1.0], &mut found);
//! found.sort_unstable();
//! assert_eq!(found, vec![3, 4, 5]);
//! ```
//!
//! ## Diagnostics
//!
//! Usage errors and skipped data are reported through the [`log`] facade.
//! Without an installed logger they are discarded.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod attribute;
pub mod error;
pub mod indexed_str;
pub mod iterator;
pub mod kdtree;
pub mod ops;
pub mod particles;

pub use attribute::{AttributeType, Element, FixedAttribute, ParticleAttribute};
pub use error::{Error, Result};
pub use indexed_str::IndexedStrTable;
pub use iterator::{ParticleAccessor, ParticleIterator, ParticleIteratorMut};
pub use kdtree::{BBox, KdTree, Neighbors};
pub use ops::{Summary, clone_particles, clone_schema, merge, summary};
pub use particles::{MIN_GROWTH_CAPACITY, POSITION_ATTRIBUTE, Particles};

/// Create an empty, materialized container
pub fn create() -> Particles {
    Particles::new()
}

/// Create an empty headers-only container
pub fn create_headers() -> Particles {
    Particles::headers()
}
