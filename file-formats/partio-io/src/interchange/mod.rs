//! Flattening of scene and voxel point data into a particle container
//!
//! Archive and voxel-point containers need vendor SDKs to decode. Hosts that
//! have decoded them describe the result with the plain models in this
//! module, and the flattening passes turn those into a single [`Particles`]
//! container.
//!
//! [`Particles`]: partio_data::Particles

pub mod scene;
pub mod voxel;

pub use scene::{
    GeometryScope, NodeKind, PointSample, Property, PropertyValues, SceneNode, flatten_scene,
};
pub use voxel::{LeafAttribute, LeafValues, PointGrid, PointLeaf, flatten_grids};
