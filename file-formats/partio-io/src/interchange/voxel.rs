//! Voxel point grid flattening
//!
//! Point grids store their points in leaves. Each point lives in a voxel and
//! the position attribute holds its offset inside that voxel, so positions
//! are reprojected through the grid transform while flattening. Numeric
//! attributes are copied leaf by leaf in parallel.

use std::collections::HashMap;

use glam::{DMat4, DVec3, IVec3};
use log::{debug, warn};
use partio_data::{AttributeType, Element, ParticleAttribute, Particles};
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Grid attribute names and the particle names they map to
const HOUDINI_NAMES: [(&str, &str); 3] =
    [("P", "position"), ("pscale", "width"), ("v", "velocity")];

/// Per-point values of one leaf attribute
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValues {
    /// Single precision scalars, `tuple_size` per point
    Float(Vec<f32>),
    /// Double precision scalars, `tuple_size` per point
    Double(Vec<f64>),
    /// 32-bit integers
    Int32(Vec<i32>),
    /// 64-bit integers
    Int64(Vec<i64>),
    /// Single precision vectors
    Vec3Float(Vec<[f32; 3]>),
    /// Double precision vectors
    Vec3Double(Vec<[f64; 3]>),
    /// Strings
    Str(Vec<String>),
}

/// One attribute of a leaf
#[derive(Debug, Clone, PartialEq)]
pub struct LeafAttribute {
    /// Attribute name
    pub name: String,
    /// Scalars per point for the scalar variants
    pub tuple_size: usize,
    /// Values are voxel-relative positions
    pub position_range: bool,
    /// Values
    pub values: LeafValues,
}

impl LeafAttribute {
    /// Particle type and count, and whether values need reprojection
    fn descriptor(&self) -> (AttributeType, usize, bool) {
        match &self.values {
            LeafValues::Vec3Float(_) | LeafValues::Vec3Double(_) => {
                (AttributeType::Vector, 3, self.position_range)
            }
            LeafValues::Float(_) | LeafValues::Double(_) => {
                let attr_type = if self.tuple_size == 3 {
                    AttributeType::Vector
                } else {
                    AttributeType::Float
                };
                (attr_type, self.tuple_size, false)
            }
            LeafValues::Int32(_) | LeafValues::Int64(_) => {
                (AttributeType::Int, self.tuple_size, false)
            }
            LeafValues::Str(_) => (AttributeType::IndexedStr, 1, false),
        }
    }

    fn len(&self) -> usize {
        match &self.values {
            LeafValues::Float(v) => v.len(),
            LeafValues::Double(v) => v.len(),
            LeafValues::Int32(v) => v.len(),
            LeafValues::Int64(v) => v.len(),
            LeafValues::Vec3Float(v) => v.len() * 3,
            LeafValues::Vec3Double(v) => v.len() * 3,
            LeafValues::Str(v) => v.len(),
        }
    }
}

/// A leaf node holding points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointLeaf {
    /// Voxel coordinate of every point
    pub voxels: Vec<IVec3>,
    /// Attributes, each with one tuple per point
    pub attributes: Vec<LeafAttribute>,
}

impl PointLeaf {
    /// Number of points in this leaf
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// True when the leaf holds no points
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    fn attribute(&self, name: &str) -> Result<&LeafAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| {
                Error::invalid_format(format!("point leaf is missing attribute '{name}'"))
            })
    }
}

/// A grid of point leaves
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    /// Grid name
    pub name: String,
    /// Index space to world space
    pub transform: DMat4,
    /// Leaves in storage order
    pub leaves: Vec<PointLeaf>,
}

impl PointGrid {
    /// Total number of points
    pub fn point_count(&self) -> usize {
        self.leaves.iter().map(PointLeaf::len).sum()
    }
}

/// A surviving attribute and the grids it is copied from
#[derive(Debug)]
struct Column {
    source: String,
    attr_type: AttributeType,
    count: usize,
    spatial: Vec<bool>,
}

/// Collect attributes present in every grid with matching type and size
fn discover(grids: &[&PointGrid]) -> Vec<Column> {
    let mut order = Vec::new();
    let mut columns: HashMap<String, Column> = HashMap::new();
    let mut rejected = Vec::new();
    for grid in grids {
        let Some(leaf) = grid.leaves.first() else {
            continue;
        };
        for attr in &leaf.attributes {
            let (attr_type, count, spatial) = attr.descriptor();
            match columns.get_mut(&attr.name) {
                Some(column) if column.attr_type == attr_type && column.count == count => {
                    column.spatial.push(spatial);
                }
                Some(_) => {
                    warn!(
                        "voxel: attribute '{}' in grid '{}' differs in type or size",
                        attr.name, grid.name
                    );
                }
                None => {
                    order.push(attr.name.clone());
                    columns.insert(
                        attr.name.clone(),
                        Column {
                            source: attr.name.clone(),
                            attr_type,
                            count,
                            spatial: vec![spatial],
                        },
                    );
                }
            }
        }
    }

    let mut result = Vec::new();
    for name in order {
        if let Some(column) = columns.remove(&name) {
            if column.spatial.len() == grids.len() {
                result.push(column);
            } else {
                rejected.push(name);
            }
        }
    }
    if !rejected.is_empty() {
        debug!("voxel: attributes not shared by every grid: {rejected:?}");
    }
    result
}

/// Particle name for a grid attribute
fn particle_name<'a>(source: &'a str, columns: &[Column]) -> &'a str {
    for (from, to) in HOUDINI_NAMES {
        if source == from && !columns.iter().any(|c| c.source == to) {
            return to;
        }
    }
    source
}

/// Split `column` into one mutable slice per leaf
fn leaf_slices<'a, T>(
    mut column: &'a mut [T],
    leaves: &[PointLeaf],
    width: usize,
) -> Vec<&'a mut [T]> {
    let mut slices = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let (head, tail) = std::mem::take(&mut column).split_at_mut(leaf.len() * width);
        slices.push(head);
        column = tail;
    }
    slices
}

fn mismatch(source: &LeafAttribute, expected: &str) -> Error {
    let (attr_type, count, _) = source.descriptor();
    Error::invalid_format(format!(
        "leaf attribute '{}' holds {attr_type}[{count}] values, expected {expected}",
        source.name
    ))
}

fn copy_floats(
    target: &mut [f32],
    leaf: &PointLeaf,
    source: &LeafAttribute,
    spatial: bool,
    transform: &DMat4,
) -> Result<()> {
    match &source.values {
        LeafValues::Float(values) => target.copy_from_slice(values),
        LeafValues::Double(values) => {
            for (t, v) in target.iter_mut().zip(values) {
                *t = *v as f32;
            }
        }
        LeafValues::Vec3Float(values) => {
            for (t, v) in target.chunks_exact_mut(3).zip(values) {
                t.copy_from_slice(v);
            }
        }
        LeafValues::Vec3Double(values) => {
            for (t, v) in target.chunks_exact_mut(3).zip(values) {
                t.copy_from_slice(&[v[0] as f32, v[1] as f32, v[2] as f32]);
            }
        }
        LeafValues::Int32(_) | LeafValues::Int64(_) | LeafValues::Str(_) => {
            return Err(mismatch(source, "float"));
        }
    }
    if spatial {
        for (t, voxel) in target.chunks_exact_mut(3).zip(&leaf.voxels) {
            let offset = DVec3::new(f64::from(t[0]), f64::from(t[1]), f64::from(t[2]));
            let world = transform.transform_point3(voxel.as_dvec3() + offset);
            t.copy_from_slice(&world.as_vec3().to_array());
        }
    }
    Ok(())
}

fn copy_ints(target: &mut [i32], source: &LeafAttribute) -> Result<()> {
    match &source.values {
        LeafValues::Int32(values) => target.copy_from_slice(values),
        LeafValues::Int64(values) => {
            for (t, v) in target.iter_mut().zip(values) {
                *t = *v as i32;
            }
        }
        _ => return Err(mismatch(source, "integer")),
    }
    Ok(())
}

fn grid_column<'a, T: Element>(
    particles: &'a mut Particles,
    attr: &ParticleAttribute,
    start: usize,
    points: usize,
) -> Result<&'a mut [T]> {
    let column = particles.column_mut::<T>(attr)?;
    Ok(&mut column[start * attr.count..(start + points) * attr.count])
}

/// Flatten point grids into one container
///
/// Grids without leaves contribute nothing. Only attributes found in the
/// first leaf of every remaining grid, with the same type and size, are
/// kept.
pub fn flatten_grids(grids: &[PointGrid], headers_only: bool) -> Result<Particles> {
    let grids: Vec<&PointGrid> = grids.iter().filter(|g| !g.leaves.is_empty()).collect();
    let columns = discover(&grids);

    let mut particles = if headers_only {
        Particles::headers()
    } else {
        Particles::new()
    };
    let total: usize = grids.iter().map(|g| g.point_count()).sum();

    let mut attrs = Vec::with_capacity(columns.len());
    for column in &columns {
        let name = particle_name(&column.source, &columns);
        attrs.push(particles.try_add_attribute(name, column.attr_type, column.count)?);
    }
    drop(particles.try_add_particles(total)?);
    debug!("voxel: {} grids, {total} points, {} attributes", grids.len(), attrs.len());
    if headers_only {
        return Ok(particles);
    }

    let mut grid_start = 0;
    for (grid_index, grid) in grids.iter().enumerate() {
        let points = grid.point_count();
        for (column, attr) in columns.iter().zip(&attrs) {
            let width = attr.count;
            let sources = grid
                .leaves
                .iter()
                .map(|leaf| {
                    let source = leaf.attribute(&column.source)?;
                    let (attr_type, count, _) = source.descriptor();
                    if (attr_type, count) != (column.attr_type, column.count) {
                        return Err(mismatch(
                            source,
                            &format!("{}[{}]", column.attr_type, column.count),
                        ));
                    }
                    if source.len() != leaf.len() * width {
                        return Err(Error::invalid_format(format!(
                            "leaf attribute '{}' in grid '{}' holds {} values for {} points",
                            source.name,
                            grid.name,
                            source.len(),
                            leaf.len()
                        )));
                    }
                    Ok(source)
                })
                .collect::<Result<Vec<_>>>()?;

            match column.attr_type {
                AttributeType::Vector | AttributeType::Float => {
                    let spatial = column.spatial[grid_index];
                    let target = grid_column::<f32>(&mut particles, attr, grid_start, points)?;
                    leaf_slices(target, &grid.leaves, width)
                        .into_par_iter()
                        .zip(grid.leaves.par_iter().zip(sources.par_iter()))
                        .try_for_each(|(slice, (leaf, source))| {
                            copy_floats(slice, leaf, source, spatial, &grid.transform)
                        })?;
                }
                AttributeType::Int => {
                    let target = grid_column::<i32>(&mut particles, attr, grid_start, points)?;
                    leaf_slices(target, &grid.leaves, width)
                        .into_par_iter()
                        .zip(sources.par_iter())
                        .try_for_each(|(slice, source)| copy_ints(slice, source))?;
                }
                AttributeType::IndexedStr => {
                    // token registration mutates the string table, so stay serial
                    let mut index = grid_start;
                    for (leaf, source) in grid.leaves.iter().zip(&sources) {
                        let LeafValues::Str(values) = &source.values else {
                            return Err(mismatch(source, "string"));
                        };
                        for (offset, value) in values.iter().enumerate() {
                            let token = particles.register_indexed_str(attr, value)?;
                            particles.data_write::<i32>(attr, index + offset)[0] = token;
                        }
                        index += leaf.len();
                    }
                }
                AttributeType::None => {}
            }
        }
        grid_start += points;
    }
    Ok(particles)
}
