//! Hierarchical scene flattening
//!
//! A scene is a tree of transforms and point sets. Flattening makes two
//! passes over it: the first counts points and registers attributes, the
//! second walks the tree with a matrix stack and copies every point set into
//! the next free index range of the container.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use log::{debug, warn};
use partio_data::{AttributeType, Element, ParticleAttribute, Particles, POSITION_ATTRIBUTE};

use crate::error::Result;

/// How a property's values map onto the points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryScope {
    /// One value for the whole object
    Constant,
    /// One value per primitive
    Uniform,
    /// One value per point
    Varying,
    /// One value per vertex
    Vertex,
    /// One value per face vertex
    FaceVarying,
}

impl GeometryScope {
    /// Whether values of this scope are carried per particle
    pub fn is_per_point(self) -> bool {
        matches!(
            self,
            GeometryScope::Varying | GeometryScope::Vertex | GeometryScope::FaceVarying
        )
    }
}

/// Values of an arbitrary property, `extent` components per point
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValues {
    /// Boolean and integer families
    Int(Vec<i32>),
    /// Half, single and double precision floats
    Float(Vec<f32>),
    /// Strings, optionally indexed
    Str {
        /// Distinct or per-point strings
        values: Vec<String>,
        /// Per-point indices into `values`
        indices: Option<Vec<i32>>,
    },
}

/// An arbitrary per-point property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Value mapping
    pub scope: GeometryScope,
    /// Components per point
    pub extent: usize,
    /// Interpretation hint such as `vector`, `normal` or `point`
    pub interpretation: Option<String>,
    /// Values
    pub values: PropertyValues,
}

impl Property {
    /// Attribute type and count this property registers as
    pub fn attribute(&self) -> (AttributeType, usize) {
        match &self.values {
            PropertyValues::Int(_) => (AttributeType::Int, self.extent),
            PropertyValues::Float(_) => {
                let spatial = matches!(
                    self.interpretation.as_deref(),
                    Some("vector" | "normal" | "point")
                );
                let attr_type = if spatial {
                    AttributeType::Vector
                } else {
                    AttributeType::Float
                };
                (attr_type, self.extent)
            }
            PropertyValues::Str { .. } => (AttributeType::IndexedStr, 1),
        }
    }
}

/// One sample of a point set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSample {
    /// Object-space positions
    pub positions: Vec<Vec3>,
    /// Per-point velocities
    pub velocities: Option<Vec<Vec3>>,
    /// Per-point widths
    pub widths: Option<Vec<f32>>,
    /// Per-point ids
    pub ids: Option<Vec<u64>>,
    /// Arbitrary properties
    pub properties: Vec<Property>,
}

/// What a scene node holds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A transform applied to all descendants
    Transform {
        /// Local matrix
        matrix: Mat4,
        /// Whether the parent transform applies too
        inherits: bool,
    },
    /// A point set
    Points(PointSample),
    /// A plain grouping node
    Group,
}

/// A node of the scene tree
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Node name
    pub name: String,
    /// Node payload
    pub kind: NodeKind,
    /// Child nodes
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// A group node with the given children
    pub fn group(name: impl Into<String>, children: Vec<SceneNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            children,
        }
    }

    /// A transform node with the given children
    pub fn transform(
        name: impl Into<String>,
        matrix: Mat4,
        inherits: bool,
        children: Vec<SceneNode>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Transform { matrix, inherits },
            children,
        }
    }

    /// A leaf point node
    pub fn points(name: impl Into<String>, sample: PointSample) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Points(sample),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Layout {
    points: usize,
    position: Option<ParticleAttribute>,
    velocity: Option<ParticleAttribute>,
    width: Option<ParticleAttribute>,
    id: Option<ParticleAttribute>,
    properties: HashMap<String, ParticleAttribute>,
}

impl Layout {
    fn discover(&mut self, node: &SceneNode, particles: &mut Particles) {
        if let NodeKind::Points(sample) = &node.kind {
            self.points += sample.positions.len();
            if self.position.is_none() {
                self.position = register(particles, POSITION_ATTRIBUTE, AttributeType::Vector, 3);
            }
            if sample.velocities.is_some() && self.velocity.is_none() {
                self.velocity = register(particles, "velocity", AttributeType::Vector, 3);
            }
            if sample.widths.is_some() && self.width.is_none() {
                self.width = register(particles, "width", AttributeType::Float, 1);
            }
            if sample.ids.is_some() && self.id.is_none() {
                self.id = register(particles, "id", AttributeType::Int, 1);
            }
            for property in &sample.properties {
                if !property.scope.is_per_point() || self.properties.contains_key(&property.name) {
                    continue;
                }
                let (attr_type, count) = property.attribute();
                if let Some(attr) = register(particles, &property.name, attr_type, count) {
                    self.properties.insert(property.name.clone(), attr);
                }
            }
        }
        for child in &node.children {
            self.discover(child, particles);
        }
    }
}

fn register(
    particles: &mut Particles,
    name: &str,
    attr_type: AttributeType,
    count: usize,
) -> Option<ParticleAttribute> {
    match particles.try_add_attribute(name, attr_type, count) {
        Ok(attr) => Some(attr),
        Err(e) => {
            warn!("scene: skipping property '{name}': {e}");
            None
        }
    }
}

/// Copy `n` tuples of `extent` values into `attr` starting at particle
/// `start`, repeating the last tuple when `values` runs short
fn fill_tuples<T: Element + Copy>(
    particles: &mut Particles,
    attr: &ParticleAttribute,
    start: usize,
    n: usize,
    values: &[T],
    extent: usize,
) -> Result<()> {
    if extent == 0 || values.len() < extent {
        return Ok(());
    }
    let available = values.len() / extent;
    let width = attr.count.min(extent);
    let column = particles.column_mut::<T>(attr)?;
    for i in 0..n {
        let source = i.min(available - 1) * extent;
        let target = (start + i) * attr.count;
        column[target..target + width].copy_from_slice(&values[source..source + width]);
    }
    Ok(())
}

fn fill_strings(
    particles: &mut Particles,
    attr: &ParticleAttribute,
    start: usize,
    n: usize,
    values: &[String],
    indices: Option<&[i32]>,
) -> Result<()> {
    let tokens = values
        .iter()
        .map(|value| particles.register_indexed_str(attr, value))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let per_point: Vec<i32> = match indices {
        Some(indices) if !indices.is_empty() => {
            let mut mapped = Vec::with_capacity(indices.len());
            for &index in indices {
                match usize::try_from(index).ok().and_then(|i| tokens.get(i)) {
                    Some(&token) => mapped.push(token),
                    None => {
                        warn!("scene: string index {index} out of range for '{}'", attr.name);
                        return Ok(());
                    }
                }
            }
            mapped
        }
        _ => tokens,
    };
    fill_tuples(particles, attr, start, n, &per_point, 1)
}

fn fill(
    node: &SceneNode,
    layout: &Layout,
    particles: &mut Particles,
    stack: &mut Vec<Mat4>,
    next: &mut usize,
) -> Result<()> {
    let parent = stack.last().copied().unwrap_or(Mat4::IDENTITY);
    let mut pushed = false;
    match &node.kind {
        NodeKind::Transform { matrix, inherits } => {
            if !inherits {
                stack.push(*matrix);
                pushed = true;
            } else if *matrix != Mat4::IDENTITY {
                stack.push(parent * *matrix);
                pushed = true;
            }
        }
        NodeKind::Points(sample) => {
            let start = *next;
            let n = sample.positions.len();
            *next += n;

            if let Some(attr) = &layout.position {
                let world: Vec<f32> = sample
                    .positions
                    .iter()
                    .flat_map(|p| parent.transform_point3(*p).to_array())
                    .collect();
                fill_tuples(particles, attr, start, n, &world, 3)?;
            }
            if let (Some(attr), Some(velocities)) = (&layout.velocity, &sample.velocities) {
                let flat: Vec<f32> = velocities.iter().flat_map(|v| v.to_array()).collect();
                fill_tuples(particles, attr, start, n, &flat, 3)?;
            }
            if let (Some(attr), Some(widths)) = (&layout.width, &sample.widths) {
                fill_tuples(particles, attr, start, n, widths, 1)?;
            }
            if let (Some(attr), Some(ids)) = (&layout.id, &sample.ids) {
                let ids: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
                fill_tuples(particles, attr, start, n, &ids, 1)?;
            }

            for property in &sample.properties {
                let Some(attr) = layout.properties.get(&property.name) else {
                    continue;
                };
                match (&property.values, attr.attr_type) {
                    (PropertyValues::Int(values), AttributeType::Int) => {
                        fill_tuples(particles, attr, start, n, values, property.extent)?;
                    }
                    (
                        PropertyValues::Float(values),
                        AttributeType::Float | AttributeType::Vector,
                    ) => {
                        fill_tuples(particles, attr, start, n, values, property.extent)?;
                    }
                    (PropertyValues::Str { values, indices }, AttributeType::IndexedStr) => {
                        fill_strings(particles, attr, start, n, values, indices.as_deref())?;
                    }
                    _ => warn!(
                        "scene: '{}' in '{}' does not match the registered {} attribute",
                        property.name, node.name, attr.attr_type
                    ),
                }
            }
        }
        NodeKind::Group => {}
    }

    for child in &node.children {
        fill(child, layout, particles, stack, next)?;
    }
    if pushed {
        stack.pop();
    }
    Ok(())
}

/// Flatten every point set under `root` into one container
///
/// Positions are moved to world space. Velocities, widths, ids and
/// arbitrary properties are copied as stored.
pub fn flatten_scene(root: &SceneNode, headers_only: bool) -> Result<Particles> {
    let mut particles = if headers_only {
        Particles::headers()
    } else {
        Particles::new()
    };
    let mut layout = Layout::default();
    layout.discover(root, &mut particles);
    drop(particles.try_add_particles(layout.points)?);
    debug!(
        "scene: {} points, {} attributes",
        layout.points,
        particles.num_attributes()
    );
    if headers_only || layout.points == 0 {
        return Ok(particles);
    }

    let mut stack = vec![Mat4::IDENTITY];
    let mut next = 0;
    fill(root, &layout, &mut particles, &mut stack, &mut next)?;
    Ok(particles)
}
