//! The particle container
//!
//! [`Particles`] stores one column per attribute (attribute-of-arrays). Each
//! column is a vector of 32-bit words sized `capacity * count`, viewed as
//! `f32`, `i32` or `u32` through [`bytemuck`]. Growth reallocates every column
//! but never invalidates attribute handles, which are plain indices.
//!
//! A container is in one of two states. A materialized container owns
//! storage for every particle. A headers-only container (see
//! [`Particles::headers`]) only tracks the particle count and schema, so file
//! probing costs memory proportional to the header rather than the file.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attribute::{AttributeType, Element, FixedAttribute, ParticleAttribute};
use crate::error::{Error, Result};
use crate::indexed_str::IndexedStrTable;
use crate::iterator::{ParticleIterator, ParticleIteratorMut};
use crate::kdtree::{KdTree, Neighbors};

/// Minimum capacity allocated by the first [`Particles::add_particle`]
pub const MIN_GROWTH_CAPACITY: usize = 10;

/// Name of the attribute the spatial index is built from
pub const POSITION_ATTRIBUTE: &str = "position";

/// Column-oriented particle container
pub struct Particles {
    headers_only: bool,
    num_particles: usize,
    capacity: usize,

    attributes: Vec<ParticleAttribute>,
    attribute_lookup: HashMap<String, usize>,
    pub(crate) columns: Vec<Vec<u32>>,
    attribute_strs: Vec<IndexedStrTable>,

    fixed_attributes: Vec<FixedAttribute>,
    fixed_lookup: HashMap<String, usize>,
    fixed_columns: Vec<Vec<u32>>,
    fixed_strs: Vec<IndexedStrTable>,

    kdtree: Mutex<Option<Arc<KdTree>>>,
}

impl Default for Particles {
    fn default() -> Self {
        Self::new()
    }
}

impl Particles {
    /// Create an empty, materialized container
    pub fn new() -> Self {
        Self::with_state(false)
    }

    /// Create an empty headers-only container
    ///
    /// Particles and attributes can be added and queried, but no per-particle
    /// storage is ever allocated. Fixed attributes keep their values.
    pub fn headers() -> Self {
        Self::with_state(true)
    }

    fn with_state(headers_only: bool) -> Self {
        Self {
            headers_only,
            num_particles: 0,
            capacity: 0,
            attributes: Vec::new(),
            attribute_lookup: HashMap::new(),
            columns: Vec::new(),
            attribute_strs: Vec::new(),
            fixed_attributes: Vec::new(),
            fixed_lookup: HashMap::new(),
            fixed_columns: Vec::new(),
            fixed_strs: Vec::new(),
            kdtree: Mutex::new(None),
        }
    }

    /// Release the container and everything it owns
    pub fn release(self) {
        log::trace!(
            "releasing container with {} particles, {} attributes",
            self.num_particles,
            self.attributes.len()
        );
        drop(self);
    }

    /// True if this container holds only counts and schema
    #[inline]
    pub fn is_headers_only(&self) -> bool {
        self.headers_only
    }

    /// Number of particles
    #[inline]
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    /// Number of particles storage is allocated for
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of per-particle attributes
    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Number of fixed attributes
    #[inline]
    pub fn num_fixed_attributes(&self) -> usize {
        self.fixed_attributes.len()
    }

    // ------------------------------------------------------------------
    // Attribute registry
    // ------------------------------------------------------------------

    /// Register a per-particle attribute
    ///
    /// Returns the invalid sentinel (see [`ParticleAttribute::is_valid`]) and
    /// logs an error when the name is taken or the definition is unusable.
    pub fn add_attribute(
        &mut self,
        name: &str,
        attr_type: AttributeType,
        count: usize,
    ) -> ParticleAttribute {
        match self.try_add_attribute(name, attr_type, count) {
            Ok(attr) => attr,
            Err(e) => {
                log::error!("add_attribute failed: {e}");
                ParticleAttribute::invalid()
            }
        }
    }

    /// Register a per-particle attribute, reporting failure as an error
    pub fn try_add_attribute(
        &mut self,
        name: &str,
        attr_type: AttributeType,
        count: usize,
    ) -> Result<ParticleAttribute> {
        check_definition(name, attr_type, count)?;
        if self.attribute_lookup.contains_key(name) {
            return Err(Error::AttributeExists {
                name: name.to_owned(),
            });
        }

        let attr = ParticleAttribute {
            name: name.to_owned(),
            attr_type,
            count,
            attribute_index: self.attributes.len(),
        };
        let column = if self.headers_only {
            Vec::new()
        } else {
            zeroed_column(self.capacity, count)?
        };

        self.attribute_lookup.insert(attr.name.clone(), attr.attribute_index);
        self.attributes.push(attr.clone());
        self.columns.push(column);
        self.attribute_strs.push(IndexedStrTable::new());
        Ok(attr)
    }

    /// Look up a per-particle attribute by name
    pub fn attribute_info(&self, name: &str) -> Option<ParticleAttribute> {
        self.attribute_lookup
            .get(name)
            .map(|&index| self.attributes[index].clone())
    }

    /// Look up a per-particle attribute by index
    pub fn attribute_info_by_index(&self, index: usize) -> Option<ParticleAttribute> {
        self.attributes.get(index).cloned()
    }

    /// Look up a per-particle attribute by name, failing if it is absent
    pub fn try_attribute(&self, name: &str) -> Result<ParticleAttribute> {
        self.attribute_info(name).ok_or_else(|| Error::not_found(name))
    }

    /// All per-particle attributes in registration order
    pub fn attributes(&self) -> &[ParticleAttribute] {
        &self.attributes
    }

    /// Register a fixed attribute; the sentinel is returned on failure
    pub fn add_fixed_attribute(
        &mut self,
        name: &str,
        attr_type: AttributeType,
        count: usize,
    ) -> FixedAttribute {
        match self.try_add_fixed_attribute(name, attr_type, count) {
            Ok(attr) => attr,
            Err(e) => {
                log::error!("add_fixed_attribute failed: {e}");
                FixedAttribute::invalid()
            }
        }
    }

    /// Register a fixed attribute, reporting failure as an error
    pub fn try_add_fixed_attribute(
        &mut self,
        name: &str,
        attr_type: AttributeType,
        count: usize,
    ) -> Result<FixedAttribute> {
        check_definition(name, attr_type, count)?;
        if self.fixed_lookup.contains_key(name) {
            return Err(Error::AttributeExists {
                name: name.to_owned(),
            });
        }

        let attr = FixedAttribute {
            name: name.to_owned(),
            attr_type,
            count,
            attribute_index: self.fixed_attributes.len(),
        };
        let column = zeroed_column(1, count)?;
        self.fixed_lookup.insert(attr.name.clone(), attr.attribute_index);
        self.fixed_attributes.push(attr.clone());
        self.fixed_columns.push(column);
        self.fixed_strs.push(IndexedStrTable::new());
        Ok(attr)
    }

    /// Look up a fixed attribute by name
    pub fn fixed_attribute_info(&self, name: &str) -> Option<FixedAttribute> {
        self.fixed_lookup
            .get(name)
            .map(|&index| self.fixed_attributes[index].clone())
    }

    /// Look up a fixed attribute by index
    pub fn fixed_attribute_info_by_index(&self, index: usize) -> Option<FixedAttribute> {
        self.fixed_attributes.get(index).cloned()
    }

    /// All fixed attributes in registration order
    pub fn fixed_attributes(&self) -> &[FixedAttribute] {
        &self.fixed_attributes
    }

    // ------------------------------------------------------------------
    // Growth
    // ------------------------------------------------------------------

    /// Append one particle and return its index
    ///
    /// When storage is exhausted capacity grows to `max(10, capacity * 3 / 2)`.
    pub fn add_particle(&mut self) -> usize {
        if self.headers_only {
            self.num_particles += 1;
            self.capacity = self.num_particles;
            return self.num_particles - 1;
        }

        if self.num_particles == self.capacity {
            let grown = MIN_GROWTH_CAPACITY.max(self.capacity * 3 / 2);
            self.reallocate(grown);
        }
        let index = self.num_particles;
        self.num_particles += 1;
        index
    }

    /// Append `count` particles with at most one reallocation
    ///
    /// Capacity grows to exactly fit. The returned iterator is positioned at
    /// the first new particle and spans the new range.
    pub fn add_particles(&mut self, count: usize) -> ParticleIteratorMut<'_> {
        let start = self.num_particles;
        let end = start + count;
        if self.headers_only {
            self.num_particles = end;
            self.capacity = end;
            return ParticleIteratorMut::new(self, end, end);
        }

        if end > self.capacity {
            self.reallocate(end);
        }
        self.num_particles = end;
        ParticleIteratorMut::new(self, start, end)
    }

    /// Fallible [`add_particles`](Self::add_particles)
    ///
    /// Counts that come from untrusted input go through here, so a count the
    /// storage cannot hold is reported as [`Error::AllocationFailed`] instead
    /// of aborting. On failure the container is left unchanged.
    pub fn try_add_particles(&mut self, count: usize) -> Result<ParticleIteratorMut<'_>> {
        let start = self.num_particles;
        let end = start
            .checked_add(count)
            .ok_or(Error::AllocationFailed { particles: count })?;
        if self.headers_only {
            self.num_particles = end;
            self.capacity = end;
            return Ok(ParticleIteratorMut::new(self, end, end));
        }

        self.try_reserve(end)?;
        self.num_particles = end;
        Ok(ParticleIteratorMut::new(self, start, end))
    }

    /// Make room for `capacity` particles without changing the count
    ///
    /// Every column is reserved before any is resized, so a failed
    /// reservation leaves values and capacity as they were.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if self.headers_only || capacity <= self.capacity {
            return Ok(());
        }
        let overflow = Error::AllocationFailed {
            particles: capacity,
        };

        let mut lens = Vec::with_capacity(self.columns.len());
        for (attr, column) in self.attributes.iter().zip(self.columns.iter_mut()) {
            let len = capacity
                .checked_mul(attr.count)
                .ok_or_else(|| overflow.clone())?;
            column
                .try_reserve_exact(len.saturating_sub(column.len()))
                .map_err(|_| overflow.clone())?;
            lens.push(len);
        }

        log::trace!("growing particle storage {} -> {}", self.capacity, capacity);
        for (column, len) in self.columns.iter_mut().zip(lens) {
            column.resize(len, 0);
        }
        self.capacity = capacity;
        Ok(())
    }

    fn reallocate(&mut self, capacity: usize) {
        log::trace!("growing particle storage {} -> {}", self.capacity, capacity);
        for (attr, column) in self.attributes.iter().zip(self.columns.iter_mut()) {
            let len = capacity * attr.count;
            column.reserve_exact(len.saturating_sub(column.len()));
            column.resize(len, 0);
        }
        self.capacity = capacity;
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    /// View one particle's value of `attr`
    ///
    /// This is the fast path: the handle is trusted and `index` is only
    /// checked against allocated storage. Debug builds assert that `T` fits the
    /// attribute type and that `index < num_particles()`. Calling this on a
    /// headers-only container panics.
    #[inline]
    pub fn data<T: Element>(&self, attr: &ParticleAttribute, index: usize) -> &[T] {
        debug_assert!(T::accepts(attr.attr_type), "{} cannot view {}", T::NAME, attr.attr_type);
        debug_assert!(index < self.num_particles, "particle {index} out of range");
        let start = index * attr.count;
        &bytemuck::cast_slice(&self.columns[attr.attribute_index])[start..start + attr.count]
    }

    /// Mutable view of one particle's value of `attr`, see [`Particles::data`]
    #[inline]
    pub fn data_write<T: Element>(&mut self, attr: &ParticleAttribute, index: usize) -> &mut [T] {
        debug_assert!(T::accepts(attr.attr_type), "{} cannot view {}", T::NAME, attr.attr_type);
        debug_assert!(index < self.num_particles, "particle {index} out of range");
        let start = index * attr.count;
        &mut bytemuck::cast_slice_mut(&mut self.columns[attr.attribute_index])
            [start..start + attr.count]
    }

    /// Bounds- and type-checked view of one particle's value
    pub fn get<T: Element>(&self, attr: &ParticleAttribute, index: usize) -> Result<&[T]> {
        let attr = self.check_access::<T>(attr, "get")?;
        self.check_index(index)?;
        Ok(self.data(attr, index))
    }

    /// Bounds- and type-checked mutable view of one particle's value
    pub fn get_mut<T: Element>(
        &mut self,
        attr: &ParticleAttribute,
        index: usize,
    ) -> Result<&mut [T]> {
        let attr = self.check_access::<T>(attr, "get_mut")?.clone();
        self.check_index(index)?;
        Ok(self.data_write(&attr, index))
    }

    /// Values of `attr` for all particles, `count` elements per particle
    pub fn column<T: Element>(&self, attr: &ParticleAttribute) -> Result<&[T]> {
        let attr = self.check_access::<T>(attr, "column")?;
        let len = self.num_particles * attr.count;
        Ok(&bytemuck::cast_slice(&self.columns[attr.attribute_index])[..len])
    }

    /// Mutable values of `attr` for all particles
    pub fn column_mut<T: Element>(&mut self, attr: &ParticleAttribute) -> Result<&mut [T]> {
        let attr = self.check_access::<T>(attr, "column_mut")?.clone();
        let len = self.num_particles * attr.count;
        Ok(&mut bytemuck::cast_slice_mut(&mut self.columns[attr.attribute_index])[..len])
    }

    /// Append the values of `attr` for each of `indices` to `out`
    pub fn data_multiple<T: Element>(
        &self,
        attr: &ParticleAttribute,
        indices: &[usize],
        out: &mut Vec<T>,
    ) -> Result<()> {
        let count = self.check_access::<T>(attr, "data_multiple")?.count;
        let values = self.column::<T>(attr)?;
        out.reserve(indices.len() * count);
        for &index in indices {
            self.check_index(index)?;
            out.extend_from_slice(&values[index * count..(index + 1) * count]);
        }
        Ok(())
    }

    /// Append the values of `attr` for each of `indices` to `out` as floats
    ///
    /// Integer and indexed-string values are converted numerically.
    pub fn data_as_float(
        &self,
        attr: &ParticleAttribute,
        indices: &[usize],
        out: &mut Vec<f32>,
    ) -> Result<()> {
        let attr = self.check_access::<u32>(attr, "data_as_float")?;
        if attr.attr_type.is_float() {
            return self.data_multiple::<f32>(attr, indices, out);
        }

        let values = self.column::<i32>(attr)?;
        let count = attr.count;
        out.reserve(indices.len() * count);
        for &index in indices {
            self.check_index(index)?;
            out.extend(values[index * count..(index + 1) * count].iter().map(|&v| v as f32));
        }
        Ok(())
    }

    fn check_access<T: Element>(
        &self,
        attr: &ParticleAttribute,
        operation: &'static str,
    ) -> Result<&ParticleAttribute> {
        if self.headers_only {
            return Err(Error::HeadersOnly(operation));
        }
        let registered = self
            .attributes
            .get(attr.attribute_index)
            .filter(|registered| registered.name == attr.name)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        if !T::accepts(registered.attr_type) {
            return Err(Error::TypeMismatch {
                name: registered.name.clone(),
                expected: T::NAME,
                actual: registered.attr_type,
            });
        }
        Ok(registered)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.num_particles {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.num_particles,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fixed attribute values
    // ------------------------------------------------------------------

    /// Value of a fixed attribute
    pub fn fixed_data<T: Element>(&self, attr: &FixedAttribute) -> Result<&[T]> {
        let attr = self.check_fixed::<T>(attr)?;
        Ok(bytemuck::cast_slice(&self.fixed_columns[attr.attribute_index]))
    }

    /// Mutable value of a fixed attribute
    pub fn fixed_data_write<T: Element>(&mut self, attr: &FixedAttribute) -> Result<&mut [T]> {
        let index = self.check_fixed::<T>(attr)?.attribute_index;
        Ok(bytemuck::cast_slice_mut(&mut self.fixed_columns[index]))
    }

    fn check_fixed<T: Element>(&self, attr: &FixedAttribute) -> Result<&FixedAttribute> {
        let registered = self
            .fixed_attributes
            .get(attr.attribute_index)
            .filter(|registered| registered.name == attr.name)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        if !T::accepts(registered.attr_type) {
            return Err(Error::TypeMismatch {
                name: registered.name.clone(),
                expected: T::NAME,
                actual: registered.attr_type,
            });
        }
        Ok(registered)
    }

    // ------------------------------------------------------------------
    // Indexed strings
    // ------------------------------------------------------------------

    /// Register `value` for `attr`, returning its token
    pub fn register_indexed_str(&mut self, attr: &ParticleAttribute, value: &str) -> Result<i32> {
        let table = self
            .attribute_strs
            .get_mut(attr.attribute_index)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        Ok(table.register(value))
    }

    /// Token of `value` for `attr`, if registered
    pub fn lookup_indexed_str(&self, attr: &ParticleAttribute, value: &str) -> Option<i32> {
        self.attribute_strs
            .get(attr.attribute_index)
            .and_then(|table| table.lookup(value))
    }

    /// All strings registered for `attr`, in token order
    pub fn indexed_strs(&self, attr: &ParticleAttribute) -> &[String] {
        self.attribute_strs
            .get(attr.attribute_index)
            .map(IndexedStrTable::strings)
            .unwrap_or_default()
    }

    /// Overwrite the string stored at `token` for `attr`
    pub fn set_indexed_str(
        &mut self,
        attr: &ParticleAttribute,
        token: i32,
        value: &str,
    ) -> Result<()> {
        let table = self
            .attribute_strs
            .get_mut(attr.attribute_index)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        if table.set(token, value) {
            Ok(())
        } else {
            log::error!("set_indexed_str: token {token} not registered for '{}'", attr.name);
            Err(Error::InvalidToken {
                name: attr.name.clone(),
                token,
                len: table.len(),
            })
        }
    }

    /// Register `value` for the fixed attribute `attr`
    pub fn register_fixed_indexed_str(
        &mut self,
        attr: &FixedAttribute,
        value: &str,
    ) -> Result<i32> {
        let table = self
            .fixed_strs
            .get_mut(attr.attribute_index)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        Ok(table.register(value))
    }

    /// Token of `value` for the fixed attribute `attr`
    pub fn lookup_fixed_indexed_str(&self, attr: &FixedAttribute, value: &str) -> Option<i32> {
        self.fixed_strs
            .get(attr.attribute_index)
            .and_then(|table| table.lookup(value))
    }

    /// All strings registered for the fixed attribute `attr`
    pub fn fixed_indexed_strs(&self, attr: &FixedAttribute) -> &[String] {
        self.fixed_strs
            .get(attr.attribute_index)
            .map(IndexedStrTable::strings)
            .unwrap_or_default()
    }

    /// Overwrite the string stored at `token` for the fixed attribute `attr`
    pub fn set_fixed_indexed_str(
        &mut self,
        attr: &FixedAttribute,
        token: i32,
        value: &str,
    ) -> Result<()> {
        let table = self
            .fixed_strs
            .get_mut(attr.attribute_index)
            .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
        if table.set(token, value) {
            Ok(())
        } else {
            log::error!("set_fixed_indexed_str: token {token} not registered for '{}'", attr.name);
            Err(Error::InvalidToken {
                name: attr.name.clone(),
                token,
                len: table.len(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Cursor over every particle
    ///
    /// A headers-only container yields an empty cursor.
    pub fn iter(&self) -> ParticleIterator<'_> {
        self.iter_range(0, self.num_particles)
    }

    /// Cursor over `[start, end)`, clamped to the particle count
    pub fn iter_range(&self, start: usize, end: usize) -> ParticleIterator<'_> {
        let end = if self.headers_only {
            0
        } else {
            end.min(self.num_particles)
        };
        ParticleIterator::new(self, start.min(end), end)
    }

    /// Mutable cursor over every particle
    pub fn iter_mut(&mut self) -> ParticleIteratorMut<'_> {
        let end = if self.headers_only { 0 } else { self.num_particles };
        ParticleIteratorMut::new(self, 0, end)
    }

    // ------------------------------------------------------------------
    // Spatial index
    // ------------------------------------------------------------------

    /// Build the spatial index from the current `position` values
    ///
    /// Logs an error and leaves any previous index in place when `position`
    /// is missing or is not a VECTOR of count 3.
    pub fn sort(&self) {
        if let Err(e) = self.try_sort() {
            log::error!("sort failed: {e}");
        }
    }

    /// Build the spatial index, reporting failure as an error
    ///
    /// Concurrent calls are safe; the last build to finish is published.
    pub fn try_sort(&self) -> Result<()> {
        if self.headers_only {
            return Err(Error::HeadersOnly("sort"));
        }
        let position = self
            .attribute_info(POSITION_ATTRIBUTE)
            .ok_or_else(|| Error::missing_position("no 'position' attribute"))?;
        if position.attr_type != AttributeType::Vector || position.count != 3 {
            return Err(Error::missing_position(format!(
                "'position' is {} of count {}, expected VECTOR of count 3",
                position.attr_type, position.count
            )));
        }

        let coords = self.column::<f32>(&position)?;
        let points: Vec<[f32; 3]> = coords
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let tree = Arc::new(KdTree::build(&points));

        *self.kdtree.lock() = Some(tree);
        log::debug!("spatial index built over {} particles", points.len());
        Ok(())
    }

    /// True once `sort()` has succeeded
    pub fn has_spatial_index(&self) -> bool {
        self.kdtree.lock().is_some()
    }

    /// The most recently built spatial index
    pub fn spatial_index(&self) -> Option<Arc<KdTree>> {
        self.kdtree.lock().clone()
    }

    /// Append indices of particles inside `[bbox_min, bbox_max]` to `points`
    ///
    /// Logs an error and appends nothing before `sort()` has been called.
    pub fn find_points(&self, bbox_min: [f32; 3], bbox_max: [f32; 3], points: &mut Vec<usize>) {
        match self.spatial_index() {
            Some(tree) => tree.find_points(bbox_min, bbox_max, points),
            None => log::error!("find_points: {}", Error::NotSorted),
        }
    }

    /// Append up to `max_count` nearest particles within `max_radius` of `center`
    ///
    /// Returns the squared radius spanned by the result (see
    /// [`KdTree::find_n_points`]), or zero with a logged error before `sort()`.
    pub fn find_n_points(
        &self,
        center: [f32; 3],
        max_count: usize,
        max_radius: f32,
        points: &mut Vec<usize>,
        point_distances_squared: &mut Vec<f32>,
    ) -> f32 {
        match self.spatial_index() {
            Some(tree) => tree.find_n_points(
                center,
                max_count,
                max_radius,
                points,
                point_distances_squared,
            ),
            None => {
                log::error!("find_n_points: {}", Error::NotSorted);
                0.0
            }
        }
    }

    /// k-nearest query returning a fresh [`Neighbors`] value
    pub fn find_n_points_within(
        &self,
        center: [f32; 3],
        max_count: usize,
        max_radius: f32,
    ) -> Result<Neighbors> {
        let tree = self.spatial_index().ok_or(Error::NotSorted)?;
        let mut neighbors = Neighbors::default();
        neighbors.max_radius_squared = tree.find_n_points(
            center,
            max_count,
            max_radius,
            &mut neighbors.indices,
            &mut neighbors.distances_squared,
        );
        Ok(neighbors)
    }
}

/// `capacity * count` zeroed words, or an error when they cannot be allocated
fn zeroed_column(capacity: usize, count: usize) -> Result<Vec<u32>> {
    let failed = || Error::AllocationFailed {
        particles: capacity,
    };
    let len = capacity.checked_mul(count).ok_or_else(failed)?;
    let mut column = Vec::new();
    column.try_reserve_exact(len).map_err(|_| failed())?;
    column.resize(len, 0);
    Ok(column)
}

fn check_definition(name: &str, attr_type: AttributeType, count: usize) -> Result<()> {
    let reason = if name.is_empty() {
        "empty name"
    } else if attr_type == AttributeType::None {
        "type NONE"
    } else if count == 0 {
        "count 0"
    } else {
        return Ok(());
    };
    Err(Error::InvalidAttribute {
        name: name.to_owned(),
        reason: reason.to_owned(),
    })
}

impl fmt::Debug for Particles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particles")
            .field("headers_only", &self.headers_only)
            .field("num_particles", &self.num_particles)
            .field("capacity", &self.capacity)
            .field("attributes", &self.attributes)
            .field("fixed_attributes", &self.fixed_attributes)
            .field("has_spatial_index", &self.has_spatial_index())
            .finish_non_exhaustive()
    }
}
