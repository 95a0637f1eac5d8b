//! Cursor and accessor protocol
//!
//! An iterator walks a range of particles. Accessors are bound to it once per
//! attribute, which resolves and validates the attribute a single time; after
//! that each read is a stride computation into the attribute's column.
//!
//! ```
//! use partio_data::{AttributeType, Particles};
//!
//! let mut particles = Particles::new();
//! let mass = particles.add_attribute("mass", AttributeType::Float, 1);
//!
//! let mut it = particles.add_particles(3);
//! let mass_acc = it.add_accessor(&mass).unwrap();
//! while !it.is_end() {
//!     let value = it.index() as f32;
//!     it.data_mut::<f32>(&mass_acc)[0] = value;
//!     it.advance();
//! }
//!
//! let mut it = particles.iter();
//! let mass_acc = it.add_accessor(&mass).unwrap();
//! let mut total = 0.0;
//! while !it.is_end() {
//!     total += it.data::<f32>(&mass_acc)[0];
//!     it.advance();
//! }
//! assert_eq!(total, 3.0);
//! ```

use crate::attribute::{AttributeType, Element, ParticleAttribute};
use crate::error::{Error, Result};
use crate::particles::Particles;

/// A resolved view of one attribute, bound to an iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleAccessor {
    attribute_index: usize,
    count: usize,
    attr_type: AttributeType,
}

impl ParticleAccessor {
    /// Tuple width of the bound attribute
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Type of the bound attribute
    #[inline]
    pub fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    #[inline]
    fn range(&self, index: usize) -> std::ops::Range<usize> {
        let start = index * self.count;
        start..start + self.count
    }
}

fn bind(
    particles: &Particles,
    attr: &ParticleAttribute,
    advanced: bool,
) -> Result<ParticleAccessor> {
    if particles.is_headers_only() {
        return Err(Error::HeadersOnly("add_accessor"));
    }
    if advanced {
        return Err(Error::AccessorAfterAdvance(attr.name.clone()));
    }
    let registered = particles
        .attribute_info_by_index(attr.attribute_index)
        .filter(|registered| registered.name == attr.name)
        .ok_or_else(|| Error::not_found(attr.name.as_str()))?;
    Ok(ParticleAccessor {
        attribute_index: registered.attribute_index,
        count: registered.count,
        attr_type: registered.attr_type,
    })
}

#[inline]
fn check_view<T: Element>(accessor: &ParticleAccessor) {
    debug_assert!(
        T::accepts(accessor.attr_type),
        "{} cannot view {}",
        T::NAME,
        accessor.attr_type
    );
}

/// Read-only cursor over a range of particles
#[derive(Debug)]
pub struct ParticleIterator<'a> {
    particles: &'a Particles,
    index: usize,
    end: usize,
    advanced: bool,
}

impl<'a> ParticleIterator<'a> {
    pub(crate) fn new(particles: &'a Particles, start: usize, end: usize) -> Self {
        Self {
            particles,
            index: start,
            end,
            advanced: false,
        }
    }

    /// Bind an accessor for `attr`; must happen before the first advance
    pub fn add_accessor(&mut self, attr: &ParticleAttribute) -> Result<ParticleAccessor> {
        bind(self.particles, attr, self.advanced)
    }

    /// Index of the current particle
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// One past the last particle of the range
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// True once the cursor has moved past the range
    #[inline]
    pub fn is_end(&self) -> bool {
        self.index >= self.end
    }

    /// Move to the next particle; returns false once the end is reached
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.advanced = true;
        if self.index < self.end {
            self.index += 1;
        }
        !self.is_end()
    }

    /// Value of the accessor's attribute at the current particle
    #[inline]
    pub fn data<T: Element>(&self, accessor: &ParticleAccessor) -> &'a [T] {
        check_view::<T>(accessor);
        let column: &'a [T] =
            bytemuck::cast_slice(&self.particles.columns[accessor.attribute_index]);
        &column[accessor.range(self.index)]
    }
}

/// Read-write cursor over a range of particles
#[derive(Debug)]
pub struct ParticleIteratorMut<'a> {
    particles: &'a mut Particles,
    index: usize,
    end: usize,
    advanced: bool,
}

impl<'a> ParticleIteratorMut<'a> {
    pub(crate) fn new(particles: &'a mut Particles, start: usize, end: usize) -> Self {
        Self {
            particles,
            index: start,
            end,
            advanced: false,
        }
    }

    /// Bind an accessor for `attr`; must happen before the first advance
    pub fn add_accessor(&mut self, attr: &ParticleAttribute) -> Result<ParticleAccessor> {
        bind(self.particles, attr, self.advanced)
    }

    /// Index of the current particle
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// One past the last particle of the range
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// True once the cursor has moved past the range
    #[inline]
    pub fn is_end(&self) -> bool {
        self.index >= self.end
    }

    /// Move to the next particle; returns false once the end is reached
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.advanced = true;
        if self.index < self.end {
            self.index += 1;
        }
        !self.is_end()
    }

    /// Value of the accessor's attribute at the current particle
    #[inline]
    pub fn data<T: Element>(&self, accessor: &ParticleAccessor) -> &[T] {
        check_view::<T>(accessor);
        let column: &[T] = bytemuck::cast_slice(&self.particles.columns[accessor.attribute_index]);
        &column[accessor.range(self.index)]
    }

    /// Mutable value of the accessor's attribute at the current particle
    #[inline]
    pub fn data_mut<T: Element>(&mut self, accessor: &ParticleAccessor) -> &mut [T] {
        check_view::<T>(accessor);
        let column: &mut [T] =
            bytemuck::cast_slice_mut(&mut self.particles.columns[accessor.attribute_index]);
        &mut column[accessor.range(self.index)]
    }

    /// The container being walked
    pub fn particles(&self) -> &Particles {
        self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Particles, ParticleAttribute, ParticleAttribute) {
        let mut p = Particles::new();
        let pos = p.add_attribute("position", AttributeType::Vector, 3);
        let id = p.add_attribute("id", AttributeType::Int, 1);
        let mut it = p.add_particles(5);
        let pos_acc = it.add_accessor(&pos).unwrap();
        let id_acc = it.add_accessor(&id).unwrap();
        while !it.is_end() {
            let i = it.index();
            it.data_mut::<f32>(&pos_acc).copy_from_slice(&[i as f32, 2.0 * i as f32, 0.0]);
            it.data_mut::<i32>(&id_acc)[0] = 100 + i as i32;
            it.advance();
        }
        (p, pos, id)
    }

    #[test]
    fn test_walk_reads_what_was_written() {
        let (p, pos, id) = sample();
        let mut it = p.iter();
        let pos_acc = it.add_accessor(&pos).unwrap();
        let id_acc = it.add_accessor(&id).unwrap();
        let mut seen = 0;
        while !it.is_end() {
            let i = it.index();
            assert_eq!(it.data::<f32>(&pos_acc), &[i as f32, 2.0 * i as f32, 0.0]);
            assert_eq!(it.data::<i32>(&id_acc)[0], 100 + i as i32);
            seen += 1;
            it.advance();
        }
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_accessor_after_advance_is_rejected() {
        let (p, pos, _) = sample();
        let mut it = p.iter();
        it.advance();
        assert!(matches!(
            it.add_accessor(&pos),
            Err(Error::AccessorAfterAdvance(_))
        ));
    }

    #[test]
    fn test_range_and_empty() {
        let (p, _, id) = sample();
        let mut it = p.iter_range(3, 99);
        let acc = it.add_accessor(&id).unwrap();
        assert_eq!(it.data::<i32>(&acc)[0], 103);
        assert!(it.advance());
        assert!(!it.advance());
        assert!(it.is_end());

        let empty = Particles::new();
        assert!(empty.iter().is_end());
    }

    #[test]
    fn test_add_particles_iterator_starts_at_new_range() {
        let (mut p, _, id) = sample();
        let mut it = p.add_particles(2);
        assert_eq!(it.index(), 5);
        assert_eq!(it.end(), 7);
        let acc = it.add_accessor(&id).unwrap();
        it.data_mut::<i32>(&acc)[0] = -1;
        assert_eq!(p.data::<i32>(&id, 5)[0], -1);
        assert_eq!(p.data::<i32>(&id, 4)[0], 104);
    }
}
