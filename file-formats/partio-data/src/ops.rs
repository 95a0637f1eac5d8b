//! Whole-container operations: cloning, merging and summaries

use std::collections::HashMap;
use std::fmt;

use crate::attribute::{AttributeType, FixedAttribute, ParticleAttribute};
use crate::error::{Error, Result};
use crate::particles::Particles;

/// Create an empty container with the same attributes as `source`
///
/// Fixed attributes keep their values and indexed-string tables are copied.
/// When `filter` is given, only per-particle attributes it accepts are kept.
pub fn clone_schema(
    source: &Particles,
    filter: Option<&dyn Fn(&ParticleAttribute) -> bool>,
) -> Result<Particles> {
    let mut target = Particles::new();
    copy_fixed(source, &mut target)?;
    for attr in source.attributes() {
        if filter.is_some_and(|keep| !keep(attr)) {
            continue;
        }
        let added = target.try_add_attribute(&attr.name, attr.attr_type, attr.count)?;
        for value in source.indexed_strs(attr) {
            target.register_indexed_str(&added, value)?;
        }
    }
    Ok(target)
}

/// Deep copy of `source`, optionally including every particle value
///
/// A headers-only source yields a container with its schema but no values.
pub fn clone_particles(source: &Particles, with_particles: bool) -> Result<Particles> {
    let mut target = clone_schema(source, None)?;
    if !with_particles || source.is_headers_only() {
        return Ok(target);
    }

    drop(target.add_particles(source.num_particles()));
    for (src, dst) in source.attributes().iter().zip(target.attributes().to_vec()) {
        let values = source.column::<u32>(src)?;
        target.column_mut::<u32>(&dst)?.copy_from_slice(values);
    }
    Ok(target)
}

fn copy_fixed(source: &Particles, target: &mut Particles) -> Result<()> {
    for attr in source.fixed_attributes() {
        let added = target.try_add_fixed_attribute(&attr.name, attr.attr_type, attr.count)?;
        copy_fixed_value(source, attr, target, &added)?;
    }
    Ok(())
}

fn copy_fixed_value(
    source: &Particles,
    src: &FixedAttribute,
    target: &mut Particles,
    dst: &FixedAttribute,
) -> Result<()> {
    if src.attr_type == AttributeType::IndexedStr {
        let strings = source.fixed_indexed_strs(src);
        let tokens = source.fixed_data::<i32>(src)?.to_vec();
        let remapped = tokens
            .into_iter()
            .map(|token| match strings.get(token as usize) {
                Some(s) if token >= 0 => target.register_fixed_indexed_str(dst, s),
                _ => Ok(token),
            })
            .collect::<Result<Vec<_>>>()?;
        target.fixed_data_write::<i32>(dst)?.copy_from_slice(&remapped);
    } else {
        let values = source.fixed_data::<u32>(src)?;
        target.fixed_data_write::<u32>(dst)?.copy_from_slice(values);
    }
    Ok(())
}

/// Merge `delta` into `base`
///
/// With an `identifier` naming an INT attribute present in both containers,
/// delta particles whose identifier matches a base particle overwrite it and
/// the rest are appended. Without one every delta particle is appended.
/// Attributes only present in `delta` are added to `base`; attributes whose
/// type or count differ between the two are skipped with a warning. Fixed
/// attributes are merged the same way, with `delta` taking precedence.
///
/// Both containers must hold data. `base` is left untouched when the merge
/// is rejected.
pub fn merge(base: &mut Particles, delta: &Particles, identifier: Option<&str>) -> Result<()> {
    if base.is_headers_only() || delta.is_headers_only() {
        return Err(Error::HeadersOnly("merge"));
    }

    // Resolve every delta column before base changes shape
    let mut plan = Vec::with_capacity(delta.num_attributes());
    for src in delta.attributes() {
        let dst = match base.attribute_info(&src.name) {
            Some(dst) if dst.attr_type == src.attr_type && dst.count == src.count => Some(dst),
            Some(dst) => {
                log::warn!(
                    "merge: skipping '{}' ({} x{} in delta, {} x{} in base)",
                    src.name,
                    src.attr_type,
                    src.count,
                    dst.attr_type,
                    dst.count
                );
                continue;
            }
            None => None,
        };
        plan.push((src, dst, delta.column::<u32>(src)?));
    }

    let id_pair = identifier.and_then(|name| {
        let base_id = base.attribute_info(name)?;
        let delta_id = delta.attribute_info(name)?;
        if base_id.attr_type == AttributeType::Int && delta_id.attr_type == AttributeType::Int {
            Some((base_id, delta_id))
        } else {
            log::warn!("merge: identifier '{name}' is not INT in both containers, appending");
            None
        }
    });

    let mut id_to_index = HashMap::new();
    if let Some((base_id, _)) = &id_pair {
        for (index, id) in base.column::<i32>(base_id)?.iter().step_by(base_id.count).enumerate() {
            id_to_index.insert(*id, index);
        }
    }

    // Destination index for every delta particle
    let mut destination = Vec::with_capacity(delta.num_particles());
    let mut appended = 0;
    let first_new = base.num_particles();
    if let Some((_, delta_id)) = &id_pair {
        for id in delta.column::<i32>(delta_id)?.iter().step_by(delta_id.count) {
            match id_to_index.get(id) {
                Some(&index) => destination.push(index),
                None => {
                    destination.push(first_new + appended);
                    appended += 1;
                }
            }
        }
    } else {
        destination.extend(first_new..first_new + delta.num_particles());
        appended = delta.num_particles();
    }
    drop(base.try_add_particles(appended)?);

    for (src, dst, values) in plan {
        let dst = match dst {
            Some(dst) => dst,
            None => base.try_add_attribute(&src.name, src.attr_type, src.count)?,
        };
        let token_map = if src.attr_type == AttributeType::IndexedStr {
            delta
                .indexed_strs(src)
                .iter()
                .map(|s| base.register_indexed_str(&dst, s))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        for (delta_index, &base_index) in destination.iter().enumerate() {
            let source = &values[delta_index * src.count..(delta_index + 1) * src.count];
            let target = base.data_write::<u32>(&dst, base_index);
            if token_map.is_empty() {
                target.copy_from_slice(source);
            } else {
                for (t, &s) in target.iter_mut().zip(source) {
                    *t = token_map.get(s as usize).map_or(s, |&token| token as u32);
                }
            }
        }
    }

    for src in delta.fixed_attributes() {
        let dst = match base.fixed_attribute_info(&src.name) {
            Some(dst) if dst.attr_type == src.attr_type && dst.count == src.count => dst,
            Some(_) => {
                log::warn!("merge: skipping fixed attribute '{}' with mismatched layout", src.name);
                continue;
            }
            None => base.try_add_fixed_attribute(&src.name, src.attr_type, src.count)?,
        };
        copy_fixed_value(delta, src, base, &dst)?;
    }

    log::debug!(
        "merged {} particles ({} appended, {} overwritten)",
        delta.num_particles(),
        appended,
        delta.num_particles() - appended
    );
    Ok(())
}

/// Human-readable dump of a container's schema and first particles
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    particles: &'a Particles,
    max_particles: usize,
}

impl<'a> Summary<'a> {
    /// Summary showing up to ten particles
    pub fn new(particles: &'a Particles) -> Self {
        Self {
            particles,
            max_particles: 10,
        }
    }

    /// Change how many particles are printed
    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = max_particles;
        self
    }
}

/// Shorthand for [`Summary::new`]
pub fn summary(particles: &Particles) -> Summary<'_> {
    Summary::new(particles)
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.particles;
        writeln!(f, "Particle count {}", p.num_particles())?;
        writeln!(f, "Attribute count {}", p.num_attributes())?;
        for attr in p.attributes() {
            writeln!(f, "attribute {} {} {}", attr.name, attr.attr_type, attr.count)?;
        }
        for attr in p.fixed_attributes() {
            writeln!(f, "fixed attribute {} {} {}", attr.name, attr.attr_type, attr.count)?;
        }
        if p.is_headers_only() {
            return writeln!(f, "(headers only)");
        }

        let mut it = p.iter();
        let accessors = p
            .attributes()
            .iter()
            .map(|attr| it.add_accessor(attr))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| fmt::Error)?;
        let mut printed = 0;
        while !it.is_end() && printed < self.max_particles {
            write!(f, "{}:", it.index())?;
            for accessor in &accessors {
                if accessor.attr_type().is_float() {
                    for v in it.data::<f32>(accessor) {
                        write!(f, " {v}")?;
                    }
                } else {
                    for v in it.data::<i32>(accessor) {
                        write!(f, " {v}")?;
                    }
                }
            }
            writeln!(f)?;
            printed += 1;
            it.advance();
        }
        Ok(())
    }
}
