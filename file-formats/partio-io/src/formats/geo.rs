//! Houdini classic ASCII geometry (`.geo`)
//!
//! The text counterpart of [`bgeo`](super::bgeo): the same sections written
//! as whitespace-separated tokens, with parentheses around point attribute
//! values and brackets around primitive attribute values.

use std::fmt::Display;
use std::io::{Read, Write};

use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles};

use super::bgeo::{
    AttributeDef, GeometryCounts, HoudiniType, fixed_def, generator_def, point_def,
};
use super::text::Tokens;
use super::{add_channel, grow_to, new_container, position_attribute};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

const FORMAT: &str = "GEO";
const SEPARATORS: &[char] = &['(', ')', '[', ']'];

/// Houdini classic ASCII geometry codec
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoCodec;

impl ParticleCodec for GeoCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "geo";

    fn read<R: Read>(input: R, headers_only: bool) -> Result<Particles> {
        let mut tokens = Tokens::read(input, SEPARATORS, FORMAT)?;
        let counts = read_header(&mut tokens)?;
        debug!("{FORMAT}: {counts:?}");

        let mut particles = new_container(headers_only);
        let position = particles.try_add_attribute("position", AttributeType::Vector, 3)?;

        let mut attrs = Vec::new();
        if counts.point_attribs > 0 {
            tokens.expect("PointAttrib")?;
        }
        for _ in 0..counts.point_attribs {
            let def = read_attribute_def(&mut tokens)?;
            let attr_type = def.attribute_type(FORMAT)?;
            let attr = add_channel(&mut particles, FORMAT, &def.name, attr_type, def.size)?;
            if let Some(attr) = &attr {
                for s in &def.strings {
                    particles.register_indexed_str(attr, s)?;
                }
            }
            attrs.push((attr, def));
        }

        if headers_only {
            drop(particles.try_add_particles(counts.points)?);
            return Ok(particles);
        }

        for index in 0..counts.points {
            grow_to(&mut particles, index, counts.points)?;
            for axis in 0..3 {
                let value = tokens.parse::<f32>()?;
                particles.data_write::<f32>(&position, index)[axis] = value;
            }
            tokens.parse::<f32>()?;

            for (attr, def) in &attrs {
                for component in 0..def.size {
                    match (attr, def.houdini_type) {
                        (Some(attr), HoudiniType::Float | HoudiniType::Vector) => {
                            let value = tokens.parse::<f32>()?;
                            particles.data_write::<f32>(attr, index)[component] = value;
                        }
                        (Some(attr), _) => {
                            let value = tokens.parse::<i32>()?;
                            particles.data_write::<i32>(attr, index)[component] = value;
                        }
                        (None, _) => {
                            tokens.token()?;
                        }
                    }
                }
            }
        }

        if let Err(e) = read_trailing_sections(&mut tokens, &counts, &mut particles) {
            warn!("{FORMAT}: ignoring trailing sections: {e}");
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let position = position_attribute(particles);
        if position.is_none() {
            warn!("{FORMAT}: no 'position' attribute, writing points at the origin");
        }
        let attrs: Vec<ParticleAttribute> = particles
            .attributes()
            .iter()
            .filter(|attr| {
                Some(attr.attribute_index) != position.as_ref().map(|p| p.attribute_index)
            })
            .cloned()
            .collect();
        let counts = GeometryCounts::for_particles(particles, attrs.len());

        writeln!(output, "PGEOMETRY V5")?;
        writeln!(output, "NPoints {} NPrims {}", counts.points, counts.prims)?;
        writeln!(
            output,
            "NPointGroups {} NPrimGroups {}",
            counts.point_groups, counts.prim_groups
        )?;
        writeln!(
            output,
            "NPointAttrib {} NVertexAttrib {} NPrimAttrib {} NAttrib {}",
            counts.point_attribs, counts.vertex_attribs, counts.prim_attribs, counts.detail_attribs
        )?;

        if !attrs.is_empty() {
            writeln!(output, "PointAttrib")?;
            for attr in &attrs {
                write_attribute_def(&mut output, &point_def(particles, attr)?)?;
            }
        }

        for index in 0..particles.num_particles() {
            match &position {
                Some(position) => {
                    let p = particles.data::<f32>(position, index);
                    write!(output, "{} {} {} 1", p[0], p[1], p[2])?;
                }
                None => write!(output, "0 0 0 1")?,
            }
            if !attrs.is_empty() {
                write!(output, " (")?;
                let mut first = true;
                for attr in &attrs {
                    if attr.attr_type.is_float() {
                        write_values(&mut output, particles.data::<f32>(attr, index), &mut first)?;
                    } else {
                        write_values(&mut output, particles.data::<i32>(attr, index), &mut first)?;
                    }
                }
                write!(output, ")")?;
            }
            writeln!(output)?;
        }

        writeln!(output, "PrimitiveAttrib")?;
        write_attribute_def(&mut output, &generator_def())?;
        write!(output, "Part {}", counts.points)?;
        for index in 0..counts.points {
            write!(output, " {index}")?;
        }
        writeln!(output, " [0]")?;

        if particles.num_fixed_attributes() > 0 {
            writeln!(output, "DetailAttrib")?;
            for attr in particles.fixed_attributes() {
                write_attribute_def(&mut output, &fixed_def(particles, attr)?)?;
            }
            write!(output, " (")?;
            let mut first = true;
            for attr in particles.fixed_attributes() {
                if attr.attr_type.is_float() {
                    write_values(&mut output, particles.fixed_data::<f32>(attr)?, &mut first)?;
                } else {
                    write_values(&mut output, particles.fixed_data::<i32>(attr)?, &mut first)?;
                }
            }
            writeln!(output, ")")?;
        }

        writeln!(output, "beginExtra")?;
        writeln!(output, "endExtra")?;
        Ok(())
    }
}

fn write_values<W: Write, T: Display>(
    output: &mut W,
    values: &[T],
    first: &mut bool,
) -> Result<()> {
    for value in values {
        if *first {
            write!(output, "{value}")?;
            *first = false;
        } else {
            write!(output, " {value}")?;
        }
    }
    Ok(())
}

fn read_header(tokens: &mut Tokens) -> Result<GeometryCounts> {
    tokens.expect("PGEOMETRY")?;
    let version = tokens.token()?;
    if version != "V5" {
        return Err(Error::unsupported_version(FORMAT, version));
    }

    let mut field = |key: &str| -> Result<usize> {
        tokens.expect(key)?;
        tokens.parse()
    };
    Ok(GeometryCounts {
        points: field("NPoints")?,
        prims: field("NPrims")?,
        point_groups: field("NPointGroups")?,
        prim_groups: field("NPrimGroups")?,
        point_attribs: field("NPointAttrib")?,
        vertex_attribs: field("NVertexAttrib")?,
        prim_attribs: field("NPrimAttrib")?,
        detail_attribs: field("NAttrib")?,
    })
}

fn read_attribute_def(tokens: &mut Tokens) -> Result<AttributeDef> {
    let name = tokens.token()?.to_owned();
    let size = tokens.parse::<usize>()?;
    let keyword = tokens.token()?;
    let houdini_type = HoudiniType::from_keyword(keyword).ok_or_else(|| {
        Error::invalid_format(format!("{FORMAT}: attribute '{name}' has unknown type '{keyword}'"))
    })?;

    let mut strings = Vec::new();
    if houdini_type == HoudiniType::Index {
        let count = tokens.parse::<usize>()?;
        for _ in 0..count {
            strings.push(tokens.token()?.to_owned());
        }
    } else {
        for _ in 0..size {
            tokens.token()?;
        }
    }
    Ok(AttributeDef {
        name,
        size,
        houdini_type,
        strings,
    })
}

fn write_attribute_def<W: Write>(output: &mut W, def: &AttributeDef) -> Result<()> {
    write!(output, "{} {} {}", def.name, def.size, def.houdini_type.keyword())?;
    if def.houdini_type == HoudiniType::Index {
        write!(output, " {}", def.strings.len())?;
        for s in &def.strings {
            write!(output, " {s}")?;
        }
    } else {
        for _ in 0..def.size {
            write!(output, " 0")?;
        }
    }
    writeln!(output)?;
    Ok(())
}

fn read_trailing_sections(
    tokens: &mut Tokens,
    counts: &GeometryCounts,
    particles: &mut Particles,
) -> Result<()> {
    if counts.vertex_attribs > 0 {
        tokens.expect("VertexAttrib")?;
        for _ in 0..counts.vertex_attribs {
            read_attribute_def(tokens)?;
        }
    }
    let mut prim_words: usize = 0;
    if counts.prim_attribs > 0 {
        tokens.expect("PrimitiveAttrib")?;
        for _ in 0..counts.prim_attribs {
            prim_words = prim_words.saturating_add(read_attribute_def(tokens)?.size);
        }
    }

    let mut remaining = counts.prims;
    while remaining > 0 {
        let runs = match tokens.token()? {
            "Part" => 1,
            "Run" => {
                let runs = tokens.parse::<usize>()?;
                tokens.expect("Part")?;
                runs
            }
            other => {
                return Err(Error::invalid_format(format!(
                    "{FORMAT}: unsupported primitive '{other}'"
                )));
            }
        };
        for _ in 0..runs.min(remaining) {
            let vertices = tokens.parse::<usize>()?;
            for _ in 0..vertices.saturating_add(prim_words) {
                tokens.token()?;
            }
        }
        remaining = remaining.saturating_sub(runs);
    }

    if counts.detail_attribs > 0 {
        tokens.expect("DetailAttrib")?;
        let defs = (0..counts.detail_attribs)
            .map(|_| read_attribute_def(tokens))
            .collect::<Result<Vec<_>>>()?;
        let mut values = Vec::with_capacity(defs.len());
        for def in &defs {
            let mut words = Vec::new();
            for _ in 0..def.size {
                let word = match def.houdini_type {
                    HoudiniType::Float | HoudiniType::Vector => tokens.parse::<f32>()?.to_bits(),
                    _ => tokens.parse::<i32>()? as u32,
                };
                words.push(word);
            }
            values.push(words);
        }

        for (def, words) in defs.iter().zip(values) {
            let attr_type = def.attribute_type(FORMAT)?;
            let attr = particles.try_add_fixed_attribute(&def.name, attr_type, def.size)?;
            for s in &def.strings {
                particles.register_fixed_indexed_str(&attr, s)?;
            }
            particles.fixed_data_write::<u32>(&attr)?.copy_from_slice(&words);
        }
    }
    Ok(())
}
