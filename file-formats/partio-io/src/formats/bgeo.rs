//! Houdini classic binary geometry (`.bgeo`)
//!
//! Big-endian. The file is a header of section counts followed by point
//! attribute definitions, the point table (`x y z w` plus attribute words),
//! primitive attribute definitions, the primitives, detail attribute
//! definitions with their values and finally the extra-section trailer.
//!
//! Particles written by this module form a single particle-run primitive.
//! Detail attributes map to fixed attributes.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, FixedAttribute, ParticleAttribute, Particles};

use super::{
    add_channel, checked_count, grow_to, new_container, position_attribute, read_bytes, skip,
};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

/// `'Bgeo'` read as a big-endian integer
pub const BGEO_MAGIC: u32 = u32::from_be_bytes(*b"Bgeo");

/// Supported classic geometry version
pub const BGEO_VERSION: i32 = 5;

/// Primitive type of a particle run
pub const PARTICLE_RUN: i32 = 0x8000;

const FORMAT: &str = "BGEO";

/// Houdini attribute type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum HoudiniType {
    /// 32-bit floats
    Float = 0,
    /// 32-bit integers
    Int = 1,
    /// Inline strings
    String = 2,
    /// Indexed strings
    Index = 4,
    /// Float vectors
    Vector = 5,
}

impl HoudiniType {
    /// Decode a raw type code
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(HoudiniType::Float),
            1 => Some(HoudiniType::Int),
            2 => Some(HoudiniType::String),
            4 => Some(HoudiniType::Index),
            5 => Some(HoudiniType::Vector),
            _ => None,
        }
    }

    /// Houdini type used to store `attr_type`
    pub fn for_attribute(attr_type: AttributeType) -> Option<Self> {
        match attr_type {
            AttributeType::Float => Some(HoudiniType::Float),
            AttributeType::Int => Some(HoudiniType::Int),
            AttributeType::Vector => Some(HoudiniType::Vector),
            AttributeType::IndexedStr => Some(HoudiniType::Index),
            AttributeType::None => None,
        }
    }

    /// Attribute type this Houdini type loads as
    pub fn attribute_type(self) -> Option<AttributeType> {
        match self {
            HoudiniType::Float => Some(AttributeType::Float),
            HoudiniType::Int => Some(AttributeType::Int),
            HoudiniType::Vector => Some(AttributeType::Vector),
            HoudiniType::Index => Some(AttributeType::IndexedStr),
            HoudiniType::String => None,
        }
    }

    /// Keyword used by the ASCII variant
    pub fn keyword(self) -> &'static str {
        match self {
            HoudiniType::Float => "float",
            HoudiniType::Int => "int",
            HoudiniType::String => "string",
            HoudiniType::Index => "index",
            HoudiniType::Vector => "vector",
        }
    }

    /// Decode an ASCII keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "float" => Some(HoudiniType::Float),
            "int" => Some(HoudiniType::Int),
            "string" => Some(HoudiniType::String),
            "index" => Some(HoudiniType::Index),
            "vector" => Some(HoudiniType::Vector),
            _ => None,
        }
    }
}

/// Section counts from the file header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryCounts {
    /// Number of points
    pub points: usize,
    /// Number of primitives
    pub prims: usize,
    /// Number of point groups
    pub point_groups: usize,
    /// Number of primitive groups
    pub prim_groups: usize,
    /// Number of point attributes
    pub point_attribs: usize,
    /// Number of vertex attributes
    pub vertex_attribs: usize,
    /// Number of primitive attributes
    pub prim_attribs: usize,
    /// Number of detail attributes
    pub detail_attribs: usize,
}

impl GeometryCounts {
    /// Counts for a particle container written as one particle run
    pub fn for_particles(particles: &Particles, point_attribs: usize) -> Self {
        Self {
            points: particles.num_particles(),
            prims: 1,
            point_groups: 0,
            prim_groups: 0,
            point_attribs,
            vertex_attribs: 0,
            prim_attribs: 1,
            detail_attribs: particles.num_fixed_attributes(),
        }
    }
}

/// One attribute definition
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttributeDef {
    pub(crate) name: String,
    pub(crate) size: usize,
    pub(crate) houdini_type: HoudiniType,
    pub(crate) strings: Vec<String>,
}

impl AttributeDef {
    /// Attribute type or an error for string attributes
    pub(crate) fn attribute_type(&self, format: &'static str) -> Result<AttributeType> {
        self.houdini_type.attribute_type().ok_or_else(|| {
            Error::invalid_format(format!(
                "{format}: attribute '{}' has unsupported type {}",
                self.name,
                self.houdini_type.keyword()
            ))
        })
    }
}

/// The `generator` primitive attribute every particle run carries
pub(crate) fn generator_def() -> AttributeDef {
    AttributeDef {
        name: "generator".to_owned(),
        size: 1,
        houdini_type: HoudiniType::Index,
        strings: vec!["papi".to_owned()],
    }
}

/// Houdini classic binary geometry codec
#[derive(Debug, Clone, Copy, Default)]
pub struct BgeoCodec;

impl ParticleCodec for BgeoCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "bgeo";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        let counts = read_header(&mut input)?;
        debug!("{FORMAT}: {counts:?}");

        let mut particles = new_container(headers_only);
        let position = particles.try_add_attribute("position", AttributeType::Vector, 3)?;

        let mut attrs = Vec::new();
        for _ in 0..counts.point_attribs {
            let def = read_attribute_def(&mut input)?;
            let attr_type = def.attribute_type(FORMAT)?;
            let attr = add_channel(&mut particles, FORMAT, &def.name, attr_type, def.size)?;
            if let Some(attr) = &attr {
                for s in &def.strings {
                    particles.register_indexed_str(attr, s)?;
                }
            }
            attrs.push((attr, def.size));
        }

        if headers_only {
            drop(particles.try_add_particles(counts.points)?);
            return Ok(particles);
        }

        for index in 0..counts.points {
            grow_to(&mut particles, index, counts.points)?;
            let p = particles.data_write::<f32>(&position, index);
            for value in p.iter_mut() {
                *value = input.read_f32::<BigEndian>()?;
            }
            let _w = input.read_f32::<BigEndian>()?;

            for (attr, size) in &attrs {
                match attr {
                    Some(attr) => {
                        for word in particles.data_write::<u32>(attr, index) {
                            *word = input.read_u32::<BigEndian>()?;
                        }
                    }
                    None => skip(&mut input, *size as u64 * 4)?,
                }
            }
        }

        if let Err(e) = read_trailing_sections(&mut input, &counts, &mut particles) {
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
        write_header(&mut output, &counts)?;

        for attr in &attrs {
            let def = point_def(particles, attr)?;
            write_attribute_def(&mut output, &def)?;
        }

        for index in 0..particles.num_particles() {
            match &position {
                Some(position) => {
                    for &v in particles.data::<f32>(position, index) {
                        output.write_f32::<BigEndian>(v)?;
                    }
                }
                None => {
                    for _ in 0..3 {
                        output.write_f32::<BigEndian>(0.0)?;
                    }
                }
            }
            output.write_f32::<BigEndian>(1.0)?;
            for attr in &attrs {
                for &word in particles.data::<u32>(attr, index) {
                    output.write_u32::<BigEndian>(word)?;
                }
            }
        }

        write_attribute_def(&mut output, &generator_def())?;
        output.write_i32::<BigEndian>(PARTICLE_RUN)?;
        output.write_i32::<BigEndian>(len_i32(counts.points)?)?;
        for index in 0..counts.points {
            write_point_index(&mut output, index, counts.points)?;
        }
        output.write_i32::<BigEndian>(0)?;

        for attr in particles.fixed_attributes() {
            let def = fixed_def(particles, attr)?;
            write_attribute_def(&mut output, &def)?;
        }
        for attr in particles.fixed_attributes() {
            for &word in particles.fixed_data::<u32>(attr)? {
                output.write_u32::<BigEndian>(word)?;
            }
        }

        output.write_u8(0x00)?;
        output.write_u8(0xff)?;
        Ok(())
    }
}

/// Definition describing a per-particle attribute
pub(crate) fn point_def(particles: &Particles, attr: &ParticleAttribute) -> Result<AttributeDef> {
    let houdini_type = HoudiniType::for_attribute(attr.attr_type)
        .ok_or_else(|| Error::invalid_format(format!("attribute '{}' has no type", attr.name)))?;
    let strings = if houdini_type == HoudiniType::Index {
        particles.indexed_strs(attr).to_vec()
    } else {
        Vec::new()
    };
    Ok(AttributeDef {
        name: attr.name.clone(),
        size: attr.count,
        houdini_type,
        strings,
    })
}

/// Definition describing a fixed attribute
pub(crate) fn fixed_def(particles: &Particles, attr: &FixedAttribute) -> Result<AttributeDef> {
    let houdini_type = HoudiniType::for_attribute(attr.attr_type)
        .ok_or_else(|| Error::invalid_format(format!("attribute '{}' has no type", attr.name)))?;
    let strings = if houdini_type == HoudiniType::Index {
        particles.fixed_indexed_strs(attr).to_vec()
    } else {
        Vec::new()
    };
    Ok(AttributeDef {
        name: attr.name.clone(),
        size: attr.count,
        houdini_type,
        strings,
    })
}

fn read_header<R: Read>(input: &mut R) -> Result<GeometryCounts> {
    let magic = input.read_u32::<BigEndian>()?;
    if magic != BGEO_MAGIC {
        return Err(Error::InvalidMagic {
            format: FORMAT,
            found: magic.into(),
            expected: BGEO_MAGIC.into(),
        });
    }
    let version_char = input.read_u8()?;
    let version = input.read_i32::<BigEndian>()?;
    if version_char != b'V' || version != BGEO_VERSION {
        return Err(Error::unsupported_version(
            FORMAT,
            format!("{}{version}", char::from(version_char)),
        ));
    }

    let mut fields = [0usize; 8];
    for (field, what) in fields.iter_mut().zip([
        "point",
        "primitive",
        "point group",
        "primitive group",
        "point attribute",
        "vertex attribute",
        "primitive attribute",
        "detail attribute",
    ]) {
        *field = checked_count(input.read_i32::<BigEndian>()?, what)?;
    }
    let [
        points,
        prims,
        point_groups,
        prim_groups,
        point_attribs,
        vertex_attribs,
        prim_attribs,
        detail_attribs,
    ] = fields;
    Ok(GeometryCounts {
        points,
        prims,
        point_groups,
        prim_groups,
        point_attribs,
        vertex_attribs,
        prim_attribs,
        detail_attribs,
    })
}

fn write_header<W: Write>(output: &mut W, counts: &GeometryCounts) -> Result<()> {
    output.write_u32::<BigEndian>(BGEO_MAGIC)?;
    output.write_u8(b'V')?;
    output.write_i32::<BigEndian>(BGEO_VERSION)?;
    for count in [
        counts.points,
        counts.prims,
        counts.point_groups,
        counts.prim_groups,
        counts.point_attribs,
        counts.vertex_attribs,
        counts.prim_attribs,
        counts.detail_attribs,
    ] {
        output.write_i32::<BigEndian>(len_i32(count)?)?;
    }
    Ok(())
}

/// Vertex, primitive and detail sections following the points
fn read_trailing_sections<R: Read>(
    input: &mut R,
    counts: &GeometryCounts,
    particles: &mut Particles,
) -> Result<()> {
    for _ in 0..counts.vertex_attribs {
        read_attribute_def(input)?;
    }
    let prim_words: usize = (0..counts.prim_attribs)
        .map(|_| read_attribute_def(input).map(|def| def.size))
        .sum::<Result<usize>>()?;

    for _ in 0..counts.prims {
        let prim_type = input.read_i32::<BigEndian>()?;
        if prim_type != PARTICLE_RUN {
            return Err(Error::invalid_format(format!(
                "primitive type {prim_type:#x} is not a particle run"
            )));
        }
        let vertices = checked_count(input.read_i32::<BigEndian>()?, "vertex")?;
        let index_size = if counts.points > usize::from(u16::MAX) { 4 } else { 2 };
        skip(input, (vertices * index_size + prim_words * 4) as u64)?;
    }

    let defs = (0..counts.detail_attribs)
        .map(|_| read_attribute_def(input))
        .collect::<Result<Vec<_>>>()?;
    let mut values = Vec::with_capacity(defs.len());
    for def in &defs {
        let mut words = vec![0u32; def.size];
        input.read_u32_into::<BigEndian>(&mut words)?;
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
    Ok(())
}

fn read_houdini_str<R: Read>(input: &mut R) -> Result<String> {
    let len = input.read_u16::<BigEndian>()?;
    let bytes = read_bytes(input, usize::from(len))?;
    String::from_utf8(bytes).map_err(|e| Error::invalid_format(format!("{FORMAT}: bad name: {e}")))
}

fn write_houdini_str<W: Write>(output: &mut W, s: &str) -> Result<()> {
    let len = u16::try_from(s.len())
        .map_err(|_| Error::invalid_format(format!("{FORMAT}: string too long: {s}")))?;
    output.write_u16::<BigEndian>(len)?;
    output.write_all(s.as_bytes())?;
    Ok(())
}

fn read_attribute_def<R: Read>(input: &mut R) -> Result<AttributeDef> {
    let name = read_houdini_str(input)?;
    let size = usize::from(input.read_u16::<BigEndian>()?);
    let raw = input.read_i32::<BigEndian>()?;
    let houdini_type = HoudiniType::from_raw(raw).ok_or_else(|| {
        Error::invalid_format(format!("{FORMAT}: attribute '{name}' has unknown type {raw}"))
    })?;

    let mut strings = Vec::new();
    match houdini_type {
        HoudiniType::Index => {
            let count = checked_count(input.read_i32::<BigEndian>()?, "index string")?;
            for _ in 0..count {
                strings.push(read_houdini_str(input)?);
            }
        }
        HoudiniType::String => {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: string attribute '{name}' is not supported"
            )));
        }
        HoudiniType::Float | HoudiniType::Int | HoudiniType::Vector => {
            skip(input, size as u64 * 4)?;
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
    write_houdini_str(output, &def.name)?;
    let size = u16::try_from(def.size)
        .map_err(|_| Error::invalid_format(format!("{FORMAT}: '{}' is too wide", def.name)))?;
    output.write_u16::<BigEndian>(size)?;
    output.write_i32::<BigEndian>(def.houdini_type as i32)?;
    if def.houdini_type == HoudiniType::Index {
        output.write_i32::<BigEndian>(len_i32(def.strings.len())?)?;
        for s in &def.strings {
            write_houdini_str(output, s)?;
        }
    } else {
        for _ in 0..def.size {
            output.write_i32::<BigEndian>(0)?;
        }
    }
    Ok(())
}

fn write_point_index<W: Write>(output: &mut W, index: usize, points: usize) -> Result<()> {
    if points > usize::from(u16::MAX) {
        output.write_i32::<BigEndian>(len_i32(index)?)?;
    } else {
        output.write_u16::<BigEndian>(index as u16)?;
    }
    Ok(())
}

fn len_i32(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::invalid_format(format!("{FORMAT}: count {len} too large")))
}
