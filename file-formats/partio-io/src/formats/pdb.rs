//! Maya particle databases (`.pdb`)
//!
//! The 32-bit record layout, little-endian. A 60-byte file header is
//! followed by one block per channel: an I/O header, a channel record, the
//! NUL-terminated name, a data record and then the values of every
//! particle.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles};

use super::{add_channel, new_container, read_bytes, skip};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

/// Magic number opening the file header
pub const PDB_MAGIC: i32 = 670;

/// Magic number opening every channel's I/O header
pub const CHANNEL_IO_MAGIC: i32 = 99;

/// Size of the file header
pub const HEADER_SIZE: usize = 60;

/// Size of the 32-bit channel record
pub const CHANNEL_RECORD_SIZE: usize = 36;

/// Size of the 32-bit channel data record
pub const CHANNEL_DATA_SIZE: usize = 20;

const FORMAT: &str = "PDB";

/// Channel value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PdbType {
    /// Three floats
    Vector = 1,
    /// Floats
    Real = 2,
    /// 32-bit integers
    Long = 3,
}

impl PdbType {
    /// Decode a raw type code
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(PdbType::Vector),
            2 => Some(PdbType::Real),
            3 => Some(PdbType::Long),
            _ => None,
        }
    }

    /// Attribute type this channel loads as
    pub fn attribute_type(self) -> AttributeType {
        match self {
            PdbType::Vector => AttributeType::Vector,
            PdbType::Real => AttributeType::Float,
            PdbType::Long => AttributeType::Int,
        }
    }

    /// Channel type used to store `attr`, if any
    pub fn for_attribute(attr: &ParticleAttribute) -> Option<Self> {
        match (attr.attr_type, attr.count) {
            (AttributeType::Vector, 3) => Some(PdbType::Vector),
            (AttributeType::Float, 1) => Some(PdbType::Real),
            (AttributeType::Int, 1) => Some(PdbType::Long),
            _ => None,
        }
    }
}

/// File header fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdbHeader {
    /// Byte-swap marker
    pub swap: u16,
    /// File version
    pub version: f32,
    /// Frame time
    pub time: f32,
    /// Number of particles
    pub particles: u32,
    /// Number of channels
    pub channels: u32,
}

impl PdbHeader {
    /// Parse the fixed-size header
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let magic = input.read_i32::<LittleEndian>()?;
        if magic != PDB_MAGIC {
            return Err(Error::InvalidMagic {
                format: FORMAT,
                found: u64::from(magic as u32),
                expected: PDB_MAGIC as u64,
            });
        }
        let swap = input.read_u16::<LittleEndian>()?;
        skip(input, 2)?;
        let version = input.read_f32::<LittleEndian>()?;
        let time = input.read_f32::<LittleEndian>()?;
        let particles = input.read_u32::<LittleEndian>()?;
        let channels = input.read_u32::<LittleEndian>()?;
        // padding and the data pointer
        skip(input, 32 + 4)?;
        Ok(Self {
            swap,
            version,
            time,
            particles,
            channels,
        })
    }

    /// Serialize the fixed-size header
    pub fn write<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_i32::<LittleEndian>(PDB_MAGIC)?;
        output.write_u16::<LittleEndian>(self.swap)?;
        output.write_all(&[0; 2])?;
        output.write_f32::<LittleEndian>(self.version)?;
        output.write_f32::<LittleEndian>(self.time)?;
        output.write_u32::<LittleEndian>(self.particles)?;
        output.write_u32::<LittleEndian>(self.channels)?;
        output.write_all(&[0; 32])?;
        output.write_i32::<LittleEndian>(0)?;
        Ok(())
    }
}

/// Read a NUL-terminated name
fn read_name<R: Read>(input: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        match input.read_u8()? {
            0 => break,
            byte => bytes.push(byte),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Maya particle database codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbCodec;

impl ParticleCodec for PdbCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "pdb";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        let header = PdbHeader::read(&mut input)?;
        debug!("{FORMAT}: {header:?}");

        let count = header.particles as usize;
        let mut particles = new_container(headers_only);
        if headers_only {
            drop(particles.try_add_particles(count)?);
        }

        for _ in 0..header.channels {
            let io_magic = input.read_i32::<LittleEndian>()?;
            if io_magic != CHANNEL_IO_MAGIC {
                return Err(Error::invalid_format(format!(
                    "{FORMAT}: bad channel header magic {io_magic}"
                )));
            }
            // swap, encoding and I/O type
            skip(&mut input, 4)?;

            // Channel32: name pointer, then the type, rest unused on read
            skip(&mut input, 4)?;
            let raw_type = input.read_u16::<LittleEndian>()?;
            skip(&mut input, (CHANNEL_RECORD_SIZE - 6) as u64)?;

            let name = read_name(&mut input)?;

            let _data_type = input.read_i32::<LittleEndian>()?;
            let element_size = input.read_u32::<LittleEndian>()? as usize;
            skip(&mut input, (CHANNEL_DATA_SIZE - 8) as u64)?;
            let data_len = (count as u64).saturating_mul(element_size as u64);

            let pdb_type = match PdbType::from_raw(raw_type) {
                Some(t) if element_size > 0 && element_size % 4 == 0 => t,
                _ => {
                    warn!(
                        "{FORMAT}: skipping channel '{name}' of type {raw_type} \
                         with element size {element_size}"
                    );
                    skip(&mut input, data_len)?;
                    continue;
                }
            };
            let (attr_type, width) = (pdb_type.attribute_type(), element_size / 4);
            if headers_only {
                add_channel(&mut particles, FORMAT, &name, attr_type, width)?;
                skip(&mut input, data_len)?;
                continue;
            }

            // Storage is only allocated once the channel's data is known to exist
            let data = read_bytes(&mut input, data_len as usize)?;
            if particles.num_particles() < count {
                drop(particles.try_add_particles(count)?);
            }
            if let Some(attr) = add_channel(&mut particles, FORMAT, &name, attr_type, width)? {
                LittleEndian::read_u32_into(&data, particles.column_mut::<u32>(&attr)?);
            }
        }
        if particles.num_particles() < count {
            drop(particles.try_add_particles(count)?);
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let count = particles.num_particles();
        let mut channels = Vec::new();
        for attr in particles.attributes() {
            match PdbType::for_attribute(attr) {
                Some(pdb_type) => channels.push((attr, pdb_type)),
                None => warn!(
                    "{FORMAT}: cannot store {}[{}] attribute '{}'",
                    attr.attr_type, attr.count, attr.name
                ),
            }
        }

        let num_particles = u32::try_from(count).map_err(|_| {
            Error::invalid_format(format!("{FORMAT}: {count} particles is too many"))
        })?;
        PdbHeader {
            swap: 1,
            version: 1.0,
            time: 0.0,
            particles: num_particles,
            channels: channels.len() as u32,
        }
        .write(&mut output)?;

        for (attr, pdb_type) in channels {
            output.write_i32::<LittleEndian>(CHANNEL_IO_MAGIC)?;
            output.write_u16::<LittleEndian>(1)?;
            output.write_u8(0)?;
            output.write_u8(0)?;

            // Channel32
            output.write_u32::<LittleEndian>(0)?;
            output.write_u16::<LittleEndian>(pdb_type as u16)?;
            output.write_u16::<LittleEndian>(0)?;
            output.write_u32::<LittleEndian>(0)?;
            output.write_u32::<LittleEndian>(0)?;
            output.write_u32::<LittleEndian>(num_particles.wrapping_sub(1))?;
            output.write_all(&[0; 4])?;
            output.write_u32::<LittleEndian>(0)?;
            output.write_u32::<LittleEndian>(0)?;
            output.write_u32::<LittleEndian>(0)?;

            output.write_all(attr.name.as_bytes())?;
            output.write_u8(0)?;

            // Channel_Data32
            output.write_i32::<LittleEndian>(i32::from(pdb_type as u16))?;
            output.write_u32::<LittleEndian>((attr.count * 4) as u32)?;
            output.write_u32::<LittleEndian>(num_particles)?;
            output.write_i32::<LittleEndian>(1)?;
            output.write_i32::<LittleEndian>(0)?;

            for &word in particles.column::<u32>(attr)? {
                output.write_u32::<LittleEndian>(word)?;
            }
        }
        Ok(())
    }
}
