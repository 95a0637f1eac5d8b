//! Krakatoa particle files (`.prt`)
//!
//! Little-endian. A 56-byte header and a channel table are followed by one
//! zlib stream holding fixed-size particle records. Each channel names its
//! byte offset inside the record, so records are inflated one at a time and
//! channels decoded in place.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles};

use super::{add_channel, checked_count, grow_to, new_container, read_bytes, skip};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;
use crate::zstream::{ZlibReader, ZlibWriter};

/// File magic
pub const PRT_MAGIC: [u8; 8] = [0xc0, b'P', b'R', b'T', b'\r', b'\n', 0x1a, b'\n'];

/// Header signature, NUL padded
pub const PRT_SIGNATURE: &[u8; 32] = b"Extensible Particle Format\0\0\0\0\0\0";

/// Size of the fixed header this module writes
pub const PRT_HEADER_SIZE: u32 = 0x38;

/// Size of one channel record
pub const CHANNEL_RECORD_SIZE: i32 = 44;

const FORMAT: &str = "PRT";
const CHANNEL_NAME_LEN: usize = 32;

/// Channel element types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelType {
    /// Signed 16-bit integer
    Int16 = 0,
    /// Signed 32-bit integer
    Int32 = 1,
    /// Signed 64-bit integer
    Int64 = 2,
    /// IEEE half float
    Float16 = 3,
    /// IEEE single float
    Float32 = 4,
    /// IEEE double float
    Float64 = 5,
    /// Unsigned 16-bit integer
    UInt16 = 6,
    /// Unsigned 32-bit integer
    UInt32 = 7,
    /// Unsigned 64-bit integer
    UInt64 = 8,
    /// Signed 8-bit integer
    Int8 = 9,
    /// Unsigned 8-bit integer
    UInt8 = 10,
}

impl ChannelType {
    /// Decode a raw type code
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => ChannelType::Int16,
            1 => ChannelType::Int32,
            2 => ChannelType::Int64,
            3 => ChannelType::Float16,
            4 => ChannelType::Float32,
            5 => ChannelType::Float64,
            6 => ChannelType::UInt16,
            7 => ChannelType::UInt32,
            8 => ChannelType::UInt64,
            9 => ChannelType::Int8,
            10 => ChannelType::UInt8,
            _ => return None,
        })
    }

    /// Bytes per component
    pub fn size(self) -> usize {
        match self {
            ChannelType::Int8 | ChannelType::UInt8 => 1,
            ChannelType::Int16 | ChannelType::UInt16 | ChannelType::Float16 => 2,
            ChannelType::Int32 | ChannelType::UInt32 | ChannelType::Float32 => 4,
            ChannelType::Int64 | ChannelType::UInt64 | ChannelType::Float64 => 8,
        }
    }

    /// Whether components are floating point
    pub fn is_float(self) -> bool {
        matches!(
            self,
            ChannelType::Float16 | ChannelType::Float32 | ChannelType::Float64
        )
    }

    /// Decode one component as an integer
    fn read_int(self, bytes: &[u8]) -> i32 {
        match self {
            ChannelType::Int8 => i32::from(bytes[0] as i8),
            ChannelType::UInt8 => i32::from(bytes[0]),
            ChannelType::Int16 => i32::from(LittleEndian::read_i16(bytes)),
            ChannelType::UInt16 => i32::from(LittleEndian::read_u16(bytes)),
            ChannelType::Int32 => LittleEndian::read_i32(bytes),
            ChannelType::UInt32 => LittleEndian::read_u32(bytes) as i32,
            ChannelType::Int64 => LittleEndian::read_i64(bytes) as i32,
            ChannelType::UInt64 => LittleEndian::read_u64(bytes) as i32,
            ChannelType::Float16 | ChannelType::Float32 | ChannelType::Float64 => 0,
        }
    }

    /// Decode one component as a float
    fn read_float(self, bytes: &[u8]) -> f32 {
        match self {
            ChannelType::Float16 => half_to_f32(LittleEndian::read_u16(bytes)),
            ChannelType::Float32 => LittleEndian::read_f32(bytes),
            ChannelType::Float64 => LittleEndian::read_f64(bytes) as f32,
            _ => 0.0,
        }
    }
}

/// Convert an IEEE 754 half-precision bit pattern to `f32`
pub fn half_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits & 0x8000) << 16;
    let exponent = u32::from((bits >> 10) & 0x1f);
    let mantissa = u32::from(bits & 0x03ff);

    let magnitude = match (exponent, mantissa) {
        (0, 0) => 0,
        (0, m) => {
            // Subnormal: m * 2^-24 is exact in f32
            let value = m as f32 * f32::powi(2.0, -24);
            return if sign == 0 { value } else { -value };
        }
        (0x1f, m) => 0x7f80_0000 | (m << 13),
        (e, m) => ((e + 112) << 23) | (m << 13),
    };
    f32::from_bits(sign | magnitude)
}

/// One entry of the channel table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel name as stored in the file
    pub name: String,
    /// Raw element type code
    pub raw_type: u32,
    /// Components per particle
    pub arity: usize,
    /// Byte offset inside the particle record
    pub offset: usize,
}

/// Convert a stored channel name to an attribute name
///
/// Krakatoa capitalizes channels (`Position`); attributes start lowercase.
pub fn attribute_name(channel: &str) -> String {
    let mut chars = channel.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            first.to_ascii_lowercase().to_string() + chars.as_str()
        }
        _ => channel.to_owned(),
    }
}

/// Convert an attribute name to a stored channel name
pub fn channel_name(attribute: &str) -> String {
    let mut chars = attribute.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            first.to_ascii_uppercase().to_string() + chars.as_str()
        }
        _ => attribute.to_owned(),
    }
}

/// Krakatoa particle file codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PrtCodec;

impl ParticleCodec for PrtCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "prt";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        let mut magic = [0u8; 8];
        input.read_exact(&mut magic)?;
        if magic != PRT_MAGIC {
            return Err(Error::InvalidMagic {
                format: FORMAT,
                found: u64::from_be_bytes(magic),
                expected: u64::from_be_bytes(PRT_MAGIC),
            });
        }
        let header_size = input.read_u32::<LittleEndian>()?;
        let mut signature = [0u8; 32];
        input.read_exact(&mut signature)?;
        let version = input.read_u32::<LittleEndian>()?;
        let count = checked_count(input.read_u64::<LittleEndian>()?, "particle")?;
        if header_size > PRT_HEADER_SIZE {
            skip(&mut input, u64::from(header_size - PRT_HEADER_SIZE))?;
        }
        debug!("{FORMAT}: version {version}, {count} particles");

        let _reserved = input.read_i32::<LittleEndian>()?;
        let channel_count = checked_count(input.read_i32::<LittleEndian>()?, "channel")?;
        let record_size = input.read_i32::<LittleEndian>()?;
        if record_size < CHANNEL_RECORD_SIZE {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: channel record size {record_size} is too small"
            )));
        }

        let mut particles = new_container(headers_only);
        let mut particle_size = 0;
        let mut bound: Vec<(Channel, ChannelType, ParticleAttribute)> = Vec::new();
        for _ in 0..channel_count {
            let channel = read_channel(&mut input)?;
            skip(&mut input, (record_size - CHANNEL_RECORD_SIZE) as u64)?;

            let Some(channel_type) = ChannelType::from_raw(channel.raw_type) else {
                warn!(
                    "{FORMAT}: skipping channel '{}' of unknown type {}",
                    channel.name, channel.raw_type
                );
                continue;
            };
            particle_size = particle_size.max(channel.offset + channel_type.size() * channel.arity);

            let attr_type = if !channel_type.is_float() {
                AttributeType::Int
            } else if channel.arity == 3 {
                AttributeType::Vector
            } else {
                AttributeType::Float
            };
            let name = attribute_name(&channel.name);
            if let Some(attr) =
                add_channel(&mut particles, FORMAT, &name, attr_type, channel.arity)?
            {
                bound.push((channel, channel_type, attr));
            }
        }

        if headers_only {
            drop(particles.try_add_particles(count)?);
            return Ok(particles);
        }

        let mut record = Vec::new();
        record.try_reserve_exact(particle_size).map_err(|_| {
            Error::invalid_format(format!("{FORMAT}: particle record of {particle_size} bytes"))
        })?;
        record.resize(particle_size, 0);

        let mut body = ZlibReader::new(input);
        for index in 0..count {
            grow_to(&mut particles, index, count)?;
            body.read_exact(&mut record).map_err(Error::from_inflate)?;
            for (channel, channel_type, attr) in &bound {
                let size = channel_type.size();
                if attr.attr_type == AttributeType::Int {
                    let values = particles.data_write::<i32>(attr, index);
                    for (component, value) in values.iter_mut().enumerate() {
                        let start = channel.offset + component * size;
                        *value = channel_type.read_int(&record[start..start + size]);
                    }
                } else {
                    let values = particles.data_write::<f32>(attr, index);
                    for (component, value) in values.iter_mut().enumerate() {
                        let start = channel.offset + component * size;
                        *value = channel_type.read_float(&record[start..start + size]);
                    }
                }
            }
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let attrs: Vec<&ParticleAttribute> = particles
            .attributes()
            .iter()
            .filter(|attr| {
                let keep = attr.attr_type != AttributeType::IndexedStr;
                if !keep {
                    warn!("{FORMAT}: cannot store indexed strings, skipping '{}'", attr.name);
                }
                keep
            })
            .collect();

        output.write_all(&PRT_MAGIC)?;
        output.write_u32::<LittleEndian>(PRT_HEADER_SIZE)?;
        output.write_all(PRT_SIGNATURE)?;
        output.write_u32::<LittleEndian>(1)?;
        output.write_u64::<LittleEndian>(particles.num_particles() as u64)?;
        output.write_i32::<LittleEndian>(4)?;
        output.write_i32::<LittleEndian>(attrs.len() as i32)?;
        output.write_i32::<LittleEndian>(CHANNEL_RECORD_SIZE)?;

        let mut offset = 0;
        for attr in &attrs {
            let channel_type = if attr.attr_type == AttributeType::Int {
                ChannelType::Int32
            } else {
                ChannelType::Float32
            };
            write_channel(
                &mut output,
                &Channel {
                    name: channel_name(&attr.name),
                    raw_type: channel_type as u32,
                    arity: attr.count,
                    offset,
                },
            )?;
            offset += channel_type.size() * attr.count;
        }

        if particles.num_particles() == 0 {
            return Ok(());
        }
        let mut body = ZlibWriter::new(output);
        for index in 0..particles.num_particles() {
            for attr in &attrs {
                for &word in particles.data::<u32>(attr, index) {
                    body.write_u32::<LittleEndian>(word)?;
                }
            }
        }
        body.finish()?;
        Ok(())
    }
}

fn read_channel<R: Read>(input: &mut R) -> Result<Channel> {
    let raw_name = read_bytes(input, CHANNEL_NAME_LEN)?;
    let end = raw_name.iter().position(|&b| b == 0).unwrap_or(CHANNEL_NAME_LEN);
    let name = String::from_utf8_lossy(&raw_name[..end]).into_owned();
    let raw_type = input.read_u32::<LittleEndian>()?;
    let arity = input.read_u32::<LittleEndian>()? as usize;
    let offset = input.read_u32::<LittleEndian>()? as usize;
    Ok(Channel {
        name,
        raw_type,
        arity,
        offset,
    })
}

fn write_channel<W: Write>(output: &mut W, channel: &Channel) -> Result<()> {
    let bytes = channel.name.as_bytes();
    if bytes.len() >= CHANNEL_NAME_LEN {
        return Err(Error::invalid_format(format!(
            "{FORMAT}: channel name '{}' exceeds {} bytes",
            channel.name,
            CHANNEL_NAME_LEN - 1
        )));
    }
    let mut name = [0u8; CHANNEL_NAME_LEN];
    name[..bytes.len()].copy_from_slice(bytes);
    output.write_all(&name)?;
    output.write_u32::<LittleEndian>(channel.raw_type)?;
    output.write_u32::<LittleEndian>(channel.arity as u32)?;
    output.write_u32::<LittleEndian>(channel.offset as u32)?;
    Ok(())
}
