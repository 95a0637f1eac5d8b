//! RealFlow particle caches (`.rpc`)
//!
//! Little-endian. The header and channel table are followed by one zlib
//! stream per channel, each at the absolute offset recorded in the table.
//! Every channel table entry carries value limits (min, max and average
//! elements, then min and max magnitudes) that readers skip.

use std::io::{Cursor, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles};

use super::{add_channel, new_container, read_bytes, skip};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;
use crate::zstream::{ZlibReader, deflate};

/// Signature at the start of every file
pub const RPC_MAGIC: i32 = 0x70FA_BADA;

/// The only version this codec reads and writes
pub const RPC_VERSION: u32 = 3;

const FORMAT: &str = "RPC";
const HEADER_SIZE: u64 = 40;

/// Channel element types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RpcType {
    /// Three floats
    Float3 = 1,
    /// Three doubles
    Double3 = 2,
    /// Two floats
    Float2 = 3,
    /// Unsigned 64-bit integer
    UInt64 = 4,
    /// Unsigned 16-bit integer
    UInt16 = 5,
    /// Unsigned 8-bit integer
    UInt8 = 6,
    /// Signed 32-bit integer
    Int32 = 7,
    /// One byte boolean
    Bool = 8,
    /// One float
    Float = 9,
    /// One double
    Double = 10,
    /// Four floats
    Float4 = 11,
}

impl RpcType {
    /// Decode a raw type code
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => RpcType::Float3,
            2 => RpcType::Double3,
            3 => RpcType::Float2,
            4 => RpcType::UInt64,
            5 => RpcType::UInt16,
            6 => RpcType::UInt8,
            7 => RpcType::Int32,
            8 => RpcType::Bool,
            9 => RpcType::Float,
            10 => RpcType::Double,
            11 => RpcType::Float4,
            _ => return None,
        })
    }

    /// Components per particle
    pub fn components(self) -> usize {
        match self {
            RpcType::Float3 | RpcType::Double3 => 3,
            RpcType::Float2 => 2,
            RpcType::Float4 => 4,
            _ => 1,
        }
    }

    /// Bytes per component
    pub fn component_size(self) -> usize {
        match self {
            RpcType::UInt8 | RpcType::Bool => 1,
            RpcType::UInt16 => 2,
            RpcType::Float3
            | RpcType::Float2
            | RpcType::Float4
            | RpcType::Float
            | RpcType::Int32 => 4,
            RpcType::Double3 | RpcType::Double | RpcType::UInt64 => 8,
        }
    }

    /// Bytes per particle
    pub fn element_size(self) -> usize {
        self.components() * self.component_size()
    }

    /// Attribute type and count this channel loads as
    pub fn attribute(self) -> (AttributeType, usize) {
        match self {
            RpcType::Float3 | RpcType::Double3 => (AttributeType::Vector, 3),
            RpcType::Float2 => (AttributeType::Float, 2),
            RpcType::Float4 => (AttributeType::Float, 4),
            RpcType::Float | RpcType::Double => (AttributeType::Float, 1),
            RpcType::UInt64 | RpcType::UInt16 | RpcType::UInt8 | RpcType::Int32 | RpcType::Bool => {
                (AttributeType::Int, 1)
            }
        }
    }

    /// Channel type used to store `attr`, if any
    pub fn for_attribute(attr: &ParticleAttribute) -> Option<Self> {
        match (attr.attr_type, attr.count) {
            (AttributeType::Float, 1) => Some(RpcType::Float),
            (AttributeType::Float, 2) => Some(RpcType::Float2),
            (AttributeType::Float | AttributeType::Vector, 3) => Some(RpcType::Float3),
            (AttributeType::Float, 4) => Some(RpcType::Float4),
            (AttributeType::Int, 1) => Some(RpcType::Int32),
            _ => None,
        }
    }

    fn is_float(self) -> bool {
        matches!(
            self,
            RpcType::Float3
                | RpcType::Double3
                | RpcType::Float2
                | RpcType::Float
                | RpcType::Double
                | RpcType::Float4
        )
    }

    /// Decode one component
    fn decode(self, bytes: &[u8]) -> u32 {
        match self {
            RpcType::Float3 | RpcType::Float2 | RpcType::Float4 | RpcType::Float => {
                LittleEndian::read_u32(bytes)
            }
            RpcType::Double3 | RpcType::Double => (LittleEndian::read_f64(bytes) as f32).to_bits(),
            RpcType::UInt64 => LittleEndian::read_u64(bytes) as u32,
            RpcType::UInt16 => u32::from(LittleEndian::read_u16(bytes)),
            RpcType::UInt8 | RpcType::Bool => u32::from(bytes[0]),
            RpcType::Int32 => LittleEndian::read_u32(bytes),
        }
    }
}

/// File header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpcHeader {
    /// Number of particles
    pub particles: u32,
    /// Number of channels
    pub channels: u32,
    /// Bounding box minimum
    pub bbox_min: [f32; 3],
    /// Bounding box maximum
    pub bbox_max: [f32; 3],
}

/// One channel table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name
    pub name: String,
    /// Raw type code
    pub raw_type: u32,
    /// Absolute offset of the compressed data
    pub offset: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
}

/// RealFlow particle cache codec
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcCodec;

impl ParticleCodec for RpcCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "rpc";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        if headers_only {
            let (header, channels) = read_tables(&mut input)?;
            let mut particles = new_container(true);
            drop(particles.try_add_particles(header.particles as usize)?);
            for channel in &channels {
                register(&mut particles, channel)?;
            }
            return Ok(particles);
        }

        // Channel offsets are absolute, so the whole file is needed
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let (header, channels) = read_tables(&mut Cursor::new(bytes.as_slice()))?;
        debug!("{FORMAT}: {header:?}");

        let count = header.particles as usize;
        let mut particles = new_container(false);

        for channel in &channels {
            let Some(rpc_type) = RpcType::from_raw(channel.raw_type) else {
                continue;
            };
            let start = usize::try_from(channel.offset).unwrap_or(usize::MAX);
            let size = usize::try_from(channel.compressed_size).unwrap_or(usize::MAX);
            let end = start.saturating_add(size);
            let compressed = bytes.get(start..end).ok_or_else(|| {
                Error::invalid_format(format!(
                    "{FORMAT}: channel '{}' data lies outside the file",
                    channel.name
                ))
            })?;

            // Inflate before allocating so the declared count is backed by data
            let len = count.saturating_mul(rpc_type.element_size());
            let mut data = Vec::new();
            ZlibReader::new(compressed)
                .take(len as u64)
                .read_to_end(&mut data)
                .map_err(Error::from_inflate)?;
            if data.len() != len {
                return Err(Error::invalid_format(format!(
                    "{FORMAT}: channel '{}' holds {} of {len} bytes",
                    channel.name,
                    data.len()
                )));
            }

            if particles.num_particles() < count {
                drop(particles.try_add_particles(count)?);
            }
            let Some((_, attr)) = register(&mut particles, channel)? else {
                continue;
            };
            let size = rpc_type.component_size();
            let column = particles.column_mut::<u32>(&attr)?;
            for (value, bytes) in column.iter_mut().zip(data.chunks_exact(size)) {
                *value = rpc_type.decode(bytes);
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
            match RpcType::for_attribute(attr) {
                Some(rpc_type) => channels.push((attr, rpc_type)),
                None => warn!(
                    "{FORMAT}: cannot store {}[{}] attribute '{}'",
                    attr.attr_type, attr.count, attr.name
                ),
            }
        }

        let mut payloads = Vec::with_capacity(channels.len());
        for (attr, _) in &channels {
            let mut raw = Vec::with_capacity(count * attr.count * 4);
            for &word in particles.column::<u32>(attr)? {
                raw.write_u32::<LittleEndian>(word)?;
            }
            payloads.push(deflate(&raw)?);
        }

        let table_size: u64 = channels
            .iter()
            .map(|(attr, rpc_type)| {
                (4 + attr.name.len() + 1 + 4 + 8 + 8 + limits_size(*rpc_type)) as u64
            })
            .sum();

        let (bbox_min, bbox_max) = bounding_box(particles);
        output.write_i32::<LittleEndian>(RPC_MAGIC)?;
        output.write_u32::<LittleEndian>(RPC_VERSION)?;
        output.write_u32::<LittleEndian>(len_u32(count)?)?;
        output.write_u32::<LittleEndian>(len_u32(channels.len())?)?;
        for v in bbox_min.iter().chain(&bbox_max) {
            output.write_f32::<LittleEndian>(*v)?;
        }

        let mut offset = HEADER_SIZE + table_size;
        for ((attr, rpc_type), payload) in channels.iter().zip(&payloads) {
            output.write_u32::<LittleEndian>(len_u32(attr.name.len() + 1)?)?;
            output.write_all(attr.name.as_bytes())?;
            output.write_u8(0)?;
            output.write_u32::<LittleEndian>(*rpc_type as u32)?;
            output.write_u64::<LittleEndian>(offset)?;
            output.write_u64::<LittleEndian>(payload.len() as u64)?;
            write_limits(&mut output, particles, attr, *rpc_type)?;
            offset += payload.len() as u64;
        }
        for payload in &payloads {
            output.write_all(payload)?;
        }
        Ok(())
    }
}

fn register(
    particles: &mut Particles,
    channel: &ChannelInfo,
) -> Result<Option<(RpcType, ParticleAttribute)>> {
    let Some(rpc_type) = RpcType::from_raw(channel.raw_type) else {
        return Ok(None);
    };
    let (attr_type, count) = rpc_type.attribute();
    let attr = add_channel(particles, FORMAT, &channel.name, attr_type, count)?;
    Ok(attr.map(|attr| (rpc_type, attr)))
}

/// Read the header and channel table
pub fn read_tables<R: Read>(input: &mut R) -> Result<(RpcHeader, Vec<ChannelInfo>)> {
    let magic = input.read_i32::<LittleEndian>()?;
    if magic != RPC_MAGIC {
        return Err(Error::InvalidMagic {
            format: FORMAT,
            found: u64::from(magic as u32),
            expected: u64::from(RPC_MAGIC as u32),
        });
    }
    let version = input.read_u32::<LittleEndian>()?;
    if version != RPC_VERSION {
        return Err(Error::unsupported_version(FORMAT, version));
    }
    let particles = input.read_u32::<LittleEndian>()?;
    let channel_count = input.read_u32::<LittleEndian>()?;
    let mut bbox = [0f32; 6];
    input.read_f32_into::<LittleEndian>(&mut bbox)?;
    let header = RpcHeader {
        particles,
        channels: channel_count,
        bbox_min: [bbox[0], bbox[1], bbox[2]],
        bbox_max: [bbox[3], bbox[4], bbox[5]],
    };

    let mut channels = Vec::new();
    for _ in 0..channel_count {
        let name_len = input.read_u32::<LittleEndian>()? as usize;
        if name_len < 2 {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: channel name length {name_len} is too short"
            )));
        }
        let raw_name = read_bytes(input, name_len)?;
        let name = String::from_utf8_lossy(&raw_name[..name_len - 1])
            .trim_end_matches('\0')
            .to_owned();
        let raw_type = input.read_u32::<LittleEndian>()?;
        let offset = input.read_u64::<LittleEndian>()?;
        let compressed_size = input.read_u64::<LittleEndian>()?;
        let rpc_type = RpcType::from_raw(raw_type).ok_or_else(|| {
            // Without the type the limit block size is unknown
            Error::invalid_format(format!("{FORMAT}: channel '{name}' has unknown type {raw_type}"))
        })?;
        skip(input, limits_size(rpc_type) as u64)?;
        channels.push(ChannelInfo {
            name,
            raw_type,
            offset,
            compressed_size,
        });
    }
    Ok((header, channels))
}

fn limits_size(rpc_type: RpcType) -> usize {
    3 * rpc_type.element_size() + 2 * rpc_type.component_size()
}

fn bounding_box(particles: &Particles) -> ([f32; 3], [f32; 3]) {
    let Some(position) = super::position_attribute(particles) else {
        return ([0.0; 3], [0.0; 3]);
    };
    let Ok(values) = particles.column::<f32>(&position) else {
        return ([0.0; 3], [0.0; 3]);
    };
    if values.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in values.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}

/// Min, max and average elements followed by min and max magnitudes
fn write_limits<W: Write>(
    output: &mut W,
    particles: &Particles,
    attr: &ParticleAttribute,
    rpc_type: RpcType,
) -> Result<()> {
    let components = rpc_type.components();
    let count = particles.num_particles();

    if rpc_type.is_float() {
        let values = particles.column::<f32>(attr)?;
        let mut min = vec![0f32; components];
        let mut max = vec![0f32; components];
        let mut sum = vec![0f64; components];
        let (mut min_mag, mut max_mag) = (0f32, 0f32);
        for (i, element) in values.chunks_exact(components).enumerate() {
            let magnitude = element.iter().map(|v| v * v).sum::<f32>().sqrt();
            if i == 0 {
                min.copy_from_slice(element);
                max.copy_from_slice(element);
                min_mag = magnitude;
                max_mag = magnitude;
            }
            for c in 0..components {
                min[c] = min[c].min(element[c]);
                max[c] = max[c].max(element[c]);
                sum[c] += f64::from(element[c]);
            }
            min_mag = min_mag.min(magnitude);
            max_mag = max_mag.max(magnitude);
        }
        let average: Vec<f32> = sum.iter().map(|s| (s / count.max(1) as f64) as f32).collect();
        for v in min.iter().chain(&max).chain(&average) {
            output.write_f32::<LittleEndian>(*v)?;
        }
        output.write_f32::<LittleEndian>(min_mag)?;
        output.write_f32::<LittleEndian>(max_mag)?;
    } else {
        let values = particles.column::<i32>(attr)?;
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
        let average = (sum / count.max(1) as i64) as i32;
        let min_mag = values.iter().map(|v| v.unsigned_abs()).min().unwrap_or(0);
        let max_mag = values.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0);
        for v in [min, max, average] {
            output.write_i32::<LittleEndian>(v)?;
        }
        output.write_u32::<LittleEndian>(min_mag)?;
        output.write_u32::<LittleEndian>(max_mag)?;
    }
    Ok(())
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::invalid_format(format!("{FORMAT}: count {len} too large")))
}
