//! Softimage ICE caches (`.icecache`)
//!
//! Little-endian. Attribute definitions precede the data, which is stored
//! attribute by attribute. Except for `PointPosition`, every attribute's
//! data is split into chunks of [`CHUNK_PARTICLES`] particles, each opened by
//! a `u32` flag marking a constant chunk.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles, POSITION_ATTRIBUTE};

use super::{add_channel, new_container, read_bytes, skip};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

/// File signature
pub const ICECACHE_MAGIC: [u8; 8] = *b"ICECACHE";

/// The only version this codec reads and writes
pub const ICECACHE_VERSION: u32 = 103;

/// Particles per constant-flag chunk
pub const CHUNK_PARTICLES: usize = 4000;

/// Softimage's name for the position attribute
pub const POINT_POSITION: &str = "PointPosition";

const FORMAT: &str = "ICECACHE";

const DATA_LONG: u32 = 2;
const DATA_FLOAT: u32 = 4;
const DATA_VECTOR3: u32 = 16;
const DATA_QUATERNION: u32 = 64;
const DATA_COLOR4: u32 = 512;
const DATA_LOCATION: u32 = 2048;
const DATA_ROTATION: u32 = 16384;

const STRUCTURE_SINGLE: u32 = 1;
const STRUCTURE_ARRAY: u32 = 2;
const CONTEXT_COMPONENT_0D: u32 = 2;
const CATEGORY_BUILTIN: u32 = 1;
const CATEGORY_CUSTOM: u32 = 2;

/// Cache header following the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IceCacheHeader {
    /// Format version
    pub version: u32,
    /// Object type code
    pub object_type: u32,
    /// Number of points
    pub point_count: u32,
    /// Number of edges
    pub edge_count: u32,
    /// Number of polygons
    pub polygon_count: u32,
    /// Number of samples
    pub sample_count: u32,
    /// Substep index
    pub substep: u32,
    /// Number of user data blobs
    pub user_data_blobs: u32,
    /// Number of attribute definitions
    pub attribute_count: u32,
}

impl IceCacheHeader {
    /// Parse the signature and header
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        input.read_exact(&mut magic)?;
        if magic != ICECACHE_MAGIC {
            return Err(Error::InvalidMagic {
                format: FORMAT,
                found: u64::from_be_bytes(magic),
                expected: u64::from_be_bytes(ICECACHE_MAGIC),
            });
        }
        let mut fields = [0u32; 9];
        input.read_u32_into::<LittleEndian>(&mut fields)?;
        let header = Self {
            version: fields[0],
            object_type: fields[1],
            point_count: fields[2],
            edge_count: fields[3],
            polygon_count: fields[4],
            sample_count: fields[5],
            substep: fields[6],
            user_data_blobs: fields[7],
            attribute_count: fields[8],
        };
        if header.version != ICECACHE_VERSION {
            return Err(Error::unsupported_version(FORMAT, header.version));
        }
        Ok(header)
    }

    /// Serialize the signature and header
    pub fn write<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_all(&ICECACHE_MAGIC)?;
        for field in [
            self.version,
            self.object_type,
            self.point_count,
            self.edge_count,
            self.polygon_count,
            self.sample_count,
            self.substep,
            self.user_data_blobs,
            self.attribute_count,
        ] {
            output.write_u32::<LittleEndian>(field)?;
        }
        Ok(())
    }
}

/// One attribute definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceAttribute {
    /// Name as stored in the cache
    pub name: String,
    /// Softimage data type code
    pub data_type: u32,
    /// Structure type (single or array)
    pub struct_type: u32,
    /// Evaluation context
    pub context_type: u32,
    /// Owning object id
    pub object_id: u32,
    /// Builtin or custom
    pub category: u32,
}

impl IceAttribute {
    /// Attribute type and count for this data type, if supported
    pub fn attribute(&self) -> Option<(AttributeType, usize)> {
        match self.data_type {
            DATA_LONG => Some((AttributeType::Int, 1)),
            DATA_FLOAT => Some((AttributeType::Float, 1)),
            DATA_VECTOR3 => Some((AttributeType::Vector, 3)),
            DATA_QUATERNION | DATA_COLOR4 | DATA_ROTATION => Some((AttributeType::Float, 4)),
            _ => None,
        }
    }

    /// Name in the particle container
    pub fn particle_name(&self) -> &str {
        if self.name == POINT_POSITION {
            POSITION_ATTRIBUTE
        } else {
            &self.name
        }
    }

    fn is_position(&self) -> bool {
        self.name == POINT_POSITION
    }

    /// Parse a definition, skipping any point locator payload
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let len = input.read_u32::<LittleEndian>()? as usize;
        let padded = len.div_ceil(4) * 4;
        let raw = read_bytes(input, padded)?;
        let name = String::from_utf8_lossy(&raw[..len]).into_owned();
        let mut fields = [0u32; 5];
        input.read_u32_into::<LittleEndian>(&mut fields)?;
        if fields[0] == DATA_LOCATION {
            let size = input.read_u32::<LittleEndian>()?;
            skip(input, u64::from(size))?;
        }
        Ok(Self {
            name,
            data_type: fields[0],
            struct_type: fields[1],
            context_type: fields[2],
            object_id: fields[3],
            category: fields[4],
        })
    }

    /// Serialize a definition with the name padded by `_`
    pub fn write<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_u32::<LittleEndian>(self.name.len() as u32)?;
        output.write_all(self.name.as_bytes())?;
        let padding = self.name.len().div_ceil(4) * 4 - self.name.len();
        output.write_all(&b"___"[..padding])?;
        for field in [
            self.data_type,
            self.struct_type,
            self.context_type,
            self.object_id,
            self.category,
        ] {
            output.write_u32::<LittleEndian>(field)?;
        }
        Ok(())
    }

    /// Definition used to store `attr`, if its type can be stored
    pub fn for_attribute(attr: &ParticleAttribute) -> Option<Self> {
        let data_type = match (attr.attr_type, attr.count) {
            (AttributeType::Float, 1) => DATA_FLOAT,
            (AttributeType::Float, 4) => DATA_COLOR4,
            (AttributeType::Vector, 3) => DATA_VECTOR3,
            (AttributeType::Int, 1) => DATA_LONG,
            _ => return None,
        };
        let is_position = attr.name == POSITION_ATTRIBUTE;
        Some(Self {
            name: if is_position {
                POINT_POSITION.to_owned()
            } else {
                attr.name.clone()
            },
            data_type,
            struct_type: STRUCTURE_SINGLE,
            context_type: CONTEXT_COMPONENT_0D,
            object_id: 0,
            category: if is_position {
                CATEGORY_BUILTIN
            } else {
                CATEGORY_CUSTOM
            },
        })
    }
}

/// Fill `column` from the chunked data of one attribute
fn read_chunked<R: Read>(
    input: &mut R,
    column: &mut [u32],
    width: usize,
    struct_type: u32,
) -> Result<()> {
    let mut tuple = vec![0u32; width];
    let chunk_len = CHUNK_PARTICLES * width;
    let mut start = 0;
    while start < column.len() {
        let end = (start + chunk_len).min(column.len());
        let constant = input.read_u32::<LittleEndian>()? != 0;
        if !constant {
            input.read_u32_into::<LittleEndian>(&mut column[start..end])?;
            start = end;
            continue;
        }
        input.read_u32_into::<LittleEndian>(&mut tuple)?;
        // an array attribute stores one value for every remaining particle
        let fill_end = if struct_type == STRUCTURE_ARRAY {
            column.len()
        } else {
            end
        };
        for slot in column[start..fill_end].chunks_exact_mut(width) {
            slot.copy_from_slice(&tuple);
        }
        start = fill_end;
    }
    Ok(())
}

/// Softimage ICE cache codec
#[derive(Debug, Clone, Copy, Default)]
pub struct IceCacheCodec;

impl ParticleCodec for IceCacheCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "icecache";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        let header = IceCacheHeader::read(&mut input)?;
        debug!("{FORMAT}: {header:?}");

        let count = header.point_count as usize;
        let mut particles = new_container(headers_only);

        let mut definitions = Vec::new();
        for _ in 0..header.attribute_count {
            let definition = IceAttribute::read(&mut input)?;
            let attr = match definition.attribute() {
                Some((attr_type, count)) => add_channel(
                    &mut particles,
                    FORMAT,
                    definition.particle_name(),
                    attr_type,
                    count,
                )?,
                None => {
                    warn!(
                        "{FORMAT}: attribute '{}' has unsupported data type {}",
                        definition.name, definition.data_type
                    );
                    None
                }
            };
            definitions.push((definition, attr));
        }
        // Constant chunks let a small file describe many points, so the
        // count is only bounded by what can be allocated
        drop(particles.try_add_particles(count)?);
        if headers_only {
            return Ok(particles);
        }

        let mut scratch = Vec::new();
        for (definition, attr) in &definitions {
            let (column, width) = match (attr, definition.attribute()) {
                (Some(attr), _) => (particles.column_mut::<u32>(attr)?, attr.count),
                (None, Some((_, width))) => {
                    // rejected by the container, read and discard
                    let len = count.saturating_mul(width);
                    scratch
                        .try_reserve_exact(len.saturating_sub(scratch.len()))
                        .map_err(|_| partio_data::Error::AllocationFailed { particles: count })?;
                    scratch.resize(len, 0);
                    (scratch.as_mut_slice(), width)
                }
                (None, None) => {
                    warn!(
                        "{FORMAT}: cannot locate data after '{}', keeping attributes read so far",
                        definition.name
                    );
                    break;
                }
            };
            if definition.is_position() {
                input.read_u32_into::<LittleEndian>(column)?;
            } else {
                read_chunked(&mut input, column, width, definition.struct_type)?;
            }
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let mut definitions = Vec::new();
        for attr in particles.attributes() {
            if attr.name.starts_with('_') {
                continue;
            }
            match IceAttribute::for_attribute(attr) {
                Some(definition) => definitions.push((definition, attr)),
                None => warn!(
                    "{FORMAT}: cannot store {}[{}] attribute '{}'",
                    attr.attr_type, attr.count, attr.name
                ),
            }
        }
        definitions.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

        let count = particles.num_particles();
        IceCacheHeader {
            version: ICECACHE_VERSION,
            point_count: u32::try_from(count).map_err(|_| {
                Error::invalid_format(format!("{FORMAT}: {count} particles is too many"))
            })?,
            attribute_count: definitions.len() as u32,
            ..IceCacheHeader::default()
        }
        .write(&mut output)?;

        for (definition, _) in &definitions {
            definition.write(&mut output)?;
        }
        for (definition, attr) in &definitions {
            let column = particles.column::<u32>(attr)?;
            if definition.is_position() {
                for &word in column {
                    output.write_u32::<LittleEndian>(word)?;
                }
                continue;
            }
            for chunk in column.chunks(CHUNK_PARTICLES * attr.count) {
                output.write_u32::<LittleEndian>(0)?;
                for &word in chunk {
                    output.write_u32::<LittleEndian>(word)?;
                }
            }
        }
        Ok(())
    }
}
