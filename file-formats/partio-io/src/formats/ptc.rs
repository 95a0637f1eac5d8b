//! RenderMan point clouds (`.ptc`)
//!
//! Little-endian. Every point carries a position, a packed normal and a
//! radius ahead of the declared channels, so those three attributes are
//! always present after a read.

use std::f64::consts::PI;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use partio_data::{AttributeType, ParticleAttribute, Particles, POSITION_ATTRIBUTE};

use super::{grow_to, new_container, require_position, skip};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

/// `pptc` read as a little-endian `i32`
pub const PTC_MAGIC: i32 = i32::from_le_bytes(*b"pptc");

/// Newest version the reader understands
pub const PTC_MAX_VERSION: i32 = 2;

/// Packed normal pair meaning "no normal"
pub const ZERO_NORMAL: (u16, u16) = (u16::MAX, u16::MAX);

const FORMAT: &str = "PTC";

const NORMAL_ATTRIBUTE: &str = "normal";
const RADIUS_ATTRIBUTE: &str = "radius";

const EYE_TO_SCREEN: [[f32; 4]; 4] = [
    [1.8, 0.0, 0.0, 0.0],
    [0.0, 2.41, 0.0, 0.0],
    [0.0, 0.0, 1.0, 1.0],
    [0.0, 0.0, -0.1, 0.0],
];

/// Decode a packed normal
pub fn unpack_normal(phi: u16, z: u16) -> [f32; 3] {
    if (phi, z) == ZERO_NORMAL {
        return [0.0; 3];
    }
    let nz = 2.0 * (f32::from(z) / 65535.0) - 1.0;
    let fphi = 2.0 * PI * (f64::from(phi) / 65535.0 - 0.5);
    let rxy = (1.0 - f64::from(nz) * f64::from(nz)).max(0.0).sqrt();
    [(rxy * fphi.sin()) as f32, (rxy * fphi.cos()) as f32, nz]
}

/// Encode a normal as `(phi, z)`
pub fn pack_normal(n: [f32; 3]) -> (u16, u16) {
    if n == [0.0; 3] {
        return ZERO_NORMAL;
    }
    let magnitude = n.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();
    let phi = ((f64::from(n[0]).atan2(f64::from(n[1])) / (2.0 * PI) + 0.5) * 65535.0 + 0.5) as i64;
    let z = (((f64::from(n[2]) / magnitude + 1.0) / 2.0 * 65535.0 + 0.5) as i64).min(65535);
    (phi.clamp(0, 65535) as u16, z.max(0) as u16)
}

/// Attribute type and count for a channel spec type name
fn spec_type(type_name: &str) -> Option<(AttributeType, usize)> {
    match type_name {
        "point" | "vector" | "normal" => Some((AttributeType::Vector, 3)),
        "color" => Some((AttributeType::Float, 3)),
        "matrix" => Some((AttributeType::Float, 16)),
        "float" => Some((AttributeType::Float, 1)),
        _ => None,
    }
}

/// Spec type name used to store `attr`, if any
fn spec_type_name(attr: &ParticleAttribute) -> Option<&'static str> {
    match (attr.attr_type, attr.count) {
        (AttributeType::Vector, 3) => Some("vector"),
        (AttributeType::Float, 3) => Some("color"),
        (AttributeType::Float, 16) => Some("matrix"),
        (AttributeType::Float | AttributeType::Vector, 1) => Some("float"),
        _ => None,
    }
}

/// Read one `type name\n` spec line
fn read_spec<R: Read>(input: &mut R) -> Result<(String, String)> {
    let mut line = Vec::new();
    loop {
        let byte = input.read_u8()?;
        if byte == b'\n' {
            break;
        }
        line.push(byte);
    }
    let line = String::from_utf8_lossy(&line);
    let (type_name, name) = line
        .trim()
        .split_once(' ')
        .ok_or_else(|| {
            Error::invalid_format(format!("{FORMAT}: malformed channel spec '{line}'"))
        })?;
    Ok((type_name.to_owned(), name.trim_start().to_owned()))
}

/// `name`, or `name1`, `name2`, ... when already taken
fn unique_name(particles: &Particles, name: &str) -> String {
    let mut candidate = name.to_owned();
    let mut suffix = 1;
    while particles.attribute_info(&candidate).is_some() {
        candidate = format!("{name}{suffix}");
        suffix += 1;
    }
    candidate
}

/// RenderMan point cloud codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PtcCodec;

impl ParticleCodec for PtcCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "ptc";

    fn read<R: Read>(mut input: R, headers_only: bool) -> Result<Particles> {
        let magic = input.read_i32::<LittleEndian>()?;
        if magic != PTC_MAGIC {
            return Err(Error::InvalidMagic {
                format: FORMAT,
                found: u64::from(magic as u32),
                expected: u64::from(PTC_MAGIC as u32),
            });
        }
        let version = input.read_i32::<LittleEndian>()?;
        if !(0..=PTC_MAX_VERSION).contains(&version) {
            return Err(Error::unsupported_version(FORMAT, version));
        }
        let num_points = input.read_f64::<LittleEndian>()?;
        if !(0.0..=usize::MAX as f64).contains(&num_points) {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: invalid point count {num_points}"
            )));
        }
        let count = num_points as usize;

        let mut bbox = [0f32; 6];
        input.read_f32_into::<LittleEndian>(&mut bbox)?;
        debug!("{FORMAT}: version {version}, {count} points, bounds {bbox:?}");
        if version >= 1 {
            skip(&mut input, 4 * 4)?;
        }
        if version >= 2 {
            // max radius then 32 filler words
            skip(&mut input, 4 + 32 * 4)?;
        }
        // world-to-eye and eye-to-screen matrices, image width/height/depth
        skip(&mut input, (16 + 16 + 3) * 4)?;

        let num_vars = input.read_i32::<LittleEndian>()?;
        let data_size = input.read_i32::<LittleEndian>()?;

        let mut particles = new_container(headers_only);
        let position = particles.try_add_attribute(POSITION_ATTRIBUTE, AttributeType::Vector, 3)?;
        let normal = particles.try_add_attribute(NORMAL_ATTRIBUTE, AttributeType::Vector, 3)?;
        let radius = particles.try_add_attribute(RADIUS_ATTRIBUTE, AttributeType::Float, 1)?;

        let mut channels = Vec::new();
        let mut parsed_size = 0usize;
        for _ in 0..num_vars.max(0) {
            let (type_name, name) = read_spec(&mut input)?;
            let (attr_type, size) = spec_type(&type_name).ok_or_else(|| {
                Error::invalid_format(format!(
                    "{FORMAT}: unknown channel type '{type_name}' for '{name}'"
                ))
            })?;
            let name = unique_name(&particles, &name);
            channels.push(particles.try_add_attribute(&name, attr_type, size)?);
            parsed_size += size;
        }
        if usize::try_from(data_size).ok() != Some(parsed_size) {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: declared data size {data_size} does not match channels ({parsed_size})"
            )));
        }
        if headers_only {
            drop(particles.try_add_particles(count)?);
            return Ok(particles);
        }

        if version >= 1 {
            skip(&mut input, 2 * 4)?;
        }

        for index in 0..count {
            grow_to(&mut particles, index, count)?;
            input.read_f32_into::<LittleEndian>(particles.data_write::<f32>(&position, index))?;
            let phi = input.read_u16::<LittleEndian>()?;
            let z = input.read_u16::<LittleEndian>()?;
            particles
                .data_write::<f32>(&normal, index)
                .copy_from_slice(&unpack_normal(phi, z));
            particles.data_write::<f32>(&radius, index)[0] = input.read_f32::<LittleEndian>()?;
            for channel in &channels {
                input.read_f32_into::<LittleEndian>(particles.data_write::<f32>(channel, index))?;
            }
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let position = require_position(particles, FORMAT)?;
        let normal = particles
            .attribute_info(NORMAL_ATTRIBUTE)
            .filter(|a| a.attr_type.is_float() && a.count == 3);
        if normal.is_none() {
            warn!("{FORMAT}: no usable '{NORMAL_ATTRIBUTE}' attribute, writing zero normals");
        }
        let radius = particles
            .attribute_info(RADIUS_ATTRIBUTE)
            .filter(|a| a.attr_type.is_float() && a.count >= 1);
        if radius.is_none() {
            warn!("{FORMAT}: no usable '{RADIUS_ATTRIBUTE}' attribute, writing radius 1");
        }

        let mut channels = Vec::new();
        let mut data_size = 0usize;
        for attr in particles.attributes() {
            if matches!(
                attr.name.as_str(),
                POSITION_ATTRIBUTE | NORMAL_ATTRIBUTE | RADIUS_ATTRIBUTE
            ) {
                continue;
            }
            match spec_type_name(attr) {
                Some(type_name) => {
                    data_size += attr.count;
                    channels.push((attr, type_name));
                }
                None => warn!(
                    "{FORMAT}: cannot store {}[{}] attribute '{}'",
                    attr.attr_type, attr.count, attr.name
                ),
            }
        }

        let count = particles.num_particles();
        let points = particles.column::<f32>(&position)?;
        let (mut min, mut max) = ([f32::MAX; 3], [-f32::MAX; 3]);
        for p in points.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        output.write_i32::<LittleEndian>(PTC_MAGIC)?;
        output.write_i32::<LittleEndian>(0)?;
        output.write_f64::<LittleEndian>(count as f64)?;
        for v in min.iter().chain(&max) {
            output.write_f32::<LittleEndian>(*v)?;
        }
        for row in 0..4 {
            for column in 0..4 {
                output.write_f32::<LittleEndian>(if row == column { 1.0 } else { 0.0 })?;
            }
        }
        for v in EYE_TO_SCREEN.iter().flatten() {
            output.write_f32::<LittleEndian>(*v)?;
        }
        for v in [640.0f32, 480.0, 300.0] {
            output.write_f32::<LittleEndian>(v)?;
        }
        output.write_i32::<LittleEndian>(channels.len() as i32)?;
        output.write_i32::<LittleEndian>(data_size as i32)?;
        for (attr, type_name) in &channels {
            writeln!(output, "{type_name} {}", attr.name)?;
        }

        for index in 0..count {
            for v in particles.data::<f32>(&position, index) {
                output.write_f32::<LittleEndian>(*v)?;
            }
            let n = match &normal {
                Some(attr) => {
                    let n = particles.data::<f32>(attr, index);
                    [n[0], n[1], n[2]]
                }
                None => [0.0; 3],
            };
            let (phi, z) = pack_normal(n);
            output.write_u16::<LittleEndian>(phi)?;
            output.write_u16::<LittleEndian>(z)?;
            let r = radius
                .as_ref()
                .map_or(1.0, |attr| particles.data::<f32>(attr, index)[0]);
            output.write_f32::<LittleEndian>(r)?;
            for (attr, _) in &channels {
                for v in particles.data::<f32>(attr, index) {
                    output.write_f32::<LittleEndian>(*v)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case([0.0, 0.0, 1.0] ; "up")]
    #[test_case([0.0, 0.0, -1.0] ; "down")]
    #[test_case([1.0, 0.0, 0.0] ; "x")]
    #[test_case([0.0, -1.0, 0.0] ; "negative y")]
    #[test_case([0.6, 0.0, 0.8] ; "tilted")]
    fn test_normal_packing(n: [f32; 3]) {
        let (phi, z) = pack_normal(n);
        let decoded = unpack_normal(phi, z);
        for axis in 0..3 {
            assert!((decoded[axis] - n[axis]).abs() < 2e-2, "{decoded:?} vs {n:?}");
        }
    }

    #[test]
    fn test_zero_normal() {
        assert_eq!(pack_normal([0.0; 3]), ZERO_NORMAL);
        assert_eq!(unpack_normal(65535, 65535), [0.0; 3]);
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(PTC_MAGIC.to_le_bytes(), *b"pptc");
    }

    #[test]
    fn test_round_trip() {
        let mut p = Particles::new();
        let position = p.add_attribute("position", AttributeType::Vector, 3);
        let radius = p.add_attribute("radius", AttributeType::Float, 1);
        let cd = p.add_attribute("Cd", AttributeType::Float, 3);
        let area = p.add_attribute("area", AttributeType::Float, 1);
        p.add_attribute("id", AttributeType::Int, 1);
        for i in 0..4 {
            let index = p.add_particle();
            let f = i as f32;
            p.data_write::<f32>(&position, index).copy_from_slice(&[f, 1.0, -f]);
            p.data_write::<f32>(&radius, index)[0] = 0.5 * f;
            p.data_write::<f32>(&cd, index).copy_from_slice(&[0.1, 0.2, f]);
            p.data_write::<f32>(&area, index)[0] = f * f;
        }

        let mut bytes = Vec::new();
        PtcCodec::write(&mut bytes, &p).unwrap();
        let read = PtcCodec::read(bytes.as_slice(), false).unwrap();

        assert_eq!(read.num_particles(), 4);
        assert!(read.attribute_info("id").is_none());
        let position = read.attribute_info("position").unwrap();
        assert_eq!(read.data::<f32>(&position, 3), &[3.0, 1.0, -3.0]);
        let normal = read.attribute_info("normal").unwrap();
        assert_eq!(read.data::<f32>(&normal, 2), &[0.0, 0.0, 0.0]);
        let radius = read.attribute_info("radius").unwrap();
        assert_eq!(read.data::<f32>(&radius, 2), &[1.0]);
        let cd = read.attribute_info("Cd").unwrap();
        assert_eq!(cd.attr_type, AttributeType::Float);
        assert_eq!(read.data::<f32>(&cd, 3), &[0.1, 0.2, 3.0]);
        let area = read.attribute_info("area").unwrap();
        assert_eq!(read.data::<f32>(&area, 3), &[9.0]);
    }

    #[test]
    fn test_duplicate_channel_names() {
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(PTC_MAGIC).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_f64::<LittleEndian>(0.0).unwrap();
        bytes.extend_from_slice(&[0u8; (6 + 32 + 3) * 4]);
        bytes.write_i32::<LittleEndian>(3).unwrap();
        bytes.write_i32::<LittleEndian>(5).unwrap();
        bytes.extend_from_slice(b"float area\nfloat area\nnormal radius\n");

        let read = PtcCodec::read(bytes.as_slice(), true).unwrap();
        assert!(read.attribute_info("area1").is_some());
        let renamed = read.attribute_info("radius1").unwrap();
        assert_eq!(renamed.attr_type, AttributeType::Vector);
        assert_eq!(read.num_attributes(), 6);
    }

    #[test]
    fn test_data_size_mismatch() {
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(PTC_MAGIC).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_f64::<LittleEndian>(0.0).unwrap();
        bytes.extend_from_slice(&[0u8; (6 + 32 + 3) * 4]);
        bytes.write_i32::<LittleEndian>(1).unwrap();
        bytes.write_i32::<LittleEndian>(2).unwrap();
        bytes.extend_from_slice(b"float area\n");
        assert!(PtcCodec::read(bytes.as_slice(), true).unwrap_err().is_corruption());
    }

    #[test]
    fn test_overstated_count() {
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(PTC_MAGIC).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_f64::<LittleEndian>(1e18).unwrap();
        bytes.extend_from_slice(&[0u8; (6 + 32 + 3) * 4]);
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        // one complete record, then the file ends
        bytes.extend_from_slice(&[0u8; 20]);

        let err = PtcCodec::read(bytes.as_slice(), false).unwrap_err();
        assert!(err.is_corruption());
        let headers = PtcCodec::read(bytes.as_slice(), true).unwrap();
        assert_eq!(headers.num_particles(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_unknown_spec_type() {
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(PTC_MAGIC).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_f64::<LittleEndian>(0.0).unwrap();
        bytes.extend_from_slice(&[0u8; (6 + 32 + 3) * 4]);
        bytes.write_i32::<LittleEndian>(1).unwrap();
        bytes.write_i32::<LittleEndian>(1).unwrap();
        bytes.extend_from_slice(b"string label\n");
        assert!(PtcCodec::read(bytes.as_slice(), true).is_err());
    }

    #[test]
    fn test_version_gate() {
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(PTC_MAGIC).unwrap();
        bytes.write_i32::<LittleEndian>(3).unwrap();
        assert!(matches!(
            PtcCodec::read(bytes.as_slice(), false).unwrap_err(),
            Error::UnsupportedVersion { .. }
        ));
    }

    #[test]
    fn test_missing_position() {
        let p = Particles::new();
        let err = PtcCodec::write(Vec::new(), &p).unwrap_err();
        assert!(err.is_usage());
    }
}
