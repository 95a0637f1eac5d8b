//! On-disk particle formats
//!
//! One module per format. Each exposes a unit struct implementing
//! [`ParticleCodec`](crate::format::ParticleCodec).

pub mod bgeo;
pub mod geo;
pub mod icecache;
pub mod pda;
pub mod pdb;
pub mod prt;
pub mod ptc;
pub mod rpc;

mod text;

use std::io::{self, Read};

use partio_data::{AttributeType, ParticleAttribute, Particles, POSITION_ATTRIBUTE};

use crate::error::{Error, Result};

pub use bgeo::BgeoCodec;
pub use geo::GeoCodec;
pub use icecache::IceCacheCodec;
pub use pda::PdaCodec;
pub use pdb::PdbCodec;
pub use prt::PrtCodec;
pub use ptc::PtcCodec;
pub use rpc::RpcCodec;

/// Empty container in the requested state
pub(crate) fn new_container(headers_only: bool) -> Particles {
    if headers_only {
        Particles::headers()
    } else {
        Particles::new()
    }
}

/// Particles added per step while records are streamed in
pub(crate) const GROWTH_BLOCK: usize = 4096;

/// Register a channel read from a file
///
/// A name collision or unusable definition skips the channel with a warning
/// instead of failing the whole read. Storage that cannot be allocated is
/// still an error.
pub(crate) fn add_channel(
    particles: &mut Particles,
    format: &'static str,
    name: &str,
    attr_type: AttributeType,
    count: usize,
) -> Result<Option<ParticleAttribute>> {
    match particles.try_add_attribute(name, attr_type, count) {
        Ok(attr) => Ok(Some(attr)),
        Err(e) if e.is_allocation() => Err(e.into()),
        Err(e) => {
            log::warn!("{format}: skipping channel '{name}': {e}");
            Ok(None)
        }
    }
}

/// Make sure particle `index` exists before its record is decoded
///
/// Storage grows by doubling toward the `total` the header declared, so a
/// header that overstates the count fails on the missing records instead of
/// on one huge up-front allocation.
pub(crate) fn grow_to(particles: &mut Particles, index: usize, total: usize) -> Result<()> {
    if index < particles.num_particles() {
        return Ok(());
    }
    let step = index.max(GROWTH_BLOCK).min(total.saturating_sub(index)).max(1);
    drop(particles.try_add_particles(step)?);
    Ok(())
}

/// Convert a signed count from a header, rejecting negative values
pub(crate) fn checked_count<T>(value: T, what: &str) -> Result<usize>
where
    T: TryInto<usize> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| Error::invalid_format(format!("negative {what} count {value}")))
}

/// Read exactly `len` bytes without trusting `len` for the allocation
pub(crate) fn read_bytes<R: Read>(input: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(len.min(1 << 16));
    input.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, found {}", bytes.len()),
        )));
    }
    Ok(bytes)
}

/// Discard exactly `len` bytes
pub(crate) fn skip<R: Read>(input: &mut R, len: u64) -> Result<()> {
    let skipped = io::copy(&mut input.by_ref().take(len), &mut io::sink())?;
    if skipped != len {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected to skip {len} bytes, skipped {skipped}"),
        )));
    }
    Ok(())
}

/// The `position` attribute when it holds three floats per particle
pub(crate) fn position_attribute(particles: &Particles) -> Option<ParticleAttribute> {
    particles
        .attribute_info(POSITION_ATTRIBUTE)
        .filter(|attr| attr.attr_type.is_float() && attr.count == 3)
}

/// Like [`position_attribute`] but required by the writer
pub(crate) fn require_position(
    particles: &Particles,
    format: &'static str,
) -> Result<ParticleAttribute> {
    position_attribute(particles).ok_or_else(|| Error::MissingAttribute {
        format,
        name: POSITION_ATTRIBUTE.to_owned(),
    })
}
