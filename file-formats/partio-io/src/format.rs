//! Format detection and codec dispatch

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use partio_data::Particles;

use crate::error::{Error, Result};
use crate::formats::{
    BgeoCodec, GeoCodec, IceCacheCodec, PdaCodec, PdbCodec, PrtCodec, PtcCodec, RpcCodec,
};

/// Reader/writer pair for one on-disk particle format
///
/// Codecs work on plain streams so they can be exercised against in-memory
/// buffers. Gzip wrapping and file handling live in [`crate::stream`].
pub trait ParticleCodec {
    /// Human-readable format name used in errors and logs
    const NAME: &'static str;

    /// File extension without the dot
    const EXTENSION: &'static str;

    /// Decode a container from `input`
    ///
    /// With `headers_only` the result is a headers-only container holding the
    /// particle count and schema.
    fn read<R: Read>(input: R, headers_only: bool) -> Result<Particles>;

    /// Encode `particles` to `output`
    fn write<W: Write>(output: W, particles: &Particles) -> Result<()>;
}

/// Supported particle file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleFormat {
    /// Houdini classic binary geometry
    Bgeo,
    /// Houdini classic ASCII geometry
    Geo,
    /// Krakatoa particle file
    Prt,
    /// RealFlow particle cache
    Rpc,
    /// RenderMan point cloud
    Ptc,
    /// Maya particle database
    Pdb,
    /// Maya particle ASCII
    Pda,
    /// Softimage ICE cache
    IceCache,
}

impl ParticleFormat {
    /// Every supported format
    pub const ALL: [ParticleFormat; 8] = [
        ParticleFormat::Bgeo,
        ParticleFormat::Geo,
        ParticleFormat::Prt,
        ParticleFormat::Rpc,
        ParticleFormat::Ptc,
        ParticleFormat::Pdb,
        ParticleFormat::Pda,
        ParticleFormat::IceCache,
    ];

    /// Canonical extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ParticleFormat::Bgeo => BgeoCodec::EXTENSION,
            ParticleFormat::Geo => GeoCodec::EXTENSION,
            ParticleFormat::Prt => PrtCodec::EXTENSION,
            ParticleFormat::Rpc => RpcCodec::EXTENSION,
            ParticleFormat::Ptc => PtcCodec::EXTENSION,
            ParticleFormat::Pdb => PdbCodec::EXTENSION,
            ParticleFormat::Pda => PdaCodec::EXTENSION,
            ParticleFormat::IceCache => IceCacheCodec::EXTENSION,
        }
    }

    /// Format name
    pub fn name(self) -> &'static str {
        match self {
            ParticleFormat::Bgeo => BgeoCodec::NAME,
            ParticleFormat::Geo => GeoCodec::NAME,
            ParticleFormat::Prt => PrtCodec::NAME,
            ParticleFormat::Rpc => RpcCodec::NAME,
            ParticleFormat::Ptc => PtcCodec::NAME,
            ParticleFormat::Pdb => PdbCodec::NAME,
            ParticleFormat::Pda => PdaCodec::NAME,
            ParticleFormat::IceCache => IceCacheCodec::NAME,
        }
    }

    /// Look up a format by extension, ignoring case
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Detect the format of `path` from its extension
    ///
    /// A trailing `.gz` is stripped first; the returned flag reports whether
    /// it was present.
    pub fn from_path(path: &Path) -> Result<(Self, bool)> {
        let gzipped = has_gzip_suffix(path);
        let inner = if gzipped {
            path.file_stem().map(Path::new)
        } else {
            Some(path)
        };

        let extension = inner
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::NoExtension(path.to_path_buf()))?;
        let format = Self::from_extension(extension)
            .ok_or_else(|| Error::UnknownExtension(extension.to_owned()))?;
        Ok((format, gzipped))
    }

    /// Decode a container in this format from `input`
    pub fn read_from<R: Read>(self, input: R, headers_only: bool) -> Result<Particles> {
        match self {
            ParticleFormat::Bgeo => BgeoCodec::read(input, headers_only),
            ParticleFormat::Geo => GeoCodec::read(input, headers_only),
            ParticleFormat::Prt => PrtCodec::read(input, headers_only),
            ParticleFormat::Rpc => RpcCodec::read(input, headers_only),
            ParticleFormat::Ptc => PtcCodec::read(input, headers_only),
            ParticleFormat::Pdb => PdbCodec::read(input, headers_only),
            ParticleFormat::Pda => PdaCodec::read(input, headers_only),
            ParticleFormat::IceCache => IceCacheCodec::read(input, headers_only),
        }
    }

    /// Encode `particles` in this format to `output`
    pub fn write_to<W: Write>(self, output: W, particles: &Particles) -> Result<()> {
        match self {
            ParticleFormat::Bgeo => BgeoCodec::write(output, particles),
            ParticleFormat::Geo => GeoCodec::write(output, particles),
            ParticleFormat::Prt => PrtCodec::write(output, particles),
            ParticleFormat::Rpc => RpcCodec::write(output, particles),
            ParticleFormat::Ptc => PtcCodec::write(output, particles),
            ParticleFormat::Pdb => PdbCodec::write(output, particles),
            ParticleFormat::Pda => PdaCodec::write(output, particles),
            ParticleFormat::IceCache => IceCacheCodec::write(output, particles),
        }
    }
}

impl fmt::Display for ParticleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `path` ends in `.gz`, ignoring case
pub fn has_gzip_suffix(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}
