//! # partio_io - Particle File Codecs
//!
//! Readers and writers that move [`Particles`] containers to and from the
//! common particle cache formats.
//!
//! ## Supported formats
//!
//! | Extension  | Format                           | Endianness | Compression       |
//! |------------|----------------------------------|------------|-------------------|
//! | `bgeo`     | Houdini classic binary geometry  | big        | optional gzip     |
//! | `geo`      | Houdini classic ASCII geometry   | text       | optional gzip     |
//! | `prt`      | Krakatoa particles               | little     | zlib body         |
//! | `rpc`      | RealFlow particle cache          | little     | zlib per channel  |
//! | `ptc`      | RenderMan point cloud            | little     | optional gzip     |
//! | `pdb`      | Maya particle database           | little     | optional gzip     |
//! | `pda`      | Maya particle ASCII              | text       | optional gzip     |
//! | `icecache` | Softimage ICE cache              | little     | optional gzip     |
//!
//! Any file may be wrapped in gzip. Readers detect the wrapper from its magic
//! bytes, and writers add it when asked or when the path ends in `.gz`.
//!
//! ## Examples
//!
//! ```no_run
//! use partio_io::{read, write};
//!
//! # fn main() -> Result<(), partio_io::Error> {
//! let particles = read("splash.0001.bgeo.gz")?;
//! println!("{} particles", particles.num_particles());
//! write("splash.0001.prt", &particles, false)?;
//! # Ok(())
//! # }
//! ```
//!
//! Codecs also work on any reader or writer:
//!
//! ```
//! use partio_data::{AttributeType, Particles};
//! use partio_io::ParticleFormat;
//!
//! let mut particles = Particles::new();
//! let mass = particles.add_attribute("mass", AttributeType::Float, 1);
//! let index = particles.add_particle();
//! particles.data_write::<f32>(&mass, index)[0] = 2.5;
//!
//! let mut bytes = Vec::new();
//! ParticleFormat::Pda.write_to(&mut bytes, &particles).unwrap();
//! let copy = ParticleFormat::Pda.read_from(bytes.as_slice(), false).unwrap();
//! assert_eq!(copy.num_particles(), 1);
//! ```
//!
//! ## Diagnostics
//!
//! Skipped channels and recovered trailing sections are reported through the
//! [`log`] facade as warnings.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod format;
pub mod formats;
pub mod interchange;
pub mod options;
pub mod stream;
pub mod zstream;

use std::path::Path;

use log::{debug, info};

pub use error::{Error, Result};
pub use format::{ParticleCodec, ParticleFormat};
pub use options::{ReadOptions, WriteOptions};
pub use partio_data::Particles;

/// Read a particle file, detecting the format from its extension
pub fn read<P: AsRef<Path>>(path: P) -> Result<Particles> {
    read_with(path, ReadOptions::new())
}

/// Read only the particle count and attribute schema of a file
pub fn read_headers<P: AsRef<Path>>(path: P) -> Result<Particles> {
    read_with(path, ReadOptions::new().headers_only(true))
}

/// Read a particle file with explicit options
pub fn read_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Particles> {
    let path = path.as_ref();
    let format = match options.format {
        Some(format) => format,
        None => ParticleFormat::from_path(path)?.0,
    };
    let input = stream::open_input(path)?;
    debug!(
        "Reading {} as {format} (gzip: {}, headers only: {})",
        path.display(),
        input.is_compressed(),
        options.headers_only
    );
    let particles = format.read_from(input, options.headers_only)?;
    info!(
        "Read {} particles with {} attributes from {}",
        particles.num_particles(),
        particles.num_attributes(),
        path.display()
    );
    Ok(particles)
}

/// Write a particle file, detecting the format from its extension
///
/// The output is gzip-compressed when `compressed` is set or the path ends
/// in `.gz`.
pub fn write<P: AsRef<Path>>(path: P, particles: &Particles, compressed: bool) -> Result<()> {
    write_with(path, particles, WriteOptions::new().compressed(compressed))
}

/// Write a particle file with explicit options
pub fn write_with<P: AsRef<Path>>(
    path: P,
    particles: &Particles,
    options: WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let (format, gzipped) = match options.format {
        Some(format) => (format, format::has_gzip_suffix(path)),
        None => ParticleFormat::from_path(path)?,
    };
    let compressed = options.compressed || gzipped;
    debug!("Writing {} as {format} (gzip: {compressed})", path.display());

    let mut output = stream::create_output(path, compressed)?;
    format.write_to(&mut output, particles)?;
    output.finish()?;
    info!(
        "Wrote {} particles to {}",
        particles.num_particles(),
        path.display()
    );
    Ok(())
}
