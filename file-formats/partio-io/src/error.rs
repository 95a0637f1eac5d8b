//! Error types for particle file I/O

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for codec operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The particle container rejected an operation
    #[error("particle data error: {0}")]
    Data(#[from] partio_data::Error),

    /// No codec is registered for this extension
    #[error("unknown particle file extension '{0}'")]
    UnknownExtension(String),

    /// The path has no extension to pick a codec from
    #[error("cannot determine particle format of {}", .0.display())]
    NoExtension(PathBuf),

    /// The file does not start with the format's magic number
    #[error("{format}: bad magic number {found:#x}, expected {expected:#x}")]
    InvalidMagic {
        /// Format name
        format: &'static str,
        /// Magic number read from the file
        found: u64,
        /// Magic number the format requires
        expected: u64,
    },

    /// The file declares a version this codec cannot read
    #[error("{format}: unsupported version {version}")]
    UnsupportedVersion {
        /// Format name
        format: &'static str,
        /// Version read from the file
        version: String,
    },

    /// Structurally invalid file contents
    #[error("invalid particle file: {0}")]
    InvalidFormat(String),

    /// A compressed stream could not be inflated or deflated
    #[error("compression error: {0}")]
    Compression(String),

    /// A writer needs an attribute the container does not have
    #[error("{format}: required attribute '{name}' is missing")]
    MissingAttribute {
        /// Format name
        format: &'static str,
        /// Attribute name
        name: String,
    },
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Create a new UnsupportedVersion error
    pub fn unsupported_version<V: ToString>(format: &'static str, version: V) -> Self {
        Error::UnsupportedVersion {
            format,
            version: version.to_string(),
        }
    }

    /// Classify an error raised while reading a zlib stream
    ///
    /// Invalid deflate data becomes [`Error::Compression`]; everything else
    /// stays an I/O error.
    pub fn from_inflate(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::InvalidData {
            Error::Compression(err.to_string())
        } else {
            Error::Io(err)
        }
    }

    /// Check if this error indicates a damaged or foreign file
    ///
    /// A particle count too large to allocate only ever comes from a
    /// damaged header, so it counts as corruption too.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::InvalidMagic { .. } | Error::InvalidFormat(_) | Error::Compression(_) => true,
            Error::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            Error::Data(e) => e.is_allocation(),
            _ => false,
        }
    }

    /// Check if this error comes from how the library was called
    pub fn is_usage(&self) -> bool {
        match self {
            Error::UnknownExtension(_) | Error::NoExtension(_) | Error::MissingAttribute { .. } => {
                true
            }
            Error::Data(e) => e.is_usage(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::invalid_format("truncated channel table");
        assert_eq!(err.to_string(), "invalid particle file: truncated channel table");

        let err = Error::InvalidMagic {
            format: "PRT",
            found: 0x1234,
            expected: 0xc0,
        };
        assert_eq!(err.to_string(), "PRT: bad magic number 0x1234, expected 0xc0");

        let err = Error::unsupported_version("RPC", 2);
        assert_eq!(err.to_string(), "RPC: unsupported version 2");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::compression("bad stream").is_corruption());
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        assert!(Error::from(eof).is_corruption());
        assert!(!Error::UnknownExtension("xyz".into()).is_corruption());
        assert!(Error::UnknownExtension("xyz".into()).is_usage());
        assert!(Error::from(partio_data::Error::NotSorted).is_usage());
        let alloc = partio_data::Error::AllocationFailed { particles: 1 << 62 };
        assert!(Error::from(alloc).is_corruption());
    }

    #[test]
    fn test_from_inflate() {
        let corrupt = io::Error::new(io::ErrorKind::InvalidData, "invalid block type");
        assert!(matches!(Error::from_inflate(corrupt), Error::Compression(_)));
        let short = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(Error::from_inflate(short), Error::Io(_)));
    }
}
