//! Read and write options

use crate::format::ParticleFormat;

/// Options controlling how a particle file is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Only load the particle count and schema
    pub headers_only: bool,
    /// Force a format instead of detecting it from the extension
    pub format: Option<ParticleFormat>,
}

impl ReadOptions {
    /// Default options: full read, format from extension
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headers-only mode
    pub fn headers_only(mut self, headers_only: bool) -> Self {
        self.headers_only = headers_only;
        self
    }

    /// Force a format
    pub fn format(mut self, format: ParticleFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Options controlling how a particle file is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Wrap the output in gzip
    ///
    /// A `.gz` suffix on the path turns this on regardless.
    pub compressed: bool,
    /// Force a format instead of detecting it from the extension
    pub format: Option<ParticleFormat>,
}

impl WriteOptions {
    /// Default options: uncompressed, format from extension
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gzip compression
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Force a format
    pub fn format(mut self, format: ParticleFormat) -> Self {
        self.format = Some(format);
        self
    }
}
