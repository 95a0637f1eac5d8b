//! Error types for the particle container

use thiserror::Error;

use crate::attribute::AttributeType;

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for container operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An attribute with this name is already registered
    #[error("attribute '{name}' already exists")]
    AttributeExists {
        /// Name of the colliding attribute
        name: String,
    },

    /// No attribute with this name or index is registered
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    /// An attribute cannot be created with this type/count combination
    #[error("invalid attribute definition for '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A typed view was requested with the wrong element type
    #[error("type mismatch on '{name}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Attribute name
        name: String,
        /// Type the caller asked for
        expected: &'static str,
        /// Type the attribute stores
        actual: AttributeType,
    },

    /// A particle index is outside `[0, num_particles)`
    #[error("particle index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of particles
        len: usize,
    },

    /// An indexed-string token does not exist in the attribute's table
    #[error("invalid token {token} for '{name}' (table has {len} entries)")]
    InvalidToken {
        /// Attribute name
        name: String,
        /// Requested token
        token: i32,
        /// Table length
        len: usize,
    },

    /// An accessor was bound after its iterator had already moved
    #[error("accessor for '{0}' attached after the iterator advanced")]
    AccessorAfterAdvance(String),

    /// The spatial index needs a `position` VECTOR attribute of count 3
    #[error("cannot build spatial index: {0}")]
    MissingPosition(String),

    /// The spatial index was queried before `sort()`
    #[error("spatial index not built, call sort() first")]
    NotSorted,

    /// Storage for the requested number of particles cannot be allocated
    #[error("cannot allocate storage for {particles} particles")]
    AllocationFailed {
        /// Requested particle count
        particles: usize,
    },

    /// The operation needs particle storage, but the container holds headers only
    #[error("{0} is not available on a headers-only container")]
    HeadersOnly(&'static str),
}

impl Error {
    /// Create a new AttributeNotFound error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Error::AttributeNotFound(name.into())
    }

    /// Create a new MissingPosition error
    pub fn missing_position<S: Into<String>>(reason: S) -> Self {
        Error::MissingPosition(reason.into())
    }

    /// Check if this error is a failed storage allocation
    pub fn is_allocation(&self) -> bool {
        matches!(self, Error::AllocationFailed { .. })
    }

    /// Check if this error is a caller mistake rather than a data problem
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::AttributeExists { .. }
                | Error::TypeMismatch { .. }
                | Error::IndexOutOfRange { .. }
                | Error::NotSorted
                | Error::AccessorAfterAdvance(_)
                | Error::HeadersOnly(_)
        )
    }
}
