//! Attribute descriptors and element types
//!
//! Every attribute stores 32-bit elements. Floating point attributes
//! (`Vector`, `Float`) hold `f32`, integer attributes (`Int`) hold `i32`, and
//! indexed strings hold `i32` tokens into a per-attribute string table.

use std::fmt;

/// Storage type of an attribute column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeType {
    /// Invalid attribute, returned when registration fails
    #[default]
    None,
    /// Floating point tuple, conventionally of count 3
    Vector,
    /// Floating point tuple of any count
    Float,
    /// Signed integer tuple
    Int,
    /// Integer tokens into an indexed-string table
    IndexedStr,
}

impl AttributeType {
    /// Size in bytes of one element of this type
    #[inline]
    pub fn element_size(self) -> usize {
        match self {
            AttributeType::None => 0,
            _ => 4,
        }
    }

    /// Upper-case name used in diagnostics and summaries
    pub fn type_name(self) -> &'static str {
        match self {
            AttributeType::None => "NONE",
            AttributeType::Vector => "VECTOR",
            AttributeType::Float => "FLOAT",
            AttributeType::Int => "INT",
            AttributeType::IndexedStr => "INDEXEDSTR",
        }
    }

    /// True for `Vector` and `Float`
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, AttributeType::Vector | AttributeType::Float)
    }

    /// True for `Int` and `IndexedStr`
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, AttributeType::Int | AttributeType::IndexedStr)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Handle to a per-particle attribute
///
/// The handle is a copy of the registry entry. Its `attribute_index` stays
/// valid for the lifetime of the container, including across reallocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParticleAttribute {
    /// Unique name among the per-particle attributes
    pub name: String,
    /// Storage type
    pub attr_type: AttributeType,
    /// Tuple width
    pub count: usize,
    /// Position in the container's attribute list
    pub attribute_index: usize,
}

impl ParticleAttribute {
    /// The sentinel returned by a failed registration
    pub fn invalid() -> Self {
        Self::default()
    }

    /// False for the sentinel
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.attr_type != AttributeType::None
    }

    /// Bytes per particle for this attribute
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.count * self.attr_type.element_size()
    }
}

/// Handle to a fixed (per-container) attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FixedAttribute {
    /// Unique name among the fixed attributes
    pub name: String,
    /// Storage type
    pub attr_type: AttributeType,
    /// Tuple width
    pub count: usize,
    /// Position in the container's fixed attribute list
    pub attribute_index: usize,
}

impl FixedAttribute {
    /// The sentinel returned by a failed registration
    pub fn invalid() -> Self {
        Self::default()
    }

    /// False for the sentinel
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.attr_type != AttributeType::None
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
}

/// Element types that may view attribute storage
///
/// `u32` is the raw word view and accepts every attribute type; codecs use it
/// to move values bit-for-bit.
pub trait Element: bytemuck::Pod + sealed::Sealed + fmt::Debug {
    /// Name used in type mismatch errors
    const NAME: &'static str;

    /// Whether a column of `attr_type` may be viewed as `Self`
    fn accepts(attr_type: AttributeType) -> bool;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    #[inline]
    fn accepts(attr_type: AttributeType) -> bool {
        attr_type.is_float()
    }
}

impl Element for i32 {
    const NAME: &'static str = "i32";

    #[inline]
    fn accepts(attr_type: AttributeType) -> bool {
        attr_type.is_integer()
    }
}

impl Element for u32 {
    const NAME: &'static str = "u32";

    #[inline]
    fn accepts(attr_type: AttributeType) -> bool {
        attr_type != AttributeType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        let attr = ParticleAttribute::invalid();
        assert!(!attr.is_valid());
        assert_eq!(attr.attr_type, AttributeType::None);
        assert_eq!(attr.byte_size(), 0);
        assert!(!FixedAttribute::invalid().is_valid());
    }

    #[test]
    fn test_element_acceptance() {
        assert!(f32::accepts(AttributeType::Vector));
        assert!(f32::accepts(AttributeType::Float));
        assert!(!f32::accepts(AttributeType::Int));
        assert!(i32::accepts(AttributeType::IndexedStr));
        assert!(!i32::accepts(AttributeType::Float));
        assert!(u32::accepts(AttributeType::Int));
        assert!(!u32::accepts(AttributeType::None));
    }

    #[test]
    fn test_byte_size() {
        let attr = ParticleAttribute {
            name: "position".into(),
            attr_type: AttributeType::Vector,
            count: 3,
            attribute_index: 0,
        };
        assert_eq!(attr.byte_size(), 12);
        assert_eq!(AttributeType::IndexedStr.to_string(), "INDEXEDSTR");
    }
}
