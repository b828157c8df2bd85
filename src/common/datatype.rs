//! Attribute type tags.

/// Type of the attribute an index is built over.
///
/// Stored as a single byte in the index metadata page. Only [`Datatype::Integer`]
/// attributes can currently be indexed; the other tags exist so that an index
/// file opened with the wrong attribute type is reported as a mismatch.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// 4-byte little-endian signed integer.
    Integer = 0,
    /// 8-byte IEEE double.
    Double = 1,
    /// Fixed-width string.
    String = 2,
}

impl Datatype {
    /// Convert from u8, returning `None` for unknown tags.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Datatype::Integer),
            1 => Some(Datatype::Double),
            2 => Some(Datatype::String),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datatype_from_u8() {
        assert_eq!(Datatype::from_u8(0), Some(Datatype::Integer));
        assert_eq!(Datatype::from_u8(1), Some(Datatype::Double));
        assert_eq!(Datatype::from_u8(2), Some(Datatype::String));
        assert_eq!(Datatype::from_u8(3), None);
    }

    #[test]
    fn test_datatype_tag_roundtrip() {
        for ty in [Datatype::Integer, Datatype::Double, Datatype::String] {
            assert_eq!(Datatype::from_u8(ty as u8), Some(ty));
        }
    }
}
