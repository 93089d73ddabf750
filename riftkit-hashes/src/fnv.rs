//! FNV-1a-32 hashes used for property names
//!
//! Property binaries hash entry paths, type names, field names and tagged
//! scalar values with 32-bit FNV-1a over the ASCII-lowercased input.
use super::HashMapper;

/// Compute a property name hash
///
/// The input is assumed to be ASCII only.
pub fn compute_prop_hash(s: &str) -> u32 {
    s.to_ascii_lowercase().bytes()
        .fold(0x811c9dc5_u32, |h, b| (h ^ b as u32).wrapping_mul(0x01000193))
}

/// Same as [compute_prop_hash()], usable in const context
pub const fn compute_prop_hash_const(s: &str) -> u32 {
    let mut h = 0x811c9dc5_u32;
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i].to_ascii_lowercase();
        h = (h ^ b as u32).wrapping_mul(0x01000193);
        i += 1;
    }
    h
}

/// Get a property hash, parsed from hex or computed from a string
///
/// A hex hash can be surrounded by braces (e.g. `{01234567}`). Anything that
/// does not look like a hex hash is hashed as a name. Use this to accept a
/// hash, known or not, from user input.
pub fn prop_hash_from_str(s: &str) -> u32 {
    let hash = {
        if s.len() == 8 {
            u32::from_str_radix(s, 16).ok()
        } else if s.len() == 10 && s.starts_with('{') && s.ends_with('}') {
            u32::from_str_radix(&s[1..9], 16).ok()
        } else {
            None
        }
    };
    hash.unwrap_or_else(|| compute_prop_hash(s))
}

/// Mapper for property hashes
pub type PropHashMapper = HashMapper<u32, 32>;

/// Enum with a variant for each kind of property name hash
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum PropNameKind {
    /// Hash of an entry path
    EntryPath,
    /// Hash of a type name, used by entries, structs and embeds
    TypeName,
    /// Hash of a field name
    FieldName,
    /// Hash of a tagged scalar value
    HashValue,
}

impl PropNameKind {
    /// All kinds of property name hashes
    pub const VARIANTS: [Self; 4] = [
        Self::EntryPath,
        Self::TypeName,
        Self::FieldName,
        Self::HashValue,
    ];

    /// Conventional file name storing the mapping for this kind of hash
    pub fn mapping_path(&self) -> &'static str {
        match self {
            Self::EntryPath => "hashes.propentries.txt",
            Self::TypeName => "hashes.proptypes.txt",
            Self::FieldName => "hashes.propfields.txt",
            Self::HashValue => "hashes.propvalues.txt",
        }
    }
}

/// Const, inline computation of a property hash, with implicit conversion
#[macro_export]
macro_rules! fnv1a {
    ($e:expr) => { $crate::fnv::compute_prop_hash_const($e).into() };
    ($t:ident, $e:literal) => { $t { hash: $crate::fnv::compute_prop_hash_const($e) } };
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_case_insensitive() {
        assert_eq!(compute_prop_hash("mCharacterName"), compute_prop_hash("mcharactername"));
        assert_eq!(compute_prop_hash("ABC"), compute_prop_hash_const("abc"));
    }

    #[test]
    fn known_vectors() {
        // FNV-1a offset basis is the hash of the empty string
        assert_eq!(compute_prop_hash(""), 0x811c9dc5);
        assert_eq!(compute_prop_hash("a"), 0xe40c292c);
    }

    #[test]
    fn from_str_accepts_hex_and_names() {
        assert_eq!(prop_hash_from_str("deadbeef"), 0xdeadbeef);
        assert_eq!(prop_hash_from_str("{deadbeef}"), 0xdeadbeef);
        assert_eq!(prop_hash_from_str("someName"), compute_prop_hash("somename"));
    }
}
