//! Hash algorithms and hash-to-name registries
//!
//! The asset pipeline never stores names on the wire, only hashes. Three hash
//! families coexist, each with its own algorithm and namespace:
//! FNV-1a-32 for property names ([fnv]), xxhash64 for archive paths ([xx]),
//! and truncated xxhash64 for string-table keys ([rst]).
//!
//! [HashMapper] holds a reverse mapping from hash to the known preimage
//! string and can be loaded from, and saved to, the conventional
//! `<hex> <name>` text files. Hash values themselves are wrapped in newtypes
//! created with [crate::define_hash_type!()], so a hash is never confused
//! with a string at the type level.
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufRead, BufWriter, Write};
use std::collections::HashMap;
use std::path::Path;
use std::hash::Hash;
use num_traits::Num;
use thiserror::Error;
use riftkit_utils::GuardedFile;

#[cfg(feature = "fnv")]
pub mod fnv;
#[cfg(feature = "rst")]
pub mod rst;
#[cfg(feature = "xx")]
pub mod xx;

type Result<T, E = HashError> = std::result::Result<T, E>;


/// Error raised when loading or saving hash mappings
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum HashError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid hash line: {0:?}")]
    InvalidHashLine(String),
    #[error("invalid hash value: {0:?}")]
    InvalidHashValue(String),
}


/// Hash-to-name mapping for one hash family
///
/// `NBITS` is the width of the hash value; it fixes the number of hex
/// characters used in mapping files (one record per line, formatted as
/// `<hex-value> <name>`, sorted by name). Files with a different hex width
/// are rejected at load time.
#[derive(Default)]
pub struct HashMapper<T, const NBITS: usize> where T: Hash {
    map: HashMap<T, String>,
}

impl<T, const NBITS: usize> HashMapper<T, NBITS> where T: Hash {
    /// Number of hex characters used to format a hash
    pub const NCHARS: usize = NBITS.div_ceil(4);
}

impl<T, const N: usize> HashMapper<T, N> where T: Eq + Hash + Copy {
    /// Create a new, empty mapping
    pub fn new() -> Self {
        Self { map: HashMap::<T, String>::new() }
    }

    /// Get the name associated to a hash, if known
    pub fn get(&self, hash: T) -> Option<&str> {
        self.map.get(&hash).map(|v| v.as_ref())
    }

    /// Return the matching name, or the hash itself as a displayable fallback
    ///
    /// ```
    /// # use riftkit_hashes::HashMapper;
    /// let mut mapper = HashMapper::<u32, 32>::new();
    /// mapper.insert(42, "forty-two".to_string());
    /// assert_eq!(format!("{}", mapper.seek(42)), "forty-two");
    /// assert_eq!(format!("{}", mapper.seek(0x1234)), "{00001234}");
    /// ```
    pub fn seek(&self, hash: T) -> HashOrName<T, &str> {
        match self.map.get(&hash) {
            Some(s) => HashOrName::Name(s.as_ref()),
            None => HashOrName::Hash(hash),
        }
    }

    /// Return `true` if the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of known hashes
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Return `true` if the given hash is known
    pub fn is_known(&self, hash: T) -> bool {
        self.map.contains_key(&hash)
    }

    /// Add a hash to the mapping
    ///
    /// The caller must ensure the name actually hashes to `hash`.
    pub fn insert(&mut self, hash: T, name: String) {
        self.map.insert(hash, name);
    }

    /// Iterate on `(hash, name)` pairs, in unspecified order
    pub fn iter(&self) -> impl Iterator<Item=(T, &str)> + '_ {
        self.map.iter().map(|(h, s)| (*h, s.as_ref()))
    }
}

impl<T, const N: usize> HashMapper<T, N> where T: Num + Eq + Hash + Copy {
    /// Create a new mapping, loaded from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut this = Self::new();
        this.load_reader(reader)?;
        Ok(this)
    }

    /// Create a new mapping, loaded from a file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut this = Self::new();
        this.load_path(&path)?;
        Ok(this)
    }

    /// Load hash mapping lines from a reader
    pub fn load_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let l = line?;
            if l.len() < Self::NCHARS + 2 || l.as_bytes()[Self::NCHARS] != b' ' {
                return Err(HashError::InvalidHashLine(l));
            }
            let hash = T::from_str_radix(&l[..Self::NCHARS], 16).map_err(|_e| {
                HashError::InvalidHashValue(l[..Self::NCHARS].to_string())
            })?;
            self.map.insert(hash, l[Self::NCHARS + 1..].to_string());
        }
        Ok(())
    }

    /// Load hash mapping from a file
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(&path)?;
        self.load_reader(BufReader::new(file))?;
        Ok(())
    }
}

impl<T, const N: usize> HashMapper<T, N> where T: Eq + Hash + Copy + fmt::LowerHex {
    /// Write hash mapping to a writer, sorted by name
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by_key(|kv| kv.1);
        for (h, s) in entries {
            writeln!(writer, "{:0w$x} {}", h, s, w = Self::NCHARS)?;
        }
        Ok(())
    }

    /// Write hash mapping to a file
    ///
    /// The file is replaced atomically.
    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        GuardedFile::for_scope(path, |file| {
            self.write(&mut BufWriter::new(file))
        })
    }
}

impl<T, const N: usize> std::fmt::Debug for HashMapper<T, N> where T: Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMapper")
            .field("NBITS", &N)
            .field("len", &self.map.len())
            .finish()
    }
}


/// Trait implemented by hash newtypes
///
/// Implementations are generated by [crate::define_hash_type!()].
pub trait HashDef: Sized {
    /// Integer type of the hash value
    type Hash: Sized;
    /// Hashing method for this hash family
    const HASHER: fn(&str) -> Self::Hash;

    /// Wrap an integer hash value
    fn new(hash: Self::Hash) -> Self;

    /// Hash a string into a value of this family
    #[inline]
    fn hashed(s: &str) -> Self {
        Self::new(Self::HASHER(s))
    }

    /// Return true for the null hash (0)
    fn is_null(&self) -> bool;
}


/// Either a hash value or its known preimage
///
/// Unknown hashes display as `{hex-value}`.
#[derive(Debug)]
pub enum HashOrName<H, S>
where H: Copy, S: AsRef<str> {
    /// Hash value, name is unknown
    Hash(H),
    /// Name matching the hash
    Name(S),
}

impl<H, S> fmt::Display for HashOrName<H, S>
where H: Copy + fmt::LowerHex, S: AsRef<str> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Hash(h) => write!(f, "{{{:0w$x}}}", h, w = std::mem::size_of::<H>() * 2),
            Self::Name(s) => write!(f, "{}", s.as_ref()),
        }
    }
}


/// Define a newtype wrapping an integer hash value
///
/// The generated type provides:
/// - a public `hash` field with the numeric value
/// - a [HashDef] implementation binding the family's hasher
/// - `From` conversion from the integer type
/// - [std::fmt::Debug] and [std::fmt::LowerHex] implementations
#[macro_export]
macro_rules! define_hash_type {
    (
        $(#[$meta:meta])*
        $name:ident($T:ty) => $hasher:expr
    ) => {
        $(#[$meta])*
        #[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        pub struct $name {
            /// Hash value
            pub hash: $T,
        }

        impl $crate::HashDef for $name {
            type Hash = $T;
            const HASHER: fn(&str) -> Self::Hash = $hasher;

            #[inline]
            fn new(hash: Self::Hash) -> Self {
                Self { hash }
            }

            #[inline]
            fn is_null(&self) -> bool {
                self.hash == 0
            }
        }

        impl From<$T> for $name {
            fn from(v: $T) -> Self {
                Self { hash: v }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({:x})"), self)
            }
        }

        impl std::fmt::LowerHex for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{:0w$x}", self.hash, w = std::mem::size_of::<$T>() * 2)
            }
        }
    }
}


/// Each hash family handled by riftkit
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum HashKind {
    /// Entry paths of game archives (`.wad.client`)
    WadGame,
    /// Entry paths of launcher archives (`.wad`)
    WadLcu,
    /// Property entry paths
    PropEntry,
    /// Property type names
    PropType,
    /// Property field names
    PropField,
    /// Hashed property scalar values
    PropValue,
    /// String-table keys
    Rst,
}

impl HashKind {
    /// Conventional file name storing the mapping for this family
    ///
    /// ```
    /// use riftkit_hashes::HashKind;
    /// assert_eq!(HashKind::WadLcu.mapping_path(), "hashes.lcu.txt");
    /// assert_eq!(HashKind::PropEntry.mapping_path(), "hashes.propentries.txt");
    /// ```
    pub fn mapping_path(&self) -> &'static str {
        match self {
            Self::WadGame => "hashes.game.txt",
            Self::WadLcu => "hashes.lcu.txt",
            Self::PropEntry => "hashes.propentries.txt",
            Self::PropType => "hashes.proptypes.txt",
            Self::PropField => "hashes.propfields.txt",
            Self::PropValue => "hashes.propvalues.txt",
            Self::Rst => "hashes.rst.txt",
        }
    }

    /// WAD hash family matching an archive path
    ///
    /// ```
    /// use riftkit_hashes::HashKind;
    /// assert_eq!(HashKind::from_wad_path("Global.wad.client"), Some(HashKind::WadGame));
    /// assert_eq!(HashKind::from_wad_path("assets.wad"), Some(HashKind::WadLcu));
    /// assert_eq!(HashKind::from_wad_path("unknown"), None);
    /// ```
    pub fn from_wad_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref().to_str()?;
        if path.ends_with(".wad.client") {
            Some(Self::WadGame)
        } else if path.ends_with(".wad") {
            Some(Self::WadLcu)
        } else {
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_get() {
        let data = "00001234 some/name.txt\ndeadbeef other/name.txt\n";
        let mapper = HashMapper::<u32, 32>::from_reader(data.as_bytes()).unwrap();
        assert_eq!(mapper.get(0x1234), Some("some/name.txt"));
        assert_eq!(mapper.get(0xdeadbeef), Some("other/name.txt"));
        assert_eq!(mapper.get(0x1), None);
    }

    #[test]
    fn load_rejects_wrong_hex_width() {
        // 16-char hashes in a 32-bit mapper
        let data = "0123456789abcdef some/name.txt\n";
        assert!(HashMapper::<u32, 32>::from_reader(data.as_bytes()).is_err());
        // 8-char hashes in a 64-bit mapper
        let data = "00001234 some/name.txt\n";
        assert!(HashMapper::<u64, 64>::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn write_is_sorted_by_name() {
        let mut mapper = HashMapper::<u32, 32>::new();
        mapper.insert(0x2, "b/file".to_string());
        mapper.insert(0x1, "c/file".to_string());
        mapper.insert(0x3, "a/file".to_string());
        let mut out = Vec::new();
        mapper.write(&mut out).unwrap();
        assert_eq!(out, b"00000003 a/file\n00000002 b/file\n00000001 c/file\n");
    }

    #[test]
    fn load_write_round_trip() {
        let data = "00000003 a/file\n00000002 b/file\n00000001 c/file\n";
        let mapper = HashMapper::<u32, 32>::from_reader(data.as_bytes()).unwrap();
        let mut out = Vec::new();
        mapper.write(&mut out).unwrap();
        assert_eq!(out, data.as_bytes());
    }

    #[test]
    fn forty_bit_mapper_uses_ten_chars() {
        let mut mapper = HashMapper::<u64, 40>::new();
        mapper.insert(0x42, "key_name".to_string());
        let mut out = Vec::new();
        mapper.write(&mut out).unwrap();
        assert_eq!(out, b"0000000042 key_name\n");
        let reloaded = HashMapper::<u64, 40>::from_reader(&out[..]).unwrap();
        assert_eq!(reloaded.get(0x42), Some("key_name"));
    }
}
