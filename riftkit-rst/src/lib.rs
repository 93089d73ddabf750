//! Support of RST localized string tables
//!
//! An RST file (`.stringtable`) maps hashed translation keys to translated
//! strings. Keys are xxhash64 values truncated to 39 or 40 bits depending on
//! the file version. When an instance is created the header and the key
//! directory are parsed; values are decoded lazily on access.
//!
//! # Example
//! ```no_run
//! # use riftkit_rst::Rst;
//! # // Explicit type annotation, required only by rustdoc
//! # type RstHashMapper = riftkit_rst::RstHashMapper<39>;
//!
//! let rst = Rst::open("main_en_us.stringtable").expect("failed to open or read data");
//! // Get an entry by its key string
//! assert_eq!(rst.get("item_1001_name"), Some("Boots".into()));
//! // Or by its key hash
//! assert_eq!(rst.get(0x3376eae1da), Some("Boots".into()));
//!
//! // Entries can be iterated
//! // Use a mapper to filter on (known) keys
//! let hmapper = RstHashMapper::from_path("hashes.rst.txt").expect("failed to load hashes");
//! for (hash, value) in rst.iter() {
//!     if let Some(key) = hmapper.get(hash) {
//!         println!("{key} = {value}");
//!     }
//! }
//! ```
//!
//! # Older versions
//!
//! Version 2 files may carry a font configuration string, and versions
//! before 5 may hold trailing-encoded entries whose data is not plain UTF-8;
//! those decode as base64 text through [Rst::get()], or raw through
//! [Rst::get_raw()].

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Read, BufReader};
use std::path::Path;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use nom::{
    number::complete::{le_u8, le_u32},
    sequence::tuple,
    bytes::complete::tag,
};
use thiserror::Error;
use riftkit_hashes::rst::compute_text_hash_full;
use riftkit_utils::{
    parsing::{ParseError, ReadArray},
    parse_buf,
};
pub use riftkit_hashes::rst::RstHashMapper;


/// Result type for RST errors
type Result<T, E = RstError> = std::result::Result<T, E>;

/// A raw entry value, possibly trailing-encoded
#[derive(Debug)]
#[allow(missing_docs)]
pub enum RstRawValue<'a> {
    /// Plain NUL-terminated string data
    String(&'a [u8]),
    /// Trailing-encoded binary data
    Encrypted(&'a [u8]),
}


/// Localized string table
///
/// Values can be accessed by key string or by key hash. All getters accept
/// non-truncated hashes and truncate them as needed.
pub struct Rst {
    /// Format version
    pub version: u8,
    /// Optional font config (version 2 only)
    pub font_config: Option<String>,
    /// Number of bits per key hash
    hash_bits: u8,
    /// True if some entries are trailing-encoded
    has_trenc: bool,
    /// Value offsets, indexed by key hash
    entry_offsets: HashMap<u64, usize>,
    /// Buffer of value data (unparsed)
    entry_data: Vec<u8>,
}

impl Rst {
    /// Open an RST file from a path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        Rst::read(reader)
    }

    /// Read an RST file, check the header, read the key directory
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let (version, hash_bits, font_config, entry_count) = Self::parse_header(&mut reader)?;

        let entry_offsets = {
            let mut entry_offsets = HashMap::with_capacity(entry_count as usize);
            let mut buf = vec![0; 8 * entry_count as usize];
            reader.read_exact(&mut buf)?;

            let hash_mask = (1u64 << hash_bits) - 1;
            for chunk in buf.chunks_exact(8) {
                let v = u64::from_le_bytes(chunk.try_into().expect("chunk is 8 bytes"));
                entry_offsets.insert(v & hash_mask, (v >> hash_bits) as usize);
            }
            entry_offsets
        };

        let has_trenc = version < 5 && reader.read_array::<1>()?[0] != 0;

        let mut entry_data = Vec::new();
        reader.read_to_end(&mut entry_data)?;

        Ok(Self {
            version,
            font_config,
            hash_bits,
            has_trenc,
            entry_offsets,
            entry_data,
        })
    }

    /// Parse the header, advance to the beginning of the key directory
    fn parse_header<R: Read>(reader: &mut R) -> Result<(u8, u8, Option<String>, u32)> {
        let version = {
            let buf = reader.read_array::<{3 + 1}>()?;
            let (_, version) = parse_buf!(buf, tuple((tag("RST"), le_u8)));
            version
        };

        let hash_bits: u8 = match version {
            2 | 3 => 40,
            4 | 5 => 39,
            _ => return Err(RstError::UnsupportedVersion(version)),
        };

        let font_config = if version == 2 && reader.read_array::<1>()?[0] != 0 {
            let buf = reader.read_array::<4>()?;
            let n = parse_buf!(buf, le_u32);
            let mut buf = vec![0; n as usize];
            reader.read_exact(&mut buf)?;
            Some(String::from_utf8(buf)?)
        } else {
            None
        };

        let entry_count = {
            let buf = reader.read_array::<4>()?;
            parse_buf!(buf, le_u32)
        };

        Ok((version, hash_bits, font_config, entry_count))
    }

    /// Number of bits used by key hashes
    pub fn hash_bits(&self) -> u8 {
        self.hash_bits
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entry_offsets.len()
    }

    /// Return `true` if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entry_offsets.is_empty()
    }

    /// Truncate a key hash to the number of bits used by the file
    pub fn truncate_key(&self, key: u64) -> u64 {
        key & ((1u64 << self.hash_bits) - 1)
    }

    /// Return `true` if the key is present
    pub fn contains<K: IntoRstKey>(&self, key: K) -> bool {
        self.entry_offsets.contains_key(&self.truncate_key(key.into_rst_key()))
    }

    /// Get a string from its key
    ///
    /// The key is truncated as needed. Trailing-encoded entries are
    /// returned as base64 text. Missing keys return `None`, letting the
    /// caller pick its default.
    pub fn get<K: IntoRstKey>(&self, key: K) -> Option<Cow<'_, str>> {
        match self.get_raw_by_hash(key.into_rst_key())? {
            RstRawValue::String(s) => Some(String::from_utf8_lossy(s)),
            RstRawValue::Encrypted(data) => Some(Cow::Owned(BASE64.encode(data))),
        }
    }

    /// Get a raw value from its key
    pub fn get_raw<K: IntoRstKey>(&self, key: K) -> Option<RstRawValue> {
        self.get_raw_by_hash(key.into_rst_key())
    }

    fn get_raw_by_hash(&self, key: u64) -> Option<RstRawValue> {
        let key = self.truncate_key(key);
        let offset = *self.entry_offsets.get(&key)?;
        self.get_raw_by_offset(offset)
    }

    fn get_raw_by_offset(&self, offset: usize) -> Option<RstRawValue> {
        let data = self.entry_data.get(offset..)?;
        if self.has_trenc && data.first() == Some(&0xff) {
            let size = u16::from_le_bytes(data.get(1..3)?.try_into().expect("slice is 2 bytes"));
            Some(RstRawValue::Encrypted(data.get(3..3 + size as usize)?))
        } else {
            let pos = data.iter().position(|&b| b == 0)?;
            Some(RstRawValue::String(&data[..pos]))
        }
    }

    /// Iterate on string entries
    pub fn iter(&self) -> impl Iterator<Item=(u64, Cow<'_, str>)> {
        self.entry_offsets.iter().filter_map(|(key, offset)| {
            match self.get_raw_by_offset(*offset)? {
                RstRawValue::String(s) => Some(String::from_utf8_lossy(s)),
                _ => None,
            }.map(|value| (*key, value))
        })
    }
}

impl std::fmt::Debug for Rst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rst")
            .field("version", &self.version)
            .field("font_config", &self.font_config)
            .field("hash_bits", &self.hash_bits)
            .field("has_trenc", &self.has_trenc)
            .field("len", &self.entry_offsets.len())
            .finish()
    }
}


/// Conversion of lookup keys into key hashes
pub trait IntoRstKey {
    /// Convert into an untruncated key hash
    fn into_rst_key(self) -> u64;
}

impl IntoRstKey for u64 {
    fn into_rst_key(self) -> u64 {
        self
    }
}

impl IntoRstKey for &str {
    fn into_rst_key(self) -> u64 {
        compute_text_hash_full(self)
    }
}


/// Error in an RST file
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum RstError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("parsing error")]
    Parsing(#[from] ParseError),
    #[error("version not supported: {0}")]
    UnsupportedVersion(u8),
}


#[cfg(test)]
mod tests {
    use super::*;

    fn rst_v5(entries: &[(u64, usize)], data: &[u8]) -> Vec<u8> {
        let mut out = b"RST\x05".to_vec();
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (key, offset) in entries {
            out.extend_from_slice(&(((*offset as u64) << 39) | key).to_le_bytes());
        }
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn v5_lookup() {
        let data = rst_v5(&[(42, 0)], b"Hi\x00");
        let rst = Rst::read(&data[..]).unwrap();
        assert_eq!(rst.version, 5);
        assert_eq!(rst.hash_bits(), 39);
        assert_eq!(rst.get(42u64), Some("Hi".into()));
        assert!(rst.contains(42u64));
        assert_eq!(rst.get(0u64), None);
    }

    #[test]
    fn string_and_hash_keys_agree() {
        let key = "item_1001_name";
        let hash = compute_text_hash_full(key) & ((1 << 39) - 1);
        let data = rst_v5(&[(hash, 0)], b"Boots\x00");
        let rst = Rst::read(&data[..]).unwrap();
        assert_eq!(rst.get(key), Some("Boots".into()));
        assert_eq!(rst.get(compute_text_hash_full(key)), Some("Boots".into()));
        assert_eq!(rst.get(key), rst.get(hash));
    }

    #[test]
    fn multiple_offsets() {
        let data = rst_v5(&[(1, 0), (2, 4), (3, 8)], b"one\x00two\x00three\x00");
        let rst = Rst::read(&data[..]).unwrap();
        assert_eq!(rst.len(), 3);
        assert_eq!(rst.get(2u64), Some("two".into()));
        assert_eq!(rst.get(3u64), Some("three".into()));
        let collected: HashMap<u64, String> =
            rst.iter().map(|(k, v)| (k, v.into_owned())).collect();
        assert_eq!(collected[&1], "one");
    }

    #[test]
    fn v2_font_config() {
        let mut data = b"RST\x02\x01".to_vec();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"conf");
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&(((0u64) << 40) | 7).to_le_bytes());
        data.push(0);  // no trenc
        data.extend_from_slice(b"value\x00");

        let rst = Rst::read(&data[..]).unwrap();
        assert_eq!(rst.hash_bits(), 40);
        assert_eq!(rst.font_config.as_deref(), Some("conf"));
        assert_eq!(rst.get(7u64), Some("value".into()));
    }

    #[test]
    fn v2_without_font_config() {
        let mut data = b"RST\x02\x00".to_vec();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0);
        let rst = Rst::read(&data[..]).unwrap();
        assert_eq!(rst.font_config, None);
        assert!(rst.is_empty());
    }

    #[test]
    fn trenc_value_decodes_as_base64() {
        let mut data = b"RST\x03".to_vec();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&(((0u64) << 40) | 9).to_le_bytes());
        data.push(1);  // trenc flag
        data.extend_from_slice(&[0xff, 3, 0, 1, 2, 3]);

        let rst = Rst::read(&data[..]).unwrap();
        assert!(matches!(rst.get_raw(9u64), Some(RstRawValue::Encrypted(&[1, 2, 3]))));
        assert_eq!(rst.get(9u64), Some(BASE64.encode([1u8, 2, 3]).into()));
    }

    #[test]
    fn unsupported_version() {
        let data = b"RST\x09";
        assert!(matches!(Rst::read(&data[..]), Err(RstError::UnsupportedVersion(9))));
    }

    #[test]
    fn bad_magic() {
        let data = b"XST\x05\x00\x00\x00\x00";
        assert!(Rst::read(&data[..]).is_err());
    }
}
