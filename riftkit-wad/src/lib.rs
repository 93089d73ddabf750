//! Support of WAD asset archives
//!
//! A WAD file is an index of entries keyed by the xxhash64 of their logical
//! path, followed by per-entry payloads that are stored raw or compressed
//! (gzip or zstd), or that redirect to another path (symlink entries).
//!
//! # Example: list entries of an archive
//! ```no_run
//! use riftkit_wad::{WadFile, WadHashMapper};
//! let wad = WadFile::open("Global.wad.client").expect("failed to open WAD file");
//! let hmapper = WadHashMapper::from_path("hashes.game.txt").expect("failed to load hashes");
//! for entry in wad.entries() {
//!     println!("{}", hmapper.get(entry.path.hash).unwrap_or("?"));
//! }
//! ```
//!
//! Archive data is accessed through any `Read + Seek` source; a memory-mapped
//! file wrapped in a [std::io::Cursor] gives random access without copies,
//! while extraction processes entries in offset order so a buffered file
//! reader behaves sequentially.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, BufReader};
use std::path::Path;
use nom::{
    number::complete::{le_u8, le_u16, le_u32, le_u64},
    combinator::map,
    sequence::tuple,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use riftkit_hashes::define_hash_type;
use riftkit_hashes::xx::compute_path_hash;
use riftkit_utils::{
    parsing::{ParseError, ReadArray},
    parse_buf,
};
pub use riftkit_hashes::xx::WadHashMapper;

mod extract;
pub use extract::{ExtractReport, VerifyPolicy, WadExtractor};

/// Result type for WAD errors
type Result<T, E = WadError> = std::result::Result<T, E>;

/// Cap for upfront buffer allocations; sizes declared in the index are not
/// trusted beyond this
const PREALLOC_CAP: usize = 1 << 20;


/// Parsed WAD archive index
///
/// Holds the header information and the entry directory; payload access goes
/// through [WadReader].
pub struct Wad {
    /// WAD version (`(major, minor)`)
    pub version: (u8, u8),
    entries: Vec<WadEntry>,
    by_path: HashMap<u64, usize>,
}

impl Wad {
    const ENTRY_LEN: usize = 32;

    /// Read an archive index, check header, validate entry bounds
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let source_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let (version, entry_count, index_offset) = Self::parse_header(reader)?;

        let index_size = Self::ENTRY_LEN * entry_count as usize;
        let mut index_data = Vec::with_capacity(index_size.min(PREALLOC_CAP));
        reader.seek(SeekFrom::Start(index_offset))?;
        if reader.take(index_size as u64).read_to_end(&mut index_data)? != index_size {
            return Err(ParseError::NotEnoughData.into());
        }

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut by_path = HashMap::with_capacity(entry_count as usize);
        for chunk in index_data.chunks_exact(Self::ENTRY_LEN) {
            let entry = Self::parse_entry(chunk)?;
            if entry.offset + entry.size as u64 > source_len {
                return Err(WadError::IndexOutOfBounds { path_hash: entry.path.hash });
            }
            by_path.insert(entry.path.hash, entries.len());
            entries.push(entry);
        }

        Ok(Self { version, entries, by_path })
    }

    /// Parse magic, version and the index descriptor
    fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<((u8, u8), u32, u64)> {
        let buf = reader.read_array::<4>()?;
        if &buf[..2] != b"RW" {
            return Err(WadError::BadMagic);
        }
        let version = (buf[2], buf[3]);

        // The descriptor block sits at the end of the fixed header
        let descriptor_offset: u64 = match version.0 {
            2 => 88,
            3 => 256,
            _ => return Err(WadError::UnsupportedVersion(version.0, version.1)),
        };
        reader.seek(SeekFrom::Start(descriptor_offset))?;
        let buf = reader.read_array::<{8 + 2 + 2 + 4}>()?;
        let (_unknown, index_offset, stride, entry_count) =
            parse_buf!(buf, tuple((le_u64, le_u16, le_u16, le_u32)));
        if stride as usize != Self::ENTRY_LEN {
            return Err(WadError::UnsupportedIndexStride(stride));
        }

        Ok((version, entry_count, index_offset as u64))
    }

    /// Parse a single 32-byte index record
    fn parse_entry(buf: &[u8]) -> Result<WadEntry> {
        let (path, offset, size, target_size, format, duplicate, _unknown, sha256_prefix) =
            parse_buf!(buf, tuple((
                map(le_u64, WadPathHash::from), le_u32, le_u32, le_u32,
                map(le_u8, WadFormat::from),
                map(le_u8, |v| v != 0), le_u16, le_u64,
            )));
        Ok(WadEntry {
            path,
            offset: offset as u64,
            size,
            target_size,
            format,
            duplicate,
            sha256_prefix,
        })
    }

    /// Look up an entry by its path hash
    pub fn lookup(&self, path_hash: u64) -> Option<&WadEntry> {
        self.by_path.get(&path_hash).map(|&i| &self.entries[i])
    }

    /// Entries in index order
    pub fn entries(&self) -> &[WadEntry] {
        &self.entries
    }

    /// Entries sorted by ascending payload offset
    ///
    /// This is the order to use when the source is read sequentially.
    pub fn entries_by_offset(&self) -> Vec<&WadEntry> {
        let mut entries: Vec<&WadEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.offset);
        entries
    }
}


/// Read WAD archives and their entry payloads
pub struct WadReader<R: Read + Seek> {
    reader: R,
    wad: Wad,
}

impl<R: Read + Seek> WadReader<R> {
    /// Parse the archive index from a `Read + Seek` source
    pub fn new(mut reader: R) -> Result<Self> {
        let wad = Wad::read(&mut reader)?;
        Ok(Self { reader, wad })
    }

    /// Access the parsed index
    pub fn wad(&self) -> &Wad {
        &self.wad
    }

    /// Entries in index order
    pub fn entries(&self) -> &[WadEntry] {
        self.wad.entries()
    }

    /// Look up an entry by its path hash
    pub fn lookup(&self, path_hash: u64) -> Option<&WadEntry> {
        self.wad.lookup(path_hash)
    }

    /// Streaming reader over an entry's decoded payload
    ///
    /// The returned reader yields at most `target_size + 1` bytes so overlong
    /// payloads are detected without being materialized; callers that need
    /// exact-size validation should use [read_entry()](Self::read_entry) or
    /// [decode_entry_into()](Self::decode_entry_into).
    pub fn entry_reader(&mut self, entry: &WadEntry) -> Result<Box<dyn Read + '_>> {
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let raw = Read::take(&mut self.reader, entry.size as u64);
        match entry.format {
            WadFormat::Raw => {
                if entry.size != entry.target_size {
                    return Err(WadError::MalformedEntry {
                        path_hash: entry.path.hash,
                        expected: entry.target_size as u64,
                        actual: entry.size as u64,
                    });
                }
                Ok(Box::new(raw))
            }
            WadFormat::Gzip => {
                let decoder = flate2::read::GzDecoder::new(raw);
                Ok(Box::new(decoder.take(entry.target_size as u64 + 1)))
            }
            WadFormat::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(raw)
                    .map_err(WadError::DecompressionFailed)?;
                Ok(Box::new(decoder.take(entry.target_size as u64 + 1)))
            }
            // A symlink payload is its target path, not file data
            WadFormat::Symlink => Ok(Box::new(raw)),
            WadFormat::Unknown(v) => Err(WadError::UnknownEntryType(v)),
        }
    }

    /// Decode an entry payload into a writer, return the SHA-256 digest
    ///
    /// The payload is streamed through the decompressor without being fully
    /// buffered. The decoded size must match the index, whatever the format.
    pub fn decode_entry_into<W: io::Write>(&mut self, entry: &WadEntry, writer: &mut W) -> Result<[u8; 32]> {
        let compressed = entry.format.is_compressed();
        let target_size = entry.target_size as u64;
        let mut reader = self.entry_reader(entry)?;

        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        let mut buf = [0u8; 16 * 1024];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                // Errors from the inflate path are decoder failures
                Err(e) if compressed => return Err(WadError::DecompressionFailed(e)),
                Err(e) => return Err(e.into()),
            };
            written += n as u64;
            if written > target_size {
                return Err(WadError::MalformedEntry {
                    path_hash: entry.path.hash,
                    expected: target_size,
                    actual: written,
                });
            }
            hasher.update(&buf[..n]);
            writer.write_all(&buf[..n])?;
        }
        if written != target_size {
            return Err(WadError::MalformedEntry {
                path_hash: entry.path.hash,
                expected: target_size,
                actual: written,
            });
        }
        Ok(hasher.finalize().into())
    }

    /// Read and decode a whole entry payload
    pub fn read_entry(&mut self, entry: &WadEntry) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity((entry.target_size as usize).min(PREALLOC_CAP));
        self.decode_entry_into(entry, &mut data)?;
        Ok(data)
    }

    /// Read a symlink entry's target path
    pub fn read_symlink_target(&mut self, entry: &WadEntry) -> Result<String> {
        if entry.format != WadFormat::Symlink {
            return Err(WadError::UnknownEntryType(entry.format.into()));
        }
        let mut data = Vec::with_capacity((entry.size as usize).min(PREALLOC_CAP));
        self.entry_reader(entry)?.read_to_end(&mut data)?;
        String::from_utf8(data)
            .map_err(|_| WadError::InvalidPath(format!("{:x}", entry.path)))
    }

    /// Decode an entry and verify its SHA-256 prefix
    pub fn verify_entry(&mut self, entry: &WadEntry, policy: VerifyPolicy) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity((entry.target_size as usize).min(PREALLOC_CAP));
        let digest = self.decode_entry_into(entry, &mut data)?;
        check_sha256_prefix(entry, &digest, policy)?;
        Ok(data)
    }

    /// Guess an entry's file extension from its payload's first bytes
    pub fn sniff_entry_extension(&mut self, entry: &WadEntry) -> Option<&'static str> {
        if entry.target_size == 0 || entry.format == WadFormat::Symlink {
            return None;
        }
        let mut reader = self.entry_reader(entry).ok()?;
        let mut buf = [0u8; 32];
        let mut n = 0;
        // Short reads are possible with the decoders, fill as much as we can
        while n < buf.len() {
            match reader.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(count) => n += count,
                Err(_) => break,
            }
        }
        sniff_extension(&buf[..n])
    }
}

/// Read a WAD archive from a file
pub type WadFile = WadReader<BufReader<File>>;

impl WadFile {
    /// Open a WAD archive from its path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}


/// Compare a computed digest against an entry's stored prefix
pub(crate) fn check_sha256_prefix(entry: &WadEntry, digest: &[u8; 32], policy: VerifyPolicy) -> Result<()> {
    if policy == VerifyPolicy::Off || entry.format == WadFormat::Symlink {
        return Ok(());
    }
    if entry.sha256_prefix == 0 && policy == VerifyPolicy::AcceptZero {
        // Some archive writers leave trailing entries unhashed
        return Ok(());
    }
    let prefix = u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
    if prefix != entry.sha256_prefix {
        return Err(WadError::ChecksumMismatch { path_hash: entry.path.hash });
    }
    Ok(())
}


/// A single file in a WAD archive
#[derive(Debug, Clone, Copy)]
pub struct WadEntry {
    /// Path of the entry, hashed
    pub path: WadPathHash,
    /// Payload offset in the archive
    pub offset: u64,
    /// Payload size in the archive (possibly compressed)
    pub size: u32,
    /// Decoded payload size
    pub target_size: u32,
    /// Storage format of the payload
    pub format: WadFormat,
    /// True for entries sharing their payload with another entry
    pub duplicate: bool,
    /// First 8 bytes of the SHA-256 of the decoded payload (little-endian)
    pub sha256_prefix: u64,
}

impl WadEntry {
    /// Return `true` for a symlink entry
    pub fn is_symlink(&self) -> bool {
        self.format == WadFormat::Symlink
    }
}


define_hash_type! {
    /// Hash of a WAD entry path
    WadPathHash(u64) => compute_path_hash
}


/// Storage format of a WAD entry payload
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WadFormat {
    /// Payload stored as-is
    Raw,
    /// Payload compressed with gzip
    Gzip,
    /// Payload is a UTF-8 target path, not file data
    Symlink,
    /// Payload compressed with zstd
    Zstd,
    /// Unrecognized format byte; fails on read, not on open
    Unknown(u8),
}

impl WadFormat {
    fn is_compressed(self) -> bool {
        matches!(self, Self::Gzip | Self::Zstd)
    }
}

impl From<u8> for WadFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Raw,
            1 => Self::Gzip,
            2 => Self::Symlink,
            3 => Self::Zstd,
            v => Self::Unknown(v),
        }
    }
}

impl From<WadFormat> for u8 {
    fn from(value: WadFormat) -> Self {
        match value {
            WadFormat::Raw => 0,
            WadFormat::Gzip => 1,
            WadFormat::Symlink => 2,
            WadFormat::Zstd => 3,
            WadFormat::Unknown(v) => v,
        }
    }
}


/// Guess a file extension from the first payload bytes
pub fn sniff_extension(buf: &[u8]) -> Option<&'static str> {
    const PREFIX_TO_EXT: &[(&[u8], &str)] = &[
        (b"\xff\xd8\xff", "jpg"),
        (b"\x89PNG\x0d\x0a\x1a\x0a", "png"),
        (b"OggS", "ogg"),
        (b"\x00\x01\x00\x00", "ttf"),
        (b"\x1a\x45\xdf\xa3", "webm"),
        (b"true", "ttf"),
        (b"OTTO\0", "otf"),
        (b"\"use strict\";", "min.js"),
        (b"<template ", "template.html"),
        (b"<!-- Elements -->", "template.html"),
        (b"DDS ", "dds"),
        (b"<svg", "svg"),
        (b"PROP", "bin"),
        (b"PTCH", "bin"),
        (b"BKHD", "bnk"),
        (b"r3d2Mesh", "scb"),
        (b"r3d2anmd", "anm"),
        (b"r3d2canm", "anm"),
        (b"r3d2sklt", "skl"),
        (b"r3d2", "wpk"),
        (b"\x33\x22\x11\x00", "skn"),
        (b"PreLoadBuildingBlocks = {", "preload"),
        (b"\x1bLuaQ\x00\x01\x04\x04", "luabin"),
        (b"\x1bLuaQ\x00\x01\x04\x08", "luabin64"),
        (b"\x02\x3d\x00\x28", "troybin"),
        (b"[ObjectBegin]", "sco"),
        (b"OEGM", "mapgeo"),
        (b"TEX\0", "tex"),
    ];

    PREFIX_TO_EXT
        .iter()
        .find(|(prefix, _)| buf.starts_with(prefix))
        .map(|(_, ext)| *ext)
        // Try to parse as JSON
        // Note: JSON files starting with a BOM are not detected
        .or_else(|| if match serde_json::from_slice::<serde_json::Value>(buf) {
            Ok(_) => true,
            Err(e) if e.is_eof() => true,
            _ => false,
        } {
            Some("json")
        } else {
            None
        })
}


/// Error in a WAD archive
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum WadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("parsing error")]
    Parsing(#[from] ParseError),
    #[error("bad magic code")]
    BadMagic,
    #[error("WAD version not supported: {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("WAD index stride not supported: {0}")]
    UnsupportedIndexStride(u16),
    #[error("unknown entry format: {0}")]
    UnknownEntryType(u8),
    #[error("entry {path_hash:016x} extends past the end of the archive")]
    IndexOutOfBounds { path_hash: u64 },
    #[error("entry {path_hash:016x} decoded to {actual} bytes, expected {expected}")]
    MalformedEntry { path_hash: u64, expected: u64, actual: u64 },
    #[error("decompression failed")]
    DecompressionFailed(#[source] std::io::Error),
    #[error("SHA-256 prefix mismatch for entry {path_hash:016x}")]
    ChecksumMismatch { path_hash: u64 },
    #[error("invalid extraction path: {0}")]
    InvalidPath(String),
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a minimal v2 archive from `(path_hash, format, payload, target_size, sha256_prefix)`
    pub(crate) fn build_wad(entries: &[(u64, WadFormat, &[u8], u32, u64)]) -> Vec<u8> {
        let index_offset = 104u16;
        let data_start = index_offset as usize + 32 * entries.len();

        let mut out = vec![0u8; 88];
        out[0] = b'R';
        out[1] = b'W';
        out[2] = 2;  // major
        out[3] = 0;  // minor
        out.extend_from_slice(&0u64.to_le_bytes());  // unknown
        out.extend_from_slice(&index_offset.to_le_bytes());
        out.extend_from_slice(&32u16.to_le_bytes());  // stride
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        assert_eq!(out.len(), index_offset as usize);

        let mut offset = data_start;
        for (path, format, payload, target_size, sha) in entries {
            out.extend_from_slice(&path.to_le_bytes());
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&target_size.to_le_bytes());
            out.push(u8::from(*format));
            out.push(0);  // duplicate
            out.extend_from_slice(&0u16.to_le_bytes());  // unknown
            out.extend_from_slice(&sha.to_le_bytes());
            offset += payload.len();
        }
        for (_, _, payload, _, _) in entries {
            out.extend_from_slice(payload);
        }
        out
    }

    pub(crate) fn sha_prefix(data: &[u8]) -> u64 {
        let digest: [u8; 32] = Sha256::digest(data).into();
        u64::from_le_bytes(digest[..8].try_into().unwrap())
    }

    #[test]
    fn read_raw_entry() {
        let prefix = sha_prefix(b"abcd");
        let data = build_wad(&[(0x0123456789abcdef, WadFormat::Raw, b"abcd", 4, prefix)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();

        let entry = *wad.lookup(0x0123456789abcdef).expect("entry not found");
        assert_eq!(entry.target_size, 4);
        assert!(!entry.duplicate);
        assert_eq!(wad.read_entry(&entry).unwrap(), b"abcd");
        assert_eq!(wad.verify_entry(&entry, VerifyPolicy::Strict).unwrap(), b"abcd");
        assert!(wad.lookup(0x1).is_none());
    }

    #[test]
    fn read_gzip_entry() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello").unwrap();
        let compressed = encoder.finish().unwrap();

        let data = build_wad(&[(0x42, WadFormat::Gzip, &compressed, 5, sha_prefix(b"hello"))]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x42).unwrap();
        assert_eq!(wad.read_entry(&entry).unwrap(), b"hello");
    }

    #[test]
    fn read_zstd_entry() {
        let compressed = zstd::encode_all(&b"hello zstd"[..], 0).unwrap();
        let data = build_wad(&[(0x43, WadFormat::Zstd, &compressed, 10, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x43).unwrap();
        assert_eq!(wad.read_entry(&entry).unwrap(), b"hello zstd");
    }

    #[test]
    fn decoded_size_must_match_index() {
        let compressed = zstd::encode_all(&b"hello zstd"[..], 0).unwrap();
        // target_size lies: payload decodes to 10 bytes
        let data = build_wad(&[(0x43, WadFormat::Zstd, &compressed, 6, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x43).unwrap();
        assert!(matches!(wad.read_entry(&entry), Err(WadError::MalformedEntry { .. })));
    }

    #[test]
    fn raw_size_mismatch_is_malformed() {
        let data = build_wad(&[(0x44, WadFormat::Raw, b"abcd", 8, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x44).unwrap();
        assert!(matches!(wad.read_entry(&entry), Err(WadError::MalformedEntry { .. })));
    }

    #[test]
    fn checksum_mismatch_detected() {
        let data = build_wad(&[(0x45, WadFormat::Raw, b"abcd", 4, 0xbad)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x45).unwrap();
        // Verification is an opt-in knob
        assert!(wad.read_entry(&entry).is_ok());
        assert!(matches!(
            wad.verify_entry(&entry, VerifyPolicy::Strict),
            Err(WadError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn zero_prefix_policy() {
        let data = build_wad(&[(0x46, WadFormat::Raw, b"abcd", 4, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x46).unwrap();
        assert!(wad.verify_entry(&entry, VerifyPolicy::AcceptZero).is_ok());
        assert!(matches!(
            wad.verify_entry(&entry, VerifyPolicy::Strict),
            Err(WadError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn symlink_entry_round_trip() {
        let target = b"assets/other/file.png";
        let data = build_wad(&[(0x47, WadFormat::Symlink, target, target.len() as u32, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x47).unwrap();
        assert!(entry.is_symlink());
        assert_eq!(wad.read_symlink_target(&entry).unwrap(), "assets/other/file.png");
    }

    #[test]
    fn unknown_format_fails_on_read_only() {
        let data = build_wad(&[(0x48, WadFormat::Unknown(9), b"abcd", 4, 0)]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let entry = *wad.lookup(0x48).unwrap();
        assert!(matches!(wad.read_entry(&entry), Err(WadError::UnknownEntryType(9))));
    }

    #[test]
    fn empty_archive_opens() {
        let data = build_wad(&[]);
        let wad = WadReader::new(Cursor::new(data)).unwrap();
        assert!(wad.entries().is_empty());
        assert!(wad.lookup(0x1).is_none());
    }

    #[test]
    fn bad_magic_and_version() {
        let mut data = build_wad(&[]);
        data[0] = b'X';
        assert!(matches!(Wad::read(&mut Cursor::new(&data)), Err(WadError::BadMagic)));
        data[0] = b'R';
        data[2] = 7;
        assert!(matches!(
            Wad::read(&mut Cursor::new(&data)),
            Err(WadError::UnsupportedVersion(7, 0))
        ));
    }

    #[test]
    fn out_of_bounds_entry_rejected_at_open() {
        let mut data = build_wad(&[(0x49, WadFormat::Raw, b"abcd", 4, 0)]);
        let len = data.len();
        data.truncate(len - 2);  // cut into the payload
        assert!(matches!(
            Wad::read(&mut Cursor::new(&data)),
            Err(WadError::IndexOutOfBounds { path_hash: 0x49 })
        ));
    }

    #[test]
    fn entries_by_offset_sorts() {
        let data = build_wad(&[
            (0x2, WadFormat::Raw, b"bb", 2, 0),
            (0x1, WadFormat::Raw, b"a", 1, 0),
        ]);
        let wad = WadReader::new(Cursor::new(data)).unwrap();
        let sorted = wad.wad().entries_by_offset();
        assert!(sorted.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn compressed_sizes_fit_in_file() {
        let data = build_wad(&[
            (0x2, WadFormat::Raw, b"bb", 2, 0),
            (0x1, WadFormat::Raw, b"aaaa", 4, 0),
        ]);
        let file_size = data.len() as u64;
        let wad = WadReader::new(Cursor::new(data)).unwrap();
        let total: u64 = wad.entries().iter().map(|e| e.size as u64).sum();
        assert!(total <= file_size);
        for e in wad.entries() {
            assert!(e.offset + e.size as u64 <= file_size);
        }
    }

    #[test]
    fn extension_sniffing() {
        assert_eq!(sniff_extension(b"\x89PNG\x0d\x0a\x1a\x0a...."), Some("png"));
        assert_eq!(sniff_extension(b"PROP\x03\x00\x00\x00"), Some("bin"));
        assert_eq!(sniff_extension(b"{\"key\": 1}"), Some("json"));
        assert_eq!(sniff_extension(b"DDS |......"), Some("dds"));
        assert_eq!(sniff_extension(b"\x00\x00\x00\x00garbage"), None);
    }
}
