//! Support of PROP property binaries
//!
//! PROP files carry typed, self-describing property trees for game data; a
//! PTCH file is a PROP file with an additional section of dotted-path
//! patches. Everything is named by FNV-1a hashes on the wire, so reading a
//! file never requires hash mappings, only displaying it does.
//!
//! Wire tags drifted across format revisions; parsing is parameterized by a
//! [TagMapper] built from the patch version the file originates from.

#[macro_use]
mod macros;
mod parser;
mod serializer;
mod text_tree;
mod json;
mod visitor;
mod gather_hashes;
pub mod data;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use riftkit_hashes::{HashError, HashKind, HashMapper};
use riftkit_hashes::fnv::PropNameKind;
use riftkit_utils::parsing::ParseError;
pub use riftkit_hashes::fnv::{compute_prop_hash, compute_prop_hash_const, prop_hash_from_str};
pub use data::*;
pub use parser::{PropScanner, PropScanVisit, PropScanItem, PropScanFilterParse, PropScanParse, TagMapper};
pub use serializer::{PropSerializer, PropEntriesSerializer};
pub use text_tree::TextTreeSerializer;
pub use json::JsonSerializer;
pub use visitor::{PropVisitor, PropTraversal};

type Result<T, E = PropError> = std::result::Result<T, E>;


/// Error in a PROP file
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum PropError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("parsing error")]
    Parsing(#[from] ParseError),
    #[error("bad magic code")]
    BadMagic,
    #[error("version not supported: {0}")]
    UnsupportedVersion(u32),
    #[error("entry {path_hash:08x} length does not match its content")]
    EntryLengthMismatch { path_hash: u32 },
    #[error("unknown type tag: {0}")]
    UnknownTypeTag(u8),
    #[error("kind not usable as map key: {0}")]
    MapKeyNotHashable(u8),
    #[error("invalid UTF-8 string")]
    InvalidString,
    #[error("{0} trailing bytes after last section")]
    TrailingData(usize),
}


/// Generic mapping with one value per kind of property hash
///
/// `U` is the value for the path hashes, which live in the 64-bit archive
/// namespace rather than the 32-bit property namespace.
pub struct PropHashKindMapping<T, U> {
    /// Entry path hashes
    pub entry_path: T,
    /// Type name hashes
    pub type_name: T,
    /// Field name hashes
    pub field_name: T,
    /// Hashed value hashes
    pub hash_value: T,
    /// Archive path hashes
    pub path_value: U,
}

impl<T, U> PropHashKindMapping<T, U> {
    /// Access the field matching a hash kind
    #[inline]
    pub fn get(&self, kind: PropNameKind) -> &T {
        match kind {
            PropNameKind::EntryPath => &self.entry_path,
            PropNameKind::TypeName => &self.type_name,
            PropNameKind::FieldName => &self.field_name,
            PropNameKind::HashValue => &self.hash_value,
        }
    }

    /// Mutably access the field matching a hash kind
    #[inline]
    pub fn get_mut(&mut self, kind: PropNameKind) -> &mut T {
        match kind {
            PropNameKind::EntryPath => &mut self.entry_path,
            PropNameKind::TypeName => &mut self.type_name,
            PropNameKind::FieldName => &mut self.field_name,
            PropNameKind::HashValue => &mut self.hash_value,
        }
    }
}

impl<T: Default, U: Default> Default for PropHashKindMapping<T, U> {
    fn default() -> Self {
        Self {
            entry_path: T::default(),
            type_name: T::default(),
            field_name: T::default(),
            hash_value: T::default(),
            path_value: U::default(),
        }
    }
}


/// Mappers for all kinds of property hashes
pub type PropHashMappers = PropHashKindMapping<PropHashMapper, HashMapper<u64, 64>>;

impl PropHashMappers {
    /// Create mappers, loaded from their conventional files in a directory
    pub fn from_dirpath(path: &Path) -> Result<Self, HashError> {
        let mut this = Self::default();
        this.load_dirpath(path)?;
        Ok(this)
    }

    /// Load all mappers from their conventional files in a directory
    pub fn load_dirpath(&mut self, path: &Path) -> Result<(), HashError> {
        for kind in PropNameKind::VARIANTS {
            self.get_mut(kind).load_path(path.join(kind.mapping_path()))?;
        }
        // Path values share the game archive namespace and its mapping file
        self.path_value.load_path(path.join(HashKind::WadGame.mapping_path()))?;
        Ok(())
    }

    /// Write all mappers to their conventional files in a directory
    pub fn write_dirpath(&self, path: &Path) -> Result<(), HashError> {
        for kind in PropNameKind::VARIANTS {
            self.get(kind).write_path(path.join(kind.mapping_path()))?;
        }
        self.path_value.write_path(path.join(HashKind::WadGame.mapping_path()))?;
        Ok(())
    }
}

/// Sets of hashes collected from decoded files, one per kind
pub type PropHashSets = PropHashKindMapping<HashSet<u32>, HashSet<u64>>;


/// A parsed PROP or PTCH file
pub struct PropFile {
    /// Format version
    pub version: u32,
    /// `true` when the outer magic was `PTCH`
    pub is_patch: bool,
    /// Linked file names (`version >= 2`)
    pub linked_files: Vec<String>,
    /// Entries, in declaration order
    pub entries: Vec<PropEntry>,
    /// Materialized patch entries (`PTCH` files with `version >= 3`)
    pub patch_entries: Vec<PropPatchEntry>,
}

impl PropFile {
    /// Parse a whole file, assuming the current wire numbering
    pub fn from_slice(data: &[u8]) -> Result<PropFile> {
        Self::from_slice_with(data, TagMapper::latest())
    }

    /// Parse a whole file with an explicit tag mapping
    ///
    /// Trailing bytes after the last section are tolerated with a warning.
    pub fn from_slice_with(data: &[u8], tags: TagMapper) -> Result<PropFile> {
        parser::parse_prop_file(data, tags, false)
    }

    /// Same as [from_slice_with()](Self::from_slice_with), rejecting trailing bytes
    pub fn from_slice_strict(data: &[u8], tags: TagMapper) -> Result<PropFile> {
        parser::parse_prop_file(data, tags, true)
    }

    /// Parse a whole file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<PropFile> {
        Self::from_path_with(path, TagMapper::latest())
    }

    /// Parse a whole file from a path with an explicit tag mapping
    pub fn from_path_with<P: AsRef<Path>>(path: P, tags: TagMapper) -> Result<PropFile> {
        Self::from_slice_with(&fs::read(path.as_ref())?, tags)
    }

    /// Scan entries from a reader
    pub fn scan_entries_from_reader<R: io::Read>(reader: R) -> Result<PropScanner<R>> {
        PropScanner::new(reader)
    }

    /// Scan entries from a file path
    pub fn scan_entries_from_path<P: AsRef<Path>>(path: P) -> Result<PropScanner<io::BufReader<fs::File>>> {
        let file = fs::File::open(path)?;
        PropScanner::new(io::BufReader::new(file))
    }

    /// Get an entry by its path
    pub fn entry(&self, path: EntryPath) -> Option<&PropEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Get a patch entry by its target path
    pub fn patch_entry(&self, path: EntryPath) -> Option<&PropPatchEntry> {
        self.patch_entries.iter().find(|e| e.path == path)
    }
}


/// Top-level object of a PROP file
pub struct PropEntry {
    /// Entry path (hashed)
    pub path: EntryPath,
    /// Entry type (hashed)
    pub ctype: TypeName,
    /// Entry fields, in wire order
    pub fields: Vec<PropField>,
}

use gather_hashes::GatherHashes;

impl PropEntry {
    /// Collect every hash of the entry tree into the given sets
    pub fn gather_prop_hashes(&self, hashes: &mut PropHashSets) {
        self.gather_hashes(hashes);
    }

    /// Get a field by its name
    pub fn get(&self, name: FieldName) -> Option<&PropField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a field by its name and downcast it
    pub fn getv<T: PropValue + 'static>(&self, name: FieldName) -> Option<&T> {
        self.get(name).and_then(|field| field.downcast::<T>())
    }
}


/// Patches of a PTCH file targeting one entry
///
/// Dotted-path patches materialize as a tree of untyped embeds holding the
/// leaf values, so `a.b = v` reads back as `{a: {b: v}}`.
pub struct PropPatchEntry {
    /// Path of the patched entry (hashed)
    pub path: EntryPath,
    /// Materialized patch fields
    pub fields: Vec<PropField>,
}

impl PropPatchEntry {
    /// Get a field by its name
    pub fn get(&self, name: FieldName) -> Option<&PropField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a field by its name and downcast it
    pub fn getv<T: PropValue + 'static>(&self, name: FieldName) -> Option<&T> {
        self.get(name).and_then(|field| field.downcast::<T>())
    }
}


/// `.bin` basenames that are not property binaries
pub const NON_PROP_BASENAMES: [&str; 2] = ["atlas_info.bin", "tftoutofgamecharacterdata.bin"];

/// Return `true` if a path looks like a property binary
pub fn is_prop_path<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.extension().is_some_and(|ext| ext == "bin")
        && path.file_name()
            .and_then(|s| s.to_str())
            .map(|s| !NON_PROP_BASENAMES.contains(&s))
            .unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;
    use riftkit_hashes::HashDef;

    struct Builder(Vec<u8>);

    impl Builder {
        fn new() -> Self { Self(Vec::new()) }
        fn u8(mut self, v: u8) -> Self { self.0.push(v); self }
        fn u16(mut self, v: u16) -> Self { self.0.extend_from_slice(&v.to_le_bytes()); self }
        fn u32(mut self, v: u32) -> Self { self.0.extend_from_slice(&v.to_le_bytes()); self }
        fn raw(mut self, v: &[u8]) -> Self { self.0.extend_from_slice(v); self }
        fn string(mut self, s: &str) -> Self {
            self.0.extend_from_slice(&(s.len() as u16).to_le_bytes());
            self.0.extend_from_slice(s.as_bytes());
            self
        }
    }

    /// `PROP` v3 file with no linked files and the given (type, entry body) pairs
    fn prop_v3(entries: &[(u32, &[u8])]) -> Vec<u8> {
        let mut b = Builder::new()
            .raw(b"PROP")
            .u32(3)
            .u32(0)  // linked files
            .u32(entries.len() as u32);
        for (ctype, _) in entries {
            b = b.u32(*ctype);
        }
        for (_, body) in entries {
            b = b.raw(body);
        }
        b.0
    }

    /// Entry body: length, path, field count, raw field bytes
    fn entry_body(path: u32, field_count: u16, fields: &[u8]) -> Vec<u8> {
        Builder::new()
            .u32(4 + 2 + fields.len() as u32)
            .u32(path)
            .u16(field_count)
            .raw(fields)
            .0
    }

    #[test]
    fn single_bool_field() {
        let fields = Builder::new().u32(0x22222222).u8(1).u8(1).0;  // Bool = true
        let data = prop_v3(&[(0xDEADBEEF, &entry_body(0x11111111, 1, &fields))]);

        let prop = PropFile::from_slice(&data).unwrap();
        assert_eq!(prop.version, 3);
        assert!(!prop.is_patch);
        assert!(prop.linked_files.is_empty());
        assert_eq!(prop.entries.len(), 1);

        let entry = prop.entry(0x11111111.into()).unwrap();
        assert_eq!(entry.ctype, TypeName::from(0xDEADBEEF));
        assert_eq!(entry.path, EntryPath::from(0x11111111));
        assert!(prop.entry(0x1.into()).is_none());
        let field = entry.get(0x22222222.into()).unwrap();
        assert_eq!(field.kind, PropKind::Bool);
        assert_eq!(entry.getv::<PropBool>(0x22222222.into()).unwrap().0, true);
    }

    #[test]
    fn entry_length_mismatch_is_rejected() {
        let fields = Builder::new().u32(0x22222222).u8(1).u8(1).0;
        let mut body = entry_body(0x11111111, 1, &fields);
        body[0] += 1;  // corrupt the length
        let data = prop_v3(&[(0xDEADBEEF, &body)]);
        assert!(matches!(
            PropFile::from_slice(&data),
            Err(PropError::EntryLengthMismatch { path_hash: 0x11111111 })
        ));
    }

    #[test]
    fn container_of_u32() {
        // Container tag is 0x80 on current wire, element tag U32 = 7
        let fields = Builder::new()
            .u32(0x33).u8(0x80)
            .u8(7).u32(12).u32(2).u32(7).u32(9)
            .0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &fields))]);

        let prop = PropFile::from_slice(&data).unwrap();
        let entry = &prop.entries[0];
        let field = entry.get(0x33.into()).unwrap();
        assert_eq!(field.kind, PropKind::Container);
        let list = entry.getv::<PropList>(0x33.into()).unwrap();
        assert_eq!(list.kind, PropKind::U32);
        let values: Vec<u32> = list.downcast::<PropU32>().unwrap().iter().map(|v| v.0).collect();
        assert_eq!(values, [7, 9]);
    }

    #[test]
    fn container2_stays_distinct() {
        let fields = Builder::new()
            .u32(0x33).u8(0x81)
            .u8(7).u32(8).u32(1).u32(42)
            .0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &fields))]);
        let prop = PropFile::from_slice(&data).unwrap();
        let field = prop.entries[0].get(0x33.into()).unwrap();
        assert_eq!(field.kind, PropKind::Container2);
        assert!(field.downcast::<PropList>().is_some());
    }

    #[test]
    fn embed_with_size_check() {
        // Embed (0x83): ctype, size, field count, one Bool field
        let inner = Builder::new().u16(1).u32(0x5).u8(1).u8(1).0;  // count + field
        let fields = Builder::new()
            .u32(0x44).u8(0x83)
            .u32(0x99)  // inner ctype
            .u32(inner.len() as u32)
            .raw(&inner)
            .0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &fields))]);
        let prop = PropFile::from_slice(&data).unwrap();
        let embed = prop.entries[0].getv::<PropEmbed>(0x44.into()).unwrap();
        assert_eq!(embed.ctype, TypeName::from(0x99));
        assert_eq!(embed.getv::<PropBool>(0x5.into()).unwrap().0, true);

        // Corrupt the declared size
        let bad_fields = Builder::new()
            .u32(0x44).u8(0x83)
            .u32(0x99)
            .u32(inner.len() as u32 + 1)
            .raw(&inner)
            .u8(0)  // padding so the extra byte exists
            .0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &bad_fields))]);
        assert!(matches!(
            PropFile::from_slice(&data),
            Err(PropError::EntryLengthMismatch { .. })
        ));
    }

    #[test]
    fn null_struct_has_no_fields() {
        // Struct (0x82) with null ctype: no size, no fields
        let fields = Builder::new().u32(0x44).u8(0x82).u32(0).0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &fields))]);
        let prop = PropFile::from_slice(&data).unwrap();
        let value = prop.entries[0].getv::<PropStruct>(0x44.into()).unwrap();
        assert!(value.ctype.is_null());
        assert!(value.fields.is_empty());
    }

    #[test]
    fn option_and_map() {
        // Option (0x85) of String, present
        let option_field = Builder::new()
            .u32(0x50).u8(0x85)
            .u8(16).u8(1).string("hi")
            .0;
        // Map (0x86) of U8 -> String, two pairs
        let map_field = Builder::new()
            .u32(0x51).u8(0x86)
            .u8(3).u8(16).u32(0).u32(2)
            .u8(1).string("one")
            .u8(2).string("two")
            .0;
        let fields = Builder::new().raw(&option_field).raw(&map_field).0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 2, &fields))]);

        let prop = PropFile::from_slice(&data).unwrap();
        let entry = &prop.entries[0];

        let option = entry.getv::<PropOption>(0x50.into()).unwrap();
        assert!(option.is_some());
        assert_eq!(option.downcast::<PropString>().unwrap().0, "hi");

        let map = entry.getv::<PropMap>(0x51.into()).unwrap();
        assert_eq!((map.ktype, map.vtype), (PropKind::U8, PropKind::String));
        let pairs = map.downcast::<PropU8, PropString>().unwrap();
        assert_eq!(pairs.len(), 2);
        let keys: HashSet<u8> = pairs.iter().map(|(k, _)| k.0).collect();
        assert_eq!(keys.len(), pairs.len());
    }

    #[test]
    fn map_key_must_be_hashable() {
        // Bool keys are not allowed
        let map_field = Builder::new()
            .u32(0x51).u8(0x86)
            .u8(1).u8(16).u32(0).u32(0)
            .0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &map_field))]);
        assert!(matches!(
            PropFile::from_slice(&data),
            Err(PropError::MapKeyNotHashable(_))
        ));
    }

    #[test]
    fn unknown_tag_is_reported() {
        let fields = Builder::new().u32(0x52).u8(0x99).0;
        let data = prop_v3(&[(0x1, &entry_body(0x2, 1, &fields))]);
        assert!(matches!(
            PropFile::from_slice(&data),
            Err(PropError::UnknownTypeTag(0x99))
        ));
    }

    #[test]
    fn old_version_has_no_linked_files() {
        let fields = Builder::new().u32(0x22).u8(1).u8(0).0;
        let data = Builder::new()
            .raw(b"PROP")
            .u32(1)  // no linked files section
            .u32(1)
            .u32(0xAB)
            .raw(&entry_body(0xCD, 1, &fields))
            .0;
        let prop = PropFile::from_slice(&data).unwrap();
        assert!(prop.linked_files.is_empty());
        assert_eq!(prop.entries.len(), 1);
        assert_eq!(prop.entries[0].getv::<PropBool>(0x22.into()).unwrap().0, false);
    }

    #[test]
    fn linked_files_are_parsed() {
        let data = Builder::new()
            .raw(b"PROP")
            .u32(2)
            .u32(2)
            .string("a.bin")
            .string("b.bin")
            .u32(0)
            .0;
        let prop = PropFile::from_slice(&data).unwrap();
        assert_eq!(prop.linked_files, ["a.bin", "b.bin"]);
    }

    #[test]
    fn ptch_with_dotted_patch() {
        let mut b = Builder::new()
            .raw(b"PTCH").u32(1).u32(0)
            .raw(b"PROP").u32(3)
            .u32(0)  // linked files
            .u32(0);  // entries
        // one patch: target, Bool kind, path "a.b", value false
        b = b.u32(1)
            .u32(0x11111111)
            .u8(1)
            .string("a.b")
            .u8(0);
        let prop = PropFile::from_slice(&b.0).unwrap();
        assert!(prop.is_patch);
        assert_eq!(prop.patch_entries.len(), 1);

        let patch = prop.patch_entry(0x11111111.into()).unwrap();
        let a = patch.getv::<PropEmbed>(compute_prop_hash("a").into()).unwrap();
        let b = a.getv::<PropBool>(compute_prop_hash("b").into()).unwrap();
        assert_eq!(b.0, false);
    }

    #[test]
    fn single_segment_patch_is_a_direct_field() {
        let b = Builder::new()
            .raw(b"PTCH").u32(1).u32(0)
            .raw(b"PROP").u32(3)
            .u32(0)
            .u32(0)
            .u32(1)
            .u32(0x22)
            .u8(7)  // U32
            .string("count")
            .u32(9);
        let prop = PropFile::from_slice(&b.0).unwrap();
        let patch = prop.patch_entry(0x22.into()).unwrap();
        let value = patch.getv::<PropU32>(compute_prop_hash("count").into()).unwrap();
        assert_eq!(value.0, 9);
    }

    #[test]
    fn ptch_prologue_is_checked() {
        let data = Builder::new().raw(b"PTCH").u32(2).u32(0).raw(b"PROP").u32(3).0;
        assert!(matches!(
            PropFile::from_slice(&data),
            Err(PropError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn trailing_bytes_tolerated_unless_strict() {
        let mut data = prop_v3(&[]);
        data.extend_from_slice(b"junk");
        assert!(PropFile::from_slice(&data).is_ok());
        assert!(matches!(
            PropFile::from_slice_strict(&data, TagMapper::latest()),
            Err(PropError::TrailingData(4))
        ));
    }

    #[test]
    fn tag_remapping_by_version() {
        let pre_923 = TagMapper::for_patch(9, 20);
        assert_eq!(pre_923.canonicalize(18), Ok(PropKind::Container));
        assert_eq!(pre_923.canonicalize(19), Ok(PropKind::Struct));
        assert_eq!(pre_923.canonicalize(24), Ok(PropKind::Flag));
        assert_eq!(pre_923.canonicalize(17), Ok(PropKind::Hash));

        let pre_1008 = TagMapper::for_patch(10, 2);
        assert_eq!(pre_1008.canonicalize(0x80), Ok(PropKind::Container));
        assert_eq!(pre_1008.canonicalize(0x81), Ok(PropKind::Struct));
        assert_eq!(pre_1008.canonicalize(0x86), Ok(PropKind::Flag));
        assert_eq!(pre_1008.canonicalize(18), Ok(PropKind::Path));

        let latest = TagMapper::latest();
        assert_eq!(latest.canonicalize(0x81), Ok(PropKind::Container2));
        assert_eq!(latest.canonicalize(0x87), Ok(PropKind::Flag));
        assert_eq!(latest.canonicalize(0x88), Err(0x88));
    }

    #[test]
    fn scanner_filters_entries() {
        let bool_fields = Builder::new().u32(0x22).u8(1).u8(1).0;
        let data = prop_v3(&[
            (0xA, &entry_body(0x1, 1, &bool_fields)),
            (0xB, &entry_body(0x2, 1, &bool_fields)),
            (0xA, &entry_body(0x3, 1, &bool_fields)),
        ]);

        let scanner = PropFile::scan_entries_from_reader(&data[..]).unwrap();
        let entries: Vec<PropEntry> = scanner
            .filter_parse(|_, ctype| ctype == TypeName::from(0xA))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, EntryPath::from(0x1));
        assert_eq!(entries[1].path, EntryPath::from(0x3));

        let scanner = PropFile::scan_entries_from_reader(&data[..]).unwrap();
        let all: Vec<PropEntry> = scanner.parse().collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn scan_visit_reads_or_skips() {
        let bool_fields = Builder::new().u32(0x22).u8(1).u8(1).0;
        let data = prop_v3(&[
            (0xA, &entry_body(0x1, 1, &bool_fields)),
            (0xB, &entry_body(0x2, 1, &bool_fields)),
        ]);

        let scanner = PropFile::scan_entries_from_reader(&data[..]).unwrap();
        let mut scan = scanner.scan();
        let mut parsed = Vec::new();
        while let Some(item) = scan.next() {
            let item = item.unwrap();
            if item.ctype == TypeName::from(0xB) {
                parsed.push(item.read().unwrap());
            }
        }
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, EntryPath::from(0x2));
    }

    #[test]
    fn prop_path_filter() {
        assert!(is_prop_path("data/characters/aatrox/aatrox.bin"));
        assert!(!is_prop_path("assets/atlas_info.bin"));
        assert!(!is_prop_path("data/file.txt"));
    }
}
