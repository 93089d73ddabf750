use std::any::Any;
use std::io::Read;
use nom::{
    number::complete::{le_u8, le_i8, le_u16, le_i16, le_u32, le_i32, le_u64, le_i64, le_f32},
    bytes::complete::take,
    combinator::map,
    sequence::tuple,
    multi::{count, length_count},
};
use super::{
    PropEntry,
    PropError,
    PropFile,
    PropPatchEntry,
    data::*,
    prop_map_keykind,
    prop_map_kind,
};
use riftkit_hashes::{fnv::compute_prop_hash, HashDef};
use riftkit_utils::{
    parsing::{ParseError, ReadArray},
    parse_buf,
};

type Result<T, E = PropError> = std::result::Result<T, E>;


/// Wire tag to canonical kind conversion, parameterized by format revision
///
/// The tag numbering drifted twice: complex tags moved to the `0x80` band in
/// patch 9.23, and a slot for [PropKind::Container2] was inserted at `0x81`
/// in patch 10.8. The revision is supplied by the caller as
/// `major * 100 + minor` of the patch the file originates from; this type is
/// the only place the drift is handled.
#[derive(Debug, Copy, Clone)]
pub struct TagMapper {
    version: u32,
}

impl TagMapper {
    /// Mapper for the current wire numbering
    pub const fn latest() -> Self {
        Self { version: 1008 }
    }

    /// Mapper for an explicit revision number
    pub const fn for_version(version: u32) -> Self {
        Self { version }
    }

    /// Mapper for a `major.minor` patch version
    pub const fn for_patch(major: u32, minor: u32) -> Self {
        Self { version: major * 100 + minor }
    }

    /// Convert a raw wire tag to its canonical kind
    pub fn canonicalize(&self, raw: u8) -> Result<PropKind, u8> {
        // Work in u16, the remappings can push past 0xff on bogus input
        let mut v = raw as u16;
        if self.version < 923 {
            // Complex tags followed the scalars directly, and Path did not exist
            if v == 18 {
                v = 0x80;
            } else if v >= 19 {
                v = 0x80 + v - 18;
            }
        }
        if self.version < 1008 && v >= 0x81 {
            v += 1;
        }
        if v >= 0x80 {
            v = v - 0x80 + PropKind::Container as u16;
        }
        u8::try_from(v).ok()
            .and_then(|v| PropKind::try_from(v).ok())
            .ok_or(raw)
    }
}

impl Default for TagMapper {
    fn default() -> Self {
        Self::latest()
    }
}


/// Parser-local failure, carried through nom results
#[derive(Debug)]
pub(crate) enum Fail {
    Nom(nom::error::ErrorKind),
    UnknownTypeTag(u8),
    MapKeyNotHashable(PropKind),
    SizeMismatch,
    BadOptionCount(u8),
    BadUtf8,
}

impl<'a> nom::error::ParseError<&'a [u8]> for Fail {
    fn from_error_kind(_input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        Fail::Nom(kind)
    }

    fn append(_input: &'a [u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

pub(crate) type PIResult<'a, O> = nom::IResult<&'a [u8], O, Fail>;

pub(crate) fn to_prop_error(e: nom::Err<Fail>) -> PropError {
    match e {
        nom::Err::Incomplete(_) => ParseError::NotEnoughData.into(),
        nom::Err::Error(f) | nom::Err::Failure(f) => match f {
            Fail::Nom(nom::error::ErrorKind::Eof) => ParseError::NotEnoughData.into(),
            Fail::Nom(_) | Fail::BadOptionCount(_) => ParseError::Error.into(),
            Fail::UnknownTypeTag(v) => PropError::UnknownTypeTag(v),
            Fail::MapKeyNotHashable(k) => PropError::MapKeyNotHashable(k as u8),
            Fail::SizeMismatch => PropError::EntryLengthMismatch { path_hash: 0 },
            Fail::BadUtf8 => PropError::InvalidString,
        }
    }
}

/// Advance a slice through a nom step, converting failures
macro_rules! step {
    ($i:ident, $e:expr) => {{
        let (rest, v) = $e.map_err(to_prop_error)?;
        $i = rest;
        v
    }}
}


/// Parse a wire tag into a canonical kind
fn parse_kind(i: &[u8], tags: TagMapper) -> PIResult<PropKind> {
    let (i, raw) = le_u8(i)?;
    match tags.canonicalize(raw) {
        Ok(kind) => Ok((i, kind)),
        Err(raw) => Err(nom::Err::Failure(Fail::UnknownTypeTag(raw))),
    }
}

fn parse_prop_string(i: &[u8]) -> PIResult<String> {
    let (i, n) = le_u16(i)?;
    let (i, bytes) = take(n)(i)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok((i, s.to_string())),
        Err(_) => Err(nom::Err::Failure(Fail::BadUtf8)),
    }
}

/// Parse a `u16` field count followed by that many fields
pub(crate) fn parse_fields(i: &[u8], tags: TagMapper) -> PIResult<Vec<PropField>> {
    let (i, n) = le_u16(i)?;
    count(|i| parse_field(i, tags), n as usize)(i)
}

/// Parse a single field: name, tag, payload
pub(crate) fn parse_field(i: &[u8], tags: TagMapper) -> PIResult<PropField> {
    let (i, name) = map(le_u32, FieldName::from)(i)?;
    let (i, kind) = parse_kind(i, tags)?;
    let (i, value) = parse_value(i, kind, tags)?;
    Ok((i, PropField { name, kind, value }))
}

/// Parse a payload of the given kind into its boxed value
pub(crate) fn parse_value(i: &[u8], kind: PropKind, tags: TagMapper) -> PIResult<Box<dyn Any>> {
    prop_map_kind!(kind, T, {
        let (i, v) = T::parse(i, tags)?;
        Ok((i, Box::new(v) as Box<dyn Any>))
    })
}


/// Trait satisfied by values that can be parsed from wire data
pub(crate) trait PropParse where Self: Sized {
    fn parse(i: &[u8], tags: TagMapper) -> PIResult<Self>;
}

macro_rules! impl_propparse {
    ($type:ty, $expr:expr) => {
        impl PropParse for $type {
            fn parse(i: &[u8], _tags: TagMapper) -> PIResult<Self> { $expr(i) }
        }
    };
    ($type:ty, =$parser:expr) => {
        impl_propparse!($type, map($parser, Self::from));
    };
    ($type:ty, =>($($parser:expr),* $(,)?)) => {
        impl_propparse!($type, map(tuple(($($parser,)*)), <$type>::from));
    };
}

// The "none" payload is three unused u16 values
impl_propparse!(PropNone, map(take(6usize), |_| Self()));
impl_propparse!(PropBool, map(le_u8, |v| Self(v != 0u8)));
impl_propparse!(PropS8, =le_i8);
impl_propparse!(PropU8, =le_u8);
impl_propparse!(PropS16, =le_i16);
impl_propparse!(PropU16, =le_u16);
impl_propparse!(PropS32, =le_i32);
impl_propparse!(PropU32, =le_u32);
impl_propparse!(PropS64, =le_i64);
impl_propparse!(PropU64, =le_u64);
impl_propparse!(PropFloat, =le_f32);
impl_propparse!(PropVec2, =>(le_f32, le_f32));
impl_propparse!(PropVec3, =>(le_f32, le_f32, le_f32));
impl_propparse!(PropVec4, =>(le_f32, le_f32, le_f32, le_f32));
impl_propparse!(PropColor, map(tuple((le_u8, le_u8, le_u8, le_u8)), |t| Self { r: t.0, g: t.1, b: t.2, a: t.3 }));
impl_propparse!(PropMatrix, map(tuple((le_f32, le_f32, le_f32, le_f32,
                                       le_f32, le_f32, le_f32, le_f32,
                                       le_f32, le_f32, le_f32, le_f32,
                                       le_f32, le_f32, le_f32, le_f32)),
                                       |t| Self([
                                       [t.0, t.1, t.2, t.3],
                                       [t.4, t.5, t.6, t.7],
                                       [t.8, t.9, t.10, t.11],
                                       [t.12, t.13, t.14, t.15]])
                                       ));
impl_propparse!(PropString, map(parse_prop_string, Self));
impl_propparse!(PropHash, map(map(le_u32, HashValue::from), Self));
impl_propparse!(PropPath, map(map(le_u64, PathValue::from), Self));
impl_propparse!(PropLink, map(map(le_u32, EntryPath::from), Self));
impl_propparse!(PropFlag, map(le_u8, |v| Self(v != 0u8)));

impl PropParse for PropList {
    fn parse(i: &[u8], tags: TagMapper) -> PIResult<Self> {
        let (i, kind) = parse_kind(i, tags)?;
        // The size field is an end-of-container sentinel, old writers are
        // unreliable about it; the element count is authoritative
        let (i, (_size, n)) = tuple((le_u32, le_u32))(i)?;
        let (i, values) = prop_map_kind!(kind, T, {
            let (i, v) = count(|i| T::parse(i, tags), n as usize)(i)?;
            (i, Box::new(v) as Box<dyn Any>)
        });
        Ok((i, Self { kind, values }))
    }
}

macro_rules! impl_propparse_structured {
    ($type:ty) => {
        impl PropParse for $type {
            fn parse(i: &[u8], tags: TagMapper) -> PIResult<Self> {
                let (i, ctype) = map(le_u32, TypeName::from)(i)?;
                if ctype.is_null() {
                    return Ok((i, Self { ctype, fields: vec![] }));
                }
                let (i, size) = le_u32(i)?;
                let before = i.len();
                let (i, fields) = parse_fields(i, tags)?;
                if before - i.len() != size as usize {
                    return Err(nom::Err::Failure(Fail::SizeMismatch));
                }
                Ok((i, Self { ctype, fields }))
            }
        }
    }
}

impl_propparse_structured!(PropStruct);
impl_propparse_structured!(PropEmbed);

impl PropParse for PropOption {
    fn parse(i: &[u8], tags: TagMapper) -> PIResult<Self> {
        let (i, kind) = parse_kind(i, tags)?;
        let (i, n) = le_u8(i)?;
        let (i, value) = match n {
            0 => (i, None),
            1 => {
                let (i, v) = parse_value(i, kind, tags)?;
                (i, Some(v))
            }
            n => return Err(nom::Err::Failure(Fail::BadOptionCount(n))),
        };
        Ok((i, Self { kind, value }))
    }
}

impl PropParse for PropMap {
    fn parse(i: &[u8], tags: TagMapper) -> PIResult<Self> {
        let (i, (ktype, vtype)) = tuple((
            |i| parse_kind(i, tags),
            |i| parse_kind(i, tags),
        ))(i)?;
        if !ktype.is_hashable() {
            return Err(nom::Err::Failure(Fail::MapKeyNotHashable(ktype)));
        }
        let (i, (_size, n)) = tuple((le_u32, le_u32))(i)?;
        let (i, values) = prop_map_keykind!(ktype, K, prop_map_kind!(vtype, V, {
            let (i, v) = count(
                nom::sequence::pair(|i| K::parse(i, tags), |i| V::parse(i, tags)),
                n as usize,
            )(i)?;
            (i, Box::new(v) as Box<dyn Any>)
        }));
        Ok((i, Self { ktype, vtype, values }))
    }
}


/// Parse a whole PROP/PTCH file from a byte slice
pub(crate) fn parse_prop_file(data: &[u8], tags: TagMapper, strict: bool) -> Result<PropFile> {
    let mut i = data;

    let is_patch = if i.starts_with(b"PTCH") {
        i = &i[4..];
        let prologue: (u32, u32) = step!(i, tuple((le_u32::<_, Fail>, le_u32))(i));
        if prologue != (1, 0) {
            return Err(PropError::UnsupportedVersion(prologue.0));
        }
        true
    } else {
        false
    };

    if !i.starts_with(b"PROP") {
        return Err(PropError::BadMagic);
    }
    i = &i[4..];
    let version = step!(i, le_u32::<_, Fail>(i));

    let linked_files = if version >= 2 {
        step!(i, length_count(le_u32, parse_prop_string)(i))
    } else {
        vec![]
    };

    let entry_types: Vec<TypeName> =
        step!(i, length_count(le_u32, map(le_u32, TypeName::from))(i));

    let mut entries = Vec::with_capacity(entry_types.len());
    for ctype in entry_types {
        let length = step!(i, le_u32::<_, Fail>(i));
        let before = i.len();
        let path = step!(i, map(le_u32, EntryPath::from)(i));
        let fields = step!(i, parse_fields(i, tags));
        if before - i.len() != length as usize {
            return Err(PropError::EntryLengthMismatch { path_hash: path.hash });
        }
        entries.push(PropEntry { path, ctype, fields });
    }

    let patch_entries = if is_patch && version >= 3 {
        let n = step!(i, le_u32::<_, Fail>(i));
        let mut patches: Vec<PropPatchEntry> = Vec::new();
        for _ in 0..n {
            let target = step!(i, map(le_u32, EntryPath::from)(i));
            let kind = step!(i, parse_kind(i, tags));
            let dotted_path = step!(i, parse_prop_string(i));
            let value = step!(i, parse_value(i, kind, tags));

            let segments: Vec<&str> = dotted_path.split('.').collect();
            let leaf_name: FieldName = compute_prop_hash(segments[segments.len() - 1]).into();
            let leaf = PropField { name: leaf_name, kind, value };

            let entry = match patches.iter_mut().find(|e| e.path == target) {
                Some(entry) => entry,
                None => {
                    patches.push(PropPatchEntry { path: target, fields: vec![] });
                    patches.last_mut().expect("just pushed")
                }
            };
            assign_nested_field(&mut entry.fields, &segments, leaf);
        }
        patches
    } else {
        vec![]
    };

    if !i.is_empty() {
        if strict {
            return Err(PropError::TrailingData(i.len()));
        }
        // Files from very old patches carry junk after the last entry
        log::warn!("ignoring {} trailing bytes after last PROP section", i.len());
    }

    Ok(PropFile { version, is_patch, linked_files, entries, patch_entries })
}

/// Materialize a dotted-path assignment into a field tree
///
/// Intermediate segments become untyped embeds; the last segment holds the
/// patched value, replacing any previous field with the same name.
fn assign_nested_field(fields: &mut Vec<PropField>, segments: &[&str], leaf: PropField) {
    if segments.len() <= 1 {
        match fields.iter_mut().find(|f| f.name == leaf.name) {
            Some(field) => *field = leaf,
            None => fields.push(leaf),
        }
        return;
    }

    let name: FieldName = compute_prop_hash(segments[0]).into();
    let index = match fields.iter().position(|f| f.name == name && f.downcast::<PropEmbed>().is_some()) {
        Some(index) => index,
        None => {
            fields.push(PropField {
                name,
                kind: PropKind::Embed,
                value: Box::new(PropEmbed { ctype: TypeName::from(0), fields: vec![] }),
            });
            fields.len() - 1
        }
    };
    let embed = fields[index].downcast_mut::<PropEmbed>().expect("embed checked above");
    assign_nested_field(&mut embed.fields, &segments[1..], leaf);
}


/// Scan entries from a PROP reader without parsing them all
///
/// The header and type table are parsed upfront; entries are then visited
/// one by one and can be skipped, filtered or parsed. This keeps memory flat
/// when walking large directories of files for a few entry types.
pub struct PropScanner<R: Read> {
    reader: R,
    types_iter: std::vec::IntoIter<TypeName>,
    tags: TagMapper,
    /// `true` when scanning a PTCH file
    ///
    /// The patch section, when present, follows the last entry and is not
    /// visited by the scanner.
    pub is_patch: bool,
}

impl<R: Read> PropScanner<R> {
    /// Create a scanner with the current wire numbering
    pub fn new(reader: R) -> Result<Self> {
        Self::with_tags(reader, TagMapper::latest())
    }

    /// Create a scanner, parse the header
    pub fn with_tags(mut reader: R, tags: TagMapper) -> Result<Self> {
        let (is_patch, version): (bool, u32) = {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf[..4])?;
            let is_patch = &buf[..4] == b"PTCH";
            if is_patch {
                let prologue_buf = reader.read_array::<8>()?;
                let prologue = parse_buf!(prologue_buf, tuple((le_u32::<_, ()>, le_u32)));
                if prologue != (1, 0) {
                    return Err(PropError::UnsupportedVersion(prologue.0));
                }
                reader.read_exact(&mut buf[..4])?;
            }
            if &buf[..4] != b"PROP" {
                return Err(PropError::BadMagic);
            }
            reader.read_exact(&mut buf[4..])?;
            let version = parse_buf!(buf[4..], le_u32::<_, ()>);
            (is_patch, version)
        };

        if version >= 2 {
            // Skip linked files
            let buf = reader.read_array::<4>()?;
            let n = parse_buf!(buf, le_u32::<_, ()>);
            for _ in 0..n {
                let buf = reader.read_array::<2>()?;
                let n = parse_buf!(buf, le_u16::<_, ()>);
                std::io::copy(&mut reader.by_ref().take(n as u64), &mut std::io::sink())?;
            }
        }

        let entry_types: Vec<TypeName> = {
            let buf = reader.read_array::<4>()?;
            let n = parse_buf!(buf, le_u32::<_, ()>);
            let mut buf = Vec::new();
            reader.by_ref().take(4 * n as u64).read_to_end(&mut buf)?;
            parse_buf!(buf, count(map(le_u32::<_, ()>, TypeName::from), n as usize))
        };

        Ok(Self { reader, types_iter: entry_types.into_iter(), tags, is_patch })
    }

    /// Visit entries, choosing per entry whether to parse or skip
    pub fn scan(self) -> PropScanVisit<R> {
        PropScanVisit {
            reader: self.reader,
            types_iter: self.types_iter,
            tags: self.tags,
            pending_length: None,
        }
    }

    /// Parse entries matching a filter on (path, type), skip the others
    pub fn filter_parse<F>(self, f: F) -> PropScanFilterParse<R, F>
    where F: Fn(EntryPath, TypeName) -> bool {
        PropScanFilterParse {
            reader: self.reader,
            types_iter: self.types_iter,
            tags: self.tags,
            filter: f,
        }
    }

    /// Parse every entry
    pub fn parse(self) -> PropScanParse<R> {
        PropScanParse {
            reader: self.reader,
            types_iter: self.types_iter,
            tags: self.tags,
        }
    }
}

/// Read the next entry header, return the remaining length and the path
fn next_entry_header<R: Read>(reader: &mut R) -> Result<(u32, EntryPath)> {
    let buf = reader.read_array::<{4 + 4}>()?;
    let (length, path) = parse_buf!(buf, tuple((le_u32::<_, ()>, map(le_u32, EntryPath::from))));
    // The path has been consumed, deduct it from the length
    Ok((length.saturating_sub(4), path))
}

/// Read and parse entry fields from `length` bytes
fn read_entry_fields<R: Read>(reader: &mut R, length: u32, tags: TagMapper) -> Result<Vec<PropField>> {
    let mut buf = Vec::new();
    if reader.by_ref().take(length as u64).read_to_end(&mut buf)? != length as usize {
        return Err(ParseError::NotEnoughData.into());
    }
    let (rest, fields) = parse_fields(&buf, tags).map_err(to_prop_error)?;
    if !rest.is_empty() {
        return Err(PropError::EntryLengthMismatch { path_hash: 0 });
    }
    Ok(fields)
}

/// Skip entry fields
fn skip_entry_fields<R: Read>(reader: &mut R, length: u32) -> Result<()> {
    std::io::copy(&mut reader.by_ref().take(length as u64), &mut std::io::sink())?;
    Ok(())
}


/// Scanner iterator parsing filtered entries
pub struct PropScanFilterParse<R, F>
where R: Read, F: Fn(EntryPath, TypeName) -> bool {
    reader: R,
    types_iter: std::vec::IntoIter<TypeName>,
    tags: TagMapper,
    filter: F,
}

impl<R, F> Iterator for PropScanFilterParse<R, F>
where R: Read, F: Fn(EntryPath, TypeName) -> bool {
    type Item = Result<PropEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ctype = self.types_iter.next()?;
            let result = (|| {
                let (length, path) = next_entry_header(&mut self.reader)?;
                if (self.filter)(path, ctype) {
                    let fields = read_entry_fields(&mut self.reader, length, self.tags)?;
                    Ok(Some(PropEntry { path, ctype, fields }))
                } else {
                    skip_entry_fields(&mut self.reader, length)?;
                    Ok(None)
                }
            })();
            match result {
                Ok(None) => continue,
                Ok(Some(v)) => return Some(Ok(v)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}


/// Scanner iterator parsing every entry
pub struct PropScanParse<R>
where R: Read {
    reader: R,
    types_iter: std::vec::IntoIter<TypeName>,
    tags: TagMapper,
}

impl<R: Read> Iterator for PropScanParse<R> {
    type Item = Result<PropEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let ctype = self.types_iter.next()?;
        Some((|| {
            let (length, path) = next_entry_header(&mut self.reader)?;
            let fields = read_entry_fields(&mut self.reader, length, self.tags)?;
            Ok(PropEntry { path, ctype, fields })
        })())
    }
}


/// Iterator-like scanner letting the caller read or skip each entry
///
/// It does not implement `Iterator` because items borrow the scanner.
pub struct PropScanVisit<R>
where R: Read {
    reader: R,
    types_iter: std::vec::IntoIter<TypeName>,
    tags: TagMapper,
    pending_length: Option<u32>,
}

/// A visited entry header; call [read()](Self::read) to parse the entry
pub struct PropScanItem<'a, R>
where R: Read {
    owner: &'a mut PropScanVisit<R>,
    /// Entry path
    pub path: EntryPath,
    /// Entry type
    pub ctype: TypeName,
}

impl<'a, R> PropScanItem<'a, R>
where R: Read {
    /// Parse the visited entry
    pub fn read(self) -> Result<PropEntry> {
        let length = self.owner.pending_length.take().expect("entry already consumed");
        let fields = read_entry_fields(&mut self.owner.reader, length, self.owner.tags)?;
        Ok(PropEntry { path: self.path, ctype: self.ctype, fields })
    }
}

impl<R> PropScanVisit<R>
where R: Read {
    /// Advance to the next entry header
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Result<PropScanItem<'_, R>>> {
        // Skip the previous entry if it was not read
        if let Some(length) = self.pending_length.take() {
            if let Err(err) = skip_entry_fields(&mut self.reader, length) {
                return Some(Err(err));
            }
        }
        let ctype = self.types_iter.next()?;
        match next_entry_header(&mut self.reader) {
            Ok((length, path)) => {
                self.pending_length = Some(length);
                Some(Ok(PropScanItem { owner: self, path, ctype }))
            }
            Err(err) => Some(Err(err)),
        }
    }
}
