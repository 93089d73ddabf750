use std::io;
use std::io::Write;
use riftkit_hashes::HashDef;
use super::{PropEntry, PropHashMappers};
use super::data::*;
use super::serializer::{PropSerializer, PropEntriesSerializer, PropSerializable};
use super::{prop_map_keykind, prop_map_kind};

// serde serialization cannot be used because hashes need mappers at write
// time, and serde_json does not expose its JSON string escaping


macro_rules! write_sequence {
    ($self:expr, $pat:pat in $seq:expr => $expr:expr) => {{
        for (i, $pat) in $seq.iter().enumerate() {
            if i != 0 {
                $self.write_raw(b",")?;
            }
            $expr
        }
    }}
}


/// Serialize property values to JSON
///
/// Unknown hashes are written as `"{hex}"`; typed compound nodes carry a
/// `__type` discriminator.
pub struct JsonSerializer<'a, W: Write> {
    writer: W,
    hmappers: &'a PropHashMappers,
}

impl<'a, W: Write> JsonSerializer<'a, W> {
    /// Create a serializer resolving hashes with the given mappers
    pub fn new(writer: W, hmappers: &'a PropHashMappers) -> Self {
        Self { writer, hmappers }
    }

    fn write_raw(&mut self, b: &[u8]) -> io::Result<()> {
        self.writer.write_all(b)
    }

    fn write_entry_path(&mut self, h: EntryPath) -> io::Result<()> {
        match h.get_str(self.hmappers) {
            Some(s) => write!(self.writer, "\"{}\"", s),
            _ => write!(self.writer, "\"{{{:x}}}\"", h),
        }
    }

    fn write_type_name(&mut self, h: TypeName) -> io::Result<()> {
        match h.get_str(self.hmappers) {
            Some(s) => write!(self.writer, "\"{}\"", s),
            _ => write!(self.writer, "\"{{{:x}}}\"", h),
        }
    }

    fn write_field_name(&mut self, h: FieldName) -> io::Result<()> {
        match h.get_str(self.hmappers) {
            Some(s) => write!(self.writer, "\"{}\"", s),
            _ => write!(self.writer, "\"{{{:x}}}\"", h),
        }
    }

    fn write_hash_value(&mut self, h: HashValue) -> io::Result<()> {
        match h.get_str(self.hmappers) {
            Some(s) => write!(self.writer, "\"{}\"", s),
            _ => write!(self.writer, "\"{{{:x}}}\"", h),
        }
    }

    fn write_path_value(&mut self, h: PathValue) -> io::Result<()> {
        match h.get_str(self.hmappers) {
            Some(s) => write!(self.writer, "\"{}\"", s),
            _ => write!(self.writer, "\"{{{:x}}}\"", h),
        }
    }

    /// Write JSON string content, escape special chars
    fn write_escaped_json(&mut self, s: &str) -> io::Result<()> {
        let bytes = s.as_bytes();
        let mut cur: usize = 0;
        for (i, &b) in bytes.iter().enumerate() {
            // Escape sequences are rare, no need to optimize them
            let escape: u8 = match b {
                0x08 => b'b',
                0x09 => b't',
                0x0A => b'n',
                0x0C => b'f',
                0x0D => b'r',
                0x22 => b'"',
                0x5C => b'\\',
                0x00..=0x1F => b'u',  // special value
                _ => continue,
            };
            if cur < i {
                self.write_raw(&bytes[cur..i])?;
            }
            if escape == b'u' {
                write!(self.writer, "\\u{:04X}", b)?;
            } else {
                let seq = [b'\\', escape];
                self.write_raw(&seq)?;
            }
            cur = i + 1;
        }

        if cur != bytes.len() {
            self.write_raw(&bytes[cur..])?;
        }

        Ok(())
    }

    /// Write fields as a JSON object, with an optional `__type` discriminator
    fn write_fields(&mut self, ctype: Option<TypeName>, fields: &[PropField]) -> io::Result<()> {
        self.write_raw(b"{")?;
        let mut first = true;
        if let Some(ctype) = ctype {
            self.write_raw(b"\"__type\":")?;
            self.write_type_name(ctype)?;
            first = false;
        }
        for field in fields {
            if !first {
                self.write_raw(b",")?;
            }
            first = false;
            self.write_field_name(field.name)?;
            self.write_raw(b":")?;
            prop_map_kind!(field.kind, T, {
                let v = field.downcast::<T>().expect("field value matches its kind");
                v.serialize_prop(self)
            })?;
        }
        self.write_raw(b"}")?;
        Ok(())
    }

    fn write_key_s8(&mut self, v: &PropS8) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_u8(&mut self, v: &PropU8) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_s16(&mut self, v: &PropS16) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_u16(&mut self, v: &PropU16) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_s32(&mut self, v: &PropS32) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_u32(&mut self, v: &PropU32) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_s64(&mut self, v: &PropS64) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_u64(&mut self, v: &PropU64) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
    fn write_key_float(&mut self, v: &PropFloat) -> io::Result<()> { write!(self.writer, "\"{}\"", v.0) }
}

impl<'a, W: Write> PropSerializer for JsonSerializer<'a, W> {
    type EntriesSerializer = JsonEntriesSerializer<'a, W>;

    fn write_entry(&mut self, v: &PropEntry) -> io::Result<()> {
        self.write_fields(Some(v.ctype), &v.fields)
    }

    fn write_entries(self) -> io::Result<Self::EntriesSerializer> {
        Self::EntriesSerializer::new(self)
    }

    fn write_none(&mut self, _: &PropNone) -> io::Result<()> {
        self.write_raw(b"null")
    }

    fn write_bool(&mut self, v: &PropBool) -> io::Result<()> {
        if v.0 {
            self.write_raw(b"true")
        } else {
            self.write_raw(b"false")
        }
    }

    fn write_s8(&mut self, v: &PropS8) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_u8(&mut self, v: &PropU8) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_s16(&mut self, v: &PropS16) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_u16(&mut self, v: &PropU16) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_s32(&mut self, v: &PropS32) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_u32(&mut self, v: &PropU32) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_s64(&mut self, v: &PropS64) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_u64(&mut self, v: &PropU64) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_float(&mut self, v: &PropFloat) -> io::Result<()> { write!(self.writer, "{}", v.0) }
    fn write_vec2(&mut self, v: &PropVec2) -> io::Result<()> { write!(self.writer, "[{},{}]", v.0, v.1) }
    fn write_vec3(&mut self, v: &PropVec3) -> io::Result<()> { write!(self.writer, "[{},{},{}]", v.0, v.1, v.2) }
    fn write_vec4(&mut self, v: &PropVec4) -> io::Result<()> { write!(self.writer, "[{},{},{},{}]", v.0, v.1, v.2, v.3) }
    fn write_matrix(&mut self, v: &PropMatrix) -> io::Result<()> { write!(self.writer,
        "[[{},{},{},{}],[{},{},{},{}],[{},{},{},{}],[{},{},{},{}]]",
        v.0[0][0], v.0[0][1], v.0[0][2], v.0[0][3],
        v.0[1][0], v.0[1][1], v.0[1][2], v.0[1][3],
        v.0[2][0], v.0[2][1], v.0[2][2], v.0[2][3],
        v.0[3][0], v.0[3][1], v.0[3][2], v.0[3][3])
    }
    fn write_color(&mut self, v: &PropColor) -> io::Result<()> { write!(self.writer, "[{},{},{},{}]", v.r, v.g, v.b, v.a) }
    fn write_string(&mut self, v: &PropString) -> io::Result<()> {
        self.write_raw(b"\"")?;
        self.write_escaped_json(&v.0)?;
        self.write_raw(b"\"")?;
        Ok(())
    }
    fn write_hash(&mut self, v: &PropHash) -> io::Result<()> { self.write_hash_value(v.0) }
    fn write_path(&mut self, v: &PropPath) -> io::Result<()> { self.write_path_value(v.0) }
    fn write_link(&mut self, v: &PropLink) -> io::Result<()> { self.write_entry_path(v.0) }
    fn write_flag(&mut self, v: &PropFlag) -> io::Result<()> { write!(self.writer, "{}", v.0) }

    fn write_list(&mut self, v: &PropList) -> io::Result<()> {
        self.write_raw(b"[")?;
        prop_map_kind!(
            v.kind, T, {
                let values = v.downcast::<T>().expect("list values match their kind");
                write_sequence!(self, v in values => v.serialize_prop(self)?)
            });
        self.write_raw(b"]")?;
        Ok(())
    }

    fn write_struct(&mut self, v: &PropStruct) -> io::Result<()> {
        let ctype = (!v.ctype.is_null()).then_some(v.ctype);
        self.write_fields(ctype, &v.fields)
    }

    fn write_embed(&mut self, v: &PropEmbed) -> io::Result<()> {
        let ctype = (!v.ctype.is_null()).then_some(v.ctype);
        self.write_fields(ctype, &v.fields)
    }

    fn write_option(&mut self, option: &PropOption) -> io::Result<()> {
        if option.value.is_none() {
            self.write_raw(b"null")
        } else {
            prop_map_kind!(option.kind, T, {
                option
                    .downcast::<T>()
                    .expect("checked non-empty above")
                    .serialize_prop(self)
            })
        }
    }

    fn write_map(&mut self, map: &PropMap) -> io::Result<()> {
        self.write_raw(b"{")?;
        prop_map_keykind!(
            map.ktype, K,
            prop_map_kind!(
                map.vtype, V,
                write_sequence!(self, (k, v) in map.downcast::<K, V>().expect("map values match their kinds") => {
                    k.serialize_prop_key(self)?;
                    self.write_raw(b":")?;
                    v.serialize_prop(self)?;
                })));
        self.write_raw(b"}")?;
        Ok(())
    }
}

/// Serialize a map key to a JSON string (even for numbers)
trait PropKeySerializable {
    fn serialize_prop_key<W: Write>(&self, s: &mut JsonSerializer<'_, W>) -> io::Result<()>;
}

macro_rules! impl_prop_key_serializable {
    ($type:ty, $func:ident) => {
        impl PropKeySerializable for $type {
            fn serialize_prop_key<W: Write>(&self, s: &mut JsonSerializer<'_, W>) -> io::Result<()> {
                s.$func(self)
            }
        }
    }
}

impl_prop_key_serializable!(PropS8, write_key_s8);
impl_prop_key_serializable!(PropU8, write_key_u8);
impl_prop_key_serializable!(PropS16, write_key_s16);
impl_prop_key_serializable!(PropU16, write_key_u16);
impl_prop_key_serializable!(PropS32, write_key_s32);
impl_prop_key_serializable!(PropU32, write_key_u32);
impl_prop_key_serializable!(PropS64, write_key_s64);
impl_prop_key_serializable!(PropU64, write_key_u64);
impl_prop_key_serializable!(PropFloat, write_key_float);
impl_prop_key_serializable!(PropString, write_string);
impl_prop_key_serializable!(PropHash, write_hash);


/// Streamed JSON entries, as one object keyed by entry path
pub struct JsonEntriesSerializer<'a, W: Write> {
    parent: JsonSerializer<'a, W>,
    first: bool,
}

impl<'a, W: Write> JsonEntriesSerializer<'a, W> {
    fn new(mut parent: JsonSerializer<'a, W>) -> io::Result<Self> {
        parent.write_raw(b"{")?;
        Ok(Self { parent, first: true })
    }
}

impl<'a, W: Write> PropEntriesSerializer for JsonEntriesSerializer<'a, W> {
    fn write_entry(&mut self, entry: &PropEntry) -> io::Result<()> {
        if self.first {
            self.first = false;
        } else {
            self.parent.write_raw(b",")?;
        }

        self.parent.write_entry_path(entry.path)?;
        self.parent.write_raw(b":")?;
        self.parent.write_entry(entry)?;
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        self.parent.write_raw(b"}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_prop_hash, PropFile, PropSerializer};

    #[test]
    fn entry_to_json_with_types_and_hashes() {
        // One entry, one string field and one link field
        let mut data = Vec::new();
        data.extend_from_slice(b"PROP");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&compute_prop_hash("SomeType").to_le_bytes());

        let mut fields = Vec::new();
        fields.extend_from_slice(&compute_prop_hash("name").to_le_bytes());
        fields.push(16);  // String
        fields.extend_from_slice(&2u16.to_le_bytes());
        fields.extend_from_slice(b"hi");
        fields.extend_from_slice(&0x12345678u32.to_le_bytes());
        fields.push(0x84);  // Link
        fields.extend_from_slice(&0x9u32.to_le_bytes());

        data.extend_from_slice(&(4 + 2 + fields.len() as u32).to_le_bytes());
        data.extend_from_slice(&0x1u32.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&fields);

        let prop = PropFile::from_slice(&data).unwrap();

        let mut hmappers = PropHashMappers::default();
        hmappers.type_name.insert(compute_prop_hash("SomeType"), "SomeType".to_string());
        hmappers.field_name.insert(compute_prop_hash("name"), "name".to_string());

        let mut out = Vec::new();
        JsonSerializer::new(&mut out, &hmappers).write_entry(&prop.entries[0]).unwrap();
        let json = String::from_utf8(out).unwrap();
        assert_eq!(
            json,
            r#"{"__type":"SomeType","name":"hi","{12345678}":"{00000009}"}"#
        );
    }

    #[test]
    fn escaped_strings() {
        let hmappers = PropHashMappers::default();
        let mut out = Vec::new();
        let mut s = JsonSerializer::new(&mut out, &hmappers);
        s.write_string(&PropString("a\"b\\c\nd\x07".to_string())).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"a\\\"b\\\\c\\nd\\u0007\"");
    }
}
