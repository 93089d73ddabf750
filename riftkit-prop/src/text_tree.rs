use std::io;
use std::io::Write;
use super::{
    PropEntry,
    PropHashMappers,
    data::*,
    serializer::{PropSerializer, PropEntriesSerializer, PropSerializable},
    prop_map_keykind,
    prop_map_kind,
};


macro_rules! indented {
    ($s:expr, $b:block) => {{
        $s.indent += 2;
        let result = $b;
        $s.indent -= 2;
        result
    }}
}

macro_rules! serialize {
    ($s:expr, $($arg:tt)*) => (
        write!($s.writer, $($arg)*)
    );
}

macro_rules! serializeln {
    ($s:expr) => (
        write!($s.writer, "\n{i_:iw_$}", i_="", iw_=$s.indent)
    );
    ($s:expr, $fmt:expr) => (
        serialize!($s, concat!("\n{i_:iw_$}", $fmt), i_="", iw_=$s.indent)
    );
    ($s:expr, $fmt:expr, $($arg:tt)*) => (
        serialize!($s, concat!("\n{i_:iw_$}", $fmt), $($arg)*, i_="", iw_=$s.indent)
    );
}


/// Serialize property values to a human readable text tree
pub struct TextTreeSerializer<'a, W: Write> {
    writer: W,
    hmappers: &'a PropHashMappers,
    indent: usize,
}

impl<'a, W: Write> TextTreeSerializer<'a, W> {
    /// Create a serializer resolving hashes with the given mappers
    pub fn new(writer: W, hmappers: &'a PropHashMappers) -> Self {
        Self { writer, hmappers, indent: 0 }
    }

    fn format_entry_path(&self, h: EntryPath) -> String {
        match h.get_str(self.hmappers) {
            Some(s) => format!("'{}'", s),
            _ => format!("{{{:x}}}", h),
        }
    }

    fn format_type_name(&self, h: TypeName) -> String {
        match h.get_str(self.hmappers) {
            Some(s) => s.to_string(),
            _ => format!("{{{:x}}}", h),
        }
    }

    fn format_field_name(&self, h: FieldName) -> String {
        match h.get_str(self.hmappers) {
            Some(s) => s.to_string(),
            _ => format!("{{{:x}}}", h),
        }
    }

    fn format_hash_value(&self, h: HashValue) -> String {
        match h.get_str(self.hmappers) {
            Some(s) => format!("'{}'", s),
            _ => format!("{{{:x}}}", h),
        }
    }

    fn format_path_value(&self, h: PathValue) -> String {
        match h.get_str(self.hmappers) {
            Some(s) => format!("'{}'", s),
            _ => format!("{{{:x}}}", h),
        }
    }

    fn write_fields(&mut self, fields: &[PropField]) -> io::Result<()> {
        if fields.is_empty() {
            serialize!(self, "[]")?;
        } else {
            serialize!(self, "[")?;
            indented!(self, {
                fields.iter().try_for_each(|field| -> io::Result<()> {
                    serializeln!(self, "<{} ", self.format_field_name(field.name))?;
                    self.write_field_content(field)?;
                    serialize!(self, ">")?;
                    Ok(())
                })?;
            });
            serializeln!(self, "]")?;
        }
        Ok(())
    }

    fn write_field_content(&mut self, field: &PropField) -> io::Result<()> {
        macro_rules! serialize_field {
            // Default, for scalar kinds
            ($t:ty) => {{
                let v = field.downcast::<$t>().expect("field value matches its kind");
                serialize!(self, "{} ", scalar_kind_name(field.kind))?;
                v.serialize_prop(self)?;
            }};
            // Nested kinds with fields
            ($t:ty: {$v:ident} => $($fmt:tt)*) => {{
                let $v = field.downcast::<$t>().expect("field value matches its kind");
                serialize!(self, $($fmt)*)?;
                self.write_fields(&$v.fields)?;
            }};
            // Other nested kinds
            ($t:ty: [$v:ident] => $($fmt:tt)*) => {{
                let $v = field.downcast::<$t>().expect("field value matches its kind");
                serialize!(self, $($fmt)*)?;
                $v.serialize_prop(self)?;
            }};
        }

        match field.kind {
            PropKind::None => serialize_field!(PropNone),
            PropKind::Bool => serialize_field!(PropBool),
            PropKind::S8 => serialize_field!(PropS8),
            PropKind::U8 => serialize_field!(PropU8),
            PropKind::S16 => serialize_field!(PropS16),
            PropKind::U16 => serialize_field!(PropU16),
            PropKind::S32 => serialize_field!(PropS32),
            PropKind::U32 => serialize_field!(PropU32),
            PropKind::S64 => serialize_field!(PropS64),
            PropKind::U64 => serialize_field!(PropU64),
            PropKind::Float => serialize_field!(PropFloat),
            PropKind::Vec2 => serialize_field!(PropVec2),
            PropKind::Vec3 => serialize_field!(PropVec3),
            PropKind::Vec4 => serialize_field!(PropVec4),
            PropKind::Matrix => serialize_field!(PropMatrix),
            PropKind::Color => serialize_field!(PropColor),
            PropKind::String => serialize_field!(PropString),
            PropKind::Hash => serialize_field!(PropHash),
            PropKind::Path => serialize_field!(PropPath),
            PropKind::Container => serialize_field!(PropList: [v] => "CONTAINER({}) ", scalar_kind_name(v.kind)),
            PropKind::Container2 => serialize_field!(PropList: [v] => "CONTAINER2({}) ", scalar_kind_name(v.kind)),
            PropKind::Struct => serialize_field!(PropStruct: {v} => "STRUCT {} ", self.format_type_name(v.ctype)),
            PropKind::Embed => serialize_field!(PropEmbed: {v} => "EMBED {} ", self.format_type_name(v.ctype)),
            PropKind::Link => serialize_field!(PropLink),
            PropKind::Option => serialize_field!(PropOption: [v] => "OPTION({}) ", scalar_kind_name(v.kind)),
            PropKind::Map => serialize_field!(PropMap: [v] => "MAP({},{}) ", scalar_kind_name(v.ktype), scalar_kind_name(v.vtype)),
            PropKind::Flag => serialize_field!(PropFlag),
        }
        Ok(())
    }
}

impl<'a, W: Write> PropSerializer for TextTreeSerializer<'a, W> {
    type EntriesSerializer = TextTreeEntriesSerializer<'a, W>;

    fn write_entry(&mut self, v: &PropEntry) -> io::Result<()> {
        serialize!(self, "<PropEntry {} {} ", self.format_entry_path(v.path), self.format_type_name(v.ctype))?;
        self.write_fields(&v.fields)?;
        serialize!(self, ">")?;
        serializeln!(self)
    }

    fn write_entries(self) -> io::Result<Self::EntriesSerializer> {
        Ok(Self::EntriesSerializer { parent: self })
    }

    fn write_none(&mut self, _: &PropNone) -> io::Result<()> { serialize!(self, "-") }
    fn write_bool(&mut self, v: &PropBool) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_s8(&mut self, v: &PropS8) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_u8(&mut self, v: &PropU8) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_s16(&mut self, v: &PropS16) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_u16(&mut self, v: &PropU16) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_s32(&mut self, v: &PropS32) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_u32(&mut self, v: &PropU32) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_s64(&mut self, v: &PropS64) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_u64(&mut self, v: &PropU64) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_float(&mut self, v: &PropFloat) -> io::Result<()> { serialize!(self, "{}", v.0) }
    fn write_vec2(&mut self, v: &PropVec2) -> io::Result<()> { serialize!(self, "({}, {})", v.0, v.1) }
    fn write_vec3(&mut self, v: &PropVec3) -> io::Result<()> { serialize!(self, "({}, {}, {})", v.0, v.1, v.2) }
    fn write_vec4(&mut self, v: &PropVec4) -> io::Result<()> { serialize!(self, "({}, {}, {}, {})", v.0, v.1, v.2, v.3) }
    fn write_matrix(&mut self, v: &PropMatrix) -> io::Result<()> { serialize!(self,
        "(({}, {}, {}, {}), ({}, {}, {}, {}), ({}, {}, {}, {}), ({}, {}, {}, {}))",
        v.0[0][0], v.0[0][1], v.0[0][2], v.0[0][3],
        v.0[1][0], v.0[1][1], v.0[1][2], v.0[1][3],
        v.0[2][0], v.0[2][1], v.0[2][2], v.0[2][3],
        v.0[3][0], v.0[3][1], v.0[3][2], v.0[3][3]) }
    fn write_color(&mut self, v: &PropColor) -> io::Result<()> { serialize!(self, "({}, {}, {}, {})", v.r, v.g, v.b, v.a) }
    fn write_string(&mut self, v: &PropString) -> io::Result<()> { serialize!(self, "'{}'", v.0) }
    fn write_hash(&mut self, v: &PropHash) -> io::Result<()> { serialize!(self, "{}", self.format_hash_value(v.0)) }
    fn write_path(&mut self, v: &PropPath) -> io::Result<()> { serialize!(self, "{}", self.format_path_value(v.0)) }
    fn write_link(&mut self, v: &PropLink) -> io::Result<()> { serialize!(self, "{}", self.format_entry_path(v.0)) }
    fn write_flag(&mut self, v: &PropFlag) -> io::Result<()> { serialize!(self, "{}", v.0) }

    fn write_list(&mut self, v: &PropList) -> io::Result<()> {
        serialize!(self, "[")?;
        indented!(self, {
            prop_map_kind!(
                v.kind, T,
                v.downcast::<T>().expect("list values match their kind").iter().try_for_each(|x| {
                    serializeln!(self)?;
                    x.serialize_prop(self)
                }))?;
        });
        serializeln!(self, "]")?;
        Ok(())
    }

    fn write_struct(&mut self, v: &PropStruct) -> io::Result<()> {
        serialize!(self, "<STRUCT {} ", self.format_type_name(v.ctype))?;
        self.write_fields(&v.fields)?;
        serialize!(self, ">")?;
        Ok(())
    }

    fn write_embed(&mut self, v: &PropEmbed) -> io::Result<()> {
        serialize!(self, "<EMBED {} ", self.format_type_name(v.ctype))?;
        self.write_fields(&v.fields)?;
        serialize!(self, ">")?;
        Ok(())
    }

    fn write_option(&mut self, option: &PropOption) -> io::Result<()> {
        if option.value.is_none() {
            serialize!(self, "-")?;
        } else {
            serialize!(self, "[")?;
            indented!(self, {
                serializeln!(self)?;
                prop_map_kind!(option.kind, T, {
                    option
                        .downcast::<T>()
                        .expect("checked non-empty above")
                        .serialize_prop(self)
                })?
            });
            serializeln!(self, "]")?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &PropMap) -> io::Result<()> {
        serialize!(self, "{{")?;
        indented!(self, {
            prop_map_keykind!(
                map.ktype, K,
                prop_map_kind!(
                    map.vtype, V,
                    map.downcast::<K, V>().expect("map values match their kinds").iter().try_for_each(|(k, v)| -> io::Result<()> {
                        serializeln!(self)?;
                        k.serialize_prop(self)?;
                        serialize!(self, " => ")?;
                        v.serialize_prop(self)?;
                        Ok(())
                    })))?;
        });
        serializeln!(self, "}}")?;
        Ok(())
    }
}

fn scalar_kind_name(kind: PropKind) -> &'static str {
    match kind {
        PropKind::None => "NONE",
        PropKind::Bool => "BOOL",
        PropKind::S8 => "S8",
        PropKind::U8 => "U8",
        PropKind::S16 => "S16",
        PropKind::U16 => "U16",
        PropKind::S32 => "S32",
        PropKind::U32 => "U32",
        PropKind::S64 => "S64",
        PropKind::U64 => "U64",
        PropKind::Float => "FLOAT",
        PropKind::Vec2 => "VEC2",
        PropKind::Vec3 => "VEC3",
        PropKind::Vec4 => "VEC4",
        PropKind::Matrix => "MATRIX",
        PropKind::Color => "COLOR",
        PropKind::String => "STRING",
        PropKind::Hash => "HASH",
        PropKind::Path => "PATH",
        PropKind::Struct => "STRUCT",
        PropKind::Embed => "EMBED",
        PropKind::Link => "LINK",
        PropKind::Flag => "FLAG",
        _ => panic!("kind name should not be needed for nested kinds"),
    }
}


/// Streamed text tree entries
pub struct TextTreeEntriesSerializer<'a, W: Write> {
    parent: TextTreeSerializer<'a, W>,
}

impl<'a, W: Write> PropEntriesSerializer for TextTreeEntriesSerializer<'a, W> {
    fn write_entry(&mut self, entry: &PropEntry) -> io::Result<()> {
        self.parent.write_entry(entry)
    }

    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}
