//! Property value definitions
use std::any::Any;
use num_enum::TryFromPrimitive;
use super::PropHashMappers;
use riftkit_hashes::{
    define_hash_type,
    HashOrName,
    fnv::{PropNameKind, compute_prop_hash},
    xx::compute_path_hash,
};
pub use riftkit_hashes::fnv::PropHashMapper;


/// Field of an entry, a struct or an embed
///
/// Field order is preserved from the wire.
pub struct PropField {
    /// Field name (hashed)
    pub name: FieldName,
    /// Kind of the field value
    pub kind: PropKind,
    pub(crate) value: Box<dyn Any>,  // Any = kind's value type
}

impl PropField {
    /// Downcast the field value
    pub fn downcast<T: PropValue + 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub(crate) fn downcast_mut<T: PropValue + 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }
}


/// Declare a property name hash type
macro_rules! declare_prop_hash {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:expr
    ) => {
        define_hash_type! {
            $(#[$meta])*
            $name(u32) => compute_prop_hash
        }

        impl $name {
            /// Hash kind, for use with [PropHashMappers]
            const KIND: PropNameKind = $kind;
            /// Get the name associated to the hash
            pub fn get_str<'a>(&self, mappers: &'a PropHashMappers) -> Option<&'a str> {
                mappers.get(Self::KIND).get(self.hash)
            }
            /// Get the name associated to the hash, or the hash itself
            pub fn seek_str<'a>(&self, mappers: &'a PropHashMappers) -> HashOrName<u32, &'a str> {
                mappers.get(Self::KIND).seek(self.hash)
            }
        }
    }
}

declare_prop_hash! {
    /// Hash of a [PropEntry](super::PropEntry) path
    EntryPath => PropNameKind::EntryPath
}
declare_prop_hash! {
    /// Hash of a type name (type of entries, [structs](PropStruct) and [embeds](PropEmbed))
    TypeName => PropNameKind::TypeName
}
declare_prop_hash! {
    /// Hash of a field name
    FieldName => PropNameKind::FieldName
}
declare_prop_hash! {
    /// Hash of a [PropHash] value
    HashValue => PropNameKind::HashValue
}

define_hash_type! {
    /// Hash of a [PropPath] value, pointing to a file in a WAD archive
    PathValue(u64) => compute_path_hash
}
impl PathValue {
    /// Get the path associated to the hash
    pub fn get_str<'a>(&self, mappers: &'a PropHashMappers) -> Option<&'a str> {
        mappers.path_value.get(self.hash)
    }
    /// Get the path associated to the hash, or the hash itself
    pub fn seek_str<'a>(&self, mappers: &'a PropHashMappers) -> HashOrName<u64, &'a str> {
        mappers.path_value.seek(self.hash)
    }
}


/// Trait for values enumerated in [PropKind]
pub trait PropValue {
    /// Kind associated to the value type
    const KIND: PropKind;
}

macro_rules! declare_propvalue_struct {
    ($type:ident ($t:ty) [$($d:ident),* $(,)?]) => {
        #[allow(missing_docs)]
        #[derive(Debug,$($d),*)]
        pub struct $type(pub $t);
        impl From<$t> for $type {
            fn from(v: $t) -> Self { Self(v) }
        }
    };
    ($type:ident ($($v:ident: $t:ty),* $(,)?)) => {
        #[allow(missing_docs)]
        #[derive(Debug)]
        pub struct $type($(pub $t,)*);
        impl From<($($t),*)> for $type {
            fn from(($($v),*): ($($t),*)) -> Self {
                Self($($v),*)
            }
        }
    };
}

declare_propvalue_struct!{ PropNone() }
declare_propvalue_struct!{ PropBool(bool) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropS8(i8) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropU8(u8) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropS16(i16) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropU16(u16) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropS32(i32) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropU32(u32) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropS64(i64) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropU64(u64) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropFloat(f32) [] }
declare_propvalue_struct!{ PropVec2(a: f32, b: f32) }
declare_propvalue_struct!{ PropVec3(a: f32, b: f32, c: f32) }
declare_propvalue_struct!{ PropVec4(a: f32, b: f32, c: f32, d: f32) }
declare_propvalue_struct!{ PropMatrix([[f32; 4]; 4]) [] }
/// Color value (RGBA)
#[allow(missing_docs)]
#[derive(Debug)]
pub struct PropColor { pub r: u8, pub g: u8, pub b: u8, pub a: u8 }
declare_propvalue_struct!{ PropString(String) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropHash(HashValue) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropPath(PathValue) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropLink(EntryPath) [Eq,PartialEq,Hash] }
declare_propvalue_struct!{ PropFlag(bool) [Eq,PartialEq,Hash] }


/// List of values, variable size
///
/// This type backs both [PropKind::Container] and [PropKind::Container2];
/// the two tags are wire-identical but kept distinct in [PropField::kind].
pub struct PropList {
    /// Kind of the values in the list
    pub kind: PropKind,
    pub(crate) values: Box<dyn Any>,  // Any = Vec<kind's value type>
}

impl PropList {
    /// Downcast the list to a vector
    pub fn downcast<T: PropValue + 'static>(&self) -> Option<&Vec<T>> {
        self.values.downcast_ref::<Vec<T>>()
    }
}

/// Structured value, referenced by pointer
pub struct PropStruct {
    /// Type of the struct
    pub ctype: TypeName,
    /// Struct fields
    pub fields: Vec<PropField>,
}

/// Structured value whose data is embedded directly
pub struct PropEmbed {
    /// Type of the embed
    pub ctype: TypeName,
    /// Embed fields
    pub fields: Vec<PropField>,
}

macro_rules! impl_field_access {
    ($type:ty) => {
        impl $type {
            /// Get a field by its name
            pub fn get(&self, name: FieldName) -> Option<&PropField> {
                self.fields.iter().find(|f| f.name == name)
            }

            /// Get a field by its name and downcast it
            pub fn getv<T: PropValue + 'static>(&self, name: FieldName) -> Option<&T> {
                self.get(name).and_then(|field| field.downcast::<T>())
            }
        }
    }
}

impl_field_access!(PropStruct);
impl_field_access!(PropEmbed);

/// Optional value
pub struct PropOption {
    /// Kind of the value in the option
    pub kind: PropKind,
    pub(crate) value: Option<Box<dyn Any>>,  // Any = kind's value type
}

impl PropOption {
    /// Return `true` if the option holds a value
    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    /// Downcast the option
    pub fn downcast<T: PropValue + 'static>(&self) -> Option<&T> {
        match self.value {
            Some(ref v) => Some(v.downcast_ref::<T>()?),
            None => None,
        }
    }
}


/// Map of values, with separate key and value kinds
///
/// Key order is not meaningful; keys are distinct and restricted to
/// hashable scalar kinds.
pub struct PropMap {
    /// Kind of the map keys
    pub ktype: PropKind,
    /// Kind of the map values
    pub vtype: PropKind,
    pub(crate) values: Box<dyn Any>,  // Any = Vec<(ktype, vtype)>
}

impl PropMap {
    /// Downcast the map to a vector of `(key, value)` pairs
    pub fn downcast<K: PropValue + 'static, V: PropValue + 'static>(&self) -> Option<&Vec<(K, V)>> {
        self.values.downcast_ref::<Vec<(K, V)>>()
    }
}

impl PropValue for PropNone { const KIND: PropKind = PropKind::None; }
impl PropValue for PropBool { const KIND: PropKind = PropKind::Bool; }
impl PropValue for PropS8 { const KIND: PropKind = PropKind::S8; }
impl PropValue for PropU8 { const KIND: PropKind = PropKind::U8; }
impl PropValue for PropS16 { const KIND: PropKind = PropKind::S16; }
impl PropValue for PropU16 { const KIND: PropKind = PropKind::U16; }
impl PropValue for PropS32 { const KIND: PropKind = PropKind::S32; }
impl PropValue for PropU32 { const KIND: PropKind = PropKind::U32; }
impl PropValue for PropS64 { const KIND: PropKind = PropKind::S64; }
impl PropValue for PropU64 { const KIND: PropKind = PropKind::U64; }
impl PropValue for PropFloat { const KIND: PropKind = PropKind::Float; }
impl PropValue for PropVec2 { const KIND: PropKind = PropKind::Vec2; }
impl PropValue for PropVec3 { const KIND: PropKind = PropKind::Vec3; }
impl PropValue for PropVec4 { const KIND: PropKind = PropKind::Vec4; }
impl PropValue for PropMatrix { const KIND: PropKind = PropKind::Matrix; }
impl PropValue for PropColor { const KIND: PropKind = PropKind::Color; }
impl PropValue for PropString { const KIND: PropKind = PropKind::String; }
impl PropValue for PropHash { const KIND: PropKind = PropKind::Hash; }
impl PropValue for PropPath { const KIND: PropKind = PropKind::Path; }
impl PropValue for PropList { const KIND: PropKind = PropKind::Container; }
impl PropValue for PropStruct { const KIND: PropKind = PropKind::Struct; }
impl PropValue for PropEmbed { const KIND: PropKind = PropKind::Embed; }
impl PropValue for PropLink { const KIND: PropKind = PropKind::Link; }
impl PropValue for PropOption { const KIND: PropKind = PropKind::Option; }
impl PropValue for PropMap { const KIND: PropKind = PropKind::Map; }
impl PropValue for PropFlag { const KIND: PropKind = PropKind::Flag; }


/// Canonical property value kinds
///
/// Wire tags drift across format revisions; [TagMapper](super::TagMapper)
/// converts the raw byte to this canonical enum, which all other code
/// speaks.
#[allow(missing_docs)]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, Debug)]
pub enum PropKind {
    None = 0,
    Bool = 1,
    S8 = 2,
    U8 = 3,
    S16 = 4,
    U16 = 5,
    S32 = 6,
    U32 = 7,
    S64 = 8,
    U64 = 9,
    Float = 10,
    Vec2 = 11,
    Vec3 = 12,
    Vec4 = 13,
    Matrix = 14,
    Color = 15,
    String = 16,
    Hash = 17,
    Path = 18,  // introduced in 10.23
    // Complex kinds (shifted to the 0x80 wire band in 9.23)
    Container = 19,
    Container2 = 20,  // same wire shape as Container, introduced in 10.8
    Struct = 21,
    Embed = 22,
    Link = 23,
    Option = 24,
    Map = 25,
    Flag = 26,
}

impl PropKind {
    /// Return true for kinds holding nested values
    #[inline]
    pub const fn is_nested(&self) -> bool {
        matches!(self,
            PropKind::Container |
            PropKind::Container2 |
            PropKind::Struct |
            PropKind::Embed |
            PropKind::Option |
            PropKind::Map)
    }

    /// Return true for kinds usable as map keys
    #[inline]
    pub const fn is_hashable(&self) -> bool {
        matches!(self,
            PropKind::S8 | PropKind::U8 |
            PropKind::S16 | PropKind::U16 |
            PropKind::S32 | PropKind::U32 |
            PropKind::S64 | PropKind::U64 |
            PropKind::Float |
            PropKind::String |
            PropKind::Hash)
    }
}
