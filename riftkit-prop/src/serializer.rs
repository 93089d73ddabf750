use std::io;
use super::data::*;
use super::{PropFile, PropEntry};

/// Serialize property values
pub trait PropSerializer {
    /// Serializer for a stream of entries
    type EntriesSerializer: PropEntriesSerializer;

    /// Write a single entry
    fn write_entry(&mut self, v: &PropEntry) -> io::Result<()>;
    /// Return a serializer to write streamed entries
    fn write_entries(self) -> io::Result<Self::EntriesSerializer>;

    /// Write entries from a `PropFile`
    fn write_file(self, v: &PropFile) -> io::Result<()> where Self: Sized {
        let mut s = self.write_entries()?;
        for entry in &v.entries {
            s.write_entry(entry)?;
        }
        s.end()?;
        Ok(())
    }

    // Scalar values
    #[allow(missing_docs)]
    fn write_none(&mut self, v: &PropNone) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_bool(&mut self, v: &PropBool) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_s8(&mut self, v: &PropS8) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_u8(&mut self, v: &PropU8) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_s16(&mut self, v: &PropS16) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_u16(&mut self, v: &PropU16) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_s32(&mut self, v: &PropS32) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_u32(&mut self, v: &PropU32) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_s64(&mut self, v: &PropS64) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_u64(&mut self, v: &PropU64) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_float(&mut self, v: &PropFloat) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_vec2(&mut self, v: &PropVec2) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_vec3(&mut self, v: &PropVec3) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_vec4(&mut self, v: &PropVec4) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_matrix(&mut self, v: &PropMatrix) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_color(&mut self, v: &PropColor) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_string(&mut self, v: &PropString) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_hash(&mut self, v: &PropHash) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_path(&mut self, v: &PropPath) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_link(&mut self, v: &PropLink) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_flag(&mut self, v: &PropFlag) -> io::Result<()>;

    // Nested values
    #[allow(missing_docs)]
    fn write_list(&mut self, v: &PropList) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_struct(&mut self, v: &PropStruct) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_embed(&mut self, v: &PropEmbed) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_option(&mut self, v: &PropOption) -> io::Result<()>;
    #[allow(missing_docs)]
    fn write_map(&mut self, v: &PropMap) -> io::Result<()>;
}

/// Serialize streamed entries
pub trait PropEntriesSerializer {
    /// Write a single entry
    fn write_entry(&mut self, entry: &PropEntry) -> io::Result<()>;
    /// End the serialization
    ///
    /// This should move out `end(self)` but that does not work on boxed
    /// instances.
    fn end(&mut self) -> io::Result<()>;
}


/// Serializable property value
///
/// Intended to be used by [PropSerializer] implementations.
pub trait PropSerializable {
    /// Write self with the given serializer
    fn serialize_prop<S: PropSerializer>(&self, s: &mut S) -> io::Result<()>;
}

macro_rules! impl_serializable {
    ($type:ty, $func:ident) => {
        impl PropSerializable for $type {
            fn serialize_prop<S: PropSerializer>(&self, s: &mut S) -> io::Result<()> {
                s.$func(self)
            }
        }
    }
}

impl_serializable!(PropNone, write_none);
impl_serializable!(PropBool, write_bool);
impl_serializable!(PropS8, write_s8);
impl_serializable!(PropU8, write_u8);
impl_serializable!(PropS16, write_s16);
impl_serializable!(PropU16, write_u16);
impl_serializable!(PropS32, write_s32);
impl_serializable!(PropU32, write_u32);
impl_serializable!(PropS64, write_s64);
impl_serializable!(PropU64, write_u64);
impl_serializable!(PropFloat, write_float);
impl_serializable!(PropVec2, write_vec2);
impl_serializable!(PropVec3, write_vec3);
impl_serializable!(PropVec4, write_vec4);
impl_serializable!(PropMatrix, write_matrix);
impl_serializable!(PropColor, write_color);
impl_serializable!(PropString, write_string);
impl_serializable!(PropHash, write_hash);
impl_serializable!(PropPath, write_path);
impl_serializable!(PropLink, write_link);
impl_serializable!(PropFlag, write_flag);
impl_serializable!(PropList, write_list);
impl_serializable!(PropStruct, write_struct);
impl_serializable!(PropEmbed, write_embed);
impl_serializable!(PropOption, write_option);
impl_serializable!(PropMap, write_map);
