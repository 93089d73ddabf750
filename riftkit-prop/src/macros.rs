
/// Map a `PropKind` variant to its concrete value type in an expression
#[macro_export]
macro_rules! prop_map_kind {
    ($b:expr, $t:ident, $e:expr) => (match $b {
        $crate::PropKind::None => { type $t = $crate::data::PropNone; $e },
        $crate::PropKind::Bool => { type $t = $crate::data::PropBool; $e },
        $crate::PropKind::S8 => { type $t = $crate::data::PropS8; $e },
        $crate::PropKind::U8 => { type $t = $crate::data::PropU8; $e },
        $crate::PropKind::S16 => { type $t = $crate::data::PropS16; $e },
        $crate::PropKind::U16 => { type $t = $crate::data::PropU16; $e },
        $crate::PropKind::S32 => { type $t = $crate::data::PropS32; $e },
        $crate::PropKind::U32 => { type $t = $crate::data::PropU32; $e },
        $crate::PropKind::S64 => { type $t = $crate::data::PropS64; $e },
        $crate::PropKind::U64 => { type $t = $crate::data::PropU64; $e },
        $crate::PropKind::Float => { type $t = $crate::data::PropFloat; $e },
        $crate::PropKind::Vec2 => { type $t = $crate::data::PropVec2; $e },
        $crate::PropKind::Vec3 => { type $t = $crate::data::PropVec3; $e },
        $crate::PropKind::Vec4 => { type $t = $crate::data::PropVec4; $e },
        $crate::PropKind::Matrix => { type $t = $crate::data::PropMatrix; $e },
        $crate::PropKind::Color => { type $t = $crate::data::PropColor; $e },
        $crate::PropKind::String => { type $t = $crate::data::PropString; $e },
        $crate::PropKind::Hash => { type $t = $crate::data::PropHash; $e },
        $crate::PropKind::Path => { type $t = $crate::data::PropPath; $e },
        $crate::PropKind::Container | $crate::PropKind::Container2 => { type $t = $crate::data::PropList; $e },
        $crate::PropKind::Struct => { type $t = $crate::data::PropStruct; $e },
        $crate::PropKind::Embed => { type $t = $crate::data::PropEmbed; $e },
        $crate::PropKind::Link => { type $t = $crate::data::PropLink; $e },
        $crate::PropKind::Option => { type $t = $crate::data::PropOption; $e },
        $crate::PropKind::Map => { type $t = $crate::data::PropMap; $e },
        $crate::PropKind::Flag => { type $t = $crate::data::PropFlag; $e },
    })
}

/// Same as `prop_map_kind!`, limited to kinds usable as `PropMap` keys
///
/// The parser rejects non-hashable key kinds, so the fallback arm is
/// unreachable on decoded data.
#[macro_export]
macro_rules! prop_map_keykind {
    ($b:expr, $t:ident, $e:expr) => (match $b {
        $crate::PropKind::S8 => { type $t = $crate::data::PropS8; $e },
        $crate::PropKind::U8 => { type $t = $crate::data::PropU8; $e },
        $crate::PropKind::S16 => { type $t = $crate::data::PropS16; $e },
        $crate::PropKind::U16 => { type $t = $crate::data::PropU16; $e },
        $crate::PropKind::S32 => { type $t = $crate::data::PropS32; $e },
        $crate::PropKind::U32 => { type $t = $crate::data::PropU32; $e },
        $crate::PropKind::S64 => { type $t = $crate::data::PropS64; $e },
        $crate::PropKind::U64 => { type $t = $crate::data::PropU64; $e },
        $crate::PropKind::Float => { type $t = $crate::data::PropFloat; $e },
        $crate::PropKind::String => { type $t = $crate::data::PropString; $e },
        $crate::PropKind::Hash => { type $t = $crate::data::PropHash; $e },
        _ => panic!("invalid kind for map key: {}", $b as u8),
    })
}

/// Access nested property values
///
/// First parameter is the top-level value to access, followed by a chain of
/// field accesses. Elements are downcast by giving the concrete type in
/// parentheses. Returns an `Option`.
///
/// # Examples
///
/// ```no_run
/// # use riftkit_prop::{propget, data::*, PropEntry};
/// # fn test(entry: PropEntry, map: PropMap) {
/// // Get an entry field value
/// propget!(entry => mName(PropString));
/// // Access content of a list field
/// propget!(entry => mNames(PropList)(PropString));
/// // Chained field access
/// propget!(entry => mData(PropStruct).mValue(PropU32));
/// // Access a field from a hash integer value
/// propget!(entry => 0x12345678(PropString));
/// // Downcast a `PropMap`
/// propget!(map => (PropHash, PropLink));
/// # }
/// ```
#[macro_export]
macro_rules! propget {
    // Entry-point: wrap in a lambda to use `?` on options
    ($e:expr => $($tail:tt)*) => { (|| Some(propget!($e, $($tail)*)))() };
    // Termination
    ($e:expr, ) => { $e };
    // `.`: chain field access (actually ignored)
    ($e:expr, . $($tail:tt)*) => { propget!($e, $($tail)*) };
    // `fieldName(Type)`: access field from struct-like
    ($e:expr, $f:ident($t:ty) $($tail:tt)*) => { propget!($e.getv::<$t>(riftkit_hashes::fnv1a!(stringify!($f)))?, $($tail)*) };
    ($e:expr, $x:literal($t:ty) $($tail:tt)*) => { propget!($e.getv::<$t>($x.into())?, $($tail)*) };
    // `(Type)`: downcast
    ($e:expr, ($t:ty) $($tail:tt)*) => { propget!($e.downcast::<$t>()?, $($tail)*) };
    // `(Key, Value)`: map downcast
    ($e:expr, ($k:ty, $v:ty) $($tail:tt)*) => { propget!($e.downcast::<$k, $v>()?, $($tail)*) };
}
