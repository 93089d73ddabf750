//! Visit nested property values

use super::{
    PropEntry,
    data::*,
    prop_map_kind,
    prop_map_keykind,
};

/// Interface to visit nested property values
///
/// Visit methods of nested kinds can return `false` to skip their content.
/// Everything is visited by default.
///
/// [visit_kind()](Self::visit_kind()) can be used to ignore whole kinds; it
/// backs the default implementations.
#[allow(missing_docs)]
pub trait PropVisitor {
    type Error;

    /// Called to visit an entry
    ///
    /// Exists so an implementation can run code after an entry is visited.
    fn traverse_entry(&mut self, value: &PropEntry) -> Result<(), Self::Error> {
        value.traverse_prop(self)
    }

    /// Return true to visit the given kind
    fn visit_kind(&mut self, _kind: PropKind) -> bool { true }

    fn visit_entry(&mut self, _value: &PropEntry) -> Result<bool, Self::Error> { Ok(true) }
    fn visit_field(&mut self, value: &PropField) -> Result<bool, Self::Error> { Ok(self.visit_kind(value.kind)) }

    fn visit_none(&mut self, _value: &PropNone) -> Result<(), Self::Error> { Ok(()) }
    fn visit_bool(&mut self, _value: &PropBool) -> Result<(), Self::Error> { Ok(()) }
    fn visit_s8(&mut self, _value: &PropS8) -> Result<(), Self::Error> { Ok(()) }
    fn visit_u8(&mut self, _value: &PropU8) -> Result<(), Self::Error> { Ok(()) }
    fn visit_s16(&mut self, _value: &PropS16) -> Result<(), Self::Error> { Ok(()) }
    fn visit_u16(&mut self, _value: &PropU16) -> Result<(), Self::Error> { Ok(()) }
    fn visit_s32(&mut self, _value: &PropS32) -> Result<(), Self::Error> { Ok(()) }
    fn visit_u32(&mut self, _value: &PropU32) -> Result<(), Self::Error> { Ok(()) }
    fn visit_s64(&mut self, _value: &PropS64) -> Result<(), Self::Error> { Ok(()) }
    fn visit_u64(&mut self, _value: &PropU64) -> Result<(), Self::Error> { Ok(()) }
    fn visit_float(&mut self, _value: &PropFloat) -> Result<(), Self::Error> { Ok(()) }
    fn visit_vec2(&mut self, _value: &PropVec2) -> Result<(), Self::Error> { Ok(()) }
    fn visit_vec3(&mut self, _value: &PropVec3) -> Result<(), Self::Error> { Ok(()) }
    fn visit_vec4(&mut self, _value: &PropVec4) -> Result<(), Self::Error> { Ok(()) }
    fn visit_matrix(&mut self, _value: &PropMatrix) -> Result<(), Self::Error> { Ok(()) }
    fn visit_color(&mut self, _value: &PropColor) -> Result<(), Self::Error> { Ok(()) }
    fn visit_string(&mut self, _value: &PropString) -> Result<(), Self::Error> { Ok(()) }
    fn visit_hash(&mut self, _value: &PropHash) -> Result<(), Self::Error> { Ok(()) }
    fn visit_path(&mut self, _value: &PropPath) -> Result<(), Self::Error> { Ok(()) }
    fn visit_list(&mut self, value: &PropList) -> Result<bool, Self::Error> {
        Ok(self.visit_kind(PropKind::Container) && self.visit_kind(value.kind))
    }
    fn visit_struct(&mut self, _value: &PropStruct) -> Result<bool, Self::Error> {
        Ok(self.visit_kind(PropKind::Struct))
    }
    fn visit_embed(&mut self, _value: &PropEmbed) -> Result<bool, Self::Error> {
        Ok(self.visit_kind(PropKind::Embed))
    }
    fn visit_link(&mut self, _value: &PropLink) -> Result<(), Self::Error> { Ok(()) }
    fn visit_option(&mut self, value: &PropOption) -> Result<bool, Self::Error> {
        Ok(self.visit_kind(PropKind::Option) && self.visit_kind(value.kind))
    }
    fn visit_map(&mut self, _value: &PropMap) -> Result<bool, Self::Error> {
        Ok(self.visit_kind(PropKind::Map))
    }
    fn visit_flag(&mut self, _value: &PropFlag) -> Result<(), Self::Error> { Ok(()) }
}

/// Interface to traverse nested property values with a visitor
pub trait PropTraversal<PV: PropVisitor + ?Sized> {
    /// Visit the value, recursively
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error>;
}

macro_rules! impl_traversal {
    ($t:ty, $visit:ident) => {
        impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for $t {
            #[inline]
            fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
                visitor.$visit(self)
            }
        }
    }
}

impl_traversal!(PropNone, visit_none);
impl_traversal!(PropBool, visit_bool);
impl_traversal!(PropS8, visit_s8);
impl_traversal!(PropU8, visit_u8);
impl_traversal!(PropS16, visit_s16);
impl_traversal!(PropU16, visit_u16);
impl_traversal!(PropS32, visit_s32);
impl_traversal!(PropU32, visit_u32);
impl_traversal!(PropS64, visit_s64);
impl_traversal!(PropU64, visit_u64);
impl_traversal!(PropFloat, visit_float);
impl_traversal!(PropVec2, visit_vec2);
impl_traversal!(PropVec3, visit_vec3);
impl_traversal!(PropVec4, visit_vec4);
impl_traversal!(PropMatrix, visit_matrix);
impl_traversal!(PropColor, visit_color);
impl_traversal!(PropString, visit_string);
impl_traversal!(PropHash, visit_hash);
impl_traversal!(PropPath, visit_path);
impl_traversal!(PropLink, visit_link);
impl_traversal!(PropFlag, visit_flag);


impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropEntry {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_entry(self)? {
            for field in self.fields.iter() {
                field.traverse_prop(visitor)?;
            }
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropField {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_field(self)? {
            prop_map_kind!(self.kind, T, {
                self.downcast::<T>().expect("field value matches its kind").traverse_prop(visitor)?;
            });
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropStruct {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_struct(self)? {
            for field in self.fields.iter() {
                field.traverse_prop(visitor)?;
            }
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropEmbed {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_embed(self)? {
            for field in self.fields.iter() {
                field.traverse_prop(visitor)?;
            }
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropOption {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_option(self)? && self.is_some() {
            prop_map_kind!(self.kind, V, {
                self.downcast::<V>().expect("checked non-empty above").traverse_prop(visitor)?;
            });
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropList {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_list(self)? {
            prop_map_kind!(self.kind, V, {
                for v in self.downcast::<V>().expect("list values match their kind").iter() {
                    v.traverse_prop(visitor)?;
                }
            });
        }
        Ok(())
    }
}

impl<PV: PropVisitor + ?Sized> PropTraversal<PV> for PropMap {
    fn traverse_prop(&self, visitor: &mut PV) -> Result<(), PV::Error> {
        if visitor.visit_map(self)? {
            prop_map_keykind!(self.ktype, K, {
                prop_map_kind!(self.vtype, V, {
                    for (k, v) in self.downcast::<K, V>().expect("map values match their kinds") {
                        k.traverse_prop(visitor)?;
                        v.traverse_prop(visitor)?;
                    }
                })
            });
        }
        Ok(())
    }
}
