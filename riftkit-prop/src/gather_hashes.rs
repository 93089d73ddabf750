use super::{
    PropEntry,
    PropHashSets,
    data::*,
};

macro_rules! prop_map_kind_with_hashes {
    ($b:expr, $t:ident, $e:expr) => (match $b {
        PropKind::Hash => { type $t = PropHash; $e },
        PropKind::Path => { type $t = PropPath; $e },
        PropKind::Container | PropKind::Container2 => { type $t = PropList; $e },
        PropKind::Struct => { type $t = PropStruct; $e },
        PropKind::Embed => { type $t = PropEmbed; $e },
        PropKind::Link => { type $t = PropLink; $e },
        PropKind::Option => { type $t = PropOption; $e },
        PropKind::Map => { type $t = PropMap; $e },
        _ => {}
    })
}

/// Interface to gather hashes from nested property values
pub(crate) trait GatherHashes {
    fn gather_hashes(&self, hashes: &mut PropHashSets);
}

impl GatherHashes for PropHash {
    #[inline]
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.hash_value.insert(self.0.hash);
    }
}

impl GatherHashes for PropPath {
    #[inline]
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.path_value.insert(self.0.hash);
    }
}

impl GatherHashes for PropLink {
    #[inline]
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.entry_path.insert(self.0.hash);
    }
}

impl GatherHashes for PropEntry {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.entry_path.insert(self.path.hash);
        hashes.type_name.insert(self.ctype.hash);
        for field in self.fields.iter() {
            field.gather_hashes(hashes);
        }
    }
}

impl GatherHashes for PropField {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.field_name.insert(self.name.hash);
        prop_map_kind_with_hashes!(self.kind, T, {
            self.downcast::<T>().expect("field value matches its kind").gather_hashes(hashes);
        });
    }
}

impl GatherHashes for PropStruct {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.type_name.insert(self.ctype.hash);
        for field in self.fields.iter() {
            field.gather_hashes(hashes);
        }
    }
}

impl GatherHashes for PropEmbed {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        hashes.type_name.insert(self.ctype.hash);
        for field in self.fields.iter() {
            field.gather_hashes(hashes);
        }
    }
}

impl GatherHashes for PropOption {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        if self.is_some() {
            match self.kind {
                PropKind::Hash => self.downcast::<PropHash>().expect("checked non-empty").gather_hashes(hashes),
                PropKind::Path => self.downcast::<PropPath>().expect("checked non-empty").gather_hashes(hashes),
                PropKind::Link => self.downcast::<PropLink>().expect("checked non-empty").gather_hashes(hashes),
                _ => {}
            }
        }
    }
}

impl GatherHashes for PropList {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        match self.kind {
            PropKind::Struct => {
                for v in self.downcast::<PropStruct>().expect("list values match their kind") {
                    v.gather_hashes(hashes);
                }
            }
            PropKind::Embed => {
                for v in self.downcast::<PropEmbed>().expect("list values match their kind") {
                    v.gather_hashes(hashes);
                }
            }
            PropKind::Hash => {
                for v in self.downcast::<PropHash>().expect("list values match their kind") {
                    v.gather_hashes(hashes);
                }
            }
            PropKind::Path => {
                for v in self.downcast::<PropPath>().expect("list values match their kind") {
                    v.gather_hashes(hashes);
                }
            }
            PropKind::Link => {
                for v in self.downcast::<PropLink>().expect("list values match their kind") {
                    v.gather_hashes(hashes);
                }
            }
            _ => {}
        }
    }
}

impl GatherHashes for PropMap {
    fn gather_hashes(&self, hashes: &mut PropHashSets) {
        // process keys, then values, for better code factorization
        if self.ktype == PropKind::Hash {
            crate::prop_map_kind!(self.vtype, V, {
                for (k, _) in self.downcast::<PropHash, V>().expect("map values match their kinds") {
                    k.gather_hashes(hashes);
                }
            });
        }
        crate::prop_map_keykind!(self.ktype, K, {
            prop_map_kind_with_hashes!(self.vtype, V, {
                for (_, v) in self.downcast::<K, V>().expect("map values match their kinds") {
                    v.gather_hashes(hashes);
                }
            })
        });
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropFile;

    #[test]
    fn gather_from_entry_tree() {
        // Entry with a hash field and a link field
        let mut data = Vec::new();
        data.extend_from_slice(b"PROP");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&0xAAu32.to_le_bytes());

        let mut fields = Vec::new();
        fields.extend_from_slice(&0x1u32.to_le_bytes());
        fields.push(17);  // Hash
        fields.extend_from_slice(&0xC0FFEEu32.to_le_bytes());
        fields.extend_from_slice(&0x2u32.to_le_bytes());
        fields.push(0x84);  // Link
        fields.extend_from_slice(&0xBEEFu32.to_le_bytes());

        data.extend_from_slice(&(4 + 2 + fields.len() as u32).to_le_bytes());
        data.extend_from_slice(&0x99u32.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&fields);

        let prop = PropFile::from_slice(&data).unwrap();
        let mut hashes = PropHashSets::default();
        prop.entries[0].gather_prop_hashes(&mut hashes);

        assert!(hashes.entry_path.contains(&0x99));
        assert!(hashes.entry_path.contains(&0xBEEF));  // link target
        assert!(hashes.type_name.contains(&0xAA));
        assert!(hashes.field_name.contains(&0x1));
        assert!(hashes.field_name.contains(&0x2));
        assert!(hashes.hash_value.contains(&0xC0FFEE));
        assert!(hashes.path_value.is_empty());
    }
}
